//! Packet type discriminators.
//!
//! The second byte of every packet selects its decode rules. 0x50-0x5A and
//! 0x5F are accepted by the framer; values in that set without decode rules
//! are carried as [`PacketKind::Other`] and decode to nothing.

/// Time on the sensor's real-time clock.
pub const CHIP_TIME: u8 = 0x50;

/// Acceleration and board temperature.
pub const ACCELERATION: u8 = 0x51;

/// Angular velocity.
pub const GYRO: u8 = 0x52;

/// Euler angles.
pub const ANGLE: u8 = 0x53;

/// Magnetic field.
pub const MAGNETIC: u8 = 0x54;

/// GPS longitude and latitude.
pub const LON_LAT: u8 = 0x57;

/// GPS height, heading, and ground speed.
pub const GPS: u8 = 0x58;

/// Orientation quaternion.
pub const QUATERNION: u8 = 0x59;

/// Answer to a register read command.
pub const REGISTER_VALUES: u8 = 0x5F;

/// A recognized packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    ChipTime,
    Acceleration,
    Gyro,
    Angle,
    Magnetic,
    LonLat,
    Gps,
    Quaternion,
    RegisterValues,
    /// Accepted discriminator with no decode rules.
    Other(u8),
}

impl PacketKind {
    /// Classify a discriminator byte. Returns `None` outside the accepted set.
    pub fn from_u8(byte: u8) -> Option<Self> {
        let kind = match byte {
            CHIP_TIME => Self::ChipTime,
            ACCELERATION => Self::Acceleration,
            GYRO => Self::Gyro,
            ANGLE => Self::Angle,
            MAGNETIC => Self::Magnetic,
            LON_LAT => Self::LonLat,
            GPS => Self::Gps,
            QUATERNION => Self::Quaternion,
            REGISTER_VALUES => Self::RegisterValues,
            other if is_accepted(other) => Self::Other(other),
            _ => return None,
        };
        Some(kind)
    }

    /// The discriminator byte for this kind.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::ChipTime => CHIP_TIME,
            Self::Acceleration => ACCELERATION,
            Self::Gyro => GYRO,
            Self::Angle => ANGLE,
            Self::Magnetic => MAGNETIC,
            Self::LonLat => LON_LAT,
            Self::Gps => GPS,
            Self::Quaternion => QUATERNION,
            Self::RegisterValues => REGISTER_VALUES,
            Self::Other(byte) => byte,
        }
    }

    /// Whether decoding this kind notifies telemetry listeners.
    pub fn triggers_update(self) -> bool {
        matches!(
            self,
            Self::Magnetic | Self::LonLat | Self::Gps | Self::Quaternion
        )
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::ChipTime => "CHIP_TIME",
            Self::Acceleration => "ACCELERATION",
            Self::Gyro => "GYRO",
            Self::Angle => "ANGLE",
            Self::Magnetic => "MAGNETIC",
            Self::LonLat => "LON_LAT",
            Self::Gps => "GPS",
            Self::Quaternion => "QUATERNION",
            Self::RegisterValues => "REGISTER_VALUES",
            Self::Other(_) => "OTHER",
        }
    }
}

/// Returns true if the framer accepts `byte` as a type discriminator.
pub fn is_accepted(byte: u8) -> bool {
    (0x50..=0x5A).contains(&byte) || byte == REGISTER_VALUES
}
