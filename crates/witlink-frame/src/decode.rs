//! Packet payload decoding.
//!
//! [`decode`] is pure: it maps one validated packet to a typed [`Reading`].
//! [`Reading::fields`] flattens a reading into the named telemetry values
//! stored by the device model.

use std::fmt;

use serde::Serialize;

use crate::kind::PacketKind;
use crate::packet::Packet;

/// Acceleration full-scale range (g).
pub const ACC_RANGE: f64 = 16.0;

/// Angular velocity full-scale range (deg/s).
pub const GYRO_RANGE: f64 = 2000.0;

/// Euler angle full-scale range (deg).
pub const ANGLE_RANGE: f64 = 180.0;

/// Telemetry field names.
pub mod keys {
    pub const CHIP_TIME: &str = "Chiptime";
    pub const ACC_X: &str = "accX";
    pub const ACC_Y: &str = "accY";
    pub const ACC_Z: &str = "accZ";
    pub const TEMPERATURE: &str = "temperature";
    pub const GYRO_X: &str = "gyroX";
    pub const GYRO_Y: &str = "gyroY";
    pub const GYRO_Z: &str = "gyroZ";
    pub const ANGLE_X: &str = "angleX";
    pub const ANGLE_Y: &str = "angleY";
    pub const ANGLE_Z: &str = "angleZ";
    pub const MAG_X: &str = "magX";
    pub const MAG_Y: &str = "magY";
    pub const MAG_Z: &str = "magZ";
    pub const LON: &str = "lon";
    pub const LAT: &str = "lat";
    pub const HEIGHT: &str = "Height";
    pub const YAW: &str = "Yaw";
    pub const SPEED: &str = "Speed";
    pub const Q1: &str = "q1";
    pub const Q2: &str = "q2";
    pub const Q3: &str = "q3";
    pub const Q4: &str = "q4";

    /// Every key a decode can produce.
    pub const ALL: [&str; 23] = [
        CHIP_TIME,
        ACC_X,
        ACC_Y,
        ACC_Z,
        TEMPERATURE,
        GYRO_X,
        GYRO_Y,
        GYRO_Z,
        ANGLE_X,
        ANGLE_Y,
        ANGLE_Z,
        MAG_X,
        MAG_Y,
        MAG_Z,
        LON,
        LAT,
        HEIGHT,
        YAW,
        SPEED,
        Q1,
        Q2,
        Q3,
        Q4,
    ];
}

/// A telemetry value: numeric, or the formatted chip timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// The numeric value, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// The text value, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Sensor real-time clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl fmt::Display for ChipTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02} {:02}:{:02}:{:02}.{}",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.millisecond
        )
    }
}

/// A decoded packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    ChipTime(ChipTime),
    /// Acceleration (g) per axis and board temperature (°C).
    Acceleration { axes: [f64; 3], temperature: f64 },
    /// Angular velocity (deg/s) per axis.
    Gyro([f64; 3]),
    /// Euler angles (deg) per axis.
    Angle([f64; 3]),
    /// Raw magnetometer counts per axis.
    Magnetic([i16; 3]),
    /// Decimal degrees.
    LonLat { lon: f64, lat: f64 },
    /// Height (m), heading (deg), ground speed.
    Gps { height: f64, yaw: f64, speed: f64 },
    Quaternion([f64; 4]),
    /// Four consecutive register values answering a read command.
    RegisterValues([u16; 4]),
    /// Accepted discriminator with no decode rules.
    Unhandled(u8),
}

impl Reading {
    /// Whether this reading notifies telemetry listeners.
    pub fn triggers_update(&self) -> bool {
        matches!(
            self,
            Self::Magnetic(_) | Self::LonLat { .. } | Self::Gps { .. } | Self::Quaternion(_)
        )
    }

    /// Named telemetry values carried by this reading.
    ///
    /// Register values and unhandled packets carry none.
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        use keys::*;

        match self {
            Self::ChipTime(t) => vec![(CHIP_TIME, FieldValue::Text(t.to_string()))],
            Self::Acceleration { axes, temperature } => vec![
                (ACC_X, axes[0].into()),
                (ACC_Y, axes[1].into()),
                (ACC_Z, axes[2].into()),
                (TEMPERATURE, (*temperature).into()),
            ],
            Self::Gyro(axes) => vec![
                (GYRO_X, axes[0].into()),
                (GYRO_Y, axes[1].into()),
                (GYRO_Z, axes[2].into()),
            ],
            Self::Angle(axes) => vec![
                (ANGLE_X, axes[0].into()),
                (ANGLE_Y, axes[1].into()),
                (ANGLE_Z, axes[2].into()),
            ],
            Self::Magnetic(axes) => vec![
                (MAG_X, f64::from(axes[0]).into()),
                (MAG_Y, f64::from(axes[1]).into()),
                (MAG_Z, f64::from(axes[2]).into()),
            ],
            Self::LonLat { lon, lat } => vec![(LON, (*lon).into()), (LAT, (*lat).into())],
            Self::Gps { height, yaw, speed } => vec![
                (HEIGHT, (*height).into()),
                (YAW, (*yaw).into()),
                (SPEED, (*speed).into()),
            ],
            Self::Quaternion(q) => vec![
                (Q1, q[0].into()),
                (Q2, q[1].into()),
                (Q3, q[2].into()),
                (Q4, q[3].into()),
            ],
            Self::RegisterValues(_) | Self::Unhandled(_) => Vec::new(),
        }
    }
}

/// Decode a validated packet.
pub fn decode(packet: &Packet) -> Reading {
    match packet.kind() {
        PacketKind::ChipTime => Reading::ChipTime(decode_chip_time(packet)),
        PacketKind::Acceleration => Reading::Acceleration {
            axes: scaled_axes(packet, ACC_RANGE, 4),
            temperature: round_to(f64::from(packet.i16_at(3)) / 100.0, 2),
        },
        PacketKind::Gyro => Reading::Gyro(scaled_axes(packet, GYRO_RANGE, 4)),
        PacketKind::Angle => Reading::Angle(scaled_axes(packet, ANGLE_RANGE, 3)),
        PacketKind::Magnetic => {
            Reading::Magnetic([packet.i16_at(0), packet.i16_at(1), packet.i16_at(2)])
        }
        PacketKind::LonLat => Reading::LonLat {
            lon: round_to(packed_degrees(packet.u32_at(0)), 8),
            lat: round_to(packed_degrees(packet.u32_at(1)), 8),
        },
        PacketKind::Gps => Reading::Gps {
            height: round_to(f64::from(packet.i16_at(0)) / 10.0, 3),
            yaw: round_to(f64::from(packet.i16_at(1)) / 100.0, 2),
            speed: round_to(f64::from(packet.u32_at(1)) / 1000.0, 3),
        },
        PacketKind::Quaternion => Reading::Quaternion(
            [0, 1, 2, 3].map(|i| round_to(f64::from(packet.i16_at(i)) / 32768.0, 5)),
        ),
        PacketKind::RegisterValues => {
            Reading::RegisterValues([0, 1, 2, 3].map(|i| packet.u16_at(i)))
        }
        PacketKind::Other(byte) => Reading::Unhandled(byte),
    }
}

fn decode_chip_time(packet: &Packet) -> ChipTime {
    let p = packet.payload();
    ChipTime {
        year: 2000 + u16::from(p[0]),
        month: p[1],
        day: p[2],
        hour: p[3],
        minute: p[4],
        second: p[5],
        millisecond: packet.u16_at(3),
    }
}

fn scaled_axes(packet: &Packet, range: f64, places: usize) -> [f64; 3] {
    [0, 1, 2].map(|i| round_to(fold_scaled(packet.u16_at(i), range), places))
}

/// Scale an unsigned raw word to `[-range, range)`.
///
/// The raw word is scaled as unsigned and the upper half folded down, which
/// maps 0x8000 to exactly `-range`.
pub fn fold_scaled(raw: u16, range: f64) -> f64 {
    let mut scaled = f64::from(raw) / 32768.0 * range;
    if scaled >= range {
        scaled -= 2.0 * range;
    }
    scaled
}

/// Convert a `dddmm.mmmmm * 1e5` packed position to decimal degrees.
pub fn packed_degrees(raw: u32) -> f64 {
    let degrees = f64::from(raw / 10_000_000);
    let minutes = f64::from(raw % 10_000_000) / 100_000.0;
    degrees + minutes / 60.0
}

/// Round to `places` decimals, ties to even on the exact binary value.
fn round_to(value: f64, places: usize) -> f64 {
    format!("{value:.places$}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind;

    fn words(w: [u16; 4]) -> [u8; 8] {
        let mut out = [0u8; 8];
        for (i, word) in w.iter().enumerate() {
            out[2 * i..2 * i + 2].copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    fn dwords(d: [u32; 2]) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&d[0].to_le_bytes());
        out[4..].copy_from_slice(&d[1].to_le_bytes());
        out
    }

    /// Inverse of [`packed_degrees`], used to build LonLat fixtures.
    fn pack_degrees(value: f64) -> u32 {
        let degrees = value.trunc();
        let minutes = (value - degrees) * 60.0;
        degrees as u32 * 10_000_000 + (minutes * 100_000.0).round() as u32
    }

    #[test]
    fn chip_time_formats_timestamp() {
        let packet = Packet::new(kind::CHIP_TIME, [24, 6, 1, 9, 5, 7, 0x2A, 0x00]);
        let reading = decode(&packet);
        assert_eq!(
            reading.fields(),
            vec![(keys::CHIP_TIME, FieldValue::Text("2024-06-01 09:05:07.42".into()))]
        );
        assert!(!reading.triggers_update());
    }

    #[test]
    fn chip_time_millisecond_uses_full_word() {
        let packet = Packet::new(kind::CHIP_TIME, [0, 1, 1, 0, 0, 0, 0xE7, 0x03]);
        match decode(&packet) {
            Reading::ChipTime(t) => {
                assert_eq!(t.millisecond, 999);
                assert_eq!(t.to_string(), "2000-01-01 00:00:00.999");
            }
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[test]
    fn scaled_zero_is_zero() {
        assert_eq!(fold_scaled(0, ACC_RANGE), 0.0);
        assert_eq!(fold_scaled(0, GYRO_RANGE), 0.0);
        assert_eq!(fold_scaled(0, ANGLE_RANGE), 0.0);
    }

    #[test]
    fn scaled_half_word_is_negative_range() {
        assert_eq!(fold_scaled(0x8000, ACC_RANGE), -16.0);
        assert_eq!(fold_scaled(0x8000, GYRO_RANGE), -2000.0);
        assert_eq!(fold_scaled(0x8000, ANGLE_RANGE), -180.0);
    }

    #[test]
    fn scaled_just_below_half_stays_positive() {
        let v = fold_scaled(0x7FFF, ACC_RANGE);
        assert!(v > 15.99 && v < 16.0);
        let v = fold_scaled(0xFFFF, ACC_RANGE);
        assert!(v < 0.0 && v > -0.001);
    }

    #[test]
    fn acceleration_with_temperature() {
        // x = 1g (2048), y = -1g (0xF800), z = 0, temperature 25.37 C
        let packet = Packet::new(kind::ACCELERATION, words([2048, 0xF800, 0, 2537]));
        let reading = decode(&packet);
        assert_eq!(
            reading,
            Reading::Acceleration {
                axes: [1.0, -1.0, 0.0],
                temperature: 25.37
            }
        );
        let fields = reading.fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[3], (keys::TEMPERATURE, FieldValue::Number(25.37)));
    }

    #[test]
    fn acceleration_negative_temperature() {
        let packet = Packet::new(kind::ACCELERATION, words([0, 0, 0, (-550i16) as u16]));
        match decode(&packet) {
            Reading::Acceleration { temperature, .. } => assert_eq!(temperature, -5.5),
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[test]
    fn acceleration_rounds_to_four_places() {
        // 1 LSB = 16 / 32768 = 0.00048828125
        let packet = Packet::new(kind::ACCELERATION, words([1, 0, 0, 0]));
        match decode(&packet) {
            Reading::Acceleration { axes, .. } => assert_eq!(axes[0], 0.0005),
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[test]
    fn acceleration_ties_round_to_even() {
        // 64 LSB = 0.03125, 192 LSB = 0.09375, 0xFFC0 = -0.03125
        let packet = Packet::new(kind::ACCELERATION, words([64, 192, 0xFFC0, 0]));
        match decode(&packet) {
            Reading::Acceleration { axes, .. } => assert_eq!(axes, [0.0312, 0.0938, -0.0312]),
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[test]
    fn quaternion_ties_round_to_even() {
        // 512 / 32768 = 0.015625, 1536 / 32768 = 0.046875
        let packet = Packet::new(kind::QUATERNION, words([512, 1536, 0, 0]));
        assert_eq!(
            decode(&packet),
            Reading::Quaternion([0.01562, 0.04688, 0.0, 0.0])
        );
    }

    #[test]
    fn rounding_uses_exact_value_below_tie() {
        // 2.675 is stored as 2.67499999999999982236431605997495353221893310546875
        assert_eq!(round_to(2.675, 2), 2.67);
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(-1.5, 0), -2.0);
    }

    #[test]
    fn gyro_uses_2000_range() {
        let packet = Packet::new(kind::GYRO, words([16384, 0x8000, 0, 0]));
        let reading = decode(&packet);
        assert_eq!(reading, Reading::Gyro([1000.0, -2000.0, 0.0]));
        assert_eq!(reading.fields().len(), 3);
    }

    #[test]
    fn angle_uses_180_range() {
        let packet = Packet::new(kind::ANGLE, words([16384, 0xC000, 0x8000, 0]));
        assert_eq!(decode(&packet), Reading::Angle([90.0, -90.0, -180.0]));
    }

    #[test]
    fn magnetic_zero_payload() {
        let packet = Packet::new(kind::MAGNETIC, [0; 8]);
        let reading = decode(&packet);
        assert!(reading.triggers_update());
        assert_eq!(
            reading.fields(),
            vec![
                (keys::MAG_X, FieldValue::Number(0.0)),
                (keys::MAG_Y, FieldValue::Number(0.0)),
                (keys::MAG_Z, FieldValue::Number(0.0)),
            ]
        );
    }

    #[test]
    fn magnetic_is_signed_raw() {
        let packet = Packet::new(kind::MAGNETIC, words([120, (-340i16) as u16, 0x8000, 0]));
        assert_eq!(decode(&packet), Reading::Magnetic([120, -340, i16::MIN]));
    }

    #[test]
    fn lon_lat_unpacks_degrees_and_minutes() {
        // 122 deg 18.5 min, 37 deg 51.9 min
        let packet = Packet::new(kind::LON_LAT, dwords([1_221_850_000, 375_190_000]));
        let reading = decode(&packet);
        assert!(reading.triggers_update());
        match reading {
            Reading::LonLat { lon, lat } => {
                assert!((lon - 122.30833333).abs() < 1e-8);
                assert!((lat - 37.865).abs() < 1e-8);
            }
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[test]
    fn lon_lat_roundtrip_within_rounding() {
        for original in [37.8654321, 122.3141592, 0.5, 12.0, 179.99999] {
            let raw = pack_degrees(original);
            let packet = Packet::new(kind::LON_LAT, dwords([raw, raw]));
            match decode(&packet) {
                Reading::LonLat { lon, lat } => {
                    assert!((lon - original).abs() < 1e-6, "{original} -> {lon}");
                    assert_eq!(lon, lat);
                }
                other => panic!("unexpected reading {other:?}"),
            }
        }
    }

    #[test]
    fn lon_lat_exact_packing_within_eight_decimals() {
        // 122 deg 18.50001 min, 37 deg 51.91234 min
        let packet = Packet::new(kind::LON_LAT, dwords([1_221_850_001, 375_191_234]));
        match decode(&packet) {
            Reading::LonLat { lon, lat } => {
                assert!((lon - (122.0 + 18.50001 / 60.0)).abs() < 1e-8, "{lon}");
                assert!((lat - (37.0 + 51.91234 / 60.0)).abs() < 1e-8, "{lat}");
            }
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[test]
    fn gps_height_yaw_speed() {
        let mut payload = [0u8; 8];
        payload[..2].copy_from_slice(&(-125i16).to_le_bytes());
        payload[2..4].copy_from_slice(&9000i16.to_le_bytes());
        payload[4..].copy_from_slice(&12_345u32.to_le_bytes());

        let reading = decode(&Packet::new(kind::GPS, payload));
        assert!(reading.triggers_update());
        assert_eq!(
            reading,
            Reading::Gps {
                height: -12.5,
                yaw: 90.0,
                speed: 12.345
            }
        );
    }

    #[test]
    fn quaternion_min_is_minus_one() {
        let packet = Packet::new(kind::QUATERNION, words([0x8000, 0x4000, 0, 0x7FFF]));
        let reading = decode(&packet);
        assert!(reading.triggers_update());
        assert_eq!(reading, Reading::Quaternion([-1.0, 0.5, 0.0, 0.99997]));
    }

    #[test]
    fn register_values_carry_no_fields() {
        let packet = Packet::new(kind::REGISTER_VALUES, words([0x0001, 0x0006, 0x0002, 0xFFFF]));
        let reading = decode(&packet);
        assert_eq!(reading, Reading::RegisterValues([1, 6, 2, 0xFFFF]));
        assert!(reading.fields().is_empty());
        assert!(!reading.triggers_update());
    }

    #[test]
    fn unhandled_kind_is_noop() {
        for byte in [0x55, 0x56, 0x5A] {
            let reading = decode(&Packet::new(byte, [1; 8]));
            assert_eq!(reading, Reading::Unhandled(byte));
            assert!(reading.fields().is_empty());
            assert!(!reading.triggers_update());
        }
    }

    #[test]
    fn field_value_serializes_untagged() {
        assert_eq!(serde_json::to_string(&FieldValue::Number(1.5)).unwrap(), "1.5");
        assert_eq!(
            serde_json::to_string(&FieldValue::Text("x".into())).unwrap(),
            "\"x\""
        );
    }

    #[test]
    fn every_field_key_is_listed() {
        let readings = [
            decode(&Packet::new(kind::CHIP_TIME, [0; 8])),
            decode(&Packet::new(kind::ACCELERATION, [0; 8])),
            decode(&Packet::new(kind::GYRO, [0; 8])),
            decode(&Packet::new(kind::ANGLE, [0; 8])),
            decode(&Packet::new(kind::MAGNETIC, [0; 8])),
            decode(&Packet::new(kind::LON_LAT, [0; 8])),
            decode(&Packet::new(kind::GPS, [0; 8])),
            decode(&Packet::new(kind::QUATERNION, [0; 8])),
        ];
        let produced: Vec<&str> = readings
            .iter()
            .flat_map(|r| r.fields().into_iter().map(|(k, _)| k))
            .collect();
        assert_eq!(produced, keys::ALL.to_vec());
    }
}
