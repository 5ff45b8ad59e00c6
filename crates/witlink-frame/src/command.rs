//! Outbound register commands.
//!
//! Every command is five bytes:
//! ```text
//! ┌───────────┬──────────┬─────────────────┐
//! │ Header    │ Register │ Value           │
//! │ 0xFF 0xAA │ (1B)     │ (2B, LE)        │
//! └───────────┴──────────┴─────────────────┘
//! ```
//! A read is a write to the pseudo-register 0x27 whose value is the first
//! register to read. Configuration changes need unlock → write → save.

use std::time::Duration;

/// Command header bytes.
pub const HEADER: [u8; 2] = [0xFF, 0xAA];

/// Bytes per command.
pub const COMMAND_SIZE: usize = 5;

/// Registers returned by one read command.
pub const REGISTERS_PER_READ: u16 = 4;

/// Settle time after unlock before the next write.
pub const UNLOCK_SETTLE: Duration = Duration::from_millis(100);

/// Time the sensor needs to finish an acceleration calibration.
pub const ACCEL_CALIBRATION_TIME: Duration = Duration::from_millis(5500);

/// One encoded command.
pub type Command = [u8; COMMAND_SIZE];

/// Register addresses and well-known values.
pub mod reg {
    /// Save configuration (write 0) or restore defaults (write 1).
    pub const SAVE: u16 = 0x00;
    /// Calibration mode switch.
    pub const CALSW: u16 = 0x01;
    /// Output content bitmap.
    pub const RSW: u16 = 0x02;
    /// Output rate.
    pub const RRATE: u16 = 0x03;
    /// Serial baud rate.
    pub const BAUD: u16 = 0x04;
    /// Installation direction.
    pub const ORIENT: u16 = 0x23;
    /// Algorithm selection (9-axis / 6-axis).
    pub const AXIS6: u16 = 0x24;
    /// Pseudo-register that triggers a read.
    pub const READ_ADDR: u16 = 0x27;
    /// Unlock key register.
    pub const KEY: u16 = 0x69;

    /// Value written to [`KEY`] to unlock configuration writes.
    pub const UNLOCK_KEY: u16 = 0xB588;
    /// [`CALSW`] value leaving calibration.
    pub const CALSW_NORMAL: u16 = 0x00;
    /// [`CALSW`] value starting acceleration calibration.
    pub const CALSW_ACCEL: u16 = 0x01;
    /// [`CALSW`] value starting magnetic field calibration.
    pub const CALSW_MAG: u16 = 0x07;
}

/// One step of a command sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStep {
    /// Write a command to the link.
    Send(Command),
    /// Pause before the next step.
    Wait(Duration),
}

/// Sensor output rate options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OutputRate {
    Hz0_2 = 0x01,
    Hz0_5 = 0x02,
    Hz1 = 0x03,
    Hz2 = 0x04,
    Hz5 = 0x05,
    /// Factory default.
    Hz10 = 0x06,
    Hz20 = 0x07,
    Hz50 = 0x08,
    Hz100 = 0x09,
    /// Requires 115200 baud or faster.
    Hz200 = 0x0B,
}

impl OutputRate {
    /// The rate in Hz.
    pub fn as_hz(self) -> f32 {
        match self {
            Self::Hz0_2 => 0.2,
            Self::Hz0_5 => 0.5,
            Self::Hz1 => 1.0,
            Self::Hz2 => 2.0,
            Self::Hz5 => 5.0,
            Self::Hz10 => 10.0,
            Self::Hz20 => 20.0,
            Self::Hz50 => 50.0,
            Self::Hz100 => 100.0,
            Self::Hz200 => 200.0,
        }
    }
}

/// Sensor baud rate options.
///
/// A new baud rate takes effect after save and power cycle; the host port
/// must be reopened at the new rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum BaudRate {
    Baud4800 = 0x01,
    /// Factory default.
    Baud9600 = 0x02,
    Baud19200 = 0x03,
    Baud38400 = 0x04,
    Baud57600 = 0x05,
    Baud115200 = 0x06,
    Baud230400 = 0x07,
    Baud460800 = 0x08,
    Baud921600 = 0x09,
}

impl BaudRate {
    /// The baud rate in bits per second.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Baud4800 => 4800,
            Self::Baud9600 => 9600,
            Self::Baud19200 => 19200,
            Self::Baud38400 => 38400,
            Self::Baud57600 => 57600,
            Self::Baud115200 => 115200,
            Self::Baud230400 => 230400,
            Self::Baud460800 => 460800,
            Self::Baud921600 => 921600,
        }
    }
}

/// Request the four registers starting at `addr`.
pub fn read_command(addr: u16) -> Command {
    let [lo, hi] = addr.to_le_bytes();
    [HEADER[0], HEADER[1], reg::READ_ADDR as u8, lo, hi]
}

/// Write `value` to register `addr`.
///
/// The register field is one byte wide on the wire; only the low byte of
/// `addr` is sent.
pub fn write_command(addr: u16, value: u16) -> Command {
    let [lo, hi] = value.to_le_bytes();
    [HEADER[0], HEADER[1], addr as u8, lo, hi]
}

/// Unlock configuration writes.
pub fn unlock_command() -> Command {
    write_command(reg::KEY, reg::UNLOCK_KEY)
}

/// Persist configuration to flash.
pub fn save_command() -> Command {
    write_command(reg::SAVE, 0x0000)
}

/// Set the output rate (needs unlock and save).
pub fn rate_command(rate: OutputRate) -> Command {
    write_command(reg::RRATE, rate as u16)
}

/// Set the serial baud rate (needs unlock and save).
pub fn baud_command(baud: BaudRate) -> Command {
    write_command(reg::BAUD, baud as u16)
}

/// Unlock, start acceleration calibration, and wait for it to finish.
pub fn acceleration_calibration() -> Vec<CommandStep> {
    vec![
        CommandStep::Send(unlock_command()),
        CommandStep::Wait(UNLOCK_SETTLE),
        CommandStep::Send(write_command(reg::CALSW, reg::CALSW_ACCEL)),
        CommandStep::Wait(ACCEL_CALIBRATION_TIME),
    ]
}

/// Unlock and enter magnetic field calibration.
///
/// The sensor stays in calibration until [`end_field_calibration`].
pub fn begin_field_calibration() -> Vec<CommandStep> {
    vec![
        CommandStep::Send(unlock_command()),
        CommandStep::Wait(UNLOCK_SETTLE),
        CommandStep::Send(write_command(reg::CALSW, reg::CALSW_MAG)),
    ]
}

/// Unlock and save, leaving magnetic field calibration.
pub fn end_field_calibration() -> Vec<CommandStep> {
    vec![
        CommandStep::Send(unlock_command()),
        CommandStep::Wait(UNLOCK_SETTLE),
        CommandStep::Send(save_command()),
    ]
}

/// Unlock, apply `writes` in order with a settle pause after each, then save.
pub fn configure(writes: &[(u16, u16)]) -> Vec<CommandStep> {
    let mut steps = vec![
        CommandStep::Send(unlock_command()),
        CommandStep::Wait(UNLOCK_SETTLE),
    ];
    for &(addr, value) in writes {
        steps.push(CommandStep::Send(write_command(addr, value)));
        steps.push(CommandStep::Wait(UNLOCK_SETTLE));
    }
    steps.push(CommandStep::Send(save_command()));
    steps
}
