//! Protocol plug-in seam.
//!
//! A [`Protocol`] turns inbound bytes into readings and encodes register
//! commands; a [`TelemetrySink`] is whatever consumes the readings. The device
//! wires one to the other on its receive thread.

use tracing::trace;
use witlink_frame::command::{self, Command, REGISTERS_PER_READ};
use witlink_frame::{decode, AccumulatorStats, FieldValue, FrameAccumulator, Reading};

use crate::error::Result;

/// Wire protocol spoken by a sensor.
pub trait Protocol: Send {
    /// Feed raw link bytes, returning every reading they complete.
    fn feed(&mut self, data: &[u8]) -> Vec<Reading>;

    /// Command requesting the registers starting at `addr`.
    fn read_command(&self, addr: u16) -> Command;

    /// Command writing `value` to `addr`.
    fn write_command(&self, addr: u16, value: u16) -> Command;

    /// Registers answered by one read command.
    fn registers_per_read(&self) -> u16 {
        REGISTERS_PER_READ
    }
}

/// The WIT 11-byte packet protocol.
#[derive(Debug, Default)]
pub struct WitProtocol {
    accumulator: FrameAccumulator,
}

impl WitProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    /// Framing counters.
    pub fn stats(&self) -> AccumulatorStats {
        self.accumulator.stats()
    }
}

impl Protocol for WitProtocol {
    fn feed(&mut self, data: &[u8]) -> Vec<Reading> {
        self.accumulator
            .feed(data)
            .iter()
            .map(decode)
            .collect()
    }

    fn read_command(&self, addr: u16) -> Command {
        command::read_command(addr)
    }

    fn write_command(&self, addr: u16, value: u16) -> Command {
        command::write_command(addr, value)
    }
}

/// Consumer of decoded readings.
pub trait TelemetrySink {
    /// Store named telemetry values.
    fn record_fields(&self, fields: Vec<(&'static str, FieldValue)>) -> Result<()>;

    /// Stage register values answering a pending read.
    fn stage_registers(&self, values: [u16; 4]) -> Result<()>;

    /// An update-triggering reading has been stored.
    fn telemetry_updated(&self) -> Result<()>;

    /// Route one reading.
    ///
    /// Fields are stored before listeners are told about the update.
    fn apply(&self, reading: &Reading) -> Result<()> {
        match reading {
            Reading::RegisterValues(values) => self.stage_registers(*values),
            Reading::Unhandled(kind) => {
                trace!(kind = *kind, "no decode rules, ignoring");
                Ok(())
            }
            _ => {
                self.record_fields(reading.fields())?;
                if reading.triggers_update() {
                    self.telemetry_updated()?;
                }
                Ok(())
            }
        }
    }
}
