//! WIT sensor packet framing, decoding, and command encoding.
//!
//! Every inbound packet on the wire is exactly 11 bytes:
//! - A marker byte (0x55) for stream synchronization
//! - A type discriminator selecting the decode rules
//! - Eight payload bytes
//! - A one-byte additive checksum over the first ten bytes
//!
//! [`FrameAccumulator`] turns an unbounded byte stream into validated
//! [`Packet`]s, [`decode`] turns a packet into a typed [`Reading`], and the
//! [`command`] module builds the 5-byte register commands sent the other way.

pub mod accumulator;
pub mod command;
pub mod decode;
pub mod error;
pub mod kind;
pub mod packet;

pub use accumulator::{AccumulatorStats, FrameAccumulator};
pub use command::{Command, CommandStep, COMMAND_SIZE, REGISTERS_PER_READ};
pub use decode::{decode, keys, ChipTime, FieldValue, Reading};
pub use error::{FrameError, Result};
pub use kind::PacketKind;
pub use packet::{checksum, Packet, MARKER, PACKET_SIZE, PAYLOAD_SIZE};
