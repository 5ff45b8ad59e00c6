//! Serial link abstraction for WIT-protocol sensors.
//!
//! Provides a unified interface over the byte channels a sensor can sit behind:
//! - Serial ports (via the `serialport` crate)
//! - An in-memory link for tests and simulation
//!
//! This is the lowest layer of witlink. Everything else builds on top of
//! the [`Link`] trait provided here.

pub mod error;
pub mod memory;
pub mod serial;
pub mod traits;

pub use error::{LinkError, Result};
pub use memory::MemoryLink;
pub use serial::{available_ports, SerialLink, DEFAULT_READ_TIMEOUT};
pub use traits::Link;
