//! Telemetry and register access for WIT-protocol inertial sensors.
//!
//! witlink talks to WIT-Motion style IMU, magnetometer, and GPS modules over
//! a serial link: it reassembles and validates the sensor's 11-byte packets,
//! decodes them into named telemetry fields, and runs register reads, writes,
//! and calibration sequences over the same link.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte links (serial port, in-memory)
//! - [`frame`]: packet framing, decoding, and command encoding
//! - [`device`]: telemetry store, register transactions, and the device
//!   model (behind the `device` feature)

/// Re-export transport types.
pub mod transport {
    pub use witlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use witlink_frame::*;
}

/// Re-export device types (requires `device` feature).
#[cfg(feature = "device")]
pub mod device {
    pub use witlink_device::*;
}
