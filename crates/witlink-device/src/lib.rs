//! Device model for WIT-protocol sensors.
//!
//! This is the "just works" layer. Open a sensor, read telemetry as it
//! streams in, subscribe to updates, and talk to its registers over the same
//! link.
//!
//! ```no_run
//! use witlink_device::{Device, DeviceConfig};
//!
//! let device = Device::open(DeviceConfig::default())?;
//! device.subscribe(|snapshot| {
//!     println!("{:?}", snapshot.get("magX"));
//! })?;
//! let rate = device.read_registers(0x03, 1)?;
//! # Ok::<(), witlink_device::DeviceError>(())
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod protocol;
mod receive;
pub mod record;
pub mod store;
pub mod transaction;

pub use config::{DeviceConfig, TransactionConfig};
pub use device::Device;
pub use error::{DeviceError, Result};
pub use protocol::{Protocol, TelemetrySink, WitProtocol};
pub use record::{Recorder, RECORD_COLUMNS};
pub use store::{Snapshot, SubscriptionId, TelemetryStore};
pub use transaction::{read_registers, PendingResponse};
