use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};
use witlink_frame::command::{self, CommandStep};
use witlink_frame::FieldValue;
use witlink_transport::{Link, SerialLink};

use crate::config::DeviceConfig;
use crate::error::{DeviceError, Result};
use crate::protocol::{Protocol, TelemetrySink, WitProtocol};
use crate::receive::receive_loop;
use crate::store::{Snapshot, SubscriptionId, TelemetryStore};
use crate::transaction::{self, PendingResponse};

/// State shared between the caller and the receive thread.
#[derive(Debug, Default)]
struct Shared {
    store: TelemetryStore,
    pending: PendingResponse,
}

impl TelemetrySink for Shared {
    fn record_fields(&self, fields: Vec<(&'static str, FieldValue)>) -> Result<()> {
        self.store.set_all(fields)
    }

    fn stage_registers(&self, values: [u16; 4]) -> Result<()> {
        self.pending.append(&values)
    }

    fn telemetry_updated(&self) -> Result<()> {
        self.store.notify()
    }
}

/// A connected sensor.
///
/// Owns the link and a background receive thread that keeps the telemetry
/// store current. Register commands are issued from the caller's thread and
/// wait for their responses on the shared staging area.
///
/// Created via [`Device::open`] or [`Device::with_link`].
pub struct Device {
    name: String,
    config: DeviceConfig,
    link: Arc<Mutex<Box<dyn Link>>>,
    shared: Arc<Shared>,
    protocol: Arc<Mutex<Box<dyn Protocol>>>,
    transaction: Mutex<()>,
    shutdown: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
    open: bool,
}

impl Device {
    /// Open the serial port named in `config` and start receiving.
    pub fn open(config: DeviceConfig) -> Result<Self> {
        let link =
            SerialLink::open_with_timeout(&config.port, config.baud_rate, config.read_timeout)?;
        Self::with_link(Box::new(link), config)
    }

    /// Start receiving over an already-open link.
    pub fn with_link(link: Box<dyn Link>, config: DeviceConfig) -> Result<Self> {
        Self::with_protocol(link, WitProtocol::new(), config)
    }

    /// Start receiving over `link`, framing and encoding with `protocol`.
    pub fn with_protocol<P>(link: Box<dyn Link>, protocol: P, config: DeviceConfig) -> Result<Self>
    where
        P: Protocol + 'static,
    {
        let name = link.name().to_string();
        let link = Arc::new(Mutex::new(link));
        let protocol: Arc<Mutex<Box<dyn Protocol>>> = Arc::new(Mutex::new(Box::new(protocol)));
        let shared = Arc::new(Shared::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let receiver = {
            let link = Arc::clone(&link);
            let protocol = Arc::clone(&protocol);
            let shared = Arc::clone(&shared);
            let shutdown = Arc::clone(&shutdown);
            let idle_sleep = config.idle_sleep;
            thread::Builder::new()
                .name(format!("witlink-rx:{name}"))
                .spawn(move || {
                    receive_loop(link, protocol, shared, shutdown, idle_sleep)
                })
                .map_err(DeviceError::Spawn)?
        };

        info!(link = %name, "device opened");
        Ok(Self {
            name,
            config,
            link,
            shared,
            protocol,
            transaction: Mutex::new(()),
            shutdown,
            receiver: Some(receiver),
            open: true,
        })
    }

    /// Link name (port path or "memory").
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Latest value of a telemetry field.
    pub fn get(&self, key: &str) -> Result<Option<FieldValue>> {
        self.shared.store.get(key)
    }

    /// Copy of every telemetry field decoded so far.
    pub fn snapshot(&self) -> Result<Snapshot> {
        self.shared.store.snapshot()
    }

    /// Register a listener called on the receive thread after each
    /// update-triggering packet (magnetic, position, GPS, quaternion).
    pub fn subscribe<F>(&self, listener: F) -> Result<SubscriptionId>
    where
        F: FnMut(&Snapshot) + Send + 'static,
    {
        self.shared.store.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        self.shared.store.unsubscribe(id)
    }

    /// Read `count` registers starting at `addr`.
    ///
    /// Blocks up to one chunk timeout per four registers. Chunks that go
    /// unanswered are skipped, so the result can be shorter than `count`.
    pub fn read_registers(&self, addr: u16, count: usize) -> Result<Vec<u16>> {
        self.ensure_open()?;
        let _guard = self
            .transaction
            .lock()
            .map_err(|_| DeviceError::Poisoned("transaction"))?;

        let per_read = self.protocol()?.registers_per_read();
        debug!(addr, count, "reading registers");
        transaction::read_registers(
            addr,
            count,
            per_read,
            &self.config.transaction,
            &self.shared.pending,
            |chunk_addr| {
                let cmd = self.protocol()?.read_command(chunk_addr);
                self.send(&cmd)
            },
        )
    }

    /// Write one register. Most registers need [`Device::unlock`] first and
    /// [`Device::save`] afterwards to persist.
    pub fn write_register(&self, addr: u16, value: u16) -> Result<()> {
        debug!(addr, value, "writing register");
        let cmd = self.protocol()?.write_command(addr, value);
        self.send(&cmd)
    }

    pub fn unlock(&self) -> Result<()> {
        self.send(&command::unlock_command())
    }

    /// Persist the current configuration.
    pub fn save(&self) -> Result<()> {
        self.send(&command::save_command())
    }

    /// Calibrate the accelerometer. Blocks for about six seconds; keep the
    /// sensor still and level.
    pub fn acceleration_calibration(&self) -> Result<()> {
        info!(link = %self.name, "acceleration calibration started");
        self.execute(&command::acceleration_calibration())?;
        info!(link = %self.name, "acceleration calibration finished");
        Ok(())
    }

    /// Enter magnetic field calibration. Rotate the sensor through every
    /// axis, then call [`Device::end_field_calibration`].
    pub fn begin_field_calibration(&self) -> Result<()> {
        info!(link = %self.name, "field calibration started");
        self.execute(&command::begin_field_calibration())
    }

    /// Leave magnetic field calibration and save the result.
    pub fn end_field_calibration(&self) -> Result<()> {
        self.execute(&command::end_field_calibration())?;
        info!(link = %self.name, "field calibration saved");
        Ok(())
    }

    /// Run a command sequence, sleeping through its waits.
    pub fn execute(&self, steps: &[CommandStep]) -> Result<()> {
        for step in steps {
            match step {
                CommandStep::Send(cmd) => self.send(cmd)?,
                CommandStep::Wait(duration) => thread::sleep(*duration),
            }
        }
        Ok(())
    }

    /// Write raw command bytes to the link.
    pub fn send(&self, cmd: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.link()?.write(cmd)?;
        Ok(())
    }

    /// Whether the device is open and its receive thread is still running.
    pub fn is_open(&self) -> bool {
        self.open
            && self
                .receiver
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the receive thread and close the link. Idempotent.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                warn!(link = %self.name, "receive thread panicked");
            }
        }

        let mut link = self
            .link
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        link.close();
        info!(link = %self.name, "device closed");
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(DeviceError::Closed)
        }
    }

    fn link(&self) -> Result<MutexGuard<'_, Box<dyn Link>>> {
        self.link.lock().map_err(|_| DeviceError::Poisoned("link"))
    }

    fn protocol(&self) -> Result<MutexGuard<'_, Box<dyn Protocol>>> {
        self.protocol
            .lock()
            .map_err(|_| DeviceError::Poisoned("protocol"))
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("open", &self.open)
            .field("store", &self.shared.store)
            .finish()
    }
}
