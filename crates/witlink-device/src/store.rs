use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use witlink_frame::FieldValue;

use crate::error::{DeviceError, Result};

/// Point-in-time copy of every telemetry field decoded so far.
pub type Snapshot = BTreeMap<String, FieldValue>;

type Listener = Box<dyn FnMut(&Snapshot) + Send>;

/// Handle returned by [`TelemetryStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Latest telemetry values plus the listeners interested in them.
///
/// Fields and listeners live behind separate locks so listeners run without
/// holding the field lock; a listener may call [`TelemetryStore::get`] or
/// [`TelemetryStore::snapshot`], but must not subscribe or unsubscribe from
/// inside its own callback.
#[derive(Default)]
pub struct TelemetryStore {
    fields: Mutex<Snapshot>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn set(&self, key: &str, value: FieldValue) -> Result<()> {
        self.fields()?.insert(key.to_string(), value);
        Ok(())
    }

    /// Set several fields under one lock.
    pub fn set_all<I>(&self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'static str, FieldValue)>,
    {
        let mut fields = self.fields()?;
        for (key, value) in values {
            fields.insert(key.to_string(), value);
        }
        Ok(())
    }

    /// The current value of `key`, or `None` if it was never decoded.
    pub fn get(&self, key: &str) -> Result<Option<FieldValue>> {
        Ok(self.fields()?.get(key).cloned())
    }

    /// Remove a field, returning its last value.
    pub fn remove(&self, key: &str) -> Result<Option<FieldValue>> {
        Ok(self.fields()?.remove(key))
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(self.fields()?.clone())
    }

    /// Register a listener called on every update.
    pub fn subscribe<F>(&self, listener: F) -> Result<SubscriptionId>
    where
        F: FnMut(&Snapshot) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners()?.push((id, Box::new(listener)));
        Ok(id)
    }

    /// Remove a listener. Returns false if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        let mut listeners = self.listeners()?;
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        Ok(listeners.len() != before)
    }

    pub fn listener_count(&self) -> Result<usize> {
        Ok(self.listeners()?.len())
    }

    /// Call every listener, in registration order, with a fresh snapshot.
    pub fn notify(&self) -> Result<()> {
        let snapshot = self.snapshot()?;
        for (_, listener) in self.listeners()?.iter_mut() {
            listener(&snapshot);
        }
        Ok(())
    }

    fn fields(&self) -> Result<MutexGuard<'_, Snapshot>> {
        self.fields
            .lock()
            .map_err(|_| DeviceError::Poisoned("telemetry"))
    }

    fn listeners(&self) -> Result<MutexGuard<'_, Vec<(SubscriptionId, Listener)>>> {
        self.listeners
            .lock()
            .map_err(|_| DeviceError::Poisoned("listener"))
    }
}

impl std::fmt::Debug for TelemetryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = self.fields.lock().map(|g| g.len()).unwrap_or(0);
        let listeners = self.listeners.lock().map(|g| g.len()).unwrap_or(0);
        f.debug_struct("TelemetryStore")
            .field("fields", &fields)
            .field("listeners", &listeners)
            .finish()
    }
}
