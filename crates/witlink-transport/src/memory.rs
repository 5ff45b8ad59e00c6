use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use crate::error::{LinkError, Result};
use crate::traits::Link;

type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

/// In-memory link.
///
/// Clones share the same buffers, so a test can keep one handle to inject
/// inbound bytes and inspect writes while a device owns another. An optional
/// responder is called with every written command; whatever it returns is
/// queued as inbound bytes, which is enough to stand in for a sensor.
#[derive(Clone, Default)]
pub struct MemoryLink {
    inner: Arc<Mutex<MemoryLinkInner>>,
}

#[derive(Default)]
struct MemoryLinkInner {
    inbound: VecDeque<u8>,
    written: Vec<Vec<u8>>,
    responder: Option<Responder>,
    closed: bool,
}

impl MemoryLink {
    /// Create an empty, open link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a link whose writes are answered by `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
    {
        let link = Self::new();
        link.set_responder(responder);
        link
    }

    /// Replace the responder.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
    {
        self.lock().responder = Some(Box::new(responder));
    }

    /// Queue bytes as if the sensor had sent them.
    pub fn inject(&self, data: &[u8]) {
        self.lock().inbound.extend(data.iter().copied());
    }

    /// Every write seen so far, one entry per [`Link::write`] call.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.lock().written.clone()
    }

    /// Forget recorded writes.
    pub fn clear_written(&self) {
        self.lock().written.clear();
    }

    /// Number of inbound bytes not yet read.
    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryLinkInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Link for MemoryLink {
    fn is_data_available(&mut self) -> Result<bool> {
        let inner = self.lock();
        if inner.closed {
            return Err(LinkError::Closed);
        }
        Ok(!inner.inbound.is_empty())
    }

    fn read_available(&mut self) -> Result<Vec<u8>> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(LinkError::Closed);
        }
        Ok(inner.inbound.drain(..).collect())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(LinkError::Closed);
        }
        trace!(len = data.len(), "memory link write");
        inner.written.push(data.to_vec());
        if let Some(responder) = inner.responder.as_mut() {
            let reply = responder(data);
            inner.inbound.extend(reply);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.lock().closed = true;
    }

    fn is_open(&self) -> bool {
        !self.lock().closed
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MemoryLink")
            .field("inbound", &inner.inbound.len())
            .field("writes", &inner.written.len())
            .field("closed", &inner.closed)
            .finish()
    }
}
