//! Synchronous register reads over an asynchronous link.
//!
//! The receive thread drops register responses into a [`PendingResponse`];
//! [`read_registers`] sends one read command per chunk and polls that slot.

use std::sync::{Mutex, MutexGuard};
use std::thread;

use tracing::{debug, warn};

use crate::config::TransactionConfig;
use crate::error::{DeviceError, Result};

/// Staging area for register values answering the in-flight read.
#[derive(Debug, Default)]
pub struct PendingResponse {
    values: Mutex<Vec<u16>>,
}

impl PendingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a response after anything already staged.
    pub fn append(&self, values: &[u16]) -> Result<()> {
        self.lock()?.extend_from_slice(values);
        Ok(())
    }

    /// Discard anything staged.
    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    /// Drain the staged values.
    pub fn take(&self) -> Result<Vec<u16>> {
        Ok(std::mem::take(&mut *self.lock()?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<u16>>> {
        self.values
            .lock()
            .map_err(|_| DeviceError::Poisoned("pending response"))
    }
}

/// Read `count` registers starting at `addr`.
///
/// Issues `ceil(count / per_read)` read commands through `send`, for `addr`,
/// `addr + per_read`, and so on. Each chunk clears `pending`, sends, then
/// checks `pending` after every `poll_interval` up to `max_polls` times; the
/// first non-empty response contributes at most the values still missing.
/// A chunk that times out contributes nothing, so the result may be shorter
/// than `count`. `count == 0` sends nothing.
pub fn read_registers<F>(
    addr: u16,
    count: usize,
    per_read: u16,
    config: &TransactionConfig,
    pending: &PendingResponse,
    mut send: F,
) -> Result<Vec<u16>>
where
    F: FnMut(u16) -> Result<()>,
{
    let per_read = usize::from(per_read.max(1));
    let chunks = count.div_ceil(per_read);
    let mut collected = Vec::with_capacity(count);

    for n in 0..chunks {
        let chunk_addr = addr.wrapping_add((n * per_read) as u16);
        pending.clear()?;
        send(chunk_addr)?;

        let mut answered = false;
        for _ in 0..config.max_polls {
            thread::sleep(config.poll_interval);
            let available = pending.take()?;
            if !available.is_empty() {
                let wanted = count - collected.len();
                collected.extend(available.into_iter().take(wanted));
                answered = true;
                break;
            }
        }

        if !answered {
            debug!(
                addr = chunk_addr,
                timeout_ms = config.chunk_timeout().as_millis() as u64,
                "register read chunk timed out"
            );
        }
    }

    if collected.len() < count {
        warn!(
            addr,
            requested = count,
            received = collected.len(),
            "short register read"
        );
    }
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn fast() -> TransactionConfig {
        TransactionConfig {
            poll_interval: Duration::from_millis(1),
            max_polls: 5,
        }
    }

    #[test]
    fn pending_append_and_take() {
        let pending = PendingResponse::new();
        pending.append(&[1, 2, 3, 4]).unwrap();
        pending.append(&[5, 6, 7, 8]).unwrap();
        assert_eq!(pending.take().unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(pending.take().unwrap().is_empty());
    }

    #[test]
    fn zero_count_sends_nothing() {
        let pending = PendingResponse::new();
        let mut sent = Vec::new();
        let values = read_registers(0x10, 0, 4, &fast(), &pending, |addr| {
            sent.push(addr);
            Ok(())
        })
        .unwrap();

        assert!(values.is_empty());
        assert!(sent.is_empty());
    }

    #[test]
    fn six_registers_take_two_chunks() {
        let pending = PendingResponse::new();
        let mut sent = Vec::new();
        let values = read_registers(0x30, 6, 4, &fast(), &pending, |addr| {
            sent.push(addr);
            pending.append(&[addr, addr + 1, addr + 2, addr + 3])
        })
        .unwrap();

        assert_eq!(sent, vec![0x30, 0x34]);
        assert_eq!(values, vec![0x30, 0x31, 0x32, 0x33, 0x34, 0x35]);
    }

    #[test]
    fn responses_arriving_within_one_poll_are_kept_in_order() {
        let pending = PendingResponse::new();
        let config = TransactionConfig {
            poll_interval: Duration::from_millis(1),
            max_polls: 1,
        };
        let values = read_registers(0x10, 8, 8, &config, &pending, |addr| {
            pending.append(&[addr, addr + 1, addr + 2, addr + 3])?;
            pending.append(&[addr + 4, addr + 5, addr + 6, addr + 7])
        })
        .unwrap();

        assert_eq!(values, (0x10..0x18).collect::<Vec<u16>>());
    }

    #[test]
    fn stale_response_is_cleared_before_send() {
        let pending = PendingResponse::new();
        pending.append(&[9, 9, 9, 9]).unwrap();

        let values = read_registers(0x00, 2, 4, &fast(), &pending, |_| Ok(())).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn timed_out_chunk_contributes_nothing() {
        let pending = PendingResponse::new();
        let mut chunk = 0;
        let values = read_registers(0x00, 8, 4, &fast(), &pending, |addr| {
            chunk += 1;
            if chunk == 2 {
                pending.append(&[addr; 4])?;
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(values, vec![4, 4, 4, 4]);
    }

    #[test]
    fn late_response_from_another_thread() {
        let pending = Arc::new(PendingResponse::new());
        let config = TransactionConfig {
            poll_interval: Duration::from_millis(5),
            max_polls: 40,
        };

        let responder = Arc::clone(&pending);
        let values = read_registers(0x03, 1, 4, &config, &pending, move |_| {
            let responder = Arc::clone(&responder);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                responder.append(&[6, 0, 0, 0]).unwrap();
            });
            Ok(())
        })
        .unwrap();

        assert_eq!(values, vec![6]);
    }

    #[test]
    fn send_error_propagates() {
        let pending = PendingResponse::new();
        let err = read_registers(0x00, 4, 4, &fast(), &pending, |_| Err(DeviceError::Closed))
            .unwrap_err();
        assert!(matches!(err, DeviceError::Closed));
    }

    #[test]
    fn address_wraps() {
        let pending = PendingResponse::new();
        let mut sent = Vec::new();
        read_registers(0xFFFE, 8, 4, &fast(), &pending, |addr| {
            sent.push(addr);
            Ok(())
        })
        .unwrap();
        assert_eq!(sent, vec![0xFFFE, 0x0002]);
    }
}
