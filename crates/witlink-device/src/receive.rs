use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use witlink_transport::{Link, LinkError};

use crate::protocol::{Protocol, TelemetrySink};

/// Receive loop: drain the link, decode, apply.
///
/// Runs until `shutdown` is set, the link reports [`LinkError::Closed`], or
/// the sink reports a poisoned lock. Other read errors are logged and retried
/// after `idle_sleep`. The link lock is held only while polling and reading, so
/// commands can be written between reads. Listeners run with no lock held
/// but the store's listener list.
pub(crate) fn receive_loop<S>(
    link: Arc<Mutex<Box<dyn Link>>>,
    protocol: Arc<Mutex<Box<dyn Protocol>>>,
    sink: Arc<S>,
    shutdown: Arc<AtomicBool>,
    idle_sleep: Duration,
) where
    S: TelemetrySink + ?Sized,
{
    let mut failures = 0u64;
    'rx: while !shutdown.load(Ordering::Relaxed) {
        let read = {
            let Ok(mut link) = link.lock() else {
                error!("link lock poisoned, receive loop exiting");
                break;
            };
            match link.is_data_available() {
                Ok(true) => link.read_available(),
                Ok(false) => Ok(Vec::new()),
                Err(e) => Err(e),
            }
        };

        let bytes = match read {
            Ok(bytes) => {
                if failures > 0 {
                    info!(failures, "link reads recovered");
                    failures = 0;
                }
                bytes
            }
            Err(LinkError::Closed) => {
                if !shutdown.load(Ordering::Relaxed) {
                    error!("link closed, receive loop exiting");
                }
                break;
            }
            Err(e) => {
                if failures == 0 {
                    warn!(error = %e, "link read failed, retrying");
                } else {
                    debug!(error = %e, failures, "link read still failing");
                }
                failures = failures.saturating_add(1);
                thread::sleep(idle_sleep);
                continue;
            }
        };

        if bytes.is_empty() {
            thread::sleep(idle_sleep);
            continue;
        }

        let readings = match protocol.lock() {
            Ok(mut protocol) => protocol.feed(&bytes),
            Err(_) => {
                error!("protocol lock poisoned, receive loop exiting");
                break;
            }
        };
        for reading in readings {
            if let Err(e) = sink.apply(&reading) {
                error!(error = %e, "failed to apply reading, receive loop exiting");
                break 'rx;
            }
        }
    }

    debug!("receive loop stopped");
}
