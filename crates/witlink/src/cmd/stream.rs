use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use witlink_device::Snapshot;

use crate::cmd::{install_ctrlc_handler, ConnectionArgs, StreamArgs};
use crate::exit::{device_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_snapshot, OutputFormat};

pub fn run(args: StreamArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut device = conn.open()?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let (tx, rx) = mpsc::channel::<Snapshot>();
    device
        .subscribe(move |snapshot| {
            let _ = tx.send(snapshot.clone());
        })
        .map_err(|err| device_error("subscribe failed", err))?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(snapshot) => {
                print_snapshot(&snapshot, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !device.is_open() {
                    return Err(CliError::new(FAILURE, "receive loop stopped"));
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    device.close();
    Ok(SUCCESS)
}
