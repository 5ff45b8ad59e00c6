use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};
use witlink_device::{Recorder, Snapshot};

use crate::cmd::{install_ctrlc_handler, ConnectionArgs, RecordArgs};
use crate::exit::{device_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct RecordOutput {
    path: String,
    rows: u64,
}

pub fn run(args: RecordArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut recorder =
        Recorder::create(&args.file).map_err(|err| device_error("record file create failed", err))?;
    let mut device = conn.open()?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let (tx, rx) = mpsc::channel::<Snapshot>();
    device
        .subscribe(move |snapshot| {
            let _ = tx.send(snapshot.clone());
        })
        .map_err(|err| device_error("subscribe failed", err))?;

    info!(path = %args.file.display(), "recording");
    let mut stopped = None;
    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(snapshot) => {
                recorder
                    .write_row(&snapshot)
                    .map_err(|err| device_error("record write failed", err))?;
                if args
                    .count
                    .is_some_and(|count| recorder.rows() >= count as u64)
                {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !device.is_open() {
                    stopped = Some(CliError::new(FAILURE, "receive loop stopped"));
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    device.close();
    recorder
        .flush()
        .map_err(|err| device_error("record flush failed", err))?;
    debug!(rows = recorder.rows(), "recording finished");
    if let Some(err) = stopped {
        return Err(err);
    }

    let out = RecordOutput {
        path: args.file.display().to_string(),
        rows: recorder.rows(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        _ => println!("recorded {} rows to {}", out.rows, out.path),
    }
    Ok(SUCCESS)
}
