//! Print heading and attitude from a sensor on every magnetic update.
//!
//! Run with:
//!   cargo run --example monitor -- /dev/ttyUSB0 9600

use std::sync::mpsc;
use std::time::Duration;

use witlink::device::{Device, DeviceConfig};
use witlink::frame::keys;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = DeviceConfig::default();
    let mut args = std::env::args().skip(1);
    if let Some(port) = args.next() {
        config.port = port;
    }
    if let Some(baud) = args.next() {
        config.baud_rate = baud.parse()?;
    }

    let mut device = Device::open(config)?;
    eprintln!("Monitoring {}", device.name());

    let (tx, rx) = mpsc::channel();
    device.subscribe(move |snapshot| {
        let _ = tx.send(snapshot.clone());
    })?;

    for _ in 0..50 {
        let Ok(snapshot) = rx.recv_timeout(Duration::from_secs(2)) else {
            eprintln!("No telemetry in 2s");
            break;
        };
        let field = |key: &str| {
            snapshot
                .get(key)
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "roll={} pitch={} yaw={} mag=({}, {}, {})",
            field(keys::ANGLE_X),
            field(keys::ANGLE_Y),
            field(keys::ANGLE_Z),
            field(keys::MAG_X),
            field(keys::MAG_Y),
            field(keys::MAG_Z),
        );
    }

    device.close();
    Ok(())
}
