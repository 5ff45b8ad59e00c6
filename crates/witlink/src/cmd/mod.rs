use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Subcommand, ValueEnum};
use tracing::info;
use witlink_device::{Device, DeviceConfig};

use crate::exit::{device_error, io_error, CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;
use crate::sim;

pub mod calibrate;
pub mod decode;
pub mod ports;
pub mod read;
pub mod record;
pub mod stream;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print telemetry on every update.
    Stream(StreamArgs),
    /// Read consecutive registers.
    Read(ReadArgs),
    /// Write a register.
    Write(WriteArgs),
    /// Run a calibration step.
    Calibrate(CalibrateArgs),
    /// Record telemetry to a tab-separated file.
    Record(RecordArgs),
    /// Decode captured sensor bytes offline.
    Decode(DecodeArgs),
    /// List serial ports.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Stream(args) => stream::run(args, conn, format),
        Command::Read(args) => read::run(args, conn, format),
        Command::Write(args) => write::run(args, conn, format),
        Command::Calibrate(args) => calibrate::run(args, conn, format),
        Command::Record(args) => record::run(args, conn, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// How to reach the sensor. Shared by every subcommand that opens one.
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// JSON device config (port, baud_rate, timings).
    #[arg(long, value_name = "FILE", global = true, env = "WITLINK_CONFIG")]
    pub config: Option<PathBuf>,
    /// Serial port (overrides config).
    #[arg(long, short = 'p', global = true, env = "WITLINK_PORT")]
    pub port: Option<String>,
    /// Baud rate (overrides config).
    #[arg(long, short = 'b', global = true)]
    pub baud: Option<u32>,
    /// Talk to an in-process simulated sensor instead of a serial port.
    #[arg(long, global = true)]
    pub simulate: bool,
}

impl ConnectionArgs {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn device_config(&self) -> CliResult<DeviceConfig> {
        let mut config = match &self.config {
            Some(path) => DeviceConfig::from_json_file(path)
                .map_err(|err| device_error("config load failed", err))?,
            None => DeviceConfig::default(),
        };
        if let Some(port) = &self.port {
            config.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        Ok(config)
    }

    pub fn open(&self) -> CliResult<Device> {
        let config = self.device_config()?;

        if self.simulate {
            let link = sim::start().map_err(|err| io_error("simulator start failed", err))?;
            info!("using simulated sensor");
            return Device::with_link(Box::new(link), config)
                .map_err(|err| device_error("device start failed", err));
        }

        let port = config.port.clone();
        Device::open(config).map_err(|err| device_error(&format!("open {port} failed"), err))
    }
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Exit after N updates.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// First register (decimal or 0x hex).
    #[arg(value_parser = parse_u16)]
    pub addr: u16,
    /// Number of registers.
    #[arg(default_value = "1")]
    pub count: usize,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Register (decimal or 0x hex).
    #[arg(value_parser = parse_u16)]
    pub addr: u16,
    /// Value (decimal or 0x hex).
    #[arg(value_parser = parse_u16)]
    pub value: u16,
    /// Persist the change.
    #[arg(long)]
    pub save: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum CalibrationMode {
    /// Accelerometer calibration (keep the sensor still and level).
    Accel,
    /// Enter magnetic field calibration.
    MagBegin,
    /// Leave magnetic field calibration and save.
    MagEnd,
}

#[derive(Args, Debug)]
pub struct CalibrateArgs {
    pub mode: CalibrationMode,
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Output file.
    pub file: PathBuf,
    /// Stop after N rows.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex bytes (whitespace, ':' and ',' separators allowed).
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub hex: Option<String>,
    /// Read raw bytes from a capture file.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a decimal or `0x`-prefixed hex 16-bit number.
pub fn parse_u16(input: &str) -> Result<u16, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid 16-bit value {input:?}: {err}"))
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_u16_decimal_and_hex() {
        assert_eq!(parse_u16("3"), Ok(3));
        assert_eq!(parse_u16("0x69"), Ok(0x69));
        assert_eq!(parse_u16("0XB588"), Ok(0xB588));
        assert_eq!(parse_u16(" 65535 "), Ok(u16::MAX));
    }

    #[test]
    fn parse_u16_rejects_bad_input() {
        assert!(parse_u16("65536").is_err());
        assert!(parse_u16("0x").is_err());
        assert!(parse_u16("-1").is_err());
        assert!(parse_u16("ten").is_err());
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let conn = ConnectionArgs {
            port: Some("/dev/ttyS9".into()),
            baud: Some(9600),
            ..ConnectionArgs::default()
        };
        let config = conn.device_config().unwrap();
        assert_eq!(config.port, "/dev/ttyS9");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.transaction.max_polls, 20);
    }

    #[test]
    fn missing_config_file_is_usage_error() {
        let conn = ConnectionArgs {
            config: Some(PathBuf::from("/nonexistent/witlink.json")),
            ..ConnectionArgs::default()
        };
        let err = conn.device_config().unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }
}
