use tracing::info;

use crate::cmd::{CalibrateArgs, CalibrationMode, ConnectionArgs};
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_lines, OutputFormat};

pub fn run(args: CalibrateArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut device = conn.open()?;

    let (result, message) = match args.mode {
        CalibrationMode::Accel => {
            info!("acceleration calibration running, keep the sensor still");
            (
                device.acceleration_calibration(),
                "acceleration calibration complete",
            )
        }
        CalibrationMode::MagBegin => (
            device.begin_field_calibration(),
            "magnetic field calibration started, rotate the sensor on every axis",
        ),
        CalibrationMode::MagEnd => (
            device.end_field_calibration(),
            "magnetic field calibration saved",
        ),
    };
    result.map_err(|err| device_error("calibration failed", err))?;
    device.close();

    print_lines("STATUS", &[message.to_string()], format);
    Ok(SUCCESS)
}
