use serde::Serialize;
use witlink_frame::command::{self, CommandStep};

use crate::cmd::{ConnectionArgs, WriteArgs};
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct WriteOutput {
    addr: u16,
    value: u16,
    saved: bool,
}

/// Unlock, write, and optionally save. Without `--save` the value only lasts
/// until the sensor restarts.
fn steps(addr: u16, value: u16, save: bool) -> Vec<CommandStep> {
    if save {
        return command::configure(&[(addr, value)]);
    }
    vec![
        CommandStep::Send(command::unlock_command()),
        CommandStep::Wait(command::UNLOCK_SETTLE),
        CommandStep::Send(command::write_command(addr, value)),
    ]
}

pub fn run(args: WriteArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut device = conn.open()?;

    device
        .execute(&steps(args.addr, args.value, args.save))
        .map_err(|err| device_error("register write failed", err))?;
    device.close();

    let out = WriteOutput {
        addr: args.addr,
        value: args.value,
        saved: args.save,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        _ => println!(
            "wrote 0x{:04X} to 0x{:02X}{}",
            out.value,
            out.addr,
            if out.saved { " (saved)" } else { "" }
        ),
    }
    Ok(SUCCESS)
}
