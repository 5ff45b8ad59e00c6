use crate::cmd::{ConnectionArgs, ReadArgs};
use crate::exit::{device_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_registers, OutputFormat};

pub fn run(args: ReadArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut device = conn.open()?;

    let values = device
        .read_registers(args.addr, args.count)
        .map_err(|err| device_error("register read failed", err))?;
    device.close();

    if values.is_empty() && args.count > 0 {
        let timeout = device.config().transaction.chunk_timeout();
        return Err(CliError::new(
            TIMEOUT,
            format!(
                "no response reading 0x{:02X} (waited {timeout:?} per chunk)",
                args.addr
            ),
        ));
    }

    print_registers(args.addr, args.count, &values, format);
    Ok(SUCCESS)
}
