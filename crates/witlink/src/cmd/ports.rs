use witlink_transport::available_ports;

use crate::cmd::PortsArgs;
use crate::exit::{link_error, CliResult, SUCCESS};
use crate::output::{print_lines, OutputFormat};

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let ports = available_ports().map_err(|err| link_error("port enumeration failed", err))?;
    print_lines("PORT", &ports, format);
    Ok(SUCCESS)
}
