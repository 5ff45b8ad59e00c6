use tracing::debug;
use witlink_frame::{decode, FrameAccumulator};

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_packets, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let data = match (&args.hex, &args.file) {
        (Some(text), _) => parse_hex(text)?,
        (None, Some(path)) => std::fs::read(path)
            .map_err(|err| io_error(&format!("read {} failed", path.display()), err))?,
        (None, None) => return Err(CliError::new(USAGE, "decode needs hex input or --file")),
    };

    let mut acc = FrameAccumulator::new();
    let packets = acc
        .feed(&data)
        .into_iter()
        .map(|packet| {
            let reading = decode(&packet);
            (packet, reading)
        })
        .collect::<Vec<_>>();

    let stats = acc.stats();
    debug!(
        bytes = data.len(),
        packets = packets.len(),
        checksum_failures = stats.checksum_failures,
        pending = acc.pending().len(),
        "decoded input"
    );

    if packets.is_empty() {
        return Err(CliError::new(
            DATA_INVALID,
            format!("no valid packets in {} bytes", data.len()),
        ));
    }

    print_packets(&packets, format);
    Ok(SUCCESS)
}

/// Hex text to bytes. Accepts `0x` prefixes and whitespace, ':' or ','
/// between bytes.
fn parse_hex(text: &str) -> CliResult<Vec<u8>> {
    let digits: String = text
        .split(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();

    if digits.is_empty() {
        return Err(CliError::new(USAGE, "no hex digits given"));
    }
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(CliError::new(USAGE, format!("invalid hex digit {bad:?}")));
    }
    if digits.len() % 2 != 0 {
        return Err(CliError::new(USAGE, "odd number of hex digits"));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|err| CliError::new(USAGE, format!("invalid hex byte: {err}")))
        })
        .collect()
}
