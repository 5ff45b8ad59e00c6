use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use witlink_device::{record, Snapshot};
use witlink_frame::{keys, FieldValue, Packet, Reading};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct SnapshotOutput<'a> {
    timestamp: String,
    fields: &'a Snapshot,
}

pub fn print_snapshot(snapshot: &Snapshot, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SnapshotOutput {
                timestamp: now_unix_seconds(),
                fields: snapshot,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            for (key, value) in ordered(snapshot) {
                table.add_row(vec![key.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line = ordered(snapshot)
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{line}");
        }
        OutputFormat::Raw => {
            println!("{}", record::row(snapshot));
        }
    }
}

#[derive(Serialize)]
struct RegisterOutput {
    addr: u16,
    value: u16,
}

#[derive(Serialize)]
struct RegistersOutput {
    start: u16,
    requested: usize,
    received: usize,
    registers: Vec<RegisterOutput>,
}

pub fn print_registers(start: u16, requested: usize, values: &[u16], format: OutputFormat) {
    let registers = values
        .iter()
        .enumerate()
        .map(|(i, value)| RegisterOutput {
            addr: start.wrapping_add(i as u16),
            value: *value,
        })
        .collect::<Vec<_>>();

    match format {
        OutputFormat::Json => print_json(&RegistersOutput {
            start,
            requested,
            received: values.len(),
            registers,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ADDR", "HEX", "DEC"]);
            for r in &registers {
                table.add_row(vec![
                    format!("0x{:02X}", r.addr),
                    format!("0x{:04X}", r.value),
                    r.value.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for r in &registers {
                println!("0x{:02X} = 0x{:04X} ({})", r.addr, r.value, r.value);
            }
        }
        OutputFormat::Raw => {
            for r in &registers {
                println!("{}", r.value);
            }
        }
    }
}

#[derive(Serialize)]
struct PacketOutput {
    kind: &'static str,
    #[serde(rename = "type")]
    type_byte: String,
    bytes: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<(&'static str, FieldValue)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    registers: Option<[u16; 4]>,
}

impl PacketOutput {
    fn new(packet: &Packet, reading: &Reading) -> Self {
        Self {
            kind: packet.kind().name(),
            type_byte: format!("0x{:02X}", packet.kind_byte()),
            bytes: hex(packet.as_bytes()),
            fields: reading.fields(),
            registers: match reading {
                Reading::RegisterValues(values) => Some(*values),
                _ => None,
            },
        }
    }

    fn summary(&self) -> String {
        if let Some(values) = self.registers {
            return values
                .iter()
                .map(|v| format!("0x{v:04X}"))
                .collect::<Vec<_>>()
                .join(" ");
        }
        self.fields
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn print_packets(packets: &[(Packet, Reading)], format: OutputFormat) {
    let outputs = packets
        .iter()
        .map(|(packet, reading)| PacketOutput::new(packet, reading));

    match format {
        OutputFormat::Json => outputs.for_each(|out| print_json(&out)),
        OutputFormat::Table => {
            let mut table = new_table(vec!["KIND", "TYPE", "VALUES"]);
            for out in outputs {
                table.add_row(vec![out.kind.to_string(), out.type_byte.clone(), out.summary()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for out in outputs {
                println!("{} ({}) {}", out.kind, out.type_byte, out.summary());
            }
        }
        OutputFormat::Raw => {
            for (packet, _) in packets {
                print_raw(packet.as_bytes());
            }
        }
    }
}

pub fn print_lines(title: &str, lines: &[String], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&lines),
        OutputFormat::Table => {
            let mut table = new_table(vec![title]);
            for line in lines {
                table.add_row(vec![line.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for line in lines {
                println!("{line}");
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Space-separated uppercase hex.
pub fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Snapshot entries in decode order rather than alphabetical order.
fn ordered(snapshot: &Snapshot) -> impl Iterator<Item = (&'static str, &FieldValue)> {
    keys::ALL
        .into_iter()
        .filter_map(|key| snapshot.get(key).map(|value| (key, value)))
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
