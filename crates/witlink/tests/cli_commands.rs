#![cfg(all(unix, feature = "cli"))]

use std::path::PathBuf;
use std::process::{Command, Output};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/witlink-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn witlink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_witlink"))
        .env_remove("WITLINK_PORT")
        .env_remove("WITLINK_CONFIG")
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("witlink should run")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

#[test]
fn decode_hex_reports_magnetic_fields() {
    let output = witlink(&["decode", "55 54 00 00 00 00 00 00 00 00 A9"]);
    assert_eq!(output.status.code(), Some(0));

    let packets = json_lines(&output);
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0]["kind"], "MAGNETIC");
    assert_eq!(packets[0]["fields"][0][0], "magX");
    assert_eq!(packets[0]["fields"][0][1], 0.0);
}

#[test]
fn decode_skips_noise_before_packet() {
    let output = witlink(&["decode", "00 FF 55 54 00 00 00 00 00 00 00 00 A9"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(json_lines(&output).len(), 1);
}

#[test]
fn decode_without_valid_packets_is_data_invalid() {
    let output = witlink(&["decode", "00 11 22 33"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn decode_rejects_bad_hex() {
    let output = witlink(&["decode", "55 5"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn decode_reads_capture_file() {
    let dir = unique_temp_dir("decode");
    let path = dir.join("capture.bin");
    let mut bytes = vec![0x55, 0x54, 0, 0, 0, 0, 0, 0, 0, 0, 0xA9];
    bytes.extend_from_slice(&[0x55, 0x5F, 0x1E, 0x00, 0x06, 0x00, 0x06, 0x00, 0x00, 0x00]);
    let sum = bytes[11..].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    bytes.push(sum);
    std::fs::write(&path, &bytes).expect("capture should be writable");

    let output = witlink(&["decode", "--file", path.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(0));

    let packets = json_lines(&output);
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[1]["registers"], serde_json::json!([30, 6, 6, 0]));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulated_read_returns_register_values() {
    let output = witlink(&["--simulate", "read", "0x02", "3"]);
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let result = &json_lines(&output)[0];
    assert_eq!(result["start"], 2);
    assert_eq!(result["received"], 3);
    let values: Vec<u64> = result["registers"]
        .as_array()
        .expect("registers should be an array")
        .iter()
        .map(|r| r["value"].as_u64().expect("value should be a number"))
        .collect();
    assert_eq!(values, vec![0x1E, 6, 6]);
}

#[test]
fn simulated_stream_stops_after_count() {
    let output = witlink(&["--simulate", "stream", "--count", "2"]);
    assert_eq!(output.status.code(), Some(0));

    let updates = json_lines(&output);
    assert_eq!(updates.len(), 2);
    for update in &updates {
        assert!(update["fields"]["magX"].is_number());
        assert!(update["timestamp"].is_string());
    }
}

#[test]
fn simulated_write_with_save_confirms() {
    let output = witlink(&["--simulate", "write", "0x03", "9", "--save"]);
    assert_eq!(output.status.code(), Some(0));

    let result = &json_lines(&output)[0];
    assert_eq!(result["addr"], 3);
    assert_eq!(result["value"], 9);
    assert_eq!(result["saved"], true);
}

#[test]
fn simulated_field_calibration_begins() {
    let output = witlink(&["--simulate", "calibrate", "mag-begin"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn simulated_record_writes_header_and_rows() {
    let dir = unique_temp_dir("record");
    let path = dir.join("data.txt");

    let output = witlink(&[
        "--simulate",
        "record",
        path.to_str().expect("utf-8 path"),
        "--count",
        "3",
    ]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(json_lines(&output)[0]["rows"], 3);

    let text = std::fs::read_to_string(&path).expect("record file should exist");
    let lines: Vec<&str> = text.split_terminator("\r\n").collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("Chiptime\tax(g)\tay(g)\taz(g)"));
    for row in &lines[1..] {
        assert_eq!(row.split('\t').count(), 22);
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_name() {
    let output = witlink(&["version"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("witlink "));
}

#[test]
fn missing_config_file_is_usage_error() {
    let output = witlink(&["--config", "/nonexistent/witlink.json", "read", "0x03"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn missing_port_is_transport_error() {
    let output = witlink(&["--port", "/dev/witlink-test-no-such-port", "read", "0x03"]);
    assert_eq!(output.status.code(), Some(3));
}
