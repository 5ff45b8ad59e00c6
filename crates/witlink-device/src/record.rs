//! Tab-separated telemetry recording.
//!
//! One header line, then one row per update, CRLF line endings. Fields not
//! yet decoded are written as empty cells.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use witlink_frame::keys;

use crate::error::Result;
use crate::store::Snapshot;

/// Column header and the telemetry key it is filled from.
pub const RECORD_COLUMNS: [(&str, &str); 22] = [
    ("Chiptime", keys::CHIP_TIME),
    ("ax(g)", keys::ACC_X),
    ("ay(g)", keys::ACC_Y),
    ("az(g)", keys::ACC_Z),
    ("wx(deg/s)", keys::GYRO_X),
    ("wy(deg/s)", keys::GYRO_Y),
    ("wz(deg/s)", keys::GYRO_Z),
    ("AngleX(deg)", keys::ANGLE_X),
    ("AngleY(deg)", keys::ANGLE_Y),
    ("AngleZ(deg)", keys::ANGLE_Z),
    ("T(°)", keys::TEMPERATURE),
    ("magx", keys::MAG_X),
    ("magy", keys::MAG_Y),
    ("magz", keys::MAG_Z),
    ("lon", keys::LON),
    ("lat", keys::LAT),
    ("Yaw", keys::YAW),
    ("Speed", keys::SPEED),
    ("q1", keys::Q1),
    ("q2", keys::Q2),
    ("q3", keys::Q3),
    ("q4", keys::Q4),
];

const EOL: &str = "\r\n";

/// Writes snapshots as tab-separated rows.
#[derive(Debug)]
pub struct Recorder<W: Write> {
    out: W,
    rows: u64,
}

impl Recorder<BufWriter<File>> {
    /// Create (or truncate) `path` and write the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> Recorder<W> {
    /// Wrap `out` and write the header line.
    pub fn new(mut out: W) -> Result<Self> {
        out.write_all(header().as_bytes())?;
        out.write_all(EOL.as_bytes())?;
        Ok(Self { out, rows: 0 })
    }

    /// Append one row.
    pub fn write_row(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.out.write_all(row(snapshot).as_bytes())?;
        self.out.write_all(EOL.as_bytes())?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Flush and return the writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// The header line, without line ending.
pub fn header() -> String {
    RECORD_COLUMNS
        .iter()
        .map(|(title, _)| *title)
        .collect::<Vec<_>>()
        .join("\t")
}

/// One data row, without line ending.
pub fn row(snapshot: &Snapshot) -> String {
    RECORD_COLUMNS
        .iter()
        .map(|(_, key)| {
            snapshot
                .get(*key)
                .map(ToString::to_string)
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join("\t")
}
