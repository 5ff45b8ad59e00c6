use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{LinkError, Result};
use crate::traits::Link;

/// Read timeout applied to freshly opened ports.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Serial port link (8N1, no flow control).
pub struct SerialLink {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl SerialLink {
    /// Open `port` at `baud_rate` with the default read timeout.
    pub fn open(port: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_timeout(port, baud_rate, DEFAULT_READ_TIMEOUT)
    }

    /// Open `port` at `baud_rate` with an explicit read timeout.
    pub fn open_with_timeout(port: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        let handle = serialport::new(port, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()
            .map_err(|source| LinkError::Open {
                port: port.to_string(),
                baud_rate,
                source,
            })?;

        info!(port, baud_rate, "opened serial link");

        Ok(Self {
            port: Some(handle),
            name: port.to_string(),
        })
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(LinkError::Closed)
    }
}

impl Link for SerialLink {
    fn is_data_available(&mut self) -> Result<bool> {
        Ok(self.port_mut()?.bytes_to_read()? > 0)
    }

    fn read_available(&mut self) -> Result<Vec<u8>> {
        let port = self.port_mut()?;
        let pending = port.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; pending];
        let mut filled = 0usize;
        while filled < pending {
            match port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::TimedOut => break,
                Err(err) => return Err(LinkError::Io(err)),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port_mut()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!(port = %self.name, "closed serial link");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("name", &self.name)
            .field("open", &self.port.is_some())
            .finish()
    }
}

/// Names of the serial ports visible to this host.
pub fn available_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    debug!(count = ports.len(), "enumerated serial ports");
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
