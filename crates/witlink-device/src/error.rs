use std::path::PathBuf;

/// Errors that can occur in device operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Link-level error.
    #[error("link error: {0}")]
    Link(#[from] witlink_transport::LinkError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] witlink_frame::FrameError),

    /// The device has been closed.
    #[error("device closed")]
    Closed,

    /// A shared lock was poisoned by a panicking thread.
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),

    /// Failed to load a configuration file.
    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to start the receive thread.
    #[error("failed to spawn receive thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// I/O error while writing a recording.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
