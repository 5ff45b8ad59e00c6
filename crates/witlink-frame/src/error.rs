/// Errors that can occur when validating a packet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The byte slice is not exactly one packet long.
    #[error("invalid packet length ({len} bytes, expected 11)")]
    InvalidLength { len: usize },

    /// The first byte is not the 0x55 marker.
    #[error("invalid packet marker 0x{0:02X} (expected 0x55)")]
    InvalidMarker(u8),

    /// The type discriminator is outside the accepted set.
    #[error("unknown packet type 0x{0:02X}")]
    UnknownKind(u8),

    /// The trailing checksum does not match the packet contents.
    #[error("checksum mismatch (computed 0x{computed:02X}, received 0x{received:02X})")]
    ChecksumMismatch { computed: u8, received: u8 },
}

pub type Result<T> = std::result::Result<T, FrameError>;
