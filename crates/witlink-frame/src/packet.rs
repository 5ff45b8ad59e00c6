use crate::error::{FrameError, Result};
use crate::kind::{is_accepted, PacketKind};

/// Marker byte that starts every packet.
pub const MARKER: u8 = 0x55;

/// Packet size: marker (1) + type (1) + payload (8) + checksum (1) = 11 bytes.
pub const PACKET_SIZE: usize = 11;

/// Payload bytes carried by one packet.
pub const PAYLOAD_SIZE: usize = 8;

/// A validated 11-byte packet.
///
/// Wire format:
/// ```text
/// ┌────────┬────────┬──────────────────────┬──────────┐
/// │ Marker │ Type   │ Payload              │ Checksum │
/// │ 0x55   │ (1B)   │ (8B, little-endian)  │ (1B)     │
/// └────────┴────────┴──────────────────────┴──────────┘
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Packet {
    bytes: [u8; PACKET_SIZE],
}

impl Packet {
    /// Build a packet from a discriminator and payload, computing the checksum.
    pub fn new(kind: u8, payload: [u8; PAYLOAD_SIZE]) -> Self {
        let mut bytes = [0u8; PACKET_SIZE];
        bytes[0] = MARKER;
        bytes[1] = kind;
        bytes[2..10].copy_from_slice(&payload);
        bytes[10] = checksum(&bytes[..10]);
        Self { bytes }
    }

    /// Validate an 11-byte slice.
    pub fn from_bytes(src: &[u8]) -> Result<Self> {
        let bytes: [u8; PACKET_SIZE] = src
            .try_into()
            .map_err(|_| FrameError::InvalidLength { len: src.len() })?;

        if bytes[0] != MARKER {
            return Err(FrameError::InvalidMarker(bytes[0]));
        }
        if !is_accepted(bytes[1]) {
            return Err(FrameError::UnknownKind(bytes[1]));
        }
        let computed = checksum(&bytes[..10]);
        if computed != bytes[10] {
            return Err(FrameError::ChecksumMismatch {
                computed,
                received: bytes[10],
            });
        }

        Ok(Self { bytes })
    }

    /// The type discriminator byte.
    pub fn kind_byte(&self) -> u8 {
        self.bytes[1]
    }

    /// The classified packet type.
    pub fn kind(&self) -> PacketKind {
        PacketKind::from_u8(self.bytes[1]).unwrap_or(PacketKind::Other(self.bytes[1]))
    }

    /// The eight payload bytes.
    pub fn payload(&self) -> [u8; PAYLOAD_SIZE] {
        let mut out = [0u8; PAYLOAD_SIZE];
        out.copy_from_slice(&self.bytes[2..10]);
        out
    }

    /// Unsigned little-endian word at payload word index `i` (0..4).
    pub fn u16_at(&self, i: usize) -> u16 {
        u16::from_le_bytes([self.bytes[2 + 2 * i], self.bytes[3 + 2 * i]])
    }

    /// Signed little-endian word at payload word index `i` (0..4).
    pub fn i16_at(&self, i: usize) -> i16 {
        self.u16_at(i) as i16
    }

    /// Unsigned little-endian double word at payload dword index `i` (0..2).
    pub fn u32_at(&self, i: usize) -> u32 {
        let base = 2 + 4 * i;
        u32::from_le_bytes([
            self.bytes[base],
            self.bytes[base + 1],
            self.bytes[base + 2],
            self.bytes[base + 3],
        ])
    }

    /// The trailing checksum byte.
    pub fn checksum(&self) -> u8 {
        self.bytes[10]
    }

    /// All 11 wire bytes.
    pub fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("kind", &format_args!("0x{:02X}", self.bytes[1]))
            .field("payload", &format_args!("{:02X?}", &self.bytes[2..10]))
            .finish()
    }
}

/// Additive checksum: sum of `bytes` modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}
