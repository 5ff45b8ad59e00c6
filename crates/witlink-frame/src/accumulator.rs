use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use crate::kind::is_accepted;
use crate::packet::{checksum, Packet, MARKER, PACKET_SIZE};

/// Counters kept by a [`FrameAccumulator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccumulatorStats {
    /// Packets that passed validation and were emitted.
    pub packets: u64,
    /// Bytes discarded while resynchronizing.
    pub dropped_bytes: u64,
    /// Complete candidate packets rejected by the checksum.
    pub checksum_failures: u64,
}

/// Resynchronizing packet framer.
///
/// Bytes are appended one at a time. The pending buffer always starts with a
/// plausible packet prefix: a marker, then an accepted discriminator. Anything
/// else is dropped one byte at a time, so a corrupted byte costs at most the
/// packet it landed in and never a valid packet that follows it.
pub struct FrameAccumulator {
    buf: BytesMut,
    stats: AccumulatorStats,
}

impl FrameAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(PACKET_SIZE),
            stats: AccumulatorStats::default(),
        }
    }

    /// Feed raw bytes, returning every packet they complete.
    ///
    /// Never blocks. Partial packets are kept for the next call, so splitting
    /// input across calls yields the same packets as one concatenated call.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Packet> {
        let mut packets = Vec::new();
        for &byte in data {
            if let Some(packet) = self.push(byte) {
                packets.push(packet);
            }
        }
        packets
    }

    /// Feed a single byte, returning a packet if it completes one.
    pub fn push(&mut self, byte: u8) -> Option<Packet> {
        self.buf.extend_from_slice(&[byte]);

        loop {
            if self.buf.is_empty() {
                return None;
            }
            if self.buf[0] != MARKER {
                self.drop_front();
                continue;
            }
            if self.buf.len() >= 2 && !is_accepted(self.buf[1]) {
                self.drop_front();
                continue;
            }
            if self.buf.len() < PACKET_SIZE {
                return None;
            }

            let computed = checksum(&self.buf[..PACKET_SIZE - 1]);
            let received = self.buf[PACKET_SIZE - 1];
            if computed == received {
                let frame = self.buf.split_to(PACKET_SIZE);
                self.stats.packets += 1;
                return Packet::from_bytes(&frame).ok();
            }

            self.stats.checksum_failures += 1;
            debug!(
                kind = self.buf[1],
                computed, received, "checksum mismatch, resynchronizing"
            );
            self.drop_front();
        }
    }

    /// Bytes held while waiting for the rest of a packet.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Counters since construction or the last [`FrameAccumulator::reset`].
    pub fn stats(&self) -> AccumulatorStats {
        self.stats
    }

    /// Discard pending bytes and counters.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.stats = AccumulatorStats::default();
    }

    fn drop_front(&mut self) {
        trace!(byte = self.buf[0], "dropping byte");
        self.buf.advance(1);
        self.stats.dropped_bytes += 1;
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameAccumulator")
            .field("pending", &self.buf.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(kind: u8, payload: [u8; 8]) -> Vec<u8> {
        Packet::new(kind, payload).as_bytes().to_vec()
    }

    #[test]
    fn emits_single_packet() {
        let mut acc = FrameAccumulator::new();
        let packets = acc.feed(&wire(0x54, [0; 8]));

        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].kind_byte(), 0x54);
        assert!(acc.pending().is_empty());
        assert_eq!(acc.stats().packets, 1);
    }

    #[test]
    fn zero_payload_magnetic_packet() {
        let mut acc = FrameAccumulator::new();
        let packets = acc.feed(&[0x55, 0x54, 0, 0, 0, 0, 0, 0, 0, 0, 0xA9]);
        assert_eq!(packets.len(), 1);
    }

    #[test]
    fn emits_back_to_back_packets() {
        let mut stream = wire(0x51, [1, 0, 2, 0, 3, 0, 4, 0]);
        stream.extend(wire(0x52, [5, 0, 6, 0, 7, 0, 8, 0]));
        stream.extend(wire(0x53, [9, 0, 10, 0, 11, 0, 12, 0]));

        let mut acc = FrameAccumulator::new();
        let kinds: Vec<u8> = acc.feed(&stream).iter().map(Packet::kind_byte).collect();
        assert_eq!(kinds, vec![0x51, 0x52, 0x53]);
    }

    #[test]
    fn input_without_marker_never_buffers() {
        let mut acc = FrameAccumulator::new();
        let noise: Vec<u8> = (0u8..=255).filter(|b| *b != MARKER).cycle().take(4096).collect();

        for chunk in noise.chunks(7) {
            assert!(acc.feed(chunk).is_empty());
            assert!(acc.pending().is_empty());
        }
        assert_eq!(acc.stats().dropped_bytes, 4096);
    }

    #[test]
    fn skips_leading_garbage() {
        let mut stream = vec![0x00, 0x12, 0xFF, 0x54];
        stream.extend(wire(0x59, [0, 0x80, 0, 0, 0, 0, 0, 0]));

        let mut acc = FrameAccumulator::new();
        let packets = acc.feed(&stream);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].kind_byte(), 0x59);
        assert_eq!(acc.stats().dropped_bytes, 4);
    }

    #[test]
    fn spurious_marker_with_bad_type_is_dropped() {
        let mut stream = vec![0x55, 0x00, 0x55, 0x60];
        stream.extend(wire(0x50, [24, 6, 1, 12, 30, 15, 0xE8, 0x03]));

        let mut acc = FrameAccumulator::new();
        let packets = acc.feed(&stream);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].kind_byte(), 0x50);
    }

    #[test]
    fn corrupted_packet_does_not_swallow_next() {
        let mut corrupted = wire(0x51, [1, 2, 3, 4, 5, 6, 7, 8]);
        corrupted[10] ^= 0xFF;
        let good = wire(0x54, [1, 0, 2, 0, 3, 0, 0, 0]);

        let mut stream = corrupted;
        stream.extend(&good);

        let mut acc = FrameAccumulator::new();
        let packets = acc.feed(&stream);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].as_bytes().as_slice(), good.as_slice());
        assert_eq!(acc.stats().checksum_failures, 1);
    }

    #[test]
    fn marker_inside_corrupted_packet_is_retried() {
        // Payload of a corrupted packet embeds a complete valid packet prefix.
        let good = wire(0x54, [7, 0, 8, 0, 9, 0, 0, 0]);
        let mut stream = vec![0x55, 0x51];
        stream.extend(&good[..9]);
        stream.extend(&good[9..]);

        let mut acc = FrameAccumulator::new();
        let packets = acc.feed(&stream);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].as_bytes().as_slice(), good.as_slice());
    }

    #[test]
    fn emitted_packets_always_satisfy_checksum() {
        // Pseudo-random stream salted with markers and accepted types.
        let mut state = 0x1234_5678u32;
        let mut stream = Vec::with_capacity(20_000);
        for _ in 0..20_000 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let byte = match state % 5 {
                0 => MARKER,
                1 => 0x50 + (state >> 8) as u8 % 10,
                _ => (state >> 16) as u8,
            };
            stream.push(byte);
        }

        let mut acc = FrameAccumulator::new();
        for packet in acc.feed(&stream) {
            let bytes = packet.as_bytes();
            assert_eq!(bytes[0], MARKER);
            assert_eq!(checksum(&bytes[..10]), bytes[10]);
        }
        assert!(acc.pending().len() < PACKET_SIZE);
    }

    #[test]
    fn split_at_every_point_matches_whole() {
        let frame = wire(0x57, [0x11, 0x22, 0x33, 0x14, 0x44, 0x55, 0x66, 0x07]);

        let mut whole = FrameAccumulator::new();
        let expected = whole.feed(&frame);
        assert_eq!(expected.len(), 1);

        for split in 0..=frame.len() {
            let mut acc = FrameAccumulator::new();
            let mut got = acc.feed(&frame[..split]);
            got.extend(acc.feed(&frame[split..]));
            assert_eq!(got, expected, "split at {split}");
        }
    }

    #[test]
    fn byte_at_a_time_matches_whole() {
        let mut stream = vec![0x01, 0x55];
        stream.extend(wire(0x58, [0x10, 0x00, 0x20, 0x00, 0x30, 0x00, 0x00, 0x00]));
        stream.extend(wire(0x5F, [1, 0, 2, 0, 3, 0, 4, 0]));

        let mut whole = FrameAccumulator::new();
        let expected = whole.feed(&stream);

        let mut acc = FrameAccumulator::new();
        let got: Vec<Packet> = stream.iter().filter_map(|b| acc.push(*b)).collect();
        assert_eq!(got, expected);
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn reset_clears_state() {
        let mut acc = FrameAccumulator::new();
        acc.feed(&[0x55, 0x51, 0x00]);
        assert_eq!(acc.pending().len(), 3);

        acc.reset();
        assert!(acc.pending().is_empty());
        assert_eq!(acc.stats(), AccumulatorStats::default());
    }
}
