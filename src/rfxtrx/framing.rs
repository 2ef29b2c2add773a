//! Stream splitter for RFXtrx packets.
//!
//! Every packet starts with a length byte counting the bytes that follow it.
//! Reads from the serial port cut packets at arbitrary points, so the parser
//! keeps its state between chunks.

enum ParseState {
    SeekLength,
    InPacket { expected: usize, buf: Vec<u8> },
}

pub struct PacketSplitter {
    state: ParseState,
}

impl Default for PacketSplitter {
    fn default() -> Self {
        Self {
            state: ParseState::SeekLength,
        }
    }
}

impl PacketSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; `on_packet` gets each complete packet, length byte included.
    pub fn feed(&mut self, chunk: &[u8], on_packet: &mut dyn FnMut(Vec<u8>)) {
        let mut i = 0;
        while i < chunk.len() {
            match &mut self.state {
                ParseState::SeekLength => {
                    let len = chunk[i] as usize;
                    i += 1;
                    // zero bytes are line noise between packets
                    if len > 0 {
                        let mut buf = Vec::with_capacity(len + 1);
                        buf.push(len as u8);
                        self.state = ParseState::InPacket { expected: len, buf };
                    }
                }
                ParseState::InPacket { expected, buf } => {
                    let want = *expected + 1 - buf.len();
                    let take = want.min(chunk.len() - i);
                    buf.extend_from_slice(&chunk[i..i + take]);
                    i += take;
                    if buf.len() == *expected + 1 {
                        let packet = std::mem::take(buf);
                        self.state = ParseState::SeekLength;
                        on_packet(packet);
                    }
                }
            }
        }
    }

    /// Drop a partially received packet.
    pub fn reset(&mut self) {
        self.state = ParseState::SeekLength;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(chunks: &[&[u8]]) -> Vec<Vec<u8>> {
        let mut s = PacketSplitter::new();
        let mut out = Vec::new();
        for c in chunks {
            s.feed(c, &mut |p| out.push(p));
        }
        out
    }

    #[test]
    fn whole_packets_in_one_chunk() {
        let out = split(&[&[0x04, 0x02, 0x01, 0x05, 0x00, 0x02, 0xAA, 0xBB]]);
        assert_eq!(out, vec![vec![0x04, 0x02, 0x01, 0x05, 0x00], vec![0x02, 0xAA, 0xBB]]);
    }

    #[test]
    fn packet_across_reads() {
        let out = split(&[&[0x04, 0x02], &[0x01], &[0x05, 0x00, 0x01]]);
        assert_eq!(out, vec![vec![0x04, 0x02, 0x01, 0x05, 0x00]]);
    }

    #[test]
    fn zero_bytes_skipped() {
        let out = split(&[&[0x00, 0x00, 0x01, 0x7F]]);
        assert_eq!(out, vec![vec![0x01, 0x7F]]);
    }

    #[test]
    fn reset_discards_partial() {
        let mut s = PacketSplitter::new();
        let mut out = Vec::new();
        s.feed(&[0x04, 0x02, 0x01], &mut |p| out.push(p));
        s.reset();
        s.feed(&[0x01, 0x09], &mut |p| out.push(p));
        assert_eq!(out, vec![vec![0x01, 0x09]]);
    }
}
