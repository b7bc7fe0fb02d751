//! Streaming frame decoder.
//!
//! The codec accumulates incoming bytes and yields complete frames.  A
//! single UART read may return part of a header, part of a payload, or
//! several frames back to back; our own transmissions also echo back on
//! the shared wire.
//!
//! Anything that fails validation (unknown address, oversize length,
//! checksum mismatch) costs exactly one byte: the candidate start marker
//! is dropped and the buffer is rescanned for the next `0xAA`.  A frame
//! that starts inside the payload of a corrupted one is therefore still
//! recovered.  Resync can free more than one complete frame at once, so
//! after [`FrameDecoder::push`] the caller drains the rest with
//! [`FrameDecoder::poll`]; [`FrameDecoder::feed`] does both.

use heapless::Vec;
use log::{debug, warn};

use super::frame::{checksum, Address, HeaterFrame, FRAME_START, HEADER_LEN, MAX_FRAME_LEN, MAX_PAYLOAD};
use crate::error::ProtocolError;

/// Two worst-case frames of receive buffer.
const RX_BUFFER_SIZE: usize = 2 * MAX_FRAME_LEN;

/// Decoder counters, exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames that passed every check.
    pub frames: u32,
    pub checksum_errors: u32,
    /// Start markers rejected for a bad address or length.
    pub header_errors: u32,
    pub overflows: u32,
    /// Bytes skipped while hunting for a start marker.
    pub discarded_bytes: u32,
}

/// Streaming frame decoder.
pub struct FrameDecoder {
    buf: Vec<u8, RX_BUFFER_SIZE>,
    stats: DecoderStats,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            stats: DecoderStats::default(),
        }
    }

    /// Feed one byte.  Returns a frame when this byte completes one; any
    /// further complete frames stay buffered for [`poll`](Self::poll).
    pub fn push(&mut self, byte: u8) -> Option<HeaterFrame> {
        if self.buf.is_empty() && byte != FRAME_START {
            self.stats.discarded_bytes = self.stats.discarded_bytes.saturating_add(1);
            return None;
        }
        if self.buf.push(byte).is_err() {
            warn!("frame decoder: {}", ProtocolError::Overflow);
            self.stats.overflows = self.stats.overflows.saturating_add(1);
            self.buf.clear();
            return None;
        }
        self.scan()
    }

    /// Next complete frame already in the buffer, without new input.
    pub fn poll(&mut self) -> Option<HeaterFrame> {
        if self.buf.is_empty() {
            return None;
        }
        self.scan()
    }

    /// Feed a chunk, invoking `on_frame` for every frame it completes.
    pub fn feed(&mut self, data: &[u8], mut on_frame: impl FnMut(HeaterFrame)) {
        for &b in data {
            if let Some(frame) = self.push(b) {
                on_frame(frame);
                while let Some(frame) = self.poll() {
                    on_frame(frame);
                }
            }
        }
    }

    /// Drop any partial frame (e.g. after the UART was reconfigured).
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Bytes currently held waiting for a frame to complete.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    // ── Internals ─────────────────────────────────────────────

    fn scan(&mut self) -> Option<HeaterFrame> {
        loop {
            match self.buf.iter().position(|&b| b == FRAME_START) {
                None => {
                    self.discard(self.buf.len());
                    return None;
                }
                Some(0) => {}
                Some(skip) => self.discard(skip),
            }

            match self.try_frame() {
                Ok(Some(frame)) => return Some(frame),
                Ok(None) => return None,
                Err(e) => {
                    debug!("frame decoder: {e}, resyncing");
                    match e {
                        ProtocolError::ChecksumMismatch => {
                            self.stats.checksum_errors = self.stats.checksum_errors.saturating_add(1);
                        }
                        _ => self.stats.header_errors = self.stats.header_errors.saturating_add(1),
                    }
                    self.drop_front(1);
                }
            }
        }
    }

    /// Validate the frame at the head of the buffer.
    ///
    /// `Ok(None)` means more bytes are needed.
    fn try_frame(&mut self) -> Result<Option<HeaterFrame>, ProtocolError> {
        let Some(&addr) = self.buf.get(1) else {
            return Ok(None);
        };
        let address = Address::from_byte(addr).ok_or(ProtocolError::UnknownAddress(addr))?;

        let Some(&len) = self.buf.get(2) else {
            return Ok(None);
        };
        if usize::from(len) > MAX_PAYLOAD {
            return Err(ProtocolError::LengthOutOfRange(len));
        }

        let total = HEADER_LEN + usize::from(len) + 1;
        if self.buf.len() < total {
            return Ok(None);
        }

        let opcode = self.buf[3];
        let payload = &self.buf[HEADER_LEN..total - 1];
        if checksum(addr, len, opcode, payload) != self.buf[total - 1] {
            return Err(ProtocolError::ChecksumMismatch);
        }

        let frame = HeaterFrame::new(address, opcode, payload)?;
        self.drop_front(total);
        self.stats.frames = self.stats.frames.saturating_add(1);
        Ok(Some(frame))
    }

    fn discard(&mut self, n: usize) {
        self.stats.discarded_bytes = self.stats.discarded_bytes.saturating_add(n as u32);
        self.drop_front(n);
    }

    fn drop_front(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        let remaining = self.buf.len() - n;
        self.buf.copy_within(n.., 0);
        self.buf.truncate(remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_bytes() -> Vec<u8, MAX_FRAME_LEN> {
        HeaterFrame::new(Address::Heater, 0x01, &[3, 8, 0, 125])
            .unwrap()
            .encode()
    }

    fn decode_all(dec: &mut FrameDecoder, data: &[u8]) -> std::vec::Vec<HeaterFrame> {
        let mut out = std::vec::Vec::new();
        dec.feed(data, |f| out.push(f));
        out
    }

    #[test]
    fn decodes_single_frame() {
        let mut dec = FrameDecoder::new();
        let frames = decode_all(&mut dec, &status_bytes());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].address, Address::Heater);
        assert_eq!(&frames[0].payload[..], &[3, 8, 0, 125]);
        assert_eq!(dec.buffered(), 0);
    }

    #[test]
    fn handles_byte_at_a_time() {
        let mut dec = FrameDecoder::new();
        let bytes = status_bytes();
        let (last, head) = bytes.split_last().unwrap();
        for &b in head {
            assert!(dec.push(b).is_none());
        }
        assert!(dec.push(*last).is_some());
    }

    #[test]
    fn skips_leading_noise() {
        let mut dec = FrameDecoder::new();
        let mut data = std::vec![0x00, 0x13, 0x37];
        data.extend_from_slice(&status_bytes());
        assert_eq!(decode_all(&mut dec, &data).len(), 1);
        assert_eq!(dec.stats().discarded_bytes, 3);
    }

    #[test]
    fn bad_checksum_is_dropped_and_next_frame_recovered() {
        let mut dec = FrameDecoder::new();
        let mut bad = status_bytes();
        let last = bad.len() - 1;
        bad[last] ^= 0x01;
        let mut data = std::vec::Vec::from(&bad[..]);
        data.extend_from_slice(&status_bytes());

        let frames = decode_all(&mut dec, &data);
        assert_eq!(frames.len(), 1);
        assert_eq!(dec.stats().checksum_errors, 1);
    }

    #[test]
    fn stray_start_marker_does_not_desync() {
        let mut dec = FrameDecoder::new();
        // A lone 0xAA followed by a bogus address, then a real frame.
        let mut data = std::vec![0xAA, 0x12];
        data.extend_from_slice(&status_bytes());
        assert_eq!(decode_all(&mut dec, &data).len(), 1);
        assert_eq!(dec.stats().header_errors, 1);
    }

    #[test]
    fn truncated_frame_followed_by_full_frame() {
        let mut dec = FrameDecoder::new();
        let full = status_bytes();
        let mut data = std::vec::Vec::from(&full[..5]);
        data.extend_from_slice(&full);
        // The partial frame's declared length swallows part of the second
        // frame and fails the checksum; resync then finds the real one.
        assert_eq!(decode_all(&mut dec, &data).len(), 1);
    }

    #[test]
    fn resync_releases_every_buffered_frame() {
        let mut dec = FrameDecoder::new();
        let first = status_bytes();
        let second = HeaterFrame::new(Address::Controller, 0x08, &[5, 20]).unwrap().encode();

        // A heater frame whose declared length swallows both real frames,
        // closed by a wrong checksum.
        let mut inner = std::vec::Vec::from(&first[..]);
        inner.extend_from_slice(&second);
        let len = inner.len() as u8;
        let good = checksum(0x77, len, 0x01, &inner);
        let bad = if good.wrapping_add(1) == FRAME_START { good.wrapping_add(2) } else { good.wrapping_add(1) };

        let mut data = std::vec![FRAME_START, 0x77, len, 0x01];
        data.extend_from_slice(&inner);
        data.push(bad);

        let frames = decode_all(&mut dec, &data);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].address, Address::Controller);
        assert_eq!(dec.buffered(), 0);
        assert_eq!(dec.stats().checksum_errors, 1);
    }

    #[test]
    fn push_leaves_extra_frames_for_poll() {
        let mut dec = FrameDecoder::new();
        let first = status_bytes();
        let mut inner = std::vec::Vec::from(&first[..]);
        inner.extend_from_slice(&first);
        let len = inner.len() as u8;
        let bad = checksum(0x77, len, 0x01, &inner) ^ 0x01;

        let mut data = std::vec![FRAME_START, 0x77, len, 0x01];
        data.extend_from_slice(&inner);
        data.push(bad);

        let got: std::vec::Vec<_> = data.iter().filter_map(|&b| dec.push(b)).collect();
        assert_eq!(got.len(), 1);
        assert!(dec.poll().is_some());
        assert!(dec.poll().is_none());
    }

    #[test]
    fn oversize_length_rejected() {
        let mut dec = FrameDecoder::new();
        assert!(dec.push(0xAA).is_none());
        assert!(dec.push(0x77).is_none());
        assert!(dec.push(65).is_none());
        assert_eq!(dec.stats().header_errors, 1);
        assert_eq!(dec.buffered(), 0);
    }

    #[test]
    fn back_to_back_frames() {
        let mut dec = FrameDecoder::new();
        let mut data = std::vec::Vec::from(&status_bytes()[..]);
        let cmd = HeaterFrame::new(Address::Controller, 0x08, &[5, 20]).unwrap();
        data.extend_from_slice(&cmd.encode());
        let frames = decode_all(&mut dec, &data);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], cmd);
    }
}
