//! Fuzz target: `FrameDecoder::feed`
//!
//! Drives arbitrary byte sequences into the streaming heater-bus decoder
//! and asserts that every frame it yields re-encodes to a checksum-valid
//! frame, that the buffer never exceeds its bound, and that feeding the
//! same bytes one at a time yields the same frames.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use sunster::protocol::frame::{checksum, MAX_FRAME_LEN, MAX_PAYLOAD};
use sunster::protocol::FrameDecoder;

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();
    let mut bulk = Vec::new();
    decoder.feed(data, |frame| bulk.push(frame));

    for frame in &bulk {
        assert!(frame.payload.len() <= MAX_PAYLOAD);
        let bytes = frame.encode();
        let n = bytes.len();
        assert_eq!(
            bytes[n - 1],
            checksum(bytes[1], bytes[2], bytes[3], &bytes[4..n - 1])
        );
    }
    assert!(decoder.buffered() <= 2 * MAX_FRAME_LEN);

    // Byte-at-a-time delivery must agree with bulk delivery.
    decoder.reset();
    let mut single = Vec::new();
    for &b in data {
        if let Some(frame) = decoder.push(b) {
            single.push(frame);
            while let Some(frame) = decoder.poll() {
                single.push(frame);
            }
        }
    }
    assert_eq!(single, bulk);
});
