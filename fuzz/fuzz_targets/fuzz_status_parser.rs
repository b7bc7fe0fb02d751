//! Fuzz target: status / command payload parsers
//!
//! Wraps arbitrary payloads in a frame and runs both parsers; neither may
//! panic, and a parsed status must re-encode to the same leading fields.
//!
//! cargo fuzz run fuzz_status_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use sunster::protocol::frame::MAX_PAYLOAD;
use sunster::protocol::messages::{parse_command, StatusFrame, OPCODE_STATUS};
use sunster::protocol::{Address, HeaterFrame};

fuzz_target!(|data: &[u8]| {
    let payload = &data[..data.len().min(MAX_PAYLOAD)];
    let Ok(frame) = HeaterFrame::new(Address::Heater, OPCODE_STATUS, payload) else {
        return;
    };
    if let Ok(status) = StatusFrame::from_frame(&frame) {
        assert_eq!(StatusFrame::from_frame(&status.to_frame()), Ok(status));
    }

    if let Some((&opcode, rest)) = data.split_first() {
        let rest = &rest[..rest.len().min(MAX_PAYLOAD)];
        if let Ok(frame) = HeaterFrame::new(Address::Controller, opcode, rest) {
            let _ = parse_command(&frame);
        }
    }
});
