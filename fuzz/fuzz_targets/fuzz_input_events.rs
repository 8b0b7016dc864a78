//! Fuzz target: evdev record decoding
//!
//! Feeds arbitrary bytes through `InputEvent::from_bytes` in whole-record
//! chunks, the way the reactor drains an input device.
//!
//! Invariants checked:
//! - No panics under arbitrary byte inputs
//! - Decoding then re-encoding keeps type, code and value
//!
//! cargo fuzz run fuzz_input_events

#![no_main]

use libfuzzer_sys::fuzz_target;
use relayd::events::{INPUT_EVENT_SIZE, InputEvent};

fuzz_target!(|data: &[u8]| {
    for chunk in data.chunks_exact(INPUT_EVENT_SIZE) {
        let Ok(raw) = <&[u8; INPUT_EVENT_SIZE]>::try_from(chunk) else {
            return;
        };
        let event = InputEvent::from_bytes(raw);
        assert_eq!(InputEvent::from_bytes(&event.to_bytes()), event);
    }
});
