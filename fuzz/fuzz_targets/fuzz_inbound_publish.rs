//! Fuzz target: inbound MQTT routing (`Topics::route` + `parse_state`)
//!
//! Splits the input into a topic and a payload at the first NUL byte.
//!
//! Invariants checked:
//! - No panics under any topic or payload bytes
//! - A routed command always carries the state `parse_state` gives
//! - Only the three command topics ever route
//!
//! cargo fuzz run fuzz_inbound_publish

#![no_main]

use libfuzzer_sys::fuzz_target;
use relayd::adapters::mqtt::Topics;
use relayd::app::commands::{AppCommand, parse_state};

fuzz_target!(|data: &[u8]| {
    let (topic, payload) = match data.iter().position(|&b| b == 0) {
        Some(at) => (&data[..at], &data[at + 1..]),
        None => (data, &[][..]),
    };
    let Ok(topic) = std::str::from_utf8(topic) else {
        return;
    };

    let topics = Topics::new("Relay");
    let Some(cmd) = topics.route(topic, payload) else {
        return;
    };

    let state = parse_state(payload);
    match cmd {
        AppCommand::SetRelay { relay, on } => {
            assert!(relay < 2);
            assert_eq!(topic, format!("Relay/relays/{relay}"));
            assert_eq!(Some(on), state);
        }
        AppCommand::SetScreen(on) => {
            assert_eq!(topic, "Relay/screen");
            assert_eq!(Some(on), state);
        }
        other => panic!("bus routed to {other:?}"),
    }
});
