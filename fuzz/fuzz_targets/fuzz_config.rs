//! Fuzz target: `RelayConfig::from_toml_str`
//!
//! Invariants checked:
//! - No panics under arbitrary file contents
//! - An accepted config always yields a screen timeout of at most a day,
//!   a positive proximity threshold and a non-empty topic prefix
//!
//! cargo fuzz run fuzz_config

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::time::Duration;

use relayd::config::{MAX_SCREEN_TIMEOUT_SECS, RelayConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = RelayConfig::from_toml_str(text) else {
        return;
    };
    assert!(!config.screen_timeout().is_zero());
    assert!(config.screen_timeout() <= Duration::from_secs(MAX_SCREEN_TIMEOUT_SECS as u64));
    assert!(config.proximity_threshold() > 0);
    assert!(!config.mqtt_topic_prefix.is_empty());
    assert!(!config.mqtt_topic_prefix.ends_with('/'));
});
