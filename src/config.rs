//! Daemon configuration.
//!
//! Loaded once at startup from a TOML file.  Unknown keys are ignored;
//! missing keys take the defaults below.  Out-of-range timing values are
//! reported and replaced by their defaults rather than aborting, matching
//! how the device has always treated a sloppy config file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bitflags::bitflags;
use log::{info, warn};
use serde::Deserialize;

use crate::app::commands::parse_state;
use crate::error::{Error, Result};

/// Default config location on the device.
pub const DEFAULT_CONFIG_PATH: &str = "/sdcard/relayd.toml";

pub const DEFAULT_SCREEN_TIMEOUT_SECS: i64 = 20;
/// Longest accepted screen timeout (one day).
pub const MAX_SCREEN_TIMEOUT_SECS: i64 = 24 * 60 * 60;
pub const DEFAULT_PROXIMITY_THRESHOLD: i64 = 5000;
pub const DEFAULT_MQTT_PORT: u16 = 1883;

bitflags! {
    /// Per-button behaviour: local toggle and which gestures are published.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ButtonFlags: u8 {
        /// A single click toggles the button's relay locally.
        const TOGGLE = 1;
        const SEND_CLICK = 1 << 1;
        const SEND_HELD = 1 << 2;
        const SEND_RELEASE = 1 << 3;
    }
}

impl Default for ButtonFlags {
    fn default() -> Self {
        Self::SEND_CLICK | Self::SEND_HELD
    }
}

/// A boolean written as `true`, `"ON"`, `1`, ...
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StateSetting {
    Flag(bool),
    Number(i64),
    Text(String),
}

impl StateSetting {
    pub fn value(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            Self::Number(1) => Some(true),
            Self::Number(0) => Some(false),
            Self::Number(_) => None,
            Self::Text(s) => parse_state(s.as_bytes()),
        }
    }
}

/// Broker endpoint parsed from `mqtt_address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl BrokerAddress {
    /// Accepts `host`, `host:port`, `tcp://host:port` or `mqtt://host:port`.
    pub fn parse(address: &str) -> Result<Self> {
        let rest = address.trim();
        let rest = rest
            .strip_prefix("tcp://")
            .or_else(|| rest.strip_prefix("mqtt://"))
            .unwrap_or(rest);

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Error::Config(format!("bad port in mqtt_address {address:?}")))?;
                (host, port)
            }
            None => (rest, DEFAULT_MQTT_PORT),
        };

        if host.is_empty() {
            return Err(Error::Config(format!("no host in mqtt_address {address:?}")));
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

/// Settings file as written on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Broker address; absent means local-only mode.
    pub mqtt_address: Option<String>,
    pub mqtt_client_id: String,
    pub mqtt_topic_prefix: String,
    pub mqtt_keep_alive_secs: u64,

    /// Screen idle timeout in seconds.
    pub screen_timeout: i64,
    /// Minimum first proximity reading that counts as a presence.
    pub proximity_threshold: i64,

    /// Raw [`ButtonFlags`] bits for the upper button.
    pub relay_upper_flags: i64,
    /// Raw [`ButtonFlags`] bits for the lower button.
    pub relay_lower_flags: i64,

    pub initial_relay_upper_state: Option<StateSetting>,
    pub initial_relay_lower_state: Option<StateSetting>,

    /// Also open and drain the two ambient light streams.
    pub ambient_light: bool,

    /// Also write logs to this file (rotated daily, one old file kept).
    pub log_file: Option<PathBuf>,

    /// Enable debug logging.
    pub debug: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mqtt_address: None,
            mqtt_client_id: "Relay".to_string(),
            mqtt_topic_prefix: "Relay".to_string(),
            mqtt_keep_alive_secs: 10,
            screen_timeout: DEFAULT_SCREEN_TIMEOUT_SECS,
            proximity_threshold: DEFAULT_PROXIMITY_THRESHOLD,
            relay_upper_flags: i64::from(ButtonFlags::default().bits()),
            relay_lower_flags: i64::from(ButtonFlags::default().bits()),
            initial_relay_upper_state: None,
            initial_relay_lower_state: None,
            ambient_light: false,
            log_file: None,
            debug: false,
        }
    }
}

impl RelayConfig {
    /// Read and validate the config file.  Missing or unparseable is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("can't load {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.normalize()?;
        Ok(config)
    }

    fn normalize(&mut self) -> Result<()> {
        if self.screen_timeout <= 0 || self.screen_timeout > MAX_SCREEN_TIMEOUT_SECS {
            warn!(
                "screen_timeout {} ignored, using {}s",
                self.screen_timeout, DEFAULT_SCREEN_TIMEOUT_SECS
            );
            self.screen_timeout = DEFAULT_SCREEN_TIMEOUT_SECS;
        }
        if self.proximity_threshold <= 0 || self.proximity_threshold > i64::from(i32::MAX) {
            warn!(
                "proximity_threshold {} ignored, using {}",
                self.proximity_threshold, DEFAULT_PROXIMITY_THRESHOLD
            );
            self.proximity_threshold = DEFAULT_PROXIMITY_THRESHOLD;
        }
        if self.mqtt_keep_alive_secs == 0 {
            return Err(Error::Config("mqtt_keep_alive_secs must be > 0".into()));
        }

        let prefix = self.mqtt_topic_prefix.trim().trim_end_matches('/');
        if prefix.is_empty() {
            return Err(Error::Config("mqtt_topic_prefix must not be empty".into()));
        }
        self.mqtt_topic_prefix = prefix.to_string();

        if self.mqtt_client_id.trim().is_empty() {
            return Err(Error::Config("mqtt_client_id must not be empty".into()));
        }

        if self
            .log_file
            .as_deref()
            .is_some_and(|p| p.file_name().is_none())
        {
            return Err(Error::Config("log_file must name a file".into()));
        }

        if let Some(address) = &self.mqtt_address {
            BrokerAddress::parse(address)?;
        }
        for (name, setting) in [
            ("initial_relay_upper_state", &self.initial_relay_upper_state),
            ("initial_relay_lower_state", &self.initial_relay_lower_state),
        ] {
            if let Some(setting) = setting {
                if setting.value().is_none() {
                    warn!("{} = {:?} is not a state, ignored", name, setting);
                }
            }
        }
        Ok(())
    }

    pub fn screen_timeout(&self) -> Duration {
        Duration::from_secs(self.screen_timeout as u64)
    }

    pub fn proximity_threshold(&self) -> i32 {
        self.proximity_threshold as i32
    }

    /// Flags of button `button` (unknown bits dropped).
    pub fn button_flags(&self, button: usize) -> ButtonFlags {
        let bits = if button == 0 {
            self.relay_upper_flags
        } else {
            self.relay_lower_flags
        };
        ButtonFlags::from_bits_truncate((bits & 0xFF) as u8)
    }

    /// Configured power-on state of relay `relay`, if any.
    pub fn initial_relay_state(&self, relay: usize) -> Option<bool> {
        let setting = if relay == 0 {
            &self.initial_relay_upper_state
        } else {
            &self.initial_relay_lower_state
        };
        setting.as_ref().and_then(StateSetting::value)
    }

    pub fn broker(&self) -> Option<BrokerAddress> {
        self.mqtt_address
            .as_deref()
            .and_then(|a| BrokerAddress::parse(a).ok())
    }
}
