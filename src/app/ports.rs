//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ RelayService (domain)
//! ```
//!
//! Driven adapters (device files, the MQTT bridge, clocks) implement these
//! traits.  The [`RelayService`](super::service::RelayService) consumes
//! them via generics, so the domain core never touches a file descriptor
//! directly and the whole engine runs against mocks on the host.

use std::io;
use std::time::Instant;

use crate::error::Error;

// ───────────────────────────────────────────────────────────────
// Device port (driven adapter: domain ↔ sysfs)
// ───────────────────────────────────────────────────────────────

/// Value-file access the service needs for relays, backlight and sensors.
///
/// Reads return `None` on any failure; the caller treats that as "no new
/// information this cycle".  Writes report failure so the caller can log
/// it, but nothing retries.
pub trait DevicePort {
    /// Current relay value byte (`b'0'` / `b'1'`), `relay` ∈ {0, 1}.
    fn read_relay(&mut self, relay: usize) -> Option<u8>;

    /// Drive a relay value file.
    fn write_relay(&mut self, relay: usize, on: bool) -> Result<(), Error>;

    /// Drive the screen backlight value file.
    fn write_screen(&mut self, on: bool) -> Result<(), Error>;

    /// Temperature in millidegrees Celsius.
    fn read_temperature(&mut self) -> Option<i32>;

    /// Relative humidity in milli-percent.
    fn read_humidity(&mut self) -> Option<i32>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → bus / logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits [`AppEvent`](super::events::AppEvent)s through this
/// port.  Adapters decide where they go (MQTT, log, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Bus port (driven adapter: bridge → broker)
// ───────────────────────────────────────────────────────────────

/// Outbound half of the message bus as seen by the bridge.
pub trait BusPort {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), Error>;
}

// ───────────────────────────────────────────────────────────────
// Command port (driving adapter: bus / bridge → domain)
// ───────────────────────────────────────────────────────────────

/// Inbound commands.  Callable from any thread; the command itself runs
/// later on the reactor thread.
pub trait CommandPort: Send + Sync {
    fn send(&self, cmd: super::commands::AppCommand);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source for the scheduler.
pub trait TimePort {
    fn now(&self) -> Instant;
}

/// Relay index outside {0, 1}.
pub fn bad_relay(relay: usize) -> Error {
    Error::Device(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("no relay {relay}"),
    ))
}
