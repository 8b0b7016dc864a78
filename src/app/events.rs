//! Outbound application events.
//!
//! The [`RelayService`](super::service::RelayService) and the gesture
//! classifier emit these through the [`EventSink`](super::ports::EventSink)
//! port.  Adapters on the other side decide what to do with them: publish
//! over MQTT, log, or record them in a test.

/// Structured events emitted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Press/release sequence resolved as `clicks` clicks.
    ButtonClicked { button: usize, clicks: u32 },

    /// Button held; repeats while the hold lasts.
    ButtonHeld { button: usize, clicks: u32 },

    /// Button released after at least one `ButtonHeld`.
    ButtonReleased { button: usize, clicks: u32 },

    /// Relay value file changed since the last successful read.
    RelayStateChanged { relay: usize, on: bool },

    /// Temperature moved by more than the change threshold.
    TemperatureChanged { millidegrees: i32 },

    /// Humidity moved by more than the change threshold.
    HumidityChanged { millipercent: i32 },

    /// First proximity reading of a batch at or above the threshold.
    ProximityTriggered { value: i32 },
}

/// Render a milli-unit reading as a decimal string (`21500` → `"21.500"`).
pub fn milli_to_decimal(milli: i32) -> String {
    format!("{:.3}", f64::from(milli) / 1000.0)
}
