//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every application event to the
//! log.  Used when no broker is configured (or `--no-bus`), so the device
//! still works as a plain local controller.

use log::info;

use crate::app::events::{AppEvent, milli_to_decimal};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match *event {
            AppEvent::ButtonClicked { button, clicks } => {
                info!("BUTTON | {} clicked x{}", button, clicks);
            }
            AppEvent::ButtonHeld { button, clicks } => {
                info!("BUTTON | {} held (clicks={})", button, clicks);
            }
            AppEvent::ButtonReleased { button, clicks } => {
                info!("BUTTON | {} released (clicks={})", button, clicks);
            }
            AppEvent::RelayStateChanged { relay, on } => {
                info!("RELAY  | {} -> {}", relay, if on { "ON" } else { "OFF" });
            }
            AppEvent::TemperatureChanged { millidegrees } => {
                info!("SENSOR | T={}\u{00b0}C", milli_to_decimal(millidegrees));
            }
            AppEvent::HumidityChanged { millipercent } => {
                info!("SENSOR | RH={}%", milli_to_decimal(millipercent));
            }
            AppEvent::ProximityTriggered { value } => {
                info!("PROX   | triggered ({})", value);
            }
        }
    }
}
