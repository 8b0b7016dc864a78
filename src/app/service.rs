//! Relay service: the hexagonal core.
//!
//! [`RelayService`] owns the gesture state, the device shadows and the
//! local UI policy (screen wake / idle timeout).  It is the state type the
//! [`TaskScheduler`] runs its tasks against.  All I/O flows through port
//! traits, making the entire service testable with mock adapters.
//!
//! ```text
//!  reactor edges ──▶ ┌────────────────────────────┐ ──▶ EventSink
//!                    │        RelayService        │
//!   AsyncHandle  ──▶ │  gestures · shadows ·      │ ◀─▶ DevicePort
//!   (commands)       │  screen idle timer         │
//!                    └────────────────────────────┘
//! ```

use std::time::Duration;

use log::{debug, info, trace, warn};

use crate::config::RelayConfig;
use crate::drivers::button::{self, BUTTON_COUNT, ButtonState, GestureHost};
use crate::events::{ButtonEdge, EV_KEY, InputEvent};
use crate::scheduler::{AsyncHandle, GroupId, TaskScheduler};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{CommandPort, DevicePort, EventSink};

/// Scheduler group holding the single screen-off timer.
pub const SCREEN_GROUP: GroupId = 2;

/// Relay and sensor re-read cadence.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Sensor readings must move by more than this (milli-units) to be reported.
pub const SENSOR_CHANGE_THRESHOLD: u32 = 100;

pub const RELAY_COUNT: usize = 2;

/// Tunables the core consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub screen_timeout: Duration,
    pub proximity_threshold: i32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            screen_timeout: Duration::from_secs(20),
            proximity_threshold: 5000,
        }
    }
}

impl From<&RelayConfig> for ServiceSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            screen_timeout: config.screen_timeout(),
            proximity_threshold: config.proximity_threshold(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// RelayService
// ───────────────────────────────────────────────────────────────

pub struct RelayService<D, E> {
    devices: D,
    sink: E,
    settings: ServiceSettings,
    buttons: [ButtonState; BUTTON_COUNT],
    /// Last relay value byte read; `None` = unknown.
    relay_shadow: [Option<u8>; RELAY_COUNT],
    temperature_shadow: Option<i32>,
    humidity_shadow: Option<i32>,
    /// Last value commanded to the backlight.
    screen_on: bool,
}

impl<D, E> RelayService<D, E>
where
    D: DevicePort + 'static,
    E: EventSink + 'static,
{
    pub fn new(devices: D, sink: E, settings: ServiceSettings) -> Self {
        Self {
            devices,
            sink,
            settings,
            buttons: [ButtonState::default(); BUTTON_COUNT],
            relay_shadow: [None; RELAY_COUNT],
            temperature_shadow: None,
            humidity_shadow: None,
            screen_on: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Arm the repeating relay/sensor poll.
    pub fn start(&self, sched: &mut TaskScheduler<Self>) {
        sched.schedule(POLL_INTERVAL, |svc: &mut Self, ctx| {
            svc.poll_devices();
            ctx.repeat();
        });
        info!(
            "RelayService started (screen timeout {:?}, proximity threshold {})",
            self.settings.screen_timeout, self.settings.proximity_threshold
        );
    }

    // ── Reactor inputs ────────────────────────────────────────

    /// Edge read from button `button`'s value file.
    pub fn button_edge(&mut self, sched: &mut TaskScheduler<Self>, button: usize, edge: ButtonEdge) {
        match edge {
            ButtonEdge::Press => button::on_press(self, sched, button),
            ButtonEdge::Release => button::on_release(self, sched, button),
        }
    }

    /// Batch drained from the touch screen input device.
    pub fn screen_input(&mut self, sched: &mut TaskScheduler<Self>, events: &[InputEvent]) {
        if events.iter().any(|e| e.kind == EV_KEY) {
            self.screen_power(sched, true);
        }
    }

    /// Batch drained from the proximity device.
    ///
    /// Only the first record is used (LED A); the rest of the batch is
    /// discarded.
    pub fn proximity_input(&mut self, sched: &mut TaskScheduler<Self>, events: &[InputEvent]) {
        let Some(led_a) = events.first().map(|e| e.value) else {
            return;
        };
        if led_a >= self.settings.proximity_threshold {
            self.screen_power(sched, true);
            self.sink.emit(&AppEvent::ProximityTriggered { value: led_a });
        }
    }

    /// Batch drained from an ambient light device.  Payload is reserved.
    pub fn ambient_light_input(&mut self, events: &[InputEvent]) {
        trace!("ambient light: {} records ignored", events.len());
    }

    // ── Periodic poll ─────────────────────────────────────────

    /// Re-read relays and sensors, emitting only what changed.
    pub fn poll_devices(&mut self) {
        for relay in 0..RELAY_COUNT {
            let Some(value) = self.devices.read_relay(relay) else {
                continue;
            };
            if self.relay_shadow[relay] != Some(value) {
                self.relay_shadow[relay] = Some(value);
                self.sink.emit(&AppEvent::RelayStateChanged {
                    relay,
                    on: value == b'1',
                });
            }
        }

        let reading = self.devices.read_temperature();
        if let Some(millidegrees) = sensor_changed(reading, &mut self.temperature_shadow) {
            self.sink.emit(&AppEvent::TemperatureChanged { millidegrees });
        }
        let reading = self.devices.read_humidity();
        if let Some(millipercent) = sensor_changed(reading, &mut self.humidity_shadow) {
            self.sink.emit(&AppEvent::HumidityChanged { millipercent });
        }
    }

    /// Forget all shadows; the next poll re-emits every current value.
    pub fn reset_state(&mut self) {
        self.relay_shadow = [None; RELAY_COUNT];
        self.temperature_shadow = None;
        self.humidity_shadow = None;
        debug!("shadows cleared");
    }

    // ── Screen policy ─────────────────────────────────────────

    /// Screen on (re-arming the idle timer) or off immediately.
    pub fn screen_power(&mut self, sched: &mut TaskScheduler<Self>, on: bool) {
        sched.cancel_group(SCREEN_GROUP);
        self.write_backlight(on);
        if on {
            sched.schedule_in_group(self.settings.screen_timeout, SCREEN_GROUP, |svc: &mut Self, _| {
                debug!("screen idle timeout");
                svc.write_backlight(false);
            });
        }
    }

    fn write_backlight(&mut self, on: bool) {
        match self.devices.write_screen(on) {
            Ok(()) => self.screen_on = on,
            Err(e) => warn!("backlight write failed: {}", e),
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Execute an inbound command.  Runs on the reactor thread.
    pub fn handle_command(&mut self, sched: &mut TaskScheduler<Self>, cmd: AppCommand) {
        debug!("command: {:?}", cmd);
        match cmd {
            AppCommand::SetRelay { relay, on } => self.write_relay(relay, on),
            AppCommand::ToggleRelay(relay) => match self.devices.read_relay(relay) {
                Some(value) => self.write_relay(relay, value == b'0'),
                None => warn!("relay {} toggle skipped: state unreadable", relay),
            },
            AppCommand::SetScreen(on) => self.screen_power(sched, on),
            AppCommand::ResetState => self.reset_state(),
        }
    }

    fn write_relay(&mut self, relay: usize, on: bool) {
        if relay >= RELAY_COUNT {
            warn!("no relay {}", relay);
            return;
        }
        if let Err(e) = self.devices.write_relay(relay, on) {
            warn!("relay {} write failed: {}", relay, e);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn button_state(&self, button: usize) -> ButtonState {
        self.buttons[button]
    }

    pub fn relay_shadow(&self, relay: usize) -> Option<u8> {
        self.relay_shadow[relay]
    }

    pub fn temperature_shadow(&self) -> Option<i32> {
        self.temperature_shadow
    }

    pub fn humidity_shadow(&self) -> Option<i32> {
        self.humidity_shadow
    }

    pub fn screen_on(&self) -> bool {
        self.screen_on
    }

    pub fn settings(&self) -> ServiceSettings {
        self.settings
    }

    pub fn devices(&self) -> &D {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut D {
        &mut self.devices
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut E {
        &mut self.sink
    }
}

impl<D, E> GestureHost for RelayService<D, E>
where
    D: DevicePort + 'static,
    E: EventSink + 'static,
{
    fn button_mut(&mut self, button: usize) -> &mut ButtonState {
        &mut self.buttons[button]
    }

    fn wake_screen(&mut self, sched: &mut TaskScheduler<Self>) {
        self.screen_power(sched, true);
    }

    fn gesture(&mut self, event: AppEvent) {
        self.sink.emit(&event);
    }
}

/// Commands from any thread land on the reactor through the async queue.
impl<D, E> CommandPort for AsyncHandle<RelayService<D, E>>
where
    D: DevicePort + 'static,
    E: EventSink + 'static,
{
    fn send(&self, cmd: AppCommand) {
        self.submit(move |svc: &mut RelayService<D, E>, ctx| svc.handle_command(ctx, cmd));
    }
}

/// New reading worth reporting?  Failed reads never move the shadow.
fn sensor_changed(reading: Option<i32>, shadow: &mut Option<i32>) -> Option<i32> {
    let value = reading?;
    let changed = match *shadow {
        None => true,
        Some(last) => value.abs_diff(last) > SENSOR_CHANGE_THRESHOLD,
    };
    if changed {
        *shadow = Some(value);
        Some(value)
    } else {
        None
    }
}
