//! Mock devices, sinks and a manual-clock rig for integration tests.
//!
//! Records every device write so tests can assert on the full command
//! history without touching real sysfs files.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::time::Duration;

use relayd::adapters::binding::ButtonBinding;
use relayd::adapters::mqtt::{MqttBridge, Topics};
use relayd::adapters::time::ManualClock;
use relayd::app::events::AppEvent;
use relayd::app::ports::{BusPort, CommandPort, DevicePort, EventSink};
use relayd::app::service::{RelayService, ServiceSettings};
use relayd::config::ButtonFlags;
use relayd::error::Error;
use relayd::events::ButtonEdge;
use relayd::scheduler::TaskScheduler;

// ── Device call record ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCall {
    Relay { relay: usize, on: bool },
    Screen(bool),
}

// ── MockDevices ───────────────────────────────────────────────

pub struct MockDevices {
    /// Current relay value bytes; `None` makes the read fail.
    pub relays: [Option<u8>; 2],
    pub temperature: Option<i32>,
    pub humidity: Option<i32>,
    pub fail_writes: bool,
    pub calls: Vec<DeviceCall>,
}

impl MockDevices {
    pub fn new() -> Self {
        Self {
            relays: [Some(b'0'), Some(b'0')],
            temperature: None,
            humidity: None,
            fail_writes: false,
            calls: Vec::new(),
        }
    }

    pub fn screen_writes(&self) -> Vec<bool> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::Screen(on) => Some(*on),
                DeviceCall::Relay { .. } => None,
            })
            .collect()
    }

    pub fn last_screen(&self) -> Option<bool> {
        self.screen_writes().last().copied()
    }
}

impl Default for MockDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl DevicePort for MockDevices {
    fn read_relay(&mut self, relay: usize) -> Option<u8> {
        *self.relays.get(relay)?
    }

    fn write_relay(&mut self, relay: usize, on: bool) -> Result<(), Error> {
        if self.fail_writes {
            return Err(Error::Device(io::Error::other("relay write refused")));
        }
        self.calls.push(DeviceCall::Relay { relay, on });
        self.relays[relay] = Some(if on { b'1' } else { b'0' });
        Ok(())
    }

    fn write_screen(&mut self, on: bool) -> Result<(), Error> {
        if self.fail_writes {
            return Err(Error::Device(io::Error::other("backlight write refused")));
        }
        self.calls.push(DeviceCall::Screen(on));
        Ok(())
    }

    fn read_temperature(&mut self) -> Option<i32> {
        self.temperature
    }

    fn read_humidity(&mut self) -> Option<i32> {
        self.humidity
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── RecordingBus ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

impl Published {
    pub fn new(topic: &str, payload: &str, retain: bool) -> Self {
        Self {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        }
    }
}

#[derive(Default)]
pub struct RecordingBus {
    pub published: Vec<Published>,
}

impl BusPort for RecordingBus {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), Error> {
        self.published.push(Published::new(topic, payload, retain));
        Ok(())
    }
}

pub type BridgeSink = ButtonBinding<MqttBridge<RecordingBus>>;

// ── Rig: service + scheduler + manual clock ───────────────────

pub struct Rig<E: EventSink + 'static> {
    pub service: RelayService<MockDevices, E>,
    pub sched: TaskScheduler<RelayService<MockDevices, E>>,
    pub clock: ManualClock,
    pub commands: Arc<dyn CommandPort>,
}

impl<E: EventSink + 'static> Rig<E> {
    pub fn build(settings: ServiceSettings, sink: impl FnOnce(Arc<dyn CommandPort>) -> E) -> Self {
        let clock = ManualClock::new();
        let sched: TaskScheduler<RelayService<MockDevices, E>> = TaskScheduler::new(clock.clone());
        let commands: Arc<dyn CommandPort> = Arc::new(sched.async_handle());
        let service = RelayService::new(MockDevices::new(), sink(Arc::clone(&commands)), settings);
        Self {
            service,
            sched,
            clock,
            commands,
        }
    }

    /// Arm the periodic poll.
    pub fn start(&mut self) {
        self.service.start(&mut self.sched);
    }

    pub fn press(&mut self, button: usize) {
        self.service.button_edge(&mut self.sched, button, ButtonEdge::Press);
    }

    pub fn release(&mut self, button: usize) {
        self.service.button_edge(&mut self.sched, button, ButtonEdge::Release);
    }

    pub fn tick(&mut self) {
        self.sched.update(&mut self.service);
    }

    /// Advance in 10 ms steps, ticking after each, like the reactor does.
    pub fn run_for(&mut self, ms: u64) {
        for _ in 0..ms / 10 {
            self.clock.advance(Duration::from_millis(10));
            self.tick();
        }
    }

    /// Jump the clock in one step, then tick once.
    pub fn jump(&mut self, by: Duration) {
        self.clock.advance(by);
        self.tick();
    }

    pub fn devices(&self) -> &MockDevices {
        self.service.devices()
    }

    pub fn devices_mut(&mut self) -> &mut MockDevices {
        self.service.devices_mut()
    }
}

impl Rig<RecordingSink> {
    pub fn new() -> Self {
        Self::with_settings(ServiceSettings::default())
    }

    pub fn with_settings(settings: ServiceSettings) -> Self {
        Self::build(settings, |_| RecordingSink::default())
    }

    pub fn events(&self) -> &[AppEvent] {
        &self.service.sink().events
    }

    pub fn clear_events(&mut self) {
        self.service.sink_mut().events.clear();
    }
}

impl Rig<BridgeSink> {
    /// Full outbound chain under prefix `Relay`: binding → bridge → bus.
    pub fn bridged(flags: [ButtonFlags; 2]) -> Self {
        Self::build(ServiceSettings::default(), |commands| {
            let bridge = MqttBridge::new(RecordingBus::default(), Topics::new("Relay"), flags);
            ButtonBinding::new(flags, commands, bridge)
        })
    }

    pub fn published(&self) -> &[Published] {
        &self.service.sink().inner().bus().published
    }

    pub fn clear_published(&mut self) {
        self.service.sink_mut().inner_mut().bus_mut().published.clear();
    }
}
