//! MQTT bridge.
//!
//! Outbound, [`MqttBridge`] maps [`AppEvent`]s to topics under the
//! configured prefix, gated by each button's [`ButtonFlags`].  Inbound,
//! the connection thread routes `P/relays/{0,1}` and `P/screen` publishes
//! to [`AppCommand`]s and hands them to the reactor through a
//! [`CommandPort`].
//!
//! | Topic                           | Payload         | Retained |
//! |---------------------------------|-----------------|----------|
//! | `P/buttons/{i}/click/{n}`       | `ON`            | no       |
//! | `P/buttons/{i}/held/{n}`        | `ON`            | no       |
//! | `P/buttons/{i}/released/{n}`    | `ON`            | no       |
//! | `P/relays/{i}/state`            | `ON` / `OFF`    | yes      |
//! | `P/sensors/temperature`         | `21.500`        | yes      |
//! | `P/sensors/humidity`            | `45.250`        | yes      |

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};

use crate::app::commands::{AppCommand, parse_state};
use crate::app::events::{AppEvent, milli_to_decimal};
use crate::app::ports::{BusPort, CommandPort, EventSink};
use crate::config::{BrokerAddress, ButtonFlags, RelayConfig};
use crate::error::{Error, Result};

/// Pause after a connection error before the next reconnect attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Outbound request queue depth.
const REQUEST_CAPACITY: usize = 32;

const ON: &str = "ON";
const OFF: &str = "OFF";

// ───────────────────────────────────────────────────────────────
// Topic layout
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
}

impl Topics {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn click(&self, button: usize, clicks: u32) -> String {
        format!("{}/buttons/{}/click/{}", self.prefix, button, clicks)
    }

    pub fn held(&self, button: usize, clicks: u32) -> String {
        format!("{}/buttons/{}/held/{}", self.prefix, button, clicks)
    }

    pub fn released(&self, button: usize, clicks: u32) -> String {
        format!("{}/buttons/{}/released/{}", self.prefix, button, clicks)
    }

    pub fn relay_state(&self, relay: usize) -> String {
        format!("{}/relays/{}/state", self.prefix, relay)
    }

    pub fn temperature(&self) -> String {
        format!("{}/sensors/temperature", self.prefix)
    }

    pub fn humidity(&self) -> String {
        format!("{}/sensors/humidity", self.prefix)
    }

    /// Command topics to subscribe to.
    pub fn subscriptions(&self) -> [String; 3] {
        [
            format!("{}/relays/0", self.prefix),
            format!("{}/relays/1", self.prefix),
            format!("{}/screen", self.prefix),
        ]
    }

    /// Map an inbound publish to a command.  Unknown topics and payloads
    /// that are not a state are dropped.
    pub fn route(&self, topic: &str, payload: &[u8]) -> Option<AppCommand> {
        let Some(rest) = topic
            .strip_prefix(self.prefix.as_str())
            .and_then(|t| t.strip_prefix('/'))
        else {
            debug!("ignoring foreign topic {}", topic);
            return None;
        };

        let Some(on) = parse_state(payload) else {
            debug!(
                "malformed payload on {}: {:?}",
                topic,
                String::from_utf8_lossy(payload)
            );
            return None;
        };

        match rest {
            "relays/0" => Some(AppCommand::SetRelay { relay: 0, on }),
            "relays/1" => Some(AppCommand::SetRelay { relay: 1, on }),
            "screen" => Some(AppCommand::SetScreen(on)),
            _ => {
                debug!("no route for {}", topic);
                None
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Outbound: EventSink → BusPort
// ───────────────────────────────────────────────────────────────

pub struct MqttBridge<B> {
    bus: B,
    topics: Topics,
    flags: [ButtonFlags; 2],
}

impl<B: BusPort> MqttBridge<B> {
    pub fn new(bus: B, topics: Topics, flags: [ButtonFlags; 2]) -> Self {
        Self { bus, topics, flags }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn sends(&self, button: usize, flag: ButtonFlags) -> bool {
        self.flags.get(button).is_some_and(|f| f.contains(flag))
    }

    /// Topic, payload and retain flag for `event`, if it is published.
    fn message(&self, event: &AppEvent) -> Option<(String, String, bool)> {
        let message = match *event {
            AppEvent::ButtonClicked { button, clicks } => {
                debug!("button {} clicked, {} clicks", button, clicks);
                if !self.sends(button, ButtonFlags::SEND_CLICK) {
                    return None;
                }
                (self.topics.click(button, clicks), ON.to_string(), false)
            }
            AppEvent::ButtonHeld { button, clicks } => {
                debug!("button {} held, {} clicks", button, clicks);
                if !self.sends(button, ButtonFlags::SEND_HELD) {
                    return None;
                }
                (self.topics.held(button, clicks), ON.to_string(), false)
            }
            AppEvent::ButtonReleased { button, clicks } => {
                debug!("button {} released, {} clicks", button, clicks);
                if !self.sends(button, ButtonFlags::SEND_RELEASE) {
                    return None;
                }
                (self.topics.released(button, clicks), ON.to_string(), false)
            }
            AppEvent::RelayStateChanged { relay, on } => (
                self.topics.relay_state(relay),
                if on { ON } else { OFF }.to_string(),
                true,
            ),
            AppEvent::TemperatureChanged { millidegrees } => {
                (self.topics.temperature(), milli_to_decimal(millidegrees), true)
            }
            AppEvent::HumidityChanged { millipercent } => {
                (self.topics.humidity(), milli_to_decimal(millipercent), true)
            }
            AppEvent::ProximityTriggered { value } => {
                debug!("proximity triggered {}", value);
                return None;
            }
        };
        Some(message)
    }
}

impl<B: BusPort> EventSink for MqttBridge<B> {
    fn emit(&mut self, event: &AppEvent) {
        let Some((topic, payload, retain)) = self.message(event) else {
            return;
        };
        debug!("publish {} {}{}", topic, payload, if retain { " (retained)" } else { "" });
        if let Err(e) = self.bus.publish(&topic, &payload, retain) {
            error!("publish to {} failed: {}", topic, e);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// rumqttc client
// ───────────────────────────────────────────────────────────────

/// [`BusPort`] over a rumqttc client.  Never blocks: a full request queue
/// fails the publish instead.
pub struct RumqttBus {
    client: Client,
}

impl BusPort for RumqttBus {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<()> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, retain, payload.as_bytes().to_vec())
            .map_err(|e| Error::Bus(e.to_string()))
    }
}

/// Create the client and start the connection thread.
pub fn connect(
    config: &RelayConfig,
    broker: &BrokerAddress,
    commands: Arc<dyn CommandPort>,
) -> Result<(RumqttBus, JoinHandle<()>)> {
    let mut options = MqttOptions::new(
        config.mqtt_client_id.as_str(),
        broker.host.as_str(),
        broker.port,
    );
    options.set_keep_alive(Duration::from_secs(config.mqtt_keep_alive_secs));
    options.set_clean_session(true);

    let (client, connection) = Client::new(options, REQUEST_CAPACITY);
    let topics = Topics::new(&config.mqtt_topic_prefix);
    let subscriber = client.clone();
    let handle = thread::Builder::new()
        .name("mqtt".into())
        .spawn(move || run_connection(connection, subscriber, &topics, commands.as_ref()))
        .map_err(|e| Error::Bus(format!("cannot start MQTT thread: {e}")))?;

    info!(
        "MQTT bridge to {}:{} as {:?}",
        broker.host, broker.port, config.mqtt_client_id
    );
    Ok((RumqttBus { client }, handle))
}

/// Drive the connection.  rumqttc reconnects on the next iteration after
/// an error.
fn run_connection(
    mut connection: Connection,
    mut client: Client,
    topics: &Topics,
    commands: &dyn CommandPort,
) {
    for notification in connection.iter() {
        match notification {
            Ok(event) => handle_event(event, &mut client, topics, commands),
            Err(e) => {
                warn!("MQTT connection error: {}; retrying in {:?}", e, RECONNECT_DELAY);
                thread::sleep(RECONNECT_DELAY);
            }
        }
    }
    warn!("MQTT connection loop ended");
}

fn handle_event(event: Event, client: &mut Client, topics: &Topics, commands: &dyn CommandPort) {
    match event {
        Event::Incoming(Packet::ConnAck(ack)) => {
            let subscribed = subscribe(client, topics);
            info!("MQTT connected ({:?}), {} subscriptions", ack.code, subscribed);
            commands.send(AppCommand::ResetState);
        }
        Event::Incoming(Packet::Publish(publish)) => {
            if let Some(cmd) = topics.route(&publish.topic, &publish.payload) {
                commands.send(cmd);
            }
        }
        _ => {}
    }
}

/// Queue the command subscriptions.  Returns how many were accepted.
fn subscribe(client: &mut Client, topics: &Topics) -> usize {
    topics
        .subscriptions()
        .into_iter()
        .filter(|topic| match client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
            Ok(()) => true,
            Err(e) => {
                error!("subscribe to {} failed: {}", topic, e);
                false
            }
        })
        .count()
}
