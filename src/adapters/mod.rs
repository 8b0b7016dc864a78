//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements   | Connects to                  |
//! |-------------|--------------|------------------------------|
//! | `binding`   | EventSink    | local button → relay toggle  |
//! | `log_sink`  | EventSink    | log output                   |
//! | `mqtt`      | EventSink    | MQTT broker (rumqttc)        |
//! |             | BusPort      |                              |
//! | `time`      | TimePort     | monotonic / manual clock     |
//!
//! The sysfs [`DevicePort`](crate::app::ports::DevicePort) lives in
//! [`crate::drivers::sysfs`] next to the raw file helpers.

pub mod binding;
pub mod log_sink;
pub mod mqtt;
pub mod time;
