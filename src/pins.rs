//! GPIO and device-file assignments for the two-relay wall controller.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding paths.  [`DevicePaths::default`] is the real board; tests
//! point a `DevicePaths` at a temporary directory instead.

use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Capacitive buttons (sysfs GPIO, edge-triggered)
// ---------------------------------------------------------------------------

/// Upper button (index 0).
pub const BUTTON_UPPER_GPIO: &str = "/sys/class/gpio/gpio8";
/// Lower button (index 1).
pub const BUTTON_LOWER_GPIO: &str = "/sys/class/gpio/gpio7";

// ---------------------------------------------------------------------------
// Relays and backlight (sysfs GPIO, ASCII '0'/'1')
// ---------------------------------------------------------------------------

pub const RELAY_UPPER_VALUE: &str = "/sys/class/gpio/gpio203/value";
pub const RELAY_LOWER_VALUE: &str = "/sys/class/gpio/gpio204/value";
pub const SCREEN_BACKLIGHT_VALUE: &str = "/sys/class/gpio/gpio30/value";

// ---------------------------------------------------------------------------
// evdev input streams
// ---------------------------------------------------------------------------

pub const SCREEN_INPUT_EVENTS: &str = "/dev/input/event0";
pub const AMBIENT_LIGHT_IR_INPUT_EVENTS: &str = "/dev/input/event1";
pub const AMBIENT_LIGHT_INPUT_EVENTS: &str = "/dev/input/event2";
pub const PROXIMITY_INPUT_EVENTS: &str = "/dev/input/event3";

// ---------------------------------------------------------------------------
// Temperature / humidity (I²C hwmon)
// ---------------------------------------------------------------------------

/// Millidegrees Celsius.
pub const TEMPERATURE_INPUT: &str = "/sys/bus/i2c/devices/2-0040/temp1_input";
/// Milli-percent relative humidity.
pub const HUMIDITY_INPUT: &str = "/sys/bus/i2c/devices/2-0040/humidity1_input";

/// Complete device-file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePaths {
    /// Button GPIO directories (contain `value` and `edge`).
    pub buttons: [PathBuf; 2],
    pub relays: [PathBuf; 2],
    pub screen: PathBuf,
    pub screen_input: PathBuf,
    pub proximity_input: PathBuf,
    pub ambient_light_input: PathBuf,
    pub ambient_light_ir_input: PathBuf,
    pub temperature: PathBuf,
    pub humidity: PathBuf,
}

impl Default for DevicePaths {
    fn default() -> Self {
        Self {
            buttons: [BUTTON_UPPER_GPIO.into(), BUTTON_LOWER_GPIO.into()],
            relays: [RELAY_UPPER_VALUE.into(), RELAY_LOWER_VALUE.into()],
            screen: SCREEN_BACKLIGHT_VALUE.into(),
            screen_input: SCREEN_INPUT_EVENTS.into(),
            proximity_input: PROXIMITY_INPUT_EVENTS.into(),
            ambient_light_input: AMBIENT_LIGHT_INPUT_EVENTS.into(),
            ambient_light_ir_input: AMBIENT_LIGHT_IR_INPUT_EVENTS.into(),
            temperature: TEMPERATURE_INPUT.into(),
            humidity: HUMIDITY_INPUT.into(),
        }
    }
}

impl DevicePaths {
    /// Same layout rooted under `root` (e.g. a fake sysfs tree).
    pub fn under(root: &Path) -> Self {
        let rebase = |p: &str| root.join(p.trim_start_matches('/'));
        Self {
            buttons: [rebase(BUTTON_UPPER_GPIO), rebase(BUTTON_LOWER_GPIO)],
            relays: [rebase(RELAY_UPPER_VALUE), rebase(RELAY_LOWER_VALUE)],
            screen: rebase(SCREEN_BACKLIGHT_VALUE),
            screen_input: rebase(SCREEN_INPUT_EVENTS),
            proximity_input: rebase(PROXIMITY_INPUT_EVENTS),
            ambient_light_input: rebase(AMBIENT_LIGHT_INPUT_EVENTS),
            ambient_light_ir_input: rebase(AMBIENT_LIGHT_IR_INPUT_EVENTS),
            temperature: rebase(TEMPERATURE_INPUT),
            humidity: rebase(HUMIDITY_INPUT),
        }
    }

    pub fn button_value(&self, button: usize) -> PathBuf {
        self.buttons[button].join("value")
    }

    pub fn button_edge(&self, button: usize) -> PathBuf {
        self.buttons[button].join("edge")
    }
}
