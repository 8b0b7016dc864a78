//! Raw input decoding.
//!
//! Two kinds of raw input reach the reactor:
//! - GPIO value bytes read after `POLLPRI`, mapped to [`ButtonEdge`];
//! - evdev `input_event` records from `/dev/input/eventN`, decoded to
//!   [`InputEvent`].
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ gpio value  │────▶│  ButtonEdge  │────▶│ gesture          │
//! │ evdev fd    │────▶│  InputEvent  │────▶│ screen/proximity │
//! └─────────────┘     └──────────────┘     └──────────────────┘
//! ```

use std::mem::size_of;

/// Synchronisation marker.
pub const EV_SYN: u16 = 0x00;
/// Key / touch press.
pub const EV_KEY: u16 = 0x01;
/// Absolute axis (light and proximity readings).
pub const EV_ABS: u16 = 0x03;

/// Size of a native `struct input_event`: a `timeval`, then
/// `u16 type`, `u16 code`, `i32 value`.
pub const INPUT_EVENT_SIZE: usize = size_of::<libc::timeval>() + 8;

/// Decoded evdev record (timestamp dropped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub fn new(kind: u16, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    /// Decode one native-endian record.
    pub fn from_bytes(raw: &[u8; INPUT_EVENT_SIZE]) -> Self {
        let body = &raw[size_of::<libc::timeval>()..];
        Self {
            kind: u16::from_ne_bytes([body[0], body[1]]),
            code: u16::from_ne_bytes([body[2], body[3]]),
            value: i32::from_ne_bytes([body[4], body[5], body[6], body[7]]),
        }
    }

    /// Encode as a native record with a zero timestamp.
    pub fn to_bytes(&self) -> [u8; INPUT_EVENT_SIZE] {
        let mut raw = [0u8; INPUT_EVENT_SIZE];
        let body = &mut raw[size_of::<libc::timeval>()..];
        body[0..2].copy_from_slice(&self.kind.to_ne_bytes());
        body[2..4].copy_from_slice(&self.code.to_ne_bytes());
        body[4..8].copy_from_slice(&self.value.to_ne_bytes());
        raw
    }
}

/// Button transition derived from a GPIO value byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Press,
    Release,
}

impl ButtonEdge {
    /// Buttons are active-low: `'0'` is pressed, `'1'` released.
    pub fn from_value(byte: u8) -> Option<Self> {
        match byte {
            b'0' => Some(Self::Press),
            b'1' => Some(Self::Release),
            _ => None,
        }
    }
}
