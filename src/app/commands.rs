//! Inbound commands to the relay service.
//!
//! These represent actions requested by the outside world (MQTT, local
//! button binding, startup configuration).  Every command reaches the
//! [`RelayService`](super::service::RelayService) through the scheduler's
//! async queue, so it executes on the reactor thread.

/// Commands that adapters can send into the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Drive relay `relay` on or off.
    SetRelay { relay: usize, on: bool },

    /// Read relay `relay` and write the opposite value.
    ToggleRelay(usize),

    /// Screen on (with idle timer) or off.
    SetScreen(bool),

    /// Forget every shadow so the next poll re-emits a full snapshot.
    ResetState,
}

/// Parse a state payload: `1`/`ON`/`true` → on, `0`/`OFF`/`false` → off,
/// case-insensitive.  Anything else is rejected.
pub fn parse_state(payload: &[u8]) -> Option<bool> {
    let text = core::str::from_utf8(payload).ok()?.trim();
    const ON: [&str; 3] = ["1", "on", "true"];
    const OFF: [&str; 3] = ["0", "off", "false"];

    if ON.iter().any(|t| text.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if OFF.iter().any(|t| text.eq_ignore_ascii_case(t)) {
        Some(false)
    } else {
        None
    }
}
