//! Capacitive button gesture classifier.
//!
//! ## Hardware
//!
//! Each button is a sysfs GPIO whose `edge` file is set to `both`, so the
//! reactor sees every transition.  Value `'0'` is a press, `'1'` a
//! release.  The reactor feeds those edges to [`on_press`] /
//! [`on_release`]; everything else happens in scheduler timers.
//!
//! ## Gesture detection
//!
//! | Gesture   | Condition                                   | Event            |
//! |-----------|---------------------------------------------|------------------|
//! | Click(n)  | n presses, each released, then 150 ms quiet | `ButtonClicked`  |
//! | Held(n)   | press still down after 400 ms; every 400 ms | `ButtonHeld`     |
//! | Released  | release after at least one `ButtonHeld`     | `ButtonReleased` |
//!
//! Each button owns one scheduler group.  Every edge cancels the group
//! before arming its own timer, so at most one classification timer per
//! button is ever pending and no timer handle needs to be tracked.

use std::time::Duration;

use log::debug;

use crate::app::events::AppEvent;
use crate::scheduler::{GroupId, TaskScheduler};

/// Press still down after this long counts as a hold.
pub const HOLD_THRESHOLD: Duration = Duration::from_millis(400);
/// Quiet time after a release before the click count is final.
pub const CLICK_RESOLUTION: Duration = Duration::from_millis(150);

/// Number of buttons on the device (0 = upper, 1 = lower).
pub const BUTTON_COUNT: usize = 2;

/// Scheduler group of button `i`.
pub const fn button_group(button: usize) -> GroupId {
    button as GroupId
}

/// Per-button classifier record.  Mutated only on the reactor thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    /// Set while a hold is being reported.
    pub held: bool,
    /// Presses seen in the current sequence.
    pub click_count: u32,
}

/// Externally visible classifier phase, derived from [`ButtonState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    PressPending,
    Holding,
}

impl ButtonState {
    pub fn phase(&self) -> GesturePhase {
        if self.held {
            GesturePhase::Holding
        } else if self.click_count > 0 {
            GesturePhase::PressPending
        } else {
            GesturePhase::Idle
        }
    }
}

/// What the classifier needs from the state it is embedded in.
pub trait GestureHost: Sized + 'static {
    fn button_mut(&mut self, button: usize) -> &mut ButtonState;

    /// User activity: turn the screen on and restart its idle timer.
    fn wake_screen(&mut self, sched: &mut TaskScheduler<Self>);

    /// Deliver a classified gesture.
    fn gesture(&mut self, event: AppEvent);
}

/// Falling edge on button `button`.
pub fn on_press<H: GestureHost>(host: &mut H, sched: &mut TaskScheduler<H>, button: usize) {
    host.wake_screen(sched);
    sched.cancel_group(button_group(button));

    let state = host.button_mut(button);
    match state.phase() {
        // A bounce while holding keeps the hold going without adding a click.
        GesturePhase::Holding => {}
        GesturePhase::Idle | GesturePhase::PressPending => state.click_count += 1,
    }
    debug!("button {}: press (count {})", button, state.click_count);

    arm_hold_timer(sched, button);
}

/// Rising edge on button `button`.
pub fn on_release<H: GestureHost>(host: &mut H, sched: &mut TaskScheduler<H>, button: usize) {
    host.wake_screen(sched);
    sched.cancel_group(button_group(button));

    let state = host.button_mut(button);
    match state.phase() {
        GesturePhase::Holding => {
            let clicks = state.click_count;
            *state = ButtonState::default();
            host.gesture(AppEvent::ButtonReleased { button, clicks });
        }
        GesturePhase::PressPending => {
            sched.schedule_in_group(CLICK_RESOLUTION, button_group(button), move |host: &mut H, _| {
                let state = host.button_mut(button);
                let clicks = state.click_count;
                state.click_count = 0;
                host.gesture(AppEvent::ButtonClicked { button, clicks });
            });
        }
        // Release without a press we saw (e.g. held across a restart).
        GesturePhase::Idle => debug!("button {}: stray release ignored", button),
    }
}

fn arm_hold_timer<H: GestureHost>(sched: &mut TaskScheduler<H>, button: usize) {
    sched.schedule_in_group(HOLD_THRESHOLD, button_group(button), move |host: &mut H, ctx| {
        let state = host.button_mut(button);
        state.held = true;
        let clicks = state.click_count;
        host.gesture(AppEvent::ButtonHeld { button, clicks });
        ctx.repeat();
    });
}
