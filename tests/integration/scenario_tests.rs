//! End-to-end gesture and screen scenarios against mock devices.
//!
//! Time is driven by a manual clock in 10 ms steps, matching the reactor's
//! worst-case tick spacing closely enough to pin event times.

use std::time::Duration;

use relayd::app::events::AppEvent;
use relayd::app::service::{SCREEN_GROUP, ServiceSettings};
use relayd::config::ButtonFlags;
use relayd::events::{EV_ABS, InputEvent};

use crate::mock_hw::{DeviceCall, Published, Rig};

const ALL_SENDS: ButtonFlags = ButtonFlags::SEND_CLICK
    .union(ButtonFlags::SEND_HELD)
    .union(ButtonFlags::SEND_RELEASE);

// ── S1: single click ──────────────────────────────────────────

#[test]
fn single_click_publishes_one_click() {
    let mut rig = Rig::bridged([ButtonFlags::default(); 2]);
    rig.press(0);
    rig.run_for(50);
    rig.release(0);
    rig.run_for(140);
    assert!(rig.published().is_empty(), "click resolved too early");

    rig.run_for(10); // t = 200 ms
    assert_eq!(
        rig.published(),
        [Published::new("Relay/buttons/0/click/1", "ON", false)]
    );

    rig.run_for(1000);
    assert_eq!(rig.published().len(), 1, "no held or released after a click");
}

// ── S2: double click ──────────────────────────────────────────

#[test]
fn double_click_publishes_count_two() {
    let mut rig = Rig::bridged([ButtonFlags::default(); 2]);
    rig.press(1);
    rig.run_for(40);
    rig.release(1);
    rig.run_for(50);
    rig.press(1); // t = 90 ms
    rig.run_for(40);
    rig.release(1); // t = 130 ms
    rig.run_for(140);
    assert!(rig.published().is_empty());

    rig.run_for(10); // t = 280 ms
    assert_eq!(
        rig.published(),
        [Published::new("Relay/buttons/1/click/2", "ON", false)]
    );
}

// ── S3: hold ──────────────────────────────────────────────────

#[test]
fn hold_repeats_then_releases() {
    let mut rig = Rig::bridged([ALL_SENDS; 2]);
    rig.press(0);
    rig.run_for(390);
    assert!(rig.published().is_empty());

    rig.run_for(10); // t = 400 ms
    assert_eq!(
        rig.published(),
        [Published::new("Relay/buttons/0/held/1", "ON", false)]
    );

    rig.run_for(600); // t = 1000 ms, second held at 800 ms
    assert_eq!(rig.published().len(), 2);

    rig.release(0);
    rig.run_for(500);
    assert_eq!(
        rig.published(),
        [
            Published::new("Relay/buttons/0/held/1", "ON", false),
            Published::new("Relay/buttons/0/held/1", "ON", false),
            Published::new("Relay/buttons/0/released/1", "ON", false),
        ]
    );
}

#[test]
fn held_gestures_respect_flags() {
    let mut rig = Rig::bridged([ButtonFlags::SEND_CLICK, ButtonFlags::default()]);
    rig.press(0);
    rig.run_for(900);
    rig.release(0);
    rig.run_for(200);
    assert!(rig.published().is_empty());
}

// ── S4: local toggle ──────────────────────────────────────────

#[test]
fn click_toggles_bound_relay_and_poll_reports_it() {
    let flags = [ButtonFlags::TOGGLE | ButtonFlags::default(), ButtonFlags::default()];
    let mut rig = Rig::bridged(flags);
    rig.start();

    // First poll establishes the snapshot.
    rig.run_for(500);
    assert_eq!(
        rig.published(),
        [
            Published::new("Relay/relays/0/state", "OFF", true),
            Published::new("Relay/relays/1/state", "OFF", true),
        ]
    );
    rig.clear_published();

    rig.press(0); // t = 500 ms
    rig.run_for(50);
    rig.release(0);
    rig.run_for(150); // click at 700 ms
    assert_eq!(
        rig.published(),
        [Published::new("Relay/buttons/0/click/1", "ON", false)]
    );

    rig.run_for(10); // toggle runs on the following tick
    assert_eq!(rig.devices().relays[0], Some(b'1'));
    assert!(rig
        .devices()
        .calls
        .contains(&DeviceCall::Relay { relay: 0, on: true }));

    rig.run_for(290); // poll at 1000 ms
    assert_eq!(
        rig.published().last(),
        Some(&Published::new("Relay/relays/0/state", "ON", true))
    );
    assert_eq!(rig.published().len(), 2, "relay 1 unchanged, not republished");
}

#[test]
fn double_click_does_not_toggle() {
    let flags = [ButtonFlags::TOGGLE, ButtonFlags::empty()];
    let mut rig = Rig::bridged(flags);
    rig.press(0);
    rig.run_for(40);
    rig.release(0);
    rig.run_for(40);
    rig.press(0);
    rig.run_for(40);
    rig.release(0);
    rig.run_for(300);
    assert_eq!(rig.devices().relays[0], Some(b'0'));
    assert!(rig.published().is_empty(), "SEND_CLICK not set");
}

// ── S5: idle screen ───────────────────────────────────────────

fn twenty_second_screen() -> ServiceSettings {
    ServiceSettings {
        screen_timeout: Duration::from_secs(20),
        ..ServiceSettings::default()
    }
}

#[test]
fn screen_goes_dark_after_idle_timeout() {
    let mut rig = Rig::with_settings(twenty_second_screen());
    rig.press(0);
    rig.release(0);
    assert_eq!(rig.devices().last_screen(), Some(true));

    rig.jump(Duration::from_millis(19_990));
    assert_eq!(rig.devices().last_screen(), Some(true));

    rig.jump(Duration::from_millis(10));
    assert_eq!(rig.devices().last_screen(), Some(false));
    assert_eq!(rig.sched.pending_in_group(SCREEN_GROUP), 0);
}

#[test]
fn activity_restarts_idle_countdown() {
    let mut rig = Rig::with_settings(twenty_second_screen());
    rig.press(1);
    rig.release(1);

    rig.jump(Duration::from_secs(10));
    rig.press(1);
    rig.release(1);

    rig.jump(Duration::from_secs(15)); // t = 25 s
    assert_eq!(rig.devices().last_screen(), Some(true));
    assert_eq!(rig.sched.pending_in_group(SCREEN_GROUP), 1);

    rig.jump(Duration::from_secs(5)); // t = 30 s
    assert_eq!(rig.devices().last_screen(), Some(false));
    assert_eq!(
        rig.devices().screen_writes().iter().filter(|on| !**on).count(),
        1,
        "exactly one off write"
    );
}

// ── S6: proximity wake ────────────────────────────────────────

#[test]
fn proximity_over_threshold_wakes_and_reports() {
    let mut rig = Rig::new();
    let batch = [InputEvent::new(EV_ABS, 0, 6000), InputEvent::new(EV_ABS, 1, 12)];
    rig.service.proximity_input(&mut rig.sched, &batch);

    assert_eq!(rig.devices().last_screen(), Some(true));
    assert_eq!(rig.events(), [AppEvent::ProximityTriggered { value: 6000 }]);
    assert_eq!(rig.sched.pending_in_group(SCREEN_GROUP), 1);
}

#[test]
fn proximity_below_threshold_is_ignored() {
    let mut rig = Rig::new();
    let batch = [InputEvent::new(EV_ABS, 0, 4999), InputEvent::new(EV_ABS, 1, 9999)];
    rig.service.proximity_input(&mut rig.sched, &batch);

    assert!(rig.events().is_empty());
    assert!(rig.devices().screen_writes().is_empty());
}
