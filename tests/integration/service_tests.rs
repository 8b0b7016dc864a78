//! Shadows, periodic poll and inbound command handling.

use relayd::adapters::mqtt::Topics;
use relayd::app::commands::{AppCommand, parse_state};
use relayd::app::events::AppEvent;
use relayd::app::ports::CommandPort;
use relayd::app::service::SCREEN_GROUP;
use relayd::config::ButtonFlags;
use relayd::events::{EV_ABS, InputEvent};

use crate::mock_hw::{DeviceCall, Published, Rig};

fn relay_events(events: &[AppEvent]) -> Vec<(usize, bool)> {
    events
        .iter()
        .filter_map(|e| match *e {
            AppEvent::RelayStateChanged { relay, on } => Some((relay, on)),
            _ => None,
        })
        .collect()
}

// ── Periodic poll ─────────────────────────────────────────────

#[test]
fn first_poll_reports_everything() {
    let mut rig = Rig::new();
    rig.devices_mut().relays = [Some(b'1'), Some(b'0')];
    rig.devices_mut().temperature = Some(21_500);
    rig.devices_mut().humidity = Some(45_000);
    rig.start();

    rig.run_for(490);
    assert!(rig.events().is_empty());
    rig.run_for(10);
    assert_eq!(
        rig.events(),
        [
            AppEvent::RelayStateChanged { relay: 0, on: true },
            AppEvent::RelayStateChanged { relay: 1, on: false },
            AppEvent::TemperatureChanged { millidegrees: 21_500 },
            AppEvent::HumidityChanged { millipercent: 45_000 },
        ]
    );
}

#[test]
fn small_sensor_drift_is_suppressed() {
    let mut rig = Rig::new();
    rig.devices_mut().temperature = Some(21_000);
    rig.start();
    rig.run_for(500);
    rig.clear_events();

    rig.devices_mut().temperature = Some(21_100);
    rig.run_for(500);
    assert!(rig.events().is_empty(), "a 100 milli-degree change is not reported");

    rig.devices_mut().temperature = Some(21_101);
    rig.run_for(500);
    assert_eq!(rig.events(), [AppEvent::TemperatureChanged { millidegrees: 21_101 }]);
}

#[test]
fn failed_reads_emit_nothing_and_keep_shadows() {
    let mut rig = Rig::new();
    rig.devices_mut().temperature = Some(19_000);
    rig.start();
    rig.run_for(500);
    rig.clear_events();

    rig.devices_mut().relays = [None, None];
    rig.devices_mut().temperature = None;
    rig.run_for(500);
    assert!(rig.events().is_empty());
    assert_eq!(rig.service.relay_shadow(0), Some(b'0'));
    assert_eq!(rig.service.temperature_shadow(), Some(19_000));

    // Recovery at the same values is not a change.
    rig.devices_mut().relays = [Some(b'0'), Some(b'0')];
    rig.devices_mut().temperature = Some(19_000);
    rig.run_for(500);
    assert!(rig.events().is_empty());
}

#[test]
fn reset_state_resends_snapshot() {
    let mut rig = Rig::new();
    rig.devices_mut().temperature = Some(22_000);
    rig.devices_mut().humidity = Some(50_000);
    rig.start();
    rig.run_for(500);
    assert_eq!(rig.events().len(), 4);
    rig.run_for(500);
    assert_eq!(rig.events().len(), 4);

    // What the bus thread does on every ConnAck.
    rig.commands.send(AppCommand::ResetState);
    rig.run_for(500);
    assert_eq!(rig.events().len(), 8);
    assert_eq!(rig.events()[4..], rig.events()[..4]);
}

// ── Inbound commands ──────────────────────────────────────────

#[test]
fn bus_payloads_drive_relays() {
    let topics = Topics::new("Relay");
    let payloads: [&[u8]; 8] = [b"1", b"ON", b"on", b"true", b"0", b"OFF", b"False", b"junk"];

    for payload in payloads {
        let mut rig = Rig::new();
        rig.devices_mut().relays = [Some(b'0'), Some(b'1')];
        if let Some(cmd) = topics.route("Relay/relays/1", payload) {
            rig.commands.send(cmd);
        }
        rig.tick();

        let expected = parse_state(payload).map(|on| DeviceCall::Relay { relay: 1, on });
        assert_eq!(rig.devices().calls.first().copied(), expected, "{payload:?}");
        match parse_state(payload) {
            Some(on) => assert_eq!(rig.devices().relays[1], Some(if on { b'1' } else { b'0' })),
            None => assert_eq!(rig.devices().relays[1], Some(b'1')),
        }
    }
}

#[test]
fn bus_screen_payloads_drive_backlight() {
    let topics = Topics::new("Relay");
    let mut rig = Rig::new();

    rig.commands.send(topics.route("Relay/screen", b"ON").unwrap());
    rig.tick();
    assert_eq!(rig.devices().last_screen(), Some(true));
    assert_eq!(rig.sched.pending_in_group(SCREEN_GROUP), 1);

    rig.commands.send(topics.route("Relay/screen", b"off").unwrap());
    rig.tick();
    assert_eq!(rig.devices().last_screen(), Some(false));
    assert_eq!(rig.sched.pending_in_group(SCREEN_GROUP), 0);
}

#[test]
fn repeated_relay_command_reports_once() {
    let topics = Topics::new("Relay");
    let mut rig = Rig::new();
    rig.start();
    rig.run_for(500);
    rig.clear_events();

    for _ in 0..3 {
        rig.commands.send(topics.route("Relay/relays/0", b"ON").unwrap());
        rig.run_for(500);
    }
    assert_eq!(relay_events(rig.events()), [(0, true)]);
}

#[test]
fn write_failures_are_swallowed() {
    let mut rig = Rig::new();
    rig.devices_mut().fail_writes = true;
    rig.commands.send(AppCommand::SetRelay { relay: 0, on: true });
    rig.commands.send(AppCommand::ToggleRelay(1));
    rig.commands.send(AppCommand::SetScreen(true));
    rig.tick();

    assert!(rig.devices().calls.is_empty());
    assert_eq!(rig.devices().relays, [Some(b'0'), Some(b'0')]);
    assert!(!rig.service.screen_on());
}

#[test]
fn toggle_needs_a_readable_relay() {
    let mut rig = Rig::new();
    rig.devices_mut().relays = [None, Some(b'1')];
    rig.commands.send(AppCommand::ToggleRelay(0));
    rig.commands.send(AppCommand::ToggleRelay(1));
    rig.tick();
    assert_eq!(rig.devices().calls, [DeviceCall::Relay { relay: 1, on: false }]);
}

#[test]
fn commands_run_in_submission_order() {
    let mut rig = Rig::new();
    rig.commands.send(AppCommand::SetRelay { relay: 0, on: true });
    rig.commands.send(AppCommand::SetRelay { relay: 0, on: false });
    rig.commands.send(AppCommand::ToggleRelay(0));
    rig.tick();
    assert_eq!(
        rig.devices().calls,
        [
            DeviceCall::Relay { relay: 0, on: true },
            DeviceCall::Relay { relay: 0, on: false },
            DeviceCall::Relay { relay: 0, on: true },
        ]
    );
}

#[test]
fn commands_from_another_thread_land_on_next_tick() {
    let mut rig = Rig::new();
    let commands = std::sync::Arc::clone(&rig.commands);
    std::thread::spawn(move || commands.send(AppCommand::SetRelay { relay: 1, on: true }))
        .join()
        .unwrap();
    assert_eq!(rig.devices().relays[1], Some(b'0'));
    rig.tick();
    assert_eq!(rig.devices().relays[1], Some(b'1'));
}

// ── Bridge outbound ───────────────────────────────────────────

#[test]
fn sensor_publishes_are_retained_decimals() {
    let mut rig = Rig::bridged([ButtonFlags::default(); 2]);
    rig.devices_mut().temperature = Some(-2_250);
    rig.devices_mut().humidity = Some(38_125);
    rig.start();
    rig.run_for(500);
    assert_eq!(
        rig.published()[2..],
        [
            Published::new("Relay/sensors/temperature", "-2.250", true),
            Published::new("Relay/sensors/humidity", "38.125", true),
        ]
    );
}

#[test]
fn proximity_is_not_published() {
    let mut rig = Rig::bridged([ButtonFlags::default(); 2]);
    let batch = [InputEvent::new(EV_ABS, 0, 9000)];
    rig.service.proximity_input(&mut rig.sched, &batch);
    assert!(rig.published().is_empty());
    assert_eq!(rig.devices().last_screen(), Some(true));
}
