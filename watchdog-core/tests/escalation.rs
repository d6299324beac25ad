mod common;

use common::Rig;
use watchdog_core::Rejection;
use watchdog_core::indicator::IndicatorMode;
use watchdog_core::lines::{LineAction, LineId};
use watchdog_core::supervisor::{SupervisorEvent, SupervisorPhase};

const RESPONSE_MS: u64 = 90_000;
const REBOOT_MS: u64 = 150_000;

#[test]
fn default_config_soft_resets_three_times_then_idles() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.start()).unwrap();
    assert_eq!(rig.watchdog.indicator().mode(), IndicatorMode::BlinkSlow);

    rig.advance(RESPONSE_MS - 1);
    assert_eq!(rig.soft_resets(), 0);

    rig.advance(1);
    assert_eq!(rig.soft_resets(), 1);
    assert_eq!(
        rig.watchdog.supervisor().phase(),
        SupervisorPhase::RebootWindow { escalated: false }
    );
    assert_eq!(rig.watchdog.indicator().mode(), IndicatorMode::BlinkMid);

    rig.advance(REBOOT_MS);
    assert_eq!(rig.soft_resets(), 2);
    rig.advance(REBOOT_MS);
    assert_eq!(rig.soft_resets(), 3);

    rig.advance(REBOOT_MS);
    assert_eq!(rig.soft_resets(), 3);
    assert!(!rig.watchdog.supervisor().is_enabled());
    assert_eq!(rig.watchdog.indicator().mode(), IndicatorMode::Glow);

    rig.advance(REBOOT_MS * 2);
    assert_eq!(rig.soft_resets(), 3);
    assert_eq!(rig.hard_resets(), 0);
}

#[test]
fn soft_pulses_land_on_window_boundaries() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.start()).unwrap();
    rig.advance(RESPONSE_MS + REBOOT_MS * 3);

    let asserts: Vec<u64> = rig
        .host_transitions()
        .iter()
        .filter(|transition| transition.action == LineAction::AssertLow)
        .map(|transition| transition.at_ms)
        .collect();
    assert_eq!(asserts, [90_000, 240_000, 390_000]);

    for transition in rig.host_transitions() {
        assert_eq!(transition.line, LineId::Reset);
    }
    let releases: Vec<u64> = rig
        .host_transitions()
        .iter()
        .filter(|transition| transition.action == LineAction::Release)
        .map(|transition| transition.at_ms)
        .collect();
    assert_eq!(releases, [90_200, 240_200, 390_200]);
}

#[test]
fn hard_reset_enabled_escalates_after_soft_budget() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.enable_hard_reset()).unwrap();
    rig.call(|watchdog| watchdog.start()).unwrap();

    rig.advance(RESPONSE_MS + REBOOT_MS * 2);
    assert_eq!(rig.soft_resets(), 3);
    assert_eq!(rig.hard_resets(), 0);

    rig.advance(REBOOT_MS);
    assert_eq!(
        rig.watchdog.supervisor().phase(),
        SupervisorPhase::RebootWindow { escalated: true }
    );
    assert_eq!(rig.watchdog.indicator().mode(), IndicatorMode::BlinkFast);
    assert_eq!(rig.count(LineId::Power, LineAction::AssertLow), 1);

    // Let the third power cycle finish before counting.
    rig.advance(REBOOT_MS * 2 + 8_200);
    assert_eq!(rig.hard_resets(), 3);
    assert!(rig.watchdog.supervisor().is_enabled());

    rig.advance(REBOOT_MS - 8_200);
    assert!(!rig.watchdog.supervisor().is_enabled());
    assert_eq!(rig.soft_resets(), 3);
    assert_eq!(rig.hard_resets(), 3);
    assert_eq!(rig.watchdog.indicator().mode(), IndicatorMode::Glow);
}

#[test]
fn ping_postpones_first_reset() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.start()).unwrap();

    rig.advance(60_000);
    rig.call(|watchdog| watchdog.ping()).unwrap();
    rig.advance(RESPONSE_MS - 1);
    assert_eq!(rig.soft_resets(), 0);

    rig.advance(1);
    assert_eq!(rig.soft_resets(), 1);
    assert_eq!(rig.call(|watchdog| watchdog.ping()), Err(Rejection::Busy));
}

#[test]
fn response_code_bounds_set_window_length() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.set_response_timeout(0)).unwrap();
    rig.call(|watchdog| watchdog.start()).unwrap();
    rig.advance(4_999);
    assert_eq!(rig.soft_resets(), 0);
    rig.advance(1);
    assert_eq!(rig.soft_resets(), 1);

    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.set_response_timeout(63)).unwrap();
    rig.call(|watchdog| watchdog.start()).unwrap();
    rig.advance(319_999);
    assert_eq!(rig.soft_resets(), 0);
    rig.advance(1);
    assert_eq!(rig.soft_resets(), 1);
}

#[test]
fn configuration_is_locked_while_supervising() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.start()).unwrap();
    let running = rig.watchdog.status();
    assert_eq!(running.raw(), 0x0048_451C);

    assert_eq!(rig.call(|watchdog| watchdog.start()), Err(Rejection::Busy));
    assert_eq!(
        rig.call(|watchdog| watchdog.enable_hard_reset()),
        Err(Rejection::Busy)
    );
    assert_eq!(
        rig.call(|watchdog| watchdog.set_response_timeout(0)),
        Err(Rejection::Busy)
    );
    assert_eq!(
        rig.call(|watchdog| watchdog.set_reboot_timeout(0)),
        Err(Rejection::Busy)
    );
    assert_eq!(
        rig.call(|watchdog| watchdog.set_soft_attempts(0)),
        Err(Rejection::Busy)
    );
    assert_eq!(
        rig.call(|watchdog| watchdog.set_hard_attempts(0)),
        Err(Rejection::Busy)
    );
    assert_eq!(
        rig.call(|watchdog| watchdog.link_activity()),
        Err(Rejection::Busy)
    );
    assert_eq!(rig.watchdog.status(), running);

    rig.call(|watchdog| watchdog.stop()).unwrap();
    rig.call(|watchdog| watchdog.enable_hard_reset()).unwrap();
    assert_eq!(rig.watchdog.status().raw(), 0x0049_441C);
}

#[test]
fn status_tracks_response_elapsed() {
    let mut rig = Rig::new();
    assert_eq!(rig.watchdog.status().raw(), 0x0048_441C);

    rig.call(|watchdog| watchdog.start()).unwrap();
    rig.advance(RESPONSE_MS);
    assert_eq!(rig.watchdog.status().raw(), 0x0048_471C);
}

#[test]
fn events_follow_escalation() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.enable_events()).unwrap();
    rig.call(|watchdog| watchdog.start()).unwrap();
    rig.advance(RESPONSE_MS + REBOOT_MS * 3);

    let events = &rig.watchdog.events().events;
    let changes: Vec<(SupervisorEvent, u32)> = events
        .iter()
        .copied()
        .filter(|(event, _)| *event != SupervisorEvent::Heartbeat)
        .collect();
    assert_eq!(
        changes,
        [
            (SupervisorEvent::FirstReset, 90_000),
            (SupervisorEvent::SoftReset, 240_000),
            (SupervisorEvent::SoftReset, 390_000),
            (SupervisorEvent::MovedToIdle, 540_000),
        ]
    );

    let heartbeats = events
        .iter()
        .filter(|(event, _)| *event == SupervisorEvent::Heartbeat)
        .count();
    assert_eq!(heartbeats, 540);
}

#[test]
fn events_stay_silent_when_disabled() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.start()).unwrap();
    rig.advance(RESPONSE_MS + 1);
    assert!(rig.watchdog.events().events.is_empty());
}

#[test]
fn linked_activity_acts_as_ping() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.link_activity()).unwrap();
    rig.call(|watchdog| watchdog.start()).unwrap();
    assert!(rig.watchdog.activity().interrupt().unmasked);

    rig.advance(80_000);
    rig.call(|watchdog| watchdog.activity_pulse());
    assert!(!rig.watchdog.activity().interrupt().unmasked);

    rig.advance(1_000);
    assert!(rig.watchdog.activity().interrupt().unmasked);

    rig.advance(RESPONSE_MS - 1_001);
    assert_eq!(rig.soft_resets(), 0);
    rig.advance(1);
    assert_eq!(rig.soft_resets(), 1);

    assert!(!rig.watchdog.activity().interrupt().unmasked);
}

#[test]
fn unlinked_activity_is_ignored() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.start()).unwrap();
    assert!(!rig.watchdog.activity().interrupt().unmasked);

    rig.advance(80_000);
    rig.call(|watchdog| watchdog.activity_pulse());
    rig.advance(10_000);
    assert_eq!(rig.soft_resets(), 1);
}

#[test]
fn stop_returns_to_glow_and_idles_clock() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.start()).unwrap();
    assert!(rig.watchdog.time().source().running);

    rig.call(|watchdog| watchdog.stop()).unwrap();
    assert_eq!(rig.watchdog.indicator().mode(), IndicatorMode::Glow);
    assert!(!rig.watchdog.time().source().running);

    let uptime = rig.watchdog.uptime_ms();
    rig.advance(10);
    assert_eq!(rig.watchdog.uptime_ms(), uptime);
}
