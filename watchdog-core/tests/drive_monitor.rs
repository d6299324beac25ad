mod common;

use common::Rig;
use watchdog_core::Rejection;
use watchdog_core::lines::{LineAction, LineId};

const DRIVE_TIMEOUT_MS: u64 = 60_000;

#[test]
fn inactivity_window_triggers_soft_reset() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.drive_start()).unwrap();
    assert!(rig.watchdog.activity().interrupt().unmasked);

    rig.advance(DRIVE_TIMEOUT_MS - 1);
    assert_eq!(rig.soft_resets(), 0);

    rig.advance(1);
    assert_eq!(rig.soft_resets(), 1);
    assert_eq!(rig.watchdog.drive().attempts_used(), 1);
}

#[test]
fn activity_restarts_inactivity_window() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.drive_start()).unwrap();

    rig.advance(30_000);
    rig.call(|watchdog| watchdog.activity_pulse());
    rig.advance(DRIVE_TIMEOUT_MS - 1);
    assert_eq!(rig.soft_resets(), 0);

    rig.advance(1);
    assert_eq!(rig.soft_resets(), 1);
}

#[test]
fn pause_freezes_window_until_resume() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.drive_start()).unwrap();
    rig.advance(30_000);

    rig.call(|watchdog| watchdog.drive_pause()).unwrap();
    assert_eq!(rig.watchdog.drive_status() & 0x00C0, 0x00C0);
    assert!(!rig.watchdog.time().source().running);

    rig.advance(200_000);
    assert_eq!(rig.soft_resets(), 0);
    assert_eq!(rig.watchdog.drive().elapsed_ms(), 30_000);

    rig.call(|watchdog| watchdog.drive_resume()).unwrap();
    rig.advance(29_999);
    assert_eq!(rig.soft_resets(), 0);
    rig.advance(1);
    assert_eq!(rig.soft_resets(), 1);
}

#[test]
fn exhausted_budget_switches_monitor_off() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.drive_start()).unwrap();

    rig.advance(DRIVE_TIMEOUT_MS * 3);
    assert_eq!(rig.soft_resets(), 3);
    assert!(rig.watchdog.drive().is_monitoring());

    rig.advance(DRIVE_TIMEOUT_MS);
    assert_eq!(rig.soft_resets(), 3);
    assert!(!rig.watchdog.drive().is_monitoring());
    assert_eq!(rig.watchdog.drive_status(), 0x020B);
    assert!(!rig.watchdog.activity().interrupt().unmasked);
    assert!(!rig.watchdog.time().source().running);

    rig.advance(DRIVE_TIMEOUT_MS * 2);
    assert_eq!(rig.soft_resets(), 3);
}

#[test]
fn configuration_is_locked_while_monitoring() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.drive_start()).unwrap();

    assert_eq!(rig.call(|watchdog| watchdog.drive_start()), Err(Rejection::Busy));
    assert_eq!(
        rig.call(|watchdog| watchdog.drive_set_timeout(0)),
        Err(Rejection::Busy)
    );
    assert_eq!(
        rig.call(|watchdog| watchdog.drive_set_attempts(0)),
        Err(Rejection::Busy)
    );
    assert_eq!(rig.watchdog.drive_status(), 0x024B);

    rig.call(|watchdog| watchdog.drive_stop()).unwrap();
    rig.call(|watchdog| watchdog.drive_set_timeout(0)).unwrap();
    rig.call(|watchdog| watchdog.drive_set_attempts(0)).unwrap();
    assert_eq!(rig.watchdog.drive_status(), 0x0000);

    rig.call(|watchdog| watchdog.drive_start()).unwrap();
    rig.advance(5_000);
    assert_eq!(rig.soft_resets(), 1);
    rig.advance(5_000);
    assert!(!rig.watchdog.drive().is_monitoring());
}

#[test]
fn runs_alongside_supervisor() {
    let mut rig = Rig::new();
    rig.call(|watchdog| watchdog.start()).unwrap();
    rig.call(|watchdog| watchdog.drive_start()).unwrap();

    rig.advance(DRIVE_TIMEOUT_MS);
    assert_eq!(rig.soft_resets(), 1);
    rig.advance(30_000);
    assert_eq!(rig.soft_resets(), 2);

    let asserts: Vec<u64> = rig
        .transitions
        .iter()
        .filter(|transition| {
            transition.line == LineId::Reset && transition.action == LineAction::AssertLow
        })
        .map(|transition| transition.at_ms)
        .collect();
    assert_eq!(asserts, [60_000, 90_000]);
}
