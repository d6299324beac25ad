#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Link counters for the firmware target.
//!
//! Lightweight atomics count command traffic, dropped event bytes and UART
//! faults so they can be logged without touching the engine.

use portable_atomic::{AtomicU32, Ordering};
use watchdog_core::Rejection;
use watchdog_core::protocol::Reply;

static COMMANDS_HANDLED: AtomicU32 = AtomicU32::new(0);
static COMMANDS_REJECTED: AtomicU32 = AtomicU32::new(0);
static DROPPED_EVENT_BYTES: AtomicU32 = AtomicU32::new(0);
static UART_ERRORS: AtomicU32 = AtomicU32::new(0);

/// Point-in-time copy of the counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkCounters {
    pub commands: u32,
    pub rejected: u32,
    pub dropped_events: u32,
    pub uart_errors: u32,
}

pub fn record_command(result: &Result<Reply, Rejection>) {
    COMMANDS_HANDLED.fetch_add(1, Ordering::Relaxed);
    if result.is_err() {
        COMMANDS_REJECTED.fetch_add(1, Ordering::Relaxed);
    }
}

/// Counts one event byte lost to a full queue and returns the new total.
pub fn record_dropped_event() -> u32 {
    DROPPED_EVENT_BYTES.fetch_add(1, Ordering::Relaxed) + 1
}

/// Counts one UART fault and returns the new total.
pub fn record_uart_error() -> u32 {
    UART_ERRORS.fetch_add(1, Ordering::Relaxed) + 1
}

pub fn snapshot() -> LinkCounters {
    LinkCounters {
        commands: COMMANDS_HANDLED.load(Ordering::Relaxed),
        rejected: COMMANDS_REJECTED.load(Ordering::Relaxed),
        dropped_events: DROPPED_EVENT_BYTES.load(Ordering::Relaxed),
        uart_errors: UART_ERRORS.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use watchdog_core::Ack;

    #[test]
    fn counters_accumulate() {
        let before = snapshot();
        record_command(&Ok(Reply::Ack(Ack::PingAccepted)));
        record_command(&Err(Rejection::Busy));
        record_dropped_event();

        let after = snapshot();
        assert!(after.commands >= before.commands + 2);
        assert!(after.rejected > before.rejected);
        assert!(after.dropped_events > before.dropped_events);
    }
}
