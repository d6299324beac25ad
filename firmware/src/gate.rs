#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Software gates standing in for the timer and EXTI enable bits.
//!
//! The engine starts and stops its tick source and masks the activity
//! interrupt from inside a critical section. The async tasks that own the
//! real ticker and EXTI line watch these gates instead.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, Ordering};
use watchdog_core::activity::ActivityInterrupt;
use watchdog_core::time::TickSource;

/// Open/closed flag with a wake-up for the task watching it.
pub struct Gate {
    open: AtomicBool,
    changed: Signal<CriticalSectionRawMutex, ()>,
}

impl Gate {
    pub const fn new() -> Self {
        Self {
            open: AtomicBool::new(false),
            changed: Signal::new(),
        }
    }

    pub fn open(&self) {
        if !self.open.swap(true, Ordering::AcqRel) {
            self.changed.signal(());
        }
    }

    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            self.changed.signal(());
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Resolves once the gate is open.
    pub async fn wait_open(&self) {
        while !self.is_open() {
            self.changed.wait().await;
        }
    }

    /// Resolves on the next open/close transition. May resolve spuriously.
    pub async fn changed(&self) {
        self.changed.wait().await;
    }
}

/// Gate for the 1 ms ticker task.
pub static TICK_GATE: Gate = Gate::new();
/// Gate for the drive activity EXTI task.
pub static ACTIVITY_GATE: Gate = Gate::new();

/// [`TickSource`] that opens and closes [`TICK_GATE`].
pub struct TickGate {
    gate: &'static Gate,
}

impl TickGate {
    pub const fn new(gate: &'static Gate) -> Self {
        Self { gate }
    }
}

impl TickSource for TickGate {
    fn start(&mut self) {
        self.gate.open();
    }

    fn stop(&mut self) {
        self.gate.close();
    }
}

/// [`ActivityInterrupt`] that opens and closes [`ACTIVITY_GATE`].
pub struct ActivityGate {
    gate: &'static Gate,
}

impl ActivityGate {
    pub const fn new(gate: &'static Gate) -> Self {
        Self { gate }
    }
}

impl ActivityInterrupt for ActivityGate {
    fn enable(&mut self) {
        self.gate.open();
    }

    fn disable(&mut self) {
        self.gate.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use embassy_futures::block_on;

    #[test]
    fn tick_gate_follows_source_calls() {
        static GATE: Gate = Gate::new();
        let mut source = TickGate::new(&GATE);
        assert!(!GATE.is_open());

        source.start();
        assert!(GATE.is_open());
        block_on(GATE.wait_open());

        source.stop();
        assert!(!GATE.is_open());
    }

    #[test]
    fn activity_gate_signals_transitions() {
        static GATE: Gate = Gate::new();
        let mut interrupt = ActivityGate::new(&GATE);

        interrupt.enable();
        block_on(GATE.changed());
        interrupt.disable();
        block_on(GATE.changed());
        assert!(!GATE.is_open());
    }
}
