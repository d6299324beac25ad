//! Drive-activity monitor.
//!
//! A secondary watchdog fed by the drive activity line instead of pings. Any
//! activity pulse restarts the inactivity window. When the window elapses the
//! host is soft-reset, up to the configured attempt budget; after that the
//! monitor switches itself off instead of looping.

use crate::codes::{AttemptBudget, DEFAULT_DRIVE_ATTEMPTS, DEFAULT_DRIVE_TIMEOUT, ResponseTimeout};
use crate::lines::LineDriver;
use crate::response::{Ack, CommandResult, Rejection};
use crate::sequencer::Sequencer;

const STATUS_MONITORING: u16 = 1 << 6;
const STATUS_PAUSED: u16 = 1 << 7;
const STATUS_ATTEMPTS_SHIFT: u16 = 8;

/// Drive-activity monitor state machine.
#[derive(Clone, Debug)]
pub struct DriveMonitor {
    monitoring: bool,
    paused: bool,
    elapsed_ms: u32,
    timeout: ResponseTimeout,
    attempts: AttemptBudget,
    attempts_used: u8,
}

impl DriveMonitor {
    pub const fn new(timeout: ResponseTimeout, attempts: AttemptBudget) -> Self {
        Self {
            monitoring: false,
            paused: false,
            elapsed_ms: 0,
            timeout,
            attempts,
            attempts_used: 0,
        }
    }

    pub const fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    pub const fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    pub const fn timeout(&self) -> ResponseTimeout {
        self.timeout
    }

    pub const fn attempts(&self) -> AttemptBudget {
        self.attempts
    }

    /// Soft resets issued since the monitor was started.
    pub const fn attempts_used(&self) -> u8 {
        self.attempts_used
    }

    pub fn start(&mut self) -> CommandResult {
        if self.monitoring {
            return Err(Rejection::Busy);
        }
        self.elapsed_ms = 0;
        self.attempts_used = 0;
        self.paused = false;
        self.monitoring = true;
        Ok(Ack::DriveStarted)
    }

    pub fn stop(&mut self) -> CommandResult {
        self.monitoring = false;
        self.paused = false;
        Ok(Ack::DriveStopped)
    }

    /// Freezes the inactivity window.
    pub fn pause(&mut self) -> CommandResult {
        self.paused = true;
        Ok(Ack::DrivePaused)
    }

    pub fn resume(&mut self) -> CommandResult {
        self.paused = false;
        Ok(Ack::DriveResumed)
    }

    pub fn set_timeout(&mut self, code: u8) -> CommandResult {
        self.ensure_stopped()?;
        self.timeout = ResponseTimeout::from_code(code);
        Ok(Ack::DriveTimeoutSet)
    }

    pub fn set_attempts(&mut self, code: u8) -> CommandResult {
        self.ensure_stopped()?;
        self.attempts = AttemptBudget::from_code(code);
        Ok(Ack::DriveAttemptsSet)
    }

    /// Replaces timeout and budget together.
    pub fn configure(
        &mut self,
        timeout: ResponseTimeout,
        attempts: AttemptBudget,
    ) -> Result<(), Rejection> {
        self.ensure_stopped()?;
        self.timeout = timeout;
        self.attempts = attempts;
        Ok(())
    }

    /// Bits 0-5 timeout code, bit 6 monitoring, bit 7 paused, bits 8-10
    /// attempts code.
    pub fn status(&self) -> u16 {
        let mut status = u16::from(self.timeout.code());
        if self.monitoring {
            status |= STATUS_MONITORING;
        }
        if self.paused {
            status |= STATUS_PAUSED;
        }
        status | (u16::from(self.attempts.code()) << STATUS_ATTEMPTS_SHIFT)
    }

    pub const fn needs_ticks(&self) -> bool {
        self.monitoring && !self.paused
    }

    pub const fn listening_for_activity(&self) -> bool {
        self.monitoring
    }

    /// Any activity pulse proves the host is alive.
    pub fn on_activity(&mut self) {
        self.elapsed_ms = 0;
    }

    pub fn tick<L: LineDriver>(&mut self, sequencer: &mut Sequencer, lines: &mut L) {
        if !self.monitoring || self.paused {
            return;
        }

        self.elapsed_ms = self.elapsed_ms.saturating_add(1);
        if self.elapsed_ms < self.timeout.as_millis() {
            return;
        }

        self.elapsed_ms = 0;
        if self.attempts_used < self.attempts.attempts() {
            self.attempts_used += 1;
            // A pulse already in flight consumes the attempt.
            let _ = sequencer.soft_reset(lines);
        } else {
            self.monitoring = false;
            self.attempts_used = 0;
        }
    }

    fn ensure_stopped(&self) -> Result<(), Rejection> {
        if self.monitoring {
            Err(Rejection::Busy)
        } else {
            Ok(())
        }
    }
}

impl Default for DriveMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_DRIVE_TIMEOUT, DEFAULT_DRIVE_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::lines::NoopLineDriver;

    fn run(monitor: &mut DriveMonitor, sequencer: &mut Sequencer, ticks: u32) {
        let mut lines = NoopLineDriver::new();
        for _ in 0..ticks {
            monitor.tick(sequencer, &mut lines);
            sequencer.tick(&mut lines);
        }
    }

    #[test]
    fn default_status_packs_codes() {
        let monitor = DriveMonitor::default();
        assert_eq!(monitor.status(), 0x020B);
    }

    #[test]
    fn status_reflects_flags() {
        let mut monitor = DriveMonitor::default();
        monitor.start().unwrap();
        monitor.pause().unwrap();
        assert_eq!(monitor.status(), 0x020B | STATUS_MONITORING | STATUS_PAUSED);
    }

    #[test]
    fn configuration_is_locked_while_monitoring() {
        let mut monitor = DriveMonitor::default();
        monitor.start().unwrap();

        assert_eq!(monitor.set_timeout(0), Err(Rejection::Busy));
        assert_eq!(monitor.set_attempts(0), Err(Rejection::Busy));
        assert_eq!(monitor.start(), Err(Rejection::Busy));

        monitor.stop().unwrap();
        assert_eq!(monitor.set_timeout(0), Ok(Ack::DriveTimeoutSet));
        assert_eq!(monitor.timeout().as_millis(), 5_000);
    }

    #[test]
    fn exhausted_budget_disables_monitor() {
        let mut sequencer = Sequencer::default();
        let mut monitor = DriveMonitor::new(ResponseTimeout::from_code(0), AttemptBudget::from_code(1));
        monitor.start().unwrap();

        run(&mut monitor, &mut sequencer, 10_000);
        assert_eq!(monitor.attempts_used(), 2);
        assert!(monitor.is_monitoring());

        run(&mut monitor, &mut sequencer, 5_000);
        assert!(!monitor.is_monitoring());
        assert_eq!(monitor.attempts_used(), 0);
        assert!(!monitor.needs_ticks());
    }
}
