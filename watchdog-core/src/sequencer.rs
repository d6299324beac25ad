//! Reboot pulse generator for the reset and power lines.
//!
//! A soft reset is a short low pulse on RESET*. A power pulse is the same
//! pulse on PWR*. A hard reset holds PWR* low long enough to force the host
//! off, releases it, then pulses it again to power the host back on:
//!
//! ```text
//! PWR*  ‾‾‾|___________ hold ___________|‾‾ release ‾‾|_ pulse _|‾‾‾‾
//! ```
//!
//! Only one sequence runs at a time. Requests made while a sequence is in
//! flight are rejected with [`Rejection::Busy`] and never restart or queue.
//! An asserted pulse always runs to completion.

use crate::lines::{LineAction, LineDriver, LineId};
use crate::response::{Ack, CommandResult, Rejection};

/// Durations of the pulse phases, in milliseconds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequencerTiming {
    /// Low time of a soft reset, a power pulse, and the hard reset tail.
    pub pulse_ms: u16,
    /// Low time of the first hard reset phase.
    pub hold_ms: u16,
    /// High time between the two hard reset phases.
    pub release_ms: u16,
}

impl SequencerTiming {
    pub const DEFAULT: Self = Self {
        pulse_ms: 200,
        hold_ms: 6_000,
        release_ms: 2_000,
    };

    /// Total length of a hard reset sequence.
    pub const fn hard_reset_ms(&self) -> u32 {
        self.hold_ms as u32 + self.release_ms as u32 + self.pulse_ms as u32
    }
}

impl Default for SequencerTiming {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Phase of the sequencer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerState {
    Idle,
    /// Short low pulse on `line`.
    Pulse { line: LineId, elapsed_ms: u16 },
    /// PWR* held low.
    HardLow { elapsed_ms: u16 },
    /// PWR* released between the two hard reset phases.
    HardReleased { elapsed_ms: u16 },
    /// Closing PWR* pulse of a hard reset.
    HardSecondPulse { elapsed_ms: u16 },
}

impl SequencerState {
    pub const fn is_idle(self) -> bool {
        matches!(self, SequencerState::Idle)
    }
}

/// Reboot sequencer state machine.
#[derive(Clone, Debug)]
pub struct Sequencer {
    state: SequencerState,
    timing: SequencerTiming,
}

impl Sequencer {
    pub const fn new(timing: SequencerTiming) -> Self {
        Self {
            state: SequencerState::Idle,
            timing,
        }
    }

    pub const fn state(&self) -> SequencerState {
        self.state
    }

    pub const fn timing(&self) -> SequencerTiming {
        self.timing
    }

    pub const fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Every non-idle phase counts ticks.
    pub const fn needs_ticks(&self) -> bool {
        !self.state.is_idle()
    }

    /// Pulses RESET* low.
    pub fn soft_reset<L: LineDriver>(&mut self, lines: &mut L) -> CommandResult {
        self.begin_pulse(LineId::Reset, lines)?;
        Ok(Ack::SoftResetStarted)
    }

    /// Pulses PWR* low.
    pub fn power_pulse<L: LineDriver>(&mut self, lines: &mut L) -> CommandResult {
        self.begin_pulse(LineId::Power, lines)?;
        Ok(Ack::PowerPulseStarted)
    }

    /// Starts the hold/release/pulse power cycle on PWR*.
    ///
    /// A second request during the hold phase is rejected like any other
    /// request and leaves the running hold time untouched.
    pub fn hard_reset<L: LineDriver>(&mut self, lines: &mut L) -> CommandResult {
        self.ensure_idle()?;
        lines.apply(LineId::Power, LineAction::AssertLow);
        self.state = SequencerState::HardLow { elapsed_ms: 0 };
        Ok(Ack::HardResetStarted)
    }

    pub fn tick<L: LineDriver>(&mut self, lines: &mut L) {
        let timing = self.timing;
        self.state = match self.state {
            SequencerState::Idle => SequencerState::Idle,
            SequencerState::Pulse { line, elapsed_ms } => {
                let elapsed_ms = elapsed_ms.saturating_add(1);
                if elapsed_ms >= timing.pulse_ms {
                    lines.apply(line, LineAction::Release);
                    SequencerState::Idle
                } else {
                    SequencerState::Pulse { line, elapsed_ms }
                }
            }
            SequencerState::HardLow { elapsed_ms } => {
                let elapsed_ms = elapsed_ms.saturating_add(1);
                if elapsed_ms >= timing.hold_ms {
                    lines.apply(LineId::Power, LineAction::Release);
                    SequencerState::HardReleased { elapsed_ms: 0 }
                } else {
                    SequencerState::HardLow { elapsed_ms }
                }
            }
            SequencerState::HardReleased { elapsed_ms } => {
                let elapsed_ms = elapsed_ms.saturating_add(1);
                if elapsed_ms >= timing.release_ms {
                    lines.apply(LineId::Power, LineAction::AssertLow);
                    SequencerState::HardSecondPulse { elapsed_ms: 0 }
                } else {
                    SequencerState::HardReleased { elapsed_ms }
                }
            }
            SequencerState::HardSecondPulse { elapsed_ms } => {
                let elapsed_ms = elapsed_ms.saturating_add(1);
                if elapsed_ms >= timing.pulse_ms {
                    lines.apply(LineId::Power, LineAction::Release);
                    SequencerState::Idle
                } else {
                    SequencerState::HardSecondPulse { elapsed_ms }
                }
            }
        };
    }

    fn begin_pulse<L: LineDriver>(&mut self, line: LineId, lines: &mut L) -> Result<(), Rejection> {
        self.ensure_idle()?;
        lines.apply(line, LineAction::AssertLow);
        self.state = SequencerState::Pulse {
            line,
            elapsed_ms: 0,
        };
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), Rejection> {
        if self.state.is_idle() {
            Ok(())
        } else {
            Err(Rejection::Busy)
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(SequencerTiming::DEFAULT)
    }
}
