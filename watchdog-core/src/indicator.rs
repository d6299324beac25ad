//! Status LED controller.
//!
//! The LED reflects the supervisor phase: glowing while idle, slow blink while
//! supervising, mid blink after the first reset and fast blink once hard
//! resets have started. An independent override forces the LED dark without
//! losing the logical mode and phase.

use core::fmt;

use crate::lines::{LineAction, LineDriver, LineId};

/// Half-period of the fast blink, in milliseconds.
pub const BLINK_FAST_MS: u16 = 100;
/// Half-period of the mid blink, in milliseconds.
pub const BLINK_MID_MS: u16 = 250;
/// Half-period of the slow blink, in milliseconds.
pub const BLINK_SLOW_MS: u16 = 500;

/// Display mode of the status LED.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorMode {
    Off,
    Glow,
    BlinkFast,
    BlinkMid,
    BlinkSlow,
}

impl IndicatorMode {
    pub const fn as_index(self) -> usize {
        match self {
            IndicatorMode::Off => 0,
            IndicatorMode::Glow => 1,
            IndicatorMode::BlinkFast => 2,
            IndicatorMode::BlinkMid => 3,
            IndicatorMode::BlinkSlow => 4,
        }
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(IndicatorMode::Off),
            1 => Some(IndicatorMode::Glow),
            2 => Some(IndicatorMode::BlinkFast),
            3 => Some(IndicatorMode::BlinkMid),
            4 => Some(IndicatorMode::BlinkSlow),
            _ => None,
        }
    }

    /// Toggle period for blink modes; `None` for steady modes.
    pub const fn half_period_ms(self) -> Option<u16> {
        match self {
            IndicatorMode::Off | IndicatorMode::Glow => None,
            IndicatorMode::BlinkFast => Some(BLINK_FAST_MS),
            IndicatorMode::BlinkMid => Some(BLINK_MID_MS),
            IndicatorMode::BlinkSlow => Some(BLINK_SLOW_MS),
        }
    }

    /// Level the LED takes as soon as the mode is selected.
    pub const fn initial_level(self) -> bool {
        matches!(self, IndicatorMode::Glow)
    }
}

impl fmt::Display for IndicatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IndicatorMode::Off => "off",
            IndicatorMode::Glow => "glow",
            IndicatorMode::BlinkFast => "blink-fast",
            IndicatorMode::BlinkMid => "blink-mid",
            IndicatorMode::BlinkSlow => "blink-slow",
        };
        f.write_str(label)
    }
}

/// LED mode state machine with an enable override.
#[derive(Clone, Debug)]
pub struct Indicator {
    mode: IndicatorMode,
    disabled: bool,
    phase_high: bool,
    elapsed_ms: u16,
}

impl Indicator {
    pub const fn new() -> Self {
        Self {
            mode: IndicatorMode::Off,
            disabled: false,
            phase_high: false,
            elapsed_ms: 0,
        }
    }

    pub const fn mode(&self) -> IndicatorMode {
        self.mode
    }

    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Logical phase, tracked even while the override holds the LED dark.
    pub const fn phase_high(&self) -> bool {
        self.phase_high
    }

    /// Level currently presented on the LED pin.
    pub const fn output_high(&self) -> bool {
        self.phase_high && !self.disabled
    }

    /// Selects `mode` and drives the LED to the mode's initial level.
    pub fn set_mode<L: LineDriver>(&mut self, mode: IndicatorMode, lines: &mut L) {
        self.mode = mode;
        self.phase_high = mode.initial_level();
        self.elapsed_ms = 0;
        if !self.disabled {
            Self::drive(lines, self.phase_high);
        }
    }

    /// Lifts the override and re-applies the tracked phase.
    pub fn enable<L: LineDriver>(&mut self, lines: &mut L) {
        self.disabled = false;
        Self::drive(lines, self.phase_high);
    }

    /// Forces the LED low until [`enable`](Self::enable) is called.
    pub fn disable<L: LineDriver>(&mut self, lines: &mut L) {
        self.disabled = true;
        Self::drive(lines, false);
    }

    /// Blink modes only need the clock while the LED is visible.
    pub const fn needs_ticks(&self) -> bool {
        !self.disabled && self.mode.half_period_ms().is_some()
    }

    pub fn tick<L: LineDriver>(&mut self, lines: &mut L) {
        if self.disabled {
            return;
        }
        let Some(period) = self.mode.half_period_ms() else {
            return;
        };

        self.elapsed_ms = self.elapsed_ms.saturating_add(1);
        if self.elapsed_ms >= period {
            self.elapsed_ms = 0;
            self.phase_high = !self.phase_high;
            Self::drive(lines, self.phase_high);
        }
    }

    fn drive<L: LineDriver>(lines: &mut L, high: bool) {
        lines.apply(LineId::Led, LineAction::for_level(high));
    }
}

impl Default for Indicator {
    fn default() -> Self {
        Self::new()
    }
}
