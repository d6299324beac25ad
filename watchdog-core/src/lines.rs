//! Physical output lines driven by the supervisor.
//!
//! The reset and power lines are wired open-drain to the host's front-panel
//! header: asserting pulls the host pin low, releasing lets the host's own
//! pull-up take it high again. The status LED uses the same abstraction so the
//! indicator controller can share the driver.

/// Identifier for the logical output lines exposed by the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineId {
    Reset,
    Power,
    Led,
}

impl LineId {
    /// Deterministic index for lookups into [`ALL_LINES`].
    pub const fn as_index(self) -> usize {
        match self {
            LineId::Reset => 0,
            LineId::Power => 1,
            LineId::Led => 2,
        }
    }

    /// Attempts to construct a [`LineId`] from a raw index.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(LineId::Reset),
            1 => Some(LineId::Power),
            2 => Some(LineId::Led),
            _ => None,
        }
    }
}

/// Level a line rests at when nothing drives it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineIdleState {
    ReleasedHigh,
    DrivenLow,
}

/// Metadata describing how a line is routed on the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LineInfo {
    pub id: LineId,
    pub name: &'static str,
    pub mcu_pin: &'static str,
    pub idle: LineIdleState,
}

impl LineInfo {
    pub const fn new(
        id: LineId,
        name: &'static str,
        mcu_pin: &'static str,
        idle: LineIdleState,
    ) -> Self {
        Self {
            id,
            name,
            mcu_pin,
            idle,
        }
    }
}

/// Compile-time catalog of every output line.
pub const ALL_LINES: [LineInfo; 3] = [
    LineInfo::new(LineId::Reset, "RESET*", "PA4", LineIdleState::ReleasedHigh),
    LineInfo::new(LineId::Power, "PWR*", "PA2", LineIdleState::ReleasedHigh),
    LineInfo::new(LineId::Led, "LED", "PA5", LineIdleState::DrivenLow),
];

/// Retrieve line metadata by identifier.
pub const fn line_by_id(id: LineId) -> LineInfo {
    ALL_LINES[id.as_index()]
}

/// Action taken on a line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineAction {
    AssertLow,
    Release,
}

impl LineAction {
    /// Action that produces the requested logical level.
    pub const fn for_level(high: bool) -> Self {
        if high {
            LineAction::Release
        } else {
            LineAction::AssertLow
        }
    }

    /// Short label used in logs and console output.
    pub const fn label(self) -> &'static str {
        match self {
            LineAction::AssertLow => "assert-low",
            LineAction::Release => "release",
        }
    }
}

/// Abstraction over the physical line drivers.
pub trait LineDriver {
    /// Applies the requested action to the line.
    fn apply(&mut self, line: LineId, action: LineAction);

    /// Releases every line to its idle level.
    fn release_all(&mut self) {
        self.apply(LineId::Reset, LineAction::Release);
        self.apply(LineId::Power, LineAction::Release);
        self.apply(LineId::Led, LineAction::AssertLow);
    }
}

/// Line driver that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopLineDriver;

impl NoopLineDriver {
    /// Creates a new no-op line driver.
    pub const fn new() -> Self {
        Self
    }
}

impl LineDriver for NoopLineDriver {
    fn apply(&mut self, _: LineId, _: LineAction) {}

    fn release_all(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_lookup_returns_expected_metadata() {
        let reset = line_by_id(LineId::Reset);
        assert_eq!(reset.name, "RESET*");
        assert_eq!(reset.mcu_pin, "PA4");
        assert_eq!(reset.idle, LineIdleState::ReleasedHigh);

        let led = line_by_id(LineId::Led);
        assert_eq!(led.idle, LineIdleState::DrivenLow);
    }

    #[test]
    fn index_round_trips_for_every_line() {
        for info in ALL_LINES {
            assert_eq!(LineId::from_index(info.id.as_index()), Some(info.id));
        }
        assert_eq!(LineId::from_index(3), None);
    }

    #[test]
    fn action_for_level_maps_high_to_release() {
        assert_eq!(LineAction::for_level(true), LineAction::Release);
        assert_eq!(LineAction::for_level(false), LineAction::AssertLow);
    }
}
