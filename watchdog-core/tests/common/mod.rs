//! Shared test rig for watchdog-core integration tests.

#![allow(dead_code)] // Each test file uses a different subset.

use watchdog_core::Watchdog;
use watchdog_core::activity::ActivityInterrupt;
use watchdog_core::lines::{LineAction, LineDriver, LineId};
use watchdog_core::sequencer::SequencerTiming;
use watchdog_core::settings::Settings;
use watchdog_core::supervisor::{EventSink, SupervisorEvent};
use watchdog_core::time::TickSource;

/// Line driver that queues every call until the rig stamps it.
#[derive(Debug, Default)]
pub struct RecordingLines {
    pending: Vec<(LineId, LineAction)>,
}

impl LineDriver for RecordingLines {
    fn apply(&mut self, line: LineId, action: LineAction) {
        self.pending.push((line, action));
    }
}

/// Tick source that remembers whether it is running.
#[derive(Debug, Default)]
pub struct FlagClock {
    pub running: bool,
    pub starts: u32,
}

impl TickSource for FlagClock {
    fn start(&mut self) {
        self.running = true;
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

/// Activity interrupt that remembers whether it is unmasked.
#[derive(Debug, Default)]
pub struct FlagInterrupt {
    pub unmasked: bool,
}

impl ActivityInterrupt for FlagInterrupt {
    fn enable(&mut self) {
        self.unmasked = true;
    }

    fn disable(&mut self) {
        self.unmasked = false;
    }
}

/// Event sink collecting `(event, uptime)` pairs.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<(SupervisorEvent, u32)>,
}

impl EventLog {
    /// Events other than heartbeats, in order.
    pub fn phase_changes(&self) -> Vec<SupervisorEvent> {
        self.events
            .iter()
            .map(|(event, _)| *event)
            .filter(|event| *event != SupervisorEvent::Heartbeat)
            .collect()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: SupervisorEvent, uptime_ms: u32) {
        self.events.push((event, uptime_ms));
    }
}

/// A line transition stamped with the rig's wall clock.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub at_ms: u64,
    pub line: LineId,
    pub action: LineAction,
}

pub type TestWatchdog = Watchdog<RecordingLines, FlagClock, FlagInterrupt, EventLog>;

/// Watchdog plus a wall clock that keeps counting while the engine's own
/// tick source is stopped.
pub struct Rig {
    pub watchdog: TestWatchdog,
    pub now_ms: u64,
    pub transitions: Vec<Transition>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_settings(Settings::DEFAULT)
    }

    pub fn with_settings(settings: Settings) -> Self {
        let watchdog = Watchdog::with_settings(
            RecordingLines::default(),
            FlagClock::default(),
            FlagInterrupt::default(),
            EventLog::default(),
            settings,
            SequencerTiming::DEFAULT,
        );
        let mut rig = Self {
            watchdog,
            now_ms: 0,
            transitions: Vec::new(),
        };
        rig.collect();
        rig.transitions.clear();
        rig
    }

    /// Runs `op` against the engine and stamps the line calls it made.
    pub fn call<R>(&mut self, op: impl FnOnce(&mut TestWatchdog) -> R) -> R {
        let result = op(&mut self.watchdog);
        self.collect();
        result
    }

    /// Delivers `ticks` timer interrupts, one per millisecond.
    pub fn advance(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.now_ms += 1;
            self.watchdog.tick();
            self.collect();
        }
    }

    /// Transitions on the reset and power lines.
    pub fn host_transitions(&self) -> Vec<Transition> {
        self.transitions
            .iter()
            .copied()
            .filter(|transition| transition.line != LineId::Led)
            .collect()
    }

    pub fn count(&self, line: LineId, action: LineAction) -> usize {
        self.transitions
            .iter()
            .filter(|transition| transition.line == line && transition.action == action)
            .count()
    }

    pub fn soft_resets(&self) -> usize {
        self.count(LineId::Reset, LineAction::AssertLow)
    }

    /// Each hard reset asserts the power line twice.
    pub fn hard_resets(&self) -> usize {
        self.count(LineId::Power, LineAction::AssertLow) / 2
    }

    fn collect(&mut self) {
        let now_ms = self.now_ms;
        let pending = std::mem::take(&mut self.watchdog.lines_mut().pending);
        self.transitions
            .extend(pending.into_iter().map(|(line, action)| Transition {
                at_ms: now_ms,
                line,
                action,
            }));
    }
}
