//! Shared status surface for the console.
//!
//! [`StatusSnapshot`] samples the engine in one go so the rendered lines are
//! mutually consistent, and [`StatusFormatter`] keeps the textual rendering
//! identical across front-ends.

use core::fmt;

use crate::activity::ActivityInterrupt;
use crate::codes::{AttemptBudget, ResponseTimeout, StatusWord};
use crate::indicator::IndicatorMode;
use crate::lines::{ALL_LINES, LineDriver, LineId, line_by_id};
use crate::sequencer::SequencerState;
use crate::supervisor::{EventSink, SupervisorConfig, SupervisorPhase};
use crate::time::TickSource;
use crate::watchdog::Watchdog;

/// Sampled level of one output line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineSample {
    pub id: LineId,
    /// `true` while the line is pulled low.
    pub asserted: bool,
}

impl LineSample {
    #[must_use]
    pub const fn new(id: LineId, asserted: bool) -> Self {
        Self { id, asserted }
    }
}

/// Consistent view of every state machine at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub uptime_ms: u32,
    pub word: StatusWord,
    pub phase: SupervisorPhase,
    pub config: SupervisorConfig,
    pub elapsed_ms: u32,
    pub soft_remaining: u8,
    pub hard_remaining: u8,
    pub events_enabled: bool,
    pub drive_status: u16,
    pub drive_elapsed_ms: u32,
    pub drive_attempts_used: u8,
    pub indicator: IndicatorMode,
    pub indicator_disabled: bool,
    pub indicator_high: bool,
    pub sequencer: SequencerState,
    pub lines: [LineSample; 3],
}

impl StatusSnapshot {
    /// Samples `watchdog`. Line levels come from the caller because only the
    /// line driver knows them.
    pub fn capture<L, C, A, E>(watchdog: &Watchdog<L, C, A, E>, lines: [LineSample; 3]) -> Self
    where
        L: LineDriver,
        C: TickSource,
        A: ActivityInterrupt,
        E: EventSink,
    {
        let supervisor = watchdog.supervisor();
        let drive = watchdog.drive();
        let indicator = watchdog.indicator();
        Self {
            uptime_ms: watchdog.uptime_ms(),
            word: supervisor.status(),
            phase: supervisor.phase(),
            config: supervisor.config(),
            elapsed_ms: supervisor.elapsed_ms(),
            soft_remaining: supervisor.soft_remaining(),
            hard_remaining: supervisor.hard_remaining(),
            events_enabled: supervisor.events_enabled(),
            drive_status: drive.status(),
            drive_elapsed_ms: drive.elapsed_ms(),
            drive_attempts_used: drive.attempts_used(),
            indicator: indicator.mode(),
            indicator_disabled: indicator.is_disabled(),
            indicator_high: indicator.output_high(),
            sequencer: watchdog.sequencer().state(),
            lines,
        }
    }

    /// Line samples with every line released.
    #[must_use]
    pub const fn released_lines() -> [LineSample; 3] {
        [
            LineSample::new(ALL_LINES[0].id, false),
            LineSample::new(ALL_LINES[1].id, false),
            LineSample::new(ALL_LINES[2].id, false),
        ]
    }
}

/// Renders a [`StatusSnapshot`] into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// `status word=0x0048441C drive=0x020B uptime=+1.5s`
    pub fn write_word_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "status word=0x{:08X} drive=0x{:04X} uptime=",
            self.snapshot.word.raw(),
            self.snapshot.drive_status
        )?;
        write_millis(writer, self.snapshot.uptime_ms)
    }

    /// `supervisor phase=response-window elapsed=+1.2s soft=3/3 hard=3/3 ...`
    pub fn write_supervisor_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let snapshot = self.snapshot;
        let config = &snapshot.config;
        writer.write_str("supervisor phase=")?;
        writer.write_str(match snapshot.phase {
            SupervisorPhase::Disabled => "disabled",
            SupervisorPhase::ResponseWindow => "response-window",
            SupervisorPhase::RebootWindow { escalated: false } => "reboot-window",
            SupervisorPhase::RebootWindow { escalated: true } => "reboot-window-hard",
        })?;
        writer.write_str(" elapsed=")?;
        write_millis(writer, snapshot.elapsed_ms)?;
        writer.write_str(" response=")?;
        write_millis(writer, config.response.as_millis())?;
        writer.write_str(" reboot=")?;
        write_millis(writer, config.reboot.as_millis())?;
        write!(
            writer,
            " soft={}/{} hard={}/{} hard-reset={} link={} events={}",
            snapshot.soft_remaining,
            config.soft.attempts(),
            snapshot.hard_remaining,
            config.hard.attempts(),
            on_off(config.hard_reset_enabled),
            on_off(config.activity_linked),
            on_off(snapshot.events_enabled),
        )
    }

    /// `drive monitoring=on paused=off elapsed=+4.0s timeout=+60.0s attempts=1/3`
    pub fn write_drive_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        let snapshot = self.snapshot;
        let status = snapshot.drive_status;
        let [low, high] = status.to_le_bytes();
        let timeout = ResponseTimeout::from_code(low & 0x3F);
        let attempts = AttemptBudget::from_code(high);
        write!(
            writer,
            "drive monitoring={} paused={} elapsed=",
            on_off(status & (1 << 6) != 0),
            on_off(status & (1 << 7) != 0),
        )?;
        write_millis(writer, snapshot.drive_elapsed_ms)?;
        writer.write_str(" timeout=")?;
        write_millis(writer, timeout.as_millis())?;
        write!(
            writer,
            " attempts={}/{}",
            snapshot.drive_attempts_used,
            attempts.attempts()
        )
    }

    /// `indicator mode=blink-slow led=low override=off`
    pub fn write_indicator_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(
            writer,
            "indicator mode={} led={} override={}",
            self.snapshot.indicator,
            if self.snapshot.indicator_high {
                "high"
            } else {
                "low"
            },
            on_off(self.snapshot.indicator_disabled),
        )
    }

    /// `lines RESET*=released PWR*=asserted LED=released sequencer=hard-low`
    pub fn write_lines_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        writer.write_str("lines")?;
        for sample in &self.snapshot.lines {
            let name = line_by_id(sample.id).name;
            let state = if sample.asserted {
                "asserted"
            } else {
                "released"
            };
            write!(writer, " {name}={state}")?;
        }
        writer.write_str(" sequencer=")?;
        writer.write_str(match self.snapshot.sequencer {
            SequencerState::Idle => "idle",
            SequencerState::Pulse {
                line: LineId::Power,
                ..
            } => "power-pulse",
            SequencerState::Pulse { .. } => "soft-pulse",
            SequencerState::HardLow { .. } => "hard-low",
            SequencerState::HardReleased { .. } => "hard-released",
            SequencerState::HardSecondPulse { .. } => "hard-second-pulse",
        })
    }
}

const fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

/// Writes `+250ms` below one second and `+1.5s` above.
pub fn write_millis<W: fmt::Write>(writer: &mut W, millis: u32) -> fmt::Result {
    if millis >= 1_000 {
        let seconds = millis / 1_000;
        let tenths = (millis % 1_000) / 100;
        write!(writer, "+{seconds}.{tenths}s")
    } else {
        write!(writer, "+{millis}ms")
    }
}

#[cfg(test)]
mod tests {
    use heapless::String;

    use super::*;
    use crate::activity::NoopActivityInterrupt;
    use crate::lines::NoopLineDriver;
    use crate::supervisor::NoopEventSink;
    use crate::time::NoopTickSource;

    fn snapshot() -> StatusSnapshot {
        let watchdog = Watchdog::new(
            NoopLineDriver::new(),
            NoopTickSource,
            NoopActivityInterrupt,
            NoopEventSink,
        );
        StatusSnapshot::capture(&watchdog, StatusSnapshot::released_lines())
    }

    #[test]
    fn renders_default_status_word() {
        let snapshot = snapshot();
        let mut line = String::<128>::new();
        StatusFormatter::new(&snapshot)
            .write_word_line(&mut line)
            .unwrap();
        assert_eq!(
            line.as_str(),
            "status word=0x0048441C drive=0x020B uptime=+0ms"
        );
    }

    #[test]
    fn renders_supervisor_defaults() {
        let snapshot = snapshot();
        let mut line = String::<160>::new();
        StatusFormatter::new(&snapshot)
            .write_supervisor_line(&mut line)
            .unwrap();
        assert_eq!(
            line.as_str(),
            "supervisor phase=disabled elapsed=+0ms response=+90.0s reboot=+150.0s \
             soft=3/3 hard=3/3 hard-reset=off link=off events=off"
        );
    }

    #[test]
    fn renders_line_levels() {
        let mut snapshot = snapshot();
        snapshot.lines[1].asserted = true;
        let mut line = String::<128>::new();
        StatusFormatter::new(&snapshot)
            .write_lines_line(&mut line)
            .unwrap();
        assert_eq!(
            line.as_str(),
            "lines RESET*=released PWR*=asserted LED=released sequencer=idle"
        );
    }

    #[test]
    fn millis_switch_to_seconds() {
        let mut text = String::<32>::new();
        write_millis(&mut text, 999).unwrap();
        text.push(' ').unwrap();
        write_millis(&mut text, 1_250).unwrap();
        assert_eq!(text.as_str(), "+999ms +1.2s");
    }
}
