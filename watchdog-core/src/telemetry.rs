//! Telemetry ring shared by the firmware and the emulator.
//!
//! Line transitions and supervisor events are stored with compact numeric
//! codes so they can be mirrored over a diagnostics channel. Line transitions
//! also carry the time since the previous transition, which makes pulse
//! widths directly readable from the log.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::lines::{LineAction, LineId};
use crate::supervisor::{EventSink, SupervisorEvent};

/// Identifier assigned to each recorded event.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryEvent {
    LineAsserted(LineId),
    LineReleased(LineId),
    Supervisor(SupervisorEvent),
    Custom(u16),
}

impl fmt::Display for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEvent::LineAsserted(line) => write!(f, "line-asserted {line:?}"),
            TelemetryEvent::LineReleased(line) => write!(f, "line-released {line:?}"),
            TelemetryEvent::Supervisor(event) => f.write_str(event.label()),
            TelemetryEvent::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl TelemetryEvent {
    const LINE_ASSERT_BASE: u16 = 0x0000;
    const LINE_RELEASE_BASE: u16 = 0x0004;
    const SUPERVISOR_BASE: u16 = 0x0010;
    const SUPERVISOR_COUNT: u16 = 5;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEvent::LineAsserted(line) => Self::LINE_ASSERT_BASE + line.as_index() as u16,
            TelemetryEvent::LineReleased(line) => Self::LINE_RELEASE_BASE + line.as_index() as u16,
            TelemetryEvent::Supervisor(event) => Self::SUPERVISOR_BASE + supervisor_index(event),
            TelemetryEvent::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`TelemetryEvent::Custom`].
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            value if (Self::LINE_ASSERT_BASE..Self::LINE_RELEASE_BASE).contains(&value) => {
                LineId::from_index(usize::from(value - Self::LINE_ASSERT_BASE))
                    .map_or(TelemetryEvent::Custom(value), TelemetryEvent::LineAsserted)
            }
            value if (Self::LINE_RELEASE_BASE..Self::SUPERVISOR_BASE).contains(&value) => {
                LineId::from_index(usize::from(value - Self::LINE_RELEASE_BASE))
                    .map_or(TelemetryEvent::Custom(value), TelemetryEvent::LineReleased)
            }
            value
                if (Self::SUPERVISOR_BASE..Self::SUPERVISOR_BASE + Self::SUPERVISOR_COUNT)
                    .contains(&value) =>
            {
                supervisor_from_index(value - Self::SUPERVISOR_BASE)
                    .map_or(TelemetryEvent::Custom(value), TelemetryEvent::Supervisor)
            }
            other => TelemetryEvent::Custom(other),
        }
    }

    pub const fn for_line(line: LineId, action: LineAction) -> Self {
        match action {
            LineAction::AssertLow => TelemetryEvent::LineAsserted(line),
            LineAction::Release => TelemetryEvent::LineReleased(line),
        }
    }
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryRecord {
    pub id: EventId,
    pub at_ms: u32,
    pub event: TelemetryEvent,
    /// Milliseconds since the previous line transition, for line events.
    pub since_previous_ms: Option<u32>,
}

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: HistoryBuf<TelemetryRecord, CAPACITY>,
    last_transition_at: Option<u32>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_transition_at: None,
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn clear(&mut self) {
        self.ring.clear();
        self.last_transition_at = None;
    }

    /// Records a line transition and the time since the previous one.
    pub fn record_line_transition(&mut self, line: LineId, action: LineAction, at_ms: u32) -> EventId {
        let since = self
            .last_transition_at
            .map(|previous| at_ms.wrapping_sub(previous));
        self.last_transition_at = Some(at_ms);
        self.record(TelemetryEvent::for_line(line, action), at_ms, since)
    }

    pub fn record_supervisor_event(&mut self, event: SupervisorEvent, at_ms: u32) -> EventId {
        self.record(TelemetryEvent::Supervisor(event), at_ms, None)
    }

    pub fn record(
        &mut self,
        event: TelemetryEvent,
        at_ms: u32,
        since_previous_ms: Option<u32>,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            at_ms,
            event,
            since_previous_ms,
        });
        id
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAPACITY: usize> EventSink for TelemetryRecorder<CAPACITY> {
    fn emit(&mut self, event: SupervisorEvent, uptime_ms: u32) {
        self.record_supervisor_event(event, uptime_ms);
    }
}

const fn supervisor_index(event: SupervisorEvent) -> u16 {
    match event {
        SupervisorEvent::Heartbeat => 0,
        SupervisorEvent::FirstReset => 1,
        SupervisorEvent::SoftReset => 2,
        SupervisorEvent::HardReset => 3,
        SupervisorEvent::MovedToIdle => 4,
    }
}

fn supervisor_from_index(index: u16) -> Option<SupervisorEvent> {
    match index {
        0 => Some(SupervisorEvent::Heartbeat),
        1 => Some(SupervisorEvent::FirstReset),
        2 => Some(SupervisorEvent::SoftReset),
        3 => Some(SupervisorEvent::HardReset),
        4 => Some(SupervisorEvent::MovedToIdle),
        _ => None,
    }
}
