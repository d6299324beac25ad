//! Reset supervisor: ping window, escalation policy and idle fallback.
//!
//! Once started the supervisor expects a ping within the response window.
//! When the window elapses it soft-resets the host and switches to the
//! reboot window, retrying soft resets until the budget is spent, then hard
//! resets (when enabled) until that budget is spent too, then drops back to
//! idle. Configuration can only change while the supervisor is disabled, so
//! the tick handler never observes a half-written setting.

use crate::codes::{
    AttemptBudget, DEFAULT_HARD_ATTEMPTS, DEFAULT_REBOOT_TIMEOUT, DEFAULT_RESPONSE_TIMEOUT,
    DEFAULT_SOFT_ATTEMPTS, RebootTimeout, ResponseTimeout, StatusFields, StatusWord,
};
use crate::indicator::{Indicator, IndicatorMode};
use crate::lines::LineDriver;
use crate::response::{Ack, CommandResult, Rejection};
use crate::sequencer::Sequencer;

/// Interval between heartbeat events while events are enabled.
pub const HEARTBEAT_MS: u16 = 1_000;
/// Dead time after an activity pulse before the interrupt is re-armed.
pub const ACTIVITY_DEBOUNCE_MS: u16 = 1_000;

/// Notification emitted on supervisor phase changes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupervisorEvent {
    Heartbeat,
    FirstReset,
    SoftReset,
    HardReset,
    MovedToIdle,
}

impl SupervisorEvent {
    /// Byte written to the host when events are enabled.
    pub const fn code(self) -> u8 {
        match self {
            SupervisorEvent::Heartbeat => 0xF0,
            SupervisorEvent::FirstReset => 0xF1,
            SupervisorEvent::SoftReset => 0xF2,
            SupervisorEvent::HardReset => 0xF3,
            SupervisorEvent::MovedToIdle => 0xF4,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0xF0 => Some(SupervisorEvent::Heartbeat),
            0xF1 => Some(SupervisorEvent::FirstReset),
            0xF2 => Some(SupervisorEvent::SoftReset),
            0xF3 => Some(SupervisorEvent::HardReset),
            0xF4 => Some(SupervisorEvent::MovedToIdle),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SupervisorEvent::Heartbeat => "heartbeat",
            SupervisorEvent::FirstReset => "first-reset",
            SupervisorEvent::SoftReset => "soft-reset",
            SupervisorEvent::HardReset => "hard-reset",
            SupervisorEvent::MovedToIdle => "moved-to-idle",
        }
    }
}

/// Receiver of supervisor events.
pub trait EventSink {
    fn emit(&mut self, event: SupervisorEvent, uptime_ms: u32);
}

/// Event sink that drops every event.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&mut self, _: SupervisorEvent, _: u32) {}
}

/// Supervision phase.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupervisorPhase {
    Disabled,
    /// Waiting for a ping.
    ResponseWindow,
    /// The host missed its ping and resets are being issued.
    RebootWindow {
        /// The indicator was switched to fast blink by the first hard reset.
        escalated: bool,
    },
}

impl SupervisorPhase {
    pub const fn is_enabled(self) -> bool {
        !matches!(self, SupervisorPhase::Disabled)
    }

    pub const fn response_elapsed(self) -> bool {
        matches!(self, SupervisorPhase::RebootWindow { .. })
    }
}

/// Configuration that may only change while the supervisor is disabled.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SupervisorConfig {
    pub response: ResponseTimeout,
    pub reboot: RebootTimeout,
    pub soft: AttemptBudget,
    pub hard: AttemptBudget,
    pub hard_reset_enabled: bool,
    pub activity_linked: bool,
}

impl SupervisorConfig {
    pub const DEFAULT: Self = Self {
        response: DEFAULT_RESPONSE_TIMEOUT,
        reboot: DEFAULT_REBOOT_TIMEOUT,
        soft: DEFAULT_SOFT_ATTEMPTS,
        hard: DEFAULT_HARD_ATTEMPTS,
        hard_reset_enabled: false,
        activity_linked: false,
    };
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Collaborators the supervisor drives during an operation.
pub struct Peers<'a, L, E> {
    pub lines: &'a mut L,
    pub sequencer: &'a mut Sequencer,
    pub indicator: &'a mut Indicator,
    pub events: &'a mut E,
    pub uptime_ms: u32,
}

/// Reset supervisor state machine.
#[derive(Clone, Debug)]
pub struct Supervisor {
    config: SupervisorConfig,
    phase: SupervisorPhase,
    events_enabled: bool,
    elapsed_ms: u32,
    heartbeat_ms: u16,
    debounce_ms: Option<u16>,
    soft_remaining: u8,
    hard_remaining: u8,
}

impl Supervisor {
    pub const fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            phase: SupervisorPhase::Disabled,
            events_enabled: false,
            elapsed_ms: 0,
            heartbeat_ms: 0,
            debounce_ms: None,
            soft_remaining: config.soft.attempts(),
            hard_remaining: config.hard.attempts(),
        }
    }

    pub const fn phase(&self) -> SupervisorPhase {
        self.phase
    }

    pub const fn config(&self) -> SupervisorConfig {
        self.config
    }

    pub const fn is_enabled(&self) -> bool {
        self.phase.is_enabled()
    }

    pub const fn events_enabled(&self) -> bool {
        self.events_enabled
    }

    /// Milliseconds spent in the current window.
    pub const fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    pub const fn soft_remaining(&self) -> u8 {
        self.soft_remaining
    }

    pub const fn hard_remaining(&self) -> u8 {
        self.hard_remaining
    }

    pub const fn debounce_pending(&self) -> bool {
        self.debounce_ms.is_some()
    }

    pub fn start<L: LineDriver, E: EventSink>(&mut self, peers: Peers<'_, L, E>) -> CommandResult {
        if self.is_enabled() {
            return Err(Rejection::Busy);
        }

        self.elapsed_ms = 0;
        self.phase = SupervisorPhase::ResponseWindow;
        self.soft_remaining = self.config.soft.attempts();
        self.hard_remaining = self.config.hard.attempts();
        self.debounce_ms = None;
        peers.indicator.set_mode(IndicatorMode::BlinkSlow, peers.lines);
        Ok(Ack::SupervisorStarted)
    }

    /// Returns to idle. Any pulse already in flight runs to completion.
    pub fn stop<L: LineDriver, E: EventSink>(&mut self, peers: Peers<'_, L, E>) -> CommandResult {
        peers.indicator.set_mode(IndicatorMode::Glow, peers.lines);
        self.phase = SupervisorPhase::Disabled;
        self.debounce_ms = None;
        Ok(Ack::SupervisorStopped)
    }

    /// Restarts the response window.
    pub fn ping(&mut self) -> CommandResult {
        if self.phase != SupervisorPhase::ResponseWindow {
            return Err(Rejection::Busy);
        }
        self.elapsed_ms = 0;
        Ok(Ack::PingAccepted)
    }

    pub fn enable_hard_reset(&mut self) -> CommandResult {
        self.reconfigure(|config| config.hard_reset_enabled = true)?;
        Ok(Ack::HardResetEnabled)
    }

    pub fn disable_hard_reset(&mut self) -> CommandResult {
        self.reconfigure(|config| config.hard_reset_enabled = false)?;
        Ok(Ack::HardResetDisabled)
    }

    pub fn set_response_timeout(&mut self, code: u8) -> CommandResult {
        self.reconfigure(|config| config.response = ResponseTimeout::from_code(code))?;
        Ok(Ack::ResponseTimeoutSet)
    }

    pub fn set_reboot_timeout(&mut self, code: u8) -> CommandResult {
        self.reconfigure(|config| config.reboot = RebootTimeout::from_code(code))?;
        Ok(Ack::RebootTimeoutSet)
    }

    pub fn set_soft_attempts(&mut self, code: u8) -> CommandResult {
        self.reconfigure(|config| config.soft = AttemptBudget::from_code(code))?;
        Ok(Ack::SoftAttemptsSet)
    }

    pub fn set_hard_attempts(&mut self, code: u8) -> CommandResult {
        self.reconfigure(|config| config.hard = AttemptBudget::from_code(code))?;
        Ok(Ack::HardAttemptsSet)
    }

    /// Uses drive activity as an implicit ping during the response window.
    pub fn link_activity(&mut self) -> CommandResult {
        self.reconfigure(|config| config.activity_linked = true)?;
        Ok(Ack::ActivityLinked)
    }

    pub fn unlink_activity(&mut self) -> CommandResult {
        self.reconfigure(|config| config.activity_linked = false)?;
        Ok(Ack::ActivityUnlinked)
    }

    /// Replaces the whole configuration at once.
    pub fn configure(&mut self, config: SupervisorConfig) -> Result<(), Rejection> {
        self.reconfigure(|current| *current = config)
    }

    /// Allowed in any phase; the heartbeat restarts from zero.
    pub fn enable_events(&mut self) -> CommandResult {
        self.events_enabled = true;
        self.heartbeat_ms = 0;
        Ok(Ack::EventsEnabled)
    }

    pub fn disable_events(&mut self) -> CommandResult {
        self.events_enabled = false;
        Ok(Ack::EventsDisabled)
    }

    pub fn status(&self) -> StatusWord {
        StatusWord::pack(StatusFields {
            reboot: self.config.reboot,
            response: self.config.response,
            soft: self.config.soft,
            hard: self.config.hard,
            supervising: self.phase.is_enabled(),
            response_elapsed: self.phase.response_elapsed(),
            hard_reset_enabled: self.config.hard_reset_enabled,
            activity_linked: self.config.activity_linked,
            events_enabled: self.events_enabled,
        })
    }

    pub const fn needs_ticks(&self) -> bool {
        self.phase.is_enabled() || self.events_enabled || self.debounce_ms.is_some()
    }

    /// The supervisor listens to the activity line only inside the response
    /// window, while linked, and outside the debounce dead time.
    pub fn listening_for_activity(&self) -> bool {
        self.config.activity_linked
            && self.phase == SupervisorPhase::ResponseWindow
            && self.debounce_ms.is_none()
    }

    /// Activity pulse: counts as a ping and starts the debounce dead time.
    pub fn on_activity(&mut self) {
        if self.phase != SupervisorPhase::ResponseWindow {
            return;
        }
        self.elapsed_ms = 0;
        self.debounce_ms = Some(0);
    }

    pub fn tick<L: LineDriver, E: EventSink>(&mut self, peers: Peers<'_, L, E>) {
        if self.events_enabled {
            self.heartbeat_ms = self.heartbeat_ms.saturating_add(1);
            if self.heartbeat_ms >= HEARTBEAT_MS {
                self.heartbeat_ms = 0;
                peers.events.emit(SupervisorEvent::Heartbeat, peers.uptime_ms);
            }
        }

        if let Some(debounce_ms) = self.debounce_ms {
            let debounce_ms = debounce_ms.saturating_add(1);
            self.debounce_ms = (debounce_ms < ACTIVITY_DEBOUNCE_MS).then_some(debounce_ms);
        }

        match self.phase {
            SupervisorPhase::Disabled => {}
            SupervisorPhase::ResponseWindow => {
                self.elapsed_ms = self.elapsed_ms.saturating_add(1);
                if self.elapsed_ms >= self.config.response.as_millis() {
                    self.first_reset(peers);
                }
            }
            SupervisorPhase::RebootWindow { escalated } => {
                self.elapsed_ms = self.elapsed_ms.saturating_add(1);
                if self.elapsed_ms >= self.config.reboot.as_millis() {
                    self.escalate(escalated, peers);
                }
            }
        }
    }

    fn first_reset<L: LineDriver, E: EventSink>(&mut self, peers: Peers<'_, L, E>) {
        self.elapsed_ms = 0;
        self.soft_remaining = self.soft_remaining.saturating_sub(1);
        // A pulse already in flight consumes the attempt.
        let _ = peers.sequencer.soft_reset(peers.lines);
        peers.indicator.set_mode(IndicatorMode::BlinkMid, peers.lines);
        self.phase = SupervisorPhase::RebootWindow { escalated: false };
        self.debounce_ms = None;
        // Reports entry into the reboot window, pulse or not.
        self.notify(peers.events, SupervisorEvent::FirstReset, peers.uptime_ms);
    }

    fn escalate<L: LineDriver, E: EventSink>(&mut self, escalated: bool, peers: Peers<'_, L, E>) {
        self.elapsed_ms = 0;

        if self.soft_remaining > 0 {
            self.soft_remaining -= 1;
            if peers.sequencer.soft_reset(peers.lines).is_ok() {
                self.notify(peers.events, SupervisorEvent::SoftReset, peers.uptime_ms);
            }
        } else if self.config.hard_reset_enabled && self.hard_remaining > 0 {
            self.hard_remaining -= 1;
            if !escalated {
                peers.indicator.set_mode(IndicatorMode::BlinkFast, peers.lines);
                self.phase = SupervisorPhase::RebootWindow { escalated: true };
            }
            if peers.sequencer.hard_reset(peers.lines).is_ok() {
                self.notify(peers.events, SupervisorEvent::HardReset, peers.uptime_ms);
            }
        } else {
            peers.indicator.set_mode(IndicatorMode::Glow, peers.lines);
            self.phase = SupervisorPhase::Disabled;
            self.notify(peers.events, SupervisorEvent::MovedToIdle, peers.uptime_ms);
        }
    }

    fn notify<E: EventSink>(&self, events: &mut E, event: SupervisorEvent, uptime_ms: u32) {
        if self.events_enabled {
            events.emit(event, uptime_ms);
        }
    }

    fn reconfigure(&mut self, update: impl FnOnce(&mut SupervisorConfig)) -> Result<(), Rejection> {
        if self.is_enabled() {
            return Err(Rejection::Busy);
        }
        update(&mut self.config);
        self.soft_remaining = self.soft_remaining.min(self.config.soft.attempts());
        self.hard_remaining = self.hard_remaining.min(self.config.hard.attempts());
        Ok(())
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(SupervisorConfig::DEFAULT)
    }
}
