//! The watchdog engine: owner of every state machine and boundary driver.
//!
//! The time base and the activity line only remember *which* machines want
//! to be called; the engine performs the calls, handing each machine the
//! collaborators it needs for that one operation. After every operation the
//! engine reconciles both registries with what each machine currently needs,
//! so the tick source and the activity interrupt only run while somebody
//! listens.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::activity::{ActivityInterrupt, ActivityLine, ActivityListener};
use crate::codes::StatusWord;
use crate::drive::DriveMonitor;
use crate::indicator::{Indicator, IndicatorMode};
use crate::lines::LineDriver;
use crate::protocol::{Command, Reply};
use crate::response::{Ack, CommandResult, Rejection};
use crate::sequencer::{Sequencer, SequencerTiming};
use crate::settings::{Settings, SettingsStore};
use crate::supervisor::{EventSink, Peers, Supervisor};
use crate::time::{TickObserver, TickSource, TimeBase};

/// Watchdog engine.
pub struct Watchdog<L, C, A, E> {
    time: TimeBase<C>,
    activity: ActivityLine<A>,
    lines: L,
    events: E,
    sequencer: Sequencer,
    indicator: Indicator,
    supervisor: Supervisor,
    drive: DriveMonitor,
}

impl<L, C, A, E> Watchdog<L, C, A, E>
where
    L: LineDriver,
    C: TickSource,
    A: ActivityInterrupt,
    E: EventSink,
{
    /// Builds an engine with default settings and pulse timing.
    pub fn new(lines: L, clock: C, activity: A, events: E) -> Self {
        Self::with_settings(
            lines,
            clock,
            activity,
            events,
            Settings::DEFAULT,
            SequencerTiming::DEFAULT,
        )
    }

    /// Builds an idle engine: lines released, LED glowing.
    pub fn with_settings(
        lines: L,
        clock: C,
        activity: A,
        events: E,
        settings: Settings,
        timing: SequencerTiming,
    ) -> Self {
        let mut watchdog = Self {
            time: TimeBase::new(clock),
            activity: ActivityLine::new(activity),
            lines,
            events,
            sequencer: Sequencer::new(timing),
            indicator: Indicator::new(),
            supervisor: Supervisor::new(settings.supervisor),
            drive: DriveMonitor::new(settings.drive_timeout, settings.drive_attempts),
        };

        if settings.events_enabled {
            let _ = watchdog.supervisor.enable_events();
        }
        watchdog.lines.release_all();
        watchdog
            .indicator
            .set_mode(IndicatorMode::Glow, &mut watchdog.lines);
        watchdog.time.start();
        watchdog.sync_subscriptions();
        watchdog
    }

    /// Delivers one 1 ms tick to the subscribed machines in registration order.
    pub fn tick(&mut self) {
        for observer in self.time.tick() {
            match observer {
                TickObserver::Indicator => self.indicator.tick(&mut self.lines),
                TickObserver::Sequencer => self.sequencer.tick(&mut self.lines),
                TickObserver::Supervisor => {
                    let peers = Peers {
                        lines: &mut self.lines,
                        sequencer: &mut self.sequencer,
                        indicator: &mut self.indicator,
                        events: &mut self.events,
                        uptime_ms: self.time.uptime_ms(),
                    };
                    self.supervisor.tick(peers);
                }
                TickObserver::DriveMonitor => self.drive.tick(&mut self.sequencer, &mut self.lines),
            }
        }
        self.sync_subscriptions();
    }

    /// Delivers an activity-line edge to the subscribed listeners.
    pub fn activity_pulse(&mut self) {
        for listener in self.activity.pulse() {
            match listener {
                ActivityListener::Supervisor => self.supervisor.on_activity(),
                ActivityListener::DriveMonitor => self.drive.on_activity(),
            }
        }
        self.sync_subscriptions();
    }

    pub fn start(&mut self) -> CommandResult {
        self.with_supervisor(Supervisor::start)
    }

    pub fn stop(&mut self) -> CommandResult {
        self.with_supervisor(Supervisor::stop)
    }

    pub fn ping(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.supervisor.ping())
    }

    pub fn enable_hard_reset(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.supervisor.enable_hard_reset())
    }

    pub fn disable_hard_reset(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.supervisor.disable_hard_reset())
    }

    pub fn set_response_timeout(&mut self, code: u8) -> CommandResult {
        self.update(|watchdog| watchdog.supervisor.set_response_timeout(code))
    }

    pub fn set_reboot_timeout(&mut self, code: u8) -> CommandResult {
        self.update(|watchdog| watchdog.supervisor.set_reboot_timeout(code))
    }

    pub fn set_soft_attempts(&mut self, code: u8) -> CommandResult {
        self.update(|watchdog| watchdog.supervisor.set_soft_attempts(code))
    }

    pub fn set_hard_attempts(&mut self, code: u8) -> CommandResult {
        self.update(|watchdog| watchdog.supervisor.set_hard_attempts(code))
    }

    pub fn enable_events(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.supervisor.enable_events())
    }

    pub fn disable_events(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.supervisor.disable_events())
    }

    pub fn link_activity(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.supervisor.link_activity())
    }

    pub fn unlink_activity(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.supervisor.unlink_activity())
    }

    pub fn status(&self) -> StatusWord {
        self.supervisor.status()
    }

    pub fn soft_reset(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.sequencer.soft_reset(&mut watchdog.lines))
    }

    pub fn power_pulse(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.sequencer.power_pulse(&mut watchdog.lines))
    }

    pub fn hard_reset(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.sequencer.hard_reset(&mut watchdog.lines))
    }

    pub fn drive_start(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.drive.start())
    }

    pub fn drive_stop(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.drive.stop())
    }

    pub fn drive_pause(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.drive.pause())
    }

    pub fn drive_resume(&mut self) -> CommandResult {
        self.update(|watchdog| watchdog.drive.resume())
    }

    pub fn drive_set_timeout(&mut self, code: u8) -> CommandResult {
        self.update(|watchdog| watchdog.drive.set_timeout(code))
    }

    pub fn drive_set_attempts(&mut self, code: u8) -> CommandResult {
        self.update(|watchdog| watchdog.drive.set_attempts(code))
    }

    pub fn drive_status(&self) -> u16 {
        self.drive.status()
    }

    pub fn set_indicator(&mut self, mode: IndicatorMode) -> CommandResult {
        self.update(|watchdog| {
            watchdog.indicator.set_mode(mode, &mut watchdog.lines);
            Ok(Ack::IndicatorMode(mode))
        })
    }

    pub fn enable_indicator(&mut self) -> CommandResult {
        self.update(|watchdog| {
            watchdog.indicator.enable(&mut watchdog.lines);
            Ok(Ack::IndicatorEnabled)
        })
    }

    pub fn disable_indicator(&mut self) -> CommandResult {
        self.update(|watchdog| {
            watchdog.indicator.disable(&mut watchdog.lines);
            Ok(Ack::IndicatorDisabled)
        })
    }

    /// Snapshot of the persisted configuration.
    pub fn settings(&self) -> Settings {
        Settings {
            supervisor: self.supervisor.config(),
            events_enabled: self.supervisor.events_enabled(),
            drive_timeout: self.drive.timeout(),
            drive_attempts: self.drive.attempts(),
        }
    }

    /// Returns `true` when neither watchdog is running.
    pub const fn is_quiescent(&self) -> bool {
        !self.supervisor.is_enabled() && !self.drive.is_monitoring()
    }

    /// Replaces the whole configuration. Both watchdogs must be stopped.
    pub fn apply_settings(&mut self, settings: Settings) -> Result<(), Rejection> {
        if !self.is_quiescent() {
            return Err(Rejection::Busy);
        }

        self.update(|watchdog| {
            watchdog.supervisor.configure(settings.supervisor)?;
            watchdog
                .drive
                .configure(settings.drive_timeout, settings.drive_attempts)?;
            if settings.events_enabled {
                watchdog.supervisor.enable_events()?;
            } else {
                watchdog.supervisor.disable_events()?;
            }
            Ok(())
        })
    }

    /// Persists the configuration with write-then-verify.
    pub fn save_settings<S: SettingsStore>(&mut self, store: &mut S) -> CommandResult {
        self.settings()
            .save(store)
            .map_err(|_| Rejection::SaveSettings)?;
        Ok(Ack::SettingsSaved)
    }

    /// Applies the stored configuration, or the defaults when the stored
    /// record is missing or corrupt.
    pub fn load_settings<S: SettingsStore>(&mut self, store: &mut S) -> CommandResult {
        let (settings, _) = Settings::load_or_default(store);
        self.apply_settings(settings)?;
        Ok(Ack::SettingsLoaded)
    }

    /// Runs a decoded command.
    pub fn execute<S: SettingsStore>(
        &mut self,
        command: Command,
        store: &mut S,
    ) -> Result<Reply, Rejection> {
        let ack = match command {
            Command::GetStatus => return Ok(Reply::Status(self.status())),
            Command::DriveStatus => return Ok(Reply::DriveStatus(self.drive_status())),
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Ping => self.ping(),
            Command::EnableHardReset => self.enable_hard_reset(),
            Command::DisableHardReset => self.disable_hard_reset(),
            Command::EnableEvents => self.enable_events(),
            Command::DisableEvents => self.disable_events(),
            Command::LinkActivity => self.link_activity(),
            Command::UnlinkActivity => self.unlink_activity(),
            Command::SetResponseTimeout(code) => self.set_response_timeout(code),
            Command::SetRebootTimeout(code) => self.set_reboot_timeout(code),
            Command::SetSoftAttempts(code) => self.set_soft_attempts(code),
            Command::SetHardAttempts(code) => self.set_hard_attempts(code),
            Command::SoftReset => self.soft_reset(),
            Command::PowerPulse => self.power_pulse(),
            Command::HardReset => self.hard_reset(),
            Command::SaveSettings => self.save_settings(store),
            Command::LoadSettings => self.load_settings(store),
            Command::DriveStart => self.drive_start(),
            Command::DriveStop => self.drive_stop(),
            Command::DrivePause => self.drive_pause(),
            Command::DriveResume => self.drive_resume(),
            Command::SetDriveTimeout(code) => self.drive_set_timeout(code),
            Command::SetDriveAttempts(code) => self.drive_set_attempts(code),
            Command::Indicator(mode) => self.set_indicator(mode),
            Command::IndicatorEnable => self.enable_indicator(),
            Command::IndicatorDisable => self.disable_indicator(),
        }?;
        Ok(Reply::Ack(ack))
    }

    /// Milliseconds of ticks delivered so far.
    pub const fn uptime_ms(&self) -> u32 {
        self.time.uptime_ms()
    }

    pub const fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub const fn drive(&self) -> &DriveMonitor {
        &self.drive
    }

    pub const fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub const fn indicator(&self) -> &Indicator {
        &self.indicator
    }

    pub const fn time(&self) -> &TimeBase<C> {
        &self.time
    }

    pub const fn activity(&self) -> &ActivityLine<A> {
        &self.activity
    }

    pub const fn lines(&self) -> &L {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut L {
        &mut self.lines
    }

    pub const fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    fn with_supervisor<R>(
        &mut self,
        op: impl FnOnce(&mut Supervisor, Peers<'_, L, E>) -> R,
    ) -> R {
        let peers = Peers {
            lines: &mut self.lines,
            sequencer: &mut self.sequencer,
            indicator: &mut self.indicator,
            events: &mut self.events,
            uptime_ms: self.time.uptime_ms(),
        };
        let result = op(&mut self.supervisor, peers);
        self.sync_subscriptions();
        result
    }

    fn update<R>(&mut self, op: impl FnOnce(&mut Self) -> R) -> R {
        let result = op(self);
        self.sync_subscriptions();
        result
    }

    /// Reconciles the tick and activity registries with what each machine
    /// needs right now.
    fn sync_subscriptions(&mut self) {
        let wanted = [
            (TickObserver::Indicator, self.indicator.needs_ticks()),
            (TickObserver::Sequencer, self.sequencer.needs_ticks()),
            (TickObserver::Supervisor, self.supervisor.needs_ticks()),
            (TickObserver::DriveMonitor, self.drive.needs_ticks()),
        ];
        for (observer, needed) in wanted {
            if needed {
                // One slot per observer kind; the registry cannot fill up.
                let _ = self.time.subscribe(observer);
            } else {
                self.time.unsubscribe(observer);
            }
        }

        let listening = [
            (
                ActivityListener::Supervisor,
                self.supervisor.listening_for_activity(),
            ),
            (
                ActivityListener::DriveMonitor,
                self.drive.listening_for_activity(),
            ),
        ];
        for (listener, needed) in listening {
            if needed {
                let _ = self.activity.subscribe(listener);
            } else {
                self.activity.unsubscribe(listener);
            }
        }
    }
}

/// [`Watchdog`] shared between interrupt handlers and foreground code.
///
/// Every access runs inside a critical section, so a tick can never observe
/// an operation half applied.
pub struct SharedWatchdog<L, C, A, E> {
    inner: Mutex<RefCell<Watchdog<L, C, A, E>>>,
}

impl<L, C, A, E> SharedWatchdog<L, C, A, E> {
    pub const fn new(watchdog: Watchdog<L, C, A, E>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(watchdog)),
        }
    }
}

impl<L, C, A, E> SharedWatchdog<L, C, A, E>
where
    L: LineDriver,
    C: TickSource,
    A: ActivityInterrupt,
    E: EventSink,
{
    /// Runs `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut Watchdog<L, C, A, E>) -> R) -> R {
        critical_section::with(|cs| f(&mut *self.inner.borrow_ref_mut(cs)))
    }

    pub fn tick(&self) {
        self.with(Watchdog::tick);
    }

    pub fn activity_pulse(&self) {
        self.with(Watchdog::activity_pulse);
    }

    pub fn execute<S: SettingsStore>(
        &self,
        command: Command,
        store: &mut S,
    ) -> Result<Reply, Rejection> {
        self.with(|watchdog| watchdog.execute(command, store))
    }

    pub fn status(&self) -> StatusWord {
        self.with(|watchdog| watchdog.status())
    }
}
