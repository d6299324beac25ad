//! 1 ms time base and tick fan-out.
//!
//! The firmware's periodic timer interrupt calls [`TimeBase::tick`] once per
//! millisecond. The time base answers with the observers to deliver the tick
//! to, in registration order; the [`Watchdog`](crate::watchdog::Watchdog)
//! owns the observers and performs the calls. When nobody is subscribed the
//! hardware tick source is stopped, and it is restarted by the next
//! subscription.

use heapless::Vec;

use crate::registry::{RegistryError, SubscriberRegistry};

/// Number of tick observer slots.
pub const OBSERVER_SLOTS: usize = 4;

/// Tick period in milliseconds.
pub const TICK_PERIOD_MS: u32 = 1;

/// Hardware clock that produces the periodic tick.
pub trait TickSource {
    /// Starts (or resumes) periodic tick generation.
    fn start(&mut self);

    /// Stops tick generation.
    fn stop(&mut self);
}

/// Tick source with no hardware behind it.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopTickSource;

impl TickSource for NoopTickSource {
    fn start(&mut self) {}

    fn stop(&mut self) {}
}

/// State machines that can receive ticks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickObserver {
    Indicator,
    Sequencer,
    Supervisor,
    DriveMonitor,
}

/// Periodic time base with a bounded observer registry.
pub struct TimeBase<C, const SLOTS: usize = OBSERVER_SLOTS> {
    source: C,
    observers: SubscriberRegistry<TickObserver, SLOTS>,
    started: bool,
    source_running: bool,
    uptime_ms: u32,
}

impl<C, const SLOTS: usize> TimeBase<C, SLOTS>
where
    C: TickSource,
{
    /// Creates a stopped time base around the hardware source.
    pub const fn new(source: C) -> Self {
        Self {
            source,
            observers: SubscriberRegistry::new(),
            started: false,
            source_running: false,
            uptime_ms: 0,
        }
    }

    /// Allows tick delivery. The source only runs while observers exist.
    pub fn start(&mut self) {
        self.started = true;
        self.sync_source();
    }

    /// Stops tick delivery regardless of the registered observers.
    pub fn stop(&mut self) {
        self.started = false;
        self.sync_source();
    }

    /// Registers an observer after the existing ones.
    pub fn subscribe(&mut self, observer: TickObserver) -> Result<(), RegistryError> {
        self.observers.subscribe(observer)?;
        self.sync_source();
        Ok(())
    }

    /// Removes an observer. Unknown observers are ignored.
    pub fn unsubscribe(&mut self, observer: TickObserver) {
        if self.observers.unsubscribe(observer) {
            self.sync_source();
        }
    }

    /// Returns `true` when `observer` is registered.
    pub fn is_subscribed(&self, observer: TickObserver) -> bool {
        self.observers.contains(observer)
    }

    /// Returns `true` while the hardware source is producing ticks.
    pub const fn is_running(&self) -> bool {
        self.source_running
    }

    /// Milliseconds delivered since construction, wrapping after ~49 days.
    pub const fn uptime_ms(&self) -> u32 {
        self.uptime_ms
    }

    /// Accounts for one tick and returns the observers to deliver it to.
    ///
    /// Returns an empty list while the source is stopped.
    pub fn tick(&mut self) -> Vec<TickObserver, SLOTS> {
        if !self.source_running {
            return Vec::new();
        }

        self.uptime_ms = self.uptime_ms.wrapping_add(TICK_PERIOD_MS);
        self.observers.snapshot()
    }

    /// Accesses the hardware source.
    pub fn source(&self) -> &C {
        &self.source
    }

    fn sync_source(&mut self) {
        let wanted = self.started && !self.observers.is_empty();
        if wanted == self.source_running {
            return;
        }

        if wanted {
            self.source.start();
        } else {
            self.source.stop();
        }
        self.source_running = wanted;
    }
}
