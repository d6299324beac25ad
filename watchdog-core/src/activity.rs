//! Drive-activity interrupt fan-out.
//!
//! The activity line is a single external interrupt shared by the reset
//! supervisor (optional ping substitute) and the drive-activity monitor. The
//! hardware interrupt stays masked while no listener is subscribed.

use heapless::Vec;

use crate::registry::{RegistryError, SubscriberRegistry};

/// Number of activity listener slots.
pub const LISTENER_SLOTS: usize = 2;

/// External interrupt feeding activity pulses.
pub trait ActivityInterrupt {
    /// Unmasks the interrupt.
    fn enable(&mut self);

    /// Masks the interrupt.
    fn disable(&mut self);
}

/// Activity interrupt with no hardware behind it.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopActivityInterrupt;

impl ActivityInterrupt for NoopActivityInterrupt {
    fn enable(&mut self) {}

    fn disable(&mut self) {}
}

/// Consumers of activity pulses.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActivityListener {
    Supervisor,
    DriveMonitor,
}

/// Activity interrupt plus the listeners it currently serves.
pub struct ActivityLine<A, const SLOTS: usize = LISTENER_SLOTS> {
    interrupt: A,
    listeners: SubscriberRegistry<ActivityListener, SLOTS>,
    enabled: bool,
}

impl<A, const SLOTS: usize> ActivityLine<A, SLOTS>
where
    A: ActivityInterrupt,
{
    /// Creates an activity line with the interrupt masked.
    pub const fn new(interrupt: A) -> Self {
        Self {
            interrupt,
            listeners: SubscriberRegistry::new(),
            enabled: false,
        }
    }

    /// Adds a listener, unmasking the interrupt if it was the first.
    pub fn subscribe(&mut self, listener: ActivityListener) -> Result<(), RegistryError> {
        self.listeners.subscribe(listener)?;
        self.sync_interrupt();
        Ok(())
    }

    /// Removes a listener, masking the interrupt if none remain.
    pub fn unsubscribe(&mut self, listener: ActivityListener) {
        if self.listeners.unsubscribe(listener) {
            self.sync_interrupt();
        }
    }

    /// Returns `true` when `listener` is subscribed.
    pub fn is_subscribed(&self, listener: ActivityListener) -> bool {
        self.listeners.contains(listener)
    }

    /// Returns `true` while the hardware interrupt is unmasked.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the listeners to deliver a pulse to, in registration order.
    ///
    /// A pulse that races with masking is dropped.
    pub fn pulse(&self) -> Vec<ActivityListener, SLOTS> {
        if !self.enabled {
            return Vec::new();
        }
        self.listeners.snapshot()
    }

    /// Accesses the interrupt driver.
    pub fn interrupt(&self) -> &A {
        &self.interrupt
    }

    fn sync_interrupt(&mut self) {
        let wanted = !self.listeners.is_empty();
        if wanted == self.enabled {
            return;
        }

        if wanted {
            self.interrupt.enable();
        } else {
            self.interrupt.disable();
        }
        self.enabled = wanted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MaskFlag {
        unmasked: bool,
        toggles: u32,
    }

    impl ActivityInterrupt for MaskFlag {
        fn enable(&mut self) {
            self.unmasked = true;
            self.toggles += 1;
        }

        fn disable(&mut self) {
            self.unmasked = false;
            self.toggles += 1;
        }
    }

    #[test]
    fn interrupt_follows_listener_presence() {
        let mut line = ActivityLine::<_, 2>::new(MaskFlag::default());
        assert!(!line.interrupt().unmasked);

        line.subscribe(ActivityListener::Supervisor).unwrap();
        line.subscribe(ActivityListener::DriveMonitor).unwrap();
        assert!(line.interrupt().unmasked);
        assert_eq!(line.interrupt().toggles, 1);

        line.unsubscribe(ActivityListener::Supervisor);
        assert!(line.interrupt().unmasked);

        line.unsubscribe(ActivityListener::DriveMonitor);
        assert!(!line.interrupt().unmasked);
        assert_eq!(line.interrupt().toggles, 2);
    }

    #[test]
    fn masked_line_drops_pulses() {
        let line = ActivityLine::<_, 2>::new(NoopActivityInterrupt);
        assert!(line.pulse().is_empty());
    }

    #[test]
    fn pulse_reaches_listeners_in_order() {
        let mut line = ActivityLine::<_, 2>::new(NoopActivityInterrupt);
        line.subscribe(ActivityListener::DriveMonitor).unwrap();
        line.subscribe(ActivityListener::Supervisor).unwrap();

        assert_eq!(
            line.pulse().as_slice(),
            &[ActivityListener::DriveMonitor, ActivityListener::Supervisor]
        );
    }
}
