//! Fixed-capacity subscriber registry shared by the tick and activity fan-outs.
//!
//! Entries are plain identifiers rather than references: the registry never
//! owns its subscribers, it only remembers who asked to be called and in which
//! order. Capacity is a compile-time constant and running out of slots is an
//! explicit error.

use heapless::Vec;

/// Errors that may occur while managing a registry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// Every slot is occupied.
    Full,
}

/// Ordered, duplicate-free set of subscriber identifiers.
#[derive(Clone, Debug)]
pub struct SubscriberRegistry<T, const CAPACITY: usize> {
    slots: Vec<T, CAPACITY>,
}

impl<T, const CAPACITY: usize> SubscriberRegistry<T, CAPACITY>
where
    T: Copy + Eq,
{
    /// Creates an empty registry.
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Adds `id` after the existing subscribers.
    ///
    /// Subscribing an id that is already present leaves its slot untouched.
    pub fn subscribe(&mut self, id: T) -> Result<(), RegistryError> {
        if self.contains(id) {
            return Ok(());
        }

        self.slots.push(id).map_err(|_| RegistryError::Full)
    }

    /// Removes `id`, keeping the order of the remaining subscribers.
    ///
    /// Returns `true` when a slot was freed.
    pub fn unsubscribe(&mut self, id: T) -> bool {
        match self.slots.iter().position(|existing| *existing == id) {
            Some(index) => {
                self.slots.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns `true` when `id` occupies a slot.
    pub fn contains(&self, id: T) -> bool {
        self.slots.iter().any(|existing| *existing == id)
    }

    /// Returns the number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when no slots are occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns `true` when every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.slots.is_full()
    }

    /// Copies the current subscribers in registration order.
    ///
    /// Dispatch loops iterate over the snapshot so subscribers may leave the
    /// registry while being called.
    pub fn snapshot(&self) -> Vec<T, CAPACITY> {
        self.slots.clone()
    }
}

impl<T, const CAPACITY: usize> Default for SubscriberRegistry<T, CAPACITY>
where
    T: Copy + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_preserves_registration_order() {
        let mut registry = SubscriberRegistry::<u8, 3>::new();
        registry.subscribe(7).unwrap();
        registry.subscribe(3).unwrap();
        registry.subscribe(5).unwrap();

        assert_eq!(registry.snapshot().as_slice(), &[7, 3, 5]);
    }

    #[test]
    fn duplicate_subscription_keeps_single_slot() {
        let mut registry = SubscriberRegistry::<u8, 3>::new();
        registry.subscribe(1).unwrap();
        registry.subscribe(2).unwrap();
        registry.subscribe(1).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.snapshot().as_slice(), &[1, 2]);
    }

    #[test]
    fn full_registry_rejects_new_ids() {
        let mut registry = SubscriberRegistry::<u8, 2>::new();
        registry.subscribe(1).unwrap();
        registry.subscribe(2).unwrap();

        assert!(registry.is_full());
        assert_eq!(registry.subscribe(3), Err(RegistryError::Full));
        assert_eq!(registry.subscribe(2), Ok(()));
    }

    #[test]
    fn unsubscribe_frees_slot_and_ignores_unknown_ids() {
        let mut registry = SubscriberRegistry::<u8, 2>::new();
        registry.subscribe(1).unwrap();
        registry.subscribe(2).unwrap();

        assert!(!registry.unsubscribe(9));
        assert!(registry.unsubscribe(1));
        assert_eq!(registry.snapshot().as_slice(), &[2]);

        registry.subscribe(4).unwrap();
        assert_eq!(registry.snapshot().as_slice(), &[2, 4]);
    }
}
