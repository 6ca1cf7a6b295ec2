//! Slot arena for rule records.
//!
//! The index stores [`RuleId`]s, never the rules themselves; a [`RuleTable`]
//! owns the records and hands out ids. Freed slots are recycled, so an id is
//! only meaningful while its rule is live.

use std::fmt;

/// Handle of a rule inside a [`RuleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    /// Slot index of this id.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena of values addressed by [`RuleId`].
#[derive(Debug, Clone)]
pub struct RuleTable<T> {
    slots: Vec<Option<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for RuleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RuleTable<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Store `value` and return its id.
    ///
    /// # Panics
    /// Panics if more than `u32::MAX` slots are needed.
    pub fn insert(&mut self, value: T) -> RuleId {
        self.len += 1;
        if let Some(slot) = self.free.pop() {
            self.slots[slot as usize] = Some(value);
            return RuleId(slot);
        }
        assert!(self.slots.len() < u32::MAX as usize, "rule table full");
        let slot = self.slots.len() as u32;
        self.slots.push(Some(value));
        RuleId(slot)
    }

    pub fn get(&self, id: RuleId) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: RuleId) -> Option<&mut T> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Take the value out of its slot; `None` if the id is not live.
    pub fn remove(&mut self, id: RuleId) -> Option<T> {
        let value = self.slots.get_mut(id.index())?.take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(value)
    }

    pub fn contains(&self, id: RuleId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (RuleId(i as u32), v)))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.len = 0;
    }
}
