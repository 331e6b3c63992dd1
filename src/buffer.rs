//! Fixed-capacity ring of the most recent meter readings.
//!
//! Slots are allocated once at construction and overwritten in place;
//! a monotonic counter (wrapping at 2^32, like the reading index it
//! becomes) picks the write slot as `counter % capacity`.

use crate::registers::PowerRecord;

/// Default capacity, about one minute of readings at 1 Hz.
pub const DEFAULT_CAPACITY: usize = 60;

pub struct RecordRing {
    slots: Vec<PowerRecord>,
    counter: u32,
    primed: bool,
}

impl Default for RecordRing {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RecordRing {
    /// Creates a ring of `capacity` slots (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![PowerRecord::default(); capacity.max(1)],
            counter: 0,
            primed: false,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Index the next written record will carry.
    #[must_use]
    pub fn next_index(&self) -> u32 {
        self.counter
    }

    /// Stamps `record` with the current counter and stores it, advancing
    /// the counter exactly once.
    pub fn write(&mut self, mut record: PowerRecord) {
        record.index = self.counter;
        let slot = self.counter as usize % self.slots.len();
        self.slots[slot] = record;
        self.counter = self.counter.wrapping_add(1);
        self.primed = true;
    }

    /// The most recently written record, `None` until the first write.
    #[must_use]
    pub fn latest(&self) -> Option<&PowerRecord> {
        if !self.primed {
            return None;
        }
        let slot = self.counter.wrapping_sub(1) as usize % self.slots.len();
        Some(&self.slots[slot])
    }

    /// Read-only view of all slots, oldest data mixed with newest.
    #[must_use]
    pub fn slots(&self) -> &[PowerRecord] {
        &self.slots
    }
}
