//! Bounded, newest-first window of recent records

use super::types::TransactionRecord;
use std::collections::VecDeque;

/// Default number of records kept for display
pub const DEFAULT_WINDOW_SIZE: usize = 50;

#[derive(Debug, Clone)]
pub struct DisplayWindow {
    capacity: usize,
    records: VecDeque<TransactionRecord>,
}

impl Default for DisplayWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl DisplayWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Put `batch` in front of the window, keeping its internal order, then
    /// drop the oldest records past capacity.
    pub fn push_batch(&mut self, batch: &[TransactionRecord]) {
        for record in batch.iter().rev() {
            self.records.push_front(record.clone());
        }
        self.records.truncate(self.capacity);
    }

    /// Replace the newest record, or insert it when the window is empty.
    /// Used to show one record moving through its lifecycle.
    pub fn replace_front(&mut self, record: TransactionRecord) {
        match self.records.front_mut() {
            Some(front) => *front = record,
            None => {
                if self.capacity > 0 {
                    self.records.push_front(record);
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.iter()
    }

    pub fn to_vec(&self) -> Vec<TransactionRecord> {
        self.records.iter().cloned().collect()
    }
}
