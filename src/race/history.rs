//! Archived race records.
//!
//! A bounded ring of the last [`HISTORY_CAPACITY`] finished races.  The
//! oldest record is dropped when the ring is full.  Nothing survives a
//! power cycle.

use heapless::Deque;
use serde::Serialize;

use super::RaceState;
use super::dogs::{AttemptTiming, DOG_COUNT, MAX_ATTEMPTS};

pub const HISTORY_CAPACITY: usize = 100;

/// Per-dog part of a race record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DogRecord {
    pub attempts: [AttemptTiming; MAX_ATTEMPTS],
    /// Index of the last attempt slot in use.
    pub run_count: u8,
    pub fault: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RaceRecord {
    pub id: u32,
    pub start_us: u64,
    pub end_us: u64,
    pub elapsed_us: u64,
    pub state: RaceState,
    pub dogs: [DogRecord; DOG_COUNT],
    pub total_crossing_us: i64,
}

#[derive(Default)]
pub struct RaceHistory {
    records: Deque<RaceRecord, HISTORY_CAPACITY>,
}

impl RaceHistory {
    pub fn new() -> Self {
        Self { records: Deque::new() }
    }

    pub fn push(&mut self, record: RaceRecord) {
        if self.records.is_full() {
            self.records.pop_front();
        }
        // Space was made above.
        let _ = self.records.push_back(record);
    }

    pub fn get(&self, id: u32) -> Option<&RaceRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn latest(&self) -> Option<&RaceRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &RaceRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32) -> RaceRecord {
        RaceRecord {
            id,
            start_us: 1_000,
            end_us: 2_000,
            elapsed_us: 1_000,
            state: RaceState::Stop,
            dogs: [DogRecord {
                attempts: [AttemptTiming::default(); MAX_ATTEMPTS],
                run_count: 0,
                fault: false,
            }; DOG_COUNT],
            total_crossing_us: 0,
        }
    }

    #[test]
    fn lookup_by_id() {
        let mut h = RaceHistory::new();
        h.push(record(4));
        h.push(record(5));
        assert_eq!(h.get(4).map(|r| r.id), Some(4));
        assert_eq!(h.latest().map(|r| r.id), Some(5));
        assert!(h.get(6).is_none());
    }

    #[test]
    fn oldest_record_is_overwritten() {
        let mut h = RaceHistory::new();
        for id in 0..(HISTORY_CAPACITY as u32 + 3) {
            h.push(record(id));
        }
        assert_eq!(h.len(), HISTORY_CAPACITY);
        assert!(h.get(2).is_none());
        assert_eq!(h.iter().next().map(|r| r.id), Some(3));
        assert_eq!(h.latest().map(|r| r.id), Some(HISTORY_CAPACITY as u32 + 2));
    }

    #[test]
    fn record_serializes_to_json() {
        let json = serde_json::to_string(&record(9)).unwrap();
        assert!(json.contains("\"id\":9"));
        assert!(json.contains("\"state\":\"Stop\""));
    }
}
