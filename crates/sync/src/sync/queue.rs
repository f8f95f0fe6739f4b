use std::collections::VecDeque;

use crate::net::NetState;

pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// What happened to a state offered to [`StateQueue::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Queued { index: usize },
    /// Queue already holds `capacity` states; the newcomer is dropped.
    DroppedFull,
    /// Older than what has been played, or older than the playback head.
    DroppedStale,
}

impl InsertOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }
}

/// Pending states for a non-authoritative vehicle, ordered by sender
/// timestamp.
///
/// Entry 0's `local_timestamp` is fixed once assigned because it may already
/// be the target of an in-progress blend. Every later entry is spaced from its
/// predecessor by the same delta the sender observed.
#[derive(Debug, Clone)]
pub struct StateQueue {
    states: VecDeque<NetState>,
    capacity: usize,
    last_active_timestamp: f64,
    anchor_needed: bool,
}

impl Default for StateQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl StateQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            states: VecDeque::with_capacity(capacity),
            capacity,
            last_active_timestamp: 0.0,
            anchor_needed: true,
        }
    }

    pub fn insert(&mut self, mut candidate: NetState, now: f64, time_behind: f64) -> InsertOutcome {
        if self.states.len() >= self.capacity {
            log::trace!("queue full, dropping state @{:.3}", candidate.timestamp);
            return InsertOutcome::DroppedFull;
        }

        if candidate.timestamp + time_behind < self.last_active_timestamp {
            log::trace!(
                "dropping late state @{:.3} (watermark {:.3})",
                candidate.timestamp,
                self.last_active_timestamp
            );
            return InsertOutcome::DroppedStale;
        }

        if self.states.is_empty() {
            candidate.local_timestamp = now + time_behind;
            self.states.push_back(candidate);
            return InsertOutcome::Queued { index: 0 };
        }

        let Some(predecessor) = self
            .states
            .iter()
            .rposition(|queued| queued.timestamp <= candidate.timestamp)
        else {
            log::trace!(
                "dropping state @{:.3} older than playback head",
                candidate.timestamp
            );
            return InsertOutcome::DroppedStale;
        };

        let index = predecessor + 1;
        self.states.insert(index, candidate);
        self.recalculate_timestamps();
        InsertOutcome::Queued { index }
    }

    pub fn recalculate_timestamps(&mut self) {
        for i in 1..self.states.len() {
            let previous = self.states[i - 1];
            let sender_delta = self.states[i].timestamp - previous.timestamp;
            self.states[i].local_timestamp = previous.local_timestamp + sender_delta;
        }
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.last_active_timestamp = 0.0;
        self.anchor_needed = true;
    }

    pub fn head(&self) -> Option<&NetState> {
        self.states.front()
    }

    pub fn pop_head(&mut self) -> Option<NetState> {
        self.states.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetState> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last_active_timestamp(&self) -> f64 {
        self.last_active_timestamp
    }

    /// Records the remapped timestamp of the state being played.
    pub fn set_last_active_timestamp(&mut self, timestamp: f64) {
        self.last_active_timestamp = timestamp;
    }

    pub fn anchor_needed(&self) -> bool {
        self.anchor_needed
    }

    pub fn set_anchor_needed(&mut self, needed: bool) {
        self.anchor_needed = needed;
    }
}
