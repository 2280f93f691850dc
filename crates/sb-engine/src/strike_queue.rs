//! Time-ordered queue of delayed strikes.

use alloc::vec::Vec;

use crate::scheduler::Trigger;

/// Triggers waiting for their due time, sorted by deadline.
///
/// Strikes with equal deadlines keep their insertion order.
#[derive(Clone, Debug, Default)]
pub struct StrikeQueue {
    pending: Vec<(u64, Trigger)>,
}

impl StrikeQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self { pending: Vec::new() }
    }

    /// Queue a trigger to fire at `due_ms`.
    pub fn push(&mut self, due_ms: u64, trigger: Trigger) {
        // Insert after any strikes with the same deadline.
        let pos = self.pending.partition_point(|(due, _)| *due <= due_ms);
        self.pending.insert(pos, (due_ms, trigger));
    }

    /// Deadline of the earliest pending strike.
    pub fn next_due(&self) -> Option<u64> {
        self.pending.first().map(|(due, _)| *due)
    }

    /// Remove and return every strike due at or before `now_ms`, oldest first.
    pub fn pop_due(&mut self, now_ms: u64) -> Vec<Trigger> {
        let split = self.pending.partition_point(|(due, _)| *due <= now_ms);
        self.pending.drain(..split).map(|(_, trigger)| trigger).collect()
    }

    /// Iterate over pending strikes with their deadlines.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Trigger)> + '_ {
        self.pending.iter().map(|(due, trigger)| (*due, trigger))
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TriggerSource;

    fn accent(frequency: f32) -> Trigger {
        Trigger {
            source: TriggerSource::Accent,
            frequency,
            beats: 0.0,
            seconds: 0.06,
        }
    }

    #[test]
    fn strikes_come_out_in_deadline_order() {
        let mut queue = StrikeQueue::new();
        queue.push(300, accent(3.0));
        queue.push(100, accent(1.0));
        queue.push(200, accent(2.0));

        assert_eq!(queue.next_due(), Some(100));
        let due: Vec<f32> = queue.pop_due(250).iter().map(|t| t.frequency).collect();
        assert_eq!(due, [1.0, 2.0]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn equal_deadlines_keep_insertion_order() {
        let mut queue = StrikeQueue::new();
        queue.push(50, accent(1.0));
        queue.push(50, accent(2.0));
        let due: Vec<f32> = queue.pop_due(50).iter().map(|t| t.frequency).collect();
        assert_eq!(due, [1.0, 2.0]);
        assert!(queue.is_empty());
    }

    #[test]
    fn nothing_due_before_deadline() {
        let mut queue = StrikeQueue::new();
        queue.push(500, accent(1.0));
        assert!(queue.pop_due(499).is_empty());
        assert_eq!(queue.pop_due(500).len(), 1);
    }
}
