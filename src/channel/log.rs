use crate::assert_invariant;
use std::collections::VecDeque;

/// Bounded, most-recent-first message log.
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: VecDeque<String>,
    capacity: usize,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Prepend, then evict the oldest entries past capacity.
    pub fn push(&mut self, message: String) {
        self.entries.push_front(message);
        self.entries.truncate(self.capacity);

        assert_invariant!(
            self.entries.len() <= self.capacity,
            "Message log never exceeds capacity",
            "MessageLog::push"
        );
    }

    /// Entries, newest first
    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_ten_newest_first() {
        let mut log = MessageLog::new(10);
        for i in 1..=12 {
            log.push(format!("M{}", i));
        }

        let expected: Vec<String> = (3..=12).rev().map(|i| format!("M{}", i)).collect();
        assert_eq!(log.entries(), expected);
        assert_eq!(log.latest(), Some("M12"));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut log = MessageLog::new(0);
        log.push("a".into());
        log.push("b".into());
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.entries(), vec!["b".to_string()]);
    }
}
