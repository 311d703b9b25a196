//! Bounded buffer of values keyed by consecutive indices.

use std::collections::VecDeque;

/// Values for consecutive indices `min_index..min_index + len`.
///
/// Writes must arrive in index order. An out-of-order or repeated write is
/// logged and dropped rather than aborting: the canonical value for that
/// index was either already stored or will be written again later. When the
/// buffer is full the oldest value is evicted to make room.
#[derive(Clone, Debug)]
pub struct SequentialRingBuffer<T> {
    min_index: u64,
    capacity: usize,
    data: VecDeque<T>,
}

impl<T> SequentialRingBuffer<T> {
    pub fn new(min_index: u64, capacity: usize) -> Self {
        Self {
            min_index,
            capacity: capacity.max(1),
            data: VecDeque::new(),
        }
    }

    /// The index the next `add` must use.
    pub fn next_index(&self) -> u64 {
        self.min_index + self.data.len() as u64
    }

    /// Store `value` at `index`. Returns whether the value was stored.
    pub fn add(&mut self, index: u64, value: T) -> bool {
        let expected = self.next_index();
        if index != expected {
            tracing::error!(index, expected, "dropping out-of-order ring buffer write");
            return false;
        }
        if self.data.len() == self.capacity {
            self.data.pop_front();
            self.min_index += 1;
        }
        self.data.push_back(value);
        true
    }

    pub fn get(&self, index: u64) -> Option<&T> {
        let offset = index.checked_sub(self.min_index)?;
        self.data.get(offset as usize)
    }

    /// Drop every value with an index below `index`. Never empties the
    /// index space past the last stored value.
    pub fn remove_older_than(&mut self, index: u64) {
        while self.min_index < index && !self.data.is_empty() {
            self.data.pop_front();
            self.min_index += 1;
        }
    }

    /// Discard everything; the next write must use `min_index`.
    pub fn reset(&mut self, min_index: u64) {
        self.data.clear();
        self.min_index = min_index;
    }

    /// Index of the oldest stored value (or of the next write when empty).
    pub fn min_index(&self) -> u64 {
        self.min_index
    }

    /// Index of the newest stored value.
    pub fn max_index(&self) -> Option<u64> {
        if self.data.is_empty() {
            None
        } else {
            Some(self.next_index() - 1)
        }
    }

    pub fn oldest(&self) -> Option<&T> {
        self.data.front()
    }

    pub fn latest(&self) -> Option<&T> {
        self.data.back()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &T)> + '_ {
        let base = self.min_index;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, v)| (base + i as u64, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_adds() {
        let mut buffer = SequentialRingBuffer::new(5, 10);
        assert!(buffer.add(5, "a"));
        assert!(buffer.add(6, "b"));
        assert_eq!(buffer.get(5), Some(&"a"));
        assert_eq!(buffer.get(6), Some(&"b"));
        assert_eq!(buffer.get(4), None);
        assert_eq!(buffer.get(7), None);
        assert_eq!(buffer.max_index(), Some(6));
    }

    #[test]
    fn out_of_order_write_is_dropped() {
        let mut buffer = SequentialRingBuffer::new(1, 10);
        assert!(buffer.add(1, 10));
        assert!(!buffer.add(3, 30));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.next_index(), 2);
    }

    #[test]
    fn duplicate_write_keeps_first_value() {
        let mut buffer = SequentialRingBuffer::new(1, 10);
        buffer.add(1, 10);
        buffer.add(2, 20);
        assert!(!buffer.add(2, 99));
        assert_eq!(buffer.get(2), Some(&20));
    }

    #[test]
    fn full_buffer_evicts_oldest() {
        let mut buffer = SequentialRingBuffer::new(1, 3);
        for i in 1..=5 {
            buffer.add(i, i * 10);
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.min_index(), 3);
        assert_eq!(buffer.oldest(), Some(&30));
        assert_eq!(buffer.latest(), Some(&50));
    }

    #[test]
    fn remove_older_than() {
        let mut buffer = SequentialRingBuffer::new(1, 10);
        for i in 1..=6 {
            buffer.add(i, i);
        }
        buffer.remove_older_than(4);
        assert_eq!(buffer.min_index(), 4);
        assert_eq!(buffer.iter().map(|(i, _)| i).collect::<Vec<_>>(), vec![4, 5, 6]);

        buffer.remove_older_than(100);
        assert!(buffer.is_empty());
        assert_eq!(buffer.next_index(), 7);
    }

    #[test]
    fn reset_moves_index_space() {
        let mut buffer = SequentialRingBuffer::new(1, 10);
        buffer.add(1, 1);
        buffer.reset(40);
        assert!(buffer.is_empty());
        assert!(buffer.add(40, 2));
        assert_eq!(buffer.get(40), Some(&2));
    }
}
