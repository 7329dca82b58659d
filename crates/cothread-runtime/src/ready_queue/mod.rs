//! FIFO ready queue
//!
//! Identities of coroutines eligible to run, in scheduling order. New
//! coroutines and yielders join at the back, `run_next` takes from the
//! front. An explicit resume pulls its target out of the middle, leaving
//! everyone else's relative order untouched.

use cothread_core::id::CoroutineId;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct ReadyQueue {
    queue: VecDeque<CoroutineId>,
}

impl ReadyQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
        }
    }

    /// Append to the back
    #[inline]
    pub fn push(&mut self, id: CoroutineId) {
        debug_assert!(!self.contains(id), "coroutine {} queued twice", id);
        self.queue.push_back(id);
    }

    #[inline]
    pub fn front(&self) -> Option<CoroutineId> {
        self.queue.front().copied()
    }

    /// Remove `id` wherever it sits. Returns whether it was queued.
    pub fn remove(&mut self, id: CoroutineId) -> bool {
        match self.queue.iter().position(|&queued| queued == id) {
            Some(pos) => {
                self.queue.remove(pos);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn contains(&self, id: CoroutineId) -> bool {
        self.queue.contains(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CoroutineId> + '_ {
        self.queue.iter().copied()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(q: &ReadyQueue) -> Vec<u32> {
        q.iter().map(CoroutineId::as_u32).collect()
    }

    #[test]
    fn test_fifo_order() {
        let mut q = ReadyQueue::with_capacity(4);
        for n in 1..=3 {
            q.push(CoroutineId::new(n));
        }
        assert_eq!(q.front(), Some(CoroutineId::new(1)));
        assert!(q.remove(CoroutineId::new(1)));
        q.push(CoroutineId::new(1));
        assert_eq!(ids(&q), vec![2, 3, 1]);
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut q = ReadyQueue::default();
        for n in 1..=4 {
            q.push(CoroutineId::new(n));
        }
        assert!(q.remove(CoroutineId::new(2)));
        assert!(!q.remove(CoroutineId::new(2)));
        assert_eq!(ids(&q), vec![1, 3, 4]);
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn test_empty() {
        let mut q = ReadyQueue::default();
        assert!(q.is_empty());
        assert_eq!(q.front(), None);
        q.push(CoroutineId::new(1));
        q.clear();
        assert!(q.is_empty());
    }
}
