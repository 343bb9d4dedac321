//! Bounded newest-first feed.

use std::collections::vec_deque::{Iter, IterMut};
use std::collections::VecDeque;

/// Keeps at most `cap` items, newest first; pushing past the cap evicts the
/// oldest.
#[derive(Debug, Clone)]
pub struct BoundedFeed<T> {
    cap: usize,
    items: VecDeque<T>,
}

impl<T> BoundedFeed<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            items: VecDeque::with_capacity(cap.min(64)),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.cap == 0 {
            return;
        }
        self.items.push_front(item);
        self.items.truncate(self.cap);
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> BoundedFeed<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
