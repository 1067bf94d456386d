// Fixed-capacity FIFO buffer (rolling window)

use serde::{Serialize, Serializer};
use std::collections::VecDeque;

/// Keeps at most `capacity` items in arrival order; the oldest arrival is
/// evicted first, regardless of any timestamp the items carry.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends as the newest item; returns the evicted oldest item, if any.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Replaces the contents with a newest-first list, keeping its first
    /// `capacity` entries.
    pub fn replace_newest_first(&mut self, items: impl IntoIterator<Item = T>) {
        let mut kept: Vec<T> = items.into_iter().take(self.capacity).collect();
        kept.reverse();
        self.items = kept.into();
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn newest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &T> {
        self.items.iter().rev()
    }
}

impl<T: Clone> RollingWindow<T> {
    pub fn to_vec_newest_first(&self) -> Vec<T> {
        self.newest_first().cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

/// Serialized oldest to newest.
impl<T: Serialize> Serialize for RollingWindow<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_evicts_oldest_at_capacity() {
        let mut w = RollingWindow::new(3);
        assert_eq!(w.push(1), None);
        assert_eq!(w.push(2), None);
        assert_eq!(w.push(3), None);
        assert_eq!(w.push(4), Some(1));
        assert_eq!(w.to_vec(), vec![2, 3, 4]);
        assert_eq!(w.to_vec_newest_first(), vec![4, 3, 2]);
    }

    #[test]
    fn replace_newest_first_truncates_from_the_old_end() {
        let mut w = RollingWindow::new(2);
        w.replace_newest_first(vec!["c", "b", "a"]);
        assert_eq!(w.to_vec_newest_first(), vec!["c", "b"]);
        assert_eq!(w.newest(), Some(&"c"));
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut w = RollingWindow::new(0);
        assert_eq!(w.push(7), Some(7));
        assert!(w.is_empty());
    }
}
