//! Client-side group-and-count
//!
//! Replaces the server's `$group`/`$sum`/`$sort`/`$limit` stages with an
//! explicit reduction over fetched records.

use std::collections::HashMap;
use std::hash::Hash;

/// Counts occurrences per key, remembering the order keys were first seen
#[derive(Debug, Clone)]
pub struct GroupCounter<K> {
    index: HashMap<K, usize>,
    groups: Vec<(K, u64)>,
}

impl<K: Eq + Hash + Clone> Default for GroupCounter<K> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> GroupCounter<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `key`
    pub fn add(&mut self, key: K) {
        self.add_n(key, 1);
    }

    pub fn add_n(&mut self, key: K, n: u64) {
        match self.index.get(&key) {
            Some(&idx) => self.groups[idx].1 += n,
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push((key, n));
            }
        }
    }

    /// Groups sorted by count, largest first.
    ///
    /// The sort is stable: equal counts keep first-seen order.
    pub fn into_descending(self) -> Vec<(K, u64)> {
        let mut groups = self.groups;
        groups.sort_by(|a, b| b.1.cmp(&a.1));
        groups
    }

    /// The `n` largest groups
    pub fn top(self, n: usize) -> Vec<(K, u64)> {
        let mut groups = self.into_descending();
        groups.truncate(n);
        groups
    }
}

impl<K: Eq + Hash + Clone> FromIterator<K> for GroupCounter<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut counter = Self::new();
        for key in iter {
            counter.add(key);
        }
        counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_in_first_seen_order() {
        let counter: GroupCounter<&str> = ["c", "a", "b", "c", "a", "b"].into_iter().collect();
        assert_eq!(counter.into_descending(), vec![("c", 2), ("a", 2), ("b", 2)]);
    }

    #[test]
    fn test_descending_is_stable() {
        let counter: GroupCounter<&str> = ["x", "y", "z", "z", "y"].into_iter().collect();
        assert_eq!(counter.into_descending(), vec![("y", 2), ("z", 2), ("x", 1)]);
    }

    #[test]
    fn test_top_n() {
        let mut counter = GroupCounter::new();
        for (i, n) in [5u64, 1, 9, 3, 7, 2].iter().enumerate() {
            counter.add_n(i, *n);
        }
        let top = counter.top(3);
        assert_eq!(top, vec![(2, 9), (4, 7), (0, 5)]);
    }

    #[test]
    fn test_top_more_than_available() {
        let counter: GroupCounter<u8> = [1, 1].into_iter().collect();
        assert_eq!(counter.top(5), vec![(1, 2)]);
    }
}
