//! Insertion-order index with a fixed entry capacity.
//!
//! Every store backend keeps one `FifoIndex` per generation and consults it
//! before touching entry data. The index is the single source of truth for
//! which keys exist and which one is oldest, so eviction order never depends
//! on how a backend happens to enumerate its storage.

use std::collections::{HashSet, VecDeque};

/// Decision returned by [`FifoIndex::admit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Key already present; overwrite its value, order unchanged.
    Replace,
    /// Key appended as newest; `evicted` keys (oldest first) must be dropped.
    Insert { evicted: Vec<String> },
    /// Capacity is zero; nothing may be stored.
    Rejected,
}

/// Ordered key set bounded by `capacity`.
#[derive(Debug, Clone)]
pub struct FifoIndex {
    order: VecDeque<String>,
    members: HashSet<String>,
    capacity: usize,
}

impl FifoIndex {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity.min(1024)),
            members: HashSet::new(),
            capacity,
        }
    }

    /// Rebuild an index from previously persisted keys (oldest first).
    ///
    /// Duplicates keep their first position. If more keys are supplied than
    /// `capacity` allows, the oldest surplus keys are dropped and returned so
    /// the caller can delete their data.
    pub fn from_keys<I>(keys: I, capacity: usize) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = String>,
    {
        let mut index = Self::new(capacity);
        for key in keys {
            if index.members.insert(key.clone()) {
                index.order.push_back(key);
            }
        }

        let mut surplus = Vec::new();
        while index.order.len() > capacity {
            if let Some(old) = index.order.pop_front() {
                index.members.remove(&old);
                surplus.push(old);
            }
        }
        (index, surplus)
    }

    /// Admit `key`, evicting the oldest keys while the index is full.
    pub fn admit(&mut self, key: &str) -> Admission {
        if self.members.contains(key) {
            return Admission::Replace;
        }
        if self.capacity == 0 {
            return Admission::Rejected;
        }

        let mut evicted = Vec::new();
        while self.order.len() >= self.capacity {
            match self.order.pop_front() {
                Some(old) => {
                    self.members.remove(&old);
                    evicted.push(old);
                }
                None => break,
            }
        }

        self.members.insert(key.to_string());
        self.order.push_back(key.to_string());
        Admission::Insert { evicted }
    }

    /// Remove `key`. Returns true if it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        if !self.members.remove(key) {
            return false;
        }
        self.order.retain(|k| k != key);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest key, the next eviction candidate.
    pub fn oldest(&self) -> Option<&str> {
        self.order.front().map(String::as_str)
    }

    /// Keys oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}
