//! Priority frontier of discovered-but-not-yet-fetched URLs
//!
//! Highest priority first; equal priorities come out in enqueue order so
//! runs are deterministic.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use super::crawl_types::{FrontierEntry, clamp_unit};
use crate::utils::normalize_url;

#[derive(Debug, Clone)]
struct QueuedEntry {
    entry: FrontierEntry,
    priority: f64,
    /// Monotonic enqueue sequence number
    seq: u64,
}

impl PartialEq for QueuedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedEntry {}

impl PartialOrd for QueuedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first, then earlier enqueue
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Max-priority queue of `FrontierEntry` values
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    heap: BinaryHeap<QueuedEntry>,
    next_seq: u64,
    /// Normalized keys of queued entries with their multiplicity
    queued_keys: HashMap<String, usize>,
}

impl Frontier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `entry` with an explicit priority
    pub fn enqueue(&mut self, entry: FrontierEntry, priority: f64) {
        *self
            .queued_keys
            .entry(normalize_url(&entry.url))
            .or_insert(0) += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedEntry {
            entry,
            priority: clamp_unit(priority),
            seq,
        });
    }

    /// Queue `entry` prioritised by its own expected value
    pub fn push(&mut self, entry: FrontierEntry) {
        let priority = entry.expected_value;
        self.enqueue(entry, priority);
    }

    /// Remove and return the highest-priority entry
    pub fn dequeue(&mut self) -> Option<FrontierEntry> {
        let queued = self.heap.pop()?;
        let key = normalize_url(&queued.entry.url);
        if let Some(count) = self.queued_keys.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.queued_keys.remove(&key);
            }
        }
        Some(queued.entry)
    }

    #[must_use]
    pub fn peek(&self) -> Option<&FrontierEntry> {
        self.heap.peek().map(|queued| &queued.entry)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether an entry with this normalized key is currently queued
    #[must_use]
    pub fn contains_key(&self, normalized: &str) -> bool {
        self.queued_keys.contains_key(normalized)
    }
}
