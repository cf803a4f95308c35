//! Crawl frontier: a priority queue of table rows plus the visited set
//!
//! Lower priority values are popped first; equal priorities pop in the order
//! they were pushed, so a wave of children is walked in discovery order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Priority given to seed rows
pub const SEED_PRIORITY: f64 = 0.0;

/// A row waiting to be visited
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    /// Lower values are visited first
    pub priority: f64,

    /// Push order, breaks priority ties
    pub seq: u64,

    /// Row index in the works table
    pub index: usize,

    /// Citation hops from the seed that led here
    pub hops: usize,
}

// BinaryHeap is a max-heap: reverse both keys so the lowest priority and the
// earliest push come out first
impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

/// Rows to visit and rows already visited
#[derive(Debug, Default)]
pub struct Frontier {
    queue: BinaryHeap<FrontierEntry>,
    visited: HashSet<usize>,
    next_seq: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `index`; duplicates are allowed and skipped when popped
    pub fn push(&mut self, index: usize, priority: f64, hops: usize) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(FrontierEntry {
            priority,
            seq,
            index,
            hops,
        });
    }

    /// Pops the next entry whose row has not been visited
    pub fn pop_unvisited(&mut self) -> Option<FrontierEntry> {
        while let Some(entry) = self.queue.pop() {
            if self.visited.contains(&entry.index) {
                tracing::trace!("Row {} already visited, discarding", entry.index);
                continue;
            }
            return Some(entry);
        }
        None
    }

    pub fn mark_visited(&mut self, index: usize) {
        self.visited.insert(index);
    }

    pub fn is_visited(&self, index: usize) -> bool {
        self.visited.contains(&index)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Queued entries, including stale duplicates
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
