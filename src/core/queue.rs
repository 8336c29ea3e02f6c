//! Ready queue: min-heap on scheduled start, ties broken by insertion order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct ReadyQueue {
    heap: BinaryHeap<Reverse<(Duration, u64, usize)>>,
    next_seq: u64,
}

impl ReadyQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Schedules task `index` at offset `st`.
    pub(crate) fn push(&mut self, st: Duration, index: usize) {
        self.heap.push(Reverse((st, self.next_seq, index)));
        self.next_seq += 1;
    }

    /// Earliest task as `(st, index)`.
    pub(crate) fn pop(&mut self) -> Option<(Duration, usize)> {
        self.heap.pop().map(|Reverse((st, _, index))| (st, index))
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}
