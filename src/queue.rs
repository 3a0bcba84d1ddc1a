//! # Outbound Priority Queue
//!
//! Buffers link-layer frames between the group data service and the
//! transceiver, ordered by KNX priority class first and submission order
//! second: strictly highest priority first, FIFO within a class.
//!
//! Multiple producers enqueue concurrently; a single logical consumer
//! drains through [`FramePriorityQueue::dequeue`], the one operation that
//! legitimately suspends. Sequence numbers are assigned under the same
//! lock as the insertion, so the (priority, sequence) order can never be
//! violated by interleaved enqueues. [`FramePriorityQueue::close`] wakes
//! all waiters so the consumer can shut down cleanly.

use crate::error::KnxError;
use crate::layers::link::{LinkFrame, Priority};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Mutex;
use tokio::sync::Notify;

struct QueueEntry {
    priority: Priority,
    seq: u64,
    frame: LinkFrame,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // BinaryHeap is a max-heap: the greatest entry is the one with the
    // lowest (priority, seq) pair, i.e. highest severity, earliest.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.priority, other.seq).cmp(&(self.priority, self.seq))
    }
}

struct QueueState {
    entries: BinaryHeap<QueueEntry>,
    next_seq: u64,
    closed: bool,
}

/// Priority-ordered outbound frame buffer.
pub struct FramePriorityQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl FramePriorityQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                entries: BinaryHeap::new(),
                next_seq: 0,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Inserts a frame at its link-layer priority.
    pub fn enqueue(&self, frame: LinkFrame) -> Result<(), KnxError> {
        {
            let mut state = self.state.lock().expect("queue lock poisoned");
            if state.closed {
                return Err(KnxError::StackStopped);
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.entries.push(QueueEntry {
                priority: frame.priority,
                seq,
                frame,
            });
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Removes and returns the highest-priority, earliest-sequence frame,
    /// suspending until one exists. Returns `None` once the queue is
    /// closed and drained.
    pub async fn dequeue(&self) -> Option<LinkFrame> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().expect("queue lock poisoned");
                if let Some(entry) = state.entries.pop() {
                    return Some(entry.frame);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Non-suspending variant of [`FramePriorityQueue::dequeue`].
    pub fn try_dequeue(&self) -> Option<LinkFrame> {
        let mut state = self.state.lock().expect("queue lock poisoned");
        state.entries.pop().map(|entry| entry.frame)
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("queue lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rejects further enqueues and wakes every suspended consumer.
    pub fn close(&self) {
        self.state.lock().expect("queue lock poisoned").closed = true;
        self.notify.notify_waiters();
    }
}

impl Default for FramePriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}
