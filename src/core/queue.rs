//! Message queue: pending messages ordered by logical time before execution.
//!
//! # Ordering and determinism
//!
//! Messages are popped in ascending logical time. Equal logical times are broken by
//! `arrival_index`: a monotonic, queue-local counter incremented on each successful
//! `enqueue()`. It is not derived from system time and never leaves this module.
//! The same sequence of `enqueue()` calls therefore always drains in the same order.
//!
//! # Snapshots
//!
//! The heap sits behind an `Arc`, so cloning the queue is O(1). The first mutation
//! of a shared queue copies it (`Arc::make_mut`); a clone held by a snapshot is
//! never affected by later pushes or pops on the live queue.
//!
//! # Invariants
//! - The queue never holds a message without a destination.
//! - `arrival_index` is strictly increasing over the lifetime of a queue value,
//!   including across clones.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use thiserror::Error;

use crate::core::account::LogicalTime;
use crate::core::message::Message;
use crate::error::{LocalnetError, Result};

/// Errors produced by the message queue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Message {0} has no destination and cannot be queued")]
    MissingDestination(String),
}

impl From<QueueError> for LocalnetError {
    fn from(err: QueueError) -> Self {
        LocalnetError::Queue(err.to_string())
    }
}

/// Internal queue entry: the message plus its ordering key.
#[derive(Debug, Clone)]
struct QueueEntry {
    lt: LogicalTime,
    arrival_index: u64,
    message: Message,
}

impl QueueEntry {
    fn key(&self) -> (LogicalTime, u64) {
        (self.lt, self.arrival_index)
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Min-queue of pending messages keyed by `(logical time, arrival index)`.
#[derive(Debug, Clone, Default)]
pub struct MessageQueue {
    heap: Arc<BinaryHeap<Reverse<QueueEntry>>>,
    next_arrival_index: u64,
}

impl MessageQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message. Errors if the message has no destination.
    pub fn enqueue(&mut self, message: Message) -> Result<()> {
        if message.is_event() {
            return Err(QueueError::MissingDestination(message.hash).into());
        }

        let arrival_index = self.next_arrival_index;
        self.next_arrival_index = self.next_arrival_index.saturating_add(1);
        Arc::make_mut(&mut self.heap).push(Reverse(QueueEntry {
            lt: message.ordering_lt(),
            arrival_index,
            message,
        }));
        Ok(())
    }

    /// Removes and returns the message with the smallest ordering key.
    pub fn pop_lowest(&mut self) -> Option<Message> {
        if self.heap.is_empty() {
            return None;
        }
        Arc::make_mut(&mut self.heap)
            .pop()
            .map(|Reverse(entry)| entry.message)
    }

    /// Returns the message `pop_lowest` would return, without removing it.
    pub fn peek_lowest(&self) -> Option<&Message> {
        self.heap.peek().map(|Reverse(entry)| &entry.message)
    }

    /// Returns the number of pending messages.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns all pending messages in the order they would be popped.
    pub fn pending(&self) -> Vec<Message> {
        let mut entries: Vec<&QueueEntry> = self.heap.iter().map(|Reverse(entry)| entry).collect();
        entries.sort();
        entries.into_iter().map(|entry| entry.message.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn msg(hash: &str, lt: Option<u64>) -> Message {
        Message {
            hash: hash.to_string(),
            src: None,
            dst: Some("0:01".to_string()),
            lt,
            boc: Bytes::new(),
        }
    }

    #[test]
    fn test_new_queue() {
        let queue = MessageQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert!(queue.peek_lowest().is_none());
    }

    #[test]
    fn test_pop_empty_returns_none() {
        let mut queue = MessageQueue::new();
        assert!(queue.pop_lowest().is_none());
        assert!(queue.pop_lowest().is_none());
    }

    #[test]
    fn test_pop_lowest_lt_first() {
        let mut queue = MessageQueue::new();
        queue.enqueue(msg("c", Some(30))).unwrap();
        queue.enqueue(msg("a", Some(10))).unwrap();
        queue.enqueue(msg("b", Some(20))).unwrap();
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.pop_lowest().unwrap().hash, "a");
        assert_eq!(queue.pop_lowest().unwrap().hash, "b");
        assert_eq!(queue.pop_lowest().unwrap().hash, "c");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_equal_lt_keeps_arrival_order() {
        let mut queue = MessageQueue::new();
        for name in ["first", "second", "third", "fourth"] {
            queue.enqueue(msg(name, Some(5))).unwrap();
        }
        let order: Vec<String> = std::iter::from_fn(|| queue.pop_lowest()).map(|m| m.hash).collect();
        assert_eq!(order, vec!["first", "second", "third", "fourth"]);
    }

    #[test]
    fn test_missing_lt_sorts_as_zero() {
        let mut queue = MessageQueue::new();
        queue.enqueue(msg("late", Some(1))).unwrap();
        queue.enqueue(msg("external", None)).unwrap();
        assert_eq!(queue.pop_lowest().unwrap().hash, "external");
    }

    #[test]
    fn test_large_lt_compares_numerically() {
        let mut queue = MessageQueue::new();
        queue.enqueue(msg("big", Some(10_000_000_000_000))).unwrap();
        queue.enqueue(msg("small", Some(9))).unwrap();
        assert_eq!(queue.pop_lowest().unwrap().hash, "small");
    }

    #[test]
    fn test_enqueue_event_rejected() {
        let mut queue = MessageQueue::new();
        let mut event = msg("event", Some(1));
        event.dst = None;
        let result = queue.enqueue(event);
        assert!(result.is_err());
        if let Err(LocalnetError::Queue(reason)) = result {
            assert!(reason.contains("no destination"));
        } else {
            panic!("Expected queue error");
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pending_in_pop_order() {
        let mut queue = MessageQueue::new();
        queue.enqueue(msg("b", Some(2))).unwrap();
        queue.enqueue(msg("a", Some(1))).unwrap();
        queue.enqueue(msg("b2", Some(2))).unwrap();
        let pending: Vec<String> = queue.pending().into_iter().map(|m| m.hash).collect();
        assert_eq!(pending, vec!["a", "b", "b2"]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_clone_is_isolated() {
        let mut live = MessageQueue::new();
        live.enqueue(msg("a", Some(1))).unwrap();
        let copy = live.clone();

        live.enqueue(msg("b", Some(2))).unwrap();
        live.pop_lowest();

        assert_eq!(copy.len(), 1);
        assert_eq!(copy.peek_lowest().unwrap().hash, "a");
        assert_eq!(live.len(), 1);
        assert_eq!(live.peek_lowest().unwrap().hash, "b");
    }

    #[test]
    fn test_arrival_index_continues_after_clone() {
        let mut live = MessageQueue::new();
        live.enqueue(msg("a", Some(1))).unwrap();
        let mut restored = live.clone();
        restored.enqueue(msg("b", Some(1))).unwrap();
        assert_eq!(restored.pop_lowest().unwrap().hash, "a");
        assert_eq!(restored.pop_lowest().unwrap().hash, "b");
    }
}
