use std::{cmp::Reverse, collections::BinaryHeap};

use chrono::NaiveDateTime;

pub trait Event {
    fn time(&self) -> NaiveDateTime;
}

/// Heap entry ordered earliest first, then by insertion order.
#[derive(Debug, Clone)]
struct Scheduled<E: Event> {
    key: Reverse<(NaiveDateTime, u64)>,
    event: E,
}

impl<E: Event> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<E: Event> Eq for Scheduled<E> {}

impl<E: Event> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E: Event> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

#[derive(Debug, Clone)]
pub struct EventQueue<E: Event> {
    events: BinaryHeap<Scheduled<E>>,
    next_seq: u64,
}

impl<E: Event> EventQueue<E> {
    pub fn new() -> EventQueue<E> {
        EventQueue {
            events: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, event: E) {
        let key = Reverse((event.time(), self.next_seq));
        self.next_seq += 1;
        self.events.push(Scheduled { key, event });
    }

    pub fn pop(&mut self) -> Option<E> {
        self.events.pop().map(|s| s.event)
    }

    pub fn peek(&self) -> Option<&E> {
        self.events.peek().map(|s| &s.event)
    }

    /// Pops the earliest event if it is due at or before `now`.
    pub fn pop_due(&mut self, now: NaiveDateTime) -> Option<E> {
        if self.peek().is_some_and(|e| e.time() <= now) {
            self.pop()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<E: Event> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}
