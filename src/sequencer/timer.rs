// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Deferred callbacks with cancelable handles.
//!
//! A single-threaded timer queue: callers register payloads to fire after
//! a delay, and the owner moves the queue clock forward and pops the ones
//! that are due. Cancellation is checked when popping, so a canceled
//! handle is never returned.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

/// Opaque handle identifying one pending timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// A pending timer in the heap
#[derive(Debug)]
struct PendingTimer<T> {
    /// Queue time at which the timer fires
    due: Duration,
    /// Handle, also the insertion sequence number
    handle: TimerHandle,
    payload: T,
}

// For BinaryHeap - we want earliest due first, then insertion order
impl<T> Eq for PendingTimer<T> {}

impl<T> PartialEq for PendingTimer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.handle == other.handle
    }
}

impl<T> Ord for PendingTimer<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.handle.cmp(&self.handle))
    }
}

impl<T> PartialOrd for PendingTimer<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Queue of deferred payloads keyed by due time
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<PendingTimer<T>>,
    /// Handles that are scheduled and neither fired nor canceled
    live: HashSet<TimerHandle>,
    /// Current queue time
    now: Duration,
    next_handle: u64,
}

impl<T> TimerQueue<T> {
    /// Create an empty queue at time zero
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashSet::new(),
            now: Duration::ZERO,
            next_handle: 0,
        }
    }

    /// Current queue time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `payload` to fire `delay` after the current queue time.
    ///
    /// A due time past `Duration::MAX` saturates.
    pub fn defer(&mut self, delay: Duration, payload: T) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.heap.push(PendingTimer {
            due: self.now.saturating_add(delay),
            handle,
            payload,
        });
        self.live.insert(handle);
        handle
    }

    /// Cancel a timer. Returns false if it already fired or was canceled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let removed = self.live.remove(&handle);
        if self.live.is_empty() {
            self.heap.clear();
        }
        removed
    }

    /// Whether a handle is still pending
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.live.contains(&handle)
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no timers are pending
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Queue time of the earliest pending timer
    pub fn next_due(&mut self) -> Option<Duration> {
        self.discard_canceled();
        self.heap.peek().map(|timer| timer.due)
    }

    /// Time remaining until the earliest pending timer
    pub fn time_to_next(&mut self) -> Option<Duration> {
        let now = self.now;
        self.next_due().map(|due| due.saturating_sub(now))
    }

    /// Pop the earliest timer that is due by the queue clock.
    ///
    /// Timers come out ordered by due time, ties in scheduling order.
    pub fn pop_due(&mut self) -> Option<(TimerHandle, T)> {
        self.discard_canceled();
        if self.heap.peek()?.due > self.now {
            return None;
        }
        let timer = self.heap.pop()?;
        self.live.remove(&timer.handle);
        Some((timer.handle, timer.payload))
    }

    /// Move the queue clock forward; it never moves backwards
    pub fn set_now(&mut self, time: Duration) {
        if time > self.now {
            self.now = time;
        }
    }

    /// Drop canceled entries sitting at the top of the heap
    fn discard_canceled(&mut self) {
        while let Some(timer) = self.heap.peek() {
            if self.live.contains(&timer.handle) {
                break;
            }
            self.heap.pop();
        }
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
