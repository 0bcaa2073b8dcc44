//! Bounded hand-off queue between a page coroutine and its renderer.
//!
//! `may::sync::mpsc` channels are unbounded, so the queue is a `VecDeque`
//! behind a coroutine-aware `may::sync::Mutex` with two condition variables.
//! Blocking on either end parks the coroutine, not the worker thread.

use super::entry::MetadataEntry;
use may::sync::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError};

/// Default number of entries buffered before the page blocks
pub const DEFAULT_CAPACITY: usize = 5;

struct State {
    entries: VecDeque<MetadataEntry>,
    sender_closed: bool,
    receiver_closed: bool,
}

struct Shared {
    state: Mutex<State>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The receiving half went away; the entry was not queued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueClosed(pub MetadataEntry);

/// Producer half of the hand-off queue
///
/// Dropping the sender closes the queue. Because drop runs on every exit
/// path, including unwinding out of a panicking page, the receiver always
/// sees the end of the stream.
pub struct MetaSender {
    shared: Arc<Shared>,
}

/// Consumer half of the hand-off queue
pub struct MetaReceiver {
    shared: Arc<Shared>,
}

/// Create a bounded hand-off queue
///
/// A capacity of zero is treated as one.
#[must_use]
pub fn channel(capacity: usize) -> (MetaSender, MetaReceiver) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            entries: VecDeque::with_capacity(capacity.max(1)),
            sender_closed: false,
            receiver_closed: false,
        }),
        not_empty: Condvar::new(),
        not_full: Condvar::new(),
        capacity: capacity.max(1),
    });
    (
        MetaSender {
            shared: Arc::clone(&shared),
        },
        MetaReceiver { shared },
    )
}

impl MetaSender {
    /// Queue one entry, blocking while the queue is full
    ///
    /// # Errors
    ///
    /// Returns the entry back if the receiver has been dropped.
    pub fn send(&self, entry: MetadataEntry) -> Result<(), QueueClosed> {
        let mut state = self.shared.lock();
        while state.entries.len() >= self.shared.capacity && !state.receiver_closed {
            state = self
                .shared
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.receiver_closed {
            return Err(QueueClosed(entry));
        }
        state.entries.push_back(entry);
        drop(state);
        self.shared.not_empty.notify_one();
        Ok(())
    }
}

impl Drop for MetaSender {
    fn drop(&mut self) {
        self.shared.lock().sender_closed = true;
        self.shared.not_empty.notify_all();
    }
}

impl MetaReceiver {
    /// Take the next entry, blocking until one is queued
    ///
    /// Returns `None` once the sender is gone and the queue is drained.
    pub fn recv(&self) -> Option<MetadataEntry> {
        let mut state = self.shared.lock();
        loop {
            if let Some(entry) = state.entries.pop_front() {
                drop(state);
                self.shared.not_full.notify_one();
                return Some(entry);
            }
            if state.sender_closed {
                return None;
            }
            state = self
                .shared
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Iterate over entries until the queue is closed
    pub fn iter(&self) -> impl Iterator<Item = MetadataEntry> + '_ {
        std::iter::from_fn(move || self.recv())
    }
}

impl Drop for MetaReceiver {
    fn drop(&mut self) {
        self.shared.lock().receiver_closed = true;
        self.shared.not_full.notify_all();
    }
}
