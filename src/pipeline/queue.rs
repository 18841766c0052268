//! Blocking FIFO with a terminal "complete" signal, built on a crossbeam channel.
//!
//! Completion drops the queue's own sender. The channel then disconnects once every
//! in-flight enqueue has finished, and [`Queue::drain`] ends after the last buffered item.

use crossbeam_channel::{Receiver, SendError, Sender, bounded, unbounded};
use std::sync::{Mutex, PoisonError};

pub struct Queue<T> {
    tx: Mutex<Option<Sender<T>>>,
    rx: Receiver<T>,
}

impl<T> Queue<T> {
    pub fn unbounded() -> Self {
        let (tx, rx) = unbounded();
        Self::from_channel(tx, rx)
    }

    /// Enqueue blocks while `cap` items are buffered.
    pub fn bounded(cap: usize) -> Self {
        let (tx, rx) = bounded(cap.max(1));
        Self::from_channel(tx, rx)
    }

    /// Bounded when `cap` is set, unbounded otherwise.
    pub fn with_capacity(cap: Option<usize>) -> Self {
        match cap {
            Some(cap) => Self::bounded(cap),
            None => Self::unbounded(),
        }
    }

    fn from_channel(tx: Sender<T>, rx: Receiver<T>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Add an item. Fails, handing the item back, once the queue was marked complete.
    pub fn enqueue(&self, item: T) -> Result<(), SendError<T>> {
        // Clone out of the lock so a blocked send on a full queue never holds it.
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match tx {
            Some(tx) => tx.send(item),
            None => Err(SendError(item)),
        }
    }

    /// Signal that no further items will be added. Idempotent.
    pub fn mark_complete(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// True once [`Self::mark_complete`] was called (items may still be buffered).
    pub fn is_complete(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Consume items in FIFO order. Blocks while the queue is empty and not complete;
    /// ends only after completion and once every buffered item was yielded.
    pub fn drain(&self) -> crossbeam_channel::Iter<'_, T> {
        self.rx.iter()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}
