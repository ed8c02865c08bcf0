//! The request multiplexer's correlation table.
//!
//! Every outbound request registers a one-shot slot under a freshly allocated
//! sequence number *before* the frame is handed to the writer, so a fast
//! response can never race a missing waiter.  Every exit path — success,
//! timeout, cancellation, teardown — deregisters the slot, so a late response
//! for that sequence is dropped instead of reaching an unrelated caller.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use oneme_proto::Frame;
use tokio::sync::oneshot;

pub(crate) struct PendingRequests {
    next_seq: AtomicI64,
    slots:    Mutex<HashMap<i64, oneshot::Sender<Frame>>>,
}

impl PendingRequests {
    pub(crate) fn new() -> Self {
        Self {
            next_seq: AtomicI64::new(0),
            slots:    Mutex::new(HashMap::new()),
        }
    }

    /// Allocate the next sequence and register a waiter for it.
    ///
    /// The returned guard deregisters the waiter when dropped; dropping after
    /// the waiter already resolved is a no-op.
    pub(crate) fn register(&self) -> (PendingGuard<'_>, oneshot::Receiver<Frame>) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        self.slots.lock().unwrap().insert(seq, tx);
        (PendingGuard { table: self, seq }, rx)
    }

    /// Deliver a frame to the waiter registered under its sequence.
    ///
    /// Returns the frame back when no waiter holds that sequence, so the
    /// caller can route it as a push instead.
    pub(crate) fn resolve(&self, frame: Frame) -> Option<Frame> {
        let tx = self.slots.lock().unwrap().remove(&frame.seq);
        match tx {
            // A send error means the caller gave up between deregistration
            // and delivery; the frame is dropped either way.
            Some(tx) => {
                let _ = tx.send(frame);
                None
            }
            None => Some(frame),
        }
    }

    pub(crate) fn remove(&self, seq: i64) {
        self.slots.lock().unwrap().remove(&seq);
    }

    /// Fail every outstanding waiter by dropping its sender.
    pub(crate) fn fail_all(&self) {
        self.slots.lock().unwrap().clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}

/// Deregisters its sequence on drop.
pub(crate) struct PendingGuard<'a> {
    table: &'a PendingRequests,
    seq:   i64,
}

impl PendingGuard<'_> {
    pub(crate) fn seq(&self) -> i64 {
        self.seq
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.table.remove(self.seq);
    }
}
