//! The upload correlator.
//!
//! A raw-bytes HTTP upload yields a server-assigned resource id (file id or
//! video id); the server later confirms processing with an attach push frame
//! carrying that id.  This table bridges the two: the uploader registers a
//! waiter right after the HTTP step succeeds, the router resolves it when the
//! push arrives.  Unmatched pushes are dropped silently — the waiter either
//! never existed or already resolved or expired.

use std::collections::HashMap;
use std::sync::Mutex;

use oneme_proto::Frame;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::errors::Error;

pub(crate) struct UploadWaiters {
    slots: Mutex<HashMap<i64, oneshot::Sender<Frame>>>,
}

impl UploadWaiters {
    pub(crate) fn new() -> Self {
        Self { slots: Mutex::new(HashMap::new()) }
    }

    /// Register a waiter for the given resource id.  At most one waiter may
    /// exist per id.
    pub(crate) fn register(
        &self,
        resource_id: i64,
    ) -> Result<(UploadGuard<'_>, oneshot::Receiver<Frame>), Error> {
        let mut slots = self.slots.lock().unwrap();
        if slots.contains_key(&resource_id) {
            return Err(Error::InvalidInput(format!(
                "upload waiter for resource {resource_id} already exists"
            )));
        }
        let (tx, rx) = oneshot::channel();
        slots.insert(resource_id, tx);
        Ok((UploadGuard { table: self, resource_id }, rx))
    }

    /// Route an attach-completion frame: the file id is checked first, then
    /// the video id; a frame resolves at most one waiter.
    pub(crate) fn resolve(&self, frame: Frame) {
        let id_field = |name: &str| frame.payload.get(name).and_then(Value::as_i64).unwrap_or(0);
        let file_id  = id_field("fileId");
        let video_id = id_field("videoId");

        let mut slots = self.slots.lock().unwrap();
        if file_id > 0 {
            if let Some(tx) = slots.remove(&file_id) {
                let _ = tx.send(frame);
                return;
            }
        }
        if video_id > 0 {
            if let Some(tx) = slots.remove(&video_id) {
                let _ = tx.send(frame);
            }
        }
    }

    pub(crate) fn remove(&self, resource_id: i64) {
        self.slots.lock().unwrap().remove(&resource_id);
    }

    pub(crate) fn fail_all(&self) {
        self.slots.lock().unwrap().clear();
    }
}

/// Deregisters its resource id on drop.
pub(crate) struct UploadGuard<'a> {
    table:       &'a UploadWaiters,
    resource_id: i64,
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        self.table.remove(self.resource_id);
    }
}
