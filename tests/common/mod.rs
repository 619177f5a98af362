//! Shared helpers for the integration suites

use std::sync::Arc;

use bytes::Bytes;
use metrics::Histogram;
use parking_lot::Mutex;
use tokio::sync::Notify;

use pyrite::{BatchCall, PyriteError, Reply, RespCommand};

/// Per-slot outcome as the wire layer would observe it
pub type SlotResult = Result<Reply, String>;

/// A pipeline call that gathers per-slot results and releases waiters once
/// every slot has responded. Panics on a double respond, which directly
/// enforces the one-response-per-slot property in every test that uses it.
pub struct CollectingCall {
    batch: Vec<RespCommand>,
    slots: Mutex<Vec<Option<SlotResult>>>,
    notify: Notify,
}

impl CollectingCall {
    pub fn new(commands: &[&[&str]]) -> Arc<Self> {
        let batch: Vec<RespCommand> = commands
            .iter()
            .map(|tokens| {
                tokens
                    .iter()
                    .map(|t| Bytes::copy_from_slice(t.as_bytes()))
                    .collect()
            })
            .collect();
        let slots = Mutex::new(vec![None; batch.len()]);
        Arc::new(Self {
            batch,
            slots,
            notify: Notify::new(),
        })
    }

    fn fill(&self, index: usize, result: SlotResult) {
        let mut slots = self.slots.lock();
        assert!(slots[index].is_none(), "slot {index} responded twice");
        slots[index] = Some(result);
        if slots.iter().all(Option::is_some) {
            self.notify.notify_waiters();
        }
    }

    /// Wait until every slot has a response, then return them in index order
    pub async fn wait(&self) -> Vec<SlotResult> {
        loop {
            let notified = self.notify.notified();
            {
                let slots = self.slots.lock();
                if slots.iter().all(Option::is_some) {
                    return slots
                        .iter()
                        .cloned()
                        .map(|slot| slot.expect("slot filled"))
                        .collect();
                }
            }
            notified.await;
        }
    }
}

impl BatchCall for CollectingCall {
    fn client_batch(&self) -> &[RespCommand] {
        &self.batch
    }

    fn respond_success(&self, index: usize, reply: Reply, _metric: &Histogram) {
        self.fill(index, Ok(reply));
    }

    fn respond_failure(&self, index: usize, error: &PyriteError) {
        self.fill(index, Err(error.to_string()));
    }
}

/// Shorthand for the bulk-string reply tests expect
pub fn bulk(s: &str) -> Reply {
    Reply::bulk(Bytes::copy_from_slice(s.as_bytes()))
}
