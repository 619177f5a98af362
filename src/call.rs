//! The inbound pipeline call
//!
//! One call carries a whole pipeline batch: an ordered sequence of RESP
//! commands from a single connection. The dispatcher answers each command by
//! index through the [`BatchCall`] responder; the wire layer behind it
//! gathers the per-slot results and flushes the RESP reply in index order
//! once every slot has responded.

use bytes::Bytes;
use metrics::Histogram;

use crate::error::PyriteError;
use crate::reply::Reply;

/// One RESP command: a sequence of binary-safe tokens, the command name first
pub type RespCommand = Vec<Bytes>;

/// Responder for a pipeline batch.
///
/// Implementations must accept `respond_success` / `respond_failure` at
/// distinct indices from multiple threads: independent blocks of one batch
/// flush concurrently and complete on arbitrary backend worker tasks. Every
/// slot receives exactly one response.
pub trait BatchCall: Send + Sync + 'static {
    /// The ordered commands of this batch
    fn client_batch(&self) -> &[RespCommand];

    /// Deliver the success payload for one pipeline slot.
    ///
    /// `metric` is the per-command latency histogram; the responder records
    /// it when the reply is flushed to the client.
    fn respond_success(&self, index: usize, reply: Reply, metric: &Histogram);

    /// Deliver a failure for one pipeline slot
    fn respond_failure(&self, index: usize, error: &PyriteError);
}
