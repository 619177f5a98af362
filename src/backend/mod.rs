//! Backend client and session contracts
//!
//! The dispatcher drives a distributed key-value backend through the narrow
//! surface defined here. The real client library is a black box: it shards
//! rows across servers, retries, and batches on its own. All the dispatcher
//! relies on is the contract below: create a session in read or write mode,
//! queue operations into it, flush them asynchronously as one unit, and read
//! back per-operation errors when a flush fails.
//!
//! [`memory`] provides a complete in-process implementation of these
//! contracts, used by the test suites and for embedded operation.

pub mod memory;
mod ops;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

pub use ops::{BackendOp, ReadRequest, Request, WriteRequest};

use crate::config::DispatcherConfig;
use crate::error::Result;
use crate::reply::Reply;

/// Name of the well-known table holding the Redis keyspace
pub const KV_TABLE_NAME: &str = "redis_keyspace";

/// Name of the binary primary-key column of that table
pub const KEY_COLUMN: &str = "key";

/// Whether an operation (or a session) reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Read-only access
    Read,
    /// Mutating access
    Write,
}

impl AccessKind {
    /// The other kind
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            AccessKind::Read => AccessKind::Write,
            AccessKind::Write => AccessKind::Read,
        }
    }
}

/// Handle to an open backend table
#[derive(Debug, Clone)]
pub struct TableHandle {
    name: Arc<str>,
}

impl TableHandle {
    /// Wrap an opened table
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    /// The table name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One per-operation error retained by a session across a failed flush
#[derive(Debug, Clone)]
pub struct PendingError {
    /// Primary key of the operation that failed
    pub key: Bytes,
    /// Backend diagnostic for the failure
    pub message: String,
}

/// Per-operation errors drained from a session after a failed flush
#[derive(Debug, Clone, Default)]
pub struct PendingErrors {
    /// The retained errors, in apply order
    pub errors: Vec<PendingError>,
    /// True if the session dropped errors beyond its retention limit
    pub overflowed: bool,
}

/// Bootstrap seam: builds the backend client and opens the well-known table.
///
/// Called at most once per dispatcher, lazily, under the dispatcher's
/// initialization guard.
#[async_trait]
pub trait KvConnector: Send + Sync + 'static {
    /// Build a client from the configuration and open the keyspace table
    async fn connect(&self, config: &DispatcherConfig) -> Result<(Arc<dyn KvClient>, TableHandle)>;
}

/// A connected backend client
pub trait KvClient: Send + Sync + 'static {
    /// Create a session in the given access mode.
    ///
    /// Sessions buffer applied operations until [`KvSession::flush`]; nothing
    /// reaches the backend before that (manual flush mode).
    fn new_session(&self, access: AccessKind) -> Box<dyn KvSession>;
}

/// One backend session, exclusive to a single flush unit
#[async_trait]
pub trait KvSession: Send + 'static {
    /// Set the RPC deadline for this session's flush
    fn set_timeout(&mut self, timeout: Duration);

    /// Queue one operation.
    ///
    /// Performs local validation only; an error here means the operation was
    /// rejected before reaching the backend and is not part of the flush.
    fn apply(&mut self, op: &BackendOp) -> Result<()>;

    /// Flush every queued operation as one unit.
    ///
    /// On success, returns one [`Reply`] per successfully applied operation,
    /// in apply order. On failure the whole unit failed; per-operation
    /// diagnostics are available from [`KvSession::pending_errors`].
    async fn flush(&mut self) -> Result<Vec<Reply>>;

    /// Drain per-operation errors retained by the last failed flush
    fn pending_errors(&mut self) -> PendingErrors;
}
