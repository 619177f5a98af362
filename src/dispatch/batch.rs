//! Batch planning and the asynchronous flush chain
//!
//! One [`BatchContext`] plans a single pipeline batch. While no read/write
//! conflict arises, reads and writes accumulate into two independent
//! [`Block`]s that will flush concurrently. The first conflict on an
//! overlapping key collapses the plan into a linear chain headed by
//! `flush_head`; each later conflict seals the current block of the
//! conflicting kind and appends a fresh one, so the chain's segments
//! alternate in kind exactly at the points where conflicts were detected.
//! Commands on disjoint keys never introduce ordering between blocks.
//!
//! Launching walks the chain: each block flushes on its own backend session,
//! dispatches its responses, and only then hands off to its successor, which
//! gives the strict happens-before that pipeline semantics require on
//! overlapping keys.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use metrics::Histogram;
use tracing::{debug, error, warn};

use crate::backend::{AccessKind, BackendOp, KvClient, KvSession};
use crate::call::BatchCall;
use crate::error::PyriteError;
use crate::metrics::DispatcherMetrics;

/// One backend operation with its pipeline position and metric handle
pub(crate) struct Operation {
    index: usize,
    op: BackendOp,
    metric: Histogram,
}

impl Operation {
    /// Position of this operation in the pipeline batch
    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn access(&self) -> AccessKind {
        self.op.access()
    }
}

/// Arena index of a block within its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockId(usize);

/// A group of same-kind operations flushed as one unit on one session
pub(crate) struct Block {
    call: Arc<dyn BatchCall>,
    access: AccessKind,
    ops: Vec<Operation>,
    flush_metric: Histogram,
    start: Instant,
    next: Option<BlockId>,
}

impl Block {
    fn new(call: Arc<dyn BatchCall>, access: AccessKind, flush_metric: Histogram) -> Self {
        Self {
            call,
            access,
            ops: Vec::new(),
            flush_metric,
            start: Instant::now(),
            next: None,
        }
    }

    fn add_operation(&mut self, operation: Operation) {
        debug_assert_eq!(operation.access(), self.access);
        self.ops.push(operation);
    }

    /// Link `next` after this block, returning the previously stored link.
    /// Only the planner calls this, and only before the block is launched.
    fn set_next(&mut self, next: BlockId) -> Option<BlockId> {
        self.next.replace(next)
    }

    /// Flush this block and dispatch its responses, returning the successor
    /// to launch once dispatch has completed.
    async fn run(mut self, client: &dyn KvClient, timeout: Duration) -> Option<BlockId> {
        let mut session = client.new_session(self.access);
        session.set_timeout(timeout);

        let mut applied = Vec::with_capacity(self.ops.len());
        for operation in std::mem::take(&mut self.ops) {
            match session.apply(&operation.op) {
                Ok(()) => applied.push(operation),
                Err(err) => self.call.respond_failure(operation.index, &err),
            }
        }
        if applied.is_empty() {
            return self.next;
        }

        let result = session.flush().await;
        self.flush_metric.record(self.start.elapsed().as_micros() as f64);

        match result {
            Ok(replies) => {
                if replies.len() != applied.len() {
                    error!(
                        expected = applied.len(),
                        received = replies.len(),
                        "backend returned a mismatched response count"
                    );
                }
                let mut replies = replies.into_iter();
                for operation in &applied {
                    match replies.next() {
                        Some(reply) => {
                            self.call.respond_success(operation.index, reply, &operation.metric);
                        }
                        None => self.call.respond_failure(
                            operation.index,
                            &PyriteError::Internal("missing backend response".to_string()),
                        ),
                    }
                }
            }
            Err(err) => {
                let pending = session.pending_errors();
                for per_op in &pending.errors {
                    warn!(key = ?per_op.key, error = %per_op.message, "operation error from failed flush");
                }
                if pending.overflowed {
                    warn!("session dropped pending errors beyond its retention limit");
                }
                for operation in &applied {
                    self.call.respond_failure(operation.index, &err);
                }
            }
        }

        self.next
    }
}

/// Per-kind planning state: the keys accumulated since the last conflict
/// reset and the block currently receiving operations of this kind
#[derive(Default)]
struct BlockData {
    used_keys: HashSet<Bytes>,
    block: Option<BlockId>,
}

/// Planner for one pipeline batch
pub(crate) struct BatchContext {
    call: Arc<dyn BatchCall>,
    client: Arc<dyn KvClient>,
    timeout: Duration,
    read_flush_metric: Histogram,
    write_flush_metric: Histogram,
    blocks: Vec<Option<Block>>,
    read_data: BlockData,
    write_data: BlockData,
    flush_head: Option<BlockId>,
    /// Kind of the most recent conflict; `None` until the first conflict
    last_conflict: Option<AccessKind>,
}

impl BatchContext {
    pub(crate) fn new(
        call: Arc<dyn BatchCall>,
        client: Arc<dyn KvClient>,
        timeout: Duration,
        metrics: &DispatcherMetrics,
    ) -> Self {
        Self {
            call,
            client,
            timeout,
            read_flush_metric: metrics.read_flush.clone(),
            write_flush_metric: metrics.write_flush.clone(),
            blocks: Vec::new(),
            read_data: BlockData::default(),
            write_data: BlockData::default(),
            flush_head: None,
            last_conflict: None,
        }
    }

    /// Add one operation and its declared key set to the plan
    pub(crate) fn apply(
        &mut self,
        index: usize,
        op: BackendOp,
        metric: Histogram,
        keys: Vec<Bytes>,
    ) {
        let access = op.access();
        self.check_conflicts(access, &keys);

        let block_id = match self.data(access).block {
            Some(id) => id,
            None => {
                let id = self.alloc_block(access);
                self.data_mut(access).block = Some(id);
                if self.last_conflict == Some(access) {
                    self.link_after_opposite(access, id);
                }
                id
            }
        };

        self.block_mut(block_id).add_operation(Operation { index, op, metric });
        self.data_mut(access).used_keys.extend(keys);
    }

    /// Start execution. With a conflict on record the chain launches from
    /// `flush_head` and self-propagates; otherwise each non-empty slot block
    /// launches independently.
    pub(crate) fn commit(self) {
        let BatchContext {
            client,
            timeout,
            mut blocks,
            read_data,
            write_data,
            flush_head,
            ..
        } = self;

        if let Some(head) = flush_head {
            debug!("committing batch as a serialized chain");
            tokio::spawn(async move {
                let mut cursor = Some(head);
                while let Some(BlockId(id)) = cursor {
                    match blocks.get_mut(id).and_then(Option::take) {
                        Some(block) => cursor = block.run(client.as_ref(), timeout).await,
                        None => {
                            error!("flush chain references a consumed block");
                            break;
                        }
                    }
                }
            });
            return;
        }

        for slot in [read_data.block, write_data.block].into_iter().flatten() {
            let BlockId(id) = slot;
            if let Some(block) = blocks.get_mut(id).and_then(Option::take) {
                let client = client.clone();
                tokio::spawn(async move {
                    let next = block.run(client.as_ref(), timeout).await;
                    debug_assert!(next.is_none());
                });
            }
        }
    }

    fn alloc_block(&mut self, access: AccessKind) -> BlockId {
        let flush_metric = match access {
            AccessKind::Read => self.read_flush_metric.clone(),
            AccessKind::Write => self.write_flush_metric.clone(),
        };
        let block = Block::new(self.call.clone(), access, flush_metric);
        self.blocks.push(Some(block));
        BlockId(self.blocks.len() - 1)
    }

    fn check_conflicts(&mut self, access: AccessKind, keys: &[Bytes]) {
        if self.last_conflict == Some(access) {
            return;
        }
        let opposite = self.data(access.opposite());
        if keys.iter().any(|key| opposite.used_keys.contains(key)) {
            self.conflict_found(access);
        }
    }

    fn conflict_found(&mut self, access: AccessKind) {
        match self.last_conflict {
            // First conflict: the two in-progress blocks were independent
            // and must now be serialized, earlier kind first.
            None => {
                let current = self.data(access).block;
                let opposite = self.data(access.opposite()).block;
                self.flush_head = opposite;
                if let (Some(opposite_id), Some(current_id)) = (opposite, current) {
                    self.link(opposite_id, current_id);
                }
            }
            // Later conflict: seal the current block of this kind. It is
            // already linked into the chain; `apply` allocates a fresh block
            // and appends it after the opposite block.
            Some(_) => {
                let data = self.data_mut(access);
                data.block = None;
                data.used_keys.clear();
            }
        }
        self.last_conflict = Some(access);
    }

    fn link_after_opposite(&mut self, access: AccessKind, id: BlockId) {
        match self.data(access.opposite()).block {
            Some(opposite_id) => self.link(opposite_id, id),
            None => error!("conflict recorded without an opposite block to chain after"),
        }
    }

    fn link(&mut self, predecessor: BlockId, successor: BlockId) {
        let previous = self.block_mut(predecessor).set_next(successor);
        if previous.is_some() {
            error!("predecessor block already had a successor");
            debug_assert!(previous.is_none());
        }
    }

    fn data(&self, access: AccessKind) -> &BlockData {
        match access {
            AccessKind::Read => &self.read_data,
            AccessKind::Write => &self.write_data,
        }
    }

    fn data_mut(&mut self, access: AccessKind) -> &mut BlockData {
        match access {
            AccessKind::Read => &mut self.read_data,
            AccessKind::Write => &mut self.write_data,
        }
    }

    fn block_mut(&mut self, BlockId(id): BlockId) -> &mut Block {
        match self.blocks.get_mut(id).and_then(Option::as_mut) {
            Some(block) => block,
            // Planner invariant: ids are only handed out by alloc_block and
            // blocks are only consumed at commit.
            None => unreachable!("block {id} consumed before commit"),
        }
    }
}
