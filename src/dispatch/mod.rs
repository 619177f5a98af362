//! Request dispatch
//!
//! This module implements [`Dispatcher`], the entry point for inbound
//! pipeline calls. Per call it lazily initializes the backend client,
//! validates and parses each command of the batch, feeds the planner in
//! [`batch`], and commits the resulting flush plan. Failures are localized
//! to their pipeline slot; only client initialization failure fails a whole
//! batch.

mod batch;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::backend::{BackendOp, KvClient, KvConnector, TableHandle};
use crate::call::{BatchCall, RespCommand};
use crate::commands::{CommandHandler, CommandRegistry, RegistryEntry};
use crate::config::DispatcherConfig;
use crate::error::{PyriteError, Result};
use crate::metrics::DispatcherMetrics;

use batch::BatchContext;

#[derive(Clone)]
struct ClientContext {
    client: Arc<dyn KvClient>,
    table: TableHandle,
}

/// Entry point for inbound pipeline batches
pub struct Dispatcher {
    config: DispatcherConfig,
    registry: CommandRegistry,
    metrics: DispatcherMetrics,
    connector: Box<dyn KvConnector>,
    /// Fast-path flag for the lazy client bootstrap; acquire-load pairs
    /// with the release-store after a successful connect.
    client_ready: AtomicBool,
    init_lock: tokio::sync::Mutex<()>,
    client_context: RwLock<Option<ClientContext>>,
}

impl Dispatcher {
    /// Create a dispatcher. The backend client is not built until the first
    /// call arrives.
    pub fn new(config: DispatcherConfig, connector: Box<dyn KvConnector>) -> Self {
        Self {
            config,
            registry: CommandRegistry::new(),
            metrics: DispatcherMetrics::new(),
            connector,
            client_ready: AtomicBool::new(false),
            init_lock: tokio::sync::Mutex::new(()),
            client_context: RwLock::new(None),
        }
    }

    /// Handle one pipeline call: validate, plan, and launch its flushes.
    ///
    /// Returns once the plan is committed; responses are delivered through
    /// the call as flushes complete.
    pub async fn handle(&self, call: Arc<dyn BatchCall>) {
        let started = Instant::now();
        debug!(batch = call.client_batch().len(), "handling pipeline call");

        let ctx = match self.ensure_client().await {
            Ok(ctx) => ctx,
            Err(err) => {
                error!(error = %err, "backend client initialization failed");
                for index in 0..call.client_batch().len() {
                    self.respond_with_failure(call.as_ref(), started, index, &err);
                }
                return;
            }
        };

        let mut context = BatchContext::new(
            call.clone(),
            ctx.client.clone(),
            self.config.client_timeout(),
            &self.metrics,
        );
        for (index, command) in call.client_batch().iter().enumerate() {
            let Some(entry) = command.first().and_then(|token| self.registry.lookup(token)) else {
                let name = command
                    .first()
                    .map(|token| String::from_utf8_lossy(token).to_ascii_lowercase())
                    .unwrap_or_default();
                error!(command = %name, index, "command not supported");
                self.respond_with_failure(
                    call.as_ref(),
                    started,
                    index,
                    &PyriteError::UnsupportedCommand(name),
                );
                continue;
            };
            if let Err(err) = entry.check_arity(command.len()) {
                error!(command = entry.name(), provided = command.len(), "arity violation");
                self.respond_with_failure(call.as_ref(), started, index, &err);
                continue;
            }
            if let Err(err) = self.invoke(entry, index, command, &ctx, &mut context, &call) {
                self.respond_with_failure(call.as_ref(), started, index, &err);
            }
        }
        context.commit();
    }

    /// Run one registered command: parse, extract the conflict key set, and
    /// feed the planner, or answer locally for commands with no backend I/O.
    fn invoke(
        &self,
        entry: &RegistryEntry,
        index: usize,
        command: &RespCommand,
        ctx: &ClientContext,
        context: &mut BatchContext,
        call: &Arc<dyn BatchCall>,
    ) -> Result<()> {
        match entry.def.handler {
            CommandHandler::Local(build) => {
                let reply = build(command);
                call.respond_success(index, reply, &entry.metric);
                Ok(())
            }
            CommandHandler::Read(parse) => {
                let op = BackendOp::read(ctx.table.clone(), parse(command)?);
                let keys = self.conflict_keys(&op);
                context.apply(index, op, entry.metric.clone(), keys);
                Ok(())
            }
            CommandHandler::Write(parse) => {
                let op = BackendOp::write(ctx.table.clone(), parse(command)?);
                let keys = self.conflict_keys(&op);
                context.apply(index, op, entry.metric.clone(), keys);
                Ok(())
            }
        }
    }

    /// With safe batching, an operation contributes its row's primary key to
    /// conflict analysis; without it, no keys are collected and the planner
    /// never serializes.
    fn conflict_keys(&self, op: &BackendOp) -> Vec<bytes::Bytes> {
        if self.config.safe_batch {
            vec![op.primary_key().clone()]
        } else {
            Vec::new()
        }
    }

    fn respond_with_failure(
        &self,
        call: &dyn BatchCall,
        started: Instant,
        index: usize,
        error: &PyriteError,
    ) {
        debug!(index, error = %error, "responding with failure");
        call.respond_failure(index, error);
        self.metrics.error.record(started.elapsed().as_micros() as f64);
    }

    /// Build the backend client and open the keyspace table, once.
    async fn ensure_client(&self) -> Result<ClientContext> {
        if !self.client_ready.load(Ordering::Acquire) {
            let _guard = self.init_lock.lock().await;
            if !self.client_ready.load(Ordering::Acquire) {
                let (client, table) = self.connector.connect(&self.config).await.map_err(|e| {
                    PyriteError::ClientInit {
                        table: self.config.table_name.clone(),
                        message: e.to_string(),
                    }
                })?;
                debug!(table = table.name(), "backend client initialized");
                *self.client_context.write() = Some(ClientContext { client, table });
                self.client_ready.store(true, Ordering::Release);
            }
        }
        self.client_context
            .read()
            .clone()
            .ok_or_else(|| PyriteError::Internal("client marked ready but absent".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use metrics::Histogram;
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    use crate::backend::memory::MemoryBackend;
    use crate::reply::Reply;

    /// Gathers per-slot results and releases waiters once every slot has
    /// responded.
    pub(crate) struct CollectingCall {
        batch: Vec<RespCommand>,
        slots: Mutex<Vec<Option<std::result::Result<Reply, String>>>>,
        notify: Notify,
    }

    impl CollectingCall {
        pub(crate) fn new(commands: &[&[&str]]) -> Arc<Self> {
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

        fn fill(&self, index: usize, result: std::result::Result<Reply, String>) {
            let mut slots = self.slots.lock();
            assert!(slots[index].is_none(), "slot {index} responded twice");
            slots[index] = Some(result);
            if slots.iter().all(Option::is_some) {
                self.notify.notify_waiters();
            }
        }

        pub(crate) async fn wait(&self) -> Vec<std::result::Result<Reply, String>> {
            loop {
                let notified = self.notify.notified();
                {
                    let slots = self.slots.lock();
                    if slots.iter().all(Option::is_some) {
                        return slots.iter().cloned().map(|s| s.expect("slot filled")).collect();
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

    struct FailingConnector;

    #[async_trait]
    impl crate::backend::KvConnector for FailingConnector {
        async fn connect(
            &self,
            _config: &DispatcherConfig,
        ) -> Result<(Arc<dyn KvClient>, TableHandle)> {
            Err(PyriteError::Internal("no masters reachable".to_string()))
        }
    }

    fn dispatcher(backend: &MemoryBackend) -> Dispatcher {
        Dispatcher::new(DispatcherConfig::default(), Box::new(backend.clone()))
    }

    #[tokio::test]
    async fn test_echo_bypasses_backend() {
        let backend = MemoryBackend::new();
        let dispatcher = dispatcher(&backend);
        let call = CollectingCall::new(&[&["echo", "hi"]]);
        dispatcher.handle(call.clone()).await;
        let results = call.wait().await;
        assert_eq!(results[0], Ok(Reply::bulk(Bytes::from_static(b"hi"))));
        let stats = backend.stats();
        assert_eq!(stats.read_flushes + stats.write_flushes, 0);
    }

    #[tokio::test]
    async fn test_unknown_command_fails_slot_only() {
        let backend = MemoryBackend::new();
        let dispatcher = dispatcher(&backend);
        let call = CollectingCall::new(&[&["get", "k1"], &["foobar"], &["set", "k2", "v"]]);
        dispatcher.handle(call.clone()).await;
        let results = call.wait().await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Ok(Reply::null()));
        assert_eq!(results[1], Err("foobar: unsupported command".to_string()));
        assert_eq!(results[2], Ok(Reply::ok()));
    }

    #[tokio::test]
    async fn test_arity_failures_localized() {
        let backend = MemoryBackend::new();
        let dispatcher = dispatcher(&backend);
        let call = CollectingCall::new(&[&["get", "k", "extra"], &["mget"], &["set", "k", "v"]]);
        dispatcher.handle(call.clone()).await;
        let results = call.wait().await;
        assert_eq!(results[0], Err("get: wrong number of arguments".to_string()));
        assert_eq!(results[1], Err("mget: too few arguments".to_string()));
        assert_eq!(results[2], Ok(Reply::ok()));
    }

    #[tokio::test]
    async fn test_parse_failure_localized() {
        let backend = MemoryBackend::new();
        let dispatcher = dispatcher(&backend);
        let call = CollectingCall::new(&[&["getrange", "k", "x", "4"], &["get", "k"]]);
        dispatcher.handle(call.clone()).await;
        let results = call.wait().await;
        assert!(results[0].as_ref().is_err_and(|e| e.contains("not an integer")));
        assert_eq!(results[1], Ok(Reply::null()));
    }

    #[tokio::test]
    async fn test_init_failure_fails_every_slot() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default(), Box::new(FailingConnector));
        let call = CollectingCall::new(&[&["get", "a"], &["echo", "hi"], &["set", "a", "1"]]);
        dispatcher.handle(call.clone()).await;
        let results = call.wait().await;
        assert_eq!(results.len(), 3);
        for result in results {
            let message = result.expect_err("every slot fails");
            assert!(message.contains("could not open table"));
            assert!(message.contains("no masters reachable"));
        }
    }

    #[tokio::test]
    async fn test_client_initialized_once_across_calls() {
        let backend = MemoryBackend::new();
        let dispatcher = dispatcher(&backend);
        for _ in 0..3 {
            let call = CollectingCall::new(&[&["set", "k", "v"]]);
            dispatcher.handle(call.clone()).await;
            call.wait().await;
        }
        assert_eq!(backend.stats().connects, 1);
    }

    #[tokio::test]
    async fn test_empty_batch_commits_nothing() {
        let backend = MemoryBackend::new();
        let dispatcher = dispatcher(&backend);
        let call = CollectingCall::new(&[]);
        dispatcher.handle(call.clone()).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(backend.stats().read_flushes + backend.stats().write_flushes, 0);
    }
}
