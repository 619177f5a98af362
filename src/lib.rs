//! # Pyrite
//!
//! A Redis-wire-protocol batch dispatcher that fronts a distributed
//! key-value backend. One inbound call carries a pipeline batch of RESP
//! commands; Pyrite validates each command, translates it into a typed
//! backend operation, and plans the batch into backend flushes that are
//! concurrent where key sets are disjoint and strictly chained where a
//! read/write conflict requires pipeline ordering. Responses are delivered
//! per pipeline index as the flushes complete.
//!
//! RESP framing, the connection accept loop, and the real cluster client
//! live outside this crate; the backend is reached through the traits in
//! [`backend`], and [`backend::memory`] provides an in-process
//! implementation for tests and embedded use.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pyrite::backend::memory::MemoryBackend;
//! use pyrite::{Dispatcher, DispatcherConfig};
//!
//! # async fn serve(call: Arc<dyn pyrite::BatchCall>) {
//! let dispatcher = Dispatcher::new(
//!     DispatcherConfig::default(),
//!     Box::new(MemoryBackend::new()),
//! );
//! dispatcher.handle(call).await;
//! # }
//! ```

pub mod backend;
pub mod call;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod reply;

pub use call::{BatchCall, RespCommand};
pub use commands::{CommandKind, CommandRegistry};
pub use config::DispatcherConfig;
pub use dispatch::Dispatcher;
pub use error::{PyriteError, Result};
pub use reply::Reply;
