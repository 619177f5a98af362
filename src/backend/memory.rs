//! In-memory backend
//!
//! A complete in-process implementation of the backend contracts over a
//! concurrent hashmap, with string, hash, and set values. The test suites
//! run the dispatcher against it end-to-end; it also serves embedded use
//! where no cluster is available.
//!
//! Flush accounting (counts per kind, high-water concurrency) is exposed via
//! [`MemoryBackend::stats`], and an optional artificial flush delay makes
//! flush overlap observable under `tokio`'s paused test clock.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::DispatcherConfig;
use crate::error::{PyriteError, Result};
use crate::reply::Reply;

use super::{
    AccessKind, BackendOp, KvClient, KvConnector, KvSession, PendingError, PendingErrors,
    ReadRequest, Request, TableHandle, WriteRequest,
};

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
const NOT_INTEGER: &str = "value is not an integer or out of range";
const OVERFLOW: &str = "increment or decrement would overflow";

/// Value types stored in the keyspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// String value
    Str(Bytes),
    /// Hash value (field-value mapping)
    Hash(HashMap<Bytes, Bytes>),
    /// Set value (unordered collection of unique members)
    Set(HashSet<Bytes>),
}

#[derive(Debug, Default)]
struct Counters {
    connects: AtomicUsize,
    read_flushes: AtomicUsize,
    write_flushes: AtomicUsize,
    inflight: AtomicUsize,
    max_inflight: AtomicUsize,
}

/// Snapshot of the backend's flush accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushStats {
    /// Times the connector built a client
    pub connects: usize,
    /// Read flushes issued
    pub read_flushes: usize,
    /// Write flushes issued
    pub write_flushes: usize,
    /// Highest number of flushes ever in progress at once
    pub max_inflight: usize,
}

#[derive(Debug)]
struct Keyspace {
    data: DashMap<Bytes, Value>,
    counters: Counters,
    flush_delay: Duration,
}

/// In-memory connector, client factory, and inspection handle
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    keyspace: Arc<Keyspace>,
}

impl MemoryBackend {
    /// Create an empty in-memory backend
    pub fn new() -> Self {
        Self::with_flush_delay(Duration::ZERO)
    }

    /// Create a backend whose every flush takes `delay` of tokio time
    pub fn with_flush_delay(delay: Duration) -> Self {
        Self {
            keyspace: Arc::new(Keyspace {
                data: DashMap::new(),
                counters: Counters::default(),
                flush_delay: delay,
            }),
        }
    }

    /// Snapshot the flush accounting
    pub fn stats(&self) -> FlushStats {
        let c = &self.keyspace.counters;
        FlushStats {
            connects: c.connects.load(Ordering::Relaxed),
            read_flushes: c.read_flushes.load(Ordering::Relaxed),
            write_flushes: c.write_flushes.load(Ordering::Relaxed),
            max_inflight: c.max_inflight.load(Ordering::Relaxed),
        }
    }

    /// Current string value of a key, if it holds one
    pub fn string_value(&self, key: &[u8]) -> Option<Bytes> {
        match self.keyspace.data.get(key)?.value() {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvConnector for MemoryBackend {
    async fn connect(&self, config: &DispatcherConfig) -> Result<(Arc<dyn KvClient>, TableHandle)> {
        self.keyspace.counters.connects.fetch_add(1, Ordering::Relaxed);
        let client = MemoryClient {
            keyspace: self.keyspace.clone(),
        };
        Ok((Arc::new(client), TableHandle::new(config.table_name.clone())))
    }
}

/// Client over the shared in-memory keyspace
#[derive(Debug)]
pub struct MemoryClient {
    keyspace: Arc<Keyspace>,
}

impl KvClient for MemoryClient {
    fn new_session(&self, access: AccessKind) -> Box<dyn KvSession> {
        Box::new(MemorySession {
            keyspace: self.keyspace.clone(),
            access,
            timeout: Duration::from_secs(60),
            queued: Vec::new(),
            pending: PendingErrors::default(),
        })
    }
}

/// One buffered flush unit against the in-memory keyspace
pub struct MemorySession {
    keyspace: Arc<Keyspace>,
    access: AccessKind,
    timeout: Duration,
    queued: Vec<BackendOp>,
    pending: PendingErrors,
}

#[async_trait]
impl KvSession for MemorySession {
    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn apply(&mut self, op: &BackendOp) -> Result<()> {
        if op.access() != self.access {
            return Err(PyriteError::ApplyRejected(format!(
                "{:?} operation applied to a {:?} session",
                op.access(),
                self.access
            )));
        }
        if op.primary_key().is_empty() {
            return Err(PyriteError::ApplyRejected(
                "primary key must not be empty".to_string(),
            ));
        }
        self.queued.push(op.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<Vec<Reply>> {
        let keyspace = self.keyspace.clone();
        let counters = &keyspace.counters;
        match self.access {
            AccessKind::Read => counters.read_flushes.fetch_add(1, Ordering::Relaxed),
            AccessKind::Write => counters.write_flushes.fetch_add(1, Ordering::Relaxed),
        };
        let inflight = counters.inflight.fetch_add(1, Ordering::Relaxed) + 1;
        counters.max_inflight.fetch_max(inflight, Ordering::Relaxed);

        let delay = self.keyspace.flush_delay;
        let timed_out = delay > self.timeout;
        tokio::time::sleep(delay.min(self.timeout)).await;

        let result = if timed_out {
            Err(PyriteError::Timeout(self.timeout))
        } else {
            self.execute_queued()
        };

        counters.inflight.fetch_sub(1, Ordering::Relaxed);
        result
    }

    fn pending_errors(&mut self) -> PendingErrors {
        std::mem::take(&mut self.pending)
    }
}

impl MemorySession {
    fn execute_queued(&mut self) -> Result<Vec<Reply>> {
        let mut replies = Vec::with_capacity(self.queued.len());
        let mut failed = 0usize;
        for op in self.queued.drain(..) {
            let outcome = match op.request() {
                Request::Read(r) => read(&self.keyspace.data, r),
                Request::Write(w) => write(&self.keyspace.data, w),
            };
            match outcome {
                Ok(reply) => replies.push(reply),
                Err(message) => {
                    failed += 1;
                    self.pending.errors.push(PendingError {
                        key: op.primary_key().clone(),
                        message,
                    });
                }
            }
        }
        if failed > 0 {
            Err(PyriteError::Flush(format!("{failed} operation(s) failed")))
        } else {
            Ok(replies)
        }
    }
}

type OpResult = std::result::Result<Reply, String>;

fn read(data: &DashMap<Bytes, Value>, request: &ReadRequest) -> OpResult {
    match request {
        ReadRequest::Get { key } => match data.get(key).map(|e| e.value().clone()) {
            None => Ok(Reply::null()),
            Some(Value::Str(s)) => Ok(Reply::bulk(s)),
            Some(_) => Err(WRONG_TYPE.to_string()),
        },
        ReadRequest::MGet { keys } => {
            let values = keys
                .iter()
                .map(|key| match data.get(key).map(|e| e.value().clone()) {
                    Some(Value::Str(s)) => Reply::bulk(s),
                    _ => Reply::null(),
                })
                .collect();
            Ok(Reply::array(values))
        }
        ReadRequest::StrLen { key } => match data.get(key).map(|e| e.value().clone()) {
            None => Ok(Reply::integer(0)),
            Some(Value::Str(s)) => Ok(Reply::integer(s.len() as i64)),
            Some(_) => Err(WRONG_TYPE.to_string()),
        },
        ReadRequest::Exists { key } => Ok(Reply::integer(i64::from(data.contains_key(key)))),
        ReadRequest::GetRange { key, start, end } => match data.get(key).map(|e| e.value().clone()) {
            None => Ok(Reply::bulk(Bytes::new())),
            Some(Value::Str(s)) => Ok(Reply::bulk(substring(&s, *start, *end))),
            Some(_) => Err(WRONG_TYPE.to_string()),
        },
        ReadRequest::HGet { key, field } => match data.get(key).map(|e| e.value().clone()) {
            None => Ok(Reply::null()),
            Some(Value::Hash(h)) => Ok(h.get(field).map(|v| Reply::bulk(v.clone())).unwrap_or_else(Reply::null)),
            Some(_) => Err(WRONG_TYPE.to_string()),
        },
        ReadRequest::HMGet { key, fields } => match data.get(key).map(|e| e.value().clone()) {
            None => Ok(Reply::array(fields.iter().map(|_| Reply::null()).collect())),
            Some(Value::Hash(h)) => Ok(Reply::array(
                fields
                    .iter()
                    .map(|f| h.get(f).map(|v| Reply::bulk(v.clone())).unwrap_or_else(Reply::null))
                    .collect(),
            )),
            Some(_) => Err(WRONG_TYPE.to_string()),
        },
        ReadRequest::HGetAll { key } => match data.get(key).map(|e| e.value().clone()) {
            None => Ok(Reply::array(Vec::new())),
            Some(Value::Hash(h)) => {
                let mut fields: Vec<_> = h.iter().collect();
                fields.sort_by(|a, b| a.0.cmp(b.0));
                let mut flat = Vec::with_capacity(fields.len() * 2);
                for (field, value) in fields {
                    flat.push(Reply::bulk(field.clone()));
                    flat.push(Reply::bulk(value.clone()));
                }
                Ok(Reply::array(flat))
            }
            Some(_) => Err(WRONG_TYPE.to_string()),
        },
        ReadRequest::SMembers { key } => match data.get(key).map(|e| e.value().clone()) {
            None => Ok(Reply::array(Vec::new())),
            Some(Value::Set(s)) => {
                let mut members: Vec<_> = s.iter().cloned().collect();
                members.sort();
                Ok(Reply::array(members.into_iter().map(Reply::bulk).collect()))
            }
            Some(_) => Err(WRONG_TYPE.to_string()),
        },
    }
}

fn write(data: &DashMap<Bytes, Value>, request: &WriteRequest) -> OpResult {
    match request {
        WriteRequest::Set { key, value } => {
            data.insert(key.clone(), Value::Str(value.clone()));
            Ok(Reply::ok())
        }
        WriteRequest::MSet { pairs } => {
            for (key, value) in pairs {
                data.insert(key.clone(), Value::Str(value.clone()));
            }
            Ok(Reply::ok())
        }
        WriteRequest::GetSet { key, value } => match data.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(Value::Str(value.clone()));
                Ok(Reply::null())
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Str(s) => {
                    let old = std::mem::replace(s, value.clone());
                    Ok(Reply::bulk(old))
                }
                _ => Err(WRONG_TYPE.to_string()),
            },
        },
        WriteRequest::Append { key, value } => {
            let mut entry = data.entry(key.clone()).or_insert(Value::Str(Bytes::new()));
            match entry.value_mut() {
                Value::Str(s) => {
                    let mut buf = BytesMut::with_capacity(s.len() + value.len());
                    buf.extend_from_slice(s);
                    buf.extend_from_slice(value);
                    let len = buf.len();
                    *s = buf.freeze();
                    Ok(Reply::integer(len as i64))
                }
                _ => Err(WRONG_TYPE.to_string()),
            }
        }
        WriteRequest::SetRange { key, offset, value } => {
            let offset = usize::try_from(*offset).map_err(|_| NOT_INTEGER.to_string())?;
            let mut entry = data.entry(key.clone()).or_insert(Value::Str(Bytes::new()));
            match entry.value_mut() {
                Value::Str(s) => {
                    let end = offset + value.len();
                    let mut buf = BytesMut::with_capacity(s.len().max(end));
                    buf.extend_from_slice(s);
                    if buf.len() < end {
                        buf.resize(end, 0);
                    }
                    buf[offset..end].copy_from_slice(value);
                    let len = buf.len();
                    *s = buf.freeze();
                    Ok(Reply::integer(len as i64))
                }
                _ => Err(WRONG_TYPE.to_string()),
            }
        }
        WriteRequest::Incr { key } => {
            let mut entry = data
                .entry(key.clone())
                .or_insert(Value::Str(Bytes::from_static(b"0")));
            match entry.value_mut() {
                Value::Str(s) => {
                    let n = std::str::from_utf8(s)
                        .ok()
                        .and_then(|s| s.parse::<i64>().ok())
                        .ok_or_else(|| NOT_INTEGER.to_string())?;
                    let n = n.checked_add(1).ok_or_else(|| OVERFLOW.to_string())?;
                    *s = Bytes::from(n.to_string());
                    Ok(Reply::integer(n))
                }
                _ => Err(WRONG_TYPE.to_string()),
            }
        }
        WriteRequest::Del { key } => Ok(Reply::integer(i64::from(data.remove(key).is_some()))),
        WriteRequest::HSet { key, field, value } => {
            let mut entry = data.entry(key.clone()).or_insert_with(|| Value::Hash(HashMap::new()));
            match entry.value_mut() {
                Value::Hash(h) => {
                    let added = i64::from(h.insert(field.clone(), value.clone()).is_none());
                    Ok(Reply::integer(added))
                }
                _ => Err(WRONG_TYPE.to_string()),
            }
        }
        WriteRequest::HMSet { key, pairs } => {
            let mut entry = data.entry(key.clone()).or_insert_with(|| Value::Hash(HashMap::new()));
            match entry.value_mut() {
                Value::Hash(h) => {
                    for (field, value) in pairs {
                        h.insert(field.clone(), value.clone());
                    }
                    Ok(Reply::ok())
                }
                _ => Err(WRONG_TYPE.to_string()),
            }
        }
        WriteRequest::HDel { key, fields } => {
            let removed = match data.get_mut(key).as_deref_mut() {
                None => 0,
                Some(Value::Hash(h)) => fields.iter().filter(|f| h.remove(*f).is_some()).count(),
                Some(_) => return Err(WRONG_TYPE.to_string()),
            };
            Ok(Reply::integer(removed as i64))
        }
        WriteRequest::SAdd { key, members } => {
            let mut entry = data.entry(key.clone()).or_insert_with(|| Value::Set(HashSet::new()));
            match entry.value_mut() {
                Value::Set(s) => {
                    let added = members.iter().filter(|m| s.insert((*m).clone())).count();
                    Ok(Reply::integer(added as i64))
                }
                _ => Err(WRONG_TYPE.to_string()),
            }
        }
        WriteRequest::SRem { key, members } => {
            let removed = match data.get_mut(key).as_deref_mut() {
                None => 0,
                Some(Value::Set(s)) => members.iter().filter(|m| s.remove(*m)).count(),
                Some(_) => return Err(WRONG_TYPE.to_string()),
            };
            Ok(Reply::integer(removed as i64))
        }
    }
}

/// Redis-style substring with negative offsets from the end, inclusive
/// bounds. Only the end offset clamps to the last index; a start at or past
/// the length yields the empty string.
fn substring(s: &Bytes, start: i64, end: i64) -> Bytes {
    let len = s.len() as i64;
    if len == 0 {
        return Bytes::new();
    }
    let resolve = |i: i64| if i < 0 { (len + i).max(0) } else { i };
    let start = resolve(start).min(len);
    let end = resolve(end).min(len - 1);
    if start > end {
        return Bytes::new();
    }
    s.slice(start as usize..=end as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    fn keyspace() -> DashMap<Bytes, Value> {
        DashMap::new()
    }

    #[test]
    fn test_set_get_roundtrip() {
        let data = keyspace();
        let reply = write(
            &data,
            &WriteRequest::Set {
                key: key("a"),
                value: key("hello"),
            },
        )
        .unwrap();
        assert_eq!(reply, Reply::ok());
        let reply = read(&data, &ReadRequest::Get { key: key("a") }).unwrap();
        assert_eq!(reply, Reply::bulk(key("hello")));
    }

    #[test]
    fn test_get_missing_is_null() {
        let data = keyspace();
        assert_eq!(read(&data, &ReadRequest::Get { key: key("nope") }).unwrap(), Reply::null());
    }

    #[test]
    fn test_get_wrong_type() {
        let data = keyspace();
        write(
            &data,
            &WriteRequest::HSet {
                key: key("h"),
                field: key("f"),
                value: key("v"),
            },
        )
        .unwrap();
        let err = read(&data, &ReadRequest::Get { key: key("h") }).unwrap_err();
        assert!(err.starts_with("WRONGTYPE"));
    }

    #[test]
    fn test_getrange_offsets() {
        let data = keyspace();
        write(
            &data,
            &WriteRequest::Set {
                key: key("s"),
                value: key("Hello World"),
            },
        )
        .unwrap();
        let range = |start, end| {
            read(
                &data,
                &ReadRequest::GetRange {
                    key: key("s"),
                    start,
                    end,
                },
            )
            .unwrap()
        };
        assert_eq!(range(0, 4), Reply::bulk(key("Hello")));
        assert_eq!(range(-5, -1), Reply::bulk(key("World")));
        assert_eq!(range(6, 10_000), Reply::bulk(key("World")));
        assert_eq!(range(4, 2), Reply::bulk(Bytes::new()));
        // A start at or past the end of the value is out of range, even
        // though the end offset clamps.
        assert_eq!(range(11, 13), Reply::bulk(Bytes::new()));
    }

    #[test]
    fn test_incr_new_and_existing() {
        let data = keyspace();
        assert_eq!(write(&data, &WriteRequest::Incr { key: key("n") }).unwrap(), Reply::integer(1));
        assert_eq!(write(&data, &WriteRequest::Incr { key: key("n") }).unwrap(), Reply::integer(2));
    }

    #[test]
    fn test_getset_returns_old_value() {
        let data = keyspace();
        assert_eq!(
            write(
                &data,
                &WriteRequest::GetSet {
                    key: key("a"),
                    value: key("first"),
                }
            )
            .unwrap(),
            Reply::null()
        );
        assert_eq!(
            write(
                &data,
                &WriteRequest::GetSet {
                    key: key("a"),
                    value: key("second"),
                }
            )
            .unwrap(),
            Reply::bulk(key("first"))
        );
        assert_eq!(
            read(&data, &ReadRequest::Get { key: key("a") }).unwrap(),
            Reply::bulk(key("second"))
        );
    }

    #[test]
    fn test_getset_wrong_type_leaves_value_intact() {
        let data = keyspace();
        write(
            &data,
            &WriteRequest::SAdd {
                key: key("s"),
                members: vec![key("m")],
            },
        )
        .unwrap();
        let err = write(
            &data,
            &WriteRequest::GetSet {
                key: key("s"),
                value: key("v"),
            },
        )
        .unwrap_err();
        assert!(err.starts_with("WRONGTYPE"));
        assert_eq!(
            read(&data, &ReadRequest::SMembers { key: key("s") }).unwrap(),
            Reply::array(vec![Reply::bulk(key("m"))])
        );
    }

    #[test]
    fn test_incr_non_integer_fails() {
        let data = keyspace();
        write(
            &data,
            &WriteRequest::Set {
                key: key("n"),
                value: key("abc"),
            },
        )
        .unwrap();
        let err = write(&data, &WriteRequest::Incr { key: key("n") }).unwrap_err();
        assert_eq!(err, NOT_INTEGER);
    }

    #[test]
    fn test_incr_overflow_reports_overflow() {
        let data = keyspace();
        write(
            &data,
            &WriteRequest::Set {
                key: key("n"),
                value: key(&i64::MAX.to_string()),
            },
        )
        .unwrap();
        let err = write(&data, &WriteRequest::Incr { key: key("n") }).unwrap_err();
        assert_eq!(err, OVERFLOW);
    }

    #[test]
    fn test_append_and_setrange() {
        let data = keyspace();
        assert_eq!(
            write(
                &data,
                &WriteRequest::Append {
                    key: key("s"),
                    value: key("Hello"),
                }
            )
            .unwrap(),
            Reply::integer(5)
        );
        assert_eq!(
            write(
                &data,
                &WriteRequest::SetRange {
                    key: key("s"),
                    offset: 6,
                    value: key("World"),
                }
            )
            .unwrap(),
            Reply::integer(11)
        );
        assert_eq!(
            read(&data, &ReadRequest::Get { key: key("s") }).unwrap(),
            Reply::bulk(Bytes::from_static(b"Hello\0World"))
        );
    }

    #[test]
    fn test_hash_ops() {
        let data = keyspace();
        assert_eq!(
            write(
                &data,
                &WriteRequest::HSet {
                    key: key("h"),
                    field: key("f1"),
                    value: key("v1"),
                }
            )
            .unwrap(),
            Reply::integer(1)
        );
        write(
            &data,
            &WriteRequest::HMSet {
                key: key("h"),
                pairs: vec![(key("f2"), key("v2")), (key("f3"), key("v3"))],
            },
        )
        .unwrap();
        assert_eq!(
            read(
                &data,
                &ReadRequest::HMGet {
                    key: key("h"),
                    fields: vec![key("f2"), key("missing")],
                }
            )
            .unwrap(),
            Reply::array(vec![Reply::bulk(key("v2")), Reply::null()])
        );
        assert_eq!(
            write(
                &data,
                &WriteRequest::HDel {
                    key: key("h"),
                    fields: vec![key("f1"), key("missing")],
                }
            )
            .unwrap(),
            Reply::integer(1)
        );
        assert_eq!(
            read(&data, &ReadRequest::HGetAll { key: key("h") }).unwrap(),
            Reply::array(vec![
                Reply::bulk(key("f2")),
                Reply::bulk(key("v2")),
                Reply::bulk(key("f3")),
                Reply::bulk(key("v3")),
            ])
        );
    }

    #[test]
    fn test_set_ops() {
        let data = keyspace();
        assert_eq!(
            write(
                &data,
                &WriteRequest::SAdd {
                    key: key("s"),
                    members: vec![key("a"), key("b"), key("a")],
                }
            )
            .unwrap(),
            Reply::integer(2)
        );
        assert_eq!(
            write(
                &data,
                &WriteRequest::SRem {
                    key: key("s"),
                    members: vec![key("b"), key("zzz")],
                }
            )
            .unwrap(),
            Reply::integer(1)
        );
        assert_eq!(
            read(&data, &ReadRequest::SMembers { key: key("s") }).unwrap(),
            Reply::array(vec![Reply::bulk(key("a"))])
        );
    }

    #[tokio::test]
    async fn test_session_rejects_cross_kind_apply() {
        let backend = MemoryBackend::new();
        let (client, table) = backend.connect(&DispatcherConfig::default()).await.unwrap();
        let mut session = client.new_session(AccessKind::Read);
        let op = BackendOp::write(
            table,
            WriteRequest::Set {
                key: key("a"),
                value: key("1"),
            },
        );
        assert!(matches!(session.apply(&op), Err(PyriteError::ApplyRejected(_))));
    }

    #[tokio::test]
    async fn test_failed_flush_retains_pending_errors() {
        let backend = MemoryBackend::new();
        let (client, table) = backend.connect(&DispatcherConfig::default()).await.unwrap();
        let mut session = client.new_session(AccessKind::Write);
        session
            .apply(&BackendOp::write(
                table.clone(),
                WriteRequest::Set {
                    key: key("n"),
                    value: key("abc"),
                },
            ))
            .unwrap();
        session
            .apply(&BackendOp::write(table, WriteRequest::Incr { key: key("n") }))
            .unwrap();
        let err = session.flush().await.unwrap_err();
        assert!(matches!(err, PyriteError::Flush(_)));
        let pending = session.pending_errors();
        assert_eq!(pending.errors.len(), 1);
        assert_eq!(pending.errors[0].key, key("n"));
        assert!(!pending.overflowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_times_out_past_deadline() {
        let backend = MemoryBackend::with_flush_delay(Duration::from_secs(5));
        let (client, table) = backend.connect(&DispatcherConfig::default()).await.unwrap();
        let mut session = client.new_session(AccessKind::Read);
        session.set_timeout(Duration::from_secs(1));
        session
            .apply(&BackendOp::read(table, ReadRequest::Get { key: key("a") }))
            .unwrap();
        let err = session.flush().await.unwrap_err();
        assert!(matches!(err, PyriteError::Timeout(_)));
    }
}
