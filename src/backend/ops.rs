//! Typed backend operations
//!
//! Argument parsers turn RESP tokens into the request values here; the
//! dispatcher binds each request to the open table and hands the resulting
//! [`BackendOp`] to the batch planner. The primary key a request exposes is
//! what safe batching feeds into conflict analysis; for multi-key requests
//! that is the key of the operation's row, i.e. the first key.

use bytes::Bytes;

use super::{AccessKind, TableHandle};

/// A read request against the keyspace table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadRequest {
    /// GET key
    Get {
        /// Primary key
        key: Bytes,
    },
    /// MGET key [key ...]
    MGet {
        /// Keys to fetch, in command order; never empty
        keys: Vec<Bytes>,
    },
    /// STRLEN key
    StrLen {
        /// Primary key
        key: Bytes,
    },
    /// EXISTS key
    Exists {
        /// Primary key
        key: Bytes,
    },
    /// GETRANGE key start end
    GetRange {
        /// Primary key
        key: Bytes,
        /// Start offset, may be negative (from the end)
        start: i64,
        /// End offset, inclusive, may be negative
        end: i64,
    },
    /// HGET key field
    HGet {
        /// Primary key
        key: Bytes,
        /// Hash field
        field: Bytes,
    },
    /// HMGET key field [field ...]
    HMGet {
        /// Primary key
        key: Bytes,
        /// Hash fields, in command order
        fields: Vec<Bytes>,
    },
    /// HGETALL key
    HGetAll {
        /// Primary key
        key: Bytes,
    },
    /// SMEMBERS key
    SMembers {
        /// Primary key
        key: Bytes,
    },
}

impl ReadRequest {
    /// The primary key of this request's row
    pub fn primary_key(&self) -> &Bytes {
        match self {
            ReadRequest::Get { key }
            | ReadRequest::StrLen { key }
            | ReadRequest::Exists { key }
            | ReadRequest::GetRange { key, .. }
            | ReadRequest::HGet { key, .. }
            | ReadRequest::HMGet { key, .. }
            | ReadRequest::HGetAll { key }
            | ReadRequest::SMembers { key } => key,
            ReadRequest::MGet { keys } => &keys[0],
        }
    }
}

/// A write request against the keyspace table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRequest {
    /// SET key value
    Set {
        /// Primary key
        key: Bytes,
        /// Value to store
        value: Bytes,
    },
    /// MSET key value [key value ...]
    MSet {
        /// Key-value pairs, in command order; never empty
        pairs: Vec<(Bytes, Bytes)>,
    },
    /// GETSET key value
    GetSet {
        /// Primary key
        key: Bytes,
        /// New value
        value: Bytes,
    },
    /// APPEND key value
    Append {
        /// Primary key
        key: Bytes,
        /// Bytes to append
        value: Bytes,
    },
    /// SETRANGE key offset value
    SetRange {
        /// Primary key
        key: Bytes,
        /// Byte offset to write at
        offset: i64,
        /// Bytes to splice in
        value: Bytes,
    },
    /// INCR key
    Incr {
        /// Primary key
        key: Bytes,
    },
    /// DEL key
    Del {
        /// Primary key
        key: Bytes,
    },
    /// HSET key field value
    HSet {
        /// Primary key
        key: Bytes,
        /// Hash field
        field: Bytes,
        /// Field value
        value: Bytes,
    },
    /// HMSET key field value [field value ...]
    HMSet {
        /// Primary key
        key: Bytes,
        /// Field-value pairs, in command order
        pairs: Vec<(Bytes, Bytes)>,
    },
    /// HDEL key field [field ...]
    HDel {
        /// Primary key
        key: Bytes,
        /// Fields to remove
        fields: Vec<Bytes>,
    },
    /// SADD key member [member ...]
    SAdd {
        /// Primary key
        key: Bytes,
        /// Members to add
        members: Vec<Bytes>,
    },
    /// SREM key member [member ...]
    SRem {
        /// Primary key
        key: Bytes,
        /// Members to remove
        members: Vec<Bytes>,
    },
}

impl WriteRequest {
    /// The primary key of this request's row
    pub fn primary_key(&self) -> &Bytes {
        match self {
            WriteRequest::Set { key, .. }
            | WriteRequest::GetSet { key, .. }
            | WriteRequest::Append { key, .. }
            | WriteRequest::SetRange { key, .. }
            | WriteRequest::Incr { key }
            | WriteRequest::Del { key }
            | WriteRequest::HSet { key, .. }
            | WriteRequest::HMSet { key, .. }
            | WriteRequest::HDel { key, .. }
            | WriteRequest::SAdd { key, .. }
            | WriteRequest::SRem { key, .. } => key,
            WriteRequest::MSet { pairs } => &pairs[0].0,
        }
    }
}

/// Either kind of request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// A read request
    Read(ReadRequest),
    /// A write request
    Write(WriteRequest),
}

/// One backend operation: a typed request bound to an open table
#[derive(Debug, Clone)]
pub struct BackendOp {
    table: TableHandle,
    request: Request,
}

impl BackendOp {
    /// Bind a read request to a table
    pub fn read(table: TableHandle, request: ReadRequest) -> Self {
        Self {
            table,
            request: Request::Read(request),
        }
    }

    /// Bind a write request to a table
    pub fn write(table: TableHandle, request: WriteRequest) -> Self {
        Self {
            table,
            request: Request::Write(request),
        }
    }

    /// Whether this operation reads or writes
    #[inline]
    pub fn access(&self) -> AccessKind {
        match self.request {
            Request::Read(_) => AccessKind::Read,
            Request::Write(_) => AccessKind::Write,
        }
    }

    /// The table this operation is bound to
    pub fn table(&self) -> &TableHandle {
        &self.table
    }

    /// The request payload
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The binary primary-key column of this operation's row
    pub fn primary_key(&self) -> &Bytes {
        match &self.request {
            Request::Read(r) => r.primary_key(),
            Request::Write(w) => w.primary_key(),
        }
    }
}
