//! Response payloads
//!
//! This module defines the [`Reply`] enum: the typed payload a completed
//! operation hands back to the pipeline call. RESP framing and encoding live
//! in the wire layer; the dispatcher only ever deals in these values.

use bytes::Bytes;

/// Payload of one successful command response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Simple string: +OK\r\n
    Simple(Bytes),

    /// Bulk string: $5\r\nhello\r\n or $-1\r\n for null
    Bulk(Option<Bytes>),

    /// Integer: :1000\r\n
    Integer(i64),

    /// Array: *2\r\n...
    Array(Vec<Reply>),
}

impl Reply {
    /// Create a simple string reply
    #[inline]
    pub fn simple(s: impl Into<Bytes>) -> Self {
        Reply::Simple(s.into())
    }

    /// The canonical +OK reply
    #[inline]
    pub fn ok() -> Self {
        Reply::Simple(Bytes::from_static(b"OK"))
    }

    /// Create a bulk string reply
    #[inline]
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(Some(data.into()))
    }

    /// Create a null bulk string reply
    #[inline]
    pub fn null() -> Self {
        Reply::Bulk(None)
    }

    /// Create an integer reply
    #[inline]
    pub fn integer(n: i64) -> Self {
        Reply::Integer(n)
    }

    /// Create an array reply
    #[inline]
    pub fn array(items: Vec<Reply>) -> Self {
        Reply::Array(items)
    }
}
