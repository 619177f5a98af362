//! Command argument parsers
//!
//! Each function turns the RESP tokens of one command into a typed backend
//! request. Token counts are already validated against the table's arity
//! rule by the dispatcher; parsers check what arity alone cannot express
//! (pair alignment, integer arguments) and report slot-local diagnostics.

use bytes::Bytes;

use crate::backend::{ReadRequest, WriteRequest};
use crate::call::RespCommand;
use crate::error::{PyriteError, Result};
use crate::reply::Reply;

fn parse_i64(token: &Bytes) -> Result<i64> {
    std::str::from_utf8(token)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| PyriteError::Parse("value is not an integer or out of range".to_string()))
}

fn pairs_from(tokens: &[Bytes], command: &str) -> Result<Vec<(Bytes, Bytes)>> {
    if tokens.len() % 2 != 0 {
        return Err(PyriteError::Parse(format!(
            "{command}: arguments must come in field-value pairs"
        )));
    }
    Ok(tokens
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}

pub(crate) fn get(cmd: &RespCommand) -> Result<ReadRequest> {
    Ok(ReadRequest::Get {
        key: cmd[1].clone(),
    })
}

pub(crate) fn mget(cmd: &RespCommand) -> Result<ReadRequest> {
    Ok(ReadRequest::MGet {
        keys: cmd[1..].to_vec(),
    })
}

pub(crate) fn hget(cmd: &RespCommand) -> Result<ReadRequest> {
    Ok(ReadRequest::HGet {
        key: cmd[1].clone(),
        field: cmd[2].clone(),
    })
}

pub(crate) fn hmget(cmd: &RespCommand) -> Result<ReadRequest> {
    Ok(ReadRequest::HMGet {
        key: cmd[1].clone(),
        fields: cmd[2..].to_vec(),
    })
}

pub(crate) fn hgetall(cmd: &RespCommand) -> Result<ReadRequest> {
    Ok(ReadRequest::HGetAll {
        key: cmd[1].clone(),
    })
}

pub(crate) fn smembers(cmd: &RespCommand) -> Result<ReadRequest> {
    Ok(ReadRequest::SMembers {
        key: cmd[1].clone(),
    })
}

pub(crate) fn strlen(cmd: &RespCommand) -> Result<ReadRequest> {
    Ok(ReadRequest::StrLen {
        key: cmd[1].clone(),
    })
}

pub(crate) fn exists(cmd: &RespCommand) -> Result<ReadRequest> {
    Ok(ReadRequest::Exists {
        key: cmd[1].clone(),
    })
}

pub(crate) fn getrange(cmd: &RespCommand) -> Result<ReadRequest> {
    Ok(ReadRequest::GetRange {
        key: cmd[1].clone(),
        start: parse_i64(&cmd[2])?,
        end: parse_i64(&cmd[3])?,
    })
}

pub(crate) fn set(cmd: &RespCommand) -> Result<WriteRequest> {
    if cmd.len() != 3 {
        return Err(PyriteError::Parse(
            "set: expiration and flag arguments are not supported".to_string(),
        ));
    }
    Ok(WriteRequest::Set {
        key: cmd[1].clone(),
        value: cmd[2].clone(),
    })
}

pub(crate) fn mset(cmd: &RespCommand) -> Result<WriteRequest> {
    Ok(WriteRequest::MSet {
        pairs: pairs_from(&cmd[1..], "mset")?,
    })
}

pub(crate) fn hset(cmd: &RespCommand) -> Result<WriteRequest> {
    Ok(WriteRequest::HSet {
        key: cmd[1].clone(),
        field: cmd[2].clone(),
        value: cmd[3].clone(),
    })
}

pub(crate) fn hmset(cmd: &RespCommand) -> Result<WriteRequest> {
    Ok(WriteRequest::HMSet {
        key: cmd[1].clone(),
        pairs: pairs_from(&cmd[2..], "hmset")?,
    })
}

pub(crate) fn hdel(cmd: &RespCommand) -> Result<WriteRequest> {
    Ok(WriteRequest::HDel {
        key: cmd[1].clone(),
        fields: cmd[2..].to_vec(),
    })
}

pub(crate) fn sadd(cmd: &RespCommand) -> Result<WriteRequest> {
    Ok(WriteRequest::SAdd {
        key: cmd[1].clone(),
        members: cmd[2..].to_vec(),
    })
}

pub(crate) fn srem(cmd: &RespCommand) -> Result<WriteRequest> {
    Ok(WriteRequest::SRem {
        key: cmd[1].clone(),
        members: cmd[2..].to_vec(),
    })
}

pub(crate) fn getset(cmd: &RespCommand) -> Result<WriteRequest> {
    Ok(WriteRequest::GetSet {
        key: cmd[1].clone(),
        value: cmd[2].clone(),
    })
}

pub(crate) fn append(cmd: &RespCommand) -> Result<WriteRequest> {
    Ok(WriteRequest::Append {
        key: cmd[1].clone(),
        value: cmd[2].clone(),
    })
}

pub(crate) fn del(cmd: &RespCommand) -> Result<WriteRequest> {
    Ok(WriteRequest::Del {
        key: cmd[1].clone(),
    })
}

pub(crate) fn setrange(cmd: &RespCommand) -> Result<WriteRequest> {
    let offset = parse_i64(&cmd[2])?;
    if offset < 0 {
        return Err(PyriteError::Parse("setrange: offset is out of range".to_string()));
    }
    Ok(WriteRequest::SetRange {
        key: cmd[1].clone(),
        offset,
        value: cmd[3].clone(),
    })
}

pub(crate) fn incr(cmd: &RespCommand) -> Result<WriteRequest> {
    Ok(WriteRequest::Incr {
        key: cmd[1].clone(),
    })
}

pub(crate) fn echo(cmd: &RespCommand) -> Reply {
    Reply::bulk(cmd[1].clone())
}
