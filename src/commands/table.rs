//! The command table
//!
//! Single source of truth for every supported command. Kind is carried by
//! the handler variant and the metric handle is instantiated from the name,
//! so a command is added or changed in exactly one place.

use super::{parser, CommandDef, CommandHandler};

pub(crate) static COMMANDS: &[CommandDef] = &[
    CommandDef {
        name: "get",
        arity: 2,
        handler: CommandHandler::Read(parser::get),
    },
    CommandDef {
        name: "mget",
        arity: -2,
        handler: CommandHandler::Read(parser::mget),
    },
    CommandDef {
        name: "hget",
        arity: 3,
        handler: CommandHandler::Read(parser::hget),
    },
    CommandDef {
        name: "hmget",
        arity: -3,
        handler: CommandHandler::Read(parser::hmget),
    },
    CommandDef {
        name: "hgetall",
        arity: 2,
        handler: CommandHandler::Read(parser::hgetall),
    },
    CommandDef {
        name: "smembers",
        arity: 2,
        handler: CommandHandler::Read(parser::smembers),
    },
    CommandDef {
        name: "strlen",
        arity: 2,
        handler: CommandHandler::Read(parser::strlen),
    },
    CommandDef {
        name: "exists",
        arity: 2,
        handler: CommandHandler::Read(parser::exists),
    },
    CommandDef {
        name: "getrange",
        arity: 4,
        handler: CommandHandler::Read(parser::getrange),
    },
    CommandDef {
        name: "set",
        arity: -3,
        handler: CommandHandler::Write(parser::set),
    },
    CommandDef {
        name: "mset",
        arity: -3,
        handler: CommandHandler::Write(parser::mset),
    },
    CommandDef {
        name: "hset",
        arity: 4,
        handler: CommandHandler::Write(parser::hset),
    },
    CommandDef {
        name: "hmset",
        arity: -4,
        handler: CommandHandler::Write(parser::hmset),
    },
    CommandDef {
        name: "hdel",
        arity: -3,
        handler: CommandHandler::Write(parser::hdel),
    },
    CommandDef {
        name: "sadd",
        arity: -3,
        handler: CommandHandler::Write(parser::sadd),
    },
    CommandDef {
        name: "srem",
        arity: -3,
        handler: CommandHandler::Write(parser::srem),
    },
    CommandDef {
        name: "getset",
        arity: 3,
        handler: CommandHandler::Write(parser::getset),
    },
    CommandDef {
        name: "append",
        arity: 3,
        handler: CommandHandler::Write(parser::append),
    },
    CommandDef {
        name: "del",
        arity: 2,
        handler: CommandHandler::Write(parser::del),
    },
    CommandDef {
        name: "setrange",
        arity: 4,
        handler: CommandHandler::Write(parser::setrange),
    },
    CommandDef {
        name: "incr",
        arity: 2,
        handler: CommandHandler::Write(parser::incr),
    },
    CommandDef {
        name: "echo",
        arity: 2,
        handler: CommandHandler::Local(parser::echo),
    },
];
