//! Command registry
//!
//! Maps lowercased command names to their descriptors: arity rule, kind,
//! latency metric handle, and the argument parser that turns RESP tokens
//! into a typed backend request.
//!
//! # Adding a new command
//!
//! 1. Write the parser in [`parser`] (`parser.rs`).
//! 2. Add one row to the `COMMANDS` table in `table.rs`: arity, name, and
//!    parser in a single entry. Kind and metric derive from the row; there is
//!    no second list to update.

pub(crate) mod parser;
mod table;

use std::collections::HashMap;

use metrics::Histogram;
use tracing::debug;

use crate::backend::{ReadRequest, WriteRequest};
use crate::call::RespCommand;
use crate::error::{PyriteError, Result};
use crate::metrics::DispatcherMetrics;
use crate::reply::Reply;

pub(crate) use table::COMMANDS;

/// What a command does: backend read, backend write, or answered locally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Reads backend state
    Read,
    /// Mutates backend state
    Write,
    /// Answered from the command's own arguments, no backend I/O
    Local,
}

/// Parser half of a command descriptor; the variant is the kind tag
pub(crate) enum CommandHandler {
    /// Parse into a read request
    Read(fn(&RespCommand) -> Result<ReadRequest>),
    /// Parse into a write request
    Write(fn(&RespCommand) -> Result<WriteRequest>),
    /// Build the response in-memory
    Local(fn(&RespCommand) -> Reply),
}

/// One row of the static command table
pub(crate) struct CommandDef {
    /// Lowercase command name
    pub name: &'static str,
    /// Arity rule, counting the command token: positive is exact, negative
    /// is a minimum (absolute value)
    pub arity: i32,
    /// Argument parser; its variant is the command's kind
    pub handler: CommandHandler,
}

/// A registered command: the table row plus its instantiated metric
pub struct RegistryEntry {
    pub(crate) def: &'static CommandDef,
    /// Per-command latency histogram
    pub(crate) metric: Histogram,
}

impl RegistryEntry {
    /// Lowercase command name
    pub fn name(&self) -> &'static str {
        self.def.name
    }

    /// The command's kind
    pub fn kind(&self) -> CommandKind {
        match self.def.handler {
            CommandHandler::Read(_) => CommandKind::Read,
            CommandHandler::Write(_) => CommandKind::Write,
            CommandHandler::Local(_) => CommandKind::Local,
        }
    }

    /// Validate the token count of one command against this entry's arity
    /// rule. `provided` includes the command token itself.
    pub fn check_arity(&self, provided: usize) -> Result<()> {
        let arity = self.def.arity;
        if arity >= 0 {
            if provided != arity as usize {
                return Err(PyriteError::WrongArity(self.def.name.to_string()));
            }
        } else if provided < arity.unsigned_abs() as usize {
            return Err(PyriteError::TooFewArguments(self.def.name.to_string()));
        }
        Ok(())
    }
}

/// Immutable name-to-descriptor map, built once per dispatcher
pub struct CommandRegistry {
    entries: HashMap<&'static str, RegistryEntry>,
}

impl CommandRegistry {
    /// Populate the registry from the static command table
    pub fn new() -> Self {
        let mut entries = HashMap::with_capacity(COMMANDS.len());
        for def in COMMANDS {
            entries.insert(
                def.name,
                RegistryEntry {
                    def,
                    metric: DispatcherMetrics::command(def.name),
                },
            );
        }
        debug!(commands = entries.len(), "command registry populated");
        Self { entries }
    }

    /// Look up the descriptor for a command-name token, case-insensitively
    pub fn lookup(&self, token: &[u8]) -> Option<&RegistryEntry> {
        let name = String::from_utf8_lossy(token).to_ascii_lowercase();
        self.entries.get(name.as_str())
    }

    /// Number of registered commands
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
