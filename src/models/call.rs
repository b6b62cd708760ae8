//! Call descriptors and the bound commands sent to the driver.

use crate::models::params::{ParamValue, Params};
use std::fmt;

/// How a command is issued to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Invocation of a stored procedure by name.
    StoredProcedure,
    /// Statement text sent as-is.
    Text,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoredProcedure => write!(f, "procedure"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// What the caller asked for: a procedure (or statement) and its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    pub name: String,
    /// `None` means the call carries no inputs at all.
    pub params: Option<Params>,
    pub kind: CommandKind,
}

impl ProcedureCall {
    /// A stored-procedure call without parameters.
    pub fn procedure(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: None,
            kind: CommandKind::StoredProcedure,
        }
    }

    /// Raw statement text.
    pub fn text(sql: impl Into<String>) -> Self {
        Self {
            name: sql.into(),
            params: None,
            kind: CommandKind::Text,
        }
    }

    pub fn with_params(mut self, params: impl Into<Option<Params>>) -> Self {
        self.params = params.into();
        self
    }
}

/// A call after binding: the statement the driver executes plus its
/// positional arguments. `names[i]` is the bag name of `args[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Procedure name or statement text, for error context.
    pub procedure: String,
    pub kind: CommandKind,
    /// Statement text handed to the driver.
    pub sql: String,
    pub names: Vec<String>,
    pub args: Vec<ParamValue>,
}

impl Command {
    pub fn has_args(&self) -> bool {
        !self.args.is_empty()
    }
}
