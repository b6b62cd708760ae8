//! Driver seam between the executors and a concrete database client.
//!
//! The executors only ever see these three traits. [`crate::db::mysql`]
//! implements them with sqlx; tests implement them with scripted result
//! sets so result-set advances and connection releases can be counted.

use crate::error::DalResult;
use crate::models::{Command, JsonRow};
use std::future::Future;

/// Opens physical connections.
pub trait Connector: Send + Sync {
    type Session: Session;

    /// Open one connection. Never pooled at this layer.
    fn connect(
        &self,
        connection_string: &str,
    ) -> impl Future<Output = DalResult<Self::Session>> + Send;
}

/// One open connection, owned by exactly one in-flight call.
///
/// Dropping a session without calling [`Session::close`] must still release
/// the connection; that is the path a cancelled call takes.
pub trait Session: Send {
    type Cursor<'s>: ResultSetCursor + Send
    where
        Self: 's;

    /// Issue a command and return a cursor over its result sets.
    fn call<'s>(
        &'s mut self,
        command: &'s Command,
    ) -> impl Future<Output = DalResult<Self::Cursor<'s>>> + Send;

    /// Declared parameter names of a stored procedure, in ordinal order.
    /// Empty when the procedure's metadata is not visible on this connection.
    fn parameter_names(
        &mut self,
        procedure: &str,
    ) -> impl Future<Output = DalResult<Vec<String>>> + Send;

    /// Issue a command and return the number of affected rows.
    fn execute(&mut self, command: &Command) -> impl Future<Output = DalResult<u64>> + Send;

    /// Release the connection.
    fn close(self) -> impl Future<Output = DalResult<()>> + Send;
}

/// Sequential access to the result sets of one command.
pub trait ResultSetCursor {
    /// Read the next result set in full, or `None` once the server has no
    /// more sets. Each call is one advance.
    fn next_set(&mut self) -> impl Future<Output = DalResult<Option<Vec<JsonRow>>>> + Send;
}
