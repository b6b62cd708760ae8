//! Procedure execution engine.
//!
//! [`ProcedureExecutor`] is the public face of the data access layer. Every
//! operation follows the same path:
//!
//! 1. bind the call descriptor into a command
//! 2. take a fresh connection from the factory and open it
//! 3. put named arguments in the procedure's declared order
//! 4. issue the command and read the result sets it needs
//! 5. release the connection, whatever happened in steps 3 and 4
//! 6. decode into the caller's types
//!
//! There is no retry, caching or transaction wrapping at this layer. A
//! cancelled operation (its future dropped) releases its connection through
//! the session's `Drop`.

use crate::db::decode::{decode_optional, decode_rows, decode_scalar, first_column, scalar_to_i64};
use crate::db::driver::{Connector, Session};
use crate::db::factory::ConnectionFactory;
use crate::db::multiple::{FromResultSets, read_slots};
use crate::db::params::{bind, order_by_declared};
use crate::error::{DalError, DalResult};
use crate::models::{
    Command, CommandKind, JsonRow, Params, ProcedureCall, Shape, SlotData, SlotMode,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Executes stored procedures and decodes their result sets.
///
/// Holds nothing but the connection factory, so one executor can serve any
/// number of concurrent calls.
#[derive(Debug, Clone)]
pub struct ProcedureExecutor<C> {
    factory: ConnectionFactory<C>,
}

impl<C: Connector> ProcedureExecutor<C> {
    pub fn new(factory: ConnectionFactory<C>) -> Self {
        Self { factory }
    }

    // =========================================================================
    // Single result set
    // =========================================================================

    /// Execute a procedure and decode every row of its first result set.
    /// No rows gives an empty `Vec`.
    pub async fn query_many<T: DeserializeOwned>(
        &self,
        procedure: &str,
        params: Option<Params>,
    ) -> DalResult<Vec<T>> {
        let call = ProcedureCall::procedure(procedure).with_params(params);
        let rows = self.read_list(&call).await?;
        decode_rows(rows).map_err(|e| DalError::decode(procedure, 0, e))
    }

    /// Execute a procedure and decode the first row of its first result set.
    /// No rows gives `None`.
    pub async fn query_single<T: DeserializeOwned>(
        &self,
        procedure: &str,
        params: Option<Params>,
    ) -> DalResult<Option<T>> {
        let call = ProcedureCall::procedure(procedure).with_params(params);
        let row = self.read_single(&call).await?;
        decode_optional(row).map_err(|e| DalError::decode(procedure, 0, e))
    }

    /// Read one page of rows and the total record count.
    ///
    /// The statement is issued as text with positional arguments. Its first
    /// result set holds the page, the first column of the second holds the
    /// total; a missing total reads as zero.
    ///
    /// With parameters the text is prepared, so it must be one statement
    /// that emits both sets, typically `CALL usp_Page(?, ?)`. A batch of
    /// several statements is rejected as invalid input. Without parameters
    /// a batch is sent as-is.
    pub async fn query_paged<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: Option<Params>,
    ) -> DalResult<(Vec<T>, i64)> {
        let call = ProcedureCall::text(sql).with_params(params);
        let mut slots = self
            .read_sets(&call, &[SlotMode::List, SlotMode::Single], false)
            .await?
            .into_iter();

        let data = match slots.next() {
            Some(SlotData::List(rows)) => decode_rows(rows).map_err(|e| DalError::decode(sql, 0, e))?,
            _ => Vec::new(),
        };
        let total = match slots.next() {
            Some(SlotData::Single(row)) => {
                scalar_to_i64(first_column(row)).map_err(|e| DalError::decode(sql, 1, e))?
            }
            _ => 0,
        };
        Ok((data, total))
    }

    // =========================================================================
    // Scalars and non-queries
    // =========================================================================

    /// Execute a procedure for its side effects and return the affected rows.
    pub async fn execute_non_query(&self, procedure: &str, params: Option<Params>) -> DalResult<u64> {
        let call = ProcedureCall::procedure(procedure).with_params(params);
        let mut command = bind(&call)?;
        log_call(&command, 0, false);

        let mut session = self.open().await?;
        let outcome = execute_command(&mut session, &mut command).await;
        release(session, &command.procedure).await;

        let affected = outcome.map_err(|e| e.with_procedure(&command.procedure))?;
        debug!(procedure = %command.procedure, rows_affected = affected, "Call completed");
        Ok(affected)
    }

    /// Execute a procedure and decode the first column of the first row as
    /// an integer. NULL or no rows gives zero.
    pub async fn execute_scalar_int(&self, procedure: &str, params: Option<Params>) -> DalResult<i64> {
        let call = ProcedureCall::procedure(procedure).with_params(params);
        let row = self.read_single(&call).await?;
        scalar_to_i64(first_column(row)).map_err(|e| DalError::decode(procedure, 0, e))
    }

    /// Decode the first column of the first row as `T`. NULL or no rows
    /// gives `T::default()`.
    ///
    /// With `params` set this is a stored-procedure call. With `None`, `sql`
    /// is sent as a raw statement instead. Existing callers depend on the
    /// raw-statement behavior, so the two paths are kept apart.
    pub async fn execute_scalar<T: DeserializeOwned + Default>(
        &self,
        sql: &str,
        params: Option<Params>,
    ) -> DalResult<T> {
        let call = match params {
            Some(params) => ProcedureCall::procedure(sql).with_params(params),
            None => ProcedureCall::text(sql),
        };
        let row = self.read_single(&call).await?;
        decode_scalar(first_column(row)).map_err(|e| DalError::decode(sql, 0, e))
    }

    // =========================================================================
    // Multiple result sets
    // =========================================================================

    /// Read consecutive result sets into a typed tuple.
    ///
    /// ```ignore
    /// let (user, roles): Guarded2<User, Role> =
    ///     executor.read_multiple("usp_GetUserWithRoles", Some(params)).await?;
    /// ```
    ///
    /// When the tuple starts with an `Option` and that first row is absent,
    /// the rest of the tuple is empty and no further result sets are read.
    pub async fn read_multiple<R: FromResultSets>(
        &self,
        procedure: &str,
        params: Option<Params>,
    ) -> DalResult<R> {
        let shape = R::shape()?;
        let slots = self.read_multiple_shape(procedure, params, &shape).await?;
        R::from_slots(slots).map_err(|(slot, e)| DalError::decode(procedure, slot, e))
    }

    /// Read consecutive result sets as described by `shape`, undecoded.
    pub async fn read_multiple_shape(
        &self,
        procedure: &str,
        params: Option<Params>,
        shape: &Shape,
    ) -> DalResult<Vec<SlotData>> {
        let call = ProcedureCall::procedure(procedure).with_params(params);
        self.read_sets(&call, shape.slots(), shape.is_guarded()).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn read_list(&self, call: &ProcedureCall) -> DalResult<Vec<JsonRow>> {
        match self.read_sets(call, &[SlotMode::List], false).await?.pop() {
            Some(SlotData::List(rows)) => Ok(rows),
            _ => Ok(Vec::new()),
        }
    }

    async fn read_single(&self, call: &ProcedureCall) -> DalResult<Option<JsonRow>> {
        match self.read_sets(call, &[SlotMode::Single], false).await?.pop() {
            Some(SlotData::Single(row)) => Ok(row),
            _ => Ok(None),
        }
    }

    /// Open, call, read, release. The connection is released on every path
    /// out of the read, including the guard short-circuit and errors.
    async fn read_sets(
        &self,
        call: &ProcedureCall,
        slots: &[SlotMode],
        guarded: bool,
    ) -> DalResult<Vec<SlotData>> {
        let mut command = bind(call)?;
        log_call(&command, slots.len(), guarded);

        let mut session = self.open().await?;
        let outcome = call_and_read(&mut session, &mut command, slots, guarded).await;
        release(session, &command.procedure).await;

        let sets = outcome.map_err(|e| e.with_procedure(&command.procedure))?;
        debug!(
            procedure = %command.procedure,
            rows = sets.iter().map(SlotData::row_count).sum::<usize>(),
            "Call completed"
        );
        Ok(sets)
    }

    async fn open(&self) -> DalResult<C::Session> {
        self.factory.new_connection().open().await
    }
}

/// Procedure arguments bind by name: look up the declared order on the
/// call's own connection and rearrange the positional arguments to match.
async fn arrange_args<S: Session>(session: &mut S, command: &mut Command) -> DalResult<()> {
    if command.kind == CommandKind::StoredProcedure && command.has_args() {
        let declared = session.parameter_names(&command.procedure).await?;
        if declared.is_empty() {
            debug!(
                procedure = %command.procedure,
                "No parameter metadata, binding in bag order"
            );
        }
        order_by_declared(command, &declared);
    }
    Ok(())
}

async fn call_and_read<S: Session>(
    session: &mut S,
    command: &mut Command,
    slots: &[SlotMode],
    guarded: bool,
) -> DalResult<Vec<SlotData>> {
    arrange_args(session, command).await?;
    let mut cursor = session.call(command).await?;
    read_slots(&mut cursor, slots, guarded).await
}

async fn execute_command<S: Session>(session: &mut S, command: &mut Command) -> DalResult<u64> {
    arrange_args(session, command).await?;
    session.execute(command).await
}

async fn release<S: Session>(session: S, procedure: &str) {
    if let Err(e) = session.close().await {
        warn!(procedure = %procedure, error = %e, "Failed to release connection");
    }
}

fn log_call(command: &Command, sets: usize, guarded: bool) {
    debug!(
        procedure = %command.procedure,
        kind = %command.kind,
        params = command.args.len(),
        sets,
        guarded,
        "Executing call"
    );
}
