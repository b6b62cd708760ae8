//! Parameter binding.
//!
//! Turns a [`ProcedureCall`] into the [`Command`] the driver executes, and
//! marshals [`ParamValue`]s onto sqlx MySQL queries. MySQL's `CALL` only
//! takes positional arguments, so the bag is first bound in insertion order
//! and then, once a connection is open, rearranged into the procedure's
//! declared parameter order with [`order_by_declared`].

use crate::error::{DalError, DalResult};
use crate::models::{Command, CommandKind, ParamValue, ProcedureCall};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::types::Json;

/// Bind a call descriptor into an executable command.
pub fn bind(call: &ProcedureCall) -> DalResult<Command> {
    let (names, args): (Vec<String>, Vec<ParamValue>) = match &call.params {
        Some(params) => (
            params.names().map(str::to_string).collect(),
            params.values().cloned().collect(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    let sql = match call.kind {
        CommandKind::StoredProcedure => {
            validate_identifier(&call.name)?;
            let placeholders = vec!["?"; args.len()].join(", ");
            format!("CALL {}({})", call.name, placeholders)
        }
        CommandKind::Text => {
            if call.name.trim().is_empty() {
                return Err(DalError::invalid_input("Statement text is empty"));
            }
            if !args.is_empty() {
                ensure_single_statement(&call.name)?;
            }
            call.name.clone()
        }
    };

    Ok(Command {
        procedure: call.name.clone(),
        kind: call.kind,
        sql,
        names,
        args,
    })
}

/// Rearrange a command's arguments into the procedure's declared order.
///
/// Names match case-insensitively and a leading `@` is ignored. Names the
/// procedure does not declare keep their bag order after the declared ones
/// and go to the server as they are. An empty `declared` list leaves the
/// bag order untouched.
pub fn order_by_declared(command: &mut Command, declared: &[String]) {
    if declared.is_empty() || command.args.is_empty() {
        return;
    }

    let ordinal = |name: &str| {
        let name = name.trim_start_matches('@');
        declared
            .iter()
            .position(|d| d.eq_ignore_ascii_case(name))
            .unwrap_or(usize::MAX)
    };

    let mut entries: Vec<(usize, String, ParamValue)> = command
        .names
        .drain(..)
        .zip(command.args.drain(..))
        .map(|(name, value)| (ordinal(&name), name, value))
        .collect();
    entries.sort_by_key(|(ordinal, _, _)| *ordinal);

    for (_, name, value) in entries {
        command.names.push(name);
        command.args.push(value);
    }
}

/// Prepared statements hold exactly one statement on MySQL, so text that
/// carries arguments must not be a batch. Text the parser cannot read is
/// left for the server to judge.
fn ensure_single_statement(sql: &str) -> DalResult<()> {
    match Parser::parse_sql(&MySqlDialect {}, sql) {
        Ok(statements) if statements.len() > 1 => Err(DalError::invalid_input(format!(
            "Statement text with parameters must be a single statement, got {}",
            statements.len()
        ))),
        _ => Ok(()),
    }
}

/// Accept `name` or `schema.name`, each segment made of `[A-Za-z0-9_$]`.
fn validate_identifier(name: &str) -> DalResult<()> {
    let segments: Vec<&str> = name.split('.').collect();
    let valid = segments.len() <= 2
        && segments.iter().all(|s| {
            !s.is_empty()
                && !s.starts_with(|c: char| c.is_ascii_digit())
                && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        });

    if valid {
        Ok(())
    } else {
        Err(DalError::invalid_input(format!(
            "'{}' is not a valid procedure identifier",
            name
        )))
    }
}

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q ParamValue,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        ParamValue::Null => query.bind(None::<String>),
        ParamValue::Bool(v) => query.bind(*v),
        ParamValue::Int(v) => query.bind(*v),
        ParamValue::Float(v) => query.bind(*v),
        ParamValue::String(v) => query.bind(v.as_str()),
        ParamValue::Bytes(v) => query.bind(v.as_slice()),
        ParamValue::Json(v) => query.bind(Json(v)),
    }
}
