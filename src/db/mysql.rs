//! MySQL driver built on sqlx.
//!
//! Each session wraps one `MySqlConnection`; no pool is kept. Result sets
//! are split on the `Either::Left` marker sqlx yields at the end of every
//! set, so one `CALL` can be read set by set in server order.

use crate::db::driver::{Connector, ResultSetCursor, Session};
use crate::db::params::bind_mysql_param;
use crate::db::types::RowToJson;
use crate::error::{DalError, DalResult};
use crate::models::{Command, JsonRow};
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;
use sqlx::mysql::{MySqlConnectOptions, MySqlQueryResult, MySqlRow};
use sqlx::{Connection, Either, Executor, MySqlConnection};
use std::str::FromStr;
use tracing::debug;

/// Check whether a connection string targets MySQL or MariaDB.
pub fn is_mysql_url(connection_string: &str) -> bool {
    let lower = connection_string.to_lowercase();
    lower.starts_with("mysql://") || lower.starts_with("mariadb://")
}

/// Opens one `MySqlConnection` per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

impl Connector for MySqlConnector {
    type Session = MySqlSession;

    async fn connect(&self, connection_string: &str) -> DalResult<MySqlSession> {
        if !is_mysql_url(connection_string) {
            return Err(DalError::connection(
                "Unsupported connection string scheme",
                "Use a mysql:// or mariadb:// URL",
            ));
        }

        // sqlx only understands the mysql scheme
        let normalized = match connection_string.get(..10) {
            Some(prefix) if prefix.eq_ignore_ascii_case("mariadb://") => {
                format!("mysql://{}", &connection_string[10..])
            }
            _ => connection_string.to_string(),
        };

        let options = MySqlConnectOptions::from_str(&normalized)?;
        // Server-side rejections at handshake (bad credentials, unknown
        // database) are connection failures, not call failures
        let conn = MySqlConnection::connect_with(&options)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db_err) => DalError::connection(
                    db_err.message(),
                    "Check the credentials and database name in the connection string",
                ),
                other => DalError::from(other),
            })?;
        debug!("MySQL connection opened");
        Ok(MySqlSession { conn })
    }
}

/// One open MySQL connection. Dropping it closes the socket.
pub struct MySqlSession {
    conn: MySqlConnection,
}

impl std::fmt::Debug for MySqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlSession").finish_non_exhaustive()
    }
}

impl Session for MySqlSession {
    type Cursor<'s> = MySqlCursor<'s>;

    async fn call<'s>(&'s mut self, command: &'s Command) -> DalResult<MySqlCursor<'s>> {
        // Without arguments the statement goes over the text protocol
        let stream = if command.has_args() {
            let mut query = sqlx::query(&command.sql);
            for arg in &command.args {
                query = bind_mysql_param(query, arg);
            }
            self.conn.fetch_many(query)
        } else {
            self.conn.fetch_many(command.sql.as_str())
        };

        Ok(MySqlCursor {
            stream,
            exhausted: false,
        })
    }

    async fn parameter_names(&mut self, procedure: &str) -> DalResult<Vec<String>> {
        let (schema, name) = match procedure.split_once('.') {
            Some((schema, name)) => (Some(schema), name),
            None => (None, procedure),
        };

        // information_schema text may carry a binary collation on MySQL 8
        let names: Vec<Option<String>> = sqlx::query_scalar(
            "SELECT CONVERT(PARAMETER_NAME USING utf8mb4) \
             FROM information_schema.PARAMETERS \
             WHERE SPECIFIC_SCHEMA = COALESCE(?, DATABASE()) \
               AND SPECIFIC_NAME = ? \
               AND ROUTINE_TYPE = 'PROCEDURE' \
               AND ORDINAL_POSITION > 0 \
             ORDER BY ORDINAL_POSITION",
        )
        .bind(schema)
        .bind(name)
        .fetch_all(&mut self.conn)
        .await?;

        Ok(names.into_iter().flatten().collect())
    }

    async fn execute(&mut self, command: &Command) -> DalResult<u64> {
        let result = if command.has_args() {
            let mut query = sqlx::query(&command.sql);
            for arg in &command.args {
                query = bind_mysql_param(query, arg);
            }
            query.execute(&mut self.conn).await?
        } else {
            self.conn.execute(command.sql.as_str()).await?
        };
        Ok(result.rows_affected())
    }

    async fn close(self) -> DalResult<()> {
        self.conn.close().await?;
        debug!("MySQL connection closed");
        Ok(())
    }
}

type ResultStream<'s> = BoxStream<'s, Result<Either<MySqlQueryResult, MySqlRow>, sqlx::Error>>;

/// Reads the result sets of one command.
pub struct MySqlCursor<'s> {
    stream: ResultStream<'s>,
    exhausted: bool,
}

impl ResultSetCursor for MySqlCursor<'_> {
    async fn next_set(&mut self) -> DalResult<Option<Vec<JsonRow>>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut rows = Vec::new();
        while let Some(item) = self.stream.try_next().await? {
            match item {
                Either::Right(row) => rows.push(row.to_json_row()?),
                Either::Left(_) => return Ok(Some(rows)),
            }
        }

        self.exhausted = true;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows))
        }
    }
}
