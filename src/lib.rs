//! Stored-procedure data access layer.
//!
//! Executes parameterized stored-procedure calls and decodes one or more
//! sequential result sets into typed, position-correlated results. Each
//! call opens its own connection and releases it before returning.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::{Config, ConnectionSettings};
pub use db::{ConnectionFactory, MySqlConnector, ProcedureExecutor};
pub use error::{DalError, DalResult};
pub use models::{ParamValue, Params, Shape, SlotData, SlotMode};

/// Executor wired to the sqlx MySQL driver.
pub type MySqlExecutor = ProcedureExecutor<MySqlConnector>;

/// Build a MySQL executor from injected connection settings.
pub fn mysql_executor(settings: ConnectionSettings) -> MySqlExecutor {
    ProcedureExecutor::new(ConnectionFactory::new(settings, MySqlConnector))
}
