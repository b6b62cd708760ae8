//! Database access layer.
//!
//! This module provides:
//! - The driver seam (`Connector`, `Session`, `ResultSetCursor`)
//! - Connection factory handing out one connection per call
//! - Parameter binding and MySQL argument marshaling
//! - Row materialization and typed decoding
//! - Single-result, scalar and multi-result-set execution

pub mod decode;
pub mod driver;
pub mod executor;
pub mod factory;
pub mod multiple;
pub mod mysql;
pub mod params;
pub mod types;

pub use driver::{Connector, ResultSetCursor, Session};
pub use executor::ProcedureExecutor;
pub use factory::{ConnectionFactory, ConnectionHandle};
pub use multiple::{
    FromResultSets, Guarded2, Guarded3, Guarded4, Guarded5, Guarded6, Guarded7, Lists6,
    ResultSlot,
};
pub use mysql::{MySqlConnector, MySqlSession};
