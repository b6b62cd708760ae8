//! Configuration handling.
//!
//! [`ConnectionSettings`] is the only configuration the data access layer
//! itself needs: an opaque connection string, injected once and never
//! mutated. [`Config`] is the command-line surface of the `sproc-dal`
//! binary, read from arguments and environment variables.

use crate::models::{ParamValue, Params, Shape, SlotMode};
use clap::Parser;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Connection string holder, bound from whatever configuration source the
/// host application uses.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Contains credentials - never log
    pub connection_string: String,
}

impl ConnectionSettings {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
        }
    }

    /// Display-safe version of the connection string (password masked).
    pub fn masked(&self) -> String {
        match Url::parse(&self.connection_string) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("****"));
                }
                url.to_string()
            }
            Err(_) => "<unparseable connection string>".to_string(),
        }
    }
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("connection_string", &self.masked())
            .finish()
    }
}

/// Configuration for the `sproc-dal` command-line tool.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sproc-dal",
    about = "Call a stored procedure and print its result sets as JSON",
    version,
    author
)]
pub struct Config {
    /// Database connection string (mysql:// or mariadb://)
    #[arg(long = "database-url", value_name = "URL", env = "DATABASE_URL")]
    pub database_url: String,

    /// Procedure name; statement text with --scalar and no --param
    #[arg(value_name = "PROCEDURE")]
    pub procedure: String,

    /// Procedure parameter as name=value. Repeat for more; order is kept.
    #[arg(short, long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, ParamValue)>,

    /// Comma-separated result-set shape, e.g. "single,list,list"
    #[arg(long, value_name = "SLOTS", value_delimiter = ',')]
    pub shape: Vec<SlotMode>,

    /// Read every result set of --shape, even when the first is empty
    #[arg(long, requires = "shape")]
    pub unguarded: bool,

    /// Print only the first column of the first row
    #[arg(long, conflicts_with_all = ["shape", "execute"])]
    pub scalar: bool,

    /// Print the affected row count instead of rows
    #[arg(long, conflicts_with = "shape")]
    pub execute: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "SPROC_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "SPROC_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings::new(&self.database_url)
    }

    /// Parameters, or `None` when none were given on the command line.
    pub fn param_bag(&self) -> Option<Params> {
        if self.params.is_empty() {
            None
        } else {
            Some(self.params.iter().cloned().collect())
        }
    }

    /// The multi-result shape, when `--shape` lists more than one slot.
    pub fn result_shape(&self) -> Result<Option<Shape>, String> {
        match self.shape.len() {
            0 | 1 => Ok(None),
            _ if self.unguarded => Shape::unguarded(self.shape.clone()).map(Some),
            _ => Shape::guarded(self.shape.clone()).map(Some),
        }
    }
}

fn parse_param(s: &str) -> Result<(String, ParamValue), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("parameter name is empty".to_string());
    }
    Ok((name.to_string(), ParamValue::infer(value)))
}
