//! sproc-dal - Main entry point.
//!
//! Calls one stored procedure and prints what it returned as JSON on
//! stdout. Logs go to stderr.

use clap::Parser;
use serde_json::{Value as JsonValue, json};
use sproc_dal::config::Config;
use sproc_dal::models::SlotMode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn run(config: &Config) -> Result<JsonValue, Box<dyn std::error::Error>> {
    let settings = config.connection_settings();
    info!(database = %settings.masked(), procedure = %config.procedure, "Calling procedure");

    let executor = sproc_dal::mysql_executor(settings);
    let params = config.param_bag();
    let procedure = config.procedure.as_str();

    let output = if config.execute {
        let affected = executor.execute_non_query(procedure, params).await?;
        json!({ "rows_affected": affected })
    } else if config.scalar {
        executor.execute_scalar::<JsonValue>(procedure, params).await?
    } else if let Some(shape) = config.result_shape()? {
        let sets = executor.read_multiple_shape(procedure, params, &shape).await?;
        serde_json::to_value(sets)?
    } else if config.shape.first() == Some(&SlotMode::Single) {
        json!(executor.query_single::<JsonValue>(procedure, params).await?)
    } else {
        json!(executor.query_many::<JsonValue>(procedure, params).await?)
    };

    Ok(output)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    init_tracing(&config);

    info!("Starting sproc-dal v{}", env!("CARGO_PKG_VERSION"));

    match run(&config).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Call failed");
            Err(e)
        }
    }
}
