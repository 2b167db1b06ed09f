//! uses-connection - Main entry point.
//!
//! Loads per-model connection declarations, binds each model for the current
//! environment, and prints the resulting bindings as JSON.

use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uses_connection::config::Config;
use uses_connection::db::{ConnectionRegistry, ModelConnection};
use uses_connection::models::Bindings;
use uses_connection::selector::{self, Outcome, SelectorContext};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries the report.
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

#[derive(Debug, Serialize)]
struct ModelReport {
    model: String,
    /// Connection the model uses after its declaration ran.
    connection: String,
    outcome: Outcome,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    init_tracing(&config);

    let environment = config.environment()?;
    info!(
        environment = %environment,
        "Starting uses-connection v{}",
        env!("CARGO_PKG_VERSION")
    );

    let registry = Arc::new(ConnectionRegistry::from_database_configs(
        config.parse_databases()?,
    )?);
    info!(count = registry.len(), "Loaded connection profiles");

    let bindings = Bindings::load(&config.bindings).await?;
    info!(
        count = bindings.len(),
        path = %config.bindings.display(),
        "Loaded model declarations"
    );

    let ctx = SelectorContext::new(environment);
    let mut reports = Vec::with_capacity(bindings.len());
    let mut handles = Vec::with_capacity(bindings.len());

    for decl in &bindings.models {
        let mut handle = ModelConnection::new(
            decl.model.as_str(),
            Arc::clone(&registry),
            config.default_connection.as_str(),
        );

        let outcome = match selector::apply(&ctx, &mut handle, &decl.uses).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(model = %decl.model, error = %e, "Model loading aborted");
                close_all(&mut handles).await;
                return Err(e.into());
            }
        };

        reports.push(ModelReport {
            model: decl.model.clone(),
            connection: handle.connection_name().to_string(),
            outcome,
        });
        handles.push(handle);
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);

    close_all(&mut handles).await;
    info!("All model connections closed");
    Ok(())
}

async fn close_all(handles: &mut [ModelConnection]) {
    for handle in handles.iter_mut() {
        handle.close().await;
    }
}
