//! Walkthrough - scripted tour of the prediction service client
//!
//! Fetches a remote model, runs a remote prediction, then predicts with a
//! local model, two local ensembles and a local anomaly detector, and prints
//! the last result to stdout. Logs go to stderr.

use anyhow::{Context, Result};
use bigml_lib::{pprint, BigML, SdkMetrics, StructuredLogger};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod script;

const WALKTHROUGH_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr so stdout only holds the printed result
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let config = config::WalkthroughConfig::load()?;
    let metrics = SdkMetrics::new();
    let logger = StructuredLogger::new(&config.domain);
    logger.log_startup(WALKTHROUGH_VERSION, config.dev_mode);

    let api = BigML::new(config.api_config())
        .await
        .context("Failed to create the service client")?;
    info!(base_url = %api.base_url(), "Client configured");

    let outcome = match script::run(&api, &logger).await {
        Ok(outcome) => outcome,
        Err(e) => {
            logger.log_failure(&format!("{:#}", e));
            return Err(e);
        }
    };

    pprint(&outcome);
    logger.log_summary(&metrics);

    Ok(())
}
