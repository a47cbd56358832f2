//! BigML CLI
//!
//! A command-line tool for managing resources on the prediction service
//! and for running remote or local predictions against them.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use bigml_lib::{BigML, ListQuery, ResourceKind};
use clap::{Parser, Subcommand};
use commands::predictions::{self, MethodArg, StrategyArg};
use commands::resources;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// BigML CLI
#[derive(Parser)]
#[command(name = "bigml")]
#[command(author, version, about = "CLI for the BigML prediction service", long_about = None)]
pub struct Cli {
    /// Use the development environment
    #[arg(long)]
    pub dev_mode: bool,

    /// Account name (can also be set via BIGML_USERNAME env var)
    #[arg(long, env = "BIGML_USERNAME")]
    pub username: Option<String>,

    /// API key (can also be set via BIGML_API_KEY env var)
    #[arg(long, env = "BIGML_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Service domain
    #[arg(long, env = "BIGML_DOMAIN")]
    pub domain: Option<String>,

    /// Directory where fetched resources are kept
    #[arg(long, env = "BIGML_STORAGE")]
    pub storage: Option<String>,

    /// Output format (defaults to the config file's, then table)
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a resource
    Get {
        /// Resource ID, e.g. model/563a1c7a3cd25747430023ce
        id: String,
    },

    /// List resources of one kind
    List {
        /// Resource kind (source, dataset, model, ensemble, anomaly, cluster, ...)
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,

        /// Only resources whose name contains this text
        #[arg(long)]
        name: Option<String>,

        /// Number of resources to skip
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Maximum number of resources to show
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Rename a resource
    Rename {
        /// Resource ID
        id: String,

        /// New name
        name: String,
    },

    /// Delete a resource
    Delete {
        /// Resource ID
        id: String,
    },

    /// Predict with a model
    Predict {
        /// Model ID
        model: String,

        /// Input data as a JSON object keyed by field name
        #[arg(long, short)]
        input: String,

        /// Create the prediction on the service instead of locally
        #[arg(long)]
        remote: bool,

        /// Show up to this many categories of the predicted node
        #[arg(long, conflicts_with = "remote")]
        multiple: Option<usize>,

        /// How to handle fields missing from the input
        #[arg(long, value_enum, default_value_t = StrategyArg::Last)]
        strategy: StrategyArg,
    },

    /// Predict locally with an ensemble
    Ensemble {
        /// Ensemble ID
        ensemble: String,

        /// Input data as a JSON object keyed by field name
        #[arg(long, short)]
        input: String,

        /// How the models' votes are combined
        #[arg(long, value_enum, default_value_t = MethodArg::Plurality)]
        method: MethodArg,

        /// Predict --category only when at least this many models vote for it
        #[arg(
            long,
            requires = "category",
            conflicts_with = "method",
            value_parser = parse_threshold
        )]
        threshold: Option<usize>,

        /// Category checked by --threshold
        #[arg(long, requires = "threshold")]
        category: Option<String>,
    },

    /// Score how anomalous an input is
    Anomaly {
        /// Anomaly detector ID
        anomaly: String,

        /// Input data as a JSON object keyed by field name
        #[arg(long, short)]
        input: String,

        /// Create the score on the service instead of locally
        #[arg(long)]
        remote: bool,
    },

    /// Find the cluster centroid closest to an input
    Centroid {
        /// Cluster ID
        cluster: String,

        /// Input data as a JSON object keyed by field name
        #[arg(long, short)]
        input: String,

        /// Create the centroid on the service instead of locally
        #[arg(long)]
        remote: bool,
    },
}

fn parse_kind(kind: &str) -> std::result::Result<ResourceKind, String> {
    kind.parse()
        .map_err(|_| format!("unknown resource kind '{}'", kind))
}

fn parse_threshold(k: &str) -> std::result::Result<usize, String> {
    match k.parse::<usize>() {
        Ok(0) => Err("threshold must be at least 1".to_string()),
        Ok(k) => Ok(k),
        Err(e) => Err(e.to_string()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }

    let file = config::Config::load()?;
    let format = cli
        .format
        .unwrap_or_else(|| output::OutputFormat::from_config(file.default_format.as_deref()));
    let api_config = file.api_config(config::Overrides {
        username: cli.username,
        api_key: cli.api_key,
        domain: cli.domain,
        storage: cli.storage,
        dev_mode: cli.dev_mode,
    });

    // Initialize client
    let api = BigML::new(api_config)
        .await
        .context("Failed to create the service client (set BIGML_USERNAME and BIGML_API_KEY)")?;

    // Execute command
    match cli.command {
        Commands::Get { id } => {
            resources::get_resource(&api, &id, format).await?;
        }
        Commands::List {
            kind,
            name,
            offset,
            limit,
        } => {
            let query = ListQuery { name, offset, limit };
            resources::list_resources(&api, kind, query, format).await?;
        }
        Commands::Rename { id, name } => {
            resources::rename_resource(&api, &id, &name, format).await?;
        }
        Commands::Delete { id } => {
            resources::delete_resource(&api, &id).await?;
        }
        Commands::Predict {
            model,
            input,
            remote,
            multiple,
            strategy,
        } => {
            predictions::predict(&api, &model, &input, remote, multiple, strategy, format).await?;
        }
        Commands::Ensemble {
            ensemble,
            input,
            method,
            threshold,
            category,
        } => {
            let threshold = threshold.zip(category);
            predictions::predict_ensemble(&api, &ensemble, &input, method, threshold, format)
                .await?;
        }
        Commands::Anomaly {
            anomaly,
            input,
            remote,
        } => {
            predictions::anomaly_score(&api, &anomaly, &input, remote, format).await?;
        }
        Commands::Centroid {
            cluster,
            input,
            remote,
        } => {
            predictions::centroid(&api, &cluster, &input, remote, format).await?;
        }
    }

    Ok(())
}
