//! Remote and local prediction commands

use anyhow::{Context, Result};
use bigml_lib::model::CategoryPrediction;
use bigml_lib::{
    BigML, EnsembleOptions, InputData, MissingStrategy, Outcome, PredictOptions, Prediction,
    PredictionMethod, ResourceId, ResourceKind,
};
use clap::ValueEnum;
use serde::Serialize;
use tabled::Tabled;
use tracing::debug;

use crate::output::{color_score, format_confidence, print_json, print_table, OutputFormat};

/// Missing-field strategy of local model predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, ValueEnum)]
pub enum StrategyArg {
    /// Stop at the last node reached
    #[default]
    Last,
    /// Follow every branch and merge the leaves
    Proportional,
}

impl From<StrategyArg> for MissingStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Last => MissingStrategy::LastPrediction,
            StrategyArg::Proportional => MissingStrategy::Proportional,
        }
    }
}

/// Vote combination method of ensemble predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, ValueEnum)]
pub enum MethodArg {
    #[default]
    Plurality,
    Confidence,
    Probability,
}

impl From<MethodArg> for PredictionMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Plurality => PredictionMethod::Plurality,
            MethodArg::Confidence => PredictionMethod::Confidence,
            MethodArg::Probability => PredictionMethod::Probability,
        }
    }
}

/// Row for single predictions
#[derive(Tabled, Serialize)]
struct PredictionRow {
    #[tabled(rename = "Prediction")]
    prediction: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Probability")]
    probability: String,
    #[tabled(rename = "Count")]
    count: u64,
}

impl From<&Prediction> for PredictionRow {
    fn from(p: &Prediction) -> Self {
        Self {
            prediction: p.prediction.to_string(),
            confidence: format_confidence(p.confidence),
            probability: format_confidence(p.probability),
            count: p.count,
        }
    }
}

impl From<&CategoryPrediction> for PredictionRow {
    fn from(c: &CategoryPrediction) -> Self {
        Self {
            prediction: c.prediction.clone(),
            confidence: format_confidence(Some(c.confidence)),
            probability: format_confidence(Some(c.probability)),
            count: c.count,
        }
    }
}

/// Parse `--input` as a JSON object of field values
pub fn parse_input(json: &str) -> Result<InputData> {
    serde_json::from_str(json).context("--input must be a JSON object of numbers and strings")
}

fn print_outcome(outcome: &Outcome, format: OutputFormat) {
    match (format, outcome) {
        (OutputFormat::Json, _) => print_json(outcome),
        (_, Outcome::Prediction(p)) => {
            print_table(&[PredictionRow::from(p)], format, "predictions")
        }
        (_, Outcome::Distribution(categories)) => {
            let rows: Vec<PredictionRow> = categories.iter().map(PredictionRow::from).collect();
            print_table(&rows, format, "categories");
        }
        (_, Outcome::Score(score)) => println!("Anomaly score: {}", color_score(*score)),
        (_, other) => println!("{}", other),
    }
}

/// Predict with a model, locally unless `remote` is set
pub async fn predict(
    api: &BigML,
    model_id: &str,
    input: &str,
    remote: bool,
    multiple: Option<usize>,
    strategy: StrategyArg,
    format: OutputFormat,
) -> Result<()> {
    let input = parse_input(input)?;

    let outcome = if remote {
        let model = api
            .get_model(model_id)
            .await
            .with_context(|| format!("Failed to fetch {}", model_id))?;
        Outcome::from(
            api.create_prediction(&model, &input)
                .await
                .context("Remote prediction failed")?,
        )
    } else {
        let model = api
            .local_model(model_id)
            .await
            .with_context(|| format!("Failed to build local model {}", model_id))?;
        let mut options = PredictOptions::default()
            .with_confidence()
            .with_strategy(strategy.into());
        if let Some(n) = multiple {
            options = options.with_multiple(n);
        }
        debug!(?options, "Local model prediction");
        model.predict(&input, &options).context("Local model prediction failed")?
    };

    print_outcome(&outcome, format);
    Ok(())
}

/// Predict with an ensemble's models and combine their votes
pub async fn predict_ensemble(
    api: &BigML,
    ensemble_id: &str,
    input: &str,
    method: MethodArg,
    threshold: Option<(usize, String)>,
    format: OutputFormat,
) -> Result<()> {
    let input = parse_input(input)?;
    let ensemble = api
        .local_ensemble(ensemble_id)
        .await
        .with_context(|| format!("Failed to build local ensemble {}", ensemble_id))?;

    let mut options = EnsembleOptions::default().with_confidence();
    options = match threshold {
        Some((k, category)) => options.with_threshold(k, category),
        None => options.with_method(method.into()),
    };
    debug!(models = ensemble.models().len(), ?options, "Local ensemble prediction");

    let outcome = ensemble
        .predict(&input, &options)
        .context("Local ensemble prediction failed")?;
    print_outcome(&outcome, format);
    Ok(())
}

/// Score the anomalousness of an input
pub async fn anomaly_score(
    api: &BigML,
    anomaly_id: &str,
    input: &str,
    remote: bool,
    format: OutputFormat,
) -> Result<()> {
    let input = parse_input(input)?;

    let outcome = if remote {
        let id = ResourceId::parse_kind(anomaly_id, ResourceKind::Anomaly)?;
        let anomaly = api
            .get(&id)
            .await
            .with_context(|| format!("Failed to fetch {}", id))?;
        Outcome::from(
            api.create_anomaly_score(&anomaly, &input)
                .await
                .context("Remote anomaly score failed")?,
        )
    } else {
        let anomaly = api
            .local_anomaly(anomaly_id)
            .await
            .with_context(|| format!("Failed to build local anomaly detector {}", anomaly_id))?;
        Outcome::Score(anomaly.anomaly_score(&input, true).context("Anomaly scoring failed")?)
    };

    print_outcome(&outcome, format);
    Ok(())
}

/// Find the centroid closest to an input
pub async fn centroid(
    api: &BigML,
    cluster_id: &str,
    input: &str,
    remote: bool,
    format: OutputFormat,
) -> Result<()> {
    let input = parse_input(input)?;

    let outcome = if remote {
        let id = ResourceId::parse_kind(cluster_id, ResourceKind::Cluster)?;
        let cluster = api
            .get(&id)
            .await
            .with_context(|| format!("Failed to fetch {}", id))?;
        Outcome::from(
            api.create_centroid(&cluster, &input)
                .await
                .context("Remote centroid failed")?,
        )
    } else {
        let cluster = api
            .local_cluster(cluster_id)
            .await
            .with_context(|| format!("Failed to build local cluster {}", cluster_id))?;
        Outcome::Centroid(cluster.centroid(&input, true).context("Centroid search failed")?)
    };

    print_outcome(&outcome, format);
    Ok(())
}
