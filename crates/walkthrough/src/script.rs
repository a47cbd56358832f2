//! The scripted tour of remote and local predictions

use anyhow::{Context, Result};
use bigml_lib::{
    input_data, EnsembleOptions, Outcome, PredictOptions, PredictionMethod, PredictionService,
    StructuredLogger,
};
use tracing::debug;

pub const REMOTE_MODEL: &str = "model/563a1c7a3cd25747430023ce";
pub const LOCAL_MODEL: &str = "model/56430eb8636e1c79b0001f90";
pub const UNUSED_ENSEMBLE: &str = "ensemble/564a02d5636e1c79b5006e13";
pub const IRIS_ENSEMBLE: &str = "ensemble/564a081bc6c19b6cf3011c60";
pub const WINE_ENSEMBLE: &str = "ensemble/564623d4636e1c79b00051f7";
pub const IRIS_ANOMALY: &str = "anomaly/564c5a76636e1c3d52000007";

/// Run every step in order and return the last result
///
/// The first failing step aborts the run.
pub async fn run<S>(service: &S, logger: &StructuredLogger) -> Result<Outcome>
where
    S: PredictionService + ?Sized,
{
    logger.log_step(1, "fetch remote model");
    let model = service
        .get_model(REMOTE_MODEL)
        .await
        .with_context(|| format!("Failed to fetch {}", REMOTE_MODEL))?;

    logger.log_step(2, "remote prediction");
    let input = input_data! {
        "petal length" => 4.07,
        "sepal width" => 3.15,
        "petal width" => 1.51,
    };
    let mut prediction = Outcome::from(
        service
            .create_prediction(&model, &input)
            .await
            .context("Remote prediction failed")?,
    );
    debug!(step = 2, result = %prediction, "Step result");

    logger.log_step(3, "local model prediction");
    let local_model = service
        .local_model(LOCAL_MODEL)
        .await
        .with_context(|| format!("Failed to build local model {}", LOCAL_MODEL))?;
    let input = input_data! {
        "petal length" => 0.96,
        "sepal width" => 4.1,
        "petal width" => 2.52,
    };
    let options = PredictOptions::default()
        .with_depth(2)
        .with_confidence()
        .with_multiple(3);
    prediction = local_model
        .predict(&input, &options)
        .context("Local model prediction failed")?;
    debug!(step = 3, result = %prediction, "Step result");

    logger.log_step(4, "local ensemble prediction");
    let _unused = service
        .local_ensemble(UNUSED_ENSEMBLE)
        .await
        .with_context(|| format!("Failed to build local ensemble {}", UNUSED_ENSEMBLE))?;
    let ensemble = service
        .local_ensemble(IRIS_ENSEMBLE)
        .await
        .with_context(|| format!("Failed to build local ensemble {}", IRIS_ENSEMBLE))?;
    let input = input_data! {
        "petal length" => 0.95,
        "sepal width" => 3.9,
        "petal width" => 1.51,
        "sepal length" => 7.0,
    };
    let options = EnsembleOptions::default()
        .with_method(PredictionMethod::try_from(2)?)
        .with_confidence();
    prediction = ensemble
        .predict(&input, &options)
        .context("Local ensemble prediction failed")?;
    debug!(step = 4, result = %prediction, "Step result");

    logger.log_step(5, "local ensemble prediction by field name");
    let ensemble = service
        .local_ensemble(WINE_ENSEMBLE)
        .await
        .with_context(|| format!("Failed to build local ensemble {}", WINE_ENSEMBLE))?;
    let input = input_data! {
        "Price" => 5.8,
        "Grape" => "Pinot Grigio",
        "Country" => "Italy",
        "Rating" => 92,
    };
    prediction = ensemble
        .predict(&input, &EnsembleOptions::default().by_name(true))
        .context("Local ensemble prediction failed")?;
    debug!(step = 5, result = %prediction, "Step result");

    logger.log_step(6, "local anomaly scores");
    let anomaly = service
        .local_anomaly(IRIS_ANOMALY)
        .await
        .with_context(|| format!("Failed to build local anomaly detector {}", IRIS_ANOMALY))?;
    let input = input_data! {
        "petal length" => 4.07,
        "sepal width" => 3.15,
        "petal width" => 1.51,
        "sepal length" => 6.02,
        "species" => "Iris-setosa",
    };
    prediction = Outcome::Score(
        anomaly
            .anomaly_score(&input, true)
            .context("Anomaly scoring failed")?,
    );
    debug!(step = 6, result = %prediction, "Step result");

    let input = input_data! {
        "petal length" => 0.96,
        "sepal width" => 4.1,
        "petal width" => 2.51,
        "sepal length" => 6.02,
        "species" => "Iris-setosa",
    };
    prediction = Outcome::Score(
        anomaly
            .anomaly_score(&input, true)
            .context("Anomaly scoring failed")?,
    );
    debug!(step = 6, result = %prediction, "Step result");

    let input = input_data! {
        "petal length" => 0.96,
        "sepal width" => 4.1,
        "petal width" => 2.51,
    };
    prediction = Outcome::Score(
        anomaly
            .anomaly_score(&input, true)
            .context("Anomaly scoring failed")?,
    );
    debug!(step = 6, result = %prediction, "Step result");

    Ok(prediction)
}

#[cfg(test)]
mod tests;
