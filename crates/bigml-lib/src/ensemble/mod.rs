//! Local ensembles: several decision trees voting on one prediction

mod multi_vote;

pub use multi_vote::{MultiVote, PredictionMethod, Threshold};

use crate::error::{Error, Result};
use crate::input::InputData;
use crate::model::{LocalModel, MissingStrategy};
use crate::observability::SdkMetrics;
use crate::outcome::Outcome;
use crate::resource::{Resource, ResourceId, ResourceKind};
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

/// Options of an ensemble prediction
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleOptions {
    /// Input is keyed by field name rather than field id
    pub by_name: bool,
    pub method: PredictionMethod,
    pub add_confidence: bool,
    pub missing_strategy: MissingStrategy,
    /// Required by `PredictionMethod::Threshold`
    pub threshold: Option<Threshold>,
}

impl Default for EnsembleOptions {
    fn default() -> Self {
        Self {
            by_name: true,
            method: PredictionMethod::Plurality,
            add_confidence: false,
            missing_strategy: MissingStrategy::LastPrediction,
            threshold: None,
        }
    }
}

impl EnsembleOptions {
    pub fn by_name(mut self, by_name: bool) -> Self {
        self.by_name = by_name;
        self
    }

    pub fn with_method(mut self, method: PredictionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_confidence(mut self) -> Self {
        self.add_confidence = true;
        self
    }

    pub fn with_strategy(mut self, strategy: MissingStrategy) -> Self {
        self.missing_strategy = strategy;
        self
    }

    pub fn with_threshold(mut self, k: usize, category: impl Into<String>) -> Self {
        self.method = PredictionMethod::Threshold;
        self.threshold = Some(Threshold {
            k,
            category: category.into(),
        });
        self
    }
}

/// A set of local models combined by voting
#[derive(Debug, Clone)]
pub struct LocalEnsemble {
    id: ResourceId,
    models: Vec<LocalModel>,
}

impl LocalEnsemble {
    /// Ids of the component models listed in an ensemble document
    pub fn model_ids(ensemble: &Resource) -> Result<Vec<ResourceId>> {
        if ensemble.kind() != ResourceKind::Ensemble {
            return Err(Error::WrongKind {
                expected: ResourceKind::Ensemble.to_string(),
                id: ensemble.id().to_string(),
            });
        }

        ensemble
            .object
            .get("models")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::InvalidModel("ensemble lists no models".to_string()))?
            .iter()
            .map(|id| {
                let id = id
                    .as_str()
                    .ok_or_else(|| Error::InvalidModel(format!("bad model id {}", id)))?;
                ResourceId::parse_kind(id, ResourceKind::Model)
            })
            .collect()
    }

    /// Build from an ensemble document and its fetched model documents
    pub fn from_resources(ensemble: &Resource, models: &[Resource]) -> Result<Self> {
        let expected = Self::model_ids(ensemble)?;
        for id in &expected {
            if !models.iter().any(|m| m.id() == id) {
                return Err(Error::InvalidModel(format!(
                    "model {} of {} was not provided",
                    id,
                    ensemble.id()
                )));
            }
        }

        let models = models
            .iter()
            .map(LocalModel::from_resource)
            .collect::<Result<Vec<_>>>()?;
        Self::from_models(ensemble.id().clone(), models)
    }

    pub fn from_models(id: ResourceId, models: Vec<LocalModel>) -> Result<Self> {
        if models.is_empty() {
            return Err(Error::InvalidModel(format!("{} has no models", id)));
        }
        debug!(ensemble = %id, models = models.len(), "Built local ensemble");
        Ok(Self { id, models })
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn models(&self) -> &[LocalModel] {
        &self.models
    }

    pub fn is_regression(&self) -> bool {
        self.models[0].is_regression()
    }

    /// Collect one vote per model
    pub fn votes(&self, input: &InputData, options: &EnsembleOptions) -> Result<MultiVote> {
        let mut votes = MultiVote::new();
        for model in &self.models {
            let filtered = model.fields().filter_input(input, options.by_name)?;
            votes.append(model.predict_filtered(&filtered, options.missing_strategy, None));
        }
        Ok(votes)
    }

    pub fn predict(&self, input: &InputData, options: &EnsembleOptions) -> Result<Outcome> {
        let start = Instant::now();
        let votes = self.votes(input, options)?;
        let prediction = votes.combine(options.method, options.threshold.as_ref())?;

        SdkMetrics::new().observe_local_prediction("ensemble", start.elapsed().as_secs_f64());
        debug!(
            ensemble = %self.id,
            method = ?options.method,
            prediction = %prediction.prediction,
            "Local ensemble prediction"
        );

        if options.add_confidence {
            Ok(Outcome::Prediction(prediction))
        } else {
            Ok(Outcome::Prediction(prediction.without_confidence()))
        }
    }
}
