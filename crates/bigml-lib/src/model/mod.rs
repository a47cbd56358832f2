//! Local decision tree models
//!
//! A `LocalModel` is built from a finished model resource and predicts
//! without further calls to the service.

mod confidence;
mod prediction;
mod tree;

pub use confidence::{ws_confidence, WS_Z};
pub use prediction::{CategoryPrediction, Prediction};
pub use tree::{merge_distribution, Proportional, TreeNode, Walk};

use crate::error::{Error, Result};
use crate::fields::{Fields, Optype};
use crate::input::{FeatureValue, InputData};
use crate::observability::SdkMetrics;
use crate::outcome::Outcome;
use crate::resource::{Resource, ResourceId, ResourceKind};
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

/// How to proceed when a split field is missing from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingStrategy {
    /// Stop and return the prediction of the last node reached
    #[default]
    LastPrediction,
    /// Follow every branch and merge the leaves reached
    Proportional,
}

impl TryFrom<u8> for MissingStrategy {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(MissingStrategy::LastPrediction),
            1 => Ok(MissingStrategy::Proportional),
            other => Err(Error::InvalidInput(format!("unknown missing strategy {}", other))),
        }
    }
}

/// Options of a local model prediction
#[derive(Debug, Clone, PartialEq)]
pub struct PredictOptions {
    /// Input is keyed by field name rather than field id
    pub by_name: bool,
    /// Stop descending after this many levels
    pub depth: Option<usize>,
    pub missing_strategy: MissingStrategy,
    pub add_confidence: bool,
    /// Return up to this many categories of the predicted node (0 = all)
    pub multiple: Option<usize>,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            by_name: true,
            depth: None,
            missing_strategy: MissingStrategy::LastPrediction,
            add_confidence: false,
            multiple: None,
        }
    }
}

impl PredictOptions {
    pub fn by_id(mut self) -> Self {
        self.by_name = false;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_strategy(mut self, strategy: MissingStrategy) -> Self {
        self.missing_strategy = strategy;
        self
    }

    pub fn with_confidence(mut self) -> Self {
        self.add_confidence = true;
        self
    }

    pub fn with_multiple(mut self, multiple: usize) -> Self {
        self.multiple = Some(multiple);
        self
    }
}

/// A decision tree that predicts locally
#[derive(Debug, Clone)]
pub struct LocalModel {
    id: ResourceId,
    name: Option<String>,
    fields: Fields,
    root: TreeNode,
    regression: bool,
}

impl LocalModel {
    /// Build from a finished model resource
    pub fn from_resource(resource: &Resource) -> Result<Self> {
        if resource.kind() != ResourceKind::Model {
            return Err(Error::WrongKind {
                expected: ResourceKind::Model.to_string(),
                id: resource.id().to_string(),
            });
        }

        let status = resource.status();
        if !status.is_finished() {
            return Err(Error::NotReady {
                id: resource.id().to_string(),
                code: status.code,
            });
        }

        let object = &resource.object;
        let model = object
            .get("model")
            .ok_or_else(|| Error::InvalidModel("missing 'model' section".to_string()))?;
        let root = model
            .get("root")
            .ok_or_else(|| Error::InvalidModel("missing tree root".to_string()))?;
        let fields_json = model
            .get("fields")
            .or_else(|| object.get("fields"))
            .ok_or_else(|| Error::InvalidModel("missing fields".to_string()))?;

        let objective = object
            .get("objective_field")
            .and_then(Value::as_str)
            .or_else(|| {
                object
                    .get("objective_fields")
                    .and_then(Value::as_array)
                    .and_then(|ids| ids.first())
                    .and_then(Value::as_str)
            })
            .map(str::to_string);

        let fields = Fields::from_json(fields_json, objective)?;
        let objective = fields
            .objective()
            .ok_or_else(|| Error::InvalidModel("objective field not in fields".to_string()))?;
        let regression = objective.optype == Optype::Numeric;

        debug!(model = %resource.id(), regression, "Built local model");

        Ok(Self {
            id: resource.id().clone(),
            name: resource.name().map(str::to_string),
            root: TreeNode::from_json(root)?,
            fields,
            regression,
        })
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn is_regression(&self) -> bool {
        self.regression
    }

    /// Predict from input already keyed by field id and cast
    pub fn predict_filtered(
        &self,
        input: &InputData,
        strategy: MissingStrategy,
        depth: Option<usize>,
    ) -> Prediction {
        if strategy == MissingStrategy::Proportional {
            let merged = self.root.walk_proportional(input, &self.fields, depth);
            if merged.missing_found {
                return self.from_proportional(merged);
            }
        }

        let walk = self.root.walk(input, &self.fields, depth);
        let node = walk.node;
        let (confidence, probability) = if self.regression {
            (node.confidence, None)
        } else {
            let total: u64 = node.distribution.iter().map(|(_, c)| c).sum();
            let hits = node
                .distribution
                .iter()
                .find(|(v, _)| *v == node.output)
                .map(|(_, c)| *c)
                .unwrap_or(0);
            let confidence = if node.distribution.is_empty() {
                node.confidence
            } else {
                Some(ws_confidence(&node.output, &node.distribution))
            };
            let probability = (total > 0).then(|| hits as f64 / total as f64);
            (confidence, probability)
        };

        Prediction {
            prediction: node.output.clone(),
            confidence,
            probability,
            count: node.count,
            distribution: node.distribution.clone(),
            path: walk.path,
        }
    }

    fn from_proportional(&self, merged: Proportional) -> Prediction {
        let total: u64 = merged.distribution.iter().map(|(_, c)| c).sum();

        if self.regression {
            let mean = if total > 0 {
                merged
                    .distribution
                    .iter()
                    .filter_map(|(v, c)| v.as_f64().map(|v| v * *c as f64))
                    .sum::<f64>()
                    / total as f64
            } else {
                0.0
            };
            let confidence =
                (merged.count > 0).then(|| merged.weighted_confidence / merged.count as f64);
            return Prediction {
                prediction: FeatureValue::Numeric(mean),
                confidence,
                probability: None,
                count: merged.count,
                distribution: merged.distribution,
                path: merged.path,
            };
        }

        let (winner, hits) = top_category(&merged.distribution)
            .unwrap_or((FeatureValue::Text(String::new()), 0));
        Prediction {
            confidence: Some(ws_confidence(&winner, &merged.distribution)),
            probability: (total > 0).then(|| hits as f64 / total as f64),
            prediction: winner,
            count: merged.count,
            distribution: merged.distribution,
            path: merged.path,
        }
    }

    /// Predict from a feature mapping
    pub fn predict(&self, input: &InputData, options: &PredictOptions) -> Result<Outcome> {
        let start = Instant::now();
        let filtered = self.fields.filter_input(input, options.by_name)?;
        let prediction = self.predict_filtered(&filtered, options.missing_strategy, options.depth);

        SdkMetrics::new().observe_local_prediction("model", start.elapsed().as_secs_f64());
        debug!(model = %self.id, prediction = %prediction.prediction, "Local prediction");

        if let (Some(limit), false) = (options.multiple, self.regression) {
            return Ok(Outcome::Distribution(categories(&prediction.distribution, limit)));
        }

        if options.add_confidence {
            Ok(Outcome::Prediction(prediction))
        } else {
            Ok(Outcome::Prediction(prediction.without_confidence()))
        }
    }
}

/// Highest-count entry, earliest on ties
fn top_category(distribution: &[(FeatureValue, u64)]) -> Option<(FeatureValue, u64)> {
    distribution
        .iter()
        .fold(None::<&(FeatureValue, u64)>, |best, entry| match best {
            Some(b) if b.1 >= entry.1 => Some(b),
            _ => Some(entry),
        })
        .cloned()
}

/// Top `limit` categories of a node distribution; 0 returns them all
pub fn categories(distribution: &[(FeatureValue, u64)], limit: usize) -> Vec<CategoryPrediction> {
    let total: u64 = distribution.iter().map(|(_, c)| c).sum();
    let mut sorted: Vec<&(FeatureValue, u64)> = distribution.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));

    let limit = if limit == 0 { sorted.len() } else { limit };
    sorted
        .into_iter()
        .take(limit)
        .map(|(value, count)| CategoryPrediction {
            prediction: value.to_string(),
            confidence: ws_confidence(value, distribution),
            probability: if total > 0 {
                *count as f64 / total as f64
            } else {
                0.0
            },
            count: *count,
        })
        .collect()
}
