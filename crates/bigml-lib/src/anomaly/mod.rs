//! Local anomaly detectors
//!
//! An isolation forest scores how easily an instance is separated from the
//! training data: scores close to 1 are anomalous, scores well under 0.5
//! are ordinary.

mod tree;

pub use tree::{average_path_length, AnomalyTree};

use crate::error::{Error, Result};
use crate::fields::Fields;
use crate::input::InputData;
use crate::observability::SdkMetrics;
use crate::resource::{Resource, ResourceId, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

/// One of the most anomalous training instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopAnomaly {
    pub row: Vec<Value>,
    pub score: f64,
}

/// An isolation forest that scores locally
#[derive(Debug, Clone)]
pub struct LocalAnomaly {
    id: ResourceId,
    fields: Fields,
    input_fields: Vec<String>,
    sample_size: u64,
    mean_depth: f64,
    expected_mean_depth: f64,
    top_anomalies: Vec<TopAnomaly>,
    trees: Vec<AnomalyTree>,
}

impl LocalAnomaly {
    /// Build from a finished anomaly detector resource
    pub fn from_resource(resource: &Resource) -> Result<Self> {
        if resource.kind() != ResourceKind::Anomaly {
            return Err(Error::WrongKind {
                expected: ResourceKind::Anomaly.to_string(),
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
        let fields_json = model
            .get("fields")
            .ok_or_else(|| Error::InvalidModel("missing fields".to_string()))?;
        let fields = Fields::from_json(fields_json, None)?;

        let sample_size = object
            .get("sample_size")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::InvalidModel("missing sample_size".to_string()))?;
        let mean_depth = model
            .get("mean_depth")
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::InvalidModel("missing mean_depth".to_string()))?;

        let input_fields = object
            .get("input_fields")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_else(|| fields.iter().map(|(id, _)| id.clone()).collect());

        let top_anomalies = match model.get("top_anomalies") {
            Some(list) => serde_json::from_value(list.clone())
                .map_err(|e| Error::InvalidModel(format!("malformed top_anomalies: {}", e)))?,
            None => Vec::new(),
        };

        let trees = model
            .get("trees")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::InvalidModel("missing trees".to_string()))?
            .iter()
            .map(|tree| {
                let root = tree.get("root").unwrap_or(tree);
                AnomalyTree::from_json(root)
            })
            .collect::<Result<Vec<_>>>()?;

        if trees.is_empty() {
            return Err(Error::InvalidModel("anomaly detector has no trees".to_string()));
        }

        let expected_mean_depth = mean_depth.min(average_path_length(sample_size));
        debug!(
            anomaly = %resource.id(),
            trees = trees.len(),
            expected_mean_depth,
            "Built local anomaly detector"
        );

        Ok(Self {
            id: resource.id().clone(),
            fields,
            input_fields,
            sample_size,
            mean_depth,
            expected_mean_depth,
            top_anomalies,
            trees,
        })
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn input_fields(&self) -> &[String] {
        &self.input_fields
    }

    pub fn sample_size(&self) -> u64 {
        self.sample_size
    }

    pub fn mean_depth(&self) -> f64 {
        self.mean_depth
    }

    pub fn expected_mean_depth(&self) -> f64 {
        self.expected_mean_depth
    }

    pub fn top_anomalies(&self) -> &[TopAnomaly] {
        &self.top_anomalies
    }

    /// Anomaly score of an input in (0, 1]
    ///
    /// # Arguments
    /// * `input` - feature mapping to score
    /// * `by_name` - whether `input` is keyed by field name or field id
    pub fn anomaly_score(&self, input: &InputData, by_name: bool) -> Result<f64> {
        let start = Instant::now();
        let filtered = self.fields.filter_input(input, by_name)?;

        let total: f64 = self.trees.iter().map(|t| t.depth(&filtered, &self.fields)).sum();
        let observed = total / self.trees.len() as f64;
        let score = if self.expected_mean_depth > 0.0 {
            2f64.powf(-observed / self.expected_mean_depth)
        } else {
            1.0
        };

        SdkMetrics::new().observe_local_prediction("anomaly", start.elapsed().as_secs_f64());
        debug!(anomaly = %self.id, observed_depth = observed, score, "Local anomaly score");
        Ok(score)
    }
}
