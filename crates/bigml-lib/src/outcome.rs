//! Results of remote and local calls, and their printed form

use crate::cluster::Centroid;
use crate::model::{CategoryPrediction, Prediction};
use crate::resource::{Resource, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Whatever a prediction-like call returned
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    /// A prediction, anomaly score or centroid created remotely
    Resource(Resource),
    Prediction(Prediction),
    Distribution(Vec<CategoryPrediction>),
    Score(f64),
    Centroid(Centroid),
}

impl Outcome {
    pub fn as_score(&self) -> Option<f64> {
        match self {
            Outcome::Score(score) => Some(*score),
            _ => None,
        }
    }
}

impl From<f64> for Outcome {
    fn from(score: f64) -> Self {
        Outcome::Score(score)
    }
}

impl From<Prediction> for Outcome {
    fn from(prediction: Prediction) -> Self {
        Outcome::Prediction(prediction)
    }
}

impl From<Resource> for Outcome {
    fn from(resource: Resource) -> Self {
        Outcome::Resource(resource)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Resource(resource) => fmt_resource(resource, f),
            Outcome::Prediction(prediction) => write!(f, "{}", prediction),
            Outcome::Distribution(categories) => {
                let lines: Vec<String> = categories.iter().map(ToString::to_string).collect();
                f.write_str(&lines.join("\n"))
            }
            Outcome::Score(score) => write!(f, "{}", score),
            Outcome::Centroid(centroid) => write!(f, "{}", centroid),
        }
    }
}

/// `{input} -> output` for remote predictions, pretty JSON otherwise
fn fmt_resource(resource: &Resource, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let is_prediction = matches!(
        resource.kind(),
        ResourceKind::Prediction | ResourceKind::AnomalyScore | ResourceKind::Centroid
    );

    match (is_prediction, resource.output()) {
        (true, Some(output)) => {
            let input = resource
                .object
                .get("input_data")
                .cloned()
                .unwrap_or(Value::Null);
            let output = match output {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            write!(f, "{} -> {}", input, output)
        }
        _ => {
            let pretty =
                serde_json::to_string_pretty(&resource.object).map_err(|_| fmt::Error)?;
            f.write_str(&pretty)
        }
    }
}

/// Print an outcome to standard output
pub fn pprint(outcome: &Outcome) {
    println!("{}", outcome);
}
