//! Prediction records produced by local models

use crate::input::FeatureValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single prediction from a tree or a combined vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: FeatureValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    pub count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub distribution: Vec<(FeatureValue, u64)>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub path: Vec<String>,
}

impl Prediction {
    /// Drop the confidence annotation
    pub fn without_confidence(mut self) -> Self {
        self.confidence = None;
        self
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prediction)?;
        if let Some(confidence) = self.confidence {
            write!(f, " (confidence: {:.4})", confidence)?;
        }
        Ok(())
    }
}

/// One category of a predicted node's distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPrediction {
    pub prediction: String,
    pub confidence: f64,
    pub probability: f64,
    pub count: u64,
}

impl fmt::Display for CategoryPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (confidence: {:.4}, probability: {:.4}, count: {})",
            self.prediction, self.confidence, self.probability, self.count
        )
    }
}
