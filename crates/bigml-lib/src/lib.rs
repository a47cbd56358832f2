//! Client library for a machine-learning prediction service
//!
//! This crate provides:
//! - A REST client for fetching resources and creating remote predictions
//! - Local decision tree, ensemble, anomaly detector and cluster predictors
//! - The `PredictionService` seam drivers are written against
//! - Prometheus metrics and structured logging

pub mod anomaly;
pub mod api;
pub mod cluster;
pub mod ensemble;
pub mod error;
pub mod fields;
pub mod input;
pub mod model;
pub mod observability;
pub mod outcome;
pub mod predicate;
pub mod resource;
pub mod service;

#[cfg(test)]
mod testdata;

pub use anomaly::LocalAnomaly;
pub use api::{ApiConfig, BigML, ListQuery};
pub use cluster::{Centroid, LocalCluster};
pub use ensemble::{EnsembleOptions, LocalEnsemble, PredictionMethod};
pub use error::{Error, Result};
pub use input::{FeatureValue, InputData};
pub use model::{LocalModel, MissingStrategy, PredictOptions, Prediction};
pub use observability::{SdkMetrics, StructuredLogger};
pub use outcome::{pprint, Outcome};
pub use resource::{Resource, ResourceId, ResourceKind};
pub use service::{AnomalyScorer, EnsemblePredictor, ModelPredictor, PredictionService};
