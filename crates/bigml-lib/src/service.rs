//! Capability traits used by drivers
//!
//! Drivers are written against `PredictionService` so they can run on the
//! real client or on a recording stub.

use crate::anomaly::LocalAnomaly;
use crate::api::BigML;
use crate::ensemble::{EnsembleOptions, LocalEnsemble};
use crate::error::Result;
use crate::input::InputData;
use crate::model::{LocalModel, PredictOptions};
use crate::outcome::Outcome;
use crate::resource::Resource;
use async_trait::async_trait;

/// A decision tree that predicts without the network
pub trait ModelPredictor: Send + Sync {
    fn predict(&self, input: &InputData, options: &PredictOptions) -> Result<Outcome>;
}

/// A set of trees that vote without the network
pub trait EnsemblePredictor: Send + Sync {
    fn predict(&self, input: &InputData, options: &EnsembleOptions) -> Result<Outcome>;
}

/// An anomaly detector that scores without the network
pub trait AnomalyScorer: Send + Sync {
    fn anomaly_score(&self, input: &InputData, by_name: bool) -> Result<f64>;
}

/// Remote calls and local artifact construction
#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn get_model(&self, id: &str) -> Result<Resource>;

    async fn create_prediction(&self, model: &Resource, input: &InputData) -> Result<Resource>;

    async fn local_model(&self, id: &str) -> Result<Box<dyn ModelPredictor>>;

    async fn local_ensemble(&self, id: &str) -> Result<Box<dyn EnsemblePredictor>>;

    async fn local_anomaly(&self, id: &str) -> Result<Box<dyn AnomalyScorer>>;
}

impl ModelPredictor for LocalModel {
    fn predict(&self, input: &InputData, options: &PredictOptions) -> Result<Outcome> {
        LocalModel::predict(self, input, options)
    }
}

impl EnsemblePredictor for LocalEnsemble {
    fn predict(&self, input: &InputData, options: &EnsembleOptions) -> Result<Outcome> {
        LocalEnsemble::predict(self, input, options)
    }
}

impl AnomalyScorer for LocalAnomaly {
    fn anomaly_score(&self, input: &InputData, by_name: bool) -> Result<f64> {
        LocalAnomaly::anomaly_score(self, input, by_name)
    }
}

#[async_trait]
impl PredictionService for BigML {
    async fn get_model(&self, id: &str) -> Result<Resource> {
        BigML::get_model(self, id).await
    }

    async fn create_prediction(&self, model: &Resource, input: &InputData) -> Result<Resource> {
        BigML::create_prediction(self, model, input).await
    }

    async fn local_model(&self, id: &str) -> Result<Box<dyn ModelPredictor>> {
        Ok(Box::new(BigML::local_model(self, id).await?))
    }

    async fn local_ensemble(&self, id: &str) -> Result<Box<dyn EnsemblePredictor>> {
        Ok(Box::new(BigML::local_ensemble(self, id).await?))
    }

    async fn local_anomaly(&self, id: &str) -> Result<Box<dyn AnomalyScorer>> {
        Ok(Box::new(BigML::local_anomaly(self, id).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceId;
    use crate::testdata;

    #[test]
    fn test_local_artifacts_behind_traits() {
        let model = LocalModel::from_resource(&Resource::from_json(testdata::iris_model()).unwrap())
            .unwrap();
        let predictor: Box<dyn ModelPredictor> = Box::new(model);
        let input = crate::input_data! { "petal length" => 0.96 };
        let outcome = predictor.predict(&input, &PredictOptions::default()).unwrap();
        assert_eq!(outcome.to_string(), "Iris-setosa");

        let anomaly =
            LocalAnomaly::from_resource(&Resource::from_json(testdata::anomaly_document()).unwrap())
                .unwrap();
        let scorer: Box<dyn AnomalyScorer> = Box::new(anomaly);
        let score = scorer.anomaly_score(&input, true).unwrap();
        assert!(score > 0.0 && score <= 1.0);

        let models = testdata::vote_models()
            .into_iter()
            .map(|doc| LocalModel::from_resource(&Resource::from_json(doc).unwrap()).unwrap())
            .collect();
        let ensemble =
            LocalEnsemble::from_models(ResourceId::parse(testdata::IRIS_ENSEMBLE).unwrap(), models)
                .unwrap();
        let voter: Box<dyn EnsemblePredictor> = Box::new(ensemble);
        assert!(voter.predict(&input, &EnsembleOptions::default()).is_ok());
    }
}
