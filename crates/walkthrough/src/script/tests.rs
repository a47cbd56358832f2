//! Walkthrough runs against a recording stub service

use super::*;
use async_trait::async_trait;
use bigml_lib::{
    AnomalyScorer, EnsemblePredictor, Error, InputData, ModelPredictor, Resource,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One call received by the stub
#[derive(Debug, Clone, PartialEq)]
enum Call {
    GetModel(String),
    CreatePrediction(String, InputData),
    LocalModel(String),
    ModelPredict(InputData, PredictOptions),
    LocalEnsemble(String),
    EnsemblePredict(String, InputData, EnsembleOptions),
    LocalAnomaly(String),
    AnomalyScore(InputData, bool),
}

type CallLog = Arc<Mutex<Vec<Call>>>;

/// Records every call and fails the first call matching `fail_on`
struct StubService {
    calls: CallLog,
    scores: Arc<Mutex<VecDeque<f64>>>,
    fail_on: Option<Call>,
}

impl StubService {
    fn new(scores: &[f64]) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            scores: Arc::new(Mutex::new(scores.iter().copied().collect())),
            fail_on: None,
        }
    }

    fn failing_on(mut self, call: Call) -> Self {
        self.fail_on = Some(call);
        self
    }

    fn record(&self, call: Call) -> bigml_lib::Result<()> {
        record(&self.calls, &self.fail_on, call)
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

fn record(calls: &CallLog, fail_on: &Option<Call>, call: Call) -> bigml_lib::Result<()> {
    calls.lock().unwrap().push(call.clone());
    if fail_on.as_ref() == Some(&call) {
        return Err(Error::NotFound(format!("{call:?}")));
    }
    Ok(())
}

fn resource(id: &str) -> Resource {
    Resource::from_json(json!({
        "resource": id,
        "status": {"code": 5, "message": "done"},
        "output": "Iris-versicolor"
    }))
    .unwrap()
}

struct StubModel {
    calls: CallLog,
}

impl ModelPredictor for StubModel {
    fn predict(&self, input: &InputData, options: &PredictOptions) -> bigml_lib::Result<Outcome> {
        record(&self.calls, &None, Call::ModelPredict(input.clone(), options.clone()))?;
        Ok(Outcome::Score(-1.0))
    }
}

struct StubEnsemble {
    id: String,
    calls: CallLog,
}

impl EnsemblePredictor for StubEnsemble {
    fn predict(&self, input: &InputData, options: &EnsembleOptions) -> bigml_lib::Result<Outcome> {
        record(
            &self.calls,
            &None,
            Call::EnsemblePredict(self.id.clone(), input.clone(), options.clone()),
        )?;
        Ok(Outcome::Score(-2.0))
    }
}

struct StubAnomaly {
    calls: CallLog,
    scores: Arc<Mutex<VecDeque<f64>>>,
}

impl AnomalyScorer for StubAnomaly {
    fn anomaly_score(&self, input: &InputData, by_name: bool) -> bigml_lib::Result<f64> {
        record(&self.calls, &None, Call::AnomalyScore(input.clone(), by_name))?;
        Ok(self.scores.lock().unwrap().pop_front().unwrap_or(0.0))
    }
}

#[async_trait]
impl PredictionService for StubService {
    async fn get_model(&self, id: &str) -> bigml_lib::Result<Resource> {
        self.record(Call::GetModel(id.to_string()))?;
        Ok(resource(id))
    }

    async fn create_prediction(
        &self,
        model: &Resource,
        input: &InputData,
    ) -> bigml_lib::Result<Resource> {
        self.record(Call::CreatePrediction(model.id().to_string(), input.clone()))?;
        Ok(resource("prediction/564a081bc6c19b6cf3011c70"))
    }

    async fn local_model(&self, id: &str) -> bigml_lib::Result<Box<dyn ModelPredictor>> {
        self.record(Call::LocalModel(id.to_string()))?;
        Ok(Box::new(StubModel {
            calls: self.calls.clone(),
        }))
    }

    async fn local_ensemble(&self, id: &str) -> bigml_lib::Result<Box<dyn EnsemblePredictor>> {
        self.record(Call::LocalEnsemble(id.to_string()))?;
        Ok(Box::new(StubEnsemble {
            id: id.to_string(),
            calls: self.calls.clone(),
        }))
    }

    async fn local_anomaly(&self, id: &str) -> bigml_lib::Result<Box<dyn AnomalyScorer>> {
        self.record(Call::LocalAnomaly(id.to_string()))?;
        Ok(Box::new(StubAnomaly {
            calls: self.calls.clone(),
            scores: self.scores.clone(),
        }))
    }
}

fn logger() -> StructuredLogger {
    StructuredLogger::new("stub")
}

fn expected_calls() -> Vec<Call> {
    let iris_scores = [
        input_data! {
            "petal length" => 4.07,
            "sepal width" => 3.15,
            "petal width" => 1.51,
            "sepal length" => 6.02,
            "species" => "Iris-setosa",
        },
        input_data! {
            "petal length" => 0.96,
            "sepal width" => 4.1,
            "petal width" => 2.51,
            "sepal length" => 6.02,
            "species" => "Iris-setosa",
        },
        input_data! {
            "petal length" => 0.96,
            "sepal width" => 4.1,
            "petal width" => 2.51,
        },
    ];

    let mut calls = vec![
        Call::GetModel(REMOTE_MODEL.to_string()),
        Call::CreatePrediction(
            REMOTE_MODEL.to_string(),
            input_data! { "petal length" => 4.07, "sepal width" => 3.15, "petal width" => 1.51 },
        ),
        Call::LocalModel(LOCAL_MODEL.to_string()),
        Call::ModelPredict(
            input_data! { "petal length" => 0.96, "sepal width" => 4.1, "petal width" => 2.52 },
            PredictOptions::default().with_depth(2).with_confidence().with_multiple(3),
        ),
        Call::LocalEnsemble(UNUSED_ENSEMBLE.to_string()),
        Call::LocalEnsemble(IRIS_ENSEMBLE.to_string()),
        Call::EnsemblePredict(
            IRIS_ENSEMBLE.to_string(),
            input_data! {
                "petal length" => 0.95,
                "sepal width" => 3.9,
                "petal width" => 1.51,
                "sepal length" => 7.0,
            },
            EnsembleOptions::default()
                .with_method(PredictionMethod::Probability)
                .with_confidence(),
        ),
        Call::LocalEnsemble(WINE_ENSEMBLE.to_string()),
        Call::EnsemblePredict(
            WINE_ENSEMBLE.to_string(),
            input_data! {
                "Price" => 5.8,
                "Grape" => "Pinot Grigio",
                "Country" => "Italy",
                "Rating" => 92,
            },
            EnsembleOptions::default().by_name(true),
        ),
        Call::LocalAnomaly(IRIS_ANOMALY.to_string()),
    ];
    calls.extend(iris_scores.into_iter().map(|input| Call::AnomalyScore(input, true)));
    calls
}

#[tokio::test]
async fn test_calls_in_order_with_literal_arguments() {
    let stub = StubService::new(&[0.1, 0.2, 0.3]);
    run(&stub, &logger()).await.unwrap();

    assert_eq!(stub.calls(), expected_calls());
}

#[tokio::test]
async fn test_last_score_wins() {
    let stub = StubService::new(&[0.0, 0.5, 0.9]);
    let outcome = run(&stub, &logger()).await.unwrap();

    assert_eq!(outcome.as_score(), Some(0.9));
    assert_eq!(outcome.to_string(), "0.9");
}

#[tokio::test]
async fn test_local_model_receives_options() {
    let stub = StubService::new(&[]);
    run(&stub, &logger()).await.unwrap();

    let predict = stub
        .calls()
        .into_iter()
        .find(|c| matches!(c, Call::ModelPredict(..)))
        .unwrap();
    let Call::ModelPredict(input, options) = predict else {
        unreachable!()
    };
    assert_eq!(input.len(), 3);
    assert_eq!(input.get("petal width"), Some(&bigml_lib::FeatureValue::Numeric(2.52)));
    assert_eq!(options.depth, Some(2));
    assert!(options.add_confidence);
    assert_eq!(options.multiple, Some(3));
}

#[tokio::test]
async fn test_failure_aborts_the_run() {
    let failing = Call::LocalEnsemble(UNUSED_ENSEMBLE.to_string());
    let stub = StubService::new(&[0.1, 0.2, 0.3]).failing_on(failing.clone());

    let err = run(&stub, &logger()).await.unwrap_err();
    assert!(err.to_string().contains(UNUSED_ENSEMBLE));

    let calls = stub.calls();
    assert_eq!(calls.last(), Some(&failing));
    assert_eq!(calls.len(), 5);
    assert!(!calls.iter().any(|c| matches!(c, Call::AnomalyScore(..))));
}

#[tokio::test]
async fn test_remote_failure_stops_before_local_work() {
    let failing = Call::GetModel(REMOTE_MODEL.to_string());
    let stub = StubService::new(&[]).failing_on(failing.clone());

    assert!(run(&stub, &logger()).await.is_err());
    assert_eq!(stub.calls(), vec![failing]);
}
