//! Resource documents shared by the unit tests

use crate::fields::Fields;
use serde_json::{json, Value};

pub const IRIS_MODEL: &str = "model/56430eb8636e1c79b0001f90";
pub const IRIS_ENSEMBLE: &str = "ensemble/564a081bc6c19b6cf3011c60";
pub const IRIS_ANOMALY: &str = "anomaly/564c5a76636e1c3d52000007";
pub const IRIS_CLUSTER: &str = "cluster/5026965515526876630001b2";

pub fn iris_fields_json() -> Value {
    json!({
        "000000": {"name": "sepal length", "optype": "numeric", "column_number": 0},
        "000001": {"name": "sepal width", "optype": "numeric", "column_number": 1},
        "000002": {"name": "petal length", "optype": "numeric", "column_number": 2},
        "000003": {"name": "petal width", "optype": "numeric", "column_number": 3},
        "000004": {"name": "species", "optype": "categorical", "column_number": 4}
    })
}

pub fn iris_fields() -> Fields {
    Fields::from_json(&iris_fields_json(), Some("000004".to_string())).unwrap()
}

fn leaf(id: u64, predicate: Value, output: &str, categories: Value, count: u64) -> Value {
    json!({
        "id": id,
        "predicate": predicate,
        "output": output,
        "count": count,
        "objective_summary": {"categories": categories}
    })
}

/// Three-leaf iris tree split on petal length then petal width
pub fn iris_root() -> Value {
    json!({
        "id": 0,
        "predicate": true,
        "output": "Iris-setosa",
        "count": 150,
        "confidence": 0.26289,
        "objective_summary": {"categories": [["Iris-setosa", 50], ["Iris-versicolor", 50], ["Iris-virginica", 50]]},
        "children": [
            leaf(1, json!({"field": "000002", "operator": "<=", "value": 2.45}),
                 "Iris-setosa", json!([["Iris-setosa", 50]]), 50),
            {
                "id": 2,
                "predicate": {"field": "000002", "operator": ">", "value": 2.45},
                "output": "Iris-versicolor",
                "count": 100,
                "objective_summary": {"categories": [["Iris-versicolor", 50], ["Iris-virginica", 50]]},
                "children": [
                    leaf(3, json!({"field": "000003", "operator": "<=", "value": 1.75}),
                         "Iris-versicolor", json!([["Iris-versicolor", 49], ["Iris-virginica", 5]]), 54),
                    leaf(4, json!({"field": "000003", "operator": ">", "value": 1.75}),
                         "Iris-virginica", json!([["Iris-virginica", 45], ["Iris-versicolor", 1]]), 46)
                ]
            }
        ]
    })
}

pub fn model_document(id: &str, root: Value, objective: &str) -> Value {
    json!({
        "resource": id,
        "name": "iris",
        "created": "2015-11-11T10:44:40.421000",
        "status": {"code": 5, "message": "The model has been created"},
        "objective_field": objective,
        "model": {
            "root": root,
            "fields": iris_fields_json()
        }
    })
}

pub fn iris_model() -> Value {
    model_document(IRIS_MODEL, iris_root(), "000004")
}

/// Single-split classification tree: `field <= threshold` vs `field > threshold`
pub fn split_model(
    id: &str,
    field: &str,
    threshold: f64,
    low: (&str, Value, u64),
    high: (&str, Value, u64),
) -> Value {
    let low_split = json!({"field": field, "operator": "<=", "value": threshold});
    let high_split = json!({"field": field, "operator": ">", "value": threshold});
    let root = json!({
        "id": 0,
        "predicate": true,
        "output": low.0,
        "count": low.2 + high.2,
        "objective_summary": {"categories": []},
        "children": [
            leaf(1, low_split, low.0, low.1, low.2),
            leaf(2, high_split, high.0, high.1, high.2)
        ]
    });
    model_document(id, root, "000004")
}

/// Single-split regression tree on petal length predicting petal width
pub fn regression_model(id: &str, low_output: f64, low_error: f64) -> Value {
    let root = json!({
        "id": 0,
        "predicate": true,
        "output": 1.2,
        "confidence": 0.76,
        "count": 150,
        "objective_summary": {"bins": [[0.25, 50], [1.68, 100]]},
        "children": [
            {
                "id": 1,
                "predicate": {"field": "000002", "operator": "<=", "value": 2.45},
                "output": low_output,
                "confidence": low_error,
                "count": 50,
                "objective_summary": {"bins": [[low_output, 50]]}
            },
            {
                "id": 2,
                "predicate": {"field": "000002", "operator": ">", "value": 2.45},
                "output": 1.68,
                "confidence": 0.42,
                "count": 100,
                "objective_summary": {"bins": [[1.3, 50], [2.06, 50]]}
            }
        ]
    });
    model_document(id, root, "000003")
}

pub const VOTE_MODELS: [&str; 3] = [
    "model/564a081bc6c19b6cf3011c61",
    "model/564a081bc6c19b6cf3011c62",
    "model/564a081bc6c19b6cf3011c63",
];

/// Component models of the classification ensemble
pub fn vote_models() -> Vec<Value> {
    vec![
        model_document(VOTE_MODELS[0], iris_root(), "000004"),
        split_model(
            VOTE_MODELS[1],
            "000001",
            3.0,
            ("Iris-versicolor", json!([["Iris-versicolor", 40], ["Iris-virginica", 30]]), 70),
            ("Iris-setosa", json!([["Iris-setosa", 45], ["Iris-versicolor", 5]]), 50),
        ),
        split_model(
            VOTE_MODELS[2],
            "000003",
            1.0,
            ("Iris-setosa", json!([["Iris-setosa", 48]]), 48),
            ("Iris-virginica", json!([["Iris-virginica", 30], ["Iris-versicolor", 20]]), 50),
        ),
    ]
}

pub fn ensemble_document(id: &str, models: &[&str]) -> Value {
    json!({
        "resource": id,
        "name": "iris ensemble",
        "status": {"code": 5, "message": "The ensemble has been created"},
        "number_of_models": models.len(),
        "models": models
    })
}

/// Two isolation trees over the iris fields
pub fn anomaly_document() -> Value {
    json!({
        "resource": IRIS_ANOMALY,
        "name": "iris anomalies",
        "status": {"code": 5, "message": "The anomaly detector has been created"},
        "sample_size": 8,
        "input_fields": ["000000", "000001", "000002", "000003", "000004"],
        "model": {
            "fields": iris_fields_json(),
            "mean_depth": 4.0,
            "top_anomalies": [
                {"row": [7.0, 4.1, 0.96, 2.51, "Iris-setosa"], "score": 0.61}
            ],
            "trees": [
                {"root": {
                    "predicates": [true],
                    "population": 8,
                    "children": [
                        {"predicates": [{"field": "000002", "op": "<", "value": 2.0}], "population": 3},
                        {"predicates": [{"field": "000002", "op": ">=", "value": 2.0}], "population": 5,
                         "children": [
                            {"predicates": [{"field": "000003", "op": "<", "value": 1.0}], "population": 1},
                            {"predicates": [{"field": "000003", "op": ">=", "value": 1.0}], "population": 4}
                         ]}
                    ]
                }},
                {"root": {
                    "predicates": [true],
                    "population": 8,
                    "children": [
                        {"predicates": [{"field": "000001", "op": "<", "value": 3.5}], "population": 6},
                        {"predicates": [{"field": "000001", "op": ">=", "value": 3.5}], "population": 2}
                    ]
                }}
            ]
        }
    })
}

pub fn cluster_document() -> Value {
    json!({
        "resource": IRIS_CLUSTER,
        "name": "iris clusters",
        "status": {"code": 5, "message": "The cluster has been created"},
        "scales": {"000000": 1.0, "000001": 2.0, "000004": 1.5},
        "clusters": {
            "fields": iris_fields_json(),
            "clusters": [
                {"id": "000000", "name": "Cluster 0", "count": 60,
                 "center": {"000000": 1.0, "000001": 1.0, "000004": "Iris-setosa"}},
                {"id": "000001", "name": "Cluster 1", "count": 90,
                 "center": {"000000": 5.0, "000001": 3.0, "000004": "Iris-virginica"}}
            ]
        }
    })
}
