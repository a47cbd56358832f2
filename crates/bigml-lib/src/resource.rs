//! Remote resource identifiers and the JSON documents the service returns

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Length of the hexadecimal part of a resource id
const ID_HEX_LEN: usize = 24;

/// Kinds of resources the client knows how to address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Source,
    Dataset,
    Model,
    Ensemble,
    Anomaly,
    Cluster,
    Prediction,
    AnomalyScore,
    Centroid,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Source,
        ResourceKind::Dataset,
        ResourceKind::Model,
        ResourceKind::Ensemble,
        ResourceKind::Anomaly,
        ResourceKind::Cluster,
        ResourceKind::Prediction,
        ResourceKind::AnomalyScore,
        ResourceKind::Centroid,
    ];

    /// Path segment used by the REST API
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Source => "source",
            ResourceKind::Dataset => "dataset",
            ResourceKind::Model => "model",
            ResourceKind::Ensemble => "ensemble",
            ResourceKind::Anomaly => "anomaly",
            ResourceKind::Cluster => "cluster",
            ResourceKind::Prediction => "prediction",
            ResourceKind::AnomalyScore => "anomalyscore",
            ResourceKind::Centroid => "centroid",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidResourceId(s.to_string()))
    }
}

/// A validated `<kind>/<hex>` identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    kind: ResourceKind,
    hex: String,
}

impl ResourceId {
    pub fn parse(id: &str) -> Result<Self> {
        let (kind, hex) = id
            .split_once('/')
            .ok_or_else(|| Error::InvalidResourceId(id.to_string()))?;
        let kind: ResourceKind = kind
            .parse()
            .map_err(|_| Error::InvalidResourceId(id.to_string()))?;

        if hex.len() != ID_HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidResourceId(id.to_string()));
        }

        Ok(Self {
            kind,
            hex: hex.to_ascii_lowercase(),
        })
    }

    /// Parse and require a specific kind
    pub fn parse_kind(id: &str, expected: ResourceKind) -> Result<Self> {
        let parsed = Self::parse(id)?;
        if parsed.kind != expected {
            return Err(Error::WrongKind {
                expected: expected.to_string(),
                id: id.to_string(),
            });
        }
        Ok(parsed)
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// File name used by the on-disk resource store
    pub fn storage_name(&self) -> String {
        format!("{}_{}.json", self.kind, self.hex)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.hex)
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ResourceId {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ResourceId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Status codes reported in a resource's `status.code`
pub mod status_code {
    pub const WAITING: i32 = 0;
    pub const QUEUED: i32 = 1;
    pub const STARTED: i32 = 2;
    pub const IN_PROGRESS: i32 = 3;
    pub const SUMMARIZED: i32 = 4;
    pub const FINISHED: i32 = 5;
    pub const UPLOADING: i32 = 6;
    pub const FAULTY: i32 = -1;
    pub const UNKNOWN: i32 = -2;
    pub const RUNNABLE: i32 = -3;
}

/// Build status of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub progress: Option<f64>,
}

impl ResourceStatus {
    pub fn is_finished(&self) -> bool {
        self.code == status_code::FINISHED
    }

    pub fn is_faulty(&self) -> bool {
        self.code == status_code::FAULTY || self.code == status_code::UNKNOWN
    }
}

/// A resource document as returned by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub resource: ResourceId,
    pub object: Value,
}

impl Resource {
    /// Wrap a raw API document; its `resource` field names the id
    pub fn from_json(object: Value) -> Result<Self> {
        let id = object
            .get("resource")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidModel("document has no 'resource' id".to_string()))?;
        Ok(Self {
            resource: ResourceId::parse(id)?,
            object,
        })
    }

    pub fn id(&self) -> &ResourceId {
        &self.resource
    }

    pub fn kind(&self) -> ResourceKind {
        self.resource.kind()
    }

    pub fn name(&self) -> Option<&str> {
        self.object.get("name").and_then(Value::as_str)
    }

    pub fn status(&self) -> ResourceStatus {
        self.object
            .get("status")
            .and_then(|s| serde_json::from_value(s.clone()).ok())
            .unwrap_or(ResourceStatus {
                code: status_code::UNKNOWN,
                message: "no status reported".to_string(),
                progress: None,
            })
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_finished()
    }

    /// Creation time; the service reports naive UTC timestamps
    pub fn created(&self) -> Option<NaiveDateTime> {
        self.object
            .get("created")
            .and_then(Value::as_str)
            .and_then(|ts| NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f").ok())
    }

    /// The `output` field of a prediction document, when present
    pub fn output(&self) -> Option<&Value> {
        self.object
            .get("output")
            .or_else(|| self.object.get("score"))
            .or_else(|| self.object.get("centroid_name"))
    }
}

/// Paging information of a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListMeta {
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

/// Result of listing resources of one kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceList {
    #[serde(default)]
    pub meta: ListMeta,
    #[serde(default)]
    pub objects: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_resource_id() {
        let id = ResourceId::parse("model/563a1c7a3cd25747430023ce").unwrap();
        assert_eq!(id.kind(), ResourceKind::Model);
        assert_eq!(id.hex(), "563a1c7a3cd25747430023ce");
        assert_eq!(id.to_string(), "model/563a1c7a3cd25747430023ce");
        assert_eq!(id.storage_name(), "model_563a1c7a3cd25747430023ce.json");

        let id: ResourceId = "anomalyscore/564c5a76636e1c3d52000007".parse().unwrap();
        assert_eq!(id.kind(), ResourceKind::AnomalyScore);
    }

    #[test]
    fn test_reject_malformed_ids() {
        for bad in [
            "model",
            "model/",
            "model/563a1c7a",
            "widget/563a1c7a3cd25747430023ce",
            "model/563a1c7a3cd25747430023zz",
        ] {
            assert!(
                matches!(ResourceId::parse(bad), Err(Error::InvalidResourceId(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_kind_mismatch() {
        let err = ResourceId::parse_kind("ensemble/564a02d5636e1c79b5006e13", ResourceKind::Model)
            .unwrap_err();
        assert!(matches!(err, Error::WrongKind { .. }));
    }

    #[test]
    fn test_resource_status_and_created() {
        let resource = Resource::from_json(json!({
            "resource": "model/563a1c7a3cd25747430023ce",
            "name": "iris",
            "created": "2015-11-04T15:18:50.209000",
            "status": {"code": 5, "message": "The model has been created"}
        }))
        .unwrap();

        assert!(resource.is_finished());
        assert_eq!(resource.name(), Some("iris"));
        assert_eq!(
            resource.created().unwrap().format("%Y-%m-%d").to_string(),
            "2015-11-04"
        );
    }

    #[test]
    fn test_missing_status_is_unknown() {
        let resource = Resource::from_json(json!({
            "resource": "dataset/563a1c7a3cd25747430023ce"
        }))
        .unwrap();
        assert!(!resource.is_finished());
        assert!(resource.status().is_faulty());
    }
}
