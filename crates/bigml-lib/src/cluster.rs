//! Local clusters: nearest centroid lookup

use crate::error::{Error, Result};
use crate::fields::{Fields, Optype};
use crate::input::{FeatureValue, InputData};
use crate::observability::SdkMetrics;
use crate::resource::{Resource, ResourceId, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use tracing::debug;

/// The centroid closest to an input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub centroid_id: String,
    pub centroid_name: String,
    pub distance: f64,
}

impl fmt::Display for Centroid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (distance: {:.4})", self.centroid_name, self.distance)
    }
}

#[derive(Debug, Clone)]
struct Center {
    id: String,
    name: String,
    count: u64,
    values: BTreeMap<String, Value>,
}

/// A k-means cluster that assigns centroids locally
#[derive(Debug, Clone)]
pub struct LocalCluster {
    id: ResourceId,
    fields: Fields,
    scales: BTreeMap<String, f64>,
    centers: Vec<Center>,
}

impl LocalCluster {
    pub fn from_resource(resource: &Resource) -> Result<Self> {
        if resource.kind() != ResourceKind::Cluster {
            return Err(Error::WrongKind {
                expected: ResourceKind::Cluster.to_string(),
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
        let clusters = object
            .get("clusters")
            .ok_or_else(|| Error::InvalidModel("missing 'clusters' section".to_string()))?;
        let fields = Fields::from_json(
            clusters
                .get("fields")
                .ok_or_else(|| Error::InvalidModel("missing fields".to_string()))?,
            None,
        )?;

        let scales: BTreeMap<String, f64> = match object.get("scales") {
            Some(scales) => serde_json::from_value(scales.clone())
                .map_err(|e| Error::InvalidModel(format!("malformed scales: {}", e)))?,
            None => BTreeMap::new(),
        };

        let centers = clusters
            .get("clusters")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::InvalidModel("missing cluster list".to_string()))?
            .iter()
            .map(|c| {
                let values = c
                    .get("center")
                    .and_then(Value::as_object)
                    .ok_or_else(|| Error::InvalidModel("cluster without center".to_string()))?
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Ok(Center {
                    id: c.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
                    name: c.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                    count: c.get("count").and_then(Value::as_u64).unwrap_or(0),
                    values,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if centers.is_empty() {
            return Err(Error::InvalidModel("cluster has no centroids".to_string()));
        }

        Ok(Self {
            id: resource.id().clone(),
            fields,
            scales,
            centers,
        })
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Training instances assigned to each centroid, by name
    pub fn counts(&self) -> Vec<(&str, u64)> {
        self.centers.iter().map(|c| (c.name.as_str(), c.count)).collect()
    }

    /// Nearest centroid by scaled squared distance
    pub fn centroid(&self, input: &InputData, by_name: bool) -> Result<Centroid> {
        let start = Instant::now();
        let filtered = self.fields.filter_input(input, by_name)?;

        let mut best: Option<(&Center, f64)> = None;
        for center in &self.centers {
            let d2 = self.squared_distance(center, &filtered)?;
            if best.map_or(true, |(_, d)| d2 < d) {
                best = Some((center, d2));
            }
        }
        let (center, d2) =
            best.ok_or_else(|| Error::InvalidModel("cluster has no centroids".to_string()))?;

        SdkMetrics::new().observe_local_prediction("cluster", start.elapsed().as_secs_f64());
        debug!(cluster = %self.id, centroid = %center.name, "Local centroid");

        Ok(Centroid {
            centroid_id: center.id.clone(),
            centroid_name: center.name.clone(),
            distance: d2.sqrt(),
        })
    }

    fn squared_distance(&self, center: &Center, input: &InputData) -> Result<f64> {
        let mut total = 0.0;
        for (field_id, center_value) in &center.values {
            let scale = self.scales.get(field_id).copied().unwrap_or(1.0);
            let optype = self.fields.get(field_id).map(|f| f.optype);

            match (optype, input.get(field_id)) {
                (Some(Optype::Numeric), Some(FeatureValue::Numeric(x))) => {
                    let c = center_value.as_f64().unwrap_or(0.0);
                    total += ((x - c) * scale).powi(2);
                }
                (Some(Optype::Numeric), _) => {
                    let name = self.fields.name_for_id(field_id).unwrap_or(field_id);
                    return Err(Error::InvalidInput(format!(
                        "missing numeric field '{}' needed to find the centroid",
                        name
                    )));
                }
                (_, Some(value)) => {
                    if center_value.as_str() != value.as_str() {
                        total += scale * scale;
                    }
                }
                (_, None) => total += scale * scale,
            }
        }
        Ok(total)
    }
}
