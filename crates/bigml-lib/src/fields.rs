//! Field dictionaries shared by every local predictor

use crate::error::{Error, Result};
use crate::input::{FeatureValue, InputData};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Operational type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Optype {
    Numeric,
    Categorical,
    Text,
    Items,
    Datetime,
}

/// Tokenizer settings of a text field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermAnalysis {
    #[serde(default)]
    pub case_sensitive: bool,
}

/// Field description as found in a model, cluster or anomaly document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub optype: Optype,
    #[serde(default)]
    pub column_number: Option<u32>,
    #[serde(default)]
    pub summary: Option<Value>,
    #[serde(default)]
    pub term_analysis: Option<TermAnalysis>,
}

impl Field {
    pub fn case_sensitive(&self) -> bool {
        self.term_analysis
            .as_ref()
            .map(|t| t.case_sensitive)
            .unwrap_or(false)
    }
}

/// Field dictionary keyed by field id, with a name index
#[derive(Debug, Clone, Default)]
pub struct Fields {
    by_id: BTreeMap<String, Field>,
    id_by_name: HashMap<String, String>,
    objective_id: Option<String>,
}

impl Fields {
    /// Parse a `fields` object (`{"000000": {"name": ..., "optype": ...}, ...}`)
    pub fn from_json(fields: &Value, objective_id: Option<String>) -> Result<Self> {
        let by_id: BTreeMap<String, Field> = serde_json::from_value(fields.clone())
            .map_err(|e| Error::InvalidModel(format!("malformed fields: {}", e)))?;

        let id_by_name = by_id
            .iter()
            .map(|(id, field)| (field.name.clone(), id.clone()))
            .collect();

        Ok(Self {
            by_id,
            id_by_name,
            objective_id,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Field> {
        self.by_id.get(id)
    }

    pub fn id_for_name(&self, name: &str) -> Option<&str> {
        self.id_by_name.get(name).map(String::as_str)
    }

    pub fn name_for_id(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(|f| f.name.as_str())
    }

    pub fn objective_id(&self) -> Option<&str> {
        self.objective_id.as_deref()
    }

    pub fn objective(&self) -> Option<&Field> {
        self.objective_id.as_deref().and_then(|id| self.by_id.get(id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.by_id.iter()
    }

    /// Re-key input by field id, drop what the model cannot use and cast
    /// values to the field's type.
    ///
    /// Unknown fields, the objective field and empty strings are dropped.
    pub fn filter_input(&self, input: &InputData, by_name: bool) -> Result<InputData> {
        let mut filtered = InputData::new();

        for (key, value) in input.iter() {
            let id = if by_name {
                self.id_by_name
                    .get(key)
                    .map(String::as_str)
                    .or_else(|| self.by_id.get_key_value(key).map(|(k, _)| k.as_str()))
            } else {
                self.by_id.get_key_value(key).map(|(k, _)| k.as_str())
            };

            let Some(id) = id else {
                debug!(field = %key, "Ignoring unknown input field");
                continue;
            };

            if Some(id) == self.objective_id.as_deref() {
                continue;
            }

            if matches!(value, FeatureValue::Text(s) if s.is_empty()) {
                continue;
            }

            let field = &self.by_id[id];
            filtered.insert(id, cast(field, value)?);
        }

        Ok(filtered)
    }
}

/// Cast an input value to the representation its field expects
fn cast(field: &Field, value: &FeatureValue) -> Result<FeatureValue> {
    match (field.optype, value) {
        (Optype::Numeric, FeatureValue::Numeric(v)) => Ok(FeatureValue::Numeric(*v)),
        (Optype::Numeric, FeatureValue::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(FeatureValue::Numeric)
            .map_err(|_| {
                Error::InvalidInput(format!(
                    "field '{}' is numeric but got '{}'",
                    field.name, s
                ))
            }),
        (_, FeatureValue::Numeric(v)) => Ok(FeatureValue::Text(value_to_string(*v))),
        (_, FeatureValue::Text(s)) => Ok(FeatureValue::Text(s.clone())),
    }
}

/// Render a number the way categories are written in model documents
fn value_to_string(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}
