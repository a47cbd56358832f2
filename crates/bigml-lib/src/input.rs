//! Feature mappings passed to predictions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar input value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Numeric(f64),
    Text(String),
}

impl FeatureValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(v) => Some(*v),
            FeatureValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            FeatureValue::Numeric(_) => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Numeric(v) => write!(f, "{}", v),
            FeatureValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Numeric(v)
    }
}

impl From<f32> for FeatureValue {
    fn from(v: f32) -> Self {
        FeatureValue::Numeric(v as f64)
    }
}

impl From<i32> for FeatureValue {
    fn from(v: i32) -> Self {
        FeatureValue::Numeric(v as f64)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Numeric(v as f64)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Text(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Text(v)
    }
}

/// Named inputs describing one data point, keyed by field name or field id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputData(BTreeMap<String, FeatureValue>);

impl InputData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FeatureValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FeatureValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FeatureValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl<K: Into<String>, V: Into<FeatureValue>> FromIterator<(K, V)> for InputData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = InputData::new();
        for (k, v) in iter {
            data.insert(k, v);
        }
        data
    }
}

impl fmt::Display for InputData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Build an [`InputData`] from `name => value` pairs
///
/// ```
/// let input = bigml_lib::input_data! { "petal length" => 0.96, "species" => "Iris-setosa" };
/// assert_eq!(input.len(), 2);
/// ```
#[macro_export]
macro_rules! input_data {
    () => { $crate::InputData::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut data = $crate::InputData::new();
        $( data.insert($key, $value); )+
        data
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_and_display() {
        let input = crate::input_data! {
            "Price" => 5.8,
            "Grape" => "Pinot Grigio",
            "Rating" => 92,
        };
        assert_eq!(input.len(), 3);
        assert_eq!(input.get("Rating"), Some(&FeatureValue::Numeric(92.0)));
        assert_eq!(
            input.to_string(),
            "{Grape: Pinot Grigio, Price: 5.8, Rating: 92}"
        );
    }

    #[test]
    fn test_json_shape() {
        let input = InputData::new().with("sepal width", 4.1).with("species", "Iris-setosa");
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"sepal width": 4.1, "species": "Iris-setosa"})
        );

        let back: InputData = serde_json::from_value(json).unwrap();
        assert_eq!(back, input);
    }
}
