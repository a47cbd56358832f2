//! Isolation trees

use crate::error::{Error, Result};
use crate::fields::Fields;
use crate::input::InputData;
use crate::predicate::Predicate;
use serde_json::Value;

/// Euler-Mascheroni constant
const EULER_GAMMA: f64 = 0.5772156649;

/// Average path length of an unsuccessful search in a binary tree of `n` nodes
pub fn average_path_length(n: u64) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * (EULER_GAMMA + (n - 1.0).ln()) - 2.0 * (n - 1.0) / n
}

/// A node of an isolation tree; all of its predicates must hold to enter it
#[derive(Debug, Clone)]
pub struct AnomalyTree {
    predicates: Vec<Predicate>,
    population: u64,
    children: Vec<AnomalyTree>,
}

impl AnomalyTree {
    pub fn from_json(node: &Value) -> Result<Self> {
        let predicates = match node.get("predicates") {
            Some(Value::Array(list)) => list
                .iter()
                .map(Predicate::from_json)
                .collect::<Result<Vec<_>>>()?,
            Some(Value::Bool(true)) | None => vec![Predicate::True],
            Some(other) => {
                return Err(Error::InvalidModel(format!(
                    "unexpected anomaly predicates: {}",
                    other
                )))
            }
        };

        let children = node
            .get("children")
            .and_then(Value::as_array)
            .map(|list| list.iter().map(AnomalyTree::from_json).collect::<Result<Vec<_>>>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            predicates,
            population: node.get("population").and_then(Value::as_u64).unwrap_or(0),
            children,
        })
    }

    fn applies(&self, input: &InputData, fields: &Fields) -> bool {
        self.predicates.iter().all(|p| p.apply(input, fields))
    }

    /// Depth at which `input` is isolated
    ///
    /// # Returns
    /// * `0.0` if the root predicates do not hold
    /// * the number of levels entered, plus the expected remaining depth
    ///   when a leaf still holds more than one instance
    pub fn depth(&self, input: &InputData, fields: &Fields) -> f64 {
        if !self.applies(input, fields) {
            return 0.0;
        }

        let mut depth = 1.0;
        let mut node = self;
        while let Some(child) = node.children.iter().find(|c| c.applies(input, fields)) {
            depth += 1.0;
            node = child;
        }

        if node.children.is_empty() && node.population > 1 {
            depth += average_path_length(node.population);
        }
        depth
    }
}
