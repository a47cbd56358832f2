//! Decision tree nodes and traversal

use crate::error::{Error, Result};
use crate::fields::Fields;
use crate::input::{FeatureValue, InputData};
use crate::predicate::Predicate;
use serde_json::Value;

/// One node of a decision tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: Option<u64>,
    pub predicate: Predicate,
    pub output: FeatureValue,
    /// Wilson bound for classifications, error for regressions
    pub confidence: Option<f64>,
    pub count: u64,
    pub distribution: Vec<(FeatureValue, u64)>,
    pub children: Vec<TreeNode>,
}

/// Where a last-prediction walk stopped
#[derive(Debug)]
pub struct Walk<'a> {
    pub node: &'a TreeNode,
    pub path: Vec<String>,
    pub depth: usize,
}

/// Merged leaf information of a proportional walk
#[derive(Debug, Default)]
pub struct Proportional {
    pub distribution: Vec<(FeatureValue, u64)>,
    pub count: u64,
    /// Count-weighted sum of the reached leaves' confidences
    pub weighted_confidence: f64,
    pub path: Vec<String>,
    pub missing_found: bool,
}

impl TreeNode {
    pub fn from_json(node: &Value) -> Result<Self> {
        let predicate = node
            .get("predicate")
            .map(Predicate::from_json)
            .transpose()?
            .unwrap_or(Predicate::True);

        let output = match node.get("output") {
            Some(Value::String(s)) => FeatureValue::Text(s.clone()),
            Some(Value::Number(n)) => FeatureValue::Numeric(n.as_f64().unwrap_or(0.0)),
            Some(Value::Bool(b)) => FeatureValue::Text(b.to_string()),
            _ => return Err(Error::InvalidModel("tree node without output".to_string())),
        };

        let children = node
            .get("children")
            .and_then(Value::as_array)
            .map(|children| children.iter().map(TreeNode::from_json).collect::<Result<Vec<_>>>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            id: node.get("id").and_then(Value::as_u64),
            predicate,
            output,
            confidence: node.get("confidence").and_then(Value::as_f64),
            count: node.get("count").and_then(Value::as_u64).unwrap_or(0),
            distribution: parse_distribution(node),
            children,
        })
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Follow the first matching child until a leaf, a missing split or the
    /// depth limit is reached
    pub fn walk<'a>(
        &'a self,
        input: &InputData,
        fields: &Fields,
        max_depth: Option<usize>,
    ) -> Walk<'a> {
        let mut node = self;
        let mut path = Vec::new();
        let mut depth = 0;

        while max_depth.map_or(true, |limit| depth < limit) {
            match node.children.iter().find(|c| c.predicate.apply(input, fields)) {
                Some(child) => {
                    path.push(child.predicate.to_rule(fields));
                    node = child;
                    depth += 1;
                }
                None => break,
            }
        }

        Walk { node, path, depth }
    }

    /// Descend every branch whose split field is missing and merge the
    /// distributions of all reached leaves
    ///
    /// Nodes at `max_depth` count as leaves.
    pub fn walk_proportional(
        &self,
        input: &InputData,
        fields: &Fields,
        max_depth: Option<usize>,
    ) -> Proportional {
        let mut acc = Proportional::default();
        let mut walk = ProportionalWalk {
            input,
            fields,
            max_depth,
            acc: &mut acc,
        };
        self.proportional_into(&mut walk, 0);
        acc
    }

    fn proportional_into(&self, walk: &mut ProportionalWalk<'_>, depth: usize) {
        if self.is_leaf() || walk.max_depth.is_some_and(|limit| depth >= limit) {
            self.absorb(walk.acc);
            return;
        }
        let (input, fields) = (walk.input, walk.fields);

        if self.one_branch(input) {
            match self.children.iter().find(|c| c.predicate.apply(input, fields)) {
                Some(child) => {
                    if !walk.acc.missing_found {
                        walk.acc.path.push(child.predicate.to_rule(fields));
                    }
                    child.proportional_into(walk, depth + 1);
                }
                None => self.absorb(walk.acc),
            }
        } else {
            walk.acc.missing_found = true;
            for child in &self.children {
                child.proportional_into(walk, depth + 1);
            }
        }
    }

    /// True when the split can be decided without guessing
    fn one_branch(&self, input: &InputData) -> bool {
        let split_present = self
            .children
            .iter()
            .filter_map(|c| c.predicate.field())
            .any(|field| input.contains(field));
        let missing_aware = self
            .children
            .iter()
            .any(|c| matches!(c.predicate, Predicate::Condition { missing: true, .. }));
        split_present || missing_aware
    }

    fn absorb(&self, acc: &mut Proportional) {
        merge_distribution(&mut acc.distribution, &self.distribution);
        acc.count += self.count;
        acc.weighted_confidence += self.confidence.unwrap_or(0.0) * self.count as f64;
    }
}

struct ProportionalWalk<'a> {
    input: &'a InputData,
    fields: &'a Fields,
    max_depth: Option<usize>,
    acc: &'a mut Proportional,
}

/// Add `other` into `target`, keeping first-seen order
pub fn merge_distribution(
    target: &mut Vec<(FeatureValue, u64)>,
    other: &[(FeatureValue, u64)],
) {
    for (value, count) in other {
        match target.iter_mut().find(|(v, _)| v == value) {
            Some((_, existing)) => *existing += count,
            None => target.push((value.clone(), *count)),
        }
    }
}

/// Read `objective_summary.{categories|bins|counts}` or a bare `distribution`
fn parse_distribution(node: &Value) -> Vec<(FeatureValue, u64)> {
    let summary = node.get("objective_summary");
    let raw = summary
        .and_then(|s| s.get("categories").or_else(|| s.get("bins")).or_else(|| s.get("counts")))
        .or_else(|| node.get("distribution"));

    raw.and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let pair = entry.as_array()?;
                    let value = match pair.first()? {
                        Value::String(s) => FeatureValue::Text(s.clone()),
                        Value::Number(n) => FeatureValue::Numeric(n.as_f64()?),
                        _ => return None,
                    };
                    let count = pair.get(1)?.as_f64()? as u64;
                    Some((value, count))
                })
                .collect()
        })
        .unwrap_or_default()
}
