//! Combination of the votes cast by an ensemble's models

use crate::error::{Error, Result};
use crate::input::FeatureValue;
use crate::model::{merge_distribution, ws_confidence, Prediction};

/// Error normalization range for confidence-weighted regressions
const ERROR_TOP_RANGE: f64 = 10.0;

/// Vote combination methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictionMethod {
    /// Majority vote, or average for regressions
    #[default]
    Plurality,
    /// Confidence weighted vote, or error weighted average
    Confidence,
    /// Probability weighted vote, or average
    Probability,
    /// Predict a category only when enough models agree on it
    Threshold,
}

impl TryFrom<u8> for PredictionMethod {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(PredictionMethod::Plurality),
            1 => Ok(PredictionMethod::Confidence),
            2 => Ok(PredictionMethod::Probability),
            3 => Ok(PredictionMethod::Threshold),
            other => Err(Error::InvalidInput(format!("unknown combination method {}", other))),
        }
    }
}

/// Settings of the threshold method
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    /// Minimum number of votes for `category`
    pub k: usize,
    pub category: String,
}

/// A weighted ballot for one category
struct Ballot<'a> {
    category: &'a FeatureValue,
    weight: f64,
    confidence: f64,
    count: u64,
}

/// Predictions collected from several models
#[derive(Debug, Clone, Default)]
pub struct MultiVote {
    votes: Vec<Prediction>,
}

impl MultiVote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, vote: Prediction) {
        self.votes.push(vote);
    }

    pub fn extend(&mut self, other: MultiVote) {
        self.votes.extend(other.votes);
    }

    pub fn votes(&self) -> &[Prediction] {
        &self.votes
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// True when every vote is numeric
    pub fn is_regression(&self) -> bool {
        !self.votes.is_empty()
            && self
                .votes
                .iter()
                .all(|v| matches!(v.prediction, FeatureValue::Numeric(_)))
    }

    /// Combine all votes into one prediction
    pub fn combine(
        &self,
        method: PredictionMethod,
        threshold: Option<&Threshold>,
    ) -> Result<Prediction> {
        if self.votes.is_empty() {
            return Err(Error::InvalidModel("no votes to combine".to_string()));
        }

        if self.is_regression() {
            return match method {
                PredictionMethod::Plurality | PredictionMethod::Probability => Ok(self.average()),
                PredictionMethod::Confidence => Ok(self.error_weighted()),
                PredictionMethod::Threshold => Err(Error::InvalidInput(
                    "threshold combination needs a categorical objective".to_string(),
                )),
            };
        }

        let ballots = match method {
            PredictionMethod::Plurality => self.ballots(|_| 1.0),
            PredictionMethod::Confidence => self.ballots(|v| v.confidence.unwrap_or(0.0)),
            PredictionMethod::Probability => self.probability_ballots(),
            PredictionMethod::Threshold => {
                let threshold = threshold.ok_or_else(|| {
                    Error::InvalidInput(
                        "threshold method needs a threshold and category".to_string(),
                    )
                })?;
                return self.threshold(threshold);
            }
        };

        self.tally(&ballots)
    }

    fn ballots(&self, weight: impl Fn(&Prediction) -> f64) -> Vec<Ballot<'_>> {
        self.votes
            .iter()
            .map(|v| Ballot {
                category: &v.prediction,
                weight: weight(v),
                confidence: v.confidence.unwrap_or(0.0),
                count: v.count,
            })
            .collect()
    }

    /// One ballot per category of every vote's distribution
    fn probability_ballots(&self) -> Vec<Ballot<'_>> {
        let mut ballots = Vec::new();
        for vote in &self.votes {
            let total: u64 = vote.distribution.iter().map(|(_, c)| c).sum();
            if total == 0 {
                ballots.push(Ballot {
                    category: &vote.prediction,
                    weight: 1.0,
                    confidence: vote.confidence.unwrap_or(0.0),
                    count: vote.count,
                });
                continue;
            }
            for (category, count) in &vote.distribution {
                ballots.push(Ballot {
                    category,
                    weight: *count as f64 / total as f64,
                    confidence: ws_confidence(category, &vote.distribution),
                    count: *count,
                });
            }
        }
        ballots
    }

    /// Sum ballot weights per category and pick the heaviest, earliest on ties
    fn tally(&self, ballots: &[Ballot<'_>]) -> Result<Prediction> {
        let mut totals: Vec<(&FeatureValue, f64)> = Vec::new();
        for ballot in ballots {
            match totals.iter_mut().find(|(c, _)| *c == ballot.category) {
                Some((_, w)) => *w += ballot.weight,
                None => totals.push((ballot.category, ballot.weight)),
            }
        }

        let Some((&first, rest)) = totals.split_first() else {
            return Err(Error::InvalidInput("no ballots left to tally".to_string()));
        };
        let mut winner = first;
        for entry in rest {
            if entry.1 > winner.1 {
                winner = *entry;
            }
        }
        let winner = winner.0;

        let agreeing: Vec<&Ballot<'_>> = ballots.iter().filter(|b| b.category == winner).collect();
        let weight_sum: f64 = agreeing.iter().map(|b| b.weight).sum();
        let all_weight: f64 = ballots.iter().map(|b| b.weight).sum();
        let confidence = if weight_sum > 0.0 {
            agreeing.iter().map(|b| b.weight * b.confidence).sum::<f64>() / weight_sum
        } else {
            0.0
        };

        Ok(Prediction {
            prediction: winner.clone(),
            confidence: Some(confidence),
            probability: (all_weight > 0.0).then(|| weight_sum / all_weight),
            count: agreeing.iter().map(|b| b.count).sum(),
            distribution: self.merged_distribution(),
            path: Vec::new(),
        })
    }

    fn threshold(&self, threshold: &Threshold) -> Result<Prediction> {
        if threshold.k == 0 {
            return Err(Error::InvalidInput(
                "threshold must require at least one vote".to_string(),
            ));
        }
        let category = FeatureValue::Text(threshold.category.clone());
        let hits = self.votes.iter().filter(|v| v.prediction == category).count();

        let ballots = self.ballots(|_| 1.0);
        if hits >= threshold.k || hits == self.votes.len() {
            let singled: Vec<Ballot<'_>> = ballots
                .into_iter()
                .filter(|b| *b.category == category)
                .collect();
            return self.tally(&singled);
        }

        let rest: Vec<Ballot<'_>> = ballots
            .into_iter()
            .filter(|b| *b.category != category)
            .collect();
        self.tally(&rest)
    }

    fn average(&self) -> Prediction {
        let n = self.votes.len() as f64;
        let mean = self.votes.iter().filter_map(|v| v.prediction.as_f64()).sum::<f64>() / n;
        let confidence = self.votes.iter().map(|v| v.confidence.unwrap_or(0.0)).sum::<f64>() / n;

        Prediction {
            prediction: FeatureValue::Numeric(mean),
            confidence: Some(confidence),
            probability: None,
            count: self.votes.iter().map(|v| v.count).sum(),
            distribution: self.merged_distribution(),
            path: Vec::new(),
        }
    }

    /// Weight each vote by `exp((min_error - error) / range * 10)`
    fn error_weighted(&self) -> Prediction {
        let errors: Vec<f64> = self.votes.iter().map(|v| v.confidence.unwrap_or(0.0)).collect();
        let min = errors.iter().copied().fold(f64::INFINITY, f64::min);
        let max = errors.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;

        let weights: Vec<f64> = errors
            .iter()
            .map(|e| {
                if range > 0.0 {
                    ((min - e) / range * ERROR_TOP_RANGE).exp()
                } else {
                    1.0
                }
            })
            .collect();
        let norm: f64 = weights.iter().sum();

        let prediction = self
            .votes
            .iter()
            .zip(&weights)
            .filter_map(|(v, w)| v.prediction.as_f64().map(|p| p * w))
            .sum::<f64>()
            / norm;
        let confidence = errors.iter().zip(&weights).map(|(e, w)| e * w).sum::<f64>() / norm;

        Prediction {
            prediction: FeatureValue::Numeric(prediction),
            confidence: Some(confidence),
            probability: None,
            count: self.votes.iter().map(|v| v.count).sum(),
            distribution: self.merged_distribution(),
            path: Vec::new(),
        }
    }

    fn merged_distribution(&self) -> Vec<(FeatureValue, u64)> {
        let mut merged = Vec::new();
        for vote in &self.votes {
            merge_distribution(&mut merged, &vote.distribution);
        }
        merged
    }
}
