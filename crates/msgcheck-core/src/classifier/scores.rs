//! Score types produced by the scorers.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Overall toxicity category.
pub const TOXIC: &str = "toxic";
/// Severe toxicity category.
pub const SEVERE_TOXIC: &str = "severe_toxic";
/// Insult category.
pub const INSULT: &str = "insult";
/// Obscenity category.
pub const OBSCENE: &str = "obscene";
/// Threat category.
pub const THREAT: &str = "threat";

/// Per-category toxicity probabilities for one message.
///
/// Categories the model did not report read as `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToxicityScores {
    scores: HashMap<String, f32>,
}

impl ToxicityScores {
    /// Creates an empty score map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probability for `category`, or `0.0` if absent.
    pub fn get(&self, category: &str) -> f32 {
        self.scores.get(category).copied().unwrap_or(0.0)
    }

    /// Returns true if the model reported `category`.
    pub fn contains(&self, category: &str) -> bool {
        self.scores.contains_key(category)
    }

    /// Number of reported categories.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns true if no category was reported.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Iterates over reported categories.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.scores.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f32)> for ToxicityScores {
    fn from_iter<I: IntoIterator<Item = (K, f32)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Polarity of a sentiment prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentPolarity {
    Negative,
    Neutral,
    Positive,
}

impl SentimentPolarity {
    /// Interprets a model label name such as `NEGATIVE` or `neg`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "negative" | "neg" => Some(SentimentPolarity::Negative),
            "neutral" | "neu" => Some(SentimentPolarity::Neutral),
            "positive" | "pos" => Some(SentimentPolarity::Positive),
            _ => None,
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentPolarity::Negative => "negative",
            SentimentPolarity::Neutral => "neutral",
            SentimentPolarity::Positive => "positive",
        }
    }
}

impl fmt::Display for SentimentPolarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top sentiment prediction for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Label name as reported by the model.
    pub label: String,
    /// Interpreted polarity.
    pub polarity: SentimentPolarity,
    /// Confidence of the top label (0.0 to 1.0).
    pub score: f32,
}

impl SentimentResult {
    /// Creates a new sentiment result.
    pub fn new(label: impl Into<String>, polarity: SentimentPolarity, score: f32) -> Self {
        Self {
            label: label.into(),
            polarity,
            score: score.clamp(0.0, 1.0),
        }
    }

    /// Returns true if the prediction is negative.
    pub fn is_negative(&self) -> bool {
        self.polarity == SentimentPolarity::Negative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_category_reads_zero() {
        let scores: ToxicityScores = [(TOXIC, 0.7)].into_iter().collect();
        assert_eq!(scores.get(TOXIC), 0.7);
        assert_eq!(scores.get(THREAT), 0.0);
        assert!(!scores.contains(THREAT));
        assert_eq!(scores.len(), 1);
    }

    #[test]
    fn empty_scores() {
        let scores = ToxicityScores::new();
        assert!(scores.is_empty());
        assert_eq!(scores.get(SEVERE_TOXIC), 0.0);
    }

    #[test]
    fn scores_serialize_as_plain_map() {
        let scores: ToxicityScores = [("insult", 0.25)].into_iter().collect();
        let json = serde_json::to_value(&scores).unwrap();
        assert_eq!(json["insult"], 0.25);
    }

    #[test]
    fn polarity_from_label_names() {
        assert_eq!(
            SentimentPolarity::from_label("NEGATIVE"),
            Some(SentimentPolarity::Negative)
        );
        assert_eq!(
            SentimentPolarity::from_label("neutral"),
            Some(SentimentPolarity::Neutral)
        );
        assert_eq!(
            SentimentPolarity::from_label(" Positive "),
            Some(SentimentPolarity::Positive)
        );
        assert_eq!(SentimentPolarity::from_label("LABEL_0"), None);
    }

    #[test]
    fn sentiment_result_clamps_score() {
        let result = SentimentResult::new("NEGATIVE", SentimentPolarity::Negative, 1.4);
        assert_eq!(result.score, 1.0);
        assert!(result.is_negative());
    }
}
