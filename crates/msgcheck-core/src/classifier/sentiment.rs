//! Sentiment scoring.
//!
//! The ONNX scorer targets single-label polarity models such as
//! `cardiffnlp/twitter-roberta-base-sentiment`. Older exports of that model
//! name their classes `LABEL_0..LABEL_2`; those are mapped by index.

use super::{ModelPaths, Result, SentimentPolarity, SentimentResult};

#[cfg(feature = "ml")]
use super::onnx::{softmax, TextClassificationModel};
#[cfg(feature = "ml")]
use super::toxicity::bundle_name;
#[cfg(any(feature = "ml", test))]
use super::ClassifierError;

/// Produces the top sentiment prediction for a text.
pub trait SentimentScorer: Send {
    /// Scores the given text.
    fn score(&mut self, text: &str) -> Result<SentimentResult>;

    /// Returns the name of this scorer for logging/debugging.
    fn name(&self) -> &str;
}

/// Maps model label names to polarities.
///
/// Named labels win; generic `LABEL_n` names fall back to the index order
/// used by 2-way (negative, positive) and 3-way (negative, neutral,
/// positive) heads.
#[cfg(any(feature = "ml", test))]
pub(crate) fn polarities_for(labels: &[String]) -> Result<Vec<SentimentPolarity>> {
    let by_index: &[SentimentPolarity] = match labels.len() {
        2 => &[SentimentPolarity::Negative, SentimentPolarity::Positive],
        3 => &[
            SentimentPolarity::Negative,
            SentimentPolarity::Neutral,
            SentimentPolarity::Positive,
        ],
        _ => &[],
    };

    labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            SentimentPolarity::from_label(label)
                .or_else(|| {
                    let generic = label.strip_prefix("LABEL_")?.parse::<usize>().ok()?;
                    (generic == i).then(|| by_index.get(i).copied()).flatten()
                })
                .ok_or_else(|| {
                    ClassifierError::InvalidConfig(format!(
                        "cannot interpret sentiment label '{}'",
                        label
                    ))
                })
        })
        .collect()
}

/// Sentiment scorer backed by an ONNX model bundle.
#[cfg(feature = "ml")]
pub struct OnnxSentimentScorer {
    model: TextClassificationModel,
    polarities: Vec<SentimentPolarity>,
    name: String,
}

#[cfg(feature = "ml")]
impl OnnxSentimentScorer {
    /// Loads the model bundle.
    ///
    /// Fails when a label cannot be mapped to a polarity.
    pub fn new(paths: ModelPaths) -> Result<Self> {
        let model = TextClassificationModel::load(&paths)?;
        let polarities = polarities_for(model.labels())?;

        Ok(Self {
            model,
            polarities,
            name: bundle_name(&paths),
        })
    }

    /// Attempts to load the scorer, returning None on failure.
    pub fn try_load(paths: ModelPaths) -> Option<Self> {
        match Self::new(paths) {
            Ok(scorer) => Some(scorer),
            Err(e) => {
                tracing::warn!("Sentiment model unavailable: {}", e);
                None
            }
        }
    }
}

#[cfg(feature = "ml")]
impl SentimentScorer for OnnxSentimentScorer {
    fn score(&mut self, text: &str) -> Result<SentimentResult> {
        let probabilities = softmax(&self.model.logits(text)?);

        let (index, score) = probabilities
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or_else(|| ClassifierError::InferenceError("empty logits".to_string()))?;

        Ok(SentimentResult::new(
            self.model.labels()[index].clone(),
            self.polarities[index],
            score,
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Stub scorer when ML feature is not enabled.
#[cfg(not(feature = "ml"))]
pub struct OnnxSentimentScorer {
    _paths: ModelPaths,
}

#[cfg(not(feature = "ml"))]
impl OnnxSentimentScorer {
    /// Creates a stub scorer (ML feature not enabled).
    pub fn new(_paths: ModelPaths) -> Result<Self> {
        Err(super::ClassifierError::MlNotEnabled)
    }

    /// Attempts to load the scorer (always returns None when ML is disabled).
    pub fn try_load(_paths: ModelPaths) -> Option<Self> {
        None
    }
}

#[cfg(not(feature = "ml"))]
impl SentimentScorer for OnnxSentimentScorer {
    fn score(&mut self, _text: &str) -> Result<SentimentResult> {
        Err(super::ClassifierError::MlNotEnabled)
    }

    fn name(&self) -> &str {
        "onnx-sentiment (disabled)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn named_labels_map_directly() {
        let polarities = polarities_for(&labels(&["negative", "neutral", "positive"])).unwrap();
        assert_eq!(
            polarities,
            vec![
                SentimentPolarity::Negative,
                SentimentPolarity::Neutral,
                SentimentPolarity::Positive
            ]
        );
    }

    #[test]
    fn generic_labels_map_by_index() {
        let three = polarities_for(&labels(&["LABEL_0", "LABEL_1", "LABEL_2"])).unwrap();
        assert_eq!(three[0], SentimentPolarity::Negative);
        assert_eq!(three[2], SentimentPolarity::Positive);

        let two = polarities_for(&labels(&["LABEL_0", "LABEL_1"])).unwrap();
        assert_eq!(
            two,
            vec![SentimentPolarity::Negative, SentimentPolarity::Positive]
        );
    }

    #[test]
    fn unknown_labels_are_rejected() {
        assert!(polarities_for(&labels(&["joy", "anger"])).is_err());
        assert!(polarities_for(&labels(&["LABEL_0", "LABEL_1", "LABEL_2", "LABEL_3"])).is_err());
    }

    #[test]
    fn try_load_returns_none_when_model_missing() {
        let scorer = OnnxSentimentScorer::try_load(ModelPaths::in_dir("nonexistent/sentiment"));
        assert!(scorer.is_none());
    }
}
