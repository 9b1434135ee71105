//! Threshold cascade over toxicity and sentiment scores.
//!
//! Checks run in a fixed order and the first one that fires decides the label:
//!
//! 1. `toxic` above its threshold enters the toxic branch:
//!    `severe_toxic` → Dangerous, `insult`/`obscene` → Abusive,
//!    `threat` → Harassment, otherwise Abusive.
//! 2. Otherwise the sentiment model runs. Negative sentiment on a message
//!    containing [`SARCASM_MARKER`] is Sarcasm, anything else is Safe.
//!
//! Every comparison is strict (`>`).

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    Label, Result, SentimentResult, SentimentScorer, ToxicityScorer, ToxicityScores, INSULT,
    OBSCENE, SEVERE_TOXIC, THREAT, TOXIC,
};

/// Lowercase phrase that turns negative sentiment into sarcasm.
pub const SARCASM_MARKER: &str = "positive words";

/// Probability thresholds for the toxic branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Entry into the toxic branch (default: 0.5).
    pub toxic: f32,
    /// Dangerous (default: 0.3).
    pub severe_toxic: f32,
    /// Abusive via insult (default: 0.3).
    pub insult: f32,
    /// Abusive via obscenity (default: 0.3).
    pub obscene: f32,
    /// Harassment (default: 0.2).
    pub threat: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            toxic: 0.5,
            severe_toxic: 0.3,
            insult: 0.3,
            obscene: 0.3,
            threat: 0.2,
        }
    }
}

/// Outcome of classifying one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Final label.
    pub label: Label,
    /// Which checks fired, in order.
    pub reasons: Vec<String>,
    /// Raw toxicity scores.
    pub toxicity: ToxicityScores,
    /// Sentiment prediction, only present when the toxic branch was not taken.
    pub sentiment: Option<SentimentResult>,
    /// Classification duration in microseconds.
    pub duration_us: u64,
}

/// Resolves the toxic branch. Returns `None` when the message is not toxic.
pub fn decide_toxic(scores: &ToxicityScores, thresholds: &Thresholds) -> Option<Label> {
    toxic_branch(scores, thresholds).map(|(label, _)| label)
}

/// Resolves the non-toxic branch from the sentiment prediction.
pub fn decide_sentiment(sentiment: &SentimentResult, text: &str) -> Label {
    if is_sarcastic(sentiment, text) {
        Label::Sarcasm
    } else {
        Label::Safe
    }
}

fn is_sarcastic(sentiment: &SentimentResult, text: &str) -> bool {
    sentiment.is_negative() && text.to_lowercase().contains(SARCASM_MARKER)
}

fn exceeds(reasons: &mut Vec<String>, name: &str, score: f32, threshold: f32) -> bool {
    let fired = score > threshold;
    if fired {
        reasons.push(format!(
            "{} score {:.2} exceeds {:.2}",
            name, score, threshold
        ));
    }
    fired
}

fn toxic_branch(scores: &ToxicityScores, t: &Thresholds) -> Option<(Label, Vec<String>)> {
    let mut reasons = Vec::new();

    if !exceeds(&mut reasons, TOXIC, scores.get(TOXIC), t.toxic) {
        return None;
    }

    let label = if exceeds(&mut reasons, SEVERE_TOXIC, scores.get(SEVERE_TOXIC), t.severe_toxic) {
        Label::Dangerous
    } else if exceeds(&mut reasons, INSULT, scores.get(INSULT), t.insult)
        || exceeds(&mut reasons, OBSCENE, scores.get(OBSCENE), t.obscene)
    {
        Label::Abusive
    } else if exceeds(&mut reasons, THREAT, scores.get(THREAT), t.threat) {
        Label::Harassment
    } else {
        reasons.push("no toxicity sub-category exceeded its threshold".to_string());
        Label::Abusive
    };

    Some((label, reasons))
}

/// Combines a toxicity scorer and a sentiment scorer into a moderation label.
///
/// Scorer failures are returned as-is; there is no fallback label.
pub struct MessageClassifier {
    toxicity: Box<dyn ToxicityScorer>,
    sentiment: Box<dyn SentimentScorer>,
    thresholds: Thresholds,
}

impl MessageClassifier {
    /// Creates a classifier with the default thresholds.
    pub fn new(toxicity: Box<dyn ToxicityScorer>, sentiment: Box<dyn SentimentScorer>) -> Self {
        Self::with_thresholds(toxicity, sentiment, Thresholds::default())
    }

    /// Creates a classifier with custom thresholds.
    pub fn with_thresholds(
        toxicity: Box<dyn ToxicityScorer>,
        sentiment: Box<dyn SentimentScorer>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            toxicity,
            sentiment,
            thresholds,
        }
    }

    /// Classifies `text` into a single label.
    pub fn classify(&mut self, text: &str) -> Result<Label> {
        Ok(self.classify_detailed(text)?.label)
    }

    /// Classifies `text` and reports the scores and checks behind the label.
    pub fn classify_detailed(&mut self, text: &str) -> Result<Classification> {
        let start = Instant::now();
        let toxicity = self.toxicity.score(text)?;

        let (label, reasons, sentiment) = match toxic_branch(&toxicity, &self.thresholds) {
            Some((label, reasons)) => (label, reasons, None),
            None => {
                let sentiment = self.sentiment.score(text)?;
                let label = decide_sentiment(&sentiment, text);
                let reason = match label {
                    Label::Sarcasm => format!(
                        "{} sentiment with \"{}\"",
                        sentiment.polarity, SARCASM_MARKER
                    ),
                    _ => format!("not toxic, {} sentiment", sentiment.polarity),
                };
                (label, vec![reason], Some(sentiment))
            }
        };

        let duration_us = start.elapsed().as_micros() as u64;
        debug!(
            text_len = text.len(),
            %label,
            duration_us,
            "Classified message"
        );

        Ok(Classification {
            label,
            reasons,
            toxicity,
            sentiment,
            duration_us,
        })
    }

    /// Returns the configured thresholds.
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Name of the toxicity scorer.
    pub fn toxicity_model(&self) -> &str {
        self.toxicity.name()
    }

    /// Name of the sentiment scorer.
    pub fn sentiment_model(&self) -> &str {
        self.sentiment.name()
    }
}
