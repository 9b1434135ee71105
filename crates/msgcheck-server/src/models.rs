//! API request and response models.

use msgcheck_core::classifier::{Classification, SentimentPolarity};
use msgcheck_core::Label;
use serde::{Deserialize, Deserializer, Serialize};

/// Request body for POST /classify.
///
/// A missing or non-string field is read as absent. `text` takes
/// precedence over `message` when both are sent.
#[derive(Debug, Default, Deserialize)]
pub struct ClassifyRequest {
    /// The message to classify.
    #[serde(default, deserialize_with = "lenient_text")]
    text: Option<String>,
    /// Field name used by the web frontend.
    #[serde(default, deserialize_with = "lenient_text")]
    message: Option<String>,
}

impl ClassifyRequest {
    /// Creates a request for the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            message: None,
        }
    }

    /// The text to classify, or an empty string when none was sent.
    pub fn text(&self) -> &str {
        self.text
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or_default()
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

/// Response body for POST /classify.
#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    /// Moderation label.
    pub label: Label,
    /// Checks that decided the label.
    pub reasons: Vec<String>,
    /// Sentiment polarity, when the sentiment model ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentPolarity>,
}

impl From<Classification> for ClassifyResponse {
    fn from(c: Classification) -> Self {
        Self {
            label: c.label,
            reasons: c.reasons,
            sentiment: c.sentiment.map(|s| s.polarity),
        }
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` once the server is answering.
    pub status: &'static str,
    /// Name of the loaded toxicity model.
    pub toxicity_model: String,
    /// Name of the loaded sentiment model.
    pub sentiment_model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ClassifyRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn text_field_is_read() {
        assert_eq!(parse(r#"{"text": "hello"}"#).text(), "hello");
    }

    #[test]
    fn message_field_is_read() {
        assert_eq!(parse(r#"{"message": "hi there"}"#).text(), "hi there");
    }

    #[test]
    fn text_wins_over_message() {
        let req = parse(r#"{"text": "you idiot", "message": "hi"}"#);
        assert_eq!(req.text(), "you idiot");
        let req = parse(r#"{"message": "hi", "text": "you idiot"}"#);
        assert_eq!(req.text(), "you idiot");
    }

    #[test]
    fn non_string_text_falls_back_to_message() {
        assert_eq!(parse(r#"{"text": 5, "message": "hi"}"#).text(), "hi");
    }

    #[test]
    fn missing_or_malformed_text_is_empty() {
        assert_eq!(parse("{}").text(), "");
        assert_eq!(parse(r#"{"text": null}"#).text(), "");
        assert_eq!(parse(r#"{"text": 42}"#).text(), "");
        assert_eq!(parse(r#"{"text": ["a"]}"#).text(), "");
        assert_eq!(parse(r#"{"other": "x"}"#).text(), "");
        assert_eq!(ClassifyRequest::new("direct").text(), "direct");
    }

    #[test]
    fn response_omits_missing_sentiment() {
        let response = ClassifyResponse {
            label: Label::Dangerous,
            reasons: vec!["toxic score 0.90 exceeds 0.50".to_string()],
            sentiment: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["label"], "dangerous");
        assert!(json.get("sentiment").is_none());
    }
}
