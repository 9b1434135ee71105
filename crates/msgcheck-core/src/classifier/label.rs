//! Moderation labels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Final moderation label for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Severely toxic content.
    Dangerous,
    /// Insulting, obscene or otherwise toxic content.
    Abusive,
    /// Threatening content.
    Harassment,
    /// Negative tone dressed up with positive wording.
    Sarcasm,
    /// Nothing to flag.
    Safe,
}

impl Label {
    /// Returns all labels.
    pub fn all() -> &'static [Label] {
        &[
            Label::Dangerous,
            Label::Abusive,
            Label::Harassment,
            Label::Sarcasm,
            Label::Safe,
        ]
    }

    /// Wire name of this label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Dangerous => "dangerous",
            Label::Abusive => "abusive",
            Label::Harassment => "harassment",
            Label::Sarcasm => "sarcasm",
            Label::Safe => "safe",
        }
    }

    /// Returns true for labels produced by the toxic branch.
    pub fn is_toxic(&self) -> bool {
        matches!(self, Label::Dangerous | Label::Abusive | Label::Harassment)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
