//! Sentiment labels and commentary

use serde::Serialize;

/// Known sentiment classes, keyed by the integer id the classifiers emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Negative,
    Positive,
    Neutral,
}

impl Sentiment {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Sentiment::Negative),
            1 => Some(Sentiment::Positive),
            2 => Some(Sentiment::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Negative => "Negative",
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
        }
    }
}

/// Display name for a class id; unknown ids pass through as their number
pub fn label_name(id: i64) -> String {
    match Sentiment::from_id(id) {
        Some(sentiment) => sentiment.as_str().to_string(),
        None => id.to_string(),
    }
}

/// Note shown next to a single-text prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Commentary {
    Caution,
    Congratulation,
    Informational,
}

impl Commentary {
    /// Pick the note by display label, ignoring case
    pub fn for_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("negative") {
            Commentary::Caution
        } else if label.eq_ignore_ascii_case("positive") {
            Commentary::Congratulation
        } else {
            Commentary::Informational
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Commentary::Caution => "Negative sentiment. This review needs further attention.",
            Commentary::Congratulation => "Positive sentiment! Good news for the app's development!",
            Commentary::Informational => "Neutral sentiment, or no sentiment detected.",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Commentary::Caution => "⚠️",
            Commentary::Congratulation => "🎉",
            Commentary::Informational => "ℹ️",
        }
    }
}
