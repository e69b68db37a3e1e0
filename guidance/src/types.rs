//! Core types shared across the guidance pipeline.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A historical counseling Q&A pair from the corpus.
///
/// Immutable once loaded. The serde aliases accept the field names used by
/// the public CounselChat dataset exports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalExample {
    /// Stable identifier. Loaders fall back to a content hash when the
    /// source record has no id.
    #[serde(default, alias = "questionID")]
    pub id: String,
    /// The patient's question.
    #[serde(alias = "questionText")]
    pub question_text: String,
    /// The therapist's answer.
    #[serde(alias = "answerText")]
    pub answer_text: String,
    /// Topic tag from the corpus, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upvotes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<i64>,
}

/// A retrieved example carrying its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredExample {
    #[serde(flatten)]
    pub example: HistoricalExample,
    /// Cosine similarity to the query, higher is closer.
    pub similarity: f32,
}

/// Arg-max topic prediction over the fixed taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicPrediction {
    pub label: String,
    /// Confidence in `[0.0, 1.0]`. Advisory only.
    pub confidence: f32,
}

/// Sentiment polarity derived from the sign of the lexicon score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
            Polarity::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// Result of lexicon sentiment scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SentimentResult {
    /// Positive-word occurrences minus negative-word occurrences.
    pub score: i32,
    pub polarity: Polarity,
}

/// The complete output of one guidance request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceResult {
    pub generated_advice: String,
    pub predicted_topic: String,
    pub topic_confidence: f32,
    pub sentiment: Polarity,
    pub sentiment_score: i32,
    pub historical_examples: Vec<ScoredExample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_profile: Option<BTreeMap<String, String>>,
}

/// A single message in a counseling chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
}

/// A chat session transcript, archived by the chat adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(session_id: impl Into<String>, patient_id: Option<String>) -> Self {
        let now = Utc::now();
        Conversation {
            session_id: session_id.into(),
            patient_id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message and bump `updated_at`.
    pub fn push_message(&mut self, content: impl Into<String>, is_user: bool) {
        let now = Utc::now();
        self.messages.push(ChatMessage {
            content: content.into(),
            is_user,
            timestamp: now,
        });
        self.updated_at = now;
    }
}
