//! Topic classification over the counseling taxonomy.
//!
//! The taxonomy is frozen configuration data: labels, their spelling and
//! their order are all significant. Scoring happens through a zero-shot
//! classification endpoint; the classifier reduces the returned distribution
//! to an arg-max, breaking ties toward the earlier taxonomy entry.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GuidanceError;
use crate::types::TopicPrediction;

/// The counseling topic taxonomy, in tie-break priority order.
pub const TOPIC_LABELS: [&str; 31] = [
    "addiction",
    "anger-management",
    "anxiety",
    "behavioral-change",
    "children-adolescents",
    "counseling-fundamentals",
    "depression",
    "diagnosis",
    "domestic-violence",
    "eating-disorders",
    "family-conflict",
    "grief-and-loss",
    "human-sexuality",
    "intimacy",
    "legal-regulatory",
    "lgbtq",
    "marriage",
    "military-issues",
    "parenting",
    "professional-ethics",
    "relationship-dissolution",
    "relationships",
    "self-esteem",
    "self-harm",
    "sleep-improvement",
    "social-relationships",
    "spirituality",
    "stress",
    "substance-abuse",
    "trauma",
    "workplace-relationships",
];

/// Produces one score per candidate label, aligned with the label order
/// passed in.
#[async_trait]
pub trait TopicScorer: Send + Sync {
    async fn score(&self, text: &str, labels: &[&str]) -> Result<Vec<f32>, GuidanceError>;
}

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct ZeroShotResponse {
    labels: Vec<String>,
    scores: Vec<f32>,
}

/// Hugging Face inference-style zero-shot classification client.
pub struct ZeroShotClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ZeroShotClient {
    /// Create a client.
    ///
    /// `endpoint` defaults to "https://api-inference.huggingface.co" and
    /// `model` to "facebook/bart-large-mnli".
    pub fn new(api_key: Option<String>, model: Option<String>, endpoint: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint
                .unwrap_or_else(|| "https://api-inference.huggingface.co".to_string()),
            model: model.unwrap_or_else(|| "facebook/bart-large-mnli".to_string()),
            api_key,
        }
    }
}

#[async_trait]
impl TopicScorer for ZeroShotClient {
    async fn score(&self, text: &str, labels: &[&str]) -> Result<Vec<f32>, GuidanceError> {
        let url = format!("{}/models/{}", self.endpoint, self.model);
        let request = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels: labels,
            },
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        let response = builder
            .send()
            .await
            .map_err(|e| GuidanceError::Classification(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GuidanceError::Classification(format!(
                "Zero-shot endpoint error {status}: {body}"
            )));
        }

        let result: ZeroShotResponse = response
            .json()
            .await
            .map_err(|e| GuidanceError::Classification(format!("Unparseable response: {e}")))?;

        // The endpoint returns labels sorted by score. Re-align to the
        // caller's label order so downstream tie-breaking stays stable.
        let mut scores = vec![0.0_f32; labels.len()];
        for (label, score) in result.labels.iter().zip(result.scores.iter()) {
            match labels.iter().position(|l| l == label) {
                Some(i) => scores[i] = *score,
                None => {
                    return Err(GuidanceError::Classification(format!(
                        "Unknown label in response: {label}"
                    )))
                }
            }
        }
        Ok(scores)
    }
}

/// Reduces a scorer's distribution to a single topic prediction.
pub struct TopicClassifier {
    scorer: Arc<dyn TopicScorer>,
    labels: Vec<&'static str>,
}

impl TopicClassifier {
    /// Classifier over the full counseling taxonomy.
    pub fn new(scorer: Arc<dyn TopicScorer>) -> Self {
        Self {
            scorer,
            labels: TOPIC_LABELS.to_vec(),
        }
    }

    /// Classify a message.
    ///
    /// Ties break toward the earlier taxonomy entry; confidence is clamped
    /// to `[0, 1]`.
    pub async fn classify(&self, text: &str) -> Result<TopicPrediction, GuidanceError> {
        let scores = self.scorer.score(text, &self.labels).await?;
        if scores.len() != self.labels.len() {
            return Err(GuidanceError::Classification(format!(
                "Expected {} scores, got {}",
                self.labels.len(),
                scores.len()
            )));
        }

        let mut best = 0;
        for (i, score) in scores.iter().enumerate() {
            if *score > scores[best] {
                best = i;
            }
        }

        Ok(TopicPrediction {
            label: self.labels[best].to_string(),
            confidence: scores[best].clamp(0.0, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct FixedScorer(Vec<f32>);

    #[async_trait]
    impl TopicScorer for FixedScorer {
        async fn score(&self, _text: &str, _labels: &[&str]) -> Result<Vec<f32>, GuidanceError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_taxonomy_is_frozen() {
        assert_eq!(TOPIC_LABELS.len(), 31);
        assert_eq!(TOPIC_LABELS[0], "addiction");
        assert_eq!(TOPIC_LABELS[30], "workplace-relationships");
        // Sorted order doubles as a duplicate check.
        let mut sorted = TOPIC_LABELS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 31);
    }

    #[tokio::test]
    async fn test_argmax_picks_highest() {
        let mut scores = vec![0.0_f32; 31];
        scores[6] = 0.8; // depression
        scores[2] = 0.1;
        let classifier = TopicClassifier::new(Arc::new(FixedScorer(scores)));
        let prediction = classifier.classify("I feel hopeless").await.unwrap();
        assert_eq!(prediction.label, "depression");
        assert!((prediction.confidence - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_tie_breaks_toward_earlier_label() {
        let mut scores = vec![0.0_f32; 31];
        scores[2] = 0.5; // anxiety
        scores[27] = 0.5; // stress
        let classifier = TopicClassifier::new(Arc::new(FixedScorer(scores)));
        let prediction = classifier.classify("so much pressure").await.unwrap();
        assert_eq!(prediction.label, "anxiety");
    }

    #[tokio::test]
    async fn test_confidence_is_clamped() {
        let mut scores = vec![0.0_f32; 31];
        scores[0] = 1.3;
        let classifier = TopicClassifier::new(Arc::new(FixedScorer(scores)));
        let prediction = classifier.classify("anything").await.unwrap();
        assert_eq!(prediction.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_score_length_mismatch_is_an_error() {
        let classifier = TopicClassifier::new(Arc::new(FixedScorer(vec![0.5, 0.5])));
        let err = classifier.classify("anything").await.unwrap_err();
        assert!(matches!(err, GuidanceError::Classification(_)));
    }
}
