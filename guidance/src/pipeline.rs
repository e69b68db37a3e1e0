//! The guidance orchestrator.
//!
//! One call runs the whole pipeline for the counselor's latest message:
//! topic classification, sentiment scoring and retrieval (all over the
//! latest message only), context assembly and advice generation. Retrieval
//! is the only stage allowed to degrade; every other failure propagates to
//! the adapter.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::advice::AdviceGenerator;
use crate::error::GuidanceError;
use crate::retrieval::Retriever;
use crate::sentiment::score_sentiment;
use crate::topics::TopicClassifier;
use crate::types::{GuidanceResult, ScoredExample, SentimentResult, TopicPrediction};

/// Default number of examples retrieved per request.
pub const DEFAULT_TOP_K: usize = 3;

/// Render a patient profile as "key: value" lines, in key order.
pub fn format_profile(profile: &BTreeMap<String, String>) -> String {
    profile
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The assembled analysis for one request. Built fresh per call, fed to the
/// generator through [`AnalysisContext::render`], never persisted.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub profile: String,
    pub history: String,
    pub latest_message: String,
    pub topic: TopicPrediction,
    pub sentiment: SentimentResult,
}

impl AnalysisContext {
    /// Produce the single text block handed to advice generation.
    pub fn render(&self) -> String {
        let mut sections = Vec::new();
        if !self.profile.is_empty() {
            sections.push(format!("Patient profile:\n{}", self.profile));
        }
        if !self.history.trim().is_empty() {
            sections.push(format!("Conversation so far:\n{}", self.history.trim()));
        }
        sections.push(format!("Latest message:\n{}", self.latest_message));
        sections.push(format!(
            "Detected topic: {} (confidence {:.2})",
            self.topic.label, self.topic.confidence
        ));
        sections.push(format!(
            "Detected sentiment: {} (score {})",
            self.sentiment.polarity, self.sentiment.score
        ));
        sections.join("\n\n")
    }
}

/// Ties the pipeline stages together.
pub struct GuidanceEngine {
    retriever: Retriever,
    classifier: TopicClassifier,
    generator: AdviceGenerator,
    top_k: usize,
}

impl GuidanceEngine {
    pub fn new(
        retriever: Retriever,
        classifier: TopicClassifier,
        generator: AdviceGenerator,
    ) -> Self {
        Self {
            retriever,
            classifier,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Run the full pipeline for one counselor message.
    ///
    /// Analysis and retrieval look at `user_input` only; the profile and
    /// history are carried into the generation context verbatim. If the
    /// vector index is unreachable the request proceeds with an empty
    /// example set and a warning; any other failure aborts the request.
    pub async fn generate_guidance(
        &self,
        user_input: &str,
        patient_profile: Option<&BTreeMap<String, String>>,
        conversation_history: &str,
    ) -> Result<GuidanceResult, GuidanceError> {
        let (topic, retrieved) = futures::join!(
            self.classifier.classify(user_input),
            self.retriever.retrieve(user_input, self.top_k),
        );
        let topic = topic?;
        let sentiment = score_sentiment(user_input);

        let examples: Vec<ScoredExample> = match retrieved {
            Ok(examples) => examples,
            Err(GuidanceError::RetrievalUnavailable(reason)) => {
                log::warn!("Retrieval unavailable, continuing without examples: {reason}");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let context = AnalysisContext {
            profile: patient_profile.map(format_profile).unwrap_or_default(),
            history: conversation_history.to_string(),
            latest_message: user_input.to_string(),
            topic: topic.clone(),
            sentiment,
        };

        let advice = self.generator.generate(&context.render(), &examples).await?;

        Ok(GuidanceResult {
            generated_advice: advice,
            predicted_topic: topic.label,
            topic_confidence: topic.confidence,
            sentiment: sentiment.polarity,
            sentiment_score: sentiment.score,
            historical_examples: examples,
            patient_profile: patient_profile.cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::{ResponseEnvelope, ResponseMessage};
    use crate::corpus::InMemoryExampleStore;
    use crate::embeddings::EmbeddingProvider;
    use crate::llm::ChatModel;
    use crate::store::{DEFAULT_NAMESPACE, IndexEntry, VectorIndex};
    use crate::topics::TopicScorer;
    use crate::types::{HistoricalExample, Polarity};
    use async_trait::async_trait;

    struct StubEmbeddings;

    #[async_trait]
    impl EmbeddingProvider for StubEmbeddings {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, GuidanceError> {
            Ok(vec![1.0, 0.0, 0.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GuidanceError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    /// Always predicts "anxiety" with fixed confidence.
    struct AnxietyScorer;

    #[async_trait]
    impl TopicScorer for AnxietyScorer {
        async fn score(&self, _text: &str, labels: &[&str]) -> Result<Vec<f32>, GuidanceError> {
            let mut scores = vec![0.0; labels.len()];
            if let Some(i) = labels.iter().position(|l| *l == "anxiety") {
                scores[i] = 0.9;
            }
            Ok(scores)
        }
    }

    /// Echoes its prompt back so tests can inspect the rendered context.
    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn invoke(&self, prompt: &str) -> Result<ResponseEnvelope, GuidanceError> {
            Ok(ResponseEnvelope::Message(ResponseMessage {
                role: Some("assistant".to_string()),
                content: Some(prompt.to_string()),
            }))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn invoke(&self, _prompt: &str) -> Result<ResponseEnvelope, GuidanceError> {
            Err(GuidanceError::Generation("backend down".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    async fn engine_with_model(
        dir: &tempfile::TempDir,
        model: Arc<dyn ChatModel>,
        seed_index: bool,
    ) -> GuidanceEngine {
        let path = dir.path().join("index.lance");
        let index = Arc::new(VectorIndex::open(path.to_str().unwrap(), 4).await.unwrap());
        if seed_index {
            index
                .upsert(
                    &[IndexEntry {
                        id: "q1".to_string(),
                        topic: "anxiety".to_string(),
                    }],
                    vec![vec![1.0, 0.0, 0.0, 0.0]],
                    DEFAULT_NAMESPACE,
                )
                .await
                .unwrap();
        }

        let store = Arc::new(InMemoryExampleStore::new([HistoricalExample {
            id: "q1".to_string(),
            question_text: "I worry all the time".to_string(),
            answer_text: "Naming the worry can shrink it".to_string(),
            topic: Some("anxiety".to_string()),
            upvotes: None,
            views: None,
        }]));

        let retriever = Retriever::new(Arc::new(StubEmbeddings), index, store);
        let classifier = TopicClassifier::new(Arc::new(AnxietyScorer));
        let generator = AdviceGenerator::new(model);
        GuidanceEngine::new(retriever, classifier, generator)
    }

    #[test]
    fn test_format_profile_lines() {
        let mut profile = BTreeMap::new();
        profile.insert("age".to_string(), "34".to_string());
        profile.insert("occupation".to_string(), "nurse".to_string());
        assert_eq!(format_profile(&profile), "age: 34\noccupation: nurse");
    }

    #[test]
    fn test_context_render_skips_empty_sections() {
        let context = AnalysisContext {
            profile: String::new(),
            history: String::new(),
            latest_message: "I feel stuck".to_string(),
            topic: TopicPrediction {
                label: "anxiety".to_string(),
                confidence: 0.9,
            },
            sentiment: score_sentiment("I feel stuck"),
        };
        let rendered = context.render();
        assert!(rendered.starts_with("Latest message:"));
        assert!(!rendered.contains("Patient profile:"));
        assert!(!rendered.contains("Conversation so far:"));
        assert!(rendered.contains("Detected topic: anxiety (confidence 0.90)"));
    }

    #[tokio::test]
    async fn test_full_pipeline_merges_result() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_model(&dir, Arc::new(EchoModel), true).await;

        let mut profile = BTreeMap::new();
        profile.insert("age".to_string(), "29".to_string());

        let result = engine
            .generate_guidance("I feel sad and bad", Some(&profile), "Counselor: hello\n")
            .await
            .unwrap();

        assert_eq!(result.predicted_topic, "anxiety");
        assert!((result.topic_confidence - 0.9).abs() < 1e-6);
        assert_eq!(result.sentiment, Polarity::Negative);
        assert_eq!(result.sentiment_score, -2);
        assert_eq!(result.historical_examples.len(), 1);
        assert_eq!(result.patient_profile, Some(profile));

        // The echoed prompt shows the assembled context reached generation.
        assert!(result.generated_advice.contains("age: 29"));
        assert!(result.generated_advice.contains("Conversation so far:"));
        assert!(result.generated_advice.contains("Latest message:\nI feel sad and bad"));
        assert!(result.generated_advice.contains("Patient: I worry all the time"));
    }

    #[tokio::test]
    async fn test_empty_index_still_generates() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_model(&dir, Arc::new(EchoModel), false).await;

        let result = engine.generate_guidance("I feel stuck", None, "").await.unwrap();
        assert!(result.historical_examples.is_empty());
        assert!(result
            .generated_advice
            .contains("(no similar historical examples found)"));
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_model(&dir, Arc::new(FailingModel), true).await;

        let err = engine
            .generate_guidance("I feel stuck", None, "")
            .await
            .unwrap_err();
        assert!(matches!(err, GuidanceError::Generation(_)));
    }

    struct UnavailableEmbeddings;

    #[async_trait]
    impl EmbeddingProvider for UnavailableEmbeddings {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, GuidanceError> {
            Err(GuidanceError::RetrievalUnavailable("index offline".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, GuidanceError> {
            Err(GuidanceError::RetrievalUnavailable("index offline".to_string()))
        }

        fn dimensions(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "unavailable"
        }
    }

    #[tokio::test]
    async fn test_retrieval_unavailable_degrades_to_empty_examples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.lance");
        let index = Arc::new(VectorIndex::open(path.to_str().unwrap(), 4).await.unwrap());
        let store = Arc::new(InMemoryExampleStore::default());
        let retriever = Retriever::new(Arc::new(UnavailableEmbeddings), index, store);
        let classifier = TopicClassifier::new(Arc::new(AnxietyScorer));
        let generator = AdviceGenerator::new(Arc::new(EchoModel));
        let engine = GuidanceEngine::new(retriever, classifier, generator);

        let result = engine.generate_guidance("I feel stuck", None, "").await.unwrap();
        assert!(result.historical_examples.is_empty());
        assert_eq!(result.predicted_topic, "anxiety");
    }
}
