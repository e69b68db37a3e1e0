//! Advice generation: prompt assembly and response normalization.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::GuidanceError;
use crate::llm::ChatModel;
use crate::types::ScoredExample;

/// At most this many retrieved examples are rendered into the prompt.
pub const MAX_PROMPT_EXAMPLES: usize = 3;

/// The shapes a chat backend may hand back for one completion.
///
/// Providers disagree on whether a completion is a bare string, a single
/// message object or a list of messages. Everything funnels through
/// [`ResponseEnvelope::into_text`] so the rest of the pipeline only ever
/// sees plain advice text.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Text(String),
    Message(ResponseMessage),
    Messages(Vec<ResponseMessage>),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl ResponseEnvelope {
    /// Normalize the envelope to advice text.
    ///
    /// A list takes its first message. Empty or whitespace-only content is
    /// malformed, as is an empty list or a message without content.
    pub fn into_text(self) -> Result<String, GuidanceError> {
        let content = match self {
            ResponseEnvelope::Text(text) => Some(text),
            ResponseEnvelope::Message(message) => message.content,
            ResponseEnvelope::Messages(messages) => match messages.into_iter().next() {
                Some(message) => message.content,
                None => {
                    return Err(GuidanceError::MalformedEnvelope(
                        "Empty message list".to_string(),
                    ))
                }
            },
        };

        match content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            Some(_) => Err(GuidanceError::MalformedEnvelope(
                "Blank completion text".to_string(),
            )),
            None => Err(GuidanceError::MalformedEnvelope(
                "Message without content".to_string(),
            )),
        }
    }
}

/// Builds the counselor prompt and runs it through a chat model.
pub struct AdviceGenerator {
    model: Arc<dyn ChatModel>,
}

impl AdviceGenerator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Render the prompt for a context block and retrieved examples.
    pub fn build_prompt(&self, context: &str, examples: &[ScoredExample]) -> String {
        let mut rendered = String::new();
        for scored in examples.iter().take(MAX_PROMPT_EXAMPLES) {
            rendered.push_str(&format!(
                "Patient: {}\nTherapist: {}\n\n",
                scored.example.question_text, scored.example.answer_text
            ));
        }
        if rendered.is_empty() {
            rendered.push_str("(no similar historical examples found)\n\n");
        }

        format!(
            "You are a mental health counselor. Based on the following examples, \
             suggest advice.\n\
             Examples:\n\
             {rendered}\
             New Query: {context}\n\n\
             Respond using the following structure:\n\
             Advice: <clear recommendation>\n\
             Rationale: <brief justification>\n\
             Suggested Actions: <numbered steps>"
        )
    }

    /// Generate advice text. Failures propagate; there is no fallback text
    /// at this layer.
    pub async fn generate(
        &self,
        context: &str,
        examples: &[ScoredExample],
    ) -> Result<String, GuidanceError> {
        let prompt = self.build_prompt(context, examples);
        log::debug!(
            "Generating advice with {} ({} prompt chars)",
            self.model.model_name(),
            prompt.len()
        );
        let envelope = self.model.invoke(&prompt).await?;
        envelope.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HistoricalExample;
    use async_trait::async_trait;

    fn scored(q: &str, a: &str, similarity: f32) -> ScoredExample {
        ScoredExample {
            example: HistoricalExample {
                id: "x".to_string(),
                question_text: q.to_string(),
                answer_text: a.to_string(),
                topic: None,
                upvotes: None,
                views: None,
            },
            similarity,
        }
    }

    #[test]
    fn test_envelope_plain_string() {
        let env: ResponseEnvelope = serde_json::from_str("\"take a walk\"").unwrap();
        assert_eq!(env.into_text().unwrap(), "take a walk");
    }

    #[test]
    fn test_envelope_message_object() {
        let env: ResponseEnvelope =
            serde_json::from_str(r#"{"role": "assistant", "content": "breathe slowly"}"#).unwrap();
        assert_eq!(env.into_text().unwrap(), "breathe slowly");
    }

    #[test]
    fn test_envelope_message_list_takes_first() {
        let env: ResponseEnvelope =
            serde_json::from_str(r#"[{"content": "first"}, {"content": "second"}]"#).unwrap();
        assert_eq!(env.into_text().unwrap(), "first");
    }

    #[test]
    fn test_envelope_blank_text_is_malformed() {
        let env = ResponseEnvelope::Text("   ".to_string());
        assert!(matches!(
            env.into_text(),
            Err(GuidanceError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_envelope_empty_list_is_malformed() {
        let env = ResponseEnvelope::Messages(Vec::new());
        assert!(matches!(
            env.into_text(),
            Err(GuidanceError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_envelope_message_without_content_is_malformed() {
        let env: ResponseEnvelope = serde_json::from_str(r#"{"role": "assistant"}"#).unwrap();
        assert!(matches!(
            env.into_text(),
            Err(GuidanceError::MalformedEnvelope(_))
        ));
    }

    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn invoke(&self, prompt: &str) -> Result<ResponseEnvelope, GuidanceError> {
            Ok(ResponseEnvelope::Text(prompt.to_string()))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn test_prompt_caps_examples_at_three() {
        let generator = AdviceGenerator::new(Arc::new(EchoModel));
        let examples: Vec<_> = (0..5)
            .map(|i| scored(&format!("q{i}"), &format!("a{i}"), 0.9))
            .collect();
        let prompt = generator.build_prompt("I feel stuck", &examples);
        assert!(prompt.contains("Patient: q2"));
        assert!(!prompt.contains("Patient: q3"));
    }

    #[test]
    fn test_prompt_structure() {
        let generator = AdviceGenerator::new(Arc::new(EchoModel));
        let prompt = generator.build_prompt("I feel stuck", &[scored("q", "a", 0.8)]);
        assert!(prompt.starts_with("You are a mental health counselor."));
        assert!(prompt.contains("Patient: q\nTherapist: a"));
        assert!(prompt.contains("New Query: I feel stuck"));
        assert!(prompt.contains("Advice: <clear recommendation>"));
        assert!(prompt.contains("Suggested Actions: <numbered steps>"));
    }

    #[test]
    fn test_prompt_without_examples_notes_absence() {
        let generator = AdviceGenerator::new(Arc::new(EchoModel));
        let prompt = generator.build_prompt("I feel stuck", &[]);
        assert!(prompt.contains("(no similar historical examples found)"));
    }

    #[tokio::test]
    async fn test_generate_normalizes_through_model() {
        let generator = AdviceGenerator::new(Arc::new(EchoModel));
        let text = generator.generate("context", &[]).await.unwrap();
        assert!(text.contains("New Query: context"));
    }
}
