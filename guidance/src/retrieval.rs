//! Semantic retrieval of historical examples.

use std::sync::Arc;

use crate::corpus::ExampleStore;
use crate::embeddings::EmbeddingProvider;
use crate::error::GuidanceError;
use crate::store::{DEFAULT_NAMESPACE, VectorIndex};
use crate::types::ScoredExample;

/// Embeds a query, searches the vector index and resolves the hits back to
/// full examples through the example store.
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    store: Arc<dyn ExampleStore>,
    namespace: String,
}

impl Retriever {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
        store: Arc<dyn ExampleStore>,
    ) -> Self {
        Self {
            provider,
            index,
            store,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Retrieve up to `top_k` examples similar to `query`.
    ///
    /// Index ids with no matching store record are stale; they are dropped
    /// without disturbing the order of the remaining results. Zero matches
    /// is a normal outcome, not an error. No retries happen here: an
    /// unreachable index surfaces as
    /// [`GuidanceError::RetrievalUnavailable`] and the caller decides
    /// whether to degrade.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredExample>, GuidanceError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.provider.embed(query).await?;
        let matches = self.index.query(&vector, top_k, &self.namespace).await?;

        let mut examples = Vec::with_capacity(matches.len());
        for m in matches {
            match self.store.find_by_id(&m.id).await? {
                Some(example) => examples.push(ScoredExample {
                    example,
                    similarity: m.similarity,
                }),
                None => log::debug!("Dropping stale index entry {}", m.id),
            }
        }
        Ok(examples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::InMemoryExampleStore;
    use crate::store::IndexEntry;
    use crate::types::HistoricalExample;
    use async_trait::async_trait;

    /// Maps known phrases to fixed unit vectors.
    struct StubEmbeddings;

    #[async_trait]
    impl EmbeddingProvider for StubEmbeddings {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, GuidanceError> {
            Ok(match text {
                "sleep" => vec![1.0, 0.0, 0.0, 0.0],
                "work" => vec![0.0, 1.0, 0.0, 0.0],
                _ => vec![0.0, 0.0, 1.0, 0.0],
            })
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GuidanceError> {
            let mut out = Vec::new();
            for t in texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn example(id: &str, q: &str) -> HistoricalExample {
        HistoricalExample {
            id: id.to_string(),
            question_text: q.to_string(),
            answer_text: "answer".to_string(),
            topic: None,
            upvotes: None,
            views: None,
        }
    }

    async fn seeded_index(dir: &tempfile::TempDir) -> Arc<VectorIndex> {
        let path = dir.path().join("index.lance");
        let index = VectorIndex::open(path.to_str().unwrap(), 4).await.unwrap();
        index
            .upsert(
                &[
                    IndexEntry {
                        id: "q-sleep".to_string(),
                        topic: "sleep-improvement".to_string(),
                    },
                    IndexEntry {
                        id: "q-work".to_string(),
                        topic: "workplace-relationships".to_string(),
                    },
                    IndexEntry {
                        id: "q-gone".to_string(),
                        topic: "anxiety".to_string(),
                    },
                ],
                vec![
                    vec![1.0, 0.0, 0.0, 0.0],
                    vec![0.0, 1.0, 0.0, 0.0],
                    vec![0.9, 0.1, 0.0, 0.0],
                ],
                DEFAULT_NAMESPACE,
            )
            .await
            .unwrap();
        Arc::new(index)
    }

    #[tokio::test]
    async fn test_retrieve_resolves_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        let index = seeded_index(&dir).await;
        let store = Arc::new(InMemoryExampleStore::new([
            example("q-sleep", "I can't sleep"),
            example("q-work", "My boss ignores me"),
            example("q-gone", "old record"),
        ]));
        let retriever = Retriever::new(Arc::new(StubEmbeddings), index, store);

        let results = retriever.retrieve("sleep", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].example.id, "q-sleep");
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[tokio::test]
    async fn test_stale_ids_are_dropped_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let index = seeded_index(&dir).await;
        // "q-gone" is indexed but missing from the store.
        let store = Arc::new(InMemoryExampleStore::new([
            example("q-sleep", "I can't sleep"),
            example("q-work", "My boss ignores me"),
        ]));
        let retriever = Retriever::new(Arc::new(StubEmbeddings), index, store);

        let results = retriever.retrieve("sleep", 3).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].example.id, "q-sleep");
        assert_eq!(results[1].example.id, "q-work");
    }

    #[tokio::test]
    async fn test_top_k_zero_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let index = seeded_index(&dir).await;
        let store = Arc::new(InMemoryExampleStore::default());
        let retriever = Retriever::new(Arc::new(StubEmbeddings), index, store);

        let results = retriever.retrieve("sleep", 0).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_empty_namespace_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = seeded_index(&dir).await;
        let store = Arc::new(InMemoryExampleStore::default());
        let retriever =
            Retriever::new(Arc::new(StubEmbeddings), index, store).with_namespace("empty");

        let results = retriever.retrieve("sleep", 3).await.unwrap();
        assert!(results.is_empty());
    }
}
