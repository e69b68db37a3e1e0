//! Batch indexing of a counseling corpus into the vector index.

use std::sync::Arc;

use crate::corpus::{content_hash, embeddable_content};
use crate::embeddings::EmbeddingProvider;
use crate::error::GuidanceError;
use crate::store::{IndexEntry, VectorIndex};
use crate::types::HistoricalExample;

const DEFAULT_BATCH_SIZE: usize = 64;

/// Embeds corpus records in batches and upserts them into the index.
pub struct CorpusIndexer {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    batch_size: usize,
}

impl CorpusIndexer {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, index: Arc<VectorIndex>) -> Self {
        Self {
            provider,
            index,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Index all records into `namespace`. Returns the number written.
    ///
    /// Records without an id are indexed under their content hash, the same
    /// fallback the JSONL loader applies, so retrieval round-trips.
    pub async fn index_records(
        &self,
        records: &[HistoricalExample],
        namespace: &str,
    ) -> Result<usize, GuidanceError> {
        let mut written = 0;
        for chunk in records.chunks(self.batch_size) {
            let entries: Vec<IndexEntry> = chunk
                .iter()
                .map(|r| IndexEntry {
                    id: if r.id.trim().is_empty() {
                        content_hash(r)
                    } else {
                        r.id.clone()
                    },
                    topic: r.topic.clone().unwrap_or_default(),
                })
                .collect();
            let contents: Vec<String> = chunk.iter().map(embeddable_content).collect();

            let embeddings = self.provider.embed_batch(&contents).await?;
            written += self.index.upsert(&entries, embeddings, namespace).await?;
            log::debug!("Indexed {written}/{} records", records.len());
        }
        Ok(written)
    }
}
