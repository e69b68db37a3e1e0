//! LanceDB vector index for historical-example embeddings.
//!
//! One `examples` table, partitioned logically by a `namespace` column so
//! several corpora can share an index file. Search uses cosine distance;
//! the reported similarity is `1 - distance`.

use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::DistanceType;
use lancedb::query::{ExecutableQuery, QueryBase};

use crate::error::GuidanceError;

const TABLE_NAME: &str = "examples";

/// The default namespace used by the retriever and indexer.
pub const DEFAULT_NAMESPACE: &str = "default";

/// A row to be written to the index. The full example text lives in the
/// example store; the index only keeps what retrieval needs.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub topic: String,
}

/// A search hit from the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch {
    pub id: String,
    pub topic: String,
    /// Cosine similarity, `1 - cosine distance`.
    pub similarity: f32,
}

/// LanceDB-backed vector index.
pub struct VectorIndex {
    db: lancedb::Connection,
    dims: usize,
}

impl VectorIndex {
    /// Open or create an index at the given path.
    pub async fn open(path: &str, dims: usize) -> Result<Self, GuidanceError> {
        let db = lancedb::connect(path).execute().await?;
        let index = Self { db, dims };
        index.ensure_table().await?;
        Ok(index)
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("namespace", DataType::Utf8, false),
            Field::new("topic", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dims as i32,
                ),
                false,
            ),
        ]))
    }

    async fn ensure_table(&self) -> Result<(), GuidanceError> {
        let tables = self.db.table_names().execute().await?;
        if !tables.contains(&TABLE_NAME.to_string()) {
            let schema = self.schema();
            let empty_batch = RecordBatch::new_empty(schema.clone());
            let batches = RecordBatchIterator::new(vec![Ok(empty_batch)], schema);
            self.db.create_table(TABLE_NAME, batches).execute().await?;
        }
        Ok(())
    }

    /// Insert entries with pre-computed embeddings into a namespace.
    ///
    /// Idempotent: rows with the same id in the same namespace are replaced,
    /// so re-indexing a corpus never duplicates entries.
    pub async fn upsert(
        &self,
        entries: &[IndexEntry],
        embeddings: Vec<Vec<f32>>,
        namespace: &str,
    ) -> Result<usize, GuidanceError> {
        if entries.is_empty() {
            return Ok(0);
        }
        if entries.len() != embeddings.len() {
            return Err(GuidanceError::Embedding(format!(
                "Mismatch: {} entries but {} embeddings",
                entries.len(),
                embeddings.len()
            )));
        }

        let table = self.db.open_table(TABLE_NAME).execute().await?;

        let id_list = entries
            .iter()
            .map(|e| format!("'{}'", sql_escape(&e.id)))
            .collect::<Vec<_>>()
            .join(", ");
        table
            .delete(&format!(
                "namespace = '{}' AND id IN ({id_list})",
                sql_escape(namespace)
            ))
            .await?;

        let schema = self.schema();
        let n = entries.len();

        let ids = StringArray::from_iter_values(entries.iter().map(|e| e.id.as_str()));
        let namespaces = StringArray::from_iter_values(entries.iter().map(|_| namespace));
        let topics = StringArray::from_iter_values(entries.iter().map(|e| e.topic.as_str()));
        let vectors = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            embeddings
                .into_iter()
                .map(|v| Some(v.into_iter().map(Some).collect::<Vec<_>>())),
            self.dims as i32,
        );

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(ids),
                Arc::new(namespaces),
                Arc::new(topics),
                Arc::new(vectors) as Arc<dyn Array>,
            ],
        )
        .map_err(|e| GuidanceError::Store(format!("Failed to create record batch: {e}")))?;

        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);
        table.add(batches).execute().await?;

        Ok(n)
    }

    /// Find the `limit` nearest entries to a query vector within a namespace.
    ///
    /// Results are ordered by non-increasing similarity.
    pub async fn query(
        &self,
        query_vector: &[f32],
        limit: usize,
        namespace: &str,
    ) -> Result<Vec<IndexMatch>, GuidanceError> {
        let table = self.db.open_table(TABLE_NAME).execute().await?;

        let query = table
            .vector_search(query_vector)
            .map_err(|e| {
                GuidanceError::RetrievalUnavailable(format!("Failed to build search query: {e}"))
            })?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .only_if(format!("namespace = '{}'", sql_escape(namespace)));

        let results: Vec<RecordBatch> = query
            .execute()
            .await?
            .try_collect()
            .await
            .map_err(|e| GuidanceError::RetrievalUnavailable(format!("Search failed: {e}")))?;

        let mut matches = Vec::new();
        for batch in &results {
            let ids = batch
                .column_by_name("id")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>());
            let topics = batch
                .column_by_name("topic")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>());
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

            let (Some(ids), Some(topics)) = (ids, topics) else {
                continue;
            };

            for i in 0..batch.num_rows() {
                let distance = distances.map(|d| d.value(i)).unwrap_or(0.0);
                matches.push(IndexMatch {
                    id: ids.value(i).to_string(),
                    topic: topics.value(i).to_string(),
                    similarity: 1.0 - distance,
                });
            }
        }

        Ok(matches)
    }

    /// Delete all entries in a namespace.
    pub async fn clear_namespace(&self, namespace: &str) -> Result<(), GuidanceError> {
        let table = self.db.open_table(TABLE_NAME).execute().await?;
        table
            .delete(&format!("namespace = '{}'", sql_escape(namespace)))
            .await?;
        Ok(())
    }

    /// Total number of indexed entries across namespaces.
    pub async fn count(&self) -> Result<usize, GuidanceError> {
        let table = self.db.open_table(TABLE_NAME).execute().await?;
        let count = table.count_rows(None).await?;
        Ok(count)
    }
}

/// Escape a value for use inside a single-quoted SQL string literal.
fn sql_escape(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, topic: &str) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            topic: topic.to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_creates_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.lance");
        let index = VectorIndex::open(path.to_str().unwrap(), 4).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_and_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.lance");
        let index = VectorIndex::open(path.to_str().unwrap(), 4).await.unwrap();

        let entries = vec![entry("q1", "anxiety"), entry("q2", "grief-and-loss")];
        let embeddings = vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]];

        let written = index
            .upsert(&entries, embeddings, DEFAULT_NAMESPACE)
            .await
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(index.count().await.unwrap(), 2);

        let matches = index
            .query(&[0.9, 0.1, 0.0, 0.0], 5, DEFAULT_NAMESPACE)
            .await
            .unwrap();
        assert!(!matches.is_empty());
        assert_eq!(matches[0].id, "q1");
        assert_eq!(matches[0].topic, "anxiety");
        assert!(matches[0].similarity > matches[1].similarity);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.lance");
        let index = VectorIndex::open(path.to_str().unwrap(), 4).await.unwrap();

        let entries = vec![entry("q1", "anxiety")];
        index
            .upsert(&entries, vec![vec![1.0, 0.0, 0.0, 0.0]], DEFAULT_NAMESPACE)
            .await
            .unwrap();
        index
            .upsert(&entries, vec![vec![0.0, 1.0, 0.0, 0.0]], DEFAULT_NAMESPACE)
            .await
            .unwrap();

        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_namespace_filtering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.lance");
        let index = VectorIndex::open(path.to_str().unwrap(), 4).await.unwrap();

        index
            .upsert(
                &[entry("q1", "anxiety")],
                vec![vec![1.0, 0.0, 0.0, 0.0]],
                "corpus-a",
            )
            .await
            .unwrap();
        index
            .upsert(
                &[entry("q2", "depression")],
                vec![vec![1.0, 0.0, 0.0, 0.0]],
                "corpus-b",
            )
            .await
            .unwrap();

        let matches = index
            .query(&[1.0, 0.0, 0.0, 0.0], 5, "corpus-a")
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "q1");
    }

    #[tokio::test]
    async fn test_clear_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.lance");
        let index = VectorIndex::open(path.to_str().unwrap(), 4).await.unwrap();

        index
            .upsert(
                &[entry("q1", "anxiety")],
                vec![vec![1.0, 0.0, 0.0, 0.0]],
                DEFAULT_NAMESPACE,
            )
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        index.clear_namespace(DEFAULT_NAMESPACE).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
