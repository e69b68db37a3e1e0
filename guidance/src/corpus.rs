//! The example store: access to the historical counseling corpus.
//!
//! The index only holds ids and vectors; full Q&A text is resolved here at
//! retrieval time. The JSONL-backed store loads the CounselChat-style corpus
//! once at startup; an in-memory store doubles for it in tests and demos.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::GuidanceError;
use crate::types::{Conversation, HistoricalExample};

/// Read access to historical examples and archived conversations.
#[async_trait]
pub trait ExampleStore: Send + Sync {
    /// Look up an example by id. `None` when the id is unknown, which the
    /// retriever treats as a stale index entry.
    async fn find_by_id(&self, id: &str) -> Result<Option<HistoricalExample>, GuidanceError>;

    /// Look up the most recently updated archived conversation for a patient.
    async fn find_by_patient(
        &self,
        patient_id: &str,
    ) -> Result<Option<Conversation>, GuidanceError>;
}

/// Build the text that gets embedded for an example.
pub fn embeddable_content(example: &HistoricalExample) -> String {
    format!(
        "Patient: {}\nCounselor: {}",
        example.question_text, example.answer_text
    )
}

/// SHA-256 hash of an example's content, used as the id fallback for corpus
/// records that ship without one.
pub fn content_hash(example: &HistoricalExample) -> String {
    let mut hasher = Sha256::new();
    hasher.update(example.question_text.as_bytes());
    hasher.update(b"\n");
    hasher.update(example.answer_text.as_bytes());
    hex::encode(hasher.finalize())
}

/// JSONL-backed example store.
pub struct JsonlExampleStore {
    records: Vec<HistoricalExample>,
    by_id: HashMap<String, usize>,
    archive_dir: Option<PathBuf>,
}

impl JsonlExampleStore {
    /// Load a corpus from a JSONL file, one example per line.
    ///
    /// Blank lines are skipped; malformed lines are logged and skipped so a
    /// partially damaged corpus still loads. Records without an id get a
    /// content-hash id, matching what the indexer writes.
    pub fn open(path: &Path) -> Result<Self, GuidanceError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| GuidanceError::Store(format!("Failed to read {}: {e}", path.display())))?;

        let mut records = Vec::new();
        let mut by_id = HashMap::new();
        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut example: HistoricalExample = match serde_json::from_str(line) {
                Ok(ex) => ex,
                Err(e) => {
                    log::warn!(
                        "Skipping malformed corpus line {} in {}: {e}",
                        lineno + 1,
                        path.display()
                    );
                    continue;
                }
            };
            if example.id.trim().is_empty() {
                example.id = content_hash(&example);
            }
            by_id.entry(example.id.clone()).or_insert(records.len());
            records.push(example);
        }

        log::debug!("Loaded {} examples from {}", records.len(), path.display());
        Ok(Self {
            records,
            by_id,
            archive_dir: None,
        })
    }

    /// Attach a directory of archived conversation JSON files, enabling
    /// patient lookups.
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    /// All loaded examples, in corpus order.
    pub fn records(&self) -> &[HistoricalExample] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ExampleStore for JsonlExampleStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<HistoricalExample>, GuidanceError> {
        Ok(self.by_id.get(id).map(|&i| self.records[i].clone()))
    }

    async fn find_by_patient(
        &self,
        patient_id: &str,
    ) -> Result<Option<Conversation>, GuidanceError> {
        let Some(dir) = &self.archive_dir else {
            return Ok(None);
        };
        if !dir.exists() {
            return Ok(None);
        }

        let entries = fs::read_dir(dir)
            .map_err(|e| GuidanceError::Store(format!("Failed to read {}: {e}", dir.display())))?;

        let mut latest: Option<Conversation> = None;
        for entry in entries {
            let entry =
                entry.map_err(|e| GuidanceError::Store(format!("Failed to read archive: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = match fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("Skipping unreadable archive {}: {e}", path.display());
                    continue;
                }
            };
            let conv: Conversation = match serde_json::from_str(&raw) {
                Ok(conv) => conv,
                Err(e) => {
                    log::warn!("Skipping malformed archive {}: {e}", path.display());
                    continue;
                }
            };
            if conv.patient_id.as_deref() != Some(patient_id) {
                continue;
            }
            if latest
                .as_ref()
                .map(|l| conv.updated_at > l.updated_at)
                .unwrap_or(true)
            {
                latest = Some(conv);
            }
        }
        Ok(latest)
    }
}

/// In-memory example store, for tests and small demos.
#[derive(Default)]
pub struct InMemoryExampleStore {
    records: HashMap<String, HistoricalExample>,
    conversations: Vec<Conversation>,
}

impl InMemoryExampleStore {
    pub fn new(examples: impl IntoIterator<Item = HistoricalExample>) -> Self {
        Self {
            records: examples.into_iter().map(|ex| (ex.id.clone(), ex)).collect(),
            conversations: Vec::new(),
        }
    }

    pub fn push_conversation(&mut self, conversation: Conversation) {
        self.conversations.push(conversation);
    }
}

#[async_trait]
impl ExampleStore for InMemoryExampleStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<HistoricalExample>, GuidanceError> {
        Ok(self.records.get(id).cloned())
    }

    async fn find_by_patient(
        &self,
        patient_id: &str,
    ) -> Result<Option<Conversation>, GuidanceError> {
        Ok(self
            .conversations
            .iter()
            .filter(|c| c.patient_id.as_deref() == Some(patient_id))
            .max_by_key(|c| c.updated_at)
            .cloned())
    }
}
