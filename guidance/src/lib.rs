//! Retrieval-augmented guidance engine for mental-health counselors.
//!
//! Pipeline: embed the counselor's latest message, retrieve semantically
//! similar historical Q&A pairs from a LanceDB index, classify the topic
//! against a fixed taxonomy, score sentiment with a lexicon, and synthesize
//! advice through a chat model. The [`pipeline::GuidanceEngine`] ties the
//! stages together; everything below it is an injectable trait object so
//! adapters and tests can swap providers.

pub mod advice;
pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod indexer;
pub mod llm;
pub mod pipeline;
pub mod retrieval;
pub mod safety;
pub mod sentiment;
pub mod store;
pub mod topics;
pub mod types;

pub use error::GuidanceError;
pub use pipeline::GuidanceEngine;
pub use types::{GuidanceResult, HistoricalExample, ScoredExample};
