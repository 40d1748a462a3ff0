//! Error taxonomy for the question-answering pipeline.
//!
//! Four failure classes with distinct handling policies:
//!
//! | Variant | Policy |
//! |---------|--------|
//! | [`Error::Config`] | Fatal at construction, never retried |
//! | [`Error::Ingestion`] | Logged, document skipped, batch continues |
//! | [`Error::Embedding`] / [`Error::Retrieval`] | Propagated — an answer grounded on a failed retrieval would be wrong |
//! | [`Error::Generation`] | Absorbed inside the agent into a degraded `ChatResult` |

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration (bad chunking parameters, unknown provider name).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A document could not be read or parsed. The ingestion pipeline logs
    /// this, skips the file, and continues with the rest of the batch.
    #[error("failed to load document {path}: {reason}")]
    Ingestion { path: PathBuf, reason: String },

    /// The embedding collaborator failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The similarity index was unavailable or the query could not be
    /// embedded. Surfaced to the caller as a hard failure.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// The LLM collaborator failed (quota, auth, network).
    #[error("{provider} request failed: {reason}")]
    Generation { provider: String, reason: String },
}
