//! Error types for the core crate.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while building, persisting or loading a corpus.
///
/// Query misses are not errors: the evaluators report them as `None` or an
/// empty ranking.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A document or artifact could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An artifact exists but is not valid JSON of the expected shape.
    #[error("malformed artifact {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required artifact is missing from the corpus directory.
    #[error("missing artifact: {0}")]
    MissingArtifact(PathBuf),

    /// The inverted index references a posting with no stored term frequency.
    #[error("no tf recorded for term {term:?} in document {doc_id:?}")]
    MissingTf { doc_id: String, term: String },
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            return Self::MissingArtifact(path);
        }
        Self::Io { path, source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
