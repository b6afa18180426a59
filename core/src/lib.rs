pub mod boolean;
pub mod builder;
pub mod direct;
pub mod error;
pub mod inverted;
pub mod normalize;
pub mod persist;
pub mod snapshot;
pub mod vector;

pub use boolean::{BooleanQuery, DocSet, Operator};
pub use builder::{reindex, BuildSummary, CorpusBuilder, SourceDocument};
pub use direct::DirectIndex;
pub use error::{IndexError, Result};
pub use inverted::{IdfMode, IdfTable, InvertedIndex};
pub use normalize::{Classified, Normalizer, WordLists};
pub use persist::{CorpusPaths, DocMeta, MetaFile};
pub use snapshot::Snapshot;
pub use vector::{DocumentVectors, ScoredDocument, SparseVector, TermFrequencies, VectorSpace};

/// Stable document identifier, usually the path of the source document.
pub type DocId = String;
/// A normalized term (exception kept verbatim, or a stemmed dictionary word).
pub type Term = String;
