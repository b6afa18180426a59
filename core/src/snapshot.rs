use std::collections::BTreeMap;
use std::sync::Arc;

use crate::boolean::{self, DocSet};
use crate::error::Result;
use crate::inverted::InvertedIndex;
use crate::normalize::Normalizer;
use crate::persist::{
    load_docs, load_idf, load_inverted, load_meta, load_vectors, load_word_lists, CorpusPaths, DocMeta,
    MetaFile,
};
use crate::vector::{ScoredDocument, VectorSpace};
use crate::DocId;

/// Read-only view of a built corpus, ready to answer queries.
///
/// The normalizer is rebuilt from the word lists and case setting recorded at
/// index time, so queries are normalized exactly like the documents were.
pub struct Snapshot {
    pub paths: CorpusPaths,
    pub meta: MetaFile,
    pub normalizer: Normalizer,
    pub index: InvertedIndex,
    pub space: VectorSpace,
    pub docs: BTreeMap<DocId, DocMeta>,
}

impl Snapshot {
    pub fn load(paths: CorpusPaths) -> Result<Self> {
        let meta = load_meta(&paths)?;
        let lists = Arc::new(load_word_lists(&paths)?);
        let normalizer = if meta.fold_case {
            Normalizer::with_case_folding(lists)
        } else {
            Normalizer::new(lists)
        };
        let index = load_inverted(&paths)?;
        let idf = load_idf(&paths, meta.idf_mode)?;
        let vectors = load_vectors(&paths)?;
        let docs = load_docs(&paths)?;
        tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, num_terms = meta.num_terms, "corpus loaded");
        Ok(Self { paths, meta, normalizer, index, space: VectorSpace::new(idf, vectors), docs })
    }

    /// Boolean search; `None` means the query has no result.
    pub fn boolean(&self, query: &str) -> Option<DocSet> {
        boolean::search(&self.index, query, &self.normalizer)
    }

    /// Ranked search, best first, at most `limit` hits.
    pub fn ranked(&self, query: &str, limit: usize) -> Vec<ScoredDocument> {
        let mut hits = self.space.search(query, &self.normalizer);
        hits.truncate(limit);
        hits
    }

    pub fn document(&self, doc_id: &str) -> Option<&DocMeta> {
        self.docs.get(doc_id)
    }

    /// Stored flattened text of a document, if any.
    pub fn text(&self, doc_id: &str) -> Option<String> {
        let rel = self.docs.get(doc_id)?.text_path.as_ref()?;
        std::fs::read_to_string(self.paths.resolve(rel)).ok()
    }
}
