use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::normalize::{for_each_token, Normalizer};
use crate::{DocId, Term};

/// Per-document term counts.
///
/// Created once per document during a build and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectIndex {
    pub doc_id: DocId,
    pub counts: BTreeMap<Term, u32>,
    /// Number of tokens that survived normalization (stopwords excluded).
    pub total_terms: u32,
}

impl DirectIndex {
    pub fn build(doc_id: impl Into<DocId>, text: &str, normalizer: &Normalizer) -> Self {
        let mut index = Self { doc_id: doc_id.into(), ..Self::default() };
        for_each_token(text, |token| {
            if let Some(term) = normalizer.normalize(token) {
                *index.counts.entry(term).or_insert(0) += 1;
                index.total_terms += 1;
            }
        });
        index
    }

    /// Rebuild from a persisted count map; the total is the sum of counts.
    pub fn from_counts(doc_id: impl Into<DocId>, counts: BTreeMap<Term, u32>) -> Self {
        let total_terms = counts.values().sum();
        Self { doc_id: doc_id.into(), counts, total_terms }
    }

    /// count / total_terms for every term of the document.
    pub fn tf(&self) -> BTreeMap<Term, f64> {
        let total = f64::from(self.total_terms.max(1));
        self.counts
            .iter()
            .map(|(term, &count)| (term.clone(), f64::from(count) / total))
            .collect()
    }

    pub fn count(&self, term: &str) -> u32 {
        self.counts.get(term).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool { self.counts.is_empty() }
}
