use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::direct::DirectIndex;
use crate::{DocId, Term};

/// term -> (document -> occurrence count).
pub type Postings = BTreeMap<DocId, u32>;

/// Corpus-wide inverted index with terms kept in sorted order.
///
/// Every stored posting has a count of at least one; a term without postings
/// is never present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    pub postings: BTreeMap<Term, Postings>,
    /// All documents seen, including those whose terms were all stopwords.
    pub documents: BTreeSet<DocId>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn from_direct<'a, I>(indexes: I) -> Self
    where
        I: IntoIterator<Item = &'a DirectIndex>,
    {
        let mut inverted = Self::new();
        for direct in indexes {
            inverted.insert(direct);
        }
        inverted
    }

    /// Merge one document's direct index. Re-inserting a document overwrites
    /// its previous counts for the same terms.
    pub fn insert(&mut self, direct: &DirectIndex) {
        self.documents.insert(direct.doc_id.clone());
        for (term, &count) in &direct.counts {
            if count == 0 {
                continue;
            }
            self.postings
                .entry(term.clone())
                .or_default()
                .insert(direct.doc_id.clone(), count);
        }
    }

    pub fn postings(&self, term: &str) -> Option<&Postings> {
        self.postings.get(term)
    }

    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, BTreeMap::len)
    }

    pub fn num_docs(&self) -> usize { self.documents.len() }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    /// The part of the index that concerns a single document. This is what gets
    /// persisted as that document's indirect index file.
    pub fn restricted_to(&self, doc_id: &str) -> InvertedIndex {
        let mut slice = InvertedIndex::new();
        if !self.documents.contains(doc_id) {
            return slice;
        }
        slice.documents.insert(doc_id.to_string());
        for (term, postings) in &self.postings {
            if let Some(&count) = postings.get(doc_id) {
                slice
                    .postings
                    .entry(term.clone())
                    .or_default()
                    .insert(doc_id.to_string(), count);
            }
        }
        slice
    }
}

/// How document frequency is turned into inverse document frequency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfMode {
    /// ln(N / df)
    #[default]
    Standard,
    /// ln(1 + N / df); never zero, even for a term present in every document.
    Smoothed,
}

impl IdfMode {
    pub fn idf(self, num_docs: usize, df: usize) -> f64 {
        let n = num_docs.max(1) as f64;
        let df = df.max(1) as f64;
        match self {
            IdfMode::Standard => (n / df).ln(),
            IdfMode::Smoothed => (1.0 + n / df).ln(),
        }
    }
}

/// term -> idf for every indexed term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdfTable {
    pub mode: IdfMode,
    pub weights: BTreeMap<Term, f64>,
}

impl IdfTable {
    pub fn build(index: &InvertedIndex, mode: IdfMode) -> Self {
        let n = index.num_docs();
        let weights = index
            .postings
            .iter()
            .map(|(term, postings)| (term.clone(), mode.idf(n, postings.len())))
            .collect();
        Self { mode, weights }
    }

    pub fn get(&self, term: &str) -> Option<f64> {
        self.weights.get(term).copied()
    }

    /// idf of `term`, or 0 for a term the corpus never indexed.
    pub fn weight(&self, term: &str) -> f64 {
        self.get(term).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize { self.weights.len() }

    pub fn is_empty(&self) -> bool { self.weights.is_empty() }
}
