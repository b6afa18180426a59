//! tf-idf vectors and ranked retrieval.
//!
//! Similarity is a cosine restricted to the terms a document shares with the
//! query: the dot product and both norms only range over that overlap. A
//! document is therefore not penalised for terms the query does not mention.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{IndexError, Result};
use crate::inverted::{IdfTable, InvertedIndex};
use crate::normalize::Normalizer;
use crate::{DocId, Term};

/// term -> weight. Absent terms have weight 0 and are never stored.
pub type SparseVector = BTreeMap<Term, f64>;

/// document -> tf-idf vector.
pub type DocumentVectors = BTreeMap<DocId, SparseVector>;

/// Source of per-document term frequencies.
pub trait TermFrequencies {
    fn tf(&self, doc_id: &str, term: &str) -> Option<f64>;
}

impl TermFrequencies for BTreeMap<DocId, BTreeMap<Term, f64>> {
    fn tf(&self, doc_id: &str, term: &str) -> Option<f64> {
        self.get(doc_id)?.get(term).copied()
    }
}

/// Weight every posting of `index` by tf × idf.
pub fn build_vectors<T: TermFrequencies + ?Sized>(
    index: &InvertedIndex,
    idf: &IdfTable,
    tf: &T,
) -> Result<DocumentVectors> {
    let mut vectors = DocumentVectors::new();
    for (term, postings) in &index.postings {
        let idf_t = idf.weight(term);
        for doc_id in postings.keys() {
            let tf_t = tf.tf(doc_id, term).ok_or_else(|| IndexError::MissingTf {
                doc_id: doc_id.clone(),
                term: term.clone(),
            })?;
            vectors
                .entry(doc_id.clone())
                .or_default()
                .insert(term.clone(), tf_t * idf_t);
        }
    }
    Ok(vectors)
}

/// Query as a flat bag of words. Operators are not recognised here; every
/// surviving token is a term. Terms unknown to the corpus are left out.
pub fn query_vector(query: &str, idf: &IdfTable, normalizer: &Normalizer) -> SparseVector {
    let terms = normalizer.terms(query);
    if terms.is_empty() {
        return SparseVector::new();
    }
    let mut counts: BTreeMap<Term, u32> = BTreeMap::new();
    for term in &terms {
        *counts.entry(term.clone()).or_insert(0) += 1;
    }
    let len = terms.len() as f64;
    counts
        .into_iter()
        .filter_map(|(term, count)| {
            let idf_t = idf.get(&term)?;
            Some((term, f64::from(count) / len * idf_t))
        })
        .collect()
}

/// Cosine similarity computed over shared terms only.
pub fn restricted_cosine(doc: &SparseVector, query: &SparseVector) -> f64 {
    let mut dot = 0.0;
    let mut doc_sq = 0.0;
    let mut query_sq = 0.0;
    let mut shared = false;
    for (term, &q) in query {
        if let Some(&d) = doc.get(term) {
            shared = true;
            dot += (d * q).abs();
            doc_sq += d * d;
            query_sq += q * q;
        }
    }
    if !shared || dot == 0.0 {
        return 0.0;
    }
    dot.abs() / (doc_sq.sqrt() * query_sq.sqrt())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub doc_id: DocId,
    pub score: f64,
}

/// Rank every document against `query`. Zero scores are dropped; equal scores
/// are all kept, in document-id order.
pub fn rank(query: &SparseVector, vectors: &DocumentVectors) -> Vec<ScoredDocument> {
    if query.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<ScoredDocument> = vectors
        .iter()
        .filter_map(|(doc_id, vector)| {
            let score = restricted_cosine(vector, query);
            (score != 0.0).then(|| ScoredDocument { doc_id: doc_id.clone(), score })
        })
        .collect();
    // stable: ties keep the BTreeMap (doc id) order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// idf table plus document vectors: everything ranked search needs.
#[derive(Debug, Clone, Default)]
pub struct VectorSpace {
    pub idf: IdfTable,
    pub vectors: DocumentVectors,
}

impl VectorSpace {
    pub fn new(idf: IdfTable, vectors: DocumentVectors) -> Self {
        Self { idf, vectors }
    }

    pub fn build<T: TermFrequencies + ?Sized>(index: &InvertedIndex, idf: IdfTable, tf: &T) -> Result<Self> {
        let vectors = build_vectors(index, &idf, tf)?;
        Ok(Self { idf, vectors })
    }

    pub fn query_vector(&self, query: &str, normalizer: &Normalizer) -> SparseVector {
        query_vector(query, &self.idf, normalizer)
    }

    pub fn search(&self, query: &str, normalizer: &Normalizer) -> Vec<ScoredDocument> {
        rank(&self.query_vector(query, normalizer), &self.vectors)
    }
}
