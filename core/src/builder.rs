//! Corpus build pipeline: direct indexes per document, then the inverted
//! index, idf table and document vectors once every document is in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use time::format_description::well_known::Rfc3339;

use crate::direct::DirectIndex;
use crate::error::{IndexError, Result};
use crate::inverted::{IdfMode, IdfTable, InvertedIndex};
use crate::normalize::{Normalizer, WordLists};
use crate::persist::{
    load_direct_index, load_docs, load_location_map, load_meta, load_tf, load_word_lists,
    save_direct_index, save_docs, save_idf, save_inverted, save_json, save_location_map, save_meta,
    save_vectors, save_word_lists, CorpusPaths, DocMeta, LocationMap, MetaFile, FORMAT_VERSION,
};
use crate::vector::build_vectors;
use crate::{DocId, Term};

/// A document as handed over by a document source: markup already stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: DocId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub body: String,
}

impl SourceDocument {
    /// Title, keywords, description and body, one per line.
    pub fn flatten(&self) -> String {
        [self.title.as_str(), self.keywords.as_str(), self.description.as_str(), self.body.as_str()].join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub num_docs: usize,
    pub num_terms: usize,
    pub num_vectors: usize,
}

/// Builds a corpus directory from scratch.
///
/// Documents are indexed one at a time with `add_document`; a failing document
/// can be skipped by the caller. Nothing corpus-wide is written until `finish`.
pub struct CorpusBuilder<'n> {
    paths: CorpusPaths,
    normalizer: &'n Normalizer,
    idf_mode: IdfMode,
    directs: Vec<DirectIndex>,
    docs: BTreeMap<DocId, DocMeta>,
    next_slot: u32,
}

impl<'n> CorpusBuilder<'n> {
    /// Prepare `paths.root`. Per-document artifacts of a previous build are
    /// removed; other files under `docs/` are left alone.
    pub fn new(paths: CorpusPaths, normalizer: &'n Normalizer, idf_mode: IdfMode) -> Result<Self> {
        let docs_dir = paths.docs_dir();
        fs::create_dir_all(&docs_dir).map_err(|e| IndexError::io(&docs_dir, e))?;
        let mut removed = 0usize;
        for entry in fs::read_dir(&docs_dir).map_err(|e| IndexError::io(&docs_dir, e))? {
            let path = entry.map_err(|e| IndexError::io(&docs_dir, e))?.path();
            if path.is_file() && paths.is_artifact(&path) {
                fs::remove_file(&path).map_err(|e| IndexError::io(&path, e))?;
                removed += 1;
            }
        }
        tracing::debug!(dir = %docs_dir.display(), removed, "cleared previous per-document artifacts");
        Ok(Self { paths, normalizer, idf_mode, directs: Vec::new(), docs: BTreeMap::new(), next_slot: 0 })
    }

    pub fn len(&self) -> usize { self.directs.len() }

    pub fn is_empty(&self) -> bool { self.directs.is_empty() }

    /// Index one document and write its direct index, tf map and text.
    pub fn add_document(&mut self, doc: &SourceDocument) -> Result<()> {
        if self.docs.contains_key(&doc.id) {
            tracing::warn!(doc_id = %doc.id, "duplicate document id, keeping the first");
            return Ok(());
        }
        let slot = self.next_slot;
        let text = doc.flatten();
        let direct = DirectIndex::build(doc.id.clone(), &text, self.normalizer);

        let (direct_rel, tf_rel) = save_direct_index(&self.paths, slot, &direct)?;
        let text_rel = CorpusPaths::doc_artifact(slot, "txt");
        let text_abs = self.paths.resolve(&text_rel);
        fs::write(&text_abs, &text).map_err(|e| IndexError::io(&text_abs, e))?;

        tracing::debug!(doc_id = %doc.id, slot, terms = direct.counts.len(), total = direct.total_terms, "indexed document");
        self.docs.insert(
            doc.id.clone(),
            DocMeta {
                slot,
                title: doc.title.trim().to_string(),
                description: doc.description.trim().to_string(),
                direct_index: direct_rel,
                tf: tf_rel,
                text_path: Some(text_rel),
            },
        );
        self.directs.push(direct);
        self.next_slot += 1;
        Ok(())
    }

    /// Invert all direct indexes and write every corpus-wide artifact.
    pub fn finish(self) -> Result<BuildSummary> {
        let tf: BTreeMap<DocId, BTreeMap<Term, f64>> =
            self.directs.iter().map(|d| (d.doc_id.clone(), d.tf())).collect();
        let settings = Settings {
            idf_mode: self.idf_mode,
            fold_case: self.normalizer.fold_case(),
            word_lists: self.normalizer.word_lists(),
        };
        write_derived(&self.paths, &self.directs, &tf, &self.docs, &settings)
    }
}

struct Settings<'a> {
    idf_mode: IdfMode,
    fold_case: bool,
    word_lists: &'a WordLists,
}

fn write_derived(
    paths: &CorpusPaths,
    directs: &[DirectIndex],
    tf: &BTreeMap<DocId, BTreeMap<Term, f64>>,
    docs: &BTreeMap<DocId, DocMeta>,
    settings: &Settings<'_>,
) -> Result<BuildSummary> {
    let inverted = InvertedIndex::from_direct(directs);
    let idf = IdfTable::build(&inverted, settings.idf_mode);
    let vectors = build_vectors(&inverted, &idf, tf)?;
    tracing::info!(num_docs = inverted.num_docs(), num_terms = inverted.num_terms(), "inverted index built");

    let mut direct_map = LocationMap::new();
    let mut indirect_map = LocationMap::new();
    for direct in directs {
        let Some(meta) = docs.get(&direct.doc_id) else { continue };
        // A document's slice of the inverted index is its own counts inverted.
        let slice = InvertedIndex::from_direct(std::slice::from_ref(direct));
        let slice_rel = CorpusPaths::doc_artifact(meta.slot, "indirectindex.json");
        save_json(&paths.resolve(&slice_rel), &slice.postings)?;
        direct_map.insert(direct.doc_id.clone(), meta.direct_index.clone());
        indirect_map.insert(direct.doc_id.clone(), slice_rel);
    }

    save_inverted(paths, &inverted)?;
    save_idf(paths, &idf)?;
    save_vectors(paths, &vectors)?;
    save_location_map(&paths.direct_map(), &direct_map)?;
    save_location_map(&paths.indirect_map(), &indirect_map)?;
    save_docs(paths, docs)?;
    save_word_lists(paths, settings.word_lists)?;
    let meta = MetaFile {
        num_docs: inverted.num_docs(),
        num_terms: inverted.num_terms(),
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        version: FORMAT_VERSION,
        idf_mode: settings.idf_mode,
        fold_case: settings.fold_case,
    };
    save_meta(paths, &meta)?;

    Ok(BuildSummary { num_docs: inverted.num_docs(), num_terms: inverted.num_terms(), num_vectors: vectors.len() })
}

/// Rebuild the inverted index, idf table and vectors from the direct indexes
/// already persisted under `paths`. Any missing direct index aborts the whole
/// rebuild before anything is written.
pub fn reindex(paths: &CorpusPaths) -> Result<BuildSummary> {
    let meta = load_meta(paths)?;
    let docs = load_docs(paths)?;
    let direct_map = load_location_map(&paths.direct_map())?;
    let word_lists = load_word_lists(paths)?;

    let mut directs = Vec::with_capacity(direct_map.len());
    let mut tf = BTreeMap::new();
    for (doc_id, location) in &direct_map {
        directs.push(load_direct_index(paths, doc_id, location)?);
        let tf_rel = match docs.get(doc_id) {
            Some(m) => m.tf.clone(),
            None => return Err(IndexError::MissingArtifact(paths.docs())),
        };
        tf.insert(doc_id.clone(), load_tf(paths, &tf_rel)?);
    }
    tracing::info!(num_docs = directs.len(), "loaded persisted direct indexes");

    let settings = Settings { idf_mode: meta.idf_mode, fold_case: meta.fold_case, word_lists: &word_lists };
    write_derived(paths, &directs, &tf, &docs, &settings)
}
