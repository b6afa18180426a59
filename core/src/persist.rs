use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};

use crate::direct::DirectIndex;
use crate::error::{IndexError, Result};
use crate::inverted::{IdfMode, IdfTable, InvertedIndex};
use crate::normalize::WordLists;
use crate::vector::DocumentVectors;
use crate::{DocId, Term};

pub const FORMAT_VERSION: u32 = 1;

const ROOT_ARTIFACTS: [&str; 8] = [
    "meta.json",
    "docs.json",
    "wordlists.json",
    "directindex.map",
    "indirectindex.map",
    "indirectindex.json",
    "idf.json",
    "documentVectors.json",
];

const DOC_ARTIFACT_EXTS: [&str; 4] = ["directindex.json", "tf.json", "indirectindex.json", "txt"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: usize,
    pub num_terms: usize,
    pub created_at: String,
    pub version: u32,
    pub idf_mode: IdfMode,
    pub fold_case: bool,
}

/// Per-document metadata. Paths are relative to the corpus root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub slot: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub direct_index: String,
    pub tf: String,
    /// Flattened text, kept for snippet extraction.
    pub text_path: Option<String>,
}

/// document id -> artifact path relative to the corpus root.
pub type LocationMap = BTreeMap<DocId, String>;

/// Names every artifact of a corpus directory.
#[derive(Debug, Clone)]
pub struct CorpusPaths {
    pub root: PathBuf,
}

impl CorpusPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn docs(&self) -> PathBuf { self.root.join("docs.json") }
    pub fn word_lists(&self) -> PathBuf { self.root.join("wordlists.json") }
    pub fn direct_map(&self) -> PathBuf { self.root.join("directindex.map") }
    pub fn indirect_map(&self) -> PathBuf { self.root.join("indirectindex.map") }
    pub fn inverted(&self) -> PathBuf { self.root.join("indirectindex.json") }
    pub fn idf(&self) -> PathBuf { self.root.join("idf.json") }
    pub fn vectors(&self) -> PathBuf { self.root.join("documentVectors.json") }
    pub fn docs_dir(&self) -> PathBuf { self.root.join("docs") }

    /// `docs/{slot:06}.{ext}`, relative to the root.
    pub fn doc_artifact(slot: u32, ext: &str) -> String {
        format!("docs/{slot:06}.{ext}")
    }

    pub fn resolve(&self, relative: &str) -> PathBuf { self.root.join(relative) }

    /// Whether `path` is a file a build writes into this corpus. Anything else
    /// under the root belongs to the user and is never touched.
    pub fn is_artifact(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else { return false };
        let parts: Vec<_> = rel.components().map(|c| c.as_os_str()).collect();
        match parts.as_slice() {
            [name] => name.to_str().is_some_and(|n| ROOT_ARTIFACTS.contains(&n)),
            [dir, name] if *dir == "docs" => name.to_str().is_some_and(is_doc_artifact_name),
            _ => false,
        }
    }
}

fn is_doc_artifact_name(name: &str) -> bool {
    let Some((slot, ext)) = name.split_once('.') else { return false };
    slot.len() == 6 && slot.bytes().all(|b| b.is_ascii_digit()) && DOC_ARTIFACT_EXTS.contains(&ext)
}

pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir).map_err(|e| IndexError::io(dir, e))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| IndexError::json(path, e))?;
    fs::write(path, json).map_err(|e| IndexError::io(path, e))
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| IndexError::json(path, e))
}

/// Write `{slot}.directindex.json` and `{slot}.tf.json`; returns their relative paths.
pub fn save_direct_index(paths: &CorpusPaths, slot: u32, direct: &DirectIndex) -> Result<(String, String)> {
    let counts_rel = CorpusPaths::doc_artifact(slot, "directindex.json");
    let tf_rel = CorpusPaths::doc_artifact(slot, "tf.json");
    save_json(&paths.resolve(&counts_rel), &direct.counts)?;
    save_json(&paths.resolve(&tf_rel), &direct.tf())?;
    Ok((counts_rel, tf_rel))
}

pub fn load_direct_index(paths: &CorpusPaths, doc_id: &str, relative: &str) -> Result<DirectIndex> {
    let counts: BTreeMap<Term, u32> = load_json(&paths.resolve(relative))?;
    Ok(DirectIndex::from_counts(doc_id, counts))
}

pub fn load_tf(paths: &CorpusPaths, relative: &str) -> Result<BTreeMap<Term, f64>> {
    load_json(&paths.resolve(relative))
}

pub fn save_meta(paths: &CorpusPaths, meta: &MetaFile) -> Result<()> { save_json(&paths.meta(), meta) }

pub fn load_meta(paths: &CorpusPaths) -> Result<MetaFile> { load_json(&paths.meta()) }

pub fn save_docs(paths: &CorpusPaths, docs: &BTreeMap<DocId, DocMeta>) -> Result<()> { save_json(&paths.docs(), docs) }

pub fn load_docs(paths: &CorpusPaths) -> Result<BTreeMap<DocId, DocMeta>> { load_json(&paths.docs()) }

pub fn save_word_lists(paths: &CorpusPaths, lists: &WordLists) -> Result<()> { save_json(&paths.word_lists(), lists) }

pub fn load_word_lists(paths: &CorpusPaths) -> Result<WordLists> { load_json(&paths.word_lists()) }

pub fn save_inverted(paths: &CorpusPaths, index: &InvertedIndex) -> Result<()> { save_json(&paths.inverted(), index) }

pub fn load_inverted(paths: &CorpusPaths) -> Result<InvertedIndex> { load_json(&paths.inverted()) }

/// The idf file holds only `{term: idf}`; the mode lives in `meta.json`.
pub fn save_idf(paths: &CorpusPaths, idf: &IdfTable) -> Result<()> { save_json(&paths.idf(), &idf.weights) }

pub fn load_idf(paths: &CorpusPaths, mode: IdfMode) -> Result<IdfTable> {
    let weights = load_json(&paths.idf())?;
    Ok(IdfTable { mode, weights })
}

pub fn save_vectors(paths: &CorpusPaths, vectors: &DocumentVectors) -> Result<()> { save_json(&paths.vectors(), vectors) }

pub fn load_vectors(paths: &CorpusPaths) -> Result<DocumentVectors> { load_json(&paths.vectors()) }

pub fn save_location_map(path: &Path, map: &LocationMap) -> Result<()> { save_json(path, map) }

pub fn load_location_map(path: &Path) -> Result<LocationMap> { load_json(path) }
