use anyhow::{Context, Result};
use scraper::{Html, Selector};
use sitesearch_core::SourceDocument;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One input file and how to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFile {
    Html(PathBuf),
    Json(PathBuf),
    Jsonl(PathBuf),
}

impl InputFile {
    fn classify(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" => Some(InputFile::Html(path.to_path_buf())),
            "json" => Some(InputFile::Json(path.to_path_buf())),
            "jsonl" => Some(InputFile::Jsonl(path.to_path_buf())),
            _ => None,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            InputFile::Html(p) | InputFile::Json(p) | InputFile::Jsonl(p) => p,
        }
    }
}

/// Every indexable file under `input`, in a stable order.
pub fn discover(input: &Path) -> Vec<InputFile> {
    if input.is_file() {
        return InputFile::classify(input).into_iter().collect();
    }
    let mut files: Vec<InputFile> = WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| InputFile::classify(e.path()))
        .collect();
    files.sort_by(|a, b| a.path().cmp(b.path()));
    files
}

/// Read the documents held by one input file. HTML files yield a single
/// document whose id is the path relative to `root`.
pub fn read_documents(file: &InputFile, root: &Path) -> Result<Vec<SourceDocument>> {
    match file {
        InputFile::Html(path) => {
            let html = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            Ok(vec![extract_html(&document_id(path, root), &html)])
        }
        InputFile::Json(path) => read_json(path),
        InputFile::Jsonl(path) => read_jsonl(path),
    }
}

fn document_id(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Title, keyword and description metadata, and body text of an HTML page.
pub fn extract_html(id: &str, html: &str) -> SourceDocument {
    let doc = Html::parse_document(html);
    SourceDocument {
        id: id.to_string(),
        title: select_text(&doc, "title"),
        keywords: meta_content(&doc, "keywords"),
        description: meta_content(&doc, "description"),
        body: select_text(&doc, "body"),
    }
}

fn select_text(doc: &Html, selector: &str) -> String {
    let Ok(sel) = Selector::parse(selector) else { return String::new() };
    doc.select(&sel)
        .next()
        .map(|n| n.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

fn meta_content(doc: &Html, name: &str) -> String {
    let Ok(sel) = Selector::parse(&format!("meta[name={name}]")) else { return String::new() };
    doc.select(&sel)
        .next()
        .and_then(|n| n.value().attr("content"))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn read_jsonl(path: &Path) -> Result<Vec<SourceDocument>> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut docs = Vec::new();
    for (lineno, line) in BufReader::new(f).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: SourceDocument = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", path.display(), lineno + 1))?;
        docs.push(doc);
    }
    Ok(docs)
}

fn read_json(path: &Path) -> Result<Vec<SourceDocument>> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_reader(BufReader::new(f))?;
    match json {
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(Into::into))
            .collect(),
        serde_json::Value::Object(_) => Ok(vec![serde_json::from_value(json)?]),
        _ => Ok(Vec::new()),
    }
}
