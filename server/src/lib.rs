use anyhow::Result;
use axum::{extract::{Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sitesearch_core::{CorpusPaths, Snapshot};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Deserialize)]
pub struct DocParams {
    pub id: String,
}

#[derive(Serialize)]
pub struct BooleanResponse {
    pub query: String,
    pub took_s: f64,
    /// False when the query has no result (unknown term or malformed query).
    pub matched: bool,
    pub total_hits: usize,
    pub results: Vec<DocHit>,
}

#[derive(Serialize)]
pub struct DocHit {
    pub doc_id: String,
    pub title: String,
}

#[derive(Serialize)]
pub struct VectorResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: f64,
    pub title: String,
    pub snippet: Option<String>,
}

/// Shared handle to the loaded corpus. Queries take the read lock; a reload
/// swaps the whole snapshot under the write lock.
#[derive(Clone)]
pub struct AppState {
    pub corpus_root: PathBuf,
    pub snapshot: Arc<RwLock<Arc<Snapshot>>>,
    pub admin_token: Option<String>,
}

impl AppState {
    fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }
}

pub fn build_app(corpus_dir: String) -> Result<Router> {
    let snapshot = Snapshot::load(CorpusPaths::new(&corpus_dir))?;
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let app_state = AppState {
        corpus_root: PathBuf::from(&corpus_dir),
        snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
        admin_token,
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search/boolean", get(boolean_handler))
        .route("/search/vector", get(vector_handler))
        .route("/doc", get(doc_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors);
    Ok(app)
}

pub async fn boolean_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<BooleanResponse> {
    let start = std::time::Instant::now();
    let snapshot = state.current();
    let outcome = snapshot.boolean(&params.q);
    let matched = outcome.is_some();
    let results: Vec<DocHit> = outcome
        .unwrap_or_default()
        .into_iter()
        .map(|doc_id| {
            let title = snapshot.document(&doc_id).map(|m| m.title.clone()).unwrap_or_default();
            DocHit { doc_id, title }
        })
        .collect();
    tracing::debug!(query = %params.q, matched, hits = results.len(), "boolean search");
    Json(BooleanResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        matched,
        total_hits: results.len(),
        results,
    })
}

pub async fn vector_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<VectorResponse> {
    let start = std::time::Instant::now();
    let snapshot = state.current();
    let hits = snapshot.space.search(&params.q, &snapshot.normalizer);
    let total_hits = hits.len();
    let k = params.k.clamp(1, 100);

    // Capture raw query terms for highlighting
    let raw_terms: Vec<String> = params.q.split_whitespace().map(|s| s.to_string()).collect();
    let results: Vec<SearchHit> = hits
        .into_iter()
        .take(k)
        .map(|hit| {
            let title = snapshot.document(&hit.doc_id).map(|m| m.title.clone()).unwrap_or_default();
            let snippet = snapshot.text(&hit.doc_id).and_then(|text| snippet_from_text(&text, &raw_terms));
            SearchHit { doc_id: hit.doc_id, score: hit.score, title, snippet }
        })
        .collect();
    tracing::debug!(query = %params.q, total_hits, "vector search");
    Json(VectorResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits, results })
}

pub async fn doc_handler(State(state): State<AppState>, Query(params): Query<DocParams>) -> Result<Json<serde_json::Value>, StatusCode> {
    let snapshot = state.current();
    let meta = snapshot.document(&params.id).ok_or(StatusCode::NOT_FOUND)?;
    let mut obj = serde_json::json!({
        "doc_id": params.id,
        "title": meta.title,
        "description": meta.description,
    });
    if let Some(text) = snapshot.text(&params.id) {
        obj["text"] = serde_json::Value::String(text);
    }
    Ok(Json(obj))
}

fn snippet_from_text(text: &str, raw_terms: &[String]) -> Option<String> {
    if text.trim().is_empty() { return None; }
    let first_idx = raw_terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .find_map(|t| find_case_insensitive(text, t));
    let snippet: String = match first_idx {
        Some(idx) => {
            let start = floor_char_boundary(text, idx.saturating_sub(100));
            let end = floor_char_boundary(text, (idx + 200).min(text.len()));
            text[start..end].to_string()
        }
        None => text.chars().take(200).collect(),
    };
    Some(highlight_terms(&snippet, raw_terms))
}

fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let pat = regex::RegexBuilder::new(&regex::escape(needle)).case_insensitive(true).build().ok()?;
    pat.find(haystack).map(|m| m.start())
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut s = snippet.to_string();
    for t in terms {
        if t.trim().is_empty() { continue; }
        let Ok(pat) = regex::RegexBuilder::new(&regex::escape(t)).case_insensitive(true).build() else { continue };
        s = pat.replace_all(&s, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string();
    }
    s
}

// --- Admin endpoints ---
async fn reload_handler(State(state): State<AppState>, headers: axum::http::HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let root = state.corpus_root.clone();
    let loaded = tokio::task::spawn_blocking(move || Snapshot::load(CorpusPaths::new(root)))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let num_docs = loaded.meta.num_docs;
    *state.snapshot.write() = Arc::new(loaded);
    tracing::info!(num_docs, "corpus reloaded");
    Ok(Json(serde_json::json!({ "reloaded": true, "num_docs": num_docs })))
}

fn authorize(state: &AppState, headers: &axum::http::HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
