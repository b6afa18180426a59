use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sitesearch_core::normalize::{Normalizer, WordLists};
use sitesearch_core::{CorpusBuilder, CorpusPaths, IdfMode, SourceDocument};
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

fn doc(id: &str, title: &str, body: &str) -> SourceDocument {
    SourceDocument { id: id.into(), title: title.into(), body: body.into(), ..SourceDocument::default() }
}

fn build_tiny_corpus(dir: &std::path::Path) {
    let normalizer = Normalizer::new(Arc::new(WordLists::english()));
    let mut builder = CorpusBuilder::new(CorpusPaths::new(dir), &normalizer, IdfMode::Smoothed).unwrap();
    builder.add_document(&doc("doc1", "Cats", "cat dog cat")).unwrap();
    builder.add_document(&doc("doc2", "Birds", "dog bird")).unwrap();
    builder.finish().unwrap();
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    call(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn app(dir: &std::path::Path) -> Router {
    sitesearch_server::build_app(dir.to_string_lossy().to_string()).unwrap()
}

#[tokio::test]
async fn boolean_search_returns_matching_documents() {
    let dir = tempdir().unwrap();
    build_tiny_corpus(dir.path());

    let (status, json) = get(app(dir.path()), "/search/boolean?q=cat%20OR%20bird").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["matched"], true);
    let ids: Vec<&str> = json["results"].as_array().unwrap().iter().map(|r| r["doc_id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["doc1", "doc2"]);
    assert_eq!(json["results"][0]["title"], "Cats");
}

#[tokio::test]
async fn boolean_search_signals_no_result() {
    let dir = tempdir().unwrap();
    build_tiny_corpus(dir.path());

    let (status, json) = get(app(dir.path()), "/search/boolean?q=cat%20AND%20unicorn").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["matched"], false);
    assert_eq!(json["total_hits"], 0);
}

#[tokio::test]
async fn vector_search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    build_tiny_corpus(dir.path());

    let (status, json) = get(app(dir.path()), "/search/vector?q=bird&k=5").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["doc_id"], "doc2");
    assert!(arr[0]["score"].as_f64().unwrap() > 0.0);
    assert!(arr[0]["snippet"].as_str().unwrap().contains("<em>bird</em>"));
}

#[tokio::test]
async fn doc_lookup_and_missing_doc() {
    let dir = tempdir().unwrap();
    build_tiny_corpus(dir.path());

    let (status, json) = get(app(dir.path()), "/doc?id=doc1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Cats");
    assert!(json["text"].as_str().unwrap().contains("cat dog cat"));

    let (status, _) = get(app(dir.path()), "/doc?id=nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_requires_admin_token() {
    let dir = tempdir().unwrap();
    build_tiny_corpus(dir.path());

    let req = Request::post("/index/reload").body(Body::empty()).unwrap();
    let (status, _) = call(app(dir.path()), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
