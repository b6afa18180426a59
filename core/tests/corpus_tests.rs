use sitesearch_core::normalize::{Normalizer, WordLists};
use sitesearch_core::{CorpusBuilder, CorpusPaths, IdfMode, Snapshot, SourceDocument};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::tempdir;

fn doc(id: &str, body: &str) -> SourceDocument {
    SourceDocument { id: id.into(), body: body.into(), ..SourceDocument::default() }
}

fn build(dir: &std::path::Path, docs: &[SourceDocument], mode: IdfMode) -> Snapshot {
    let paths = CorpusPaths::new(dir);
    let normalizer = Normalizer::new(Arc::new(WordLists::english()));
    let mut builder = CorpusBuilder::new(paths.clone(), &normalizer, mode).unwrap();
    for d in docs {
        builder.add_document(d).unwrap();
    }
    builder.finish().unwrap();
    Snapshot::load(paths).unwrap()
}

fn ids(items: &[&str]) -> Option<BTreeSet<String>> {
    Some(items.iter().map(|s| s.to_string()).collect())
}

#[test]
fn two_document_scenario() {
    let dir = tempdir().unwrap();
    let snap = build(dir.path(), &[doc("doc1", "cat dog cat"), doc("doc2", "dog bird")], IdfMode::Standard);

    let cat = snap.index.postings("cat").unwrap();
    assert_eq!(cat.len(), 1);
    assert_eq!(cat["doc1"], 2);
    let dog = snap.index.postings("dog").unwrap();
    assert_eq!((dog["doc1"], dog["doc2"]), (1, 1));
    assert_eq!(snap.index.postings("bird").unwrap()["doc2"], 1);

    assert_eq!(snap.boolean("cat AND dog"), ids(&["doc1"]));
    assert_eq!(snap.boolean("cat OR bird"), ids(&["doc1", "doc2"]));
    assert_eq!(snap.boolean("dog NOT cat"), ids(&["doc2"]));
    assert_eq!(snap.boolean("cat AND unicorn"), None);
}

#[test]
fn every_posting_traces_back_to_a_direct_index() {
    let dir = tempdir().unwrap();
    let docs = [
        doc("a", "routing protocols route packets"),
        doc("b", "the routing table of a router"),
        doc("c", "IPv6 packets"),
    ];
    let snap = build(dir.path(), &docs, IdfMode::Standard);

    let mut postings = 0;
    for d in &docs {
        let meta = snap.document(&d.id).unwrap();
        let direct = sitesearch_core::persist::load_direct_index(&snap.paths, &d.id, &meta.direct_index).unwrap();
        for (term, &count) in &direct.counts {
            assert_eq!(snap.index.postings(term).unwrap()[&d.id], count);
        }
        postings += direct.counts.len();
    }
    let indexed: usize = snap.index.postings.values().map(|p| p.len()).sum();
    assert_eq!(indexed, postings);
}

#[test]
fn ranked_search_prefers_closer_documents() {
    let dir = tempdir().unwrap();
    let docs = [
        doc("a", "routing routing routing tables"),
        doc("b", "routing tables tables tables"),
        doc("c", "congestion control"),
    ];
    let snap = build(dir.path(), &docs, IdfMode::Smoothed);

    let hits = snap.ranked("routing routing routing tables", 10);
    let order: Vec<&str> = hits.iter().map(|h| h.doc_id.as_str()).collect();
    assert_eq!(order, vec!["a", "b"]);
    assert!((hits[0].score - 1.0).abs() < 1e-9);
    assert!(hits[0].score > hits[1].score);
    assert!(hits.iter().all(|h| h.score > 0.0 && h.score <= 1.0 + 1e-12));

    assert!(snap.ranked("unicorn", 10).is_empty());
    assert_eq!(snap.ranked("routing", 1).len(), 1);
}

#[test]
fn equal_scores_are_all_returned() {
    let dir = tempdir().unwrap();
    let docs = [doc("a", "quic transport"), doc("b", "quic streams"), doc("c", "quic")];
    let snap = build(dir.path(), &docs, IdfMode::Smoothed);

    // a single shared term always gives a restricted cosine of exactly 1
    let hits = snap.ranked("quic", 10);
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|h| h.score == hits[0].score));
}

#[test]
fn folded_corpus_folds_queries_too() {
    let dir = tempdir().unwrap();
    let paths = CorpusPaths::new(dir.path());
    let normalizer = Normalizer::with_case_folding(Arc::new(WordLists::english()));
    let mut builder = CorpusBuilder::new(paths.clone(), &normalizer, IdfMode::Standard).unwrap();
    builder.add_document(&doc("a", "The IETF publishes Standards")).unwrap();
    builder.add_document(&doc("b", "drafts")).unwrap();
    builder.finish().unwrap();

    let snap = Snapshot::load(paths).unwrap();
    assert!(snap.meta.fold_case);
    assert_eq!(snap.boolean("ietf AND STANDARDS"), ids(&["a"]));
    assert_eq!(snap.boolean("the"), None);
}

#[test]
fn loading_an_unbuilt_corpus_fails() {
    let dir = tempdir().unwrap();
    assert!(Snapshot::load(CorpusPaths::new(dir.path())).is_err());
}
