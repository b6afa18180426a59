use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sitesearch_core::normalize::{Normalizer, WordLists};
use sitesearch_core::{reindex, BuildSummary, CorpusBuilder, CorpusPaths, IdfMode, Snapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

mod source;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query a tf-idf site index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the corpus from an HTML site folder or JSON/JSONL files
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output corpus directory
        #[arg(long)]
        output: PathBuf,
        /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df)
        #[arg(long, default_value_t = false)]
        smoothed_idf: bool,
        /// Lowercase tokens before stopword/exception lookup and stemming
        #[arg(long, default_value_t = false)]
        fold_case: bool,
        /// Stopword file, one word per line (default: built-in English list)
        #[arg(long)]
        stopwords: Option<PathBuf>,
        /// Exception file, one word per line (default: built-in acronym list)
        #[arg(long)]
        exceptions: Option<PathBuf>,
    },
    /// Rebuild the inverted index, idf and vectors from stored direct indexes
    Reindex {
        #[arg(long)]
        corpus: PathBuf,
    },
    /// Run a query against a built corpus
    Search {
        #[arg(long)]
        corpus: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Vector)]
        mode: Mode,
        /// Maximum number of ranked results
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(required = true)]
        query: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Boolean,
    Vector,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, smoothed_idf, fold_case, stopwords, exceptions } => {
            let lists = Arc::new(WordLists::from_files(exceptions.as_deref(), stopwords.as_deref())?);
            let normalizer = if fold_case { Normalizer::with_case_folding(lists) } else { Normalizer::new(lists) };
            let mode = if smoothed_idf { IdfMode::Smoothed } else { IdfMode::Standard };
            build_corpus(&input, &output, &normalizer, mode).map(|_| ())
        }
        Commands::Reindex { corpus } => {
            let summary = reindex(&CorpusPaths::new(&corpus))?;
            tracing::info!(num_docs = summary.num_docs, num_terms = summary.num_terms, "reindex complete");
            Ok(())
        }
        Commands::Search { corpus, mode, limit, query } => search(&corpus, mode, limit, &query.join(" ")),
    }
}

fn build_corpus(input: &Path, output: &Path, normalizer: &Normalizer, mode: IdfMode) -> Result<BuildSummary> {
    if !input.exists() {
        bail!("input {} does not exist", input.display());
    }
    let mut builder = CorpusBuilder::new(CorpusPaths::new(output), normalizer, mode)?;

    // Both sides canonical so artifacts of a corpus nested in the input are recognised.
    let input = input.canonicalize().with_context(|| format!("resolving {}", input.display()))?;
    let output_root = output.canonicalize().with_context(|| format!("resolving {}", output.display()))?;
    let corpus = CorpusPaths::new(output_root);
    let root = if input.is_dir() { input.as_path() } else { input.parent().unwrap_or(&input) };
    let files: Vec<_> = source::discover(&input)
        .into_iter()
        .filter(|f| !corpus.is_artifact(f.path()))
        .collect();
    tracing::info!(files = files.len(), input = %input.display(), "discovered input files");

    let mut skipped = 0usize;
    for file in &files {
        let docs = match source::read_documents(file, root) {
            Ok(docs) => docs,
            Err(err) => {
                tracing::warn!(path = %file.path().display(), error = %err, "skipping unreadable input");
                skipped += 1;
                continue;
            }
        };
        for doc in docs {
            if let Err(err) = builder.add_document(&doc) {
                tracing::warn!(doc_id = %doc.id, error = %err, "skipping document");
                skipped += 1;
            }
        }
    }
    tracing::info!(indexed = builder.len(), skipped, "ingested documents");

    let summary = builder.finish()?;
    tracing::info!(
        output = %output.display(),
        num_docs = summary.num_docs,
        num_terms = summary.num_terms,
        num_vectors = summary.num_vectors,
        "index build complete"
    );
    Ok(summary)
}

fn search(corpus: &Path, mode: Mode, limit: usize, query: &str) -> Result<()> {
    let snapshot = Snapshot::load(CorpusPaths::new(corpus))?;
    match mode {
        Mode::Boolean => match snapshot.boolean(query) {
            Some(docs) if !docs.is_empty() => {
                println!("{} document(s)", docs.len());
                for doc_id in docs {
                    println!("{doc_id}");
                }
            }
            Some(_) => println!("0 documents"),
            None => println!("no result"),
        },
        Mode::Vector => {
            let hits = snapshot.ranked(query, limit.max(1));
            if hits.is_empty() {
                println!("no matches");
            }
            for hit in hits {
                let title = snapshot.document(&hit.doc_id).map(|m| m.title.as_str()).unwrap_or("");
                println!("{:.6}  {}  {}", hit.score, hit.doc_id, title);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const PAGE: &str = "<html><head><title>Routing</title></head><body>routing protocols</body></html>";

    fn english() -> Normalizer {
        Normalizer::new(Arc::new(WordLists::english()))
    }

    #[test]
    fn unreadable_inputs_are_skipped() {
        let site = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::write(site.path().join("index.html"), PAGE).unwrap();
        fs::write(site.path().join("broken.json"), "{ \"id\": ").unwrap();
        fs::write(site.path().join("records.jsonl"), "{\"id\":\"r1\",\"body\":\"bird\"}\nnot json\n").unwrap();

        let summary = build_corpus(site.path(), out.path(), &english(), IdfMode::Standard).unwrap();
        assert_eq!(summary.num_docs, 1);

        let snapshot = Snapshot::load(CorpusPaths::new(out.path())).unwrap();
        assert_eq!(snapshot.meta.num_docs, 1);
        let hits = snapshot.boolean("routing").unwrap();
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec!["index.html".to_string()]);
        assert!(snapshot.boolean("bird").is_none());
    }

    #[test]
    fn corpus_inside_the_site_folder_survives_rebuilds() {
        let site = tempdir().unwrap();
        fs::create_dir_all(site.path().join("docs")).unwrap();
        fs::write(site.path().join("index.html"), PAGE).unwrap();
        fs::write(site.path().join("docs/guide.html"), "<title>Guide</title><body>routing tables</body>").unwrap();

        let first = build_corpus(site.path(), site.path(), &english(), IdfMode::Standard).unwrap();
        let second = build_corpus(site.path(), site.path(), &english(), IdfMode::Standard).unwrap();
        assert_eq!(first.num_docs, 2);
        assert_eq!(second, first);
        assert!(site.path().join("docs/guide.html").exists());

        let snapshot = Snapshot::load(CorpusPaths::new(site.path())).unwrap();
        assert_eq!(snapshot.docs.keys().collect::<Vec<_>>(), vec!["docs/guide.html", "index.html"]);
    }

    #[test]
    fn missing_input_is_an_error() {
        let out = tempdir().unwrap();
        let missing = out.path().join("nope");
        assert!(build_corpus(&missing, out.path(), &english(), IdfMode::Standard).is_err());
    }
}
