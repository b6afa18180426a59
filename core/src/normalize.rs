use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

use crate::error::{IndexError, Result};

const ENGLISH_STOPWORDS: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","cannot","could",
    "did","do","does","doing","down","during",
    "each","few","for","from","further",
    "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
    "i","if","in","into","is","it","its","itself",
    "me","more","most","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","should","so","some","such",
    "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
    "under","until","up","very",
    "was","we","were","what","when","where","which","while","who","whom","why","with","would",
    "you","your","yours","yourself","yourselves",
];

// Acronyms that the stemmer would mangle ("IPs", "TLS") and that must match verbatim.
const PROTOCOL_EXCEPTIONS: &[&str] = &[
    "BGP","DNS","DNSSEC","HTML","HTTP","HTTPS","IAB","IANA","IESG","IETF","IP","IPv4","IPv6",
    "IRTF","ISOC","JSON","MIME","MPLS","QUIC","RFC","SMTP","TCP","TLS","UDP","URI","URL","XML",
];

/// Exception and stopword membership sets.
///
/// Built once when a corpus is indexed or loaded and never mutated; share it
/// with `Arc` between every normalizer that must agree on term identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordLists {
    pub exceptions: BTreeSet<String>,
    pub stopwords: BTreeSet<String>,
}

impl WordLists {
    pub fn new<E, S>(exceptions: E, stopwords: S) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            exceptions: exceptions.into_iter().map(Into::into).collect(),
            stopwords: stopwords.into_iter().map(Into::into).collect(),
        }
    }

    /// Built-in English stopwords plus a set of protocol acronyms.
    pub fn english() -> Self {
        Self::new(PROTOCOL_EXCEPTIONS.iter().copied(), ENGLISH_STOPWORDS.iter().copied())
    }

    /// Load both lists from plain-text files, one word per line. Lines starting
    /// with `#` and blank lines are ignored. A missing path falls back to the
    /// built-in list for that set.
    pub fn from_files(exceptions: Option<&Path>, stopwords: Option<&Path>) -> Result<Self> {
        let builtin = Self::english();
        let exceptions = match exceptions {
            Some(p) => read_word_file(p)?,
            None => builtin.exceptions,
        };
        let stopwords = match stopwords {
            Some(p) => read_word_file(p)?,
            None => builtin.stopwords,
        };
        Ok(Self { exceptions, stopwords })
    }

    pub fn is_exception(&self, token: &str) -> bool { self.exceptions.contains(token) }

    pub fn is_stopword(&self, token: &str) -> bool { self.stopwords.contains(token) }

    fn lowercased(&self) -> Self {
        Self::new(
            self.exceptions.iter().map(|w| w.to_lowercase()),
            self.stopwords.iter().map(|w| w.to_lowercase()),
        )
    }
}

fn read_word_file(path: &Path) -> Result<BTreeSet<String>> {
    let text = fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Outcome of classifying a single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Member of the exception set, kept verbatim.
    Exception(String),
    /// Member of the stopword set; the caller drops it.
    Stopword,
    /// Any other word, reduced to its stem.
    Dictionary(String),
}

impl Classified {
    /// The term to index or look up, if the token survives normalization.
    pub fn into_term(self) -> Option<String> {
        match self {
            Classified::Exception(t) | Classified::Dictionary(t) => Some(t),
            Classified::Stopword => None,
        }
    }
}

/// Maps raw tokens to index terms. Indexing, boolean queries and ranked
/// queries must all go through the same `Normalizer` configuration.
pub struct Normalizer {
    lists: Arc<WordLists>,
    stemmer: Stemmer,
    fold_case: bool,
}

impl Normalizer {
    /// Case-preserving normalizer: tokens are looked up and stemmed as written.
    pub fn new(lists: Arc<WordLists>) -> Self {
        Self { lists, stemmer: Stemmer::create(Algorithm::English), fold_case: false }
    }

    /// Lowercase tokens before lookup and stemming. The word lists are folded
    /// the same way so that `IETF` in the exception file still matches.
    pub fn with_case_folding(lists: Arc<WordLists>) -> Self {
        let folded = Arc::new(lists.lowercased());
        Self { lists: folded, stemmer: Stemmer::create(Algorithm::English), fold_case: true }
    }

    pub fn fold_case(&self) -> bool { self.fold_case }

    pub fn word_lists(&self) -> &WordLists { &self.lists }

    pub fn classify(&self, token: &str) -> Classified {
        if self.fold_case {
            let lower = token.to_lowercase();
            return self.classify_exact(&lower);
        }
        self.classify_exact(token)
    }

    fn classify_exact(&self, token: &str) -> Classified {
        if self.lists.is_exception(token) {
            Classified::Exception(token.to_string())
        } else if self.lists.is_stopword(token) {
            Classified::Stopword
        } else {
            Classified::Dictionary(self.stemmer.stem(token).into_owned())
        }
    }

    /// Shorthand for `classify(token).into_term()`.
    pub fn normalize(&self, token: &str) -> Option<String> {
        self.classify(token).into_term()
    }

    /// Tokenize `text` and normalize every token, dropping stopwords.
    pub fn terms(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        for_each_token(text, |tok| {
            if let Some(term) = self.normalize(tok) {
                out.push(term);
            }
        });
        out
    }
}

/// Scan `text` after NFKC normalization and call `f` for every maximal run of
/// alphanumeric characters. Every other character is a separator.
pub fn for_each_token<F: FnMut(&str)>(text: &str, mut f: F) {
    let mut current = String::new();
    for c in text.nfkc() {
        if c.is_alphanumeric() {
            current.push(c);
        } else if !current.is_empty() {
            f(&current);
            current.clear();
        }
    }
    if !current.is_empty() {
        f(&current);
    }
}

/// Raw tokens of `text`, before classification.
pub fn tokens(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for_each_token(text, |tok| out.push(tok.to_string()));
    out
}

/// NFKC form of a single query word, so operands compare equal to indexed tokens.
pub fn canonical(word: &str) -> String {
    word.nfkc().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> Normalizer { Normalizer::new(Arc::new(WordLists::english())) }

    #[test]
    fn splits_on_every_non_alphanumeric() {
        assert_eq!(tokens("e-mail, (IPv6)  routing!"), vec!["e", "mail", "IPv6", "routing"]);
        assert!(tokens(" ,;-- ").is_empty());
    }

    #[test]
    fn exceptions_are_kept_verbatim() {
        let n = english();
        assert_eq!(n.classify("IPv6"), Classified::Exception("IPv6".into()));
        assert_eq!(n.classify("TLS"), Classified::Exception("TLS".into()));
    }

    #[test]
    fn stopwords_are_suppressed() {
        let n = english();
        assert_eq!(n.classify("the"), Classified::Stopword);
        assert_eq!(n.normalize("and"), None);
        assert_eq!(n.terms("the cat and the dog"), vec!["cat", "dog"]);
    }

    #[test]
    fn dictionary_words_are_stemmed() {
        let n = english();
        assert_eq!(n.classify("running"), Classified::Dictionary("run".into()));
        assert_eq!(n.normalize("connections").as_deref(), Some("connect"));
    }

    #[test]
    fn case_is_preserved_unless_folding() {
        let lists = Arc::new(WordLists::english());
        let plain = Normalizer::new(lists.clone());
        assert_ne!(plain.classify("The"), Classified::Stopword);

        let folded = Normalizer::with_case_folding(lists);
        assert_eq!(folded.classify("The"), Classified::Stopword);
        assert_eq!(folded.classify("IETF"), Classified::Exception("ietf".into()));
        assert_eq!(folded.normalize("Running").as_deref(), Some("run"));
    }

    #[test]
    fn word_files_skip_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let stop = dir.path().join("stop.txt");
        fs::write(&stop, "# common words\nfoo\n\n  bar  \n").unwrap();
        let lists = WordLists::from_files(None, Some(&stop)).unwrap();
        assert_eq!(lists.stopwords.len(), 2);
        assert!(lists.is_stopword("bar"));
        assert!(lists.is_exception("IETF"));
    }
}
