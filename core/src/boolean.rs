//! Flat boolean queries over the inverted index.
//!
//! A query is `operand OP operand OP operand ...` with `OP` one of `AND`, `OR`,
//! `NOT` (any case). There is no precedence and no grouping: operators are
//! applied strictly left to right, so `a AND b OR c` is `(a ∩ b) ∪ c`.

use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;

use crate::inverted::InvertedIndex;
use crate::normalize::{canonical, Classified, Normalizer};
use crate::{DocId, Term};

/// Documents matched by a boolean query.
pub type DocSet = BTreeSet<DocId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Intersection.
    And,
    /// Union.
    Or,
    /// Left operand minus right operand.
    Not,
}

impl FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("and") {
            Ok(Operator::And)
        } else if s.eq_ignore_ascii_case("or") {
            Ok(Operator::Or)
        } else if s.eq_ignore_ascii_case("not") {
            Ok(Operator::Not)
        } else {
            Err(())
        }
    }
}

impl Operator {
    fn apply<'a>(self, left: HashSet<&'a str>, right: HashSet<&'a str>) -> HashSet<&'a str> {
        match self {
            Operator::And => {
                let (small, large) = if left.len() < right.len() { (left, right) } else { (right, left) };
                small.into_iter().filter(|doc| large.contains(doc)).collect()
            }
            Operator::Or => {
                let (mut large, small) = if left.len() < right.len() { (right, left) } else { (left, right) };
                large.extend(small);
                large
            }
            Operator::Not => left.into_iter().filter(|doc| !right.contains(doc)).collect(),
        }
    }
}

/// A parsed query: the first operand followed by (operator, operand) pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanQuery {
    pub first: Term,
    pub rest: Vec<(Operator, Term)>,
}

impl BooleanQuery {
    /// Parse `query` left to right, normalizing operands with `normalizer`.
    ///
    /// A stopword operand is dropped along with one adjacent operator: the one
    /// before it, or the one after it when the stopword leads the query.
    /// Returns `None` for an empty query, a query made only of stopwords, an
    /// unknown operator, or a trailing operator with no operand.
    pub fn parse(query: &str, normalizer: &Normalizer) -> Option<Self> {
        let mut words = query.split_whitespace();

        let mut first = None;
        while let Some(word) = words.next() {
            match normalizer.classify(&canonical(word)) {
                Classified::Stopword => {
                    words.next();
                }
                Classified::Exception(term) | Classified::Dictionary(term) => {
                    first = Some(term);
                    break;
                }
            }
        }
        let first = first?;

        let mut rest = Vec::new();
        while let Some(op) = words.next() {
            let op: Operator = op.parse().ok()?;
            let operand = words.next()?;
            if let Some(term) = normalizer.classify(&canonical(operand)).into_term() {
                rest.push((op, term));
            }
        }
        Some(Self { first, rest })
    }

    /// Fold the operators over the posting sets. Any operand missing from the
    /// index ends evaluation with `None`.
    pub fn evaluate(&self, index: &InvertedIndex) -> Option<DocSet> {
        let mut acc = posting_set(index, &self.first)?;
        for (op, term) in &self.rest {
            let rhs = posting_set(index, term)?;
            acc = op.apply(acc, rhs);
        }
        Some(acc.into_iter().map(str::to_string).collect())
    }
}

fn posting_set<'a>(index: &'a InvertedIndex, term: &str) -> Option<HashSet<&'a str>> {
    index
        .postings(term)
        .map(|postings| postings.keys().map(String::as_str).collect())
}

/// Parse and evaluate `query` in one step.
pub fn search(index: &InvertedIndex, query: &str, normalizer: &Normalizer) -> Option<DocSet> {
    BooleanQuery::parse(query, normalizer)?.evaluate(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direct::DirectIndex;
    use crate::normalize::WordLists;
    use std::sync::Arc;

    fn normalizer() -> Normalizer { Normalizer::new(Arc::new(WordLists::english())) }

    fn index() -> InvertedIndex {
        let n = normalizer();
        let docs = [
            DirectIndex::build("doc1", "cat dog cat", &n),
            DirectIndex::build("doc2", "dog bird", &n),
            DirectIndex::build("doc3", "fish bird cat", &n),
        ];
        InvertedIndex::from_direct(&docs)
    }

    fn run(q: &str) -> Option<Vec<String>> {
        search(&index(), q, &normalizer()).map(|s| s.into_iter().collect())
    }

    fn set(docs: &[&str]) -> Option<Vec<String>> {
        Some(docs.iter().map(|d| d.to_string()).collect())
    }

    #[test]
    fn operators_parse_case_insensitively() {
        assert_eq!("aNd".parse::<Operator>(), Ok(Operator::And));
        assert_eq!("OR".parse::<Operator>(), Ok(Operator::Or));
        assert_eq!("not".parse::<Operator>(), Ok(Operator::Not));
        assert!("XOR".parse::<Operator>().is_err());
    }

    #[test]
    fn basic_set_algebra() {
        assert_eq!(run("cat AND dog"), set(&["doc1"]));
        assert_eq!(run("cat or bird"), set(&["doc1", "doc2", "doc3"]));
        assert_eq!(run("dog NOT cat"), set(&["doc2"]));
        assert_eq!(run("bird"), set(&["doc2", "doc3"]));
    }

    #[test]
    fn self_combinations() {
        assert_eq!(run("cat AND cat"), run("cat"));
        assert_eq!(run("cat OR cat"), run("cat"));
        assert_eq!(run("cat NOT cat"), set(&[]));
    }

    #[test]
    fn folds_left_to_right() {
        // (cat ∩ dog) ∪ fish = {doc1} ∪ {doc3}
        assert_eq!(run("cat AND dog OR fish"), set(&["doc1", "doc3"]));
        // (bird ∪ cat) − dog = {doc3}, whereas bird ∪ (cat − dog) = {doc2, doc3}
        assert_eq!(run("bird OR cat NOT dog"), set(&["doc3"]));
    }

    #[test]
    fn operand_order_does_not_matter() {
        assert_eq!(run("bird AND cat"), run("cat AND bird"));
        assert_eq!(run("fish OR dog"), run("dog OR fish"));
    }

    #[test]
    fn unknown_term_means_no_result() {
        assert_eq!(run("zebra"), None);
        assert_eq!(run("cat AND zebra"), None);
        assert_eq!(run("zebra OR cat"), None);
    }

    #[test]
    fn malformed_queries_mean_no_result() {
        assert_eq!(run(""), None);
        assert_eq!(run("   "), None);
        assert_eq!(run("cat XOR dog"), None);
        assert_eq!(run("cat AND"), None);
    }

    #[test]
    fn stopwords_drop_with_an_adjacent_operator() {
        assert_eq!(run("cat AND the OR bird"), run("cat OR bird"));
        assert_eq!(run("the AND cat OR dog"), run("cat OR dog"));
        assert_eq!(run("cat OR the"), run("cat"));
        assert_eq!(run("the"), None);
    }

    #[test]
    fn operands_are_stemmed() {
        assert_eq!(run("cats AND dogs"), set(&["doc1"]));
    }

    #[test]
    fn parse_produces_pairs() {
        let q = BooleanQuery::parse("cats AND dogs NOT birds", &normalizer()).unwrap();
        assert_eq!(q.first, "cat");
        assert_eq!(q.rest, vec![(Operator::And, "dog".to_string()), (Operator::Not, "bird".to_string())]);
    }
}
