//! Tokenization shared by scoring, inference, and gap detection.

use std::collections::HashSet;

/// Words too common to count as evidence of a shared topic.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "in", "into", "is", "it", "its", "of", "on", "or", "that", "the", "their", "this", "to",
    "uses", "using", "was", "what", "when", "where", "which", "who", "why", "with",
];

/// Lowercased whitespace tokens with surrounding punctuation trimmed
/// (so "learning?" and "learning" are the same term).
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().filter_map(|raw| {
        let t = raw
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        (!t.is_empty()).then_some(t)
    })
}

/// Distinct tokens of `text`.
pub fn term_set(text: &str) -> HashSet<String> {
    tokenize(text).collect()
}

/// Distinct tokens minus stopwords and one/two-letter words.
pub fn significant_terms(text: &str) -> HashSet<String> {
    tokenize(text).filter(|t| is_significant(t)).collect()
}

pub fn is_significant(term: &str) -> bool {
    term.chars().count() > 2 && !STOPWORDS.contains(&term)
}

/// Distinct terms of a query, computed once per query.
#[derive(Debug, Clone, Default)]
pub struct QueryTerms {
    terms: HashSet<String>,
}

impl QueryTerms {
    pub fn new(query: &str) -> Self {
        Self {
            terms: term_set(query),
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    /// Fraction of query terms that occur in `content`; 0.0 for an empty query.
    pub fn coverage(&self, content: &str) -> f64 {
        if self.terms.is_empty() {
            return 0.0;
        }
        let content_terms = term_set(content);
        let present = self
            .terms
            .iter()
            .filter(|t| content_terms.contains(*t))
            .count();
        present as f64 / self.terms.len() as f64
    }

    /// Query terms worth reporting as uncovered, sorted.
    pub fn significant(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.iter().filter(|t| is_significant(t)).collect();
        out.sort_unstable();
        out
    }
}
