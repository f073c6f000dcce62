//! Token-based relevance scoring for the store search box.
//!
//! Postgres answers the same question with `tsvector @@ tsquery`; this module
//! is the in-process equivalent: a store matches when it shares at least one
//! token with the query, and name hits outweigh description hits.

use std::collections::HashSet;

/// Maximum number of results returned by text search.
pub const SEARCH_LIMIT: usize = 5;

const NAME_WEIGHT: f64 = 2.0;
const DESCRIPTION_WEIGHT: f64 = 1.0;

/// Words too common to carry meaning on their own.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "the", "to", "with",
];

/// A parsed free-text query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    tokens: Vec<String>,
}

impl TextQuery {
    /// Split a raw query into distinct lower-case tokens.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut seen = HashSet::new();
        let tokens = tokenize(raw)
            .filter(|t| seen.insert(t.clone()))
            .collect();
        Self { tokens }
    }

    /// True when nothing searchable is left (blank or stop words only).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Relevance of a document, or `None` if no query token occurs in it.
    #[must_use]
    pub fn score(&self, name: &str, description: Option<&str>) -> Option<f64> {
        if self.is_empty() {
            return None;
        }

        let name_tokens: HashSet<String> = tokenize(name).collect();
        let desc_tokens: HashSet<String> = description.map(|d| tokenize(d).collect()).unwrap_or_default();

        let score: f64 = self
            .tokens
            .iter()
            .map(|t| {
                let mut s = 0.0;
                if name_tokens.contains(t) {
                    s += NAME_WEIGHT;
                }
                if desc_tokens.contains(t) {
                    s += DESCRIPTION_WEIGHT;
                }
                s
            })
            .sum();

        (score > 0.0).then_some(score)
    }

    /// Score `items`, keep matches, order by score descending and truncate.
    ///
    /// Ties keep input order.
    pub fn rank<T, F>(&self, items: impl IntoIterator<Item = T>, limit: usize, text_of: F) -> Vec<T>
    where
        F: Fn(&T) -> (&str, Option<&str>),
    {
        let mut scored: Vec<(T, f64)> = items
            .into_iter()
            .filter_map(|item| {
                let (name, desc) = text_of(&item);
                let score = self.score(name, desc)?;
                Some((item, score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.into_iter().take(limit).map(|(item, _)| item).collect()
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
}
