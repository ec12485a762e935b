//! Fuzzy post search.
//!
//! Each post is indexed by title, summary, category and tags. Matching is
//! location-agnostic: a query found anywhere inside a field scores 0.0, and
//! otherwise the best Damerau-Levenshtein distance against any same-length
//! window of the field counts (0.0 perfect, 1.0 nothing in common). A post
//! scores its best field and matches when that score is within the threshold.

use inkpress_core::{Post, normalize_category};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Default similarity threshold
pub const DEFAULT_THRESHOLD: f64 = 0.4;

/// Search builder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    /// Exact category filter
    pub category: Option<String>,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Only posts in this category
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set result limit
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A matching post and its score (lower is better)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub post: Post,
    pub score: f64,
}

#[derive(Debug, Clone)]
struct IndexedPost {
    category: String,
    fields: Vec<Vec<char>>,
}

impl IndexedPost {
    fn new(post: &Post) -> Self {
        let mut fields = vec![
            post.title.to_lowercase(),
            post.summary.to_lowercase(),
            post.category.to_lowercase(),
        ];
        fields.extend(post.tags.iter().map(|t| t.to_lowercase()));
        Self {
            category: normalize_category(&post.category),
            fields: fields
                .into_iter()
                .filter(|f| !f.is_empty())
                .map(|f| f.chars().collect())
                .collect(),
        }
    }
}

/// Search index over one post collection
#[derive(Debug, Clone)]
pub struct SearchIndex {
    threshold: f64,
    posts: Arc<[Post]>,
    entries: Vec<IndexedPost>,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl SearchIndex {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            posts: Arc::from(Vec::new()),
            entries: Vec::new(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Re-index when given a different collection. Returns whether it rebuilt.
    pub fn sync(&mut self, posts: &Arc<[Post]>) -> bool {
        if Arc::ptr_eq(&self.posts, posts) {
            return false;
        }
        self.entries = posts.iter().map(IndexedPost::new).collect();
        self.posts = Arc::clone(posts);
        log::debug!("Indexed {} posts for search", self.posts.len());
        true
    }

    /// Matching posts, best first; ties keep collection order
    #[instrument(skip(self), fields(indexed = self.posts.len()), name = "search_posts")]
    pub fn search(&self, query: &SearchQuery) -> Vec<SearchHit> {
        let text: Vec<char> = query.text.trim().to_lowercase().chars().collect();
        let category = query.category.as_deref().map(normalize_category);

        let mut hits: Vec<SearchHit> = self
            .posts
            .iter()
            .zip(&self.entries)
            .filter(|(_, entry)| category.as_ref().is_none_or(|c| &entry.category == c))
            .filter_map(|(post, entry)| {
                let score = if text.is_empty() {
                    0.0
                } else {
                    entry
                        .fields
                        .iter()
                        .map(|field| field_score(&text, field))
                        .fold(1.0, f64::min)
                };
                (score <= self.threshold).then(|| SearchHit {
                    post: post.clone(),
                    score,
                })
            })
            .collect();

        // Stable: equal scores stay in collection order
        hits.sort_by(|a, b| a.score.total_cmp(&b.score));
        if let Some(limit) = query.limit {
            hits.truncate(limit);
        }
        hits
    }
}

/// Distance between a query and the closest window of a field
pub fn field_score(query: &[char], field: &[char]) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    if field.is_empty() {
        return 1.0;
    }
    if contains(field, query) {
        return 0.0;
    }

    let query: String = query.iter().collect();
    let len = query.chars().count();
    if field.len() <= len {
        let field: String = field.iter().collect();
        return distance(&query, &field);
    }

    let mut best: f64 = 1.0;
    for width in [len.saturating_sub(1).max(1), len, len + 1] {
        if width > field.len() {
            continue;
        }
        for window in field.windows(width) {
            let window: String = window.iter().collect();
            best = best.min(distance(&query, &window));
            if best == 0.0 {
                return 0.0;
            }
        }
    }
    best
}

fn distance(a: &str, b: &str) -> f64 {
    1.0 - strsim::normalized_damerau_levenshtein(a, b)
}

fn contains(haystack: &[char], needle: &[char]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}
