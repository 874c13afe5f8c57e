// SPDX-License-Identifier: MIT

//! Retrieval capability
//!
//! [`Retriever`] is the seam the tutoring graph's retrieval stage calls.
//! [`KeywordRetriever`] is a small in-process implementation that ranks chunks
//! by how many distinct query terms they contain.

use crate::adk::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_TOP_K: usize = 5;

/// A piece of a loaded document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub content: String,
    /// Path or URL the chunk came from
    pub source: String,
}

impl Chunk {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }
}

/// Trait for anything that can fetch context for a query
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<Chunk>>;
}

/// Join retrieved chunks into a single context block
pub fn join_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Ranks chunks by distinct query-term overlap
pub struct KeywordRetriever {
    chunks: Vec<Chunk>,
    /// Pre-tokenized chunk terms, same order as `chunks`
    terms: Vec<HashSet<String>>,
    k: usize,
}

impl KeywordRetriever {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self::with_k(chunks, DEFAULT_TOP_K)
    }

    pub fn with_k(chunks: Vec<Chunk>, k: usize) -> Self {
        let terms = chunks.iter().map(|c| tokenize(&c.content)).collect();
        Self { chunks, terms, k }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn rank(&self, query: &str) -> Vec<Chunk> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, usize)> = self
            .terms
            .iter()
            .enumerate()
            .map(|(i, terms)| (i, query_terms.intersection(terms).count()))
            .filter(|(_, score)| *score > 0)
            .collect();

        // Stable sort keeps document order for equal scores
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        scored
            .into_iter()
            .take(self.k)
            .map(|(i, _)| self.chunks[i].clone())
            .collect()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Chunk>> {
        let results = self.rank(query);
        log::info!(
            "Retrieved {} of {} chunks for '{}'",
            results.len(),
            self.chunks.len(),
            query
        );
        Ok(results)
    }
}

/// Lower-cased alphanumeric terms, ignoring very short words
fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
        .collect()
}
