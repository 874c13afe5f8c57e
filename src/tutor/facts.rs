// SPDX-License-Identifier: MIT

//! Long-term fact store
//!
//! Facts about the user live in a JSON array on disk. The whole file is read
//! when the store opens and rewritten on every new fact.

use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::adk::error::Result;

pub const DEFAULT_FACTS_PATH: &str = "data/user_profile.json";

/// Pull the fact to remember out of a question.
///
/// `remember that` takes everything after its first occurrence; otherwise
/// every `save` is removed; otherwise the question is kept verbatim.
/// Matching is case-sensitive.
pub fn extract_fact(question: &str) -> String {
    if let Some((_, rest)) = question.split_once("remember that") {
        rest.trim().to_string()
    } else if question.contains("save") {
        question.replace("save", "").trim().to_string()
    } else {
        question.to_string()
    }
}

/// JSON-file backed, append-only list of facts
pub struct FactStore {
    path: PathBuf,
    facts: Mutex<Vec<String>>,
}

impl FactStore {
    /// Open the store, treating a missing or unreadable file as empty
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let facts = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(facts) => facts,
                Err(e) => {
                    log::warn!("Ignoring corrupt fact store {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        log::info!("Loaded {} facts from {}", facts.len(), path.display());

        Ok(Self {
            path,
            facts: Mutex::new(facts),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `fact` unless it is already stored. Returns whether it was new.
    pub async fn save_fact(&self, fact: &str) -> Result<bool> {
        let mut facts = self.facts.lock().await;
        if facts.iter().any(|f| f == fact) {
            log::info!("Fact already known: {}", fact);
            return Ok(false);
        }

        facts.push(fact.to_string());
        if let Err(e) = self.persist(&facts).await {
            facts.pop();
            return Err(e);
        }
        log::info!("Saved fact: {}", fact);
        Ok(true)
    }

    /// Every stored fact, oldest first
    pub async fn facts(&self) -> Vec<String> {
        self.facts.lock().await.clone()
    }

    /// Facts relevant to `query`. There is no ranking, so this is all of them.
    pub async fn relevant_facts(&self, _query: &str) -> Vec<String> {
        self.facts().await
    }

    async fn persist(&self, facts: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(facts)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_remember_that() {
        assert_eq!(
            extract_fact("Please remember that my name is X"),
            "my name is X"
        );
    }

    #[test]
    fn test_extract_save() {
        assert_eq!(extract_fact("save this fact"), "this fact");
        assert_eq!(extract_fact("save it, save it"), "it,  it");
    }

    #[test]
    fn test_extract_verbatim() {
        assert_eq!(extract_fact("My name is Ada"), "My name is Ada");
        // Case-sensitive: capitalised keywords do not match
        assert_eq!(extract_fact("Remember That I code"), "Remember That I code");
    }

    #[test]
    fn test_remember_that_beats_save() {
        assert_eq!(
            extract_fact("remember that I save money"),
            "I save money"
        );
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FactStore::open(dir.path().join("profile.json")).await.unwrap();
        assert!(store.facts().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FactStore::open(&path).await.unwrap();
        assert!(store.facts().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FactStore::open(dir.path().join("profile.json")).await.unwrap();

        assert!(store.save_fact("my name is Ada").await.unwrap());
        assert!(!store.save_fact("my name is Ada").await.unwrap());
        assert_eq!(store.facts().await, vec!["my name is Ada"]);
    }

    #[tokio::test]
    async fn test_creates_missing_directory_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memory").join("profile.json");

        let store = FactStore::open(&path).await.unwrap();
        store.save_fact("first").await.unwrap();
        store.save_fact("second").await.unwrap();
        store.save_fact("third").await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"first\""), "pretty printed: {}", raw);

        let reopened = FactStore::open(&path).await.unwrap();
        assert_eq!(reopened.facts().await, vec!["first", "second", "third"]);
        assert_eq!(reopened.relevant_facts("anything").await.len(), 3);
    }
}
