// SPDX-License-Identifier: MIT

//! Runtime settings
//!
//! Defaults, then an optional YAML file, then environment variables (`.env`
//! is loaded by the binary). CLI flags are applied last by the caller.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adk::error::{ModelError, Result, TutorError};
use crate::adk::model::openai::{OpenAIModel, DEFAULT_BASE_URL};
use crate::adk::model::Model;
use crate::adk::retriever::DEFAULT_TOP_K;
use crate::tutor::checkpoint::DEFAULT_CHECKPOINT_DIR;
use crate::tutor::facts::DEFAULT_FACTS_PATH;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PROVIDER: &str = "openai";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Chat model name
    pub model: String,
    /// Only `openai` (and compatible endpoints) is supported
    pub provider: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub facts_path: PathBuf,
    pub checkpoint_dir: PathBuf,
    /// Chunks handed to the model per question
    pub top_k: usize,
    /// Files or URLs loaded into the retriever at startup
    pub documents: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            api_key: None,
            base_url: None,
            facts_path: PathBuf::from(DEFAULT_FACTS_PATH),
            checkpoint_dir: PathBuf::from(DEFAULT_CHECKPOINT_DIR),
            top_k: DEFAULT_TOP_K,
            documents: Vec::new(),
        }
    }
}

impl Settings {
    /// Defaults or `config`, overridden by the process environment
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let mut settings = match config {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TutorError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Override fields from variables found by `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(model) = lookup("TUTOR_MODEL") {
            self.model = model;
        }
        if let Some(provider) = lookup("MODEL_PROVIDER") {
            self.provider = provider;
        }
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(path) = lookup("TUTOR_FACTS_PATH") {
            self.facts_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("TUTOR_CHECKPOINT_DIR") {
            self.checkpoint_dir = PathBuf::from(dir);
        }
        if let Some(k) = lookup("TUTOR_TOP_K") {
            self.top_k = k
                .parse()
                .map_err(|_| TutorError::config(format!("TUTOR_TOP_K is not a number: {}", k)))?;
        }
        Ok(())
    }

    /// The configured model, or `None` when no API key is available
    pub fn build_model(&self) -> Result<Option<Arc<dyn Model>>> {
        let Some(api_key) = self.api_key.clone() else {
            log::info!("No API key configured, using scripted responses");
            return Ok(None);
        };

        match self.provider.to_lowercase().as_str() {
            "openai" => {
                let base_url = self
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
                log::info!("Using provider: openai with model: {}", self.model);
                Ok(Some(Arc::new(OpenAIModel::with_endpoint(
                    self.model.clone(),
                    api_key,
                    base_url,
                ))))
            }
            other => Err(ModelError::UnsupportedProvider(other.to_string()).into()),
        }
    }
}
