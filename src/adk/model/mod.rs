// SPDX-License-Identifier: MIT

//! Model module - text generation capability
//!
//! This module provides the core Model trait and shared types.
//! Implementations live in their own submodules:
//! - [openai] - OpenAI-compatible chat completions API
//!
//! [structured] layers typed, schema-constrained generation on top of any
//! [`Model`].

pub mod openai;
pub mod structured;

use crate::adk::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use structured::{generate_structured, generate_text, OutputSchema};

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

impl GenerationConfig {
    /// Deterministic generation, used for structured outputs and judging
    pub fn deterministic() -> Self {
        Self {
            temperature: Some(0.0),
            ..Default::default()
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Parts of a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Part {
    /// Regular text output from the model
    Text(String),
    /// Already-parsed structured output
    Json(serde_json::Value),
}

impl Content {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Concatenated text of all parts; JSON parts are serialized
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|p| match p {
                Part::Text(t) => t.clone(),
                Part::Json(v) => v.to_string(),
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Core trait for LLM model implementations
#[async_trait]
pub trait Model: Send + Sync {
    /// Generate the next message. When `schema` is given the model must answer
    /// with a JSON object matching it.
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        schema: Option<&OutputSchema>,
    ) -> Result<Content>;
}
