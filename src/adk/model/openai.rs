// SPDX-License-Identifier: MIT

//! OpenAI Model - chat completions API implementation

use super::{Content, GenerationConfig, Model, OutputSchema, Part};
use crate::adk::error::{ModelError, Result, TutorError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat model
pub struct OpenAIModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl OpenAIModel {
    /// Create a new OpenAIModel from the environment
    ///
    /// Requires `OPENAI_API_KEY` environment variable to be set.
    /// Optionally uses `OPENAI_BASE_URL` for custom endpoints.
    pub fn new(model_name: String) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| ModelError::ApiKeyMissing("openai".to_string()))?;
        let base_url = env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::with_endpoint(model_name, api_key, base_url))
    }

    pub fn with_endpoint(model_name: String, api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model_name,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Convert internal Content to OpenAI message format
    fn content_to_openai_message(content: &Content) -> serde_json::Value {
        let role = match content.role.as_str() {
            "model" => "assistant",
            other => other,
        };
        json!({
            "role": role,
            "content": content.text()
        })
    }

    /// Build the request body for a completion call
    fn build_body(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        schema: Option<&OutputSchema>,
    ) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = history
            .iter()
            .map(Self::content_to_openai_message)
            .collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages
        });

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
        }

        if let Some(schema) = schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": false
                }
            });
        }

        body
    }

    /// Parse OpenAI response into Content
    fn parse_openai_response(response: &serde_json::Value) -> Result<Content> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ModelError::InvalidResponse("No choices in OpenAI response".into()))?;

        let mut parts = Vec::new();
        if let Some(content) = choice["message"]["content"].as_str() {
            if !content.is_empty() {
                parts.push(Part::Text(content.to_string()));
            }
        }

        if parts.is_empty() {
            return Err(ModelError::EmptyResponse.into());
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}

#[async_trait]
impl Model for OpenAIModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        schema: Option<&OutputSchema>,
    ) -> Result<Content> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(history, config, schema);

        log::debug!(
            "OpenAI request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(TutorError::api("openai", format!("{}: {}", status, text)));
        }

        let resp_json: serde_json::Value = resp.json().await?;
        log::debug!("OpenAI response: {}", resp_json);

        Self::parse_openai_response(&resp_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> OpenAIModel {
        OpenAIModel::with_endpoint(
            "gpt-4o-mini".to_string(),
            "test-key".to_string(),
            "http://localhost:9999/v1/".to_string(),
        )
    }

    #[test]
    fn test_content_to_openai_user_message() {
        let msg = OpenAIModel::content_to_openai_message(&Content::user("Hello"));
        assert_eq!(msg["role"], "user");
        assert_eq!(msg["content"], "Hello");
    }

    #[test]
    fn test_content_to_openai_assistant_message() {
        let msg = OpenAIModel::content_to_openai_message(&Content::model("I can help"));
        assert_eq!(msg["role"], "assistant");
        assert_eq!(msg["content"], "I can help");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(model().base_url, "http://localhost:9999/v1");
    }

    #[test]
    fn test_build_body_with_config_and_schema() {
        let schema = OutputSchema {
            name: "Quiz".to_string(),
            schema: json!({"type": "object"}),
        };
        let body = model().build_body(
            &[Content::system("teach"), Content::user("quiz me")],
            Some(&GenerationConfig::deterministic()),
            Some(&schema),
        );

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "Quiz");
    }

    #[test]
    fn test_build_body_plain() {
        let body = model().build_body(&[Content::user("hi")], None, None);
        assert!(body.get("response_format").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_parse_openai_text_response() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Hello, how can I help?"
                }
            }]
        });

        let content = OpenAIModel::parse_openai_response(&response).unwrap();
        assert_eq!(content.role, "model");
        assert_eq!(content.text(), "Hello, how can I help?");
    }

    #[test]
    fn test_parse_openai_response_without_choices() {
        let response = json!({"choices": []});
        assert!(OpenAIModel::parse_openai_response(&response).is_err());
    }

    #[test]
    fn test_parse_openai_empty_content() {
        let response = json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        });
        assert!(matches!(
            OpenAIModel::parse_openai_response(&response),
            Err(TutorError::Model(ModelError::EmptyResponse))
        ));
    }
}
