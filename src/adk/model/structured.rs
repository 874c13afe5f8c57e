// SPDX-License-Identifier: MIT

//! Structured output on top of any [`Model`]
//!
//! Schemas are derived with `schemars`; the model is asked to answer with a
//! JSON object and the reply is parsed back into the target type.

use super::{Content, GenerationConfig, Model, Part};
use crate::adk::error::{ModelError, Result};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named JSON schema passed to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
}

impl OutputSchema {
    /// Derive the schema for `T`, named after the type
    pub fn of<T: JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        Self {
            name: T::schema_name(),
            schema: serde_json::to_value(root).unwrap_or(Value::Null),
        }
    }
}

/// Ask the model for plain text
pub async fn generate_text(
    model: &dyn Model,
    history: &[Content],
    config: Option<&GenerationConfig>,
) -> Result<String> {
    let response = model.generate_content(history, config, None).await?;
    let text = response.text();
    if text.trim().is_empty() {
        return Err(ModelError::EmptyResponse.into());
    }
    Ok(text)
}

/// Ask the model for a value of type `T`
pub async fn generate_structured<T>(
    model: &dyn Model,
    history: &[Content],
    config: Option<&GenerationConfig>,
) -> Result<T>
where
    T: JsonSchema + DeserializeOwned,
{
    let schema = OutputSchema::of::<T>();
    log::debug!("Requesting structured output: {}", schema.name);

    let response = model.generate_content(history, config, Some(&schema)).await?;

    // Providers that parse for us hand back a Json part
    for part in &response.parts {
        if let Part::Json(value) = part {
            return serde_json::from_value(value.clone())
                .map_err(|e| ModelError::InvalidResponse(e.to_string()).into());
        }
    }

    let text = response.text();
    if text.trim().is_empty() {
        return Err(ModelError::EmptyResponse.into());
    }
    serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
        ModelError::InvalidResponse(format!("{} is not valid {}: {}", text, schema.name, e)).into()
    })
}

/// Remove a surrounding ```json fence if the model added one
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
