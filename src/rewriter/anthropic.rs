use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::app::{BulkfeedError, Result};
use crate::config::RewriteConfig;
use crate::rewriter::parse::parse_title_list;
use crate::rewriter::TitleRewriter;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Title rewriter backed by the Anthropic Messages API.
pub struct AnthropicRewriter {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicRewriter {
    /// Build a rewriter, reading the API key from the environment variable
    /// named in `config.api_key_env`.
    pub fn from_config(config: &RewriteConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            BulkfeedError::Config(format!("{} environment variable not set", config.api_key_env))
        })?;

        Self::new(config, api_key)
    }

    pub fn new(config: &RewriteConfig, api_key: String) -> Result<Self> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn request_body(&self, titles: &[String]) -> Value {
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "user", "content": build_prompt(titles) }
            ],
        })
    }
}

/// Instruction plus numbered titles, asking for a bare JSON array back.
pub fn build_prompt(titles: &[String]) -> String {
    let numbered: Vec<String> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| format!("{}. {}", i + 1, title))
        .collect();

    format!(
        "Rewrite each of the following {count} blog post titles so it works as a short, \
         eye-catching headline on a social media graphic. Keep the meaning, keep each under \
         60 characters, and do not add hashtags or emoji.\n\n\
         {list}\n\n\
         Respond with ONLY a JSON array of exactly {count} strings, in the same order as the \
         input. No commentary.",
        count = titles.len(),
        list = numbered.join("\n"),
    )
}

/// Join every `text` block of a Messages API response.
fn reply_text(json: &Value) -> Result<String> {
    let blocks = json
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| BulkfeedError::Rewrite("response has no content blocks".into()))?;

    let text: Vec<&str> = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        return Err(BulkfeedError::Rewrite("response has no text content".into()));
    }

    Ok(text.join(""))
}

#[async_trait]
impl TitleRewriter for AnthropicRewriter {
    async fn rewrite(&self, titles: &[String]) -> Result<Vec<String>> {
        debug!("Requesting {} rewrites from {}", titles.len(), self.model);

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&self.request_body(titles))
            .send()
            .await
            .map_err(|e| BulkfeedError::Rewrite(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(BulkfeedError::Rewrite(format!(
                "API error {}: {}",
                status, body_text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| BulkfeedError::Rewrite(format!("unreadable response: {}", e)))?;

        parse_title_list(&reply_text(&json)?)
    }
}
