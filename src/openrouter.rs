use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;

use crate::llm::{ChatMessage, CompletionOptions, GenerativeBackend};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter chat-completions client. One instance is constructed at startup
/// and shared by every stage through the `GenerativeBackend` seam.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            anyhow::bail!("OpenRouter API key is empty");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("build http client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENROUTER_API_KEY is not set"))?;
        Self::new(api_key)
    }

    fn completions_endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl GenerativeBackend for OpenRouterClient {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> anyhow::Result<String> {
        let endpoint = self.completions_endpoint();
        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {endpoint}"))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .context("read OpenRouter response body")?;
        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
            anyhow::bail!("OpenRouter API error ({status}): {message}");
        }

        let value: serde_json::Value =
            serde_json::from_str(&raw).context("parse OpenRouter response")?;
        extract_completion_text(&value).context("extract completion text")
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_completion_text(value: &serde_json::Value) -> anyhow::Result<String> {
    let content = value
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing `choices[0].message.content` in response"))?;

    if content.trim().is_empty() {
        anyhow::bail!("completion text is empty");
    }
    Ok(content.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice_content() {
        let value = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "hello" } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        });
        assert_eq!(extract_completion_text(&value).unwrap(), "hello");
    }

    #[test]
    fn missing_choices_is_an_error() {
        let value = serde_json::json!({ "id": "gen-1" });
        assert!(extract_completion_text(&value).is_err());
    }

    #[test]
    fn error_message_is_pulled_from_body() {
        let raw = r#"{"error":{"message":"model overloaded","code":502}}"#;
        assert_eq!(
            parse_error_message(raw).as_deref(),
            Some("model overloaded")
        );
        assert_eq!(parse_error_message("not json"), None);
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(OpenRouterClient::new("  ").is_err());
    }
}
