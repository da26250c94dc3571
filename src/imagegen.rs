use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://fal.run/fal-ai/nano-banana-pro";

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageBatch {
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
}

#[derive(Debug, Clone)]
pub struct ImageOptions {
    pub aspect_ratio: String,
    pub resolution: String,
    pub output_format: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: "16:9".to_string(),
            resolution: "1K".to_string(),
            output_format: "png".to_string(),
        }
    }
}

/// The external text-to-image service. Images are a non-essential enhancement:
/// a disabled backend or any request failure yields `Ok(None)`, never an error.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    fn enabled(&self) -> bool;

    async fn generate(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> anyhow::Result<Option<ImageBatch>>;
}

/// FAL client. Disabled entirely when no credential is configured.
#[derive(Debug, Clone)]
pub struct FalClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FalClient {
    pub fn new(api_key: Option<String>) -> anyhow::Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: Option<String>,
        base_url: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("build http client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(std::env::var("FAL_KEY").ok())
    }
}

#[async_trait]
impl ImageBackend for FalClient {
    fn enabled(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> anyhow::Result<Option<ImageBatch>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(None);
        };

        let body = serde_json::json!({
            "prompt": prompt,
            "num_images": 1,
            "aspect_ratio": options.aspect_ratio,
            "resolution": options.resolution,
            "output_format": options.output_format,
        });

        let response = match self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Key {api_key}"))
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(?err, "image API request failed");
                return Ok(None);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(%status, detail, "image API returned an error");
            return Ok(None);
        }

        match response.json::<ImageBatch>().await {
            Ok(batch) => Ok(Some(batch)),
            Err(err) => {
                tracing::warn!(?err, "image API response was not decodable");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_backend_returns_none() {
        let client = FalClient::new(None).unwrap();
        assert!(!client.enabled());
        let result = client
            .generate("a diagram", &ImageOptions::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn blank_credential_counts_as_disabled() {
        let client = FalClient::new(Some("   ".to_string())).unwrap();
        assert!(!client.enabled());
    }

    #[test]
    fn image_batch_tolerates_missing_fields() {
        let batch: ImageBatch =
            serde_json::from_str(r#"{"images":[{"url":"https://img/x"}],"description":"d"}"#)
                .unwrap();
        assert_eq!(batch.images.len(), 1);
        assert!(batch.images[0].content_type.is_none());

        let empty: ImageBatch = serde_json::from_str("{}").unwrap();
        assert!(empty.images.is_empty());
    }
}
