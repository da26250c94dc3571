use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use crate::blueprint::Chapter;
use crate::imagegen::{ImageBackend, ImageOptions};
use crate::llm::{self, ChatMessage, CompletionOptions, GenerativeBackend};
use crate::project::Project;

/// Requests hero images for chapters and the landing page.
///
/// Every failure path (disabled backend, no images returned, download error,
/// timeout) collapses to `None` with a log line. Images are an enhancement;
/// nothing here may abort the pipeline.
pub struct Illustrator {
    backend: Arc<dyn GenerativeBackend>,
    images: Arc<dyn ImageBackend>,
    http: reqwest::Client,
}

impl Illustrator {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        images: Arc<dyn ImageBackend>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("build image download client")?;
        Ok(Self {
            backend,
            images,
            http,
        })
    }

    pub fn enabled(&self) -> bool {
        self.images.enabled()
    }

    /// Generate and persist a chapter hero image. Returns the filename
    /// (`chapter_<n>_hero.<ext>`), not the full path.
    pub async fn chapter_image(
        &self,
        project: &Project,
        chapter: &Chapter,
        out_dir: &Path,
        chapter_number: usize,
    ) -> Option<String> {
        if !self.images.enabled() {
            return None;
        }

        let subject = format!(
            "Title: {}\nPurpose: {}\nTopic: {}",
            chapter.title, chapter.purpose, project.topic
        );
        match self
            .try_generate(&subject, out_dir, &format!("chapter_{chapter_number}_hero"))
            .await
        {
            Ok(filename) => filename,
            Err(err) => {
                tracing::warn!(
                    chapter_id = %chapter.id,
                    error = %format!("{err:#}"),
                    "chapter image generation failed; continuing without image"
                );
                None
            }
        }
    }

    /// Generate and persist the landing-page hero image (`landing_hero.<ext>`).
    pub async fn landing_image(&self, project: &Project, out_dir: &Path) -> Option<String> {
        if !self.images.enabled() {
            return None;
        }

        let subject = format!("Topic: {}\nThis is the landing page of the site.", project.topic);
        match self.try_generate(&subject, out_dir, "landing_hero").await {
            Ok(filename) => filename,
            Err(err) => {
                tracing::warn!(
                    project_id = %project.id,
                    error = %format!("{err:#}"),
                    "landing image generation failed; continuing without image"
                );
                None
            }
        }
    }

    async fn try_generate(
        &self,
        subject: &str,
        out_dir: &Path,
        stem: &str,
    ) -> anyhow::Result<Option<String>> {
        let prompt = self.compose_prompt(subject).await.context("compose image prompt")?;
        tracing::debug!(stem, prompt = %prompt, "requesting image");

        let Some(batch) = self
            .images
            .generate(&prompt, &ImageOptions::default())
            .await
            .context("request image generation")?
        else {
            return Ok(None);
        };
        let Some(image) = batch.images.first() else {
            return Ok(None);
        };

        let image_url = url::Url::parse(&image.url)
            .with_context(|| format!("parse image url: {}", image.url))?;
        let extension = image
            .content_type
            .as_deref()
            .and_then(|content_type| content_type.split('/').nth(1))
            .unwrap_or("png");
        let filename = format!("{stem}.{extension}");

        let response = self
            .http
            .get(image_url)
            .send()
            .await
            .context("download image")?;
        if !response.status().is_success() {
            anyhow::bail!("image download failed ({})", response.status());
        }
        let bytes = response.bytes().await.context("read image bytes")?;

        let image_path = out_dir.join(&filename);
        tokio::fs::write(&image_path, &bytes)
            .await
            .with_context(|| format!("write image: {}", image_path.display()))?;

        Ok(Some(filename))
    }

    /// Ask the generative backend for a short descriptive prompt in the site's
    /// fixed illustration style. Uses the cheap catalog model.
    async fn compose_prompt(&self, subject: &str) -> anyhow::Result<String> {
        let system = "You are an expert at creating visual image prompts for educational content.\n\
\n\
Your task is to create a single, detailed image generation prompt that visually represents the core concept described by the user.\n\
\n\
Guidelines:\n\
- Focus on the main theme and create a visually compelling scene that captures its essence\n\
- Be specific about composition, style, and elements\n\
- Never describe text or typography in the image\n\
- The image should be suitable for a 16:9 header/hero placement\n\
\n\
Style Requirements:\n\
- Contemporary flat illustration style with bold, organic shapes\n\
- Vivid, saturated color palette (e.g. electric blue, coral, sunny yellow)\n\
- Rule-of-thirds composition with a clean, uncluttered layout\n\
- Rely on shape language rather than line work; no gradients\n\
\n\
Return ONLY the image prompt, no additional text.";

        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(format!(
                "Create an image generation prompt (2-3 sentences) for:\n\n{subject}"
            )),
        ];
        let options = CompletionOptions {
            temperature: 0.7,
            max_tokens: 300,
        };

        let response = self
            .backend
            .complete(llm::catalog::fast_model(), &messages, options)
            .await?;
        Ok(response.trim().to_string())
    }
}
