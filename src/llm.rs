use async_trait::async_trait;
use serde::Serialize;

/// One role-tagged message in a completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The external completion service consumed for outline and prose generation.
///
/// Stages receive this as an explicit dependency so tests can substitute a
/// scripted fake; there is no ambient client.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> anyhow::Result<String>;
}

pub mod catalog {
    use serde::Serialize;

    /// Approved models, `(openrouter id, display name)`. The first entry is the
    /// fallback for unknown selectors.
    const MODELS: &[(&str, &str)] = &[
        ("x-ai/grok-code-fast-1", "xAI: Grok Code Fast"),
        ("google/gemini-2.5-flash", "Google: Gemini 2.5 Flash"),
        ("anthropic/claude-sonnet-4.5", "Anthropic: Claude Sonnet 4.5"),
        ("deepseek/deepseek-v3.2", "DeepSeek: DeepSeek V3.2"),
        ("x-ai/grok-4.1-fast", "xAI: Grok 4.1 Fast"),
        ("google/gemini-2.5-flash-lite", "Google: Gemini 2.5 Flash Lite"),
    ];

    #[derive(Debug, Clone, Serialize)]
    pub struct ModelInfo {
        pub id: &'static str,
        pub display_name: &'static str,
    }

    pub fn available_models() -> Vec<ModelInfo> {
        MODELS
            .iter()
            .map(|&(id, display_name)| ModelInfo { id, display_name })
            .collect()
    }

    pub fn default_display_name() -> &'static str {
        MODELS[0].1
    }

    /// Cheap model used for short auxiliary prompts (image prompt composition).
    pub fn fast_model() -> &'static str {
        MODELS[0].0
    }

    /// Map a selector (display name or raw id) to an approved model id.
    /// Unknown selectors fall back to the first approved model.
    pub fn resolve(selector: &str) -> &'static str {
        let selector = selector.trim();
        for &(id, display_name) in MODELS {
            if selector == id || selector == display_name {
                return id;
            }
        }
        MODELS[0].0
    }

}
