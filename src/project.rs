use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How deep the generated site should go. Advisory chapter-count guidance is
/// passed to the generative backend, not mechanically enforced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DepthLevel {
    Overview,
    DeepDive,
    Comprehensive,
}

impl DepthLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::DeepDive => "deep_dive",
            Self::Comprehensive => "comprehensive",
        }
    }

    /// Suggested chapter-count range for the architect directive.
    pub fn chapter_guidance(self) -> (usize, usize) {
        match self {
            Self::Overview => (3, 5),
            Self::DeepDive => (5, 8),
            Self::Comprehensive => (8, 12),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToneStyle {
    Introductory,
    Professional,
    Academic,
    Casual,
}

impl ToneStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Introductory => "introductory",
            Self::Professional => "professional",
            Self::Academic => "academic",
            Self::Casual => "casual",
        }
    }
}

/// Lifecycle status. Advances monotonically through the pipeline on success;
/// a failed stage resets it to the stage's pre-stage value so a retry is
/// well-defined.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Created,
    BlueprintGenerated,
    BlueprintApproved,
    SchemaGenerated,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub depth: DepthLevel,
    pub tone: ToneStyle,
    #[serde(default = "ProjectConfig::default_audience")]
    pub audience_level: String,
    /// Model selector: a catalog display name or a raw model id.
    #[serde(default = "ProjectConfig::default_model")]
    pub model: String,
    #[serde(default)]
    pub generate_images: bool,
}

impl ProjectConfig {
    pub fn default_audience() -> String {
        "general".to_string()
    }

    pub fn default_model() -> String {
        crate::llm::catalog::default_display_name().to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectCreate {
    pub topic: String,
    pub config: ProjectConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub topic: String,
    pub config: ProjectConfig,
    pub created_at: DateTime<Utc>,
    pub blueprint_id: Option<String>,
    pub schema_version: Option<String>,
    pub website_path: Option<String>,
    pub status: ProjectStatus,
}

impl Project {
    pub fn new(topic: impl Into<String>, config: ProjectConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic: topic.into(),
            config,
            created_at: Utc::now(),
            blueprint_id: None,
            schema_version: None,
            website_path: None,
            status: ProjectStatus::Created,
        }
    }
}
