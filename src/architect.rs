use crate::blueprint::Blueprint;
use crate::events::{EventSink, EventType, PipelineEvent};
use crate::llm::{self, ChatMessage, CompletionOptions, GenerativeBackend};
use crate::parse;
use crate::project::{Project, ProjectConfig};

/// Generate a structural blueprint for the project's topic.
///
/// One synchronous completion call, no retries. On any failure an error event
/// is emitted and the failure propagates to the caller.
pub async fn generate_blueprint(
    backend: &dyn GenerativeBackend,
    project: &Project,
    events: &EventSink,
) -> anyhow::Result<Blueprint> {
    events
        .emit(
            PipelineEvent::new(
                EventType::BlueprintStart,
                format!("Starting blueprint generation for: {}", project.topic),
            )
            .with_progress(0.0),
        )
        .await;

    let directive = architect_directive(&project.topic, &project.config);
    let messages = [
        ChatMessage::system(directive),
        ChatMessage::user(format!(
            "Generate the structural blueprint for: {}",
            project.topic
        )),
    ];
    let model = llm::catalog::resolve(&project.config.model);
    let options = CompletionOptions {
        temperature: 0.7,
        max_tokens: 4000,
    };

    let result = async {
        let response = backend.complete(model, &messages, options).await?;
        parse::blueprint_from_response(&project.id, &response)
    }
    .await;

    match result {
        Ok(blueprint) => {
            tracing::info!(
                project_id = %project.id,
                chapters = blueprint.chapters.len(),
                "blueprint generated"
            );
            events
                .emit(
                    PipelineEvent::new(
                        EventType::BlueprintComplete,
                        format!("Blueprint generated with {} chapters", blueprint.chapters.len()),
                    )
                    .with_progress(100.0)
                    .with_data(serde_json::json!({
                        "chapter_count": blueprint.chapters.len()
                    })),
                )
                .await;
            Ok(blueprint)
        }
        Err(err) => {
            events
                .emit(PipelineEvent::error(format!(
                    "Blueprint generation failed: {err:#}"
                )))
                .await;
            Err(err)
        }
    }
}

/// The architect produces structure only. The depth-scaled chapter counts are
/// guidance for the backend, not a mechanically enforced bound.
fn architect_directive(topic: &str, config: &ProjectConfig) -> String {
    let (min_chapters, max_chapters) = config.depth.chapter_guidance();
    format!(
        "You are the Architect for a website generation pipeline.\n\
\n\
Your ONLY responsibility is to create a structural blueprint for a website about the given topic.\n\
\n\
Topic: {topic}\n\
Depth Level: {depth}\n\
Tone: {tone}\n\
Audience: {audience}\n\
\n\
CONSTRAINTS:\n\
- You must ONLY produce structure: chapters, sections, and metadata\n\
- NO prose, NO facts, NO actual content\n\
- Aim for {min_chapters}-{max_chapters} chapters at this depth level\n\
- Each chapter must have 3-6 sections\n\
- Each section must have a clear purpose statement\n\
- The structure should support an encyclopedia-style reference site\n\
\n\
OUTPUT FORMAT:\n\
Return a JSON object with this exact structure:\n\
{{\n\
  \"chapters\": [\n\
    {{\n\
      \"title\": \"Chapter Title\",\n\
      \"purpose\": \"What this chapter covers and why\",\n\
      \"sections\": [\n\
        {{\n\
          \"title\": \"Section Title\",\n\
          \"purpose\": \"What this section covers\",\n\
          \"expected_content_types\": [\"prose\", \"timeline\", \"table\"]\n\
        }}\n\
      ]\n\
    }}\n\
  ]\n\
}}\n\
\n\
GUIDELINES:\n\
- Ensure logical flow and progression\n\
- Balance theoretical and practical sections\n\
- Include historical/background sections where relevant\n\
\n\
Generate the blueprint now. Return ONLY the JSON, no other text.",
        topic = topic,
        depth = config.depth.as_str(),
        tone = config.tone.as_str(),
        audience = config.audience_level,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{DepthLevel, ToneStyle};

    fn config(depth: DepthLevel) -> ProjectConfig {
        ProjectConfig {
            depth,
            tone: ToneStyle::Professional,
            audience_level: "general".to_string(),
            model: ProjectConfig::default_model(),
            generate_images: false,
        }
    }

    #[test]
    fn directive_forbids_content_and_scales_with_depth() {
        let overview = architect_directive("Photosynthesis", &config(DepthLevel::Overview));
        assert!(overview.contains("NO prose, NO facts"));
        assert!(overview.contains("3-5 chapters"));
        assert!(overview.contains("3-6 sections"));

        let comprehensive =
            architect_directive("Photosynthesis", &config(DepthLevel::Comprehensive));
        assert!(comprehensive.contains("8-12 chapters"));
    }
}
