use std::path::Path;

use crate::blueprint::{Blueprint, Chapter, Section};
use crate::events::{EventSink, EventType, PipelineEvent};
use crate::illustrator::Illustrator;
use crate::llm::{self, ChatMessage, CompletionOptions, GenerativeBackend};
use crate::parse;
use crate::project::Project;
use crate::schema::{ChapterSchema, WebsiteSchema};

/// Generate the full website schema for an approved blueprint.
///
/// Chapters are generated strictly one at a time: sequential calls bound the
/// backend's concurrent load and keep progress percentages monotonic. A
/// chapter's parse/structural failure is fatal to the whole stage; image
/// failures never are.
///
/// `schema_id` is allocated by the caller before generation begins so images
/// written during generation land in the directory keyed by it.
pub async fn generate_website_schema(
    backend: &dyn GenerativeBackend,
    project: &Project,
    blueprint: &Blueprint,
    schema_id: &str,
    illustrator: Option<&Illustrator>,
    image_dir: Option<&Path>,
    events: &EventSink,
) -> anyhow::Result<WebsiteSchema> {
    let total_chapters = blueprint.chapters.len();
    let mut chapters = Vec::with_capacity(total_chapters);

    for (index, chapter) in blueprint.chapters.iter().enumerate() {
        let mut chapter_schema =
            generate_chapter_schema(backend, project, chapter, index, total_chapters, events)
                .await?;

        if project.config.generate_images
            && let (Some(illustrator), Some(image_dir)) = (illustrator, image_dir)
        {
            events
                .emit(PipelineEvent::new(
                    EventType::Progress,
                    format!("Generating image for chapter {}", index + 1),
                ))
                .await;
            if let Some(filename) = illustrator
                .chapter_image(project, chapter, image_dir, index + 1)
                .await
            {
                chapter_schema.image_path = Some(filename);
                events
                    .emit(PipelineEvent::new(
                        EventType::Progress,
                        format!("Image generated for chapter {}", index + 1),
                    ))
                    .await;
            }
        }

        chapters.push(chapter_schema);
    }

    let mut landing_page_image_path = None;
    if project.config.generate_images
        && let (Some(illustrator), Some(image_dir)) = (illustrator, image_dir)
    {
        events
            .emit(PipelineEvent::new(
                EventType::Progress,
                "Generating landing page hero image",
            ))
            .await;
        landing_page_image_path = illustrator.landing_image(project, image_dir).await;
        if landing_page_image_path.is_some() {
            events
                .emit(PipelineEvent::new(
                    EventType::Progress,
                    "Landing page image generated",
                ))
                .await;
        }
    }

    Ok(WebsiteSchema {
        id: schema_id.to_string(),
        project_id: project.id.clone(),
        blueprint_id: blueprint.id.clone(),
        chapters,
        landing_page_image_path,
    })
}

async fn generate_chapter_schema(
    backend: &dyn GenerativeBackend,
    project: &Project,
    chapter: &Chapter,
    index: usize,
    total_chapters: usize,
    events: &EventSink,
) -> anyhow::Result<ChapterSchema> {
    // Start event carries no percentage; the chapter's share is only claimed
    // once it completes.
    events
        .emit(
            PipelineEvent::new(
                EventType::ChapterSchemaStart,
                format!(
                    "Generating chapter {}/{}: {}",
                    index + 1,
                    total_chapters,
                    chapter.title
                ),
            )
            .with_data(serde_json::json!({
                "chapter_id": chapter.id,
                "chapter_title": chapter.title,
            })),
        )
        .await;

    let directive = chapter_directive(project, chapter);
    let messages = [
        ChatMessage::system(directive),
        ChatMessage::user(format!(
            "Generate the complete content for chapter: {}",
            chapter.title
        )),
    ];
    let model = llm::catalog::resolve(&project.config.model);
    let options = CompletionOptions {
        temperature: 0.7,
        max_tokens: 8000,
    };

    let result = async {
        let response = backend.complete(model, &messages, options).await?;
        parse::chapter_schema_from_response(&chapter.id, &response)
    }
    .await;

    match result {
        Ok(chapter_schema) => {
            let progress = (index + 1) as f64 / total_chapters as f64 * 100.0;
            let progress = (progress * 10.0).round() / 10.0;
            events
                .emit(
                    PipelineEvent::new(
                        EventType::ChapterSchemaComplete,
                        format!(
                            "Completed chapter {}/{}: {}",
                            index + 1,
                            total_chapters,
                            chapter.title
                        ),
                    )
                    .with_progress(progress)
                    .with_data(serde_json::json!({
                        "chapter_id": chapter.id,
                        "chapter_number": index + 1,
                        "total_chapters": total_chapters,
                    })),
                )
                .await;
            Ok(chapter_schema)
        }
        Err(err) => {
            events
                .emit(
                    PipelineEvent::error(format!("Chapter generation failed: {err:#}")).with_data(
                        serde_json::json!({
                            "error": format!("{err:#}"),
                            "chapter_id": chapter.id,
                        }),
                    ),
                )
                .await;
            Err(err)
        }
    }
}

fn chapter_directive(project: &Project, chapter: &Chapter) -> String {
    let first_section_id = chapter
        .sections
        .first()
        .map(|section| section.id.as_str())
        .unwrap_or("section_0_0");

    format!(
        "You are the Constructor for a website generation pipeline.\n\
\n\
Your responsibility is to generate ALL content for a chapter in structured JSON format.\n\
\n\
PROJECT CONTEXT:\n\
Topic: {topic}\n\
Depth: {depth}\n\
Tone: {tone}\n\
Audience: {audience}\n\
\n\
CHAPTER TO GENERATE:\n\
Title: {title}\n\
Purpose: {purpose}\n\
\n\
SECTIONS TO COVER:\n\
{sections}\n\
\n\
CONTENT REQUIREMENTS:\n\
1. You MUST generate encyclopedic prose - explanatory paragraphs that educate the reader\n\
2. Prose should be neutral, informative, and reference-style\n\
3. Mix prose with other structured content types (timelines, tables, callouts)\n\
4. Each section should have 2-5 content blocks\n\
5. Prose blocks should have 2-5 paragraphs each\n\
\n\
AVAILABLE CONTENT BLOCK TYPES:\n\
- prose: {{\"type\": \"prose\", \"heading\": \"...\", \"paragraphs\": [\"...\", \"...\"]}}\n\
- timeline: {{\"type\": \"timeline\", \"heading\": \"...\", \"events\": [{{\"date\": \"...\", \"title\": \"...\", \"description\": \"...\"}}]}}\n\
- table: {{\"type\": \"table\", \"heading\": \"...\", \"columns\": [\"...\"], \"rows\": [[\"...\"]]}}\n\
- callout: {{\"type\": \"callout\", \"title\": \"...\", \"content\": \"...\", \"style\": \"info\"}}\n\
- key_stat: {{\"type\": \"key_stat\", \"value\": \"...\", \"label\": \"...\", \"context\": \"...\"}}\n\
- code: {{\"type\": \"code\", \"heading\": \"...\", \"language\": \"...\", \"code\": \"...\"}}\n\
\n\
OUTPUT FORMAT:\n\
{{\n\
  \"introduction\": [\"paragraph 1\", \"paragraph 2\", \"paragraph 3\"],\n\
  \"sections\": [\n\
    {{\n\
      \"section_id\": \"{first_section_id}\",\n\
      \"blocks\": [\n\
        {{\"type\": \"prose\", \"heading\": \"Section Heading\", \"paragraphs\": [\"...\", \"...\"]}}\n\
      ]\n\
    }}\n\
  ]\n\
}}\n\
\n\
CRITICAL RULES:\n\
- Introduction must be 2-4 paragraphs of encyclopedic prose\n\
- Each section MUST include at least one prose block\n\
- Use the exact section_id values listed above\n\
- Use other block types to break up text and present structured info\n\
- Maintain factual accuracy and neutral tone\n\
- Never fabricate specific data - use approximations or ranges if uncertain\n\
\n\
Generate the complete chapter content now. Return ONLY the JSON.",
        topic = project.topic,
        depth = project.config.depth.as_str(),
        tone = project.config.tone.as_str(),
        audience = project.config.audience_level,
        title = chapter.title,
        purpose = chapter.purpose,
        sections = format_sections(&chapter.sections),
    )
}

fn format_sections(sections: &[Section]) -> String {
    let mut lines = Vec::with_capacity(sections.len() * 2);
    for section in sections {
        lines.push(format!(
            "- [{}] {}: {}",
            section.id, section.title, section.purpose
        ));
        if !section.expected_content_types.is_empty() {
            lines.push(format!(
                "  Expected content: {}",
                section.expected_content_types.join(", ")
            ));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint;
    use crate::project::{DepthLevel, ProjectConfig, ToneStyle};

    fn fixture_chapter() -> Chapter {
        Chapter {
            id: blueprint::chapter_id(0),
            title: "Light Reactions".to_string(),
            purpose: "Explain the light-dependent stage".to_string(),
            sections: vec![Section {
                id: blueprint::section_id(0, 0),
                title: "Photosystems".to_string(),
                purpose: "Describe PSI and PSII".to_string(),
                expected_content_types: vec!["prose".to_string(), "table".to_string()],
            }],
        }
    }

    #[test]
    fn directive_names_sections_and_block_catalog() {
        let project = Project::new(
            "Photosynthesis",
            ProjectConfig {
                depth: DepthLevel::Overview,
                tone: ToneStyle::Academic,
                audience_level: "students".to_string(),
                model: ProjectConfig::default_model(),
                generate_images: false,
            },
        );
        let directive = chapter_directive(&project, &fixture_chapter());

        assert!(directive.contains("[section_0_0] Photosystems"));
        assert!(directive.contains("Expected content: prose, table"));
        assert!(directive.contains("\"type\": \"key_stat\""));
        assert!(directive.contains("\"type\": \"code\""));
        assert!(directive.contains("at least one prose block"));
        assert!(directive.contains("\"section_id\": \"section_0_0\""));
    }
}
