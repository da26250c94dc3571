use anyhow::Context as _;
use serde_json::Value;

use crate::blueprint::{self, Blueprint, Chapter, Section};
use crate::schema::{ChapterSchema, ContentBlock, SectionSchema, TimelineEvent};

/// Locate the JSON payload inside a free-form model response: the span from
/// the first `{` to the last `}`. Tolerates explanatory text and code fences
/// around the payload. Known fragility: a stray `}` in trailing prose extends
/// the span and corrupts it.
pub fn extract_json_payload(raw: &str) -> anyhow::Result<&str> {
    let start = raw
        .find('{')
        .ok_or_else(|| anyhow::anyhow!("no JSON object found in response"))?;
    let end = raw
        .rfind('}')
        .filter(|end| *end >= start)
        .ok_or_else(|| anyhow::anyhow!("no JSON object found in response"))?;
    Ok(&raw[start..=end])
}

/// Build a blueprint from a raw architect response.
///
/// Structural contract: the payload must carry a `chapters` array and every
/// chapter must carry a `sections` array; anything else fails the stage (no
/// partial blueprint is ever emitted). An empty `chapters` array is accepted
/// as a degenerate but valid blueprint. Chapter and section identifiers are
/// synthesized positionally here, never taken from the response.
pub fn blueprint_from_response(project_id: &str, raw: &str) -> anyhow::Result<Blueprint> {
    let payload = extract_json_payload(raw)?;
    let value: Value = serde_json::from_str(payload).context("parse blueprint payload")?;

    let chapters_value = value
        .get("chapters")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("blueprint payload is missing `chapters`"))?;

    let mut chapters = Vec::with_capacity(chapters_value.len());
    for (chapter_index, chapter_value) in chapters_value.iter().enumerate() {
        let sections_value = chapter_value
            .get("sections")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                anyhow::anyhow!("blueprint chapter {chapter_index} is missing `sections`")
            })?;

        let mut sections = Vec::with_capacity(sections_value.len());
        for (section_index, section_value) in sections_value.iter().enumerate() {
            sections.push(Section {
                id: blueprint::section_id(chapter_index, section_index),
                title: string_field(section_value, "title"),
                purpose: string_field(section_value, "purpose"),
                expected_content_types: string_list(section_value, "expected_content_types"),
            });
        }

        chapters.push(Chapter {
            id: blueprint::chapter_id(chapter_index),
            title: string_field(chapter_value, "title"),
            purpose: string_field(chapter_value, "purpose"),
            sections,
        });
    }

    Ok(Blueprint {
        id: uuid::Uuid::new_v4().to_string(),
        project_id: project_id.to_string(),
        chapters,
        approved: false,
    })
}

/// Build a chapter schema from a raw constructor response.
///
/// Blocks are coerced defensively (see `coerce_block`), then filtered by their
/// non-emptiness check; a section with zero surviving blocks is dropped
/// entirely. This is intentional data loss so every persisted section has at
/// least one renderable block.
pub fn chapter_schema_from_response(chapter_id: &str, raw: &str) -> anyhow::Result<ChapterSchema> {
    let payload = extract_json_payload(raw)?;
    let value: Value = serde_json::from_str(payload).context("parse chapter payload")?;

    let introduction = string_list(&value, "introduction");

    let mut sections = Vec::new();
    let sections_value = value.get("sections").and_then(Value::as_array);
    for section_value in sections_value.into_iter().flatten() {
        let blocks: Vec<ContentBlock> = section_value
            .get("blocks")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .map(coerce_block)
                    .filter(ContentBlock::is_valid)
                    .collect()
            })
            .unwrap_or_default();

        if blocks.is_empty() {
            continue;
        }
        sections.push(SectionSchema {
            section_id: string_field(section_value, "section_id"),
            blocks,
        });
    }

    Ok(ChapterSchema {
        chapter_id: chapter_id.to_string(),
        introduction,
        sections,
        image_path: None,
    })
}

/// Map one response block onto the content-block union by its declared `type`
/// tag. An unrecognized or missing tag is coerced to a prose block built from
/// whatever `heading`/`paragraphs` fields are present, never dropped here;
/// the validity filter decides survival. Missing fields default to empty so a
/// malformed block degrades instead of failing the chapter.
pub fn coerce_block(value: &Value) -> ContentBlock {
    match value.get("type").and_then(Value::as_str) {
        Some("prose") => prose_from(value),
        Some("timeline") => ContentBlock::Timeline {
            heading: string_field(value, "heading"),
            events: value
                .get("events")
                .and_then(Value::as_array)
                .map(|events| {
                    events
                        .iter()
                        .map(|event| TimelineEvent {
                            date: string_field(event, "date"),
                            title: string_field(event, "title"),
                            description: string_field(event, "description"),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        },
        Some("table") => ContentBlock::Table {
            heading: string_field(value, "heading"),
            columns: string_list(value, "columns"),
            rows: value
                .get("rows")
                .and_then(Value::as_array)
                .map(|rows| {
                    rows.iter()
                        .filter_map(Value::as_array)
                        .map(|row| row.iter().map(cell_text).collect())
                        .collect()
                })
                .unwrap_or_default(),
        },
        Some("callout") => {
            let style = string_field(value, "style");
            ContentBlock::Callout {
                title: string_field(value, "title"),
                content: string_field(value, "content"),
                style: if style.is_empty() {
                    "info".to_string()
                } else {
                    style
                },
            }
        }
        Some("key_stat") => {
            let context = string_field(value, "context");
            ContentBlock::KeyStat {
                value: string_field(value, "value"),
                label: string_field(value, "label"),
                context: if context.trim().is_empty() {
                    None
                } else {
                    Some(context)
                },
            }
        }
        Some("code") => ContentBlock::Code {
            heading: string_field(value, "heading"),
            language: string_field(value, "language"),
            code: string_field(value, "code"),
        },
        _ => prose_from(value),
    }
}

fn prose_from(value: &Value) -> ContentBlock {
    ContentBlock::Prose {
        heading: string_field(value, "heading"),
        paragraphs: string_list(value, "paragraphs"),
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Table cells arrive as strings in the documented shape, but models routinely
/// emit numbers and booleans; stringify scalars instead of discarding them.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}
