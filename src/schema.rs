use serde::{Deserialize, Serialize};

/// One typed, self-contained unit of rendered content.
///
/// The `type` discriminant is carried explicitly so serialized schemas survive
/// round-tripping. Coercion (`parse`) and rendering (`render`) each dispatch on
/// this union with a single exhaustive match, so adding a variant means
/// touching exactly those two sites plus `is_valid` below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Prose {
        heading: String,
        paragraphs: Vec<String>,
    },
    Timeline {
        heading: String,
        events: Vec<TimelineEvent>,
    },
    Table {
        heading: String,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Callout {
        title: String,
        content: String,
        style: String,
    },
    KeyStat {
        value: String,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    Code {
        heading: String,
        language: String,
        code: String,
    },
}

impl ContentBlock {
    /// Non-emptiness check applied after coercion. Blocks failing this are
    /// discarded before storage, so every persisted block is renderable.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Prose { paragraphs, .. } => paragraphs.iter().any(|p| !p.trim().is_empty()),
            Self::Timeline { events, .. } => !events.is_empty(),
            Self::Table { rows, .. } => !rows.is_empty(),
            Self::Callout { content, .. } => !content.trim().is_empty(),
            Self::KeyStat { value, label, .. } => {
                !value.trim().is_empty() && !label.trim().is_empty()
            }
            Self::Code { code, .. } => !code.trim().is_empty(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEvent {
    pub date: String,
    pub title: String,
    pub description: String,
}

/// Content for one blueprint section. Holds valid blocks only; sections that
/// end up with zero valid blocks are dropped before this is constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionSchema {
    pub section_id: String,
    pub blocks: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChapterSchema {
    pub chapter_id: String,
    pub introduction: Vec<String>,
    pub sections: Vec<SectionSchema>,
    /// Relative path to the chapter hero image inside the website directory.
    #[serde(default)]
    pub image_path: Option<String>,
}

/// The fully realized content tree for a project, ready for deterministic
/// rendering. Identity is allocated before content generation begins so images
/// produced alongside the text land in a directory keyed by it from the start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebsiteSchema {
    pub id: String,
    pub project_id: String,
    pub blueprint_id: String,
    pub chapters: Vec<ChapterSchema>,
    #[serde(default)]
    pub landing_page_image_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prose(paragraphs: &[&str]) -> ContentBlock {
        ContentBlock::Prose {
            heading: "h".to_string(),
            paragraphs: paragraphs.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn prose_requires_a_non_whitespace_paragraph() {
        assert!(!prose(&[]).is_valid());
        assert!(!prose(&["", "   ", "\n"]).is_valid());
        assert!(prose(&["", "real text"]).is_valid());
    }

    #[test]
    fn timeline_requires_an_event() {
        let empty = ContentBlock::Timeline {
            heading: "h".to_string(),
            events: Vec::new(),
        };
        assert!(!empty.is_valid());

        let one = ContentBlock::Timeline {
            heading: "h".to_string(),
            events: vec![TimelineEvent {
                date: "1905".to_string(),
                title: "t".to_string(),
                description: "d".to_string(),
            }],
        };
        assert!(one.is_valid());
    }

    #[test]
    fn table_requires_a_row() {
        let empty = ContentBlock::Table {
            heading: "X".to_string(),
            columns: vec!["A".to_string(), "B".to_string()],
            rows: Vec::new(),
        };
        assert!(!empty.is_valid());

        let one = ContentBlock::Table {
            heading: "X".to_string(),
            columns: vec!["A".to_string(), "B".to_string()],
            rows: vec![vec!["1".to_string(), "2".to_string()]],
        };
        assert!(one.is_valid());
    }

    #[test]
    fn callout_stat_and_code_require_content() {
        let callout = ContentBlock::Callout {
            title: "t".to_string(),
            content: "  ".to_string(),
            style: "info".to_string(),
        };
        assert!(!callout.is_valid());

        let stat = ContentBlock::KeyStat {
            value: "42%".to_string(),
            label: "".to_string(),
            context: None,
        };
        assert!(!stat.is_valid());

        let code = ContentBlock::Code {
            heading: "h".to_string(),
            language: "rust".to_string(),
            code: "fn main() {}".to_string(),
        };
        assert!(code.is_valid());
    }

    #[test]
    fn block_discriminants_round_trip() {
        let blocks = vec![
            prose(&["p"]),
            ContentBlock::Timeline {
                heading: "h".to_string(),
                events: vec![TimelineEvent {
                    date: "d".to_string(),
                    title: "t".to_string(),
                    description: "x".to_string(),
                }],
            },
            ContentBlock::Table {
                heading: "h".to_string(),
                columns: vec!["A".to_string()],
                rows: vec![vec!["1".to_string()]],
            },
            ContentBlock::Callout {
                title: "t".to_string(),
                content: "c".to_string(),
                style: "warning".to_string(),
            },
            ContentBlock::KeyStat {
                value: "3".to_string(),
                label: "things".to_string(),
                context: Some("per year".to_string()),
            },
            ContentBlock::Code {
                heading: "h".to_string(),
                language: "python".to_string(),
                code: "print(1)".to_string(),
            },
        ];

        let json = serde_json::to_string(&blocks).unwrap();
        assert!(json.contains("\"type\":\"prose\""));
        assert!(json.contains("\"type\":\"key_stat\""));
        assert!(json.contains("\"type\":\"code\""));

        let back: Vec<ContentBlock> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, blocks);
    }

    #[test]
    fn website_schema_round_trips() {
        let schema = WebsiteSchema {
            id: "s-1".to_string(),
            project_id: "p-1".to_string(),
            blueprint_id: "b-1".to_string(),
            chapters: vec![ChapterSchema {
                chapter_id: "chapter_0".to_string(),
                introduction: vec!["intro".to_string()],
                sections: vec![SectionSchema {
                    section_id: "section_0_0".to_string(),
                    blocks: vec![prose(&["body"])],
                }],
                image_path: Some("chapter_1_hero.png".to_string()),
            }],
            landing_page_image_path: None,
        };

        let json = serde_json::to_string(&schema).unwrap();
        let back: WebsiteSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
