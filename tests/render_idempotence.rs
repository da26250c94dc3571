use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use sitewright::blueprint::{Blueprint, Chapter, Section};
use sitewright::events::EventSink;
use sitewright::project::{DepthLevel, Project, ProjectConfig, ToneStyle};
use sitewright::render;
use sitewright::schema::{ChapterSchema, ContentBlock, SectionSchema, TimelineEvent, WebsiteSchema};

fn fixture() -> (Project, Blueprint, WebsiteSchema) {
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

    let blueprint = Blueprint {
        id: "bp-1".to_string(),
        project_id: project.id.clone(),
        chapters: vec![
            Chapter {
                id: "chapter_0".to_string(),
                title: "The Light Reactions".to_string(),
                purpose: "How light becomes chemical energy".to_string(),
                sections: vec![Section {
                    id: "section_0_0".to_string(),
                    title: "Photosystems".to_string(),
                    purpose: "PSI and PSII".to_string(),
                    expected_content_types: vec!["prose".to_string()],
                }],
            },
            Chapter {
                id: "chapter_1".to_string(),
                title: "The Calvin Cycle".to_string(),
                purpose: "Carbon fixation".to_string(),
                sections: vec![Section {
                    id: "section_1_0".to_string(),
                    title: "Fixation".to_string(),
                    purpose: "RuBisCO at work".to_string(),
                    expected_content_types: Vec::new(),
                }],
            },
        ],
        approved: true,
    };

    let schema = WebsiteSchema {
        id: "schema-1".to_string(),
        project_id: project.id.clone(),
        blueprint_id: blueprint.id.clone(),
        chapters: vec![
            ChapterSchema {
                chapter_id: "chapter_0".to_string(),
                introduction: vec!["Light is captured by pigments.".to_string()],
                sections: vec![SectionSchema {
                    section_id: "section_0_0".to_string(),
                    blocks: vec![
                        ContentBlock::Prose {
                            heading: "Photosystems".to_string(),
                            paragraphs: vec!["Two photosystems cooperate.".to_string()],
                        },
                        ContentBlock::Timeline {
                            heading: "Discovery".to_string(),
                            events: vec![TimelineEvent {
                                date: "1771".to_string(),
                                title: "Priestley".to_string(),
                                description: "Plants restore air.".to_string(),
                            }],
                        },
                        ContentBlock::Code {
                            heading: "Net reaction".to_string(),
                            language: "text".to_string(),
                            code: "6CO2 + 6H2O -> C6H12O6 + 6O2".to_string(),
                        },
                    ],
                }],
                image_path: Some("chapter_1_hero.png".to_string()),
            },
            ChapterSchema {
                chapter_id: "chapter_1".to_string(),
                introduction: vec!["Carbon enters the cycle.".to_string()],
                sections: vec![SectionSchema {
                    // Deliberately dangling: rendered with the fallback title.
                    section_id: "section_9_9".to_string(),
                    blocks: vec![ContentBlock::KeyStat {
                        value: "3".to_string(),
                        label: "turns per G3P".to_string(),
                        context: None,
                    }],
                }],
                image_path: None,
            },
        ],
        landing_page_image_path: None,
    };

    (project, blueprint, schema)
}

fn snapshot_markup(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".html") || name.ends_with(".css") {
            files.insert(name, fs::read(&path).unwrap());
        }
    }
    files
}

#[tokio::test]
async fn re_rendering_is_byte_identical_and_preserves_images() {
    let temp = tempfile::TempDir::new().unwrap();
    let out_dir = temp.path().join("website_schema-1");
    let (project, blueprint, schema) = fixture();

    let (sink, mut rx) = EventSink::channel(64);
    render::render_website(&project, &blueprint, &schema, &out_dir, &sink)
        .await
        .unwrap();
    drop(sink);
    while rx.recv().await.is_some() {}

    let first = snapshot_markup(&out_dir);
    assert!(first.contains_key("index.html"));
    assert!(first.contains_key("styles.css"));
    assert!(first.contains_key("chapter_1.html"));
    assert!(first.contains_key("chapter_2.html"));

    // A previously downloaded image must survive the next render.
    let image_path = out_dir.join("chapter_1_hero.png");
    fs::write(&image_path, [0x89, 0x50, 0x4e, 0x47]).unwrap();

    let (sink, mut rx) = EventSink::channel(64);
    render::render_website(&project, &blueprint, &schema, &out_dir, &sink)
        .await
        .unwrap();
    drop(sink);
    while rx.recv().await.is_some() {}

    let second = snapshot_markup(&out_dir);
    assert_eq!(first, second);
    assert!(image_path.exists());
    assert_eq!(fs::read(&image_path).unwrap(), [0x89, 0x50, 0x4e, 0x47]);
}

#[tokio::test]
async fn dangling_section_reference_still_renders_the_page() {
    let temp = tempfile::TempDir::new().unwrap();
    let out_dir = temp.path().join("site");
    let (project, blueprint, schema) = fixture();

    let (sink, mut rx) = EventSink::channel(64);
    render::render_website(&project, &blueprint, &schema, &out_dir, &sink)
        .await
        .unwrap();
    drop(sink);
    while rx.recv().await.is_some() {}

    let chapter_2 = fs::read_to_string(out_dir.join("chapter_2.html")).unwrap();
    assert!(chapter_2.contains(">Section</h2>"));
    assert!(chapter_2.contains("turns per G3P"));
}

#[tokio::test]
async fn unresolvable_chapter_is_skipped_not_fatal() {
    let temp = tempfile::TempDir::new().unwrap();
    let out_dir = temp.path().join("site");
    let (project, blueprint, mut schema) = fixture();
    schema.chapters[1].chapter_id = "chapter_42".to_string();

    let (sink, mut rx) = EventSink::channel(64);
    render::render_website(&project, &blueprint, &schema, &out_dir, &sink)
        .await
        .unwrap();
    drop(sink);
    while rx.recv().await.is_some() {}

    assert!(out_dir.join("chapter_1.html").exists());
    assert!(!out_dir.join("chapter_2.html").exists());
    assert!(out_dir.join("index.html").exists());
}
