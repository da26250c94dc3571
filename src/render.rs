use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::blueprint::{Blueprint, Chapter};
use crate::events::{EventSink, EventType, PipelineEvent};
use crate::project::Project;
use crate::schema::{ChapterSchema, ContentBlock, SectionSchema, WebsiteSchema};

/// Title used when a schema section references no known blueprint section.
/// A dangling reference is tolerated, not an error.
const FALLBACK_SECTION_TITLE: &str = "Section";

/// Render the complete static website into `out_dir`.
///
/// Deterministic and idempotent: the same inputs produce byte-identical
/// markup. Before writing, only files with markup extensions are removed, so
/// previously downloaded images survive a re-render.
pub async fn render_website(
    project: &Project,
    blueprint: &Blueprint,
    schema: &WebsiteSchema,
    out_dir: &Path,
    events: &EventSink,
) -> anyhow::Result<()> {
    events
        .emit(
            PipelineEvent::new(EventType::RenderStart, "Starting website rendering")
                .with_progress(0.0),
        )
        .await;

    let result = render_files(project, blueprint, schema, out_dir, events).await;

    match result {
        Ok(()) => {
            events
                .emit(
                    PipelineEvent::new(EventType::RenderComplete, "Website rendering complete")
                        .with_progress(100.0),
                )
                .await;
            events
                .emit(
                    PipelineEvent::new(
                        EventType::ExportReady,
                        "Website is ready for preview and download",
                    )
                    .with_data(serde_json::json!({
                        "output_path": out_dir.display().to_string()
                    })),
                )
                .await;
            Ok(())
        }
        Err(err) => {
            events
                .emit(PipelineEvent::error(format!("Rendering failed: {err:#}")))
                .await;
            Err(err)
        }
    }
}

async fn render_files(
    project: &Project,
    blueprint: &Blueprint,
    schema: &WebsiteSchema,
    out_dir: &Path,
    events: &EventSink,
) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;

    remove_markup_files(out_dir)
        .await
        .context("clean previous markup")?;

    let css_path = out_dir.join("styles.css");
    tokio::fs::write(&css_path, STYLESHEET)
        .await
        .with_context(|| format!("write stylesheet: {}", css_path.display()))?;

    let index_path = out_dir.join("index.html");
    tokio::fs::write(&index_path, landing_page(project, blueprint, schema))
        .await
        .with_context(|| format!("write landing page: {}", index_path.display()))?;

    events
        .emit(PipelineEvent::new(EventType::Progress, "Rendered landing page").with_progress(0.0))
        .await;

    let total_chapters = schema.chapters.len();
    for (index, chapter_schema) in schema.chapters.iter().enumerate() {
        // Filenames are positional in schema order; an unresolvable chapter id
        // is skipped silently and leaves a numbering gap.
        if let Some(html) = chapter_page(chapter_schema, blueprint, project) {
            let chapter_path = out_dir.join(format!("chapter_{}.html", index + 1));
            tokio::fs::write(&chapter_path, html)
                .await
                .with_context(|| format!("write chapter page: {}", chapter_path.display()))?;
        } else {
            tracing::warn!(
                chapter_id = %chapter_schema.chapter_id,
                "schema chapter not present in blueprint; skipping"
            );
        }

        let progress = (index + 1) as f64 / total_chapters as f64 * 100.0;
        events
            .emit(
                PipelineEvent::new(
                    EventType::Progress,
                    format!("Rendered chapter {}/{}", index + 1, total_chapters),
                )
                .with_progress(progress),
            )
            .await;
    }

    Ok(())
}

/// Remove `.html`/`.css` files only; images and everything else stay.
async fn remove_markup_files(out_dir: &Path) -> anyhow::Result<()> {
    let mut entries = tokio::fs::read_dir(out_dir)
        .await
        .with_context(|| format!("read output dir: {}", out_dir.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let is_markup = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("html") | Some("css")
        );
        if is_markup {
            tokio::fs::remove_file(&path)
                .await
                .with_context(|| format!("remove stale file: {}", path.display()))?;
        }
    }

    Ok(())
}

/// The landing page lists chapters in blueprint order with numbered links.
pub fn landing_page(project: &Project, blueprint: &Blueprint, schema: &WebsiteSchema) -> String {
    let mut chapters_html = String::new();
    for (index, chapter) in blueprint.chapters.iter().enumerate() {
        let _ = write!(
            chapters_html,
            r#"
<div class="landing-chapter">
  <div class="landing-chapter-number">{number}</div>
  <div class="landing-chapter-content">
    <h3><a href="chapter_{number}.html">{title}</a></h3>
    <p>{purpose}</p>
  </div>
</div>"#,
            number = index + 1,
            title = chapter.title,
            purpose = chapter.purpose,
        );
    }

    let hero_image_html = schema
        .landing_page_image_path
        .as_deref()
        .map(|image_path| {
            format!(
                r#"
<div class="landing-hero-image">
  <img src="{image_path}" alt="{topic}" />
</div>"#,
                topic = project.topic,
            )
        })
        .unwrap_or_default();

    let nav_html = navigation(blueprint, "home", project);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{topic}</title>
  <link rel="stylesheet" href="styles.css">
</head>
<body>
  {nav_html}
  <main class="landing-content">
    <div class="landing-hero">
      <h1>{topic}</h1>
      <p class="landing-subtitle">A comprehensive guide exploring this topic in depth</p>
    </div>{hero_image_html}

    <div class="landing-chapters">
      <h2>Chapters</h2>
      {chapters_html}
    </div>
  </main>
</body>
</html>"#,
        topic = project.topic,
    )
}

/// Render one chapter page, or `None` when the schema chapter references no
/// blueprint chapter.
pub fn chapter_page(
    chapter_schema: &ChapterSchema,
    blueprint: &Blueprint,
    project: &Project,
) -> Option<String> {
    let chapter = resolve_chapter(blueprint, &chapter_schema.chapter_id)?;

    let mut intro_paragraphs = String::new();
    for paragraph in &chapter_schema.introduction {
        let _ = write!(intro_paragraphs, "<p>{paragraph}</p>");
    }
    let intro_html = format!(
        r#"
<div class="chapter-introduction">
  {intro_paragraphs}
</div>"#
    );

    let mut sections_html = String::new();
    for section_schema in &chapter_schema.sections {
        let section_title = chapter
            .sections
            .iter()
            .find(|section| section.id == section_schema.section_id)
            .map(|section| section.title.as_str())
            .unwrap_or(FALLBACK_SECTION_TITLE);
        sections_html.push_str(&section(section_schema, section_title));
    }

    let hero_image_html = chapter_schema
        .image_path
        .as_deref()
        .map(|image_path| {
            format!(
                r#"
<div class="chapter-hero-image">
  <img src="{image_path}" alt="{title}" />
</div>"#,
                title = chapter.title,
            )
        })
        .unwrap_or_default();

    let nav_html = navigation(blueprint, &chapter.id, project);

    Some(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title} - {topic}</title>
  <link rel="stylesheet" href="styles.css">
</head>
<body>
  {nav_html}
  <main class="chapter-content">
    <h1>{title}</h1>
    {hero_image_html}
    {intro_html}
    {sections_html}
  </main>
</body>
</html>"#,
        title = chapter.title,
        topic = project.topic,
    ))
}

fn section(section_schema: &SectionSchema, section_title: &str) -> String {
    let mut blocks_html = String::new();
    for block in &section_schema.blocks {
        blocks_html.push_str(&content_block(block));
    }

    format!(
        r#"
<section id="{section_id}" class="content-section">
  <h2 class="section-title">{section_title}</h2>
  {blocks_html}
</section>"#,
        section_id = section_schema.section_id,
    )
}

/// Per-variant block rendering. This match and the coercer in `parse` are the
/// only two places that enumerate the union.
pub fn content_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Prose { heading, paragraphs } => {
            let mut body = String::new();
            for paragraph in paragraphs {
                let _ = write!(body, "<p>{paragraph}</p>");
            }
            format!(
                r#"
<div class="prose-section">
  <h3>{heading}</h3>
  {body}
</div>"#
            )
        }
        ContentBlock::Timeline { heading, events } => {
            let mut events_html = String::new();
            for event in events {
                let _ = write!(
                    events_html,
                    r#"
<div class="timeline-event">
  <div class="timeline-date">{date}</div>
  <div class="timeline-content">
    <h4>{title}</h4>
    <p>{description}</p>
  </div>
</div>"#,
                    date = event.date,
                    title = event.title,
                    description = event.description,
                );
            }
            format!(
                r#"
<div class="timeline-section">
  <h3>{heading}</h3>
  <div class="timeline">
    {events_html}
  </div>
</div>"#
            )
        }
        ContentBlock::Table {
            heading,
            columns,
            rows,
        } => {
            let mut header = String::from("<tr>");
            for column in columns {
                let _ = write!(header, "<th>{column}</th>");
            }
            header.push_str("</tr>");

            let mut body = String::new();
            for row in rows {
                body.push_str("<tr>");
                for cell in row {
                    let _ = write!(body, "<td>{cell}</td>");
                }
                body.push_str("</tr>");
            }

            format!(
                r#"
<div class="table-section">
  <h3>{heading}</h3>
  <table>
    <thead>{header}</thead>
    <tbody>{body}</tbody>
  </table>
</div>"#
            )
        }
        ContentBlock::Callout {
            title,
            content,
            style,
        } => format!(
            r#"
<div class="callout callout-{style}">
  <h4>{title}</h4>
  <p>{content}</p>
</div>"#
        ),
        ContentBlock::KeyStat {
            value,
            label,
            context,
        } => {
            let context_html = context
                .as_deref()
                .map(|context| format!("<p class='stat-context'>{context}</p>"))
                .unwrap_or_default();
            format!(
                r#"
<div class="key-stat">
  <div class="stat-value">{value}</div>
  <div class="stat-label">{label}</div>
  {context_html}
</div>"#
            )
        }
        ContentBlock::Code {
            heading,
            language,
            code,
        } => format!(
            r#"
<div class="code-section">
  <h3>{heading}</h3>
  <pre><code class="language-{language}">{code}</code></pre>
</div>"#,
            code = escape_html(code),
        ),
    }
}

/// The sidebar is rebuilt identically on every page: a Home entry plus one
/// entry per blueprint chapter in blueprint order. The current page's entry is
/// marked active by identifier equality.
fn navigation(blueprint: &Blueprint, current_chapter_id: &str, project: &Project) -> String {
    let home_active = if current_chapter_id == "home" {
        "active"
    } else {
        ""
    };
    let mut items = format!(r#"<li class="{home_active}"><a href="index.html">Home</a></li>"#);

    for (index, chapter) in blueprint.chapters.iter().enumerate() {
        let active = if chapter.id == current_chapter_id {
            "active"
        } else {
            ""
        };
        let _ = write!(
            items,
            r#"<li class="{active}"><a href="chapter_{number}.html">{number}. {title}</a></li>"#,
            number = index + 1,
            title = chapter.title,
        );
    }

    format!(
        r#"
<nav class="site-nav">
  <div class="nav-header">
    <h1>{topic}</h1>
  </div>
  <ul class="nav-menu">
    {items}
  </ul>
</nav>"#,
        topic = project.topic,
    )
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn resolve_chapter<'a>(blueprint: &'a Blueprint, chapter_id: &str) -> Option<&'a Chapter> {
    blueprint
        .chapters
        .iter()
        .find(|chapter| chapter.id == chapter_id)
}

const STYLESHEET: &str = r#"/* sitewright generated website styles */

* {
  margin: 0;
  padding: 0;
  box-sizing: border-box;
}

body {
  font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
  line-height: 1.6;
  color: #333;
  background: #f5f5f5;
  min-height: 100vh;
  display: flex;
}

/* Left sidebar navigation */
.site-nav {
  width: 220px;
  min-width: 220px;
  background: #2c3e50;
  padding: 1.5rem 0;
  height: 100vh;
  overflow-y: auto;
  position: sticky;
  top: 0;
  flex-shrink: 0;
}

.nav-header {
  padding: 0 1rem 1rem;
  margin-bottom: 1.5rem;
  border-bottom: 1px solid rgba(255, 255, 255, 0.1);
}

.nav-header h1 {
  font-size: 1rem;
  color: #ecf0f1;
  font-weight: 600;
  border: none;
  padding: 0;
  margin: 0;
}

.nav-menu {
  list-style: none;
  padding: 0;
}

.nav-menu a {
  display: block;
  color: #ecf0f1;
  text-decoration: none;
  padding: 0.625rem 1rem;
  transition: background 0.2s;
  border-left: 3px solid transparent;
  font-size: 0.875rem;
}

.nav-menu a:hover {
  background: rgba(255, 255, 255, 0.05);
  border-left-color: #3498db;
}

.nav-menu .active a {
  background: rgba(52, 152, 219, 0.2);
  border-left-color: #3498db;
  font-weight: 500;
}

/* Main content area */
main {
  flex: 1;
  padding: 2.5rem 3rem;
  background: white;
  min-height: 100vh;
  overflow-x: hidden;
}

.chapter-content,
.landing-content {
  max-width: 1200px;
  width: 100%;
  margin: 0 auto;
}

/* Landing page */
.landing-hero {
  text-align: center;
  padding: 4rem 0;
  border-bottom: 1px solid #e0e0e0;
  margin-bottom: 3rem;
}

.landing-hero h1 {
  font-size: 2.5rem;
  margin-bottom: 1rem;
  color: #2c3e50;
}

.landing-subtitle {
  font-size: 1.25rem;
  color: #666;
  margin: 0;
}

.landing-hero-image,
.chapter-hero-image {
  margin: 2rem 0;
  border-radius: 8px;
  overflow: hidden;
  box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1);
}

.landing-hero-image img,
.chapter-hero-image img {
  width: 100%;
  height: auto;
  display: block;
  object-fit: cover;
}

.landing-chapters h2 {
  font-size: 1.5rem;
  color: #2c3e50;
  margin-bottom: 2rem;
}

.landing-chapter {
  display: flex;
  gap: 1.5rem;
  padding: 1.5rem;
  margin-bottom: 1rem;
  background: #f8f9fa;
  border-radius: 8px;
  transition: transform 0.2s, box-shadow 0.2s;
}

.landing-chapter:hover {
  transform: translateY(-2px);
  box-shadow: 0 4px 8px rgba(0, 0, 0, 0.1);
}

.landing-chapter-number {
  flex-shrink: 0;
  width: 48px;
  height: 48px;
  display: flex;
  align-items: center;
  justify-content: center;
  background: #3498db;
  color: white;
  border-radius: 8px;
  font-weight: 600;
  font-size: 1.25rem;
}

.landing-chapter-content h3 {
  margin: 0 0 0.5rem 0;
  font-size: 1.125rem;
}

.landing-chapter-content h3 a {
  color: #2c3e50;
  text-decoration: none;
}

.landing-chapter-content h3 a:hover {
  color: #3498db;
}

.landing-chapter-content p {
  margin: 0;
  color: #666;
  font-size: 0.9375rem;
}

h1 {
  font-size: 2.5rem;
  margin-bottom: 1.5rem;
  color: #2c3e50;
  border-bottom: 3px solid #3498db;
  padding-bottom: 0.5rem;
}

h2 {
  font-size: 2rem;
  margin: 2rem 0 1rem;
  color: #34495e;
}

.section-title {
  font-size: 1.75rem;
  margin: 2.5rem 0 1.5rem;
  color: #2c3e50;
  font-weight: 600;
}

h3 {
  font-size: 1.5rem;
  margin: 1.5rem 0 0.75rem;
  color: #34495e;
}

h4 {
  font-size: 1.25rem;
  margin: 1rem 0 0.5rem;
  color: #555;
}

p {
  margin: 1rem 0;
  text-align: justify;
  overflow-wrap: break-word;
}

.chapter-introduction {
  font-size: 1.1rem;
  line-height: 1.8;
  margin-bottom: 2rem;
  padding: 1.5rem;
  background: #ecf0f1;
  border-left: 4px solid #3498db;
}

.content-section {
  margin: 3rem 0;
  padding: 1.5rem 0;
  border-top: 1px solid #ddd;
}

.prose-section {
  margin: 1.5rem 0;
}

.timeline {
  position: relative;
  padding-left: 2rem;
  margin: 1.5rem 0;
}

.timeline-event {
  position: relative;
  padding: 1rem 0 1rem 1.5rem;
  border-left: 2px solid #3498db;
}

.timeline-event::before {
  content: "";
  position: absolute;
  left: -6px;
  top: 1.5rem;
  width: 12px;
  height: 12px;
  border-radius: 50%;
  background: #3498db;
}

.timeline-date {
  font-weight: bold;
  color: #3498db;
  margin-bottom: 0.5rem;
}

.table-section {
  margin: 1.5rem 0;
  overflow-x: auto;
}

table {
  width: 100%;
  border-collapse: collapse;
  margin: 1rem 0;
}

th,
td {
  padding: 0.75rem;
  text-align: left;
  border: 1px solid #ddd;
}

th {
  background: #3498db;
  color: white;
  font-weight: 600;
}

tr:nth-child(even) {
  background: #f9f9f9;
}

.callout {
  padding: 1rem 1.5rem;
  margin: 1.5rem 0;
  border-radius: 4px;
  border-left: 4px solid;
}

.callout-info {
  background: #e8f4f8;
  border-color: #3498db;
}

.callout-warning {
  background: #fff3cd;
  border-color: #ffc107;
}

.callout-tip {
  background: #d4edda;
  border-color: #28a745;
}

.key-stat {
  text-align: center;
  padding: 1.5rem;
  margin: 1.5rem 0;
  background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
  color: white;
  border-radius: 8px;
}

.stat-value {
  font-size: 3rem;
  font-weight: bold;
  margin-bottom: 0.5rem;
}

.stat-label {
  font-size: 1.25rem;
  opacity: 0.9;
}

.stat-context {
  margin-top: 0.5rem;
  font-size: 0.9rem;
  opacity: 0.8;
}

.code-section {
  margin: 1.5rem 0;
}

pre {
  background: #2c3e50;
  color: #ecf0f1;
  padding: 1rem;
  border-radius: 4px;
  overflow-x: auto;
}

code {
  font-family: "Courier New", Courier, monospace;
  font-size: 0.9rem;
}

@media (max-width: 768px) {
  body {
    flex-direction: column;
  }

  .site-nav {
    width: 100%;
    min-width: 100%;
    height: auto;
    position: relative;
    padding: 1rem 0;
  }

  main {
    padding: 1.5rem;
  }

  h1 {
    font-size: 2rem;
  }

  h2 {
    font-size: 1.5rem;
  }

  .landing-chapter {
    flex-direction: column;
    gap: 1rem;
  }
}
"#;
