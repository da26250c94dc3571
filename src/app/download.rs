use std::fs::File;
use std::io;
use std::path::{Component, Path as FsPath, PathBuf};

use anyhow::Context as _;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use tokio_util::io::ReaderStream;

use crate::app::{AppState, error_response};
use crate::project::Project;

type ApiError = (StatusCode, String);

/// Serve one file from the rendered website for preview.
pub async fn preview_file(
    State(state): State<AppState>,
    Path((project_id, path)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let project = load_rendered_project(&state, &project_id).await?;
    let website_dir = PathBuf::from(project.website_path.as_deref().unwrap_or_default());

    let relative = sanitize_relative_path(&path)
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "invalid path".to_string()))?;
    let file_path = website_dir.join(relative);

    let file = tokio::fs::File::open(&file_path)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, "file not found".to_string()))?;
    let stream = ReaderStream::new(file);

    let mut response = Response::new(Body::from_stream(stream));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&file_path)),
    );
    Ok(response)
}

/// Download the rendered website as a zip archive.
pub async fn download_website(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Response, ApiError> {
    let project = load_rendered_project(&state, &project_id).await?;
    let website_dir = PathBuf::from(project.website_path.as_deref().unwrap_or_default());
    if !website_dir.exists() {
        return Err((StatusCode::NOT_FOUND, "website files not found".to_string()));
    }

    let bytes = tokio::task::spawn_blocking(move || zip_directory(&website_dir))
        .await
        .map_err(|err| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("join zip task: {err}"),
            )
        })?
        .map_err(|err| error_response(&err))?;

    let archive_name = format!("{}_website.zip", project.topic.replace(' ', "_"));
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{archive_name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"website.zip\""));

    let mut response = Response::new(Body::from(bytes));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/zip"),
    );
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

async fn load_rendered_project(state: &AppState, project_id: &str) -> Result<Project, ApiError> {
    let project = state
        .store
        .get_project(project_id)
        .await
        .map_err(|err| error_response(&err))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "project not found".to_string()))?;
    if project.website_path.is_none() {
        return Err((StatusCode::NOT_FOUND, "website not generated".to_string()));
    }
    Ok(project)
}

/// Accept only plain relative components; anything with `..`, a root, or a
/// prefix is rejected outright.
fn sanitize_relative_path(raw: &str) -> Option<PathBuf> {
    let path = FsPath::new(raw);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        return None;
    }
    Some(clean)
}

fn content_type_for(path: &FsPath) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn zip_directory(dir: &FsPath) -> anyhow::Result<Vec<u8>> {
    let cursor = io::Cursor::new(Vec::new());
    let mut zip = zip::ZipWriter::new(cursor);

    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    add_dir_recursive(&mut zip, dir, FsPath::new(""), options).context("zip website dir")?;

    let cursor = zip.finish().context("zip finish")?;
    Ok(cursor.into_inner())
}

fn add_dir_recursive(
    zip: &mut zip::ZipWriter<io::Cursor<Vec<u8>>>,
    dir: &FsPath,
    prefix: &FsPath,
    options: zip::write::SimpleFileOptions,
) -> anyhow::Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("read dir: {}", dir.display()))?
        .collect::<Result<_, _>>()
        .with_context(|| format!("read dir entries: {}", dir.display()))?;
    // Stable archive ordering.
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let name = prefix.join(entry.file_name());
        let name = name.to_string_lossy().replace('\\', "/");

        if path.is_dir() {
            zip.add_directory(format!("{name}/"), options)
                .with_context(|| format!("zip add dir: {name}"))?;
            add_dir_recursive(zip, &path, FsPath::new(&name), options)?;
        } else {
            zip.start_file(name.clone(), options)
                .with_context(|| format!("zip start file: {name}"))?;
            let mut file =
                File::open(&path).with_context(|| format!("open: {}", path.display()))?;
            io::copy(&mut file, zip).with_context(|| format!("zip write: {name}"))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_components_are_rejected() {
        assert!(sanitize_relative_path("../secrets").is_none());
        assert!(sanitize_relative_path("a/../../b").is_none());
        assert!(sanitize_relative_path("/etc/passwd").is_none());
        assert!(sanitize_relative_path("").is_none());
    }

    #[test]
    fn plain_relative_paths_pass_through() {
        assert_eq!(
            sanitize_relative_path("chapter_1.html").unwrap(),
            PathBuf::from("chapter_1.html")
        );
        assert_eq!(
            sanitize_relative_path("./styles.css").unwrap(),
            PathBuf::from("styles.css")
        );
    }

    #[test]
    fn content_types_cover_rendered_outputs() {
        assert_eq!(
            content_type_for(FsPath::new("index.html")),
            "text/html; charset=utf-8"
        );
        assert_eq!(
            content_type_for(FsPath::new("styles.css")),
            "text/css; charset=utf-8"
        );
        assert_eq!(
            content_type_for(FsPath::new("chapter_1_hero.png")),
            "image/png"
        );
        assert_eq!(
            content_type_for(FsPath::new("mystery.bin")),
            "application/octet-stream"
        );
    }

    #[test]
    fn zip_contains_nested_files() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("index.html"), "<html></html>").unwrap();
        std::fs::create_dir(temp.path().join("assets")).unwrap();
        std::fs::write(temp.path().join("assets").join("x.png"), [1u8, 2, 3]).unwrap();

        let bytes = zip_directory(temp.path()).unwrap();
        assert!(!bytes.is_empty());
        // Zip local file headers carry the entry names verbatim.
        let haystack = String::from_utf8_lossy(&bytes).to_string();
        assert!(haystack.contains("index.html"));
        assert!(haystack.contains("assets/x.png"));
    }
}
