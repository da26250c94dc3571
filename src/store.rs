use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;

use crate::blueprint::Blueprint;
use crate::project::Project;
use crate::schema::WebsiteSchema;

/// Deletion stayed blocked after bounded retries, typically because another
/// process (a live preview) holds a handle inside the project directory.
/// Surfaced to the caller as a conflict, not a generic failure.
#[derive(Debug)]
pub struct DeleteLocked {
    pub path: PathBuf,
}

impl std::fmt::Display for DeleteLocked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "project files are in use: {} (close any preview windows and retry)",
            self.path.display()
        )
    }
}

impl std::error::Error for DeleteLocked {}

/// Persistence for projects, blueprints, schemas, and rendered-site
/// directories. One JSON document per record; the rendered website lives in a
/// directory keyed by (project, schema) so schema versions never collide.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn save_project(&self, project: &Project) -> anyhow::Result<()>;
    async fn get_project(&self, project_id: &str) -> anyhow::Result<Option<Project>>;
    async fn list_projects(&self) -> anyhow::Result<Vec<Project>>;
    /// Returns false when the project does not exist. Fails with a
    /// `DeleteLocked` inside the error chain when files stay locked.
    async fn delete_project(&self, project_id: &str) -> anyhow::Result<bool>;

    async fn save_blueprint(&self, blueprint: &Blueprint) -> anyhow::Result<()>;
    async fn get_blueprint(
        &self,
        project_id: &str,
        blueprint_id: &str,
    ) -> anyhow::Result<Option<Blueprint>>;

    async fn save_schema(&self, schema: &WebsiteSchema) -> anyhow::Result<()>;
    async fn get_schema(
        &self,
        project_id: &str,
        schema_id: &str,
    ) -> anyhow::Result<Option<WebsiteSchema>>;

    fn website_dir(&self, project_id: &str, schema_id: &str) -> PathBuf;
    async fn ensure_website_dir(
        &self,
        project_id: &str,
        schema_id: &str,
    ) -> anyhow::Result<PathBuf>;
}

const DELETE_ATTEMPTS: usize = 5;
const DELETE_RETRY_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct LocalFsProjectStore {
    base_dir: PathBuf,
}

impl LocalFsProjectStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn projects_dir(&self) -> PathBuf {
        self.base_dir.join("projects")
    }

    fn project_dir(&self, project_id: &str) -> PathBuf {
        self.projects_dir().join(project_id)
    }

    fn project_json_path(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("project.json")
    }

    fn blueprint_json_path(&self, project_id: &str, blueprint_id: &str) -> PathBuf {
        self.project_dir(project_id)
            .join(format!("blueprint_{blueprint_id}.json"))
    }

    fn schema_json_path(&self, project_id: &str, schema_id: &str) -> PathBuf {
        self.project_dir(project_id)
            .join(format!("schema_{schema_id}.json"))
    }
}

#[async_trait]
impl ProjectStore for LocalFsProjectStore {
    async fn save_project(&self, project: &Project) -> anyhow::Result<()> {
        write_json_atomic(&self.project_json_path(&project.id), project)
            .await
            .context("write project.json")
    }

    async fn get_project(&self, project_id: &str) -> anyhow::Result<Option<Project>> {
        let path = self.project_json_path(project_id);
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    async fn list_projects(&self) -> anyhow::Result<Vec<Project>> {
        let projects_dir = self.projects_dir();
        let mut dir = match fs::read_dir(&projects_dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut projects = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let project_id = name.to_string_lossy();
            if let Some(project) = self.get_project(&project_id).await? {
                projects.push(project);
            }
        }

        // Newest first.
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn delete_project(&self, project_id: &str) -> anyhow::Result<bool> {
        let project_dir = self.project_dir(project_id);
        if !project_dir.exists() {
            return Ok(false);
        }

        for attempt in 1..=DELETE_ATTEMPTS {
            match fs::remove_dir_all(&project_dir).await {
                Ok(()) => return Ok(true),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(true),
                Err(err) => {
                    tracing::warn!(
                        project_id,
                        attempt,
                        attempts = DELETE_ATTEMPTS,
                        ?err,
                        "project delete blocked; retrying"
                    );
                }
            }
            if attempt < DELETE_ATTEMPTS {
                tokio::time::sleep(DELETE_RETRY_PAUSE).await;
            }
        }

        if !project_dir.exists() {
            return Ok(true);
        }
        Err(anyhow::Error::new(DeleteLocked { path: project_dir }))
    }

    async fn save_blueprint(&self, blueprint: &Blueprint) -> anyhow::Result<()> {
        let path = self.blueprint_json_path(&blueprint.project_id, &blueprint.id);
        write_json_atomic(&path, blueprint)
            .await
            .context("write blueprint json")
    }

    async fn get_blueprint(
        &self,
        project_id: &str,
        blueprint_id: &str,
    ) -> anyhow::Result<Option<Blueprint>> {
        let path = self.blueprint_json_path(project_id, blueprint_id);
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    async fn save_schema(&self, schema: &WebsiteSchema) -> anyhow::Result<()> {
        let path = self.schema_json_path(&schema.project_id, &schema.id);
        write_json_atomic(&path, schema)
            .await
            .context("write schema json")
    }

    async fn get_schema(
        &self,
        project_id: &str,
        schema_id: &str,
    ) -> anyhow::Result<Option<WebsiteSchema>> {
        let path = self.schema_json_path(project_id, schema_id);
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    fn website_dir(&self, project_id: &str, schema_id: &str) -> PathBuf {
        self.project_dir(project_id)
            .join(format!("website_{schema_id}"))
    }

    async fn ensure_website_dir(
        &self,
        project_id: &str,
        schema_id: &str,
    ) -> anyhow::Result<PathBuf> {
        let dir = self.website_dir(project_id, schema_id);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create website dir: {}", dir.display()))?;
        Ok(dir)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{DepthLevel, ProjectConfig, ToneStyle};

    fn fixture_project(topic: &str) -> Project {
        Project::new(
            topic,
            ProjectConfig {
                depth: DepthLevel::Overview,
                tone: ToneStyle::Casual,
                audience_level: "general".to_string(),
                model: ProjectConfig::default_model(),
                generate_images: false,
            },
        )
    }

    #[tokio::test]
    async fn project_round_trips_through_store() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = LocalFsProjectStore::new(temp.path());

        let project = fixture_project("Volcanoes");
        store.save_project(&project).await.unwrap();

        let loaded = store.get_project(&project.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, project.id);
        assert_eq!(loaded.topic, "Volcanoes");
        assert_eq!(loaded.status, project.status);
    }

    #[tokio::test]
    async fn missing_records_are_none() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = LocalFsProjectStore::new(temp.path());

        assert!(store.get_project("nope").await.unwrap().is_none());
        assert!(store.get_blueprint("nope", "bp").await.unwrap().is_none());
        assert!(store.get_schema("nope", "s").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_sorted_newest_first() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = LocalFsProjectStore::new(temp.path());

        let mut older = fixture_project("First");
        older.created_at = chrono::Utc::now() - chrono::Duration::hours(1);
        let newer = fixture_project("Second");
        store.save_project(&older).await.unwrap();
        store.save_project(&newer).await.unwrap();

        let projects = store.list_projects().await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].topic, "Second");
        assert_eq!(projects[1].topic, "First");
    }

    #[tokio::test]
    async fn delete_removes_everything_and_reports_missing() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = LocalFsProjectStore::new(temp.path());

        let project = fixture_project("Doomed");
        store.save_project(&project).await.unwrap();
        store
            .ensure_website_dir(&project.id, "schema-1")
            .await
            .unwrap();

        assert!(store.delete_project(&project.id).await.unwrap());
        assert!(store.get_project(&project.id).await.unwrap().is_none());
        assert!(!store.delete_project(&project.id).await.unwrap());
    }

    #[tokio::test]
    async fn website_dirs_are_keyed_by_schema() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = LocalFsProjectStore::new(temp.path());

        let a = store.ensure_website_dir("p", "s1").await.unwrap();
        let b = store.ensure_website_dir("p", "s2").await.unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with("website_s1"));
        assert!(b.ends_with("website_s2"));
    }
}
