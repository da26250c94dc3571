use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use crate::architect;
use crate::blueprint::Blueprint;
use crate::constructor;
use crate::events::{EventSink, EventType, PipelineEvent};
use crate::illustrator::Illustrator;
use crate::imagegen::ImageBackend;
use crate::llm::GenerativeBackend;
use crate::project::{Project, ProjectStatus};
use crate::render;
use crate::schema::WebsiteSchema;
use crate::store::ProjectStore;

/// A referenced record does not exist. Maps to 404 at the HTTP boundary.
#[derive(Debug)]
pub struct NotFound(pub String);

impl std::fmt::Display for NotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for NotFound {}

/// A stage was requested before its precondition held (e.g. content generation
/// before blueprint approval). Rejected before any stage work begins; maps to
/// 400 at the HTTP boundary.
#[derive(Debug)]
pub struct Precondition(pub String);

impl std::fmt::Display for Precondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Precondition {}

/// Drives Architect → Constructor (+ optional Illustrator) → Renderer in
/// order. Owns the persistence and backend dependencies; stages receive them
/// explicitly. A failed stage rolls the project status back to the stage's
/// pre-stage value so re-invocation is well-defined.
pub struct Pipeline {
    store: Arc<dyn ProjectStore>,
    backend: Arc<dyn GenerativeBackend>,
    images: Arc<dyn ImageBackend>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        backend: Arc<dyn GenerativeBackend>,
        images: Arc<dyn ImageBackend>,
    ) -> Self {
        Self {
            store,
            backend,
            images,
        }
    }

    async fn load_project(&self, project_id: &str) -> anyhow::Result<Project> {
        self.store
            .get_project(project_id)
            .await?
            .ok_or_else(|| anyhow::Error::new(NotFound("project not found".to_string())))
    }

    async fn load_blueprint(&self, project: &Project) -> anyhow::Result<Blueprint> {
        let blueprint_id = project.blueprint_id.as_deref().ok_or_else(|| {
            anyhow::Error::new(Precondition("blueprint not generated".to_string()))
        })?;
        self.store
            .get_blueprint(&project.id, blueprint_id)
            .await?
            .ok_or_else(|| anyhow::Error::new(NotFound("blueprint not found".to_string())))
    }

    /// Cheap precondition check used by the HTTP layer to reject a request
    /// with a proper status code before the event stream starts.
    pub async fn preflight_blueprint(&self, project_id: &str) -> anyhow::Result<()> {
        self.load_project(project_id).await?;
        Ok(())
    }

    pub async fn preflight_content(&self, project_id: &str) -> anyhow::Result<()> {
        let project = self.load_project(project_id).await?;
        let blueprint = self.load_blueprint(&project).await?;
        if !blueprint.approved {
            anyhow::bail!(Precondition("blueprint not approved".to_string()));
        }
        Ok(())
    }

    pub async fn preflight_render(&self, project_id: &str) -> anyhow::Result<()> {
        let project = self.load_project(project_id).await?;
        let schema_id = project.schema_version.as_deref().ok_or_else(|| {
            anyhow::Error::new(Precondition("schema not generated".to_string()))
        })?;
        self.store
            .get_schema(project_id, schema_id)
            .await?
            .ok_or_else(|| anyhow::Error::new(NotFound("schema not found".to_string())))?;
        self.load_blueprint(&project).await?;
        Ok(())
    }

    /// Flip the approval flag. The blueprint's content is immutable from here
    /// on; only this flag ever toggles.
    pub async fn approve_blueprint(&self, project_id: &str) -> anyhow::Result<()> {
        let mut project = self.load_project(project_id).await?;
        let blueprint_id = project
            .blueprint_id
            .clone()
            .ok_or_else(|| anyhow::Error::new(NotFound("blueprint not generated".to_string())))?;
        let mut blueprint = self
            .store
            .get_blueprint(project_id, &blueprint_id)
            .await?
            .ok_or_else(|| anyhow::Error::new(NotFound("blueprint not found".to_string())))?;

        blueprint.approved = true;
        self.store
            .save_blueprint(&blueprint)
            .await
            .context("save approved blueprint")?;

        project.status = ProjectStatus::BlueprintApproved;
        self.store
            .save_project(&project)
            .await
            .context("save project")?;
        Ok(())
    }

    pub async fn run_blueprint_stage(
        &self,
        project_id: &str,
        events: &EventSink,
    ) -> anyhow::Result<Blueprint> {
        let mut project = self.load_project(project_id).await?;

        let result = self.try_blueprint_stage(&mut project, events).await;
        if result.is_err() {
            self.rollback(&mut project, ProjectStatus::Created).await;
        }
        result
    }

    async fn try_blueprint_stage(
        &self,
        project: &mut Project,
        events: &EventSink,
    ) -> anyhow::Result<Blueprint> {
        let blueprint =
            architect::generate_blueprint(self.backend.as_ref(), project, events).await?;

        let persisted: anyhow::Result<()> = async {
            self.store
                .save_blueprint(&blueprint)
                .await
                .context("save blueprint")?;
            project.blueprint_id = Some(blueprint.id.clone());
            project.status = ProjectStatus::BlueprintGenerated;
            self.store
                .save_project(project)
                .await
                .context("save project")?;
            Ok(())
        }
        .await;
        if let Err(err) = persisted {
            events
                .emit(PipelineEvent::error(format!(
                    "Blueprint generation failed: {err:#}"
                )))
                .await;
            return Err(err);
        }

        events
            .emit(
                PipelineEvent::new(EventType::BlueprintComplete, "Blueprint saved").with_data(
                    serde_json::json!({ "blueprint_id": blueprint.id }),
                ),
            )
            .await;
        Ok(blueprint)
    }

    pub async fn run_content_stage(
        &self,
        project_id: &str,
        events: &EventSink,
    ) -> anyhow::Result<WebsiteSchema> {
        let mut project = self.load_project(project_id).await?;
        let blueprint = self.load_blueprint(&project).await?;
        if !blueprint.approved {
            anyhow::bail!(Precondition("blueprint not approved".to_string()));
        }

        // Schema identity is fixed before generation starts so images written
        // during the run land in the directory keyed by it.
        let schema_id = uuid::Uuid::new_v4().to_string();
        let (illustrator, image_dir) = if project.config.generate_images {
            let image_dir = self
                .store
                .ensure_website_dir(&project.id, &schema_id)
                .await?;
            let illustrator =
                Illustrator::new(Arc::clone(&self.backend), Arc::clone(&self.images))?;
            (Some(illustrator), Some(image_dir))
        } else {
            (None, None)
        };

        let result = self
            .try_content_stage(
                &mut project,
                &blueprint,
                &schema_id,
                illustrator.as_ref(),
                image_dir.as_deref(),
                events,
            )
            .await;
        if result.is_err() {
            self.rollback(&mut project, ProjectStatus::BlueprintApproved)
                .await;
        }
        result
    }

    async fn try_content_stage(
        &self,
        project: &mut Project,
        blueprint: &Blueprint,
        schema_id: &str,
        illustrator: Option<&Illustrator>,
        image_dir: Option<&Path>,
        events: &EventSink,
    ) -> anyhow::Result<WebsiteSchema> {
        let schema = constructor::generate_website_schema(
            self.backend.as_ref(),
            project,
            blueprint,
            schema_id,
            illustrator,
            image_dir,
            events,
        )
        .await?;

        let persisted: anyhow::Result<()> = async {
            self.store.save_schema(&schema).await.context("save schema")?;
            project.schema_version = Some(schema.id.clone());
            project.status = ProjectStatus::SchemaGenerated;
            self.store
                .save_project(project)
                .await
                .context("save project")?;
            Ok(())
        }
        .await;
        if let Err(err) = persisted {
            events
                .emit(PipelineEvent::error(format!(
                    "Content generation failed: {err:#}"
                )))
                .await;
            return Err(err);
        }

        events
            .emit(
                PipelineEvent::new(
                    EventType::ChapterSchemaComplete,
                    "Schema generation complete",
                )
                .with_progress(100.0)
                .with_data(serde_json::json!({ "schema_id": schema.id })),
            )
            .await;
        Ok(schema)
    }

    pub async fn run_render_stage(
        &self,
        project_id: &str,
        events: &EventSink,
    ) -> anyhow::Result<PathBuf> {
        let mut project = self.load_project(project_id).await?;
        let schema_id = project.schema_version.clone().ok_or_else(|| {
            anyhow::Error::new(Precondition("schema not generated".to_string()))
        })?;
        let schema = self
            .store
            .get_schema(project_id, &schema_id)
            .await?
            .ok_or_else(|| anyhow::Error::new(NotFound("schema not found".to_string())))?;
        let blueprint = self.load_blueprint(&project).await?;

        let out_dir = self
            .store
            .ensure_website_dir(&project.id, &schema.id)
            .await?;

        let result = self
            .try_render_stage(&mut project, &blueprint, &schema, &out_dir, events)
            .await;
        if result.is_err() {
            self.rollback(&mut project, ProjectStatus::SchemaGenerated)
                .await;
        }
        result.map(|()| out_dir)
    }

    async fn try_render_stage(
        &self,
        project: &mut Project,
        blueprint: &Blueprint,
        schema: &WebsiteSchema,
        out_dir: &Path,
        events: &EventSink,
    ) -> anyhow::Result<()> {
        render::render_website(project, blueprint, schema, out_dir, events).await?;

        let persisted: anyhow::Result<()> = async {
            project.website_path = Some(out_dir.display().to_string());
            project.status = ProjectStatus::Completed;
            self.store
                .save_project(project)
                .await
                .context("save project")?;
            Ok(())
        }
        .await;
        if let Err(err) = persisted {
            events
                .emit(PipelineEvent::error(format!(
                    "Website rendering failed: {err:#}"
                )))
                .await;
            return Err(err);
        }
        Ok(())
    }

    /// Best-effort status reset after a failed stage. A save failure here is
    /// logged and swallowed; the stage's own error is the one that surfaces.
    async fn rollback(&self, project: &mut Project, status: ProjectStatus) {
        project.status = status;
        if let Err(err) = self.store.save_project(project).await {
            tracing::error!(
                project_id = %project.id,
                ?status,
                error = %format!("{err:#}"),
                "failed to roll back project status"
            );
        }
    }
}
