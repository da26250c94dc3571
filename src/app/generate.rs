use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt as _};

use crate::app::{AppState, error_response};
use crate::events::{EventSink, PipelineEvent};

type ApiError = (StatusCode, String);
type EventStream = Sse<std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>;

// SSE endpoints for the three pipeline stages. Preconditions are checked
// before the stream starts so violations surface as proper HTTP status codes;
// after that the stage runs in a background task and its event stream is
// forwarded. A client disconnect only stops the forwarding, never the stage.

pub async fn generate_blueprint(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<EventStream, ApiError> {
    state
        .pipeline
        .preflight_blueprint(&project_id)
        .await
        .map_err(|err| error_response(&err))?;

    let (sink, rx) = EventSink::channel(64);
    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(async move {
        if let Err(err) = pipeline.run_blueprint_stage(&project_id, &sink).await {
            tracing::warn!(project_id, error = %format!("{err:#}"), "blueprint stage failed");
        }
    });

    Ok(sse_response(rx))
}

pub async fn generate_content(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<EventStream, ApiError> {
    state
        .pipeline
        .preflight_content(&project_id)
        .await
        .map_err(|err| error_response(&err))?;

    let (sink, rx) = EventSink::channel(64);
    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(async move {
        if let Err(err) = pipeline.run_content_stage(&project_id, &sink).await {
            tracing::warn!(project_id, error = %format!("{err:#}"), "content stage failed");
        }
    });

    Ok(sse_response(rx))
}

pub async fn generate_website(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<EventStream, ApiError> {
    state
        .pipeline
        .preflight_render(&project_id)
        .await
        .map_err(|err| error_response(&err))?;

    let (sink, rx) = EventSink::channel(64);
    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(async move {
        if let Err(err) = pipeline.run_render_stage(&project_id, &sink).await {
            tracing::warn!(project_id, error = %format!("{err:#}"), "render stage failed");
        }
    });

    Ok(sse_response(rx))
}

fn sse_response(rx: mpsc::Receiver<PipelineEvent>) -> EventStream {
    let stream = ReceiverStream::new(rx).map(|event| {
        let payload =
            serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().data(payload))
    });
    let stream: std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>> =
        Box::pin(stream);
    Sse::new(stream).keep_alive(KeepAlive::default())
}
