use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    BlueprintStart,
    BlueprintComplete,
    ChapterSchemaStart,
    ChapterSchemaComplete,
    RenderStart,
    RenderComplete,
    ExportReady,
    Error,
    Progress,
}

/// A transient progress/status signal streamed to the caller. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineEvent {
    pub event_type: EventType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl PipelineEvent {
    pub fn new(event_type: EventType, message: impl Into<String>) -> Self {
        Self {
            event_type,
            message: message.into(),
            data: None,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        let data = serde_json::json!({ "error": message });
        Self::new(EventType::Error, message).with_data(data)
    }
}

/// Sending half of a stage's event stream.
///
/// A closed receiver (caller disconnected) only stops event consumption; the
/// stage keeps running, so send failures are swallowed here.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<PipelineEvent>,
}

impl EventSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PipelineEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub async fn emit(&self, event: PipelineEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("event receiver dropped; discarding pipeline event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_snake_case_type_tag() {
        let event = PipelineEvent::new(EventType::BlueprintStart, "starting").with_progress(0.0);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"blueprint_start\""));
        assert!(json.contains("\"progress\":0.0"));
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn error_event_carries_message_in_data() {
        let event = PipelineEvent::error("boom");
        assert_eq!(event.event_type, EventType::Error);
        assert_eq!(event.data.unwrap()["error"], "boom");
    }

    #[tokio::test]
    async fn emit_survives_a_dropped_receiver() {
        let (sink, rx) = EventSink::channel(4);
        drop(rx);
        sink.emit(PipelineEvent::new(EventType::Progress, "still running"))
            .await;
    }
}
