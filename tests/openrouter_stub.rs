use std::io::Read as _;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value;

use sitewright::llm::{ChatMessage, CompletionOptions, GenerativeBackend};
use sitewright::openrouter::OpenRouterClient;

enum StubBehavior {
    /// Echo a canned completion, wrapped in chatty prose like a real model.
    Completion(&'static str),
    /// Fail with an OpenRouter-style error body.
    ApiError,
}

struct OpenRouterStub {
    base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl OpenRouterStub {
    fn spawn(behavior: StubBehavior) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start openrouter stub");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/api/v1");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                if request.method() != &tiny_http::Method::Post
                    || path != "/api/v1/chat/completions"
                {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("bad body").with_status_code(400),
                    );
                    continue;
                }
                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json")
                                .with_status_code(400),
                        );
                        continue;
                    }
                };

                // The client must send role-tagged messages and a model id.
                let has_messages = parsed
                    .get("messages")
                    .and_then(Value::as_array)
                    .is_some_and(|messages| {
                        messages
                            .iter()
                            .all(|message| message.get("role").is_some())
                    });
                let has_model = parsed.get("model").and_then(Value::as_str).is_some();
                if !has_messages || !has_model {
                    let _ = request.respond(
                        tiny_http::Response::from_string("missing fields")
                            .with_status_code(400),
                    );
                    continue;
                }

                let (status, response_body) = match &behavior {
                    StubBehavior::Completion(text) => (
                        200,
                        serde_json::json!({
                            "id": "gen-stub",
                            "model": parsed.get("model").cloned().unwrap_or(Value::Null),
                            "choices": [
                                {
                                    "message": {
                                        "role": "assistant",
                                        "content": format!("Here you go! {text} Hope that helps."),
                                    }
                                }
                            ]
                        }),
                    ),
                    StubBehavior::ApiError => (
                        502,
                        serde_json::json!({
                            "error": { "message": "model overloaded", "code": 502 }
                        }),
                    ),
                };

                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    &b"application/json"[..],
                )
                .expect("build header");
                let response = tiny_http::Response::from_string(response_body.to_string())
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for OpenRouterStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

const OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.7,
    max_tokens: 4000,
};

#[tokio::test]
async fn completion_text_is_extracted_from_first_choice() {
    let stub = OpenRouterStub::spawn(StubBehavior::Completion("{\"chapters\":[]}"));
    let client = OpenRouterClient::with_base_url("test-key", &stub.base_url).unwrap();

    let messages = [
        ChatMessage::system("You are a test."),
        ChatMessage::user("Say something."),
    ];
    let text = client
        .complete("stub/model-1", &messages, OPTIONS)
        .await
        .unwrap();

    assert!(text.contains("{\"chapters\":[]}"));
    assert!(text.starts_with("Here you go!"));
}

#[tokio::test]
async fn api_error_surfaces_status_and_message() {
    let stub = OpenRouterStub::spawn(StubBehavior::ApiError);
    let client = OpenRouterClient::with_base_url("test-key", &stub.base_url).unwrap();

    let messages = [ChatMessage::user("Say something.")];
    let err = client
        .complete("stub/model-1", &messages, OPTIONS)
        .await
        .unwrap_err();

    let rendered = format!("{err:#}");
    assert!(rendered.contains("502"));
    assert!(rendered.contains("model overloaded"));
}
