//! Generation client behavior against a scripted backend.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use imagine::AspectRatio;
use imagine::services::classify::{ErrorKind, RemoteError};
use imagine::services::gemini::{GenerateContentResponse, GenerationRequest, ImageBackend, Part};
use imagine::services::generation::{GenerationClient, RetryPolicy, Sleeper};

type Reply = Result<GenerateContentResponse, RemoteError>;

#[derive(Clone, Default)]
struct ScriptedBackend {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    calls: Arc<Mutex<Vec<(String, String, AspectRatio)>>>,
}

impl ScriptedBackend {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> Vec<(String, String, AspectRatio)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageBackend for ScriptedBackend {
    async fn generate_content(&self, request: &GenerationRequest<'_>) -> Reply {
        self.calls.lock().unwrap().push((
            request.api_key.to_string(),
            request.prompt.to_string(),
            request.aspect_ratio,
        ));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::transport("script exhausted")))
    }
}

#[derive(Clone, Default)]
struct RecordingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

fn image_reply(mime: &str, data: &str) -> Reply {
    Ok(GenerateContentResponse::from_parts(vec![
        Part::text("here you go"),
        Part::inline(Some(mime), data),
    ]))
}

fn rate_limited() -> Reply {
    Err(RemoteError::http(
        429,
        r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota).","status":"RESOURCE_EXHAUSTED"}}"#,
    ))
}

fn client(
    backend: &ScriptedBackend,
    sleeper: &RecordingSleeper,
    key: Option<&str>,
) -> GenerationClient<ScriptedBackend, RecordingSleeper> {
    GenerationClient::with_sleeper(
        backend.clone(),
        sleeper.clone(),
        key.map(str::to_string),
        RetryPolicy::default(),
    )
}

#[tokio::test]
async fn success_returns_the_mocked_payload() {
    let backend = ScriptedBackend::new(vec![image_reply("image/jpeg", "/9j/4AAQ")]);
    let sleeper = RecordingSleeper::default();

    let payload = client(&backend, &sleeper, Some("key-123"))
        .generate("a lighthouse at dusk", AspectRatio::Portrait)
        .await
        .unwrap();

    assert_eq!(payload.mime_type, "image/jpeg");
    assert_eq!(payload.data, "/9j/4AAQ");
    assert_eq!(payload.data_uri(), "data:image/jpeg;base64,/9j/4AAQ");

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "key-123");
    assert_eq!(
        calls[0].1,
        "a lighthouse at dusk, high quality, HD, 4k, highly detailed, photorealistic"
    );
    assert_eq!(calls[0].2, AspectRatio::Portrait);
    assert!(sleeper.waits().is_empty());
}

#[tokio::test]
async fn two_rate_limits_then_success_backs_off_2s_then_4s() {
    let backend = ScriptedBackend::new(vec![
        rate_limited(),
        rate_limited(),
        image_reply("image/png", "iVBORw0KGgo="),
    ]);
    let sleeper = RecordingSleeper::default();

    let payload = client(&backend, &sleeper, Some("key"))
        .generate("fox", AspectRatio::Square)
        .await
        .unwrap();

    assert_eq!(payload.data, "iVBORw0KGgo=");
    assert_eq!(backend.calls().len(), 3);
    assert_eq!(
        sleeper.waits(),
        vec![Duration::from_millis(2000), Duration::from_millis(4000)]
    );
}

#[tokio::test]
async fn persistent_rate_limit_gives_up_after_three_attempts() {
    let backend = ScriptedBackend::new(vec![
        rate_limited(),
        rate_limited(),
        rate_limited(),
        image_reply("image/png", "never-reached"),
    ]);
    let sleeper = RecordingSleeper::default();

    let err = client(&backend, &sleeper, Some("key"))
        .generate("fox", AspectRatio::Square)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::RateLimited);
    assert_eq!(err.attempts, 3);
    assert_eq!(err.user_message, ErrorKind::RateLimited.user_message());
    assert_eq!(backend.calls().len(), 3);
    assert_eq!(sleeper.waits().len(), 2);
}

#[tokio::test]
async fn invalid_key_is_not_retried() {
    let backend = ScriptedBackend::new(vec![
        Err(RemoteError::http(
            400,
            r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#,
        )),
        image_reply("image/png", "never-reached"),
    ]);
    let sleeper = RecordingSleeper::default();

    let err = client(&backend, &sleeper, Some("bad"))
        .generate("fox", AspectRatio::Square)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::InvalidCredential);
    assert_eq!(err.attempts, 1);
    assert_eq!(err.to_string(), ErrorKind::InvalidCredential.user_message());
    assert_eq!(backend.calls().len(), 1);
    assert!(sleeper.waits().is_empty());
}

#[tokio::test]
async fn missing_key_fails_before_any_call() {
    let backend = ScriptedBackend::new(vec![image_reply("image/png", "AAAA")]);
    let sleeper = RecordingSleeper::default();

    for key in [None, Some("   ")] {
        let err = client(&backend, &sleeper, key)
            .generate("fox", AspectRatio::Square)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredential);
        assert_eq!(err.attempts, 0);
    }
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn permission_and_safety_errors_stop_immediately() {
    let cases = vec![
        (
            Err(RemoteError::http(403, r#"{"error":{"status":"PERMISSION_DENIED","message":"denied"}}"#)),
            ErrorKind::PermissionDenied,
        ),
        (Ok(GenerateContentResponse::blocked("SAFETY")), ErrorKind::SafetyBlocked),
        (
            Ok(GenerateContentResponse::from_parts(vec![Part::text("I can't draw that")])),
            ErrorKind::EmptyResult,
        ),
        (Ok(GenerateContentResponse::default()), ErrorKind::EmptyResult),
        (
            Err(RemoteError::http(500, r#"{"error":{"code":500,"message":"Internal error"}}"#)),
            ErrorKind::Service("Internal error".to_string()),
        ),
        (Err(RemoteError::transport("connection refused")), ErrorKind::Unknown),
    ];

    for (reply, expected) in cases {
        let backend = ScriptedBackend::new(vec![reply, image_reply("image/png", "never-reached")]);
        let sleeper = RecordingSleeper::default();

        let err = client(&backend, &sleeper, Some("key"))
            .generate("fox", AspectRatio::Square)
            .await
            .unwrap_err();

        assert_eq!(err.kind, expected);
        assert_eq!(err.attempts, 1);
        assert_eq!(backend.calls().len(), 1);
        assert!(sleeper.waits().is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn default_sleeper_waits_on_the_tokio_clock() {
    let backend = ScriptedBackend::new(vec![rate_limited(), image_reply("image/png", "AAAA")]);
    let client = GenerationClient::new(backend.clone(), Some("key".to_string()), RetryPolicy::default());

    let started = tokio::time::Instant::now();
    client.generate("fox", AspectRatio::Square).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert_eq!(backend.calls().len(), 2);
}
