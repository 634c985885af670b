//! Edge-case tests for the normalization → validation pipeline

use analyst_relay::error::{RelayError, Result};
use analyst_relay::normalize::normalize;
use analyst_relay::pipeline::GenerationPipeline;
use analyst_relay::prompts::{PromptInputs, TaskKind};
use analyst_relay::provider::{CompletionProvider, FakeCompletionProvider};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

fn pipeline_with(response: &str) -> GenerationPipeline {
    GenerationPipeline::new(Arc::new(FakeCompletionProvider::with_response(response)))
}

fn document_inputs() -> PromptInputs {
    PromptInputs::new().with("requirements", "An inventory tracking app")
}

struct FailingProvider;

#[async_trait]
impl CompletionProvider for FailingProvider {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(RelayError::Provider {
            message: "connection refused".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

struct CountingProvider {
    calls: AtomicU32,
}

#[async_trait]
impl CompletionProvider for CountingProvider {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("{}".to_string())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

#[tokio::test]
async fn fenced_document_set_validates() {
    let raw = "```json\n{\"srs\":\"A\",\"frd\":\"B\",\"brd\":\"C\",\"umlDiagrams\":[]}\n```";
    let doc = pipeline_with(raw)
        .run(TaskKind::DocumentSet, &document_inputs())
        .await
        .unwrap();
    assert_eq!(doc.value["srs"], "A");
    assert_eq!(doc.value["umlDiagrams"], serde_json::json!([]));
}

#[tokio::test]
async fn tagged_prose_with_missing_keys_is_shape_mismatch() {
    // Tags and prose strip cleanly, parse succeeds, but frd/brd/umlDiagrams
    // are absent; the first missing key is reported.
    let raw = "Sure! <answer>{\"srs\":\"A\"}</answer>";
    let err = pipeline_with(raw)
        .run(TaskKind::DocumentSet, &document_inputs())
        .await
        .unwrap_err();
    match err {
        RelayError::ShapeMismatch { key, .. } => assert_eq!(key, "frd"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn braceless_completion_is_malformed_json() {
    let raw = "I am sorry, I cannot produce documents today.";
    let err = pipeline_with(raw)
        .run(TaskKind::DocumentSet, &document_inputs())
        .await
        .unwrap_err();
    match err {
        RelayError::MalformedJson { raw: offending, .. } => {
            assert_eq!(offending, raw);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn embedded_object_equals_direct_parse() {
    let embedded = r#"{"srs":"A","frd":"B","brd":"C","umlDiagrams":[{"name":"n","content":"c"}]}"#;
    let wrapped = format!("Of course! Here is the document:\n```json\n{embedded}\n```\nAnything else?");
    let doc = pipeline_with(&wrapped)
        .run(TaskKind::DocumentSet, &document_inputs())
        .await
        .unwrap();
    let direct: Value = serde_json::from_str(embedded).unwrap();
    assert_eq!(doc.value, direct);
}

#[tokio::test]
async fn bare_and_wrapped_task_arrays_both_accepted() {
    let bare = r#"[{"id":1,"name":"Build","description":"d","estimatedHours":8,"requiredSkills":["Rust"]}]"#;
    let wrapped = format!(r#"{{"tasks":{bare}}}"#);
    let inputs = PromptInputs::new().with("functionalRequirements", "track inventory");

    let from_bare = pipeline_with(bare)
        .run(TaskKind::TaskBreakdown, &inputs)
        .await
        .unwrap();
    let from_wrapped = pipeline_with(&wrapped)
        .run(TaskKind::TaskBreakdown, &inputs)
        .await
        .unwrap();
    assert_eq!(from_bare.value, from_wrapped.value);
}

#[tokio::test]
async fn assignment_accepts_assignments_wrapper() {
    let wrapped = r#"{"assignments":[{"id":1,"name":"Build","assignedTo":"Ada","confidence":95}]}"#;
    let inputs = PromptInputs::new()
        .with("tasks", "[]")
        .with("teamMembers", "[]");
    let doc = pipeline_with(wrapped)
        .run(TaskKind::TaskAssignment, &inputs)
        .await
        .unwrap();
    assert_eq!(doc.value[0]["assignedTo"], "Ada");
}

#[tokio::test]
async fn provider_failure_propagates_unretried_by_pipeline() {
    let pipeline = GenerationPipeline::new(Arc::new(FailingProvider));
    let err = pipeline
        .run(TaskKind::DocumentSet, &document_inputs())
        .await
        .unwrap_err();
    match err {
        RelayError::Provider { message } => assert!(message.contains("connection refused")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_input_short_circuits_before_provider_call() {
    let provider = Arc::new(CountingProvider {
        calls: AtomicU32::new(0),
    });
    let pipeline = GenerationPipeline::new(provider.clone());
    let err = pipeline
        .run(TaskKind::DocumentSet, &PromptInputs::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::MissingInput { .. }));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fake_provider_round_trips_every_task_kind() {
    let pipeline = GenerationPipeline::new(Arc::new(FakeCompletionProvider::new()));

    let doc = pipeline
        .run(TaskKind::DocumentSet, &document_inputs())
        .await
        .unwrap();
    assert!(doc.value["srs"].is_string());

    let doc = pipeline
        .run(
            TaskKind::Research,
            &PromptInputs::new().with("requirements", "inventory app"),
        )
        .await
        .unwrap();
    assert!(doc.value["swotAnalysis"].is_object());

    let doc = pipeline
        .run(
            TaskKind::TaskBreakdown,
            &PromptInputs::new().with("functionalRequirements", "track stock"),
        )
        .await
        .unwrap();
    assert!(doc.value.is_array());

    let doc = pipeline
        .run(
            TaskKind::TaskAssignment,
            &PromptInputs::new()
                .with("tasks", "[]")
                .with("teamMembers", "[]"),
        )
        .await
        .unwrap();
    let confidence = doc.value[0]["confidence"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&confidence));
}

#[test]
fn normalize_then_normalize_is_normalize() {
    let raw = "```json\n{\"a\":1}\n```";
    let once = normalize(raw);
    assert_eq!(normalize(&once), once);
}
