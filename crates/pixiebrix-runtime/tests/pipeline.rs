//! Pipelines defined as JSON, run across realms over the in-process host.

use std::sync::Arc;

use async_trait::async_trait;
use pixiebrix_core::BrickRegistry;
use pixiebrix_messenger::{LocalHost, Realm, RealmOptions, RetryConfig};
use pixiebrix_protocols::{
    Brick, BrickDefinition, BrickError, BrickKind, BrickOptions, ContextKind, Endpoint, PageContext,
};
use pixiebrix_runtime::{
    BrickRunner, Pipeline, PipelineExecutor, RunState, StepStatus, StepTarget, TracingLogger,
    register_brick_runner,
};
use serde_json::{Value, json};

/// Upper-cases `text` and reports where it ran.
struct Shout {
    definition: BrickDefinition,
}

impl Shout {
    fn new() -> Arc<dyn Brick> {
        Arc::new(Self {
            definition: BrickDefinition::new("@test/shout", "Shout", BrickKind::Transformer)
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                })),
        })
    }
}

#[async_trait]
impl Brick for Shout {
    fn definition(&self) -> &BrickDefinition {
        &self.definition
    }

    async fn run(&self, input: Value, options: BrickOptions) -> Result<Value, BrickError> {
        let text = input["text"].as_str().unwrap_or_default();
        Ok(json!({
            "text": text.to_uppercase(),
            "ranIn": options.page.endpoint.to_string(),
        }))
    }
}

fn realm(host: &Arc<LocalHost>, kind: ContextKind, endpoint: Endpoint) -> Arc<Realm> {
    let options = RealmOptions::new(kind, endpoint).with_retry(RetryConfig::none());
    Realm::new(options, host.clone(), host.clone()).unwrap()
}

fn serve_bricks(realm: &Realm) -> Arc<BrickRunner> {
    let registry = BrickRegistry::new();
    registry.register(Shout::new()).unwrap();
    let runner = Arc::new(BrickRunner::new(
        Arc::new(registry),
        Arc::new(TracingLogger),
        PageContext::new(realm.endpoint().clone()),
    ));
    register_brick_runner(realm, runner.clone()).unwrap();
    runner
}

#[test]
fn test_step_target_wire_names() {
    let targets: Vec<StepTarget> =
        serde_json::from_value(json!(["self", "top", {"frame": 3}, "broadcast", "background", {"page": "sidebar"}]))
            .unwrap();
    assert_eq!(
        targets,
        vec![
            StepTarget::This,
            StepTarget::Top,
            StepTarget::Frame(3),
            StepTarget::Broadcast,
            StepTarget::Background,
            StepTarget::Page("sidebar".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_json_pipeline_hops_between_contexts() {
    let host = LocalHost::new();
    host.open_frame(7, 0, Some("https://example.com"));
    host.open_page("sidebar");

    let content = realm(&host, ContextKind::ContentScript, Endpoint::frame(7, 0));
    let background = realm(&host, ContextKind::Background, Endpoint::Background);
    let sidebar = realm(&host, ContextKind::Sidebar, Endpoint::page("sidebar"));

    let runner = serve_bricks(&content);
    serve_bricks(&background);
    serve_bricks(&sidebar);
    for realm in [&content, &background, &sidebar] {
        realm.start();
    }

    let pipeline: Pipeline = serde_json::from_value(json!([
        {
            "id": "@test/shout",
            "config": {"text": {"__type__": "var", "__value__": "@input.greeting"}},
            "outputKey": "local"
        },
        {
            "id": "@test/shout",
            "window": "background",
            "config": {"text": {"__type__": "mustache", "__value__": "{{ @local.text }} again"}},
            "outputKey": "remote",
            "label": "Shout in the background"
        },
        {
            "id": "@test/shout",
            "window": {"page": "sidebar"},
            "if": {"__type__": "var", "__value__": "@options.toSidebar"},
            "config": {"text": {"__type__": "var", "__value__": "@remote.text"}},
            "outputKey": "panel"
        }
    ]))
    .unwrap();

    let executor = PipelineExecutor::new(content.clone(), runner, Arc::new(TracingLogger));
    let run = executor.prepare();
    let states = run.subscribe();

    let summary = executor
        .execute(&run, &pipeline, json!({"greeting": "hi"}), json!({"toSidebar": true}), None)
        .await
        .unwrap();

    assert_eq!(summary.context["@local"], json!({"text": "HI", "ranIn": "tab 7 frame 0"}));
    assert_eq!(summary.context["@remote"], json!({"text": "HI AGAIN", "ranIn": "background"}));
    assert_eq!(summary.output, json!({"text": "HI AGAIN", "ranIn": "page sidebar"}));
    assert_eq!(summary.steps[1].label.as_deref(), Some("Shout in the background"));
    assert!(summary.steps.iter().all(|step| step.status == StepStatus::Succeeded));
    assert!(matches!(&*states.borrow(), RunState::Succeeded { output } if *output == summary.output));
}

#[tokio::test]
async fn test_remote_validation_error_names_the_brick() {
    let host = LocalHost::new();
    host.open_frame(7, 0, None);
    let content = realm(&host, ContextKind::ContentScript, Endpoint::frame(7, 0));
    let background = realm(&host, ContextKind::Background, Endpoint::Background);
    let runner = serve_bricks(&content);
    serve_bricks(&background);
    content.start();
    background.start();

    let pipeline: Pipeline = serde_json::from_value(json!([
        {"id": "@test/shout", "window": "background", "config": {"text": 42}}
    ]))
    .unwrap();

    let executor = PipelineExecutor::new(content, runner, Arc::new(TracingLogger));
    let err = executor.run(&pipeline, json!({}), json!({})).await.unwrap_err();

    assert_eq!(err.step_index(), Some(0));
    match err {
        pixiebrix_protocols::PipelineError::StepFailed {
            source: BrickError::Validation { block_id, message, .. },
            ..
        } => {
            assert_eq!(block_id, "@test/shout");
            assert!(message.contains("/text"), "{}", message);
        }
        other => panic!("Expected a ValidationError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_closed_page_is_a_step_failure() {
    let host = LocalHost::new();
    host.open_frame(7, 0, None);
    let content = realm(&host, ContextKind::ContentScript, Endpoint::frame(7, 0));
    let runner = serve_bricks(&content);
    content.start();

    let pipeline: Pipeline = serde_json::from_value(json!([
        {"id": "@test/shout", "window": {"page": "devtools"}, "config": {"text": "x"}}
    ]))
    .unwrap();

    let executor = PipelineExecutor::new(content, runner, Arc::new(TracingLogger));
    let err = executor.run(&pipeline, json!({}), json!({})).await.unwrap_err();
    assert!(matches!(
        err,
        pixiebrix_protocols::PipelineError::StepFailed {
            source: BrickError::Messenger(pixiebrix_protocols::MessengerError::TargetNotFound(_)),
            ..
        }
    ));
}
