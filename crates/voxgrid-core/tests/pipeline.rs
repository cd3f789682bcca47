//! Integration test: the remote snippet pipeline end to end.
//!
//! A local axum server stands in for the workflow webhook. Verifies that:
//! 1. A successful response becomes a registered, placed and persisted widget.
//! 2. HTTP 500 yields `NonSuccessStatus`, no registry entry and an idle gate.
//! 3. A body without `output` yields `MissingOutputField`.
//! 4. The query string carries transcription, confidence and timestamp.

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use voxgrid_core::{
    CoreConfig, Dashboard, FetchError, MemorySlotStore, PersistenceBridge, PipelineError,
    RemoteConfig, SnippetRequest, SnippetSource, ToastQueue, WebhookSnippetSource,
};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn source_for(base_url: String) -> WebhookSnippetSource {
    WebhookSnippetSource::new(&RemoteConfig {
        base_url,
        webhook_id: "voice-widget".into(),
        timeout_secs: 5,
        ..RemoteConfig::default()
    })
}

fn dashboard(store: Arc<MemorySlotStore>) -> (Dashboard, ToastQueue) {
    let toasts = ToastQueue::new();
    let dash = Dashboard::new(CoreConfig::default(), store, Arc::new(toasts.clone()));
    (dash, toasts)
}

#[tokio::test]
async fn successful_fetch_installs_widget() {
    let app = Router::new().route(
        "/voice-widget",
        get(|| async {
            Json(json!({
                "output": "export default function ClockWidget() { return <span className=\"clock\">12:00</span>; }"
            }))
        }),
    );
    let source = source_for(serve(app).await);
    let store = Arc::new(MemorySlotStore::new());
    let (mut dash, toasts) = dashboard(store.clone());

    let id = dash
        .process_transcription(&source, "show me a clock", 0.92)
        .await
        .unwrap();

    assert!(!dash.is_processing());
    assert_eq!(dash.registry().len(), 1);
    let cell = dash.layout().cell(&id).unwrap();
    assert_eq!((cell.x, cell.y, cell.width, cell.height), (0, 0, 4, 4));
    let content = dash.layout().render_content(&id).unwrap();
    assert_eq!(content.text_content(), "12:00");
    assert_eq!(content.attr("class"), Some("clock"));

    let persisted = PersistenceBridge::new(store, "dashboard-widgets").load();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].id, id);

    let titles: Vec<_> = toasts.drain().into_iter().map(|t| t.title).collect();
    assert_eq!(
        titles,
        vec!["Processing Your Request", "Widget Code Received", "Widget Created"]
    );
}

#[tokio::test]
async fn http_500_leaves_dashboard_untouched() {
    let app = Router::new().route(
        "/voice-widget",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let source = source_for(serve(app).await);
    let (mut dash, toasts) = dashboard(Arc::new(MemorySlotStore::new()));

    let err = dash
        .process_transcription(&source, "weather please", 0.8)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Fetch(FetchError::NonSuccessStatus(500))
    ));
    assert!(dash.registry().is_empty());
    assert!(dash.layout().is_empty());
    assert!(!dash.is_processing());
    let last = toasts.drain().pop().unwrap();
    assert_eq!(last.title, "Processing Failed");
    assert!(last.is_destructive());
}

#[tokio::test]
async fn body_without_output_is_missing_output() {
    let app = Router::new().route(
        "/voice-widget",
        get(|| async { Json(json!({ "message": "Workflow was started" })) }),
    );
    let source = source_for(serve(app).await);
    let err = source
        .fetch(&SnippetRequest::new("anything", 0.9))
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::MissingOutputField);
}

#[tokio::test]
async fn query_parameters_reach_the_webhook() {
    let app = Router::new().route(
        "/voice-widget",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            let snippet = format!(
                "const EchoWidget = () => render('{}|{}|{}')",
                params.get("transcription").cloned().unwrap_or_default(),
                params.get("confidence").cloned().unwrap_or_default(),
                params.contains_key("timestamp"),
            );
            Json(json!({ "output": snippet }))
        }),
    );
    let source = source_for(serve(app).await);
    let (mut dash, _) = dashboard(Arc::new(MemorySlotStore::new()));

    let id = dash
        .process_transcription(&source, "stock price", 0.75)
        .await
        .unwrap();
    assert_eq!(
        dash.layout().render_content(&id).unwrap().text_content(),
        "stock price|0.75|true"
    );
}

#[tokio::test]
async fn manual_fetch_sends_configured_prompt() {
    let app = Router::new().route(
        "/voice-widget",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            let prompt = params.get("transcription").cloned().unwrap_or_default();
            Json(json!({ "output": format!("const PromptWidget = () => text('{}')", prompt) }))
        }),
    );
    let source = source_for(serve(app).await);
    let (mut dash, _) = dashboard(Arc::new(MemorySlotStore::new()));

    let id = dash.manual_fetch(&source).await.unwrap();
    assert_eq!(
        dash.layout().render_content(&id).unwrap().text_content(),
        "Create a widget"
    );
}

#[tokio::test]
async fn unreachable_endpoint_is_network_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let source = source_for(format!("http://{}", addr));
    let (mut dash, _) = dashboard(Arc::new(MemorySlotStore::new()));

    let err = dash.process_transcription(&source, "x", 0.9).await.unwrap_err();
    assert!(matches!(err, PipelineError::Fetch(FetchError::NetworkFailure(_))));
    assert!(!dash.is_processing());
}
