//! HTTP surface tests driven through the router with `oneshot`.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{sample_dataset, supervisor, ScriptedModel, TOKENS_PER_CALL};
use insightflow::api::{create_router, AppState};
use insightflow::{AgentRole, AppConfig, SupervisorConfig, TokenBudgetTracker};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(model: Arc<ScriptedModel>, tracker: TokenBudgetTracker) -> Router {
    let supervisor = Arc::new(supervisor(model, tracker, SupervisorConfig::default()));
    create_router(AppState::new(supervisor, "test-server"))
}

fn analyze_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/analysis/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn analyze_body() -> Value {
    json!({"query": "summarize", "dataset": sample_dataset()})
}

#[tokio::test]
async fn health_reports_name_and_version() {
    let app = app(Arc::new(ScriptedModel::passing()), TokenBudgetTracker::new(10_000));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["name"], "test-server");
    assert_eq!(body["version"], insightflow::VERSION);
}

#[tokio::test]
async fn analyze_returns_merged_result() {
    let app = app(Arc::new(ScriptedModel::passing()), TokenBudgetTracker::new(10_000));

    let response = app.oneshot(analyze_request(&analyze_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    assert!(body["analysis"]["summary_statistics"]["a"].is_object());
    assert_eq!(body["visualizations"]["plots"].as_array().unwrap().len(), 2);
    assert_eq!(body["narrative"]["executive_summary"], "x is the dominant category.");
    assert_eq!(body["qa_review"]["passes"], true);
    assert_eq!(body["warnings"], json!([]));
    assert_eq!(body["token_usage"]["current_usage"], 4 * TOKENS_PER_CALL);
    assert_eq!(body["token_usage"]["daily_limit"], 10_000);
    assert_eq!(body["stages"].as_array().unwrap().last().unwrap(), "done");
}

#[tokio::test]
async fn analyze_rejects_over_budget_with_429() {
    let model = Arc::new(ScriptedModel::passing());
    let tracker = TokenBudgetTracker::new(100);
    tracker.record("earlier", 100);
    let app = app(model.clone(), tracker);

    let response = app.oneshot(analyze_request(&analyze_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let body = json_body(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "quota_exceeded");
    assert_eq!(body["code"], "QUOTA_EXCEEDED");
    assert!(body.get("stage").is_none());
    assert_eq!(model.total_calls(), 0);
}

#[tokio::test]
async fn analyze_rejects_malformed_body_with_422() {
    let app = app(Arc::new(ScriptedModel::passing()), TokenBudgetTracker::new(10_000));

    let response = app
        .oneshot(analyze_request(&json!({"query": "summarize"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(response).await;
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn analyze_rejects_blank_query() {
    let model = Arc::new(ScriptedModel::passing());
    let app = app(model.clone(), TokenBudgetTracker::new(10_000));

    let response = app
        .oneshot(analyze_request(&json!({"query": "   ", "dataset": sample_dataset()})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(model.total_calls(), 0);
}

#[tokio::test]
async fn empty_dataset_is_a_bad_request() {
    let app = app(Arc::new(ScriptedModel::passing()), TokenBudgetTracker::new(10_000));

    let response = app
        .oneshot(analyze_request(&json!({"query": "summarize", "dataset": {"data": []}})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"], "analysis_error");
    assert_eq!(body["stage"], "analyzing");
}

#[tokio::test]
async fn upstream_failure_is_a_bad_gateway() {
    let model = Arc::new(ScriptedModel::passing().fail(AgentRole::Visualizer, "upstream down"));
    let app = app(model, TokenBudgetTracker::new(10_000));

    let response = app.oneshot(analyze_request(&analyze_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = json_body(response).await;
    assert_eq!(body["error"], "upstream_error");
    assert_eq!(body["stage"], "visualizing");
}

#[tokio::test]
async fn token_usage_reflects_completed_runs() {
    let tracker = TokenBudgetTracker::new(10_000);
    let app = app(Arc::new(ScriptedModel::passing()), tracker);

    let response = app
        .clone()
        .oneshot(analyze_request(&analyze_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/analysis/token-usage")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["current_usage"], 4 * TOKENS_PER_CALL);
    assert_eq!(body["daily_limit"], 10_000);
    assert_eq!(body["remaining_tokens"], 10_000 - 4 * TOKENS_PER_CALL);
    assert_eq!(body["usage_by_category"]["narrator"], TOKENS_PER_CALL);
    assert!(body["window_start"].is_string());
}

#[test]
fn sample_config_file_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../config/insightflow.toml");
    let config = AppConfig::from_file(path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.budget.daily_limit, 10_000);
    assert_eq!(config.agent_config(AgentRole::Narrator).model_id, "gpt-4-turbo-preview");
}
