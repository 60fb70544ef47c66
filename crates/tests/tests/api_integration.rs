use std::io::Write as _;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use console_api::{build_app, build_app_with, ApiConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "dev-console-key";

fn config() -> ApiConfig {
    ApiConfig {
        api_key: API_KEY.to_string(),
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max: 100,
        allowed_origins: vec!["http://localhost:3000".to_string()],
        extra_patterns: None,
        trust_forwarded_for: false,
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, parsed)
}

#[tokio::test]
async fn health_is_public() {
    let app = build_app().await.expect("app should build");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn classify_requires_api_key() {
    let app = build_app_with(config()).await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/v1/classify")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "query": "Show recent deployments" }).to_string()))
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn classify_returns_audit_fields() {
    let app = build_app_with(config()).await.unwrap();

    let (status, body) = send(
        app,
        post_json("/v1/classify", json!({ "query": "  SHOW FAILED DEPLOYMENTS  " })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detectedIntent"], "DEPLOYMENT_FAILURES");
    assert_eq!(body["confidence"], "high");
    assert_eq!(body["allowedComponents"], json!(["DeploymentTable", "ActionPanel"]));
    assert!(body["matchedPattern"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn classify_unmatched_query_falls_back() {
    let app = build_app_with(config()).await.unwrap();

    let (status, body) = send(
        app,
        post_json("/v1/classify", json!({ "query": "book a meeting" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detectedIntent"], "UNSUPPORTED");
    assert!(body["matchedPattern"].is_null());
    assert_eq!(body["allowedComponents"], json!(["FallbackIntent"]));
}

#[tokio::test]
async fn authorize_enforces_policy() {
    let app = build_app_with(config()).await.unwrap();

    let (status, body) = send(
        app.clone(),
        post_json(
            "/v1/authorize",
            json!({ "component": "ApprovalQueue", "category": "DEPLOYMENT_MONITORING" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);
    assert_eq!(body["allowed_components"], json!(["DeploymentTable"]));

    let (status, body) = send(
        app,
        post_json(
            "/v1/authorize",
            json!({ "component": "DeploymentTable", "category": "DEPLOYMENT_MONITORING" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn authorize_rejects_unknown_category() {
    let app = build_app_with(config()).await.unwrap();

    let (status, body) = send(
        app,
        post_json(
            "/v1/authorize",
            json!({ "component": "DeploymentTable", "category": "BILLING" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_category");
}

#[tokio::test]
async fn chat_renders_only_authorized_blocks() {
    let app = build_app_with(config()).await.unwrap();

    let (status, body) = send(
        app,
        post_json("/v1/chat", json!({ "text": "What needs my approval?" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["classification"]["detectedIntent"], "OPERATIONAL_APPROVALS");
    assert_eq!(body["tool"], "getPendingApprovals");
    let blocks = body["blocks"].as_array().unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0]["component"], "ApprovalQueue");
    assert!(body["session_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn intents_catalog_lists_every_category() {
    let app = build_app_with(config()).await.unwrap();

    let (status, body) = send(
        app,
        Request::builder()
            .uri("/v1/intents")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let categories = body
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["category"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        categories,
        vec![
            "DEPLOYMENT_MONITORING",
            "DEPLOYMENT_FAILURES",
            "OPERATIONAL_APPROVALS",
            "SYSTEM_HEALTH",
            "UNSUPPORTED"
        ]
    );
}

#[tokio::test]
async fn rate_limit_returns_retry_after() {
    let app = build_app_with(ApiConfig {
        rate_limit_max: 1,
        ..config()
    })
    .await
    .unwrap();

    let first = app
        .clone()
        .oneshot(post_json("/v1/classify", json!({ "query": "uptime" })))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(post_json("/v1/classify", json!({ "query": "uptime" })))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key("retry-after"));
}

fn classify_from(forwarded_for: &str) -> Request<Body> {
    let mut request = post_json("/v1/classify", json!({ "query": "uptime" }));
    request
        .headers_mut()
        .insert("x-forwarded-for", forwarded_for.parse().unwrap());
    request
}

#[tokio::test]
async fn rotating_forwarded_for_does_not_bypass_rate_limit() {
    let app = build_app_with(ApiConfig {
        rate_limit_max: 1,
        ..config()
    })
    .await
    .unwrap();

    let mut statuses = Vec::new();
    for n in 1..=5 {
        let response = app
            .clone()
            .oneshot(classify_from(&format!("203.0.113.{n}")))
            .await
            .unwrap();
        statuses.push(response.status());
    }

    assert_eq!(statuses[0], StatusCode::OK);
    assert!(statuses[1..]
        .iter()
        .all(|status| *status == StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn trusted_proxy_limits_per_forwarded_client() {
    let app = build_app_with(ApiConfig {
        rate_limit_max: 1,
        trust_forwarded_for: true,
        ..config()
    })
    .await
    .unwrap();

    let first = app.clone().oneshot(classify_from("203.0.113.1")).await.unwrap();
    let other = app.clone().oneshot(classify_from("203.0.113.2")).await.unwrap();
    let repeat = app.oneshot(classify_from("203.0.113.1")).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(other.status(), StatusCode::OK);
    assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn rejected_requests_carry_security_headers() {
    let app = build_app_with(ApiConfig {
        rate_limit_max: 1,
        ..config()
    })
    .await
    .unwrap();

    let unauthorized = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/classify")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "query": "uptime" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        unauthorized.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(unauthorized.headers().contains_key("content-security-policy"));

    let _ = app
        .clone()
        .oneshot(post_json("/v1/classify", json!({ "query": "uptime" })))
        .await
        .unwrap();
    let limited = app
        .oneshot(post_json("/v1/classify", json!({ "query": "uptime" })))
        .await
        .unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        limited.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn extra_patterns_extend_classification() {
    let path = std::env::temp_dir().join(format!("console-patterns-{}.json", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        "{}",
        json!([{ "category": "SYSTEM_HEALTH", "pattern": r"\bpager\b" }])
    )
    .unwrap();
    drop(file);

    let app = build_app_with(ApiConfig {
        extra_patterns: Some(path.display().to_string()),
        ..config()
    })
    .await
    .unwrap();

    let (status, body) = send(
        app,
        post_json("/v1/classify", json!({ "query": "who is on pager today" })),
    )
    .await;
    std::fs::remove_file(&path).ok();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detectedIntent"], "SYSTEM_HEALTH");
    assert_eq!(body["matchedPattern"], r"\bpager\b");
}

#[tokio::test]
async fn invalid_pattern_file_fails_startup() {
    let result = build_app_with(ApiConfig {
        extra_patterns: Some("/nonexistent/console-patterns.json".to_string()),
        ..config()
    })
    .await;

    assert!(result.is_err());
}
