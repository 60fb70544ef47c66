mod rate_limit;

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{ConnectInfo, Json, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use console_agents::ConsoleAgent;
use console_core::{
    components_for, ChatInput, ClassificationResult, IntentCategory, IntentClassifier,
    IntentDescriptor, PatternRuleSpec, PatternTable, TracingAuditSink,
};
use console_observability::{spawn_audit_forwarder, AppMetrics, ChannelAuditSink};
use console_tools::FixtureDataSource;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::rate_limit::{ClientRateLimiter, RateDecision};

const MAX_BODY_BYTES: usize = 16 * 1024;
const DEFAULT_API_KEY: &str = "dev-console-key";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    pub allowed_origins: Vec<String>,
    pub extra_patterns: Option<String>,
    /// Key the rate limiter on `x-forwarded-for` instead of the peer address.
    /// Only safe behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("CONSOLE_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.to_string()),
            rate_limit_window: Duration::from_secs(
                env::var("CONSOLE_RATE_LIMIT_WINDOW_SECONDS")
                    .ok()
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(60),
            ),
            rate_limit_max: env::var("CONSOLE_RATE_LIMIT_MAX")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(120),
            allowed_origins: parse_allowed_origins(),
            extra_patterns: env::var("CONSOLE_EXTRA_PATTERNS")
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            trust_forwarded_for: env::var("CONSOLE_TRUST_PROXY")
                .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<ConsoleAgent>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: String,
    pub limiter: ClientRateLimiter,
    pub allowed_origins: Arc<Vec<String>>,
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: console_observability::MetricsSnapshot,
}

#[derive(Debug, Deserialize)]
struct ClassifyRequest {
    query: String,
}

#[derive(Debug, Deserialize)]
struct AuthorizeRequest {
    component: String,
    category: String,
}

#[derive(Debug, Serialize)]
struct AuthorizeResponse {
    component: String,
    category: IntentCategory,
    allowed: bool,
    allowed_components: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    text: String,
    session_id: Option<String>,
}

pub async fn build_app() -> Result<Router> {
    build_app_with(ApiConfig::from_env()).await
}

/// Must run inside a tokio runtime: audit events are drained by a spawned task.
pub async fn build_app_with(config: ApiConfig) -> Result<Router> {
    let metrics = AppMetrics::shared();

    let mut patterns = PatternTable::builtin();
    if let Some(path) = config.extra_patterns.as_deref() {
        let specs = PatternRuleSpec::load_file(path)?;
        patterns = patterns
            .with_rules(specs)
            .with_context(|| format!("invalid pattern rules in {path}"))?;
        tracing::info!(path = %path, rules = patterns.rule_count(), "loaded extra intent patterns");
    }

    let (audit, audit_rx) = ChannelAuditSink::new();
    spawn_audit_forwarder(audit_rx, Arc::new(TracingAuditSink));

    let classifier = Arc::new(IntentClassifier::new(patterns, Arc::new(audit)));
    let agent = Arc::new(ConsoleAgent::new(
        classifier,
        Arc::new(FixtureDataSource::default()),
        metrics.clone(),
    ));

    let state = ApiState {
        agent,
        metrics,
        api_key: config.api_key,
        limiter: ClientRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
        allowed_origins: Arc::new(config.allowed_origins),
        trust_forwarded_for: config.trust_forwarded_for,
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/intents", get(intents))
        .route("/v1/classify", post(classify))
        .route("/v1/authorize", post(authorize))
        .route("/v1/chat", post(chat))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(security_headers_middleware))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn intents(State(state): State<ApiState>) -> Json<Vec<IntentDescriptor>> {
    Json(state.agent.catalog())
}

async fn classify(
    State(state): State<ApiState>,
    Json(request): Json<ClassifyRequest>,
) -> Json<ClassificationResult> {
    Json(state.agent.classify(&request.query))
}

async fn authorize(
    State(state): State<ApiState>,
    Json(request): Json<AuthorizeRequest>,
) -> Response {
    let category = match request.category.parse::<IntentCategory>() {
        Ok(category) => category,
        Err(err) => {
            return error_response(StatusCode::BAD_REQUEST, "invalid_category", &err.to_string())
        }
    };

    let allowed = state.agent.is_component_allowed(&request.component, category);
    Json(AuthorizeResponse {
        component: request.component,
        category,
        allowed,
        allowed_components: components_for(category)
            .iter()
            .map(ToString::to_string)
            .collect(),
    })
    .into_response()
}

async fn chat(State(state): State<ApiState>, Json(request): Json<ChatRequest>) -> Response {
    let input = ChatInput {
        session_id: request.session_id,
        text: request.text,
    };

    match state.agent.handle_chat(input) {
        Ok(reply) => Json(reply).into_response(),
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "chat failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "chat_failed",
                "the console could not answer this request",
            )
        }
    }
}

fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "message": message,
        })),
    )
        .into_response()
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid x-api-key",
        );
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let ip = request_ip(&request, state.trust_forwarded_for);
    if let RateDecision::Limited { retry_after } = state.limiter.check(&ip) {
        tracing::warn!(
            client = %ip,
            tracked_clients = state.limiter.tracked_clients(),
            "rate limit exceeded"
        );
        let mut response = error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded for this client",
        );
        if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    next.run(request).await
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("content-security-policy"),
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'; base-uri 'none'"),
    );

    response
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:3000")]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-api-key"),
        ])
}

fn parse_allowed_origins() -> Vec<String> {
    let default_origins = [
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ];

    env::var("CONSOLE_ALLOWED_ORIGINS")
        .ok()
        .map(|value| {
            value
                .split(',')
                .map(|origin| origin.trim().trim_end_matches('/').to_string())
                .filter(|origin| !origin.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_else(|| default_origins.iter().map(ToString::to_string).collect())
}

fn is_public_endpoint(path: &str) -> bool {
    matches!(path, "/health" | "/v1/intents")
}

fn request_ip(request: &Request<Body>, trust_forwarded_for: bool) -> String {
    let forwarded = trust_forwarded_for
        .then(|| {
            request
                .headers()
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
        .flatten();

    forwarded
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "local".to_string())
}
