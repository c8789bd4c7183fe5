pub mod config;
pub mod handlers;
pub mod middleware;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::services::TokenVerifier;

#[derive(Clone)]
pub struct AppState {
    pub config: GatewayConfig,
    pub verifier: Arc<TokenVerifier>,
    pub http: reqwest::Client,
}

/// Translate the configured origin list into an `AllowOrigin`. A `*`
/// entry means any origin; `AllowOrigin::list` refuses the wildcard
/// value, so it must be mapped explicitly.
fn allowed_origins(origins: &[String]) -> AllowOrigin {
    if origins.iter().any(|o| o == "*") {
        return AllowOrigin::any();
    }
    AllowOrigin::list(origins.iter().filter_map(|o| match o.parse::<HeaderValue>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(origin = %o, error = %e, "Skipping invalid CORS origin");
            None
        }
    }))
}

pub fn build_router(state: AppState) -> Router {
    let cors_origins = allowed_origins(&state.config.security.allowed_origins);

    // Everything except the health endpoint goes through verification and
    // then the proxy.
    let proxied = Router::new()
        .fallback(handlers::proxy::forward)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(proxied)
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(cors_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        )
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
    })))
}
