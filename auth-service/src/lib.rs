pub mod config;
pub mod constants;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{openapi::security::SecurityScheme, Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AuthConfig;
use crate::services::{Database, GrantProviderRegistry, JwtService, TokenIssuer};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::token::token,
        handlers::user::register,
        handlers::user::me,
        handlers::user::get_user,
        handlers::user::list_users,
        handlers::user::update_user,
        handlers::user::delete_user,
        handlers::role::create_role,
        handlers::role::list_roles,
    ),
    components(
        schemas(
            models::user::UserCreateRequest,
            models::user::UserUpdateRequest,
            models::user::UserResponse,
            models::user::UserInfoResponse,
            models::role::Role,
            models::role::RoleCreateRequest,
            services::TokenResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "OAuth2", description = "Token issuance"),
        (name = "Users", description = "User registration and management"),
        (name = "Roles", description = "Role management"),
        (name = "Observability", description = "Service health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AuthConfig,
    pub db: Database,
    pub jwt: JwtService,
    pub registry: Arc<GrantProviderRegistry>,
    pub issuer: Arc<TokenIssuer>,
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

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Routes that require a valid bearer token.
    let protected = Router::new()
        .route(
            "/api/users",
            get(handlers::user::list_users),
        )
        .route("/api/users/me", get(handlers::user::me))
        .route(
            "/api/users/:id",
            get(handlers::user::get_user)
                .put(handlers::user::update_user)
                .delete(handlers::user::delete_user),
        )
        .route(
            "/api/roles",
            post(handlers::role::create_role).get(handlers::role::list_roles),
        )
        .route("/internal/user-info", get(handlers::user::user_info))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/oauth2/token", post(handlers::token::token))
        .route("/api/users", post(handlers::user::register));

    app = match state.config.environment {
        config::Environment::Dev => {
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()))
        }
        config::Environment::Prod => app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        ),
    };

    let cors_origins = allowed_origins(&state.config.security.allowed_origins);

    let app = app
        .merge(protected)
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
        );

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        AppError::from(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "checks": { "postgres": "up" }
    })))
}
