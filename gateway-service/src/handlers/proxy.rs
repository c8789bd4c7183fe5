//! Request forwarding: longest-prefix route match, then a proxied call
//! to the downstream service with identity headers attached.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use service_core::error::AppError;

use crate::config::RouteTarget;
use crate::middleware::GatewayPrincipal;
use crate::services::GatewayError;
use crate::AppState;

// Forwarded request bodies are buffered; anything bigger is refused
// upstream of the downstream service.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Identity headers set on every forwarded request. Downstream services
/// trust these because only the gateway can reach them.
pub const USERNAME_HEADER: &str = "x-auth-username";
pub const AUTHORITY_HEADER: &str = "x-auth-role";

pub async fn forward(
    State(state): State<AppState>,
    GatewayPrincipal(principal): GatewayPrincipal,
    req: Request,
) -> Result<Response, AppError> {
    let path = req.uri().path().to_string();
    let route = match_route(&state.config.routes, &path)
        .ok_or_else(|| GatewayError::NoRoute(path.clone()))?
        .clone();

    let mut url = format!("{}{}", route.target, path);
    if let Some(query) = req.uri().query() {
        url.push('?');
        url.push_str(query);
    }

    let method = req.method().clone();
    let headers = req.headers().clone();
    let body = to_bytes(req.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| GatewayError::Upstream(anyhow::anyhow!("Reading request body: {}", e)))?;

    tracing::debug!(method = %method, url = %url, "Forwarding request");

    let mut upstream = state.http.request(method, &url).body(body);
    upstream = copy_request_headers(upstream, &headers);
    upstream = upstream
        .header(USERNAME_HEADER, sanitize(&principal.username))
        .header(AUTHORITY_HEADER, sanitize(&principal.authority));

    let response = upstream
        .send()
        .await
        .map_err(|e| GatewayError::Upstream(anyhow::anyhow!("{}: {}", url, e)))?;

    let status = StatusCode::from_u16(response.status().as_u16())
        .map_err(|e| GatewayError::Upstream(anyhow::anyhow!(e)))?;
    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();

    let bytes = response
        .bytes()
        .await
        .map_err(|e| GatewayError::Upstream(anyhow::anyhow!("Reading upstream body: {}", e)))?;

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder
        .body(Body::from(bytes))
        .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))
}

/// Longest configured prefix wins, so `/api/employees/active` beats
/// `/api`.
fn match_route<'a>(routes: &'a [RouteTarget], path: &str) -> Option<&'a RouteTarget> {
    routes
        .iter()
        .filter(|r| path.starts_with(r.prefix.as_str()))
        .max_by_key(|r| r.prefix.len())
}

fn copy_request_headers(
    mut upstream: reqwest::RequestBuilder,
    headers: &HeaderMap,
) -> reqwest::RequestBuilder {
    for name in [
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::AUTHORIZATION,
    ] {
        if let Some(value) = headers.get(&name) {
            upstream = upstream.header(name.clone(), value.clone());
        }
    }
    if let Some(request_id) = headers.get("x-request-id") {
        upstream = upstream.header("x-request-id", request_id.clone());
    }
    upstream
}

/// Principal fields become header values; anything unrepresentable is
/// replaced rather than dropped so the headers are always present.
fn sanitize(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("invalid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(prefix: &str, target: &str) -> RouteTarget {
        RouteTarget {
            prefix: prefix.to_string(),
            target: target.to_string(),
        }
    }

    #[test]
    fn longest_prefix_wins() {
        let routes = vec![
            route("/api", "http://fallback:8080"),
            route("/api/employees", "http://organization-service:8080"),
        ];

        let matched = match_route(&routes, "/api/employees/7/active-organization")
            .expect("route");
        assert_eq!(matched.target, "http://organization-service:8080");

        let matched = match_route(&routes, "/api/invoices/1").expect("route");
        assert_eq!(matched.target, "http://fallback:8080");
    }

    #[test]
    fn unmatched_path_yields_none() {
        let routes = vec![route("/api/employees", "http://organization-service:8080")];
        assert!(match_route(&routes, "/internal/user-info").is_none());
    }

    #[test]
    fn sanitize_keeps_valid_values() {
        assert_eq!(sanitize("+998901234567").to_str().unwrap(), "+998901234567");
        assert_eq!(sanitize("bad\nvalue").to_str().unwrap(), "invalid");
    }
}
