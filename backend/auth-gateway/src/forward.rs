//! Upstream forwarding.
//!
//! Requests that survive the filter chain are proxied to the configured
//! upstream. The stamped identity headers injected by the authentication
//! filter travel with the request; the bearer token does not — downstream
//! services trust the gateway, not the token.

use actix_web::http::StatusCode;
use actix_web::{error, web, HttpRequest, HttpResponse, Result};
use tracing::error as log_error;

use crate::state::GatewayState;

/// Hop-by-hop and gateway-owned request headers that never leave the
/// gateway.
const SKIPPED_REQUEST_HEADERS: [&str; 6] = [
    "authorization",
    "connection",
    "content-length",
    "host",
    "transfer-encoding",
    "upgrade",
];

const SKIPPED_RESPONSE_HEADERS: [&str; 3] = ["connection", "content-length", "transfer-encoding"];

/// Default service: proxy the request upstream, body and headers included.
pub async fn forward(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<GatewayState>,
) -> Result<HttpResponse> {
    let mut url = format!("{}{}", state.upstream_service_url, req.uri().path());
    if let Some(query) = req.uri().query() {
        url.push('?');
        url.push_str(query);
    }

    let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
        .map_err(error::ErrorInternalServerError)?;

    let mut upstream = state.http.request(method, &url);
    for (name, value) in req.headers() {
        if SKIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
            continue;
        }
        upstream = upstream.header(name.as_str(), value.as_bytes());
    }

    let upstream_resp = upstream.body(body.to_vec()).send().await.map_err(|err| {
        log_error!(url = %url, error = %err, "upstream request failed");
        error::ErrorBadGateway("upstream unavailable")
    })?;

    let status = StatusCode::from_u16(upstream_resp.status().as_u16())
        .map_err(error::ErrorInternalServerError)?;

    let mut response = HttpResponse::build(status);
    for (name, value) in upstream_resp.headers() {
        if SKIPPED_RESPONSE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        response.append_header((name.as_str(), value.as_bytes()));
    }

    let bytes = upstream_resp
        .bytes()
        .await
        .map_err(error::ErrorBadGateway)?;

    Ok(response.body(bytes.to_vec()))
}
