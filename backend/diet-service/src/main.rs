//! Diet service.
//!
//! Backing service behind the gateway. It never sees a session token: the
//! trusted-identity filter reconstructs the verified identity from the
//! gateway's stamped headers, and handlers take it as an extractor. The
//! service must only be reachable from the gateway's network; the stamp
//! check is the guard against misrouted or forged traffic.
//!
//! The diet domain itself is owned elsewhere; the records returned here are
//! placeholders scoped to the authenticated subject.

mod config;

use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::Context;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::prelude::*;

use identity_propagation::{IdentityContext, IdentityStamper, TrustedIdentityMiddleware};

use config::Settings;

#[derive(Debug, Serialize)]
struct DietRecordsResponse {
    subject: i64,
    role: String,
    records: Vec<serde_json::Value>,
}

/// GET /api/diet-records
async fn diet_records(identity: IdentityContext) -> HttpResponse {
    info!(subject = identity.subject, "GET /api/diet-records");

    HttpResponse::Ok().json(DietRecordsResponse {
        subject: identity.subject,
        role: identity.role,
        records: Vec::new(),
    })
}

async fn health() -> &'static str {
    "ok"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,diet_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting diet service...");

    let settings = Settings::load().context("failed to load configuration")?;
    let stamper = IdentityStamper::new(&settings.auth.token_secret);

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!(addr = %bind_addr, "diet service listening");

    HttpServer::new(move || {
        App::new()
            .wrap(TrustedIdentityMiddleware::new(stamper.clone()))
            .route("/health", web::get().to(health))
            .route("/api/diet-records", web::get().to(diet_records))
    })
    .bind(&bind_addr)
    .with_context(|| format!("failed to bind {bind_addr}"))?
    .run()
    .await
    .context("diet service terminated")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::{TimeZone, Utc};
    use identity_propagation::inject_identity_headers;

    #[actix_web::test]
    async fn records_are_scoped_to_the_propagated_subject() {
        let stamper = IdentityStamper::new("shared-secret");
        let app = test::init_service(
            App::new()
                .wrap(TrustedIdentityMiddleware::new(stamper.clone()))
                .route("/api/diet-records", web::get().to(diet_records)),
        )
        .await;

        let ctx = IdentityContext {
            subject: 42,
            role: "user".to_string(),
            issued_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        let mut headers = actix_web::http::header::HeaderMap::new();
        inject_identity_headers(&mut headers, &ctx, &stamper).unwrap();

        let mut req = test::TestRequest::get().uri("/api/diet-records");
        for (name, value) in headers {
            req = req.insert_header((name, value));
        }

        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["subject"], 42);
        assert_eq!(body["role"], "user");
    }

    #[actix_web::test]
    async fn request_without_identity_headers_is_unauthenticated() {
        let stamper = IdentityStamper::new("shared-secret");
        let app = test::init_service(
            App::new()
                .wrap(TrustedIdentityMiddleware::new(stamper))
                .route("/api/diet-records", web::get().to(diet_records)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/diet-records").to_request();
        let result = test::try_call_service(&app, req).await;

        match result {
            Ok(resp) => assert_eq!(resp.status(), StatusCode::UNAUTHORIZED),
            Err(err) => assert_eq!(
                err.as_response_error().status_code(),
                StatusCode::UNAUTHORIZED
            ),
        }
    }
}
