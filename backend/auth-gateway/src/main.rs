use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::prelude::*;

use actix_auth::{
    validate_filter_order, AuditLogMiddleware, AuthState, AuthenticationFilter,
    GATEWAY_FILTER_ORDER,
};
use auth_policy::{AccessDecision, PolicyMatcher};
use identity_propagation::IdentityStamper;
use revocation_store::RedisRevocationStore;
use token_codec::SessionTokenCodec;

use auth_gateway::config::Settings;
use auth_gateway::state::GatewayState;
use auth_gateway::verifier::HttpCredentialVerifier;
use auth_gateway::{forward, routes};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,auth_gateway=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting authentication gateway...");

    let settings = Settings::load().context("failed to load configuration")?;

    // Everything the filter chain needs is constructed here, once, and
    // passed explicitly. Misconfiguration aborts startup.
    let codec =
        SessionTokenCodec::new(&settings.auth.token_secret).context("invalid AUTH_TOKEN_SECRET")?;
    let policy = PolicyMatcher::parse(&settings.auth.policy_rules, AccessDecision::RequireIdentity)
        .context("invalid AUTH_POLICY_RULES")?;
    validate_filter_order(GATEWAY_FILTER_ORDER).context("invalid gateway filter order")?;

    let redis_client = redis::Client::open(settings.redis.url.as_str())
        .context("failed to construct Redis client")?;
    let redis = redis::aio::ConnectionManager::new(redis_client)
        .await
        .context("failed to initialize Redis connection manager")?;

    let failure_policy = settings.auth.failure_policy();
    let auth_state = Arc::new(AuthState {
        codec,
        policy,
        store: Arc::new(RedisRevocationStore::new(redis)),
        failure_policy,
        stamper: IdentityStamper::new(&settings.auth.token_secret),
        store_timeout: Duration::from_millis(settings.auth.store_timeout_ms),
    });

    let gateway_state = web::Data::new(GatewayState {
        auth: auth_state.clone(),
        verifier: Arc::new(HttpCredentialVerifier::new(&settings.upstream.identity_url)),
        http: reqwest::Client::new(),
        session_ttl: Duration::from_secs(settings.auth.session_ttl_seconds),
        upstream_service_url: settings.upstream.service_url.clone(),
    });

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!(
        addr = %bind_addr,
        failure_policy = ?failure_policy,
        "authentication gateway listening"
    );

    HttpServer::new(move || {
        // Execution order is GATEWAY_FILTER_ORDER, outermost first. Actix
        // runs the last registered wrap first, hence reverse registration.
        App::new()
            .wrap(AuditLogMiddleware)
            .wrap(AuthenticationFilter::new(auth_state.clone()))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(gateway_state.clone())
            .route("/health", web::get().to(routes::health))
            .service(
                web::scope("/api/auth")
                    .route("/login", web::post().to(routes::auth::login))
                    .route("/logout", web::post().to(routes::auth::logout)),
            )
            .default_service(web::route().to(forward::forward))
    })
    .bind(&bind_addr)
    .with_context(|| format!("failed to bind {bind_addr}"))?
    .run()
    .await
    .context("gateway server terminated")
}
