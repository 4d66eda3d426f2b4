//! Gateway authentication filter.
//!
//! The single chokepoint every inbound request passes through:
//!
//! 1. strip inbound identity headers (never trusted from outside)
//! 2. consult the policy matcher; anonymous paths skip straight to forwarding
//! 3. extract the bearer token from the `Authorization` header
//! 4. verify signature and expiry via the token codec (pure, no I/O)
//! 5. consult the revocation store, cheap checks first
//! 6. attach the verified identity to the request and forward
//!
//! The filter only reads; it never writes to the store. Store outages are
//! resolved by the configured fail-open/fail-closed policy.

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{Error, HttpMessage};
use chrono::DateTime;
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, warn};

use auth_policy::{AccessDecision, PolicyMatcher};
use identity_propagation::{
    inject_identity_headers, strip_identity_headers, IdentityContext, IdentityStamper,
};
use revocation_store::{FailurePolicy, RevocationStore, StoreError};
use token_codec::SessionTokenCodec;

use crate::error::AuthError;

/// Everything the filter needs, built once at startup and shared by all
/// worker threads. No ambient globals.
pub struct AuthState {
    pub codec: SessionTokenCodec,
    pub policy: PolicyMatcher,
    pub store: Arc<dyn RevocationStore>,
    pub failure_policy: FailurePolicy,
    pub stamper: IdentityStamper,
    pub store_timeout: Duration,
}

/// Authentication middleware for the gateway.
pub struct AuthenticationFilter {
    state: Arc<AuthState>,
}

impl AuthenticationFilter {
    pub fn new(state: Arc<AuthState>) -> Self {
        Self { state }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthenticationFilter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthenticationFilterService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationFilterService {
            service: Rc::new(service),
            state: self.state.clone(),
        }))
    }
}

pub struct AuthenticationFilterService<S> {
    service: Rc<S>,
    state: Arc<AuthState>,
}

impl<S, B> Service<ServiceRequest> for AuthenticationFilterService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            // Identity headers from outside the trust boundary are dropped
            // on every request, before anything else looks at them.
            strip_identity_headers(req.headers_mut());

            if state.policy.decide(req.path(), req.method()) == AccessDecision::AllowAnonymous {
                return service.call(req).await;
            }

            let path = req.path().to_string();

            let claims = match bearer_token(&req) {
                None => {
                    warn!(path = %path, "protected path requested without bearer credential");
                    return Err(AuthError::MissingCredential.into());
                }
                Some(token) => match state.codec.verify(token) {
                    Ok(claims) => claims,
                    Err(err) => {
                        warn!(path = %path, error = %err, "session token rejected");
                        return Err(AuthError::from(err).into());
                    }
                },
            };

            // Signature and expiry are fine; only now pay for the store read.
            let revoked =
                match timeout(state.store_timeout, state.store.is_revoked(&claims.jti)).await {
                    Ok(Ok(revoked)) => revoked,
                    Ok(Err(err)) => resolve_store_failure(state.failure_policy, &err)?,
                    Err(_) => resolve_store_failure(
                        state.failure_policy,
                        &StoreError::Unavailable("revocation check timed out".to_string()),
                    )?,
                };

            if revoked {
                warn!(path = %path, "revoked session token presented");
                return Err(AuthError::RevokedCredential.into());
            }

            let subject = claims.subject().map_err(|_| AuthError::InvalidCredential)?;
            let issued_at =
                DateTime::from_timestamp(claims.iat, 0).ok_or(AuthError::InvalidCredential)?;

            let ctx = IdentityContext {
                subject,
                role: claims.role.clone(),
                issued_at,
            };

            if let Err(err) = inject_identity_headers(req.headers_mut(), &ctx, &state.stamper) {
                error!(error = %err, "could not serialize identity headers");
                return Err(AuthError::InvalidCredential.into());
            }
            req.extensions_mut().insert(ctx);

            service.call(req).await
        })
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn resolve_store_failure(policy: FailurePolicy, err: &StoreError) -> Result<bool, AuthError> {
    match policy {
        FailurePolicy::FailClosed => {
            error!(error = %err, "revocation store unavailable; failing closed");
            Err(AuthError::RevokedCredential)
        }
        FailurePolicy::FailOpen => {
            error!(error = %err, "revocation store unavailable; failing open by configuration");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App, HttpRequest, HttpResponse};
    use async_trait::async_trait;
    use revocation_store::InMemoryRevocationStore;

    const TEST_SECRET: &str = "unit-test-signing-secret-0123456789abcdef";
    const TEST_RULES: &str = "allow * /api/auth/**, allow GET /health, require * /api/**";

    /// Store stub that is always unreachable.
    struct UnavailableStore;

    #[async_trait]
    impl RevocationStore for UnavailableStore {
        async fn revoke(&self, _token_id: &str, _ttl: Duration) -> revocation_store::Result<()> {
            Err(StoreError::Unavailable("stub".to_string()))
        }

        async fn is_revoked(&self, _token_id: &str) -> revocation_store::Result<bool> {
            Err(StoreError::Unavailable("stub".to_string()))
        }
    }

    fn state(store: Arc<dyn RevocationStore>, failure_policy: FailurePolicy) -> Arc<AuthState> {
        Arc::new(AuthState {
            codec: SessionTokenCodec::new(TEST_SECRET).unwrap(),
            policy: PolicyMatcher::parse(TEST_RULES, AccessDecision::RequireIdentity).unwrap(),
            store,
            failure_policy,
            stamper: IdentityStamper::new(TEST_SECRET),
            store_timeout: Duration::from_millis(500),
        })
    }

    fn default_state() -> Arc<AuthState> {
        state(
            Arc::new(InMemoryRevocationStore::new()),
            FailurePolicy::FailClosed,
        )
    }

    async fn protected(identity: IdentityContext) -> HttpResponse {
        HttpResponse::Ok().body(format!("subject:{}", identity.subject))
    }

    /// Echoes whether any identity header survived to the handler.
    async fn echo_identity_headers(req: HttpRequest) -> HttpResponse {
        let leaked = identity_propagation::IDENTITY_HEADERS
            .iter()
            .any(|name| req.headers().contains_key(*name));
        HttpResponse::Ok().body(if leaked { "leaked" } else { "clean" })
    }

    /// Shared route table for every test app.
    macro_rules! init_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .wrap(AuthenticationFilter::new($state))
                    .route("/api/diet-records", web::get().to(protected))
                    .route("/api/ping", web::route().to(echo_identity_headers))
                    .route("/api/auth/echo", web::route().to(echo_identity_headers))
                    .route("/health", web::get().to(echo_identity_headers)),
            )
            .await
        };
    }

    async fn rejection_code(err: Error) -> (StatusCode, String) {
        let resp = HttpResponse::from_error(err);
        let status = resp.status();
        let bytes = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, body["code"].as_str().unwrap_or_default().to_string())
    }

    #[actix_web::test]
    async fn anonymous_path_skips_authentication() {
        let app = init_app!(default_state());

        let req = test::TestRequest::post().uri("/api/auth/echo").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    #[actix_web::test]
    async fn missing_credential_is_rejected() {
        let app = init_app!(default_state());

        let req = test::TestRequest::get().uri("/api/diet-records").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();

        let (status, code) = rejection_code(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(code, "MissingCredential");
    }

    #[actix_web::test]
    async fn valid_token_reaches_handler_with_identity() {
        let state = default_state();
        let token = state
            .codec
            .issue(42, "user", Duration::from_secs(86400))
            .unwrap();
        let app = init_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/diet-records")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(test::read_body(resp).await, "subject:42");
    }

    #[actix_web::test]
    async fn tampered_token_is_invalid_credential() {
        let state = default_state();
        let token = state
            .codec
            .issue(42, "user", Duration::from_secs(86400))
            .unwrap();
        let tail = if token.ends_with("AA") { "BB" } else { "AA" };
        let tampered = format!("{}{tail}", &token[..token.len() - 2]);
        let app = init_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/diet-records")
            .insert_header((header::AUTHORIZATION, format!("Bearer {tampered}")))
            .to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();

        let (status, code) = rejection_code(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(code, "InvalidCredential");
    }

    #[actix_web::test]
    async fn revoked_token_is_rejected_on_next_request() {
        let store = Arc::new(InMemoryRevocationStore::new());
        let state = state(store.clone(), FailurePolicy::FailClosed);
        let token = state
            .codec
            .issue(42, "user", Duration::from_secs(86400))
            .unwrap();
        let claims = state.codec.verify(&token).unwrap();
        let app = init_app!(state);

        let authed = || {
            test::TestRequest::get()
                .uri("/api/diet-records")
                .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
                .to_request()
        };

        // Accepted before revocation.
        let resp = test::call_service(&app, authed()).await;
        assert_eq!(resp.status(), 200);

        store
            .revoke(&claims.jti, Duration::from_secs(86400))
            .await
            .unwrap();

        // Rejected on the very next request.
        let err = test::try_call_service(&app, authed()).await.unwrap_err();
        let (status, code) = rejection_code(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(code, "RevokedCredential");
    }

    #[actix_web::test]
    async fn store_outage_fails_closed_by_default() {
        let state = state(Arc::new(UnavailableStore), FailurePolicy::FailClosed);
        let token = state
            .codec
            .issue(42, "user", Duration::from_secs(86400))
            .unwrap();
        let app = init_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/diet-records")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();

        let (status, code) = rejection_code(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(code, "RevokedCredential");
    }

    #[actix_web::test]
    async fn store_outage_with_fail_open_override_admits() {
        let state = state(Arc::new(UnavailableStore), FailurePolicy::FailOpen);
        let token = state
            .codec
            .issue(42, "user", Duration::from_secs(86400))
            .unwrap();
        let app = init_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/diet-records")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    #[actix_web::test]
    async fn preflight_bypasses_authentication_everywhere() {
        let app = init_app!(default_state());

        let req = test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/api/ping")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    #[actix_web::test]
    async fn forged_identity_headers_are_stripped() {
        let app = init_app!(default_state());

        let req = test::TestRequest::post()
            .uri("/api/auth/echo")
            .insert_header((identity_propagation::SUBJECT_HEADER, "9999"))
            .insert_header((identity_propagation::ROLE_HEADER, "admin"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(test::read_body(resp).await, "clean");
    }

    #[actix_web::test]
    async fn authenticated_request_carries_stamped_headers_forward() {
        let state = default_state();
        let token = state
            .codec
            .issue(42, "user", Duration::from_secs(86400))
            .unwrap();
        let app = init_app!(state);

        // The echo handler sees the headers the filter injected for the
        // upstream hop.
        let req = test::TestRequest::get()
            .uri("/api/ping")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(test::read_body(resp).await, "leaked");
    }
}
