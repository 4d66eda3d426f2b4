//! Downstream trusted-identity filter.
//!
//! Backing services sit behind the gateway and never see the session token.
//! This middleware rebuilds the request's [`IdentityContext`] from the
//! stamped identity headers; handlers then take the context as an extractor.

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::sync::Arc;
use tracing::warn;

use crate::{extract_identity, IdentityStamper};

/// Middleware reconstructing gateway-asserted identity.
///
/// - No identity headers: the request proceeds anonymously.
/// - Valid stamped headers: an `IdentityContext` lands in the extensions.
/// - Partial, malformed or mis-stamped headers: the request is rejected,
///   since only a forgery or a broken gateway produces that shape.
pub struct TrustedIdentityMiddleware {
    stamper: Arc<IdentityStamper>,
}

impl TrustedIdentityMiddleware {
    pub fn new(stamper: IdentityStamper) -> Self {
        Self {
            stamper: Arc::new(stamper),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for TrustedIdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TrustedIdentityService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TrustedIdentityService {
            service,
            stamper: self.stamper.clone(),
        }))
    }
}

pub struct TrustedIdentityService<S> {
    service: S,
    stamper: Arc<IdentityStamper>,
}

impl<S, B> Service<ServiceRequest> for TrustedIdentityService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match extract_identity(req.headers(), &self.stamper) {
            Ok(Some(ctx)) => {
                req.extensions_mut().insert(ctx);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(path = %req.path(), error = %err, "rejecting spoofed identity headers");
                return Box::pin(async move {
                    Err(actix_web::error::ErrorUnauthorized(
                        "invalid identity headers",
                    ))
                });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}
