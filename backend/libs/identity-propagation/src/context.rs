//! Request-scoped verified identity.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use chrono::{DateTime, Utc};
use futures::future::{ready, Ready};

/// Verified identity attached to a single request.
///
/// Created by the gateway authentication filter after token verification, or
/// by [`TrustedIdentityMiddleware`](crate::TrustedIdentityMiddleware) in a
/// downstream service from the propagated headers. Lives in the request's
/// extensions and is dropped with the request; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    pub subject: i64,
    pub role: String,
    pub issued_at: DateTime<Utc>,
}

impl FromRequest for IdentityContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<IdentityContext>() {
            Some(ctx) => ready(Ok(ctx.clone())),
            None => ready(Err(actix_web::error::ErrorUnauthorized(
                "request is not authenticated",
            ))),
        }
    }
}
