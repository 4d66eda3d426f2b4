//! Audit logging middleware.
//!
//! Logs each request with method, path, status, duration and — when the
//! request was authenticated — the subject it is attributable to. Must be
//! ordered after the authentication filter (see [`crate::order`]): it reads
//! the identity context that filter produces.

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::time::Instant;

use identity_propagation::IdentityContext;

/// Middleware that writes one audit line per request.
#[derive(Clone, Default)]
pub struct AuditLogMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuditLogMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuditLogService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuditLogService { service }))
    }
}

pub struct AuditLogService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuditLogService<S>
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
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.path().to_string();
        let subject = req
            .extensions()
            .get::<IdentityContext>()
            .map(|ctx| ctx.subject);

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            let elapsed = start.elapsed();
            let status = res.status();

            match subject {
                Some(subject) => tracing::info!(
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    duration_ms = elapsed.as_millis() as u64,
                    subject,
                    "request completed"
                ),
                None => tracing::info!(
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    duration_ms = elapsed.as_millis() as u64,
                    "request completed"
                ),
            }

            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    async fn handler() -> HttpResponse {
        HttpResponse::Ok().body("ok")
    }

    #[actix_web::test]
    async fn audit_is_transparent_to_the_request() {
        let app = test::init_service(
            App::new()
                .wrap(AuditLogMiddleware)
                .route("/anything", web::get().to(handler)),
        )
        .await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/anything").to_request())
                .await;
        assert_eq!(resp.status(), 200);
        assert_eq!(test::read_body(resp).await, "ok");
    }
}
