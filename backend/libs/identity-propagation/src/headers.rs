//! Trusted forwarding headers.
//!
//! The gateway serializes the verified identity into these headers before a
//! request leaves its network boundary. They are stripped from every inbound
//! external request first, so a client-supplied copy can never reach a
//! downstream service.

use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};
use chrono::DateTime;
use thiserror::Error;

use crate::{IdentityContext, IdentityStamper};

pub const SUBJECT_HEADER: &str = "x-identity-subject";
pub const ROLE_HEADER: &str = "x-identity-role";
pub const ISSUED_AT_HEADER: &str = "x-identity-issued-at";
pub const STAMP_HEADER: &str = "x-identity-stamp";

/// Every header the gateway owns; stripped together, injected together.
pub const IDENTITY_HEADERS: [&str; 4] =
    [SUBJECT_HEADER, ROLE_HEADER, ISSUED_AT_HEADER, STAMP_HEADER];

#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("identity header `{0}` is missing")]
    MissingHeader(&'static str),

    #[error("identity header `{0}` is not valid")]
    InvalidHeader(&'static str),

    #[error("identity stamp does not match the presented headers")]
    StampMismatch,
}

/// Remove all identity headers from a request.
///
/// Called unconditionally on every request entering the gateway, before any
/// of its own values are added.
pub fn strip_identity_headers(headers: &mut HeaderMap) {
    for name in IDENTITY_HEADERS {
        headers.remove(name);
    }
}

/// Serialize a verified context into stamped identity headers.
pub fn inject_identity_headers(
    headers: &mut HeaderMap,
    ctx: &IdentityContext,
    stamper: &IdentityStamper,
) -> Result<(), PropagationError> {
    let role = HeaderValue::from_str(&ctx.role)
        .map_err(|_| PropagationError::InvalidHeader(ROLE_HEADER))?;
    let stamp = HeaderValue::from_str(&stamper.stamp(ctx))
        .map_err(|_| PropagationError::InvalidHeader(STAMP_HEADER))?;
    let subject = HeaderValue::from_str(&ctx.subject.to_string())
        .map_err(|_| PropagationError::InvalidHeader(SUBJECT_HEADER))?;
    let issued_at = HeaderValue::from_str(&ctx.issued_at.timestamp().to_string())
        .map_err(|_| PropagationError::InvalidHeader(ISSUED_AT_HEADER))?;

    headers.insert(HeaderName::from_static(SUBJECT_HEADER), subject);
    headers.insert(HeaderName::from_static(ROLE_HEADER), role);
    headers.insert(HeaderName::from_static(ISSUED_AT_HEADER), issued_at);
    headers.insert(HeaderName::from_static(STAMP_HEADER), stamp);
    Ok(())
}

/// Rebuild a context from stamped identity headers.
///
/// Returns `Ok(None)` when no identity headers are present (anonymous
/// request). A partial or tampered header set is an error, never silently
/// anonymous.
pub fn extract_identity(
    headers: &HeaderMap,
    stamper: &IdentityStamper,
) -> Result<Option<IdentityContext>, PropagationError> {
    if !IDENTITY_HEADERS.iter().any(|name| headers.contains_key(*name)) {
        return Ok(None);
    }

    let subject: i64 = header_str(headers, SUBJECT_HEADER)?
        .parse()
        .map_err(|_| PropagationError::InvalidHeader(SUBJECT_HEADER))?;
    let role = header_str(headers, ROLE_HEADER)?.to_string();
    let issued_at_secs: i64 = header_str(headers, ISSUED_AT_HEADER)?
        .parse()
        .map_err(|_| PropagationError::InvalidHeader(ISSUED_AT_HEADER))?;
    let issued_at = DateTime::from_timestamp(issued_at_secs, 0)
        .ok_or(PropagationError::InvalidHeader(ISSUED_AT_HEADER))?;

    let ctx = IdentityContext {
        subject,
        role,
        issued_at,
    };

    let stamp = header_str(headers, STAMP_HEADER)?;
    if !stamper.verify(&ctx, stamp) {
        return Err(PropagationError::StampMismatch);
    }

    Ok(Some(ctx))
}

fn header_str<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<&'a str, PropagationError> {
    headers
        .get(name)
        .ok_or(PropagationError::MissingHeader(name))?
        .to_str()
        .map_err(|_| PropagationError::InvalidHeader(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn context() -> IdentityContext {
        IdentityContext {
            subject: 42,
            role: "user".to_string(),
            issued_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    fn stamper() -> IdentityStamper {
        IdentityStamper::new("shared-secret")
    }

    #[test]
    fn inject_then_extract_roundtrip() {
        let mut headers = HeaderMap::new();
        inject_identity_headers(&mut headers, &context(), &stamper()).unwrap();

        let extracted = extract_identity(&headers, &stamper()).unwrap();
        assert_eq!(extracted, Some(context()));
    }

    #[test]
    fn absent_headers_mean_anonymous() {
        let headers = HeaderMap::new();
        assert_eq!(extract_identity(&headers, &stamper()).unwrap(), None);
    }

    #[test]
    fn partial_header_set_is_an_error() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(SUBJECT_HEADER),
            HeaderValue::from_static("42"),
        );

        assert!(matches!(
            extract_identity(&headers, &stamper()),
            Err(PropagationError::MissingHeader(ROLE_HEADER))
        ));
    }

    #[test]
    fn tampered_subject_fails_stamp_check() {
        let mut headers = HeaderMap::new();
        inject_identity_headers(&mut headers, &context(), &stamper()).unwrap();

        headers.insert(
            HeaderName::from_static(SUBJECT_HEADER),
            HeaderValue::from_static("7"),
        );

        assert!(matches!(
            extract_identity(&headers, &stamper()),
            Err(PropagationError::StampMismatch)
        ));
    }

    #[test]
    fn strip_removes_every_identity_header() {
        let mut headers = HeaderMap::new();
        inject_identity_headers(&mut headers, &context(), &stamper()).unwrap();
        headers.insert(
            HeaderName::from_static("x-unrelated"),
            HeaderValue::from_static("kept"),
        );

        strip_identity_headers(&mut headers);

        for name in IDENTITY_HEADERS {
            assert!(!headers.contains_key(name));
        }
        assert!(headers.contains_key("x-unrelated"));
    }
}
