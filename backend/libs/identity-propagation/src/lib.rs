//! Identity propagation between the gateway and backing services.
//!
//! The gateway verifies the session token once, then forwards the verified
//! identity to downstream services as trusted headers. Downstream services
//! reconstruct an [`IdentityContext`] from those headers without touching the
//! token again — the gateway is the sole entry point.
//!
//! ## Core Components
//!
//! - **IdentityContext**: request-scoped verified identity, usable as an
//!   actix extractor in handlers
//! - **IdentityStamper**: HMAC stamp over the propagated headers so a forged
//!   header set is detectable even if network isolation fails
//! - **strip/inject helpers**: the gateway strips inbound identity headers
//!   from every external request before re-adding its own stamped values
//! - **TrustedIdentityMiddleware**: downstream filter that rebuilds the
//!   context from stamped headers
//!
//! ## Trust boundary
//!
//! Downstream services must never accept these headers from an external
//! caller. Deployments should keep backing services reachable only from the
//! gateway; the stamp is the defense in depth that makes header forgery
//! detectable regardless of topology.

mod context;
mod downstream;
mod headers;
mod stamp;

pub use context::IdentityContext;
pub use downstream::TrustedIdentityMiddleware;
pub use headers::{
    extract_identity, inject_identity_headers, strip_identity_headers, PropagationError,
    IDENTITY_HEADERS, ISSUED_AT_HEADER, ROLE_HEADER, STAMP_HEADER, SUBJECT_HEADER,
};
pub use stamp::IdentityStamper;
