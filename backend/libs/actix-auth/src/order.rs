//! Explicit gateway filter ordering.
//!
//! The filter chain is a visible data structure constructed at startup, not
//! an inference from scattered priorities. Authentication must run before
//! any filter that records or acts on request content attributable to a
//! user, because later filters read the identity context it produces.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStage {
    /// Cross-origin handling, answers preflight requests.
    Cors,
    /// Token verification and identity attachment.
    Authentication,
    /// Per-request audit logging attributed to the verified subject.
    AuditLog,
}

/// The gateway's filter chain, outermost first.
///
/// Actix registers middleware innermost-first, so `main` applies these in
/// reverse; this constant stays the single source of truth either way.
pub const GATEWAY_FILTER_ORDER: &[FilterStage] = &[
    FilterStage::Cors,
    FilterStage::Authentication,
    FilterStage::AuditLog,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterOrderError {
    #[error("filter order must contain the authentication stage")]
    MissingAuthentication,

    #[error("filter stage {0:?} appears more than once")]
    DuplicateStage(FilterStage),

    #[error("audit logging is ordered before authentication and would see unattributed requests")]
    AuditBeforeAuthentication,
}

/// Validate a filter ordering at startup; misordered chains abort boot.
pub fn validate_filter_order(order: &[FilterStage]) -> Result<(), FilterOrderError> {
    for (idx, stage) in order.iter().enumerate() {
        if order[..idx].contains(stage) {
            return Err(FilterOrderError::DuplicateStage(*stage));
        }
    }

    let auth = order
        .iter()
        .position(|s| *s == FilterStage::Authentication)
        .ok_or(FilterOrderError::MissingAuthentication)?;

    if let Some(audit) = order.iter().position(|s| *s == FilterStage::AuditLog) {
        if audit < auth {
            return Err(FilterOrderError::AuditBeforeAuthentication);
        }
    }

    Ok(())
}
