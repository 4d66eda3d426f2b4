//! Ordered path/method authorization policy.
//!
//! Classifies each inbound request as either open to anonymous callers or
//! requiring a verified identity. Rules are evaluated in declaration order
//! and the first full match wins; unmatched requests fall through to the
//! configured default. The rule set is loaded once at startup and read-only
//! afterwards, so concurrent lookups need no synchronization.
//!
//! CORS preflight (`OPTIONS`) is always anonymous, decided before the rule
//! list: browsers send it without credentials and the CORS layer answers it.

use actix_web::http::Method;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid policy rule `{0}`: expected `<decision> <method> <pattern>`")]
    InvalidRule(String),

    #[error("unknown decision `{0}`: expected `allow` or `require`")]
    UnknownDecision(String),

    #[error("unsupported method `{0}` in policy rule")]
    InvalidMethod(String),

    #[error("invalid path pattern `{0}`: patterns must start with `/`")]
    InvalidPattern(String),
}

/// Outcome of policy evaluation for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    AllowAnonymous,
    RequireIdentity,
}

/// Path matcher: exact path, or `prefix/**` matching the prefix itself and
/// any deeper suffix.
#[derive(Debug, Clone)]
enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    fn parse(raw: &str) -> Result<Self, PolicyError> {
        if !raw.starts_with('/') {
            return Err(PolicyError::InvalidPattern(raw.to_string()));
        }

        match raw.strip_suffix("/**") {
            Some(prefix) => Ok(PathPattern::Prefix(prefix.to_string())),
            None => Ok(PathPattern::Exact(raw.to_string())),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(exact) => path == exact,
            // `/api/auth/**` matches `/api/auth`, `/api/auth/` and any
            // deeper path, but never `/api/authx`.
            PathPattern::Prefix(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .map_or(false, |rest| rest.starts_with('/'))
            }
        }
    }
}

#[derive(Debug, Clone)]
enum MethodMatcher {
    Any,
    Only(Method),
}

impl MethodMatcher {
    fn parse(raw: &str) -> Result<Self, PolicyError> {
        if raw == "*" {
            return Ok(MethodMatcher::Any);
        }

        let method = match raw.to_ascii_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "PATCH" => Method::PATCH,
            "HEAD" => Method::HEAD,
            other => return Err(PolicyError::InvalidMethod(other.to_string())),
        };

        Ok(MethodMatcher::Only(method))
    }

    fn matches(&self, method: &Method) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::Only(only) => only == method,
        }
    }
}

/// A single ordered policy entry.
#[derive(Debug, Clone)]
pub struct PolicyRule {
    pattern: PathPattern,
    method: MethodMatcher,
    decision: AccessDecision,
}

impl PolicyRule {
    /// Parse one `<decision> <method> <pattern>` entry, e.g.
    /// `allow * /api/auth/**` or `require GET /api/diet-records`.
    pub fn parse(entry: &str) -> Result<Self, PolicyError> {
        let mut fields = entry.split_whitespace();
        let (Some(decision), Some(method), Some(pattern), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(PolicyError::InvalidRule(entry.to_string()));
        };

        let decision = match decision {
            "allow" => AccessDecision::AllowAnonymous,
            "require" => AccessDecision::RequireIdentity,
            other => return Err(PolicyError::UnknownDecision(other.to_string())),
        };

        Ok(Self {
            pattern: PathPattern::parse(pattern)?,
            method: MethodMatcher::parse(method)?,
            decision,
        })
    }
}

/// Immutable, ordered rule list with a fail-secure default.
#[derive(Debug, Clone)]
pub struct PolicyMatcher {
    rules: Vec<PolicyRule>,
    default_decision: AccessDecision,
}

impl PolicyMatcher {
    pub fn new(rules: Vec<PolicyRule>, default_decision: AccessDecision) -> Self {
        Self {
            rules,
            default_decision,
        }
    }

    /// Parse a comma-separated rule list from configuration.
    pub fn parse(raw: &str, default_decision: AccessDecision) -> Result<Self, PolicyError> {
        let rules = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(PolicyRule::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(rules, default_decision))
    }

    /// Classify a request. First matching rule wins; preflight is always
    /// anonymous; everything unmatched gets the default decision.
    pub fn decide(&self, path: &str, method: &Method) -> AccessDecision {
        if method == Method::OPTIONS {
            return AccessDecision::AllowAnonymous;
        }

        self.rules
            .iter()
            .find(|rule| rule.method.matches(method) && rule.pattern.matches(path))
            .map(|rule| rule.decision)
            .unwrap_or(self.default_decision)
    }
}
