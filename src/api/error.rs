//! Portal API error taxonomy
//!
//! Every failure surfaced by the portal client collapses into a small set
//! of machine-readable reasons, so reducers and the CLI can react without
//! string-matching. The optional `extra` carries human-readable detail.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a portal operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailReason {
    /// No stored or supplied credential to log in with
    NoCredential,
    /// The identity provider rejected the credential
    BadCredential,
    /// The identity provider did not issue a login ticket
    IdTicket,
    /// Following the ticket into the learning site failed
    Roaming,
    /// The session is missing or has expired
    NotLoggedIn,
    /// The response body could not be understood
    InvalidResponse,
    /// The server answered with an unexpected HTTP status
    UnexpectedStatus,
    /// The account has no semesters at all
    NoSemesters,
    /// The portal reported the operation itself as failed
    OperationFailed,
}

impl FailReason {
    /// Short human-readable description
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoCredential => "no credential provided",
            Self::BadCredential => "bad credential",
            Self::IdTicket => "identity provider issued no login ticket",
            Self::Roaming => "could not roam into the learning site",
            Self::NotLoggedIn => "not logged in or session expired",
            Self::InvalidResponse => "invalid response from portal",
            Self::UnexpectedStatus => "unexpected HTTP status",
            Self::NoSemesters => "account has no semesters",
            Self::OperationFailed => "portal reported operation failure",
        }
    }
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A failed portal operation: a reason plus optional detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{reason}{}", .extra.as_deref().map(|e| format!(": {e}")).unwrap_or_default())]
pub struct ApiError {
    /// Machine-readable failure reason
    pub reason: FailReason,
    /// Optional human-readable detail
    pub extra: Option<String>,
}

impl ApiError {
    /// Build an error from a bare reason
    pub const fn new(reason: FailReason) -> Self {
        Self {
            reason,
            extra: None,
        }
    }

    /// Build an error with extra detail attached
    pub fn with_extra(reason: FailReason, extra: impl Into<String>) -> Self {
        Self {
            reason,
            extra: Some(extra.into()),
        }
    }
}

// Transport-level failures (timeouts, DNS, TLS) have no dedicated reason;
// they fall back to the generic unexpected-status bucket with detail.
impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::with_extra(FailReason::UnexpectedStatus, err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_extra(FailReason::InvalidResponse, err.to_string())
    }
}

/// Convenience alias for portal operation results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_without_extra() {
        let err = ApiError::new(FailReason::BadCredential);
        assert_eq!(err.to_string(), "bad credential");
    }

    #[test]
    fn test_display_with_extra() {
        let err = ApiError::with_extra(FailReason::UnexpectedStatus, "503 Service Unavailable");
        assert_eq!(
            err.to_string(),
            "unexpected HTTP status: 503 Service Unavailable"
        );
    }

    #[test]
    fn test_serde_roundtrip() {
        let err = ApiError::with_extra(FailReason::Roaming, "timeout");
        let json = serde_json::to_string(&err).unwrap();
        let back: ApiError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
