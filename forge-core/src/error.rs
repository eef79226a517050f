//! Error taxonomy for the generation pipeline.
//!
//! Stage boundaries use `ForgeResult` everywhere; panics and ad-hoc string
//! errors stay confined to the lowest I/O adapters. Each error maps to a
//! stable [`ErrorKind`] that the transport layer serializes into its error
//! envelope, and to a prefix-coded user message that never leaks stack
//! traces, credentials, or prompt contents.

use serde::{Deserialize, Serialize};

/// Stable error codes surfaced through the transport error envelope.
///
/// `ValidationUnconverged` is a member of the taxonomy for envelope
/// completeness, but the orchestrator never raises it as an error: a run
/// whose generated code fails validation at the attempt bound still
/// completes, with `final_status = failed` on the validation results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or unsafe upload, schema violation, unparsable LLM output.
    InvalidInput,
    /// Figma or LLM credentials rejected.
    UpstreamAuth,
    /// Provider 429; carries a retry-after hint.
    UpstreamRateLimit,
    /// Provider 5xx after retries were exhausted.
    UpstreamUnavailable,
    /// Generation finished but validators still fail at the attempt bound.
    ValidationUnconverged,
    /// A stage exceeded its time budget.
    InternalTimeout,
    /// Client or orchestrator cancellation.
    Cancelled,
    /// A post-condition check failed; signals a bug, not bad input.
    InternalInvariant,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidInput => "invalid_input",
            Self::UpstreamAuth => "upstream_auth",
            Self::UpstreamRateLimit => "upstream_rate_limit",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::ValidationUnconverged => "validation_unconverged",
            Self::InternalTimeout => "internal_timeout",
            Self::Cancelled => "cancelled",
            Self::InternalInvariant => "internal_invariant",
        };
        write!(f, "{s}")
    }
}

/// Pipeline error. Non-recoverable conditions terminate the run with one of
/// these; recoverable conditions become warnings on the run context instead.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream rejected credentials: {0}")]
    UpstreamAuth(String),

    #[error("upstream rate limited, retry after {retry_after_secs}s")]
    UpstreamRateLimit { retry_after_secs: u64 },

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("stage '{stage}' exceeded its {budget_ms}ms budget")]
    InternalTimeout { stage: String, budget_ms: u64 },

    #[error("run cancelled")]
    Cancelled,

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl ForgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::UpstreamAuth(_) => ErrorKind::UpstreamAuth,
            Self::UpstreamRateLimit { .. } => ErrorKind::UpstreamRateLimit,
            Self::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            Self::InternalTimeout { .. } => ErrorKind::InternalTimeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InternalInvariant(_) => ErrorKind::InternalInvariant,
        }
    }

    /// Whether retrying the same operation could succeed.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamRateLimit { .. } | Self::UpstreamUnavailable(_)
        )
    }

    /// Retry-after hint in seconds, when the upstream provided one.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::UpstreamRateLimit { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Prefix-coded message for end users. The prefix is stable so the UI
    /// can map it to a category icon.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => format!("[input] {msg}"),
            Self::UpstreamAuth(_) => "[auth] The upstream service rejected the credentials".into(),
            Self::UpstreamRateLimit { retry_after_secs } => {
                format!("[rate-limit] Too many requests, retry in {retry_after_secs}s")
            }
            Self::UpstreamUnavailable(_) => {
                "[upstream] A required service is unavailable, try again later".into()
            }
            Self::InternalTimeout { stage, .. } => {
                format!("[timeout] The {stage} stage took too long")
            }
            Self::Cancelled => "[cancelled] The run was cancelled".into(),
            Self::InternalInvariant(_) => "[internal] An internal error occurred".into(),
        }
    }

    /// Serialize into the transport error envelope.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            detail: self.user_message(),
            code: self.kind(),
            retry_after: self.retry_after(),
        }
    }
}

/// The `{ "detail": ..., "code": ... }` envelope the transport emits.
/// Rate-limit responses additionally carry `retry_after` in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub detail: String,
    pub code: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

pub type ForgeResult<T> = Result<T, ForgeError>;
