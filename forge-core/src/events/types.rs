//! Progress event types.
//!
//! Consumers see a stream of `progress` events followed by exactly one
//! terminal event (`complete` or `error`). Events serialize to the shapes
//! the SSE transport emits verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::StageId;
use crate::error::ErrorKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum PipelineEvent {
    Progress(ProgressPayload),
    Complete(CompletePayload),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub run_id: String,
    pub stage: String,
    /// One of {0, 15, 30, 50, 75, 90}.
    pub progress: u8,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletePayload {
    pub run_id: String,
    /// Always 100.
    pub progress: u8,
    pub cache_hit: bool,
    pub total_ms: u64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub run_id: String,
    pub code: ErrorKind,
    pub detail: String,
    pub at: DateTime<Utc>,
}

impl PipelineEvent {
    pub fn started(run_id: &str) -> Self {
        Self::Progress(ProgressPayload {
            run_id: run_id.to_string(),
            stage: "start".into(),
            progress: 0,
            message: "Run started".into(),
            at: Utc::now(),
        })
    }

    pub fn stage_complete(run_id: &str, stage: StageId, message: impl Into<String>) -> Self {
        Self::Progress(ProgressPayload {
            run_id: run_id.to_string(),
            stage: stage.to_string(),
            progress: stage.progress_after(),
            message: message.into(),
            at: Utc::now(),
        })
    }

    pub fn complete(run_id: &str, cache_hit: bool, total_ms: u64) -> Self {
        Self::Complete(CompletePayload {
            run_id: run_id.to_string(),
            progress: 100,
            cache_hit,
            total_ms,
            at: Utc::now(),
        })
    }

    pub fn error(run_id: &str, code: ErrorKind, detail: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            run_id: run_id.to_string(),
            code,
            detail: detail.into(),
            at: Utc::now(),
        })
    }

    pub fn run_id(&self) -> &str {
        match self {
            Self::Progress(p) => &p.run_id,
            Self::Complete(c) => &c.run_id,
            Self::Error(e) => &e.run_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error(_))
    }

    /// Progress value, when the event carries one.
    pub fn progress(&self) -> Option<u8> {
        match self {
            Self::Progress(p) => Some(p.progress),
            Self::Complete(c) => Some(c.progress),
            Self::Error(_) => None,
        }
    }

    /// One SSE line: `data: {json}`.
    pub fn to_sse_line(&self) -> String {
        format!(
            "data: {}",
            serde_json::to_string(self).expect("event serialization is infallible")
        )
    }
}
