//! Tracing spans and the async span exporter.
//!
//! Live diagnostics go through `tracing` spans with OTel-style dot-notation
//! names; durable span records flow through a single-writer bounded queue
//! to a pluggable sink. A full queue drops records and counts them; it
//! never blocks the pipeline.
//!
//! Span hierarchy:
//!
//! ```text
//! forge.run                 (root, one per pipeline run)
//!   └─ forge.stage          (one per pipeline stage)
//!       ├─ forge.llm_call   (completion or embedding call)
//!       └─ forge.validator  (sanitizer / tsc / eslint invocation)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::Span;

pub const SPAN_RUN: &str = "forge.run";
pub const SPAN_STAGE: &str = "forge.stage";
pub const SPAN_LLM_CALL: &str = "forge.llm_call";
pub const SPAN_VALIDATOR: &str = "forge.validator";

// ── Live tracing span builders ───────────────────────────────────────

/// Root span for one pipeline run.
pub fn run_span(run_id: &str, input_kind: &str) -> Span {
    tracing::info_span!(
        "forge.run",
        "run.id" = %run_id,
        "run.input_kind" = %input_kind,
        "run.success" = tracing::field::Empty,
        "run.duration_ms" = tracing::field::Empty,
        "run.cache_hit" = tracing::field::Empty,
    )
}

pub fn record_run_result(span: &Span, success: bool, duration_ms: u64, cache_hit: bool) {
    span.record("run.success", success);
    span.record("run.duration_ms", duration_ms);
    span.record("run.cache_hit", cache_hit);
}

/// Child span for one pipeline stage.
pub fn stage_span(run_id: &str, stage: &str) -> Span {
    tracing::info_span!(
        "forge.stage",
        "run.id" = %run_id,
        "stage.name" = %stage,
        "stage.success" = tracing::field::Empty,
        "stage.duration_ms" = tracing::field::Empty,
    )
}

pub fn record_stage_result(span: &Span, success: bool, duration_ms: u64) {
    span.record("stage.success", success);
    span.record("stage.duration_ms", duration_ms);
}

/// Grandchild span for an LLM call, tagged with sub-phase and attempt.
pub fn llm_span(run_id: &str, purpose: &str, attempt: u32) -> Span {
    tracing::info_span!(
        "forge.llm_call",
        "run.id" = %run_id,
        "llm.purpose" = %purpose,
        "llm.attempt" = attempt,
        "llm.duration_ms" = tracing::field::Empty,
        "llm.prompt_tokens" = tracing::field::Empty,
        "llm.completion_tokens" = tracing::field::Empty,
        "llm.cost_usd" = tracing::field::Empty,
    )
}

pub fn record_llm_result(
    span: &Span,
    duration_ms: u64,
    prompt_tokens: u64,
    completion_tokens: u64,
    cost_usd: f64,
) {
    span.record("llm.duration_ms", duration_ms);
    span.record("llm.prompt_tokens", prompt_tokens);
    span.record("llm.completion_tokens", completion_tokens);
    span.record("llm.cost_usd", cost_usd);
}

/// Grandchild span for a validator invocation.
pub fn validator_span(run_id: &str, validator: &str, attempt: u32) -> Span {
    tracing::info_span!(
        "forge.validator",
        "run.id" = %run_id,
        "validator.name" = %validator,
        "validator.attempt" = attempt,
        "validator.outcome" = tracing::field::Empty,
        "validator.duration_ms" = tracing::field::Empty,
    )
}

pub fn record_validator_result(span: &Span, outcome: &str, duration_ms: u64) {
    span.record("validator.outcome", outcome);
    span.record("validator.duration_ms", duration_ms);
}

// ── Durable span records & exporter ──────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Run,
    Stage,
    LlmCall,
    Validator,
}

/// One flushed span: name, tags, timing, cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanRecord {
    pub kind: SpanKind,
    pub name: String,
    pub run_id: String,
    pub stage: Option<String>,
    pub attempt: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    /// Structured metadata: input hashes, output summaries, token counts.
    pub attributes: Vec<(String, String)>,
}

/// Where flushed records land. JSON-lines file, collector client, or a
/// test buffer.
pub trait SpanSink: Send + 'static {
    fn export(&mut self, record: SpanRecord);
}

/// Sink that logs each record as a structured tracing event. The default
/// when no collector endpoint is configured.
pub struct LogSink;

impl SpanSink for LogSink {
    fn export(&mut self, record: SpanRecord) {
        tracing::debug!(
            kind = ?record.kind,
            name = %record.name,
            run_id = %record.run_id,
            duration_ms = record.duration_ms,
            success = record.success,
            "span exported"
        );
    }
}

/// Handle used by the pipeline to enqueue records. Cloneable; all clones
/// feed the same writer task.
#[derive(Clone)]
pub struct TraceExporter {
    tx: Option<mpsc::Sender<SpanRecord>>,
    dropped: Arc<AtomicU64>,
}

impl TraceExporter {
    /// Exporter that discards everything (tracing disabled).
    pub fn disabled() -> Self {
        Self {
            tx: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawn the single-writer task draining into `sink`. Queue capacity
    /// bounds memory; overflow increments the drop counter.
    pub fn spawn(sink: Box<dyn SpanSink>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<SpanRecord>(capacity.max(1));
        tokio::spawn(async move {
            let mut sink = sink;
            while let Some(record) = rx.recv().await {
                sink.export(record);
            }
        });
        Self {
            tx: Some(tx),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enqueue without blocking. Full queue or closed writer drops the
    /// record and bumps the counter.
    pub fn submit(&self, record: SpanRecord) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.try_send(record).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Builder for span records so call sites stay short.
pub struct SpanRecordBuilder {
    record: SpanRecord,
    start: std::time::Instant,
}

impl SpanRecordBuilder {
    pub fn new(kind: SpanKind, name: &str, run_id: &str) -> Self {
        Self {
            record: SpanRecord {
                kind,
                name: name.to_string(),
                run_id: run_id.to_string(),
                stage: None,
                attempt: None,
                started_at: Utc::now(),
                duration_ms: 0,
                success: false,
                attributes: Vec::new(),
            },
            start: std::time::Instant::now(),
        }
    }

    pub fn stage(mut self, stage: &str) -> Self {
        self.record.stage = Some(stage.to_string());
        self
    }

    pub fn attempt(mut self, attempt: u32) -> Self {
        self.record.attempt = Some(attempt);
        self
    }

    pub fn attr(mut self, key: &str, value: impl ToString) -> Self {
        self.record.attributes.push((key.to_string(), value.to_string()));
        self
    }

    /// Stamp the duration and outcome, returning the finished record.
    pub fn finish(mut self, success: bool) -> SpanRecord {
        self.record.duration_ms = self.start.elapsed().as_millis() as u64;
        self.record.success = success;
        self.record
    }
}
