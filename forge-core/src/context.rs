//! Per-run shared state.
//!
//! The orchestrator owns one [`RunContext`] per run. Each stage publishes
//! its output here when it returns, in completion order; later stages read
//! a coherent snapshot. Warnings from recoverable failures accumulate here
//! instead of propagating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, ForgeResult};
use crate::generated::GeneratedCode;
use crate::quality::QualityReport;
use crate::requirements::{ComponentClassification, RequirementProposal};
use crate::retrieval::RetrievalResponse;
use crate::tokens::DesignTokens;

/// The six pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    TokenExtraction,
    RequirementProposal,
    PatternRetrieval,
    CodeGeneration,
    QualityReport,
}

impl StageId {
    pub const ALL: [StageId; 5] = [
        StageId::TokenExtraction,
        StageId::RequirementProposal,
        StageId::PatternRetrieval,
        StageId::CodeGeneration,
        StageId::QualityReport,
    ];

    /// Progress value reported after this stage completes. The run itself
    /// starts at 0 and terminates at 100.
    pub fn progress_after(&self) -> u8 {
        match self {
            StageId::TokenExtraction => 15,
            StageId::RequirementProposal => 30,
            StageId::PatternRetrieval => 50,
            StageId::CodeGeneration => 75,
            StageId::QualityReport => 90,
        }
    }

    /// Stage timeout budget in milliseconds.
    pub fn timeout_ms(&self) -> u64 {
        match self {
            StageId::TokenExtraction => 60_000,
            StageId::RequirementProposal => 30_000,
            StageId::PatternRetrieval => 5_000,
            StageId::CodeGeneration => 150_000,
            StageId::QualityReport => 15_000,
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StageId::TokenExtraction => "token_extraction",
            StageId::RequirementProposal => "requirement_proposal",
            StageId::PatternRetrieval => "pattern_retrieval",
            StageId::CodeGeneration => "code_generation",
            StageId::QualityReport => "quality_report",
        };
        write!(f, "{s}")
    }
}

/// What the run was started from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunInput {
    /// Screenshot upload; digest feeds the cache key.
    Image {
        digest: String,
        mime_type: String,
        byte_len: usize,
    },
    /// Figma file reference.
    Figma { file_key: String },
    /// Direct generation from pre-supplied tokens and requirements.
    Direct { pattern_id: Option<String> },
}

impl RunInput {
    /// The input digest folded into the cache key.
    pub fn digest(&self) -> String {
        match self {
            RunInput::Image { digest, .. } => digest.clone(),
            RunInput::Figma { file_key } => format!("figma:{file_key}"),
            RunInput::Direct { pattern_id } => {
                format!("direct:{}", pattern_id.as_deref().unwrap_or("-"))
            }
        }
    }
}

/// A recoverable failure, recorded instead of propagated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageWarning {
    pub stage: StageId,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// A stage-terminal error, kept for diagnostics on failed runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageErrorRecord {
    pub stage: StageId,
    pub code: crate::error::ErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Cumulative LLM spend for the run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CostLedger {
    pub llm_calls: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub estimated_usd: f64,
}

impl CostLedger {
    pub fn record(&mut self, prompt_tokens: u64, completion_tokens: u64, usd: f64) {
        self.llm_calls += 1;
        self.prompt_tokens += prompt_tokens;
        self.completion_tokens += completion_tokens;
        self.estimated_usd += usd;
    }
}

/// Outputs published by completed stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageOutputs {
    pub tokens: Option<DesignTokens>,
    pub classification: Option<ComponentClassification>,
    pub proposals: Option<Vec<RequirementProposal>>,
    pub retrieval: Option<RetrievalResponse>,
    pub generated: Option<GeneratedCode>,
    pub report: Option<QualityReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    pub run_id: String,
    pub input: RunInput,
    pub started_at: DateTime<Utc>,
    /// Stages in the order they completed. Monotonic by construction.
    pub completed_stages: Vec<StageId>,
    pub outputs: StageOutputs,
    pub warnings: Vec<StageWarning>,
    pub errors: Vec<StageErrorRecord>,
    /// Cache key for the generation stage, once computed.
    pub cache_key: Option<String>,
    pub cache_hit: bool,
    pub cost: CostLedger,
}

impl RunContext {
    pub fn new(input: RunInput) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            input,
            started_at: Utc::now(),
            completed_stages: Vec::new(),
            outputs: StageOutputs::default(),
            warnings: Vec::new(),
            errors: Vec::new(),
            cache_key: None,
            cache_hit: false,
            cost: CostLedger::default(),
        }
    }

    /// Mark a stage complete. Completion order must follow pipeline order;
    /// a violation is a bug in the orchestrator, not bad input.
    pub fn complete_stage(&mut self, stage: StageId) -> ForgeResult<()> {
        if let Some(last) = self.completed_stages.last() {
            if stage <= *last {
                return Err(ForgeError::InternalInvariant(format!(
                    "stage {stage} completed after {last}"
                )));
            }
        }
        self.completed_stages.push(stage);
        Ok(())
    }

    pub fn warn(&mut self, stage: StageId, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(stage = %stage, message, "Stage warning recorded");
        self.warnings.push(StageWarning {
            stage,
            message,
            at: Utc::now(),
        });
    }

    pub fn record_error(&mut self, stage: StageId, error: &ForgeError) {
        self.errors.push(StageErrorRecord {
            stage,
            code: error.kind(),
            message: error.to_string(),
            at: Utc::now(),
        });
    }

    pub fn short_id(&self) -> &str {
        &self.run_id[..8.min(self.run_id.len())]
    }

    pub fn elapsed_ms(&self) -> u64 {
        (Utc::now() - self.started_at).num_milliseconds().max(0) as u64
    }
}
