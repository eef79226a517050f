//! ComponentForge agents: the LLM-facing half of the pipeline.
//!
//! - `llm`: OpenAI-compatible chat/embeddings client behind the
//!   [`llm::LlmBackend`] seam
//! - `extractor`: vision and Figma token extraction
//! - `proposer`: component classification and the four parallel
//!   requirement analyzers
//! - `generator`: prompt assembly, the validation-repair loop, and
//!   post-processing
//! - `aggregator`: the merged quality report stage
//! - `orchestrator`: the six-stage run loop owning tracing, progress,
//!   caching, partial failure, and cancellation
//!
//! The deterministic machinery these stages call into lives in
//! `forge-core`.

pub mod aggregator;
pub mod config;
pub mod exemplars;
pub mod extractor;
pub mod generator;
pub mod llm;
pub mod orchestrator;
pub mod proposer;

pub use config::ForgeConfig;
pub use llm::{ChatMessage, ChatRequest, ChatResponse, LlmBackend, OpenAiClient};
pub use orchestrator::{
    ApprovalPolicy, ApproveAll, FailedRun, Orchestrator, PipelineDeps, PipelineInput,
    PipelineOutcome, RunResult, RunSource,
};
