//! ComponentForge core library
//!
//! Deterministic machinery for the design-to-component pipeline:
//!
//! - Design token model, validation, fallbacks, and Figma semantic mapping
//! - Requirement proposals with a deterministic merge and approval states
//! - The curated pattern library with BM25 + dense-vector hybrid retrieval
//! - Static validators (security sanitizer, tsc, eslint) and the fixed
//!   validator chain
//! - Quality scoring: WCAG contrast, CIE76 ΔE token adherence, a11y audit,
//!   and the merged PASS/FAIL report
//! - Run context, progress events, span exporter, caches, retry policy,
//!   and the error taxonomy
//!
//! Everything that talks to an LLM or external service lives in the
//! `forge-agents` crate; this crate only shells out to the local toolchain
//! validators.

pub mod cache;
pub mod context;
pub mod error;
pub mod events;
pub mod generated;
pub mod patterns;
pub mod quality;
pub mod requirements;
pub mod retrieval;
pub mod retry;
pub mod tokens;
pub mod trace;
pub mod validation;

pub use cache::{cache_key, CacheEntry, GenerationCache, InMemoryCache, TtlCache};
pub use context::{RunContext, RunInput, StageId};
pub use error::{ErrorEnvelope, ErrorKind, ForgeError, ForgeResult};
pub use events::{PipelineEvent, ProgressBus};
pub use generated::{
    parse_provenance_header, render_provenance_header, GeneratedCode, GenerationStatus,
    Provenance,
};
pub use patterns::{seed::seed_library, Pattern, PatternId, PatternLibrary, PatternMetadata};
pub use quality::{QualityReport, QualityScores, ReportStatus};
pub use requirements::{
    merge_proposals, ApprovedRequirements, ComponentClassification, ComponentType,
    ProposalStatus, RequirementCategory, RequirementProposal,
};
pub use retrieval::{
    query::RetrievalQuery, vector::InMemoryVectorIndex, vector::VectorIndex, RetrievalResponse,
    RetrievalResult, Retriever, RetrieverConfig,
};
pub use retry::{with_retry, RetryPolicy};
pub use tokens::{DesignTokens, TokenField, UploadVerdict};
pub use trace::TraceExporter;
pub use validation::{ChainConfig, ValidationResults, ValidatorChain};
