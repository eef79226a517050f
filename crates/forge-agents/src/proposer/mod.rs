//! Requirement Proposer stage.
//!
//! One classifier call, then four specialist analyzers running in
//! parallel inside a structured scope: props, events, states, and
//! accessibility. Analyzer outputs merge deterministically; partial
//! analyzer failure degrades (two or more successes continue the run),
//! classifier failure is fatal.

pub mod prompts;

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use forge_core::error::{ForgeError, ForgeResult};
use forge_core::requirements::{
    merge_proposals, ComponentClassification, ComponentType, RequirementCategory,
    RequirementProposal,
};
use forge_core::tokens::DesignTokens;

use crate::llm::{ChatMessage, ChatRequest, LlmBackend};

/// Evidence handed to the classifier and analyzers: a screenshot data URL,
/// a Figma layer summary, or both.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerInput {
    pub image_data_url: Option<String>,
    pub layer_summary: Option<String>,
}

impl AnalyzerInput {
    pub fn from_image(data_url: impl Into<String>) -> Self {
        Self {
            image_data_url: Some(data_url.into()),
            layer_summary: None,
        }
    }

    pub fn from_layers(summary: impl Into<String>) -> Self {
        Self {
            image_data_url: None,
            layer_summary: Some(summary.into()),
        }
    }

    fn user_message(&self, task: &str) -> ChatMessage {
        match (&self.image_data_url, &self.layer_summary) {
            (Some(url), _) => ChatMessage::user_with_image(task, url.clone()),
            (None, Some(summary)) => {
                ChatMessage::user(format!("{task}\n\nLayer summary:\n{summary}"))
            }
            (None, None) => ChatMessage::user(task),
        }
    }
}

/// Stage output: the classification plus merged proposals, all `proposed`.
#[derive(Debug, Clone)]
pub struct ProposalOutcome {
    pub classification: ComponentClassification,
    pub proposals: Vec<RequirementProposal>,
    pub warnings: Vec<String>,
}

// ── Structured output DTOs ───────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
struct ClassificationDto {
    component_type: String,
    confidence: f64,
    #[serde(default)]
    candidates: Vec<CandidateDto>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CandidateDto {
    component_type: String,
    confidence: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct AnalyzerResponseDto {
    #[serde(default)]
    proposals: Vec<ProposalDto>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ProposalDto {
    name: String,
    value: String,
    confidence: f64,
    #[serde(default)]
    rationale: String,
}

/// The four analyzers, in the stable order used for merge tie-breaking.
const ANALYZERS: [(RequirementCategory, &str, &str); 4] = [
    (
        RequirementCategory::Accessibility,
        "a11y",
        prompts::A11Y_ANALYZER_PREAMBLE,
    ),
    (
        RequirementCategory::Events,
        "events",
        prompts::EVENTS_ANALYZER_PREAMBLE,
    ),
    (
        RequirementCategory::Props,
        "props",
        prompts::PROPS_ANALYZER_PREAMBLE,
    ),
    (
        RequirementCategory::States,
        "states",
        prompts::STATES_ANALYZER_PREAMBLE,
    ),
];

/// Minimum analyzer successes for the stage to continue.
const MIN_ANALYZER_SUCCESSES: usize = 2;

pub struct RequirementProposer<L: LlmBackend> {
    llm: Arc<L>,
    /// Bounds concurrent analyzer calls; separate from the run semaphore
    /// so LLM fan-out cannot starve other runs' single calls.
    fanout: Arc<Semaphore>,
}

impl<L: LlmBackend> RequirementProposer<L> {
    pub fn new(llm: Arc<L>, fanout_limit: usize) -> Self {
        Self {
            llm,
            fanout: Arc::new(Semaphore::new(fanout_limit.max(1))),
        }
    }

    /// Run classification then the parallel analyzers.
    pub async fn propose(
        &self,
        input: &AnalyzerInput,
        tokens: &DesignTokens,
    ) -> ForgeResult<ProposalOutcome> {
        let classification = self.classify(input).await?;
        info!(
            component_type = %classification.component_type,
            confidence = classification.confidence,
            "Component classified"
        );

        let token_digest = format!(
            "Known design tokens: {} colors, spacing scale present: {}.",
            tokens.color_names().len(),
            tokens.spacing.md.is_some(),
        );

        // All four analyzers in one structured scope; cancellation of the
        // parent future cancels every branch.
        let run = |category: RequirementCategory, analyzer: &'static str, preamble: &'static str| {
            let task = format!(
                "Component type: {}. {}\nAnalyze the {category} requirements.",
                classification.component_type, token_digest,
            );
            self.run_analyzer(input, category, analyzer, preamble, task)
        };
        let (a11y, events, props, states) = tokio::join!(
            run(ANALYZERS[0].0, ANALYZERS[0].1, ANALYZERS[0].2),
            run(ANALYZERS[1].0, ANALYZERS[1].1, ANALYZERS[1].2),
            run(ANALYZERS[2].0, ANALYZERS[2].1, ANALYZERS[2].2),
            run(ANALYZERS[3].0, ANALYZERS[3].1, ANALYZERS[3].2),
        );

        let mut proposals: Vec<RequirementProposal> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut successes = 0usize;

        for (analyzer, result) in [
            ("a11y", a11y),
            ("events", events),
            ("props", props),
            ("states", states),
        ] {
            match result {
                Ok(mut batch) => {
                    successes += 1;
                    proposals.append(&mut batch);
                }
                Err(e) => {
                    warn!(analyzer, error = %e, "Analyzer failed");
                    warnings.push(format!("{analyzer} analyzer failed: {e}"));
                }
            }
        }

        if successes < MIN_ANALYZER_SUCCESSES {
            return Err(ForgeError::UpstreamUnavailable(format!(
                "only {successes} of {} analyzers succeeded",
                ANALYZERS.len()
            )));
        }

        let merged = merge_proposals(proposals);
        info!(
            proposals = merged.len(),
            analyzers_ok = successes,
            "Requirement proposals merged"
        );

        Ok(ProposalOutcome {
            classification,
            proposals: merged,
            warnings,
        })
    }

    /// Single classification call. Target latency is seconds, not minutes;
    /// the stage timeout upstream enforces the budget.
    pub async fn classify(&self, input: &AnalyzerInput) -> ForgeResult<ComponentClassification> {
        let schema = serde_json::to_value(schemars::schema_for!(ClassificationDto))
            .map_err(|e| ForgeError::InternalInvariant(format!("classifier schema: {e}")))?;

        let request = ChatRequest::new(vec![
            ChatMessage::system(prompts::CLASSIFIER_PREAMBLE),
            input.user_message("Classify this component."),
        ])
        .with_json_schema("classification", schema);

        let response = self.llm.complete(request).await?;
        let dto: ClassificationDto = serde_json::from_str(&response.content)
            .map_err(|e| ForgeError::InvalidInput(format!("classifier output: {e}")))?;

        Ok(ComponentClassification {
            component_type: ComponentType::parse(&dto.component_type),
            confidence: dto.confidence.clamp(0.0, 1.0),
            candidates: dto
                .candidates
                .into_iter()
                .take(3)
                .map(|c| (ComponentType::parse(&c.component_type), c.confidence))
                .collect(),
        })
    }

    async fn run_analyzer(
        &self,
        input: &AnalyzerInput,
        category: RequirementCategory,
        analyzer: &'static str,
        preamble: &'static str,
        task: String,
    ) -> ForgeResult<Vec<RequirementProposal>> {
        let _permit = self
            .fanout
            .acquire()
            .await
            .map_err(|_| ForgeError::InternalInvariant("fanout semaphore closed".into()))?;

        let schema = serde_json::to_value(schemars::schema_for!(AnalyzerResponseDto))
            .map_err(|e| ForgeError::InternalInvariant(format!("analyzer schema: {e}")))?;

        let request = ChatRequest::new(vec![
            ChatMessage::system(preamble),
            input.user_message(&task),
        ])
        .with_json_schema("analysis", schema);

        let response = self.llm.complete(request).await?;
        let dto: AnalyzerResponseDto = serde_json::from_str(&response.content)
            .map_err(|e| ForgeError::InvalidInput(format!("{analyzer} output: {e}")))?;

        Ok(dto
            .proposals
            .into_iter()
            .map(|p| {
                RequirementProposal::new(category, p.name, p.value, p.confidence, p.rationale, analyzer)
            })
            .collect())
    }
}
