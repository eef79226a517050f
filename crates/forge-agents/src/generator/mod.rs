//! Code Generator stage: one structured LLM call plus a bounded
//! validation-repair loop.
//!
//! Internal stages:
//! - **A**: prompt assembly ([`prompt`])
//! - **B**: generation, fixed-order validation, bounded repair
//! - **C**: post-processing ([`post`]): imports, provenance, scores
//!
//! The loop exits on a clean validator chain, attempt exhaustion, or the
//! time budget. Whatever the last iteration produced is returned; code is
//! never silently dropped.

pub mod post;
pub mod prompt;
pub mod repair;

use std::sync::Arc;
use std::time::{Duration, Instant};

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};

use forge_core::error::{ForgeError, ForgeResult};
use forge_core::generated::{GeneratedCode, GenerationStatus};
use forge_core::patterns::Pattern;
use forge_core::quality::AppliedFix;
use forge_core::requirements::{ApprovedRequirements, ComponentType};
use forge_core::tokens::DesignTokens;
use forge_core::trace;
use forge_core::validation::{ChainReport, FinalStatus, ValidatorChain};

use crate::exemplars::ExemplarGallery;
use crate::llm::{ChatMessage, ChatRequest, LlmBackend, TokenUsage};

/// Default repair-loop wall-clock budget.
pub const DEFAULT_LOOP_BUDGET: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Repair attempts after the initial generation.
    pub max_fix_attempts: u32,
    /// Wall-clock budget for stage B, repairs included.
    pub loop_budget: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_fix_attempts: 2,
            loop_budget: DEFAULT_LOOP_BUDGET,
        }
    }
}

/// The structured completion shape for both generation and repair calls.
#[derive(Debug, Deserialize, JsonSchema)]
struct GenerationDto {
    component: String,
    stories: String,
}

/// What the stage hands back to the orchestrator: the bundle, the final
/// chain report, and any deterministic fixes applied along the way.
#[derive(Debug)]
pub struct GenerationOutput {
    pub generated: GeneratedCode,
    pub final_report: ChainReport,
    pub applied_fixes: Vec<AppliedFix>,
    pub usage: TokenUsage,
}

pub struct CodeGenerator<L: LlmBackend> {
    llm: Arc<L>,
    chain: ValidatorChain,
    gallery: ExemplarGallery,
    config: GeneratorConfig,
}

impl<L: LlmBackend> CodeGenerator<L> {
    pub fn new(llm: Arc<L>, chain: ValidatorChain, config: GeneratorConfig) -> Self {
        Self {
            llm,
            chain,
            gallery: ExemplarGallery::builtin(),
            config,
        }
    }

    /// Generate a component from the retrieved pattern (or the no-pattern
    /// fallback path), the approved tokens, and requirements.
    pub async fn generate(
        &self,
        run_id: &str,
        pattern: Option<&Pattern>,
        tokens: &DesignTokens,
        requirements: &ApprovedRequirements,
    ) -> ForgeResult<GenerationOutput> {
        let started = Instant::now();
        let mut stage_ms: Vec<(String, u64)> = Vec::new();
        let mut usage = TokenUsage::default();
        let mut applied_fixes: Vec<AppliedFix> = Vec::new();

        // ── Stage A: prompt assembly ─────────────────────────────────
        let stage_a = Instant::now();
        let component_type = pattern
            .map(|p| p.metadata.component_type)
            .unwrap_or(ComponentType::Unknown);
        let exemplars = self.gallery.select(component_type);
        let user_prompt = prompt::build_user_prompt(pattern, tokens, requirements, &exemplars);
        let schema = serde_json::to_value(schemars::schema_for!(GenerationDto))
            .map_err(|e| ForgeError::InternalInvariant(format!("generation schema: {e}")))?;
        stage_ms.push(("prompt_assembly".into(), stage_a.elapsed().as_millis() as u64));

        // ── Stage B: generate, validate, repair ──────────────────────
        let stage_b = Instant::now();
        let (mut component, mut stories) = self
            .call_llm(
                run_id,
                prompt::GENERATOR_SYSTEM_PROMPT,
                &user_prompt,
                &schema,
                0,
                &mut usage,
            )
            .await?;

        let mut attempts: u32 = 0;
        let mut report: ChainReport;

        loop {
            let validator_started = Instant::now();
            let span = trace::validator_span(run_id, "chain", attempts);
            let _guard = span.enter();
            report = self.chain.run(&component, Some(&stories)).await;
            trace::record_validator_result(
                &span,
                if report.all_passed { "passed" } else { "failed" },
                validator_started.elapsed().as_millis() as u64,
            );
            drop(_guard);

            if report.all_passed {
                break;
            }

            // Deterministic sanitizer rewrite before spending an LLM call.
            // Only adopted when it actually changed the code, so a no-op
            // rewrite cannot loop.
            if let Some(sanitized) = report.security.sanitized_code.clone() {
                if sanitized != component {
                    info!(run_id, "Applying deterministic security rewrite");
                    applied_fixes.push(AppliedFix {
                        category: "security-rewrite".into(),
                        description: "replaced unsafe DOM sink with a safe equivalent".into(),
                        before: first_flagged_snippet(&report),
                        after: "textContent assignment".into(),
                    });
                    component = sanitized;
                    continue;
                }
            }

            let out_of_attempts = attempts >= self.config.max_fix_attempts;
            let out_of_time = stage_b.elapsed() >= self.config.loop_budget;
            if out_of_attempts || out_of_time {
                warn!(
                    run_id,
                    attempts,
                    out_of_time,
                    summary = %report.summary(),
                    "Validation did not converge"
                );
                break;
            }

            // ── Repair ───────────────────────────────────────────────
            attempts += 1;
            let errors = report.structured_errors();
            info!(
                run_id,
                attempt = attempts,
                errors = errors.len(),
                "Entering repair"
            );
            let repair_user = repair::build_repair_prompt(&component, &stories, &errors);
            match self
                .call_llm(
                    run_id,
                    repair::REPAIR_SYSTEM_PROMPT,
                    &repair_user,
                    &schema,
                    attempts,
                    &mut usage,
                )
                .await
            {
                Ok((fixed_component, fixed_stories)) => {
                    component = fixed_component;
                    stories = fixed_stories;
                }
                Err(e) if e.retryable() => {
                    // Transient provider trouble mid-repair: keep the last
                    // good code and let the loop close out as failed.
                    warn!(run_id, error = %e, "Repair call failed, keeping last iteration");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        stage_ms.push(("generation_validation".into(), stage_b.elapsed().as_millis() as u64));

        // ── Stage C: post-processing ─────────────────────────────────
        let stage_c = Instant::now();
        let (final_component, provenance) =
            post::post_process(&component, pattern, tokens, requirements, attempts);

        let mut generated = GeneratedCode {
            component: final_component,
            stories,
            ..Default::default()
        };
        post::finalize_metadata(&mut generated, pattern, tokens, requirements, attempts);
        generated.provenance = Some(provenance);
        generated.metadata.quality_scores = post::scores_from_report(&report);
        generated.metadata.validation_results.attempts = attempts;
        generated.metadata.validation_results.absorb(&report);
        generated.metadata.validation_results.final_status = if report.all_passed {
            FinalStatus::Passed
        } else {
            FinalStatus::Failed
        };
        generated.status = GenerationStatus::Completed;
        stage_ms.push(("post_processing".into(), stage_c.elapsed().as_millis() as u64));

        generated.timing.total_ms = started.elapsed().as_millis() as u64;
        generated.timing.stage_ms = stage_ms;

        info!(
            run_id,
            attempts,
            final_status = ?generated.metadata.validation_results.final_status,
            total_ms = generated.timing.total_ms,
            "Generation complete"
        );

        Ok(GenerationOutput {
            generated,
            final_report: report,
            applied_fixes,
            usage,
        })
    }

    async fn call_llm(
        &self,
        run_id: &str,
        system: &str,
        user: &str,
        schema: &serde_json::Value,
        attempt: u32,
        usage: &mut TokenUsage,
    ) -> ForgeResult<(String, String)> {
        let llm_started = Instant::now();
        let span = trace::llm_span(run_id, if attempt == 0 { "generate" } else { "repair" }, attempt);
        let _guard = span.enter();

        let request = ChatRequest::new(vec![
            ChatMessage::system(system),
            ChatMessage::user(user),
        ])
        .with_json_schema("generation", schema.clone());

        let response = self.llm.complete(request).await?;
        usage.prompt_tokens += response.usage.prompt_tokens;
        usage.completion_tokens += response.usage.completion_tokens;
        trace::record_llm_result(
            &span,
            llm_started.elapsed().as_millis() as u64,
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
            crate::llm::estimate_cost_usd(response.usage),
        );

        let dto: GenerationDto = serde_json::from_str(&response.content)
            .map_err(|e| ForgeError::InvalidInput(format!("generation output: {e}")))?;
        Ok((dto.component, dto.stories))
    }
}

fn first_flagged_snippet(report: &ChainReport) -> String {
    report
        .security
        .issues
        .first()
        .map(|i| i.snippet.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_dto_parses_strict_json() {
        let dto: GenerationDto = serde_json::from_str(
            r#"{"component": "export const A = 1;", "stories": "export default {};"}"#,
        )
        .unwrap();
        assert!(dto.component.contains("A"));
        assert!(dto.stories.contains("default"));
    }

    #[test]
    fn test_generator_config_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.max_fix_attempts, 2);
        assert_eq!(config.loop_budget, Duration::from_secs(120));
    }
}
