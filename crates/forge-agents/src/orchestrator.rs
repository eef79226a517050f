//! Pipeline Orchestrator.
//!
//! Runs the six stages in order under one root span, owning every
//! cross-cutting concern: per-stage timeouts, cooperative cancellation,
//! progress events (one terminal event per run), the generation cache
//! short-circuit, the partial-failure policy, and the cost ledger.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use forge_core::cache::{cache_key, CacheEntry, GenerationCache};
use forge_core::context::{RunContext, RunInput, StageId};
use forge_core::error::{ForgeError, ForgeResult};
use forge_core::events::{PipelineEvent, SharedProgressBus};
use forge_core::generated::GeneratedCode;
use forge_core::quality::{AppliedFix, QualityReport};
use forge_core::requirements::{ApprovedRequirements, RequirementProposal};
use forge_core::retrieval::{query::RetrievalQuery, Retriever};
use forge_core::tokens::{admit_image, DesignTokens, ImageLimits, UploadVerdict};
use forge_core::trace::{self, SpanKind, SpanRecordBuilder, TraceExporter};
use forge_core::validation::ChainConfig;

use crate::aggregator;
use crate::extractor::TokenExtractor;
use crate::generator::{CodeGenerator, GeneratorConfig};
use crate::llm::{estimate_cost_usd, LlmBackend};
use crate::proposer::{AnalyzerInput, RequirementProposer};

/// What the run was started from.
pub enum RunSource {
    Image {
        bytes: Vec<u8>,
        mime_type: String,
        verdict: UploadVerdict,
    },
    Figma {
        file_key: String,
        access_token: String,
    },
    /// Pre-supplied tokens and requirements (the `POST /generate` shape).
    Direct {
        tokens: DesignTokens,
        requirements: ApprovedRequirements,
    },
}

pub struct PipelineInput {
    pub source: RunSource,
    /// Pin a specific pattern instead of retrieving.
    pub pattern_override: Option<String>,
}

/// Approval collaborator: moves proposals out of `proposed` before
/// retrieval. The default approves everything.
pub trait ApprovalPolicy: Send + Sync {
    fn review(&self, proposals: Vec<RequirementProposal>) -> Vec<RequirementProposal>;
}

pub struct ApproveAll;

impl ApprovalPolicy for ApproveAll {
    fn review(&self, mut proposals: Vec<RequirementProposal>) -> Vec<RequirementProposal> {
        for p in proposals.iter_mut() {
            let _ = p.approve();
        }
        proposals
    }
}

/// A successful run.
pub struct PipelineOutcome {
    pub context: RunContext,
    pub generated: GeneratedCode,
    pub report: QualityReport,
}

/// A failed run, returned with its context for diagnostics.
#[derive(Debug)]
pub struct FailedRun {
    pub error: ForgeError,
    pub context: RunContext,
}

pub type RunResult = Result<PipelineOutcome, Box<FailedRun>>;

/// Everything the orchestrator owns, wired once at startup.
pub struct PipelineDeps<L: LlmBackend> {
    pub llm: Arc<L>,
    pub retriever: Arc<Retriever>,
    pub cache: Arc<dyn GenerationCache>,
    pub bus: SharedProgressBus,
    pub exporter: TraceExporter,
    pub chain_config: ChainConfig,
    pub approval: Arc<dyn ApprovalPolicy>,
    pub pipeline_version: String,
    pub max_fix_attempts: u32,
    pub generation_timeout: Duration,
    pub max_concurrent_runs: usize,
    pub llm_fanout_limit: usize,
    pub figma_api_base: String,
}

pub struct Orchestrator<L: LlmBackend> {
    llm: Arc<L>,
    retriever: Arc<Retriever>,
    cache: Arc<dyn GenerationCache>,
    bus: SharedProgressBus,
    exporter: TraceExporter,
    extractor: TokenExtractor<L>,
    proposer: RequirementProposer<L>,
    generator: CodeGenerator<L>,
    approval: Arc<dyn ApprovalPolicy>,
    pipeline_version: String,
    generation_timeout: Duration,
    run_semaphore: Arc<Semaphore>,
}

impl<L: LlmBackend + 'static> Orchestrator<L> {
    pub fn new(deps: PipelineDeps<L>) -> Self {
        let extractor = TokenExtractor::new(deps.llm.clone(), &deps.figma_api_base);
        let proposer = RequirementProposer::new(deps.llm.clone(), deps.llm_fanout_limit);
        let generator = CodeGenerator::new(
            deps.llm.clone(),
            forge_core::validation::ValidatorChain::new(deps.chain_config),
            GeneratorConfig {
                max_fix_attempts: deps.max_fix_attempts,
                loop_budget: Duration::from_secs(120).min(deps.generation_timeout),
            },
        );
        Self {
            llm: deps.llm,
            retriever: deps.retriever,
            cache: deps.cache,
            bus: deps.bus,
            exporter: deps.exporter,
            extractor,
            proposer,
            generator,
            approval: deps.approval,
            pipeline_version: deps.pipeline_version,
            generation_timeout: deps.generation_timeout,
            run_semaphore: Arc::new(Semaphore::new(deps.max_concurrent_runs.max(1))),
        }
    }

    /// Execute one run end to end. Exactly one terminal event is emitted
    /// on the progress bus: `complete` on success, `error` on failure.
    pub async fn run(&self, input: PipelineInput, cancel: CancellationToken) -> RunResult {
        let _permit = self
            .run_semaphore
            .acquire()
            .await
            .expect("run semaphore never closes");

        let run_input = match &input.source {
            RunSource::Image {
                bytes,
                mime_type,
                verdict,
            } => match admit_image(bytes, mime_type, verdict, &ImageLimits::default()) {
                Ok(info) => RunInput::Image {
                    digest: info.digest,
                    mime_type: mime_type.clone(),
                    byte_len: info.byte_len,
                },
                Err(e) => {
                    // Rejected before the pipeline starts: no partial run.
                    let context = RunContext::new(RunInput::Direct { pattern_id: None });
                    self.bus
                        .publish(PipelineEvent::error(&context.run_id, e.kind(), e.user_message()));
                    return Err(Box::new(FailedRun { error: e, context }));
                }
            },
            RunSource::Figma { file_key, .. } => RunInput::Figma {
                file_key: file_key.clone(),
            },
            RunSource::Direct { .. } => RunInput::Direct {
                pattern_id: input.pattern_override.clone(),
            },
        };

        let mut context = RunContext::new(run_input);
        let root_span = trace::run_span(&context.run_id, &context.input.digest());
        let _root_guard = root_span.enter();
        self.bus.publish(PipelineEvent::started(&context.run_id));

        match self.run_stages(&input, &mut context, &cancel).await {
            Ok((generated, report)) => {
                let total_ms = context.elapsed_ms();
                trace::record_run_result(&root_span, true, total_ms, context.cache_hit);
                self.bus.publish(PipelineEvent::complete(
                    &context.run_id,
                    context.cache_hit,
                    total_ms,
                ));
                info!(
                    run_id = %context.run_id,
                    total_ms,
                    cache_hit = context.cache_hit,
                    status = ?report.status,
                    "Run complete"
                );
                Ok(PipelineOutcome {
                    context,
                    generated,
                    report,
                })
            }
            Err(e) => {
                let total_ms = context.elapsed_ms();
                trace::record_run_result(&root_span, false, total_ms, false);
                self.bus.publish(PipelineEvent::error(
                    &context.run_id,
                    e.kind(),
                    e.user_message(),
                ));
                error!(run_id = %context.run_id, error = %e, "Run failed");
                Err(Box::new(FailedRun { error: e, context }))
            }
        }
    }

    async fn run_stages(
        &self,
        input: &PipelineInput,
        context: &mut RunContext,
        cancel: &CancellationToken,
    ) -> ForgeResult<(GeneratedCode, QualityReport)> {
        // ── Stage 1: token extraction ────────────────────────────────
        let tokens = match &input.source {
            RunSource::Image {
                bytes,
                mime_type,
                verdict,
            } => {
                let outcome = self
                    .stage(
                        context,
                        cancel,
                        StageId::TokenExtraction,
                        None,
                        self.extractor.extract_from_image(bytes, mime_type, verdict),
                    )
                    .await?;
                for warning in &outcome.warnings {
                    context.warn(StageId::TokenExtraction, warning.clone());
                }
                outcome.tokens
            }
            RunSource::Figma {
                file_key,
                access_token,
            } => {
                let outcome = self
                    .stage(
                        context,
                        cancel,
                        StageId::TokenExtraction,
                        None,
                        self.extractor.extract_from_figma(file_key, access_token),
                    )
                    .await?;
                for warning in &outcome.warnings {
                    context.warn(StageId::TokenExtraction, warning.clone());
                }
                outcome.tokens
            }
            RunSource::Direct { tokens, .. } => {
                let tokens = tokens.clone();
                self.stage(context, cancel, StageId::TokenExtraction, None, async {
                    let violations = tokens.validate();
                    if violations.is_empty() {
                        Ok(())
                    } else {
                        Err(ForgeError::InvalidInput(format!(
                            "supplied tokens violate invariants: {} at {}",
                            violations[0].reason, violations[0].path
                        )))
                    }
                })
                .await?;
                tokens
            }
        };
        context.outputs.tokens = Some(tokens.clone());

        // ── Stage 2: requirement proposal + approval ─────────────────
        let (classification, approved) = match &input.source {
            RunSource::Direct { requirements, .. } => {
                let requirements = requirements.clone();
                let classification = forge_core::requirements::ComponentClassification {
                    component_type: forge_core::requirements::ComponentType::Unknown,
                    confidence: 1.0,
                    candidates: vec![],
                };
                self.stage(context, cancel, StageId::RequirementProposal, None, async {
                    Ok(())
                })
                .await?;
                (classification, requirements)
            }
            source => {
                let analyzer_input = self.analyzer_input(source);
                let outcome = self
                    .stage(
                        context,
                        cancel,
                        StageId::RequirementProposal,
                        None,
                        self.proposer.propose(&analyzer_input, &tokens),
                    )
                    .await?;
                for warning in &outcome.warnings {
                    context.warn(StageId::RequirementProposal, warning.clone());
                }
                let reviewed = self.approval.review(outcome.proposals);
                context.outputs.proposals = Some(reviewed.clone());
                let approved = ApprovedRequirements::from_proposals(&reviewed);
                (outcome.classification, approved)
            }
        };
        context.outputs.classification = Some(classification.clone());

        // ── Stage 3: retrieval (or the pattern override) ─────────────
        let pattern = match &input.pattern_override {
            Some(pattern_id) => {
                let pattern = self
                    .retriever
                    .library()
                    .get_by_name(pattern_id)
                    .cloned()
                    .ok_or_else(|| {
                        ForgeError::InvalidInput(format!("unknown pattern '{pattern_id}'"))
                    })?;
                self.stage(context, cancel, StageId::PatternRetrieval, None, async {
                    Ok(())
                })
                .await?;
                Some(pattern)
            }
            None => {
                let query = RetrievalQuery::from_requirements(&classification, &approved);
                let embedding = match self.llm.embed(&[query.summary.clone()]).await {
                    Ok(mut vectors) if !vectors.is_empty() => Some(vectors.remove(0)),
                    Ok(_) => None,
                    Err(e) => {
                        context.warn(
                            StageId::PatternRetrieval,
                            format!("query embedding failed: {e}"),
                        );
                        None
                    }
                };
                let response = self
                    .stage(context, cancel, StageId::PatternRetrieval, None, async {
                        Ok(self.retriever.search(&query, embedding.as_deref()).await)
                    })
                    .await?;
                if response.metadata.degraded {
                    for warning in &response.metadata.warnings {
                        context.warn(StageId::PatternRetrieval, warning.clone());
                    }
                }
                let top = response.results.first().map(|r| r.pattern.clone());
                context.outputs.retrieval = Some(response);
                top
            }
        };
        let pattern_matched = pattern.is_some();

        // ── Cache check before generation ────────────────────────────
        let key = cache_key(
            &context.input.digest(),
            &tokens.hash(),
            &approved.hash(),
            pattern.as_ref().map(|p| p.id.as_str()).unwrap_or("none"),
            &self.pipeline_version,
        );
        context.cache_key = Some(key.clone());

        let (generated, applied_fixes) = match self.cache.get(&key).await {
            Some(entry) => {
                info!(run_id = %context.run_id, key = %key, "Generation cache hit");
                context.cache_hit = true;
                let mut cached = entry.value;
                cached.cache_hit = true;
                // Stage 4 is satisfied by the cache; keep the stage
                // sequence coherent for consumers.
                self.stage(context, cancel, StageId::CodeGeneration, None, async {
                    Ok(())
                })
                .await?;
                (cached, Vec::<AppliedFix>::new())
            }
            None => {
                let run_id = context.run_id.clone();
                let output = self
                    .stage(
                        context,
                        cancel,
                        StageId::CodeGeneration,
                        Some(self.generation_timeout),
                        self.generator
                            .generate(&run_id, pattern.as_ref(), &tokens, &approved),
                    )
                    .await?;
                context.cost.record(
                    output.usage.prompt_tokens,
                    output.usage.completion_tokens,
                    estimate_cost_usd(output.usage),
                );
                self.cache
                    .put(CacheEntry::new(key.clone(), output.generated.clone()))
                    .await;
                (output.generated, output.applied_fixes)
            }
        };
        context.outputs.generated = Some(generated.clone());

        // ── Stage 5: quality aggregation ─────────────────────────────
        let run_id = context.run_id.clone();
        let report = self
            .stage(context, cancel, StageId::QualityReport, None, async {
                Ok(aggregator::aggregate(
                    &run_id,
                    &generated,
                    &tokens,
                    applied_fixes,
                    pattern_matched,
                ))
            })
            .await?;
        context.outputs.report = Some(report.clone());

        Ok((generated, report))
    }

    fn analyzer_input(&self, source: &RunSource) -> AnalyzerInput {
        match source {
            RunSource::Image {
                bytes, mime_type, ..
            } => AnalyzerInput::from_image(format!(
                "data:{};base64,{}",
                mime_type,
                base64::engine::general_purpose::STANDARD.encode(bytes)
            )),
            RunSource::Figma { file_key, .. } => {
                AnalyzerInput::from_layers(format!("Figma file {file_key} published styles"))
            }
            RunSource::Direct { .. } => AnalyzerInput::default(),
        }
    }

    /// Run one stage under its timeout with cooperative cancellation,
    /// record the span, emit the progress event, and keep the context's
    /// completion order.
    async fn stage<T>(
        &self,
        context: &mut RunContext,
        cancel: &CancellationToken,
        stage: StageId,
        timeout_override: Option<Duration>,
        fut: impl std::future::Future<Output = ForgeResult<T>>,
    ) -> ForgeResult<T> {
        if cancel.is_cancelled() {
            let e = ForgeError::Cancelled;
            context.record_error(stage, &e);
            return Err(e);
        }

        let budget =
            timeout_override.unwrap_or_else(|| Duration::from_millis(stage.timeout_ms()));
        let span = trace::stage_span(&context.run_id, &stage.to_string());
        let guard = span.enter();
        let record = SpanRecordBuilder::new(SpanKind::Stage, trace::SPAN_STAGE, &context.run_id)
            .stage(&stage.to_string());
        let started = std::time::Instant::now();

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ForgeError::Cancelled),
            outcome = tokio::time::timeout(budget, fut) => match outcome {
                Ok(result) => result,
                Err(_) => Err(ForgeError::InternalTimeout {
                    stage: stage.to_string(),
                    budget_ms: budget.as_millis() as u64,
                }),
            },
        };
        let duration_ms = started.elapsed().as_millis() as u64;
        drop(guard);

        match result {
            Ok(value) => {
                trace::record_stage_result(&span, true, duration_ms);
                self.exporter.submit(record.finish(true));
                context.complete_stage(stage)?;
                self.bus.publish(PipelineEvent::stage_complete(
                    &context.run_id,
                    stage,
                    format!("{stage} complete"),
                ));
                Ok(value)
            }
            Err(e) => {
                trace::record_stage_result(&span, false, duration_ms);
                self.exporter.submit(record.finish(false));
                warn!(run_id = %context.run_id, stage = %stage, error = %e, "Stage failed");
                context.record_error(stage, &e);
                Err(e)
            }
        }
    }
}
