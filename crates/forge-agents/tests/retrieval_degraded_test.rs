//! Degraded retrieval: an unreachable vector index downgrades to
//! BM25-only with adjusted weights and a recorded warning; the run still
//! completes.

mod common;

use std::sync::Arc;

use common::{harness, svg_upload, ScriptedLlm};
use forge_agents::orchestrator::{PipelineInput, RunSource};
use forge_core::context::StageId;
use forge_core::quality::ReportStatus;
use forge_core::retrieval::vector::{InMemoryVectorIndex, UnreachableVectorIndex, VectorIndex};
use forge_core::tokens::UploadVerdict;
use tokio_util::sync::CancellationToken;

fn image_input() -> PipelineInput {
    PipelineInput {
        source: RunSource::Image {
            bytes: svg_upload(),
            mime_type: "image/svg+xml".into(),
            verdict: UploadVerdict::safe(),
        },
        pattern_override: None,
    }
}

#[tokio::test]
async fn test_vector_index_down_degrades_to_bm25() {
    let vector: Arc<dyn VectorIndex> = Arc::new(UnreachableVectorIndex);
    let h = harness(ScriptedLlm::happy_path(), Some(vector));

    let outcome = h
        .orchestrator
        .run(image_input(), CancellationToken::new())
        .await
        .expect("run completes despite vector outage");

    let retrieval = outcome.context.outputs.retrieval.as_ref().unwrap();
    assert!(retrieval.metadata.degraded);
    assert_eq!(retrieval.metadata.methods_used, vec!["bm25"]);
    assert_eq!(retrieval.metadata.weights.bm25, 1.0);
    assert_eq!(retrieval.metadata.weights.semantic, 0.0);

    // The outage is a warning on the run context, not a failure.
    assert!(outcome
        .context
        .warnings
        .iter()
        .any(|w| w.stage == StageId::PatternRetrieval));
    assert_eq!(outcome.report.status, ReportStatus::Pass);
}

#[tokio::test]
async fn test_healthy_vector_index_uses_both_methods() {
    let mut index = InMemoryVectorIndex::new();
    // The scripted embedder folds bytes into 8 dims; a uniform positive
    // vector correlates with any summary embedding.
    index.insert("shadcn-button", vec![1.0; 8]);
    let vector: Arc<dyn VectorIndex> = Arc::new(index);
    let h = harness(ScriptedLlm::happy_path(), Some(vector));

    let outcome = h
        .orchestrator
        .run(image_input(), CancellationToken::new())
        .await
        .expect("run completes");

    let retrieval = outcome.context.outputs.retrieval.as_ref().unwrap();
    assert!(!retrieval.metadata.degraded);
    assert_eq!(retrieval.metadata.methods_used, vec!["bm25", "semantic"]);
    assert_eq!(retrieval.metadata.weights.bm25, 0.3);
    assert_eq!(retrieval.results[0].pattern.id, "shadcn-button");
}

#[tokio::test]
async fn test_ranks_and_explanations_present() {
    let h = harness(ScriptedLlm::happy_path(), None);
    let outcome = h
        .orchestrator
        .run(image_input(), CancellationToken::new())
        .await
        .expect("run completes");

    let retrieval = outcome.context.outputs.retrieval.as_ref().unwrap();
    let top = &retrieval.results[0];
    assert_eq!(top.ranks.bm25_rank, 1);
    assert!(top.explanation.matched_props.contains(&"variant".to_string()));
    assert!(top
        .explanation
        .matched_a11y
        .contains(&"aria-label".to_string()));
    assert!(!top.explanation.match_reason.is_empty());
}
