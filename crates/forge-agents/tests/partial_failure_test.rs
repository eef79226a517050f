//! Partial-failure policy: analyzer quorum, rate-limited upstream, and
//! the no-pattern generation fallback.

mod common;

use common::{
    a11y_analyzer_json, classification_json, clean_component, clean_stories, events_analyzer_json,
    generation_json, harness, svg_upload, vision_json, ScriptedLlm,
};
use forge_agents::orchestrator::{PipelineInput, RunSource};
use forge_core::GenerationCache;
use forge_core::error::{ErrorKind, ForgeError};
use forge_core::requirements::{ApprovedRequirements, RequirementCategory, RequirementProposal};
use forge_core::tokens::{default_tokens, UploadVerdict};
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

/// Script with only `ok_analyzers` succeeding; the rest fail upstream.
fn partial_analyzer_llm(ok_analyzers: &[&'static str]) -> ScriptedLlm {
    let llm = ScriptedLlm::new();
    *llm.vision.lock().unwrap() = Some(Ok(vision_json()));
    *llm.classifier.lock().unwrap() = Some(Ok(classification_json("Button", 0.95)));
    {
        let mut analyzers = llm.analyzers.lock().unwrap();
        for key in ok_analyzers {
            let payload = match *key {
                "events" => events_analyzer_json(),
                "a11y" => a11y_analyzer_json(),
                "props" => common::props_analyzer_json(),
                "states" => common::states_analyzer_json(),
                other => panic!("unknown analyzer {other}"),
            };
            analyzers.insert(*key, Ok(payload));
        }
    }
    llm.push_generation(Ok(generation_json(&clean_component(), &clean_stories())));
    llm
}

#[tokio::test]
async fn test_two_analyzers_suffice_with_warnings() {
    let h = harness(partial_analyzer_llm(&["events", "a11y"]), None);
    let outcome = h
        .orchestrator
        .run(image_input(), CancellationToken::new())
        .await
        .expect("two analyzer successes keep the run alive");

    // The failed categories are simply empty.
    let proposals = outcome.context.outputs.proposals.as_ref().unwrap();
    assert!(proposals
        .iter()
        .all(|p| p.category != RequirementCategory::Props));
    assert!(proposals
        .iter()
        .any(|p| p.category == RequirementCategory::Events));

    // And the losses are surfaced as warnings.
    let warning_text: Vec<&str> = outcome
        .context
        .warnings
        .iter()
        .map(|w| w.message.as_str())
        .collect();
    assert!(warning_text.iter().any(|w| w.contains("props")));
    assert!(warning_text.iter().any(|w| w.contains("states")));
}

#[tokio::test]
async fn test_one_analyzer_fails_the_stage() {
    let h = harness(partial_analyzer_llm(&["events"]), None);
    let failed = h
        .orchestrator
        .run(image_input(), CancellationToken::new())
        .await
        .err()
        .expect("below quorum fails the run");

    assert_eq!(failed.error.kind(), ErrorKind::UpstreamUnavailable);
    assert!(failed
        .context
        .errors
        .iter()
        .any(|e| e.stage == forge_core::context::StageId::RequirementProposal));
}

#[tokio::test]
async fn test_classifier_failure_is_fatal() {
    let llm = partial_analyzer_llm(&["events", "a11y", "props", "states"]);
    *llm.classifier.lock().unwrap() =
        Some(Err(ForgeError::UpstreamUnavailable("500 from provider".into())));
    let h = harness(llm, None);

    let failed = h
        .orchestrator
        .run(image_input(), CancellationToken::new())
        .await
        .err()
        .expect("classifier failure is fatal");
    assert_eq!(failed.error.kind(), ErrorKind::UpstreamUnavailable);
}

#[tokio::test]
async fn test_rate_limited_generation_surfaces_retry_after_and_skips_cache() {
    let llm = ScriptedLlm::new();
    llm.push_generation(Err(ForgeError::UpstreamRateLimit {
        retry_after_secs: 30,
    }));
    let h = harness(llm, None);
    let mut rx = h.bus.subscribe();

    let mut p = RequirementProposal::new(
        RequirementCategory::Props,
        "variant",
        "default",
        0.9,
        "",
        "props",
    );
    p.approve().unwrap();
    let input = PipelineInput {
        source: RunSource::Direct {
            tokens: default_tokens(),
            requirements: ApprovedRequirements::from_proposals(&[p]),
        },
        pattern_override: Some("shadcn-button".into()),
    };

    let failed = h
        .orchestrator
        .run(input, CancellationToken::new())
        .await
        .err()
        .expect("rate limit fails the run");

    assert_eq!(failed.error.kind(), ErrorKind::UpstreamRateLimit);
    assert_eq!(failed.error.retry_after(), Some(30));

    // No cache entry was written for the failed generation.
    let key = failed.context.cache_key.as_ref().expect("key was computed");
    assert!(h.cache.get(key).await.is_none());

    // Terminal error event carries the stable code.
    let mut saw_error = false;
    while let Ok(event) = rx.try_recv() {
        if event.is_terminal() {
            let line = event.to_sse_line();
            assert!(line.contains("\"event\":\"error\""));
            assert!(line.contains("upstream_rate_limit"));
            saw_error = true;
        }
    }
    assert!(saw_error);
}

#[tokio::test]
async fn test_no_matching_pattern_uses_fallback_generation_path() {
    let llm = ScriptedLlm::new();
    *llm.vision.lock().unwrap() = Some(Ok(vision_json()));
    // A component family with no counterpart in the library.
    *llm.classifier.lock().unwrap() = Some(Ok(classification_json("Carousel", 0.6)));
    {
        let mut analyzers = llm.analyzers.lock().unwrap();
        analyzers.insert(
            "events",
            Ok(r#"{ "proposals": [ { "name": "onSlide", "value": "(index: number) => void", "confidence": 0.8, "rationale": "slides advance" } ] }"#.to_string()),
        );
        analyzers.insert(
            "states",
            Ok(r#"{ "proposals": [ { "name": "autoplay", "value": "true", "confidence": 0.6, "rationale": "timer dots visible" } ] }"#.to_string()),
        );
    }
    llm.push_generation(Ok(generation_json(&clean_component(), &clean_stories())));
    let h = harness(llm, None);

    let outcome = h
        .orchestrator
        .run(image_input(), CancellationToken::new())
        .await
        .expect("run completes without a pattern");

    let retrieval = outcome.context.outputs.retrieval.as_ref().unwrap();
    assert!(retrieval.results.is_empty(), "no pattern should match");
    assert!(!outcome.report.pattern_matched);
    assert!(outcome
        .generated
        .component
        .contains("pattern_id: none"));
    assert!(outcome.report.render_html().contains("No pattern matched"));
}

#[tokio::test]
async fn test_cancellation_marks_run_cancelled() {
    let h = harness(ScriptedLlm::happy_path(), None);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let failed = h
        .orchestrator
        .run(image_input(), cancel)
        .await
        .err()
        .expect("pre-cancelled run fails immediately");
    assert_eq!(failed.error.kind(), ErrorKind::Cancelled);
    assert!(failed.context.completed_stages.is_empty());
}
