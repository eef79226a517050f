//! Generation cache: identical inputs hit the cache on the second run,
//! return byte-identical code, and skip the generator entirely.

mod common;

use std::time::Instant;

use common::{clean_component, clean_stories, generation_json, harness, ScriptedLlm};
use forge_agents::orchestrator::{PipelineInput, RunSource};
use forge_core::requirements::{ApprovedRequirements, RequirementCategory, RequirementProposal};
use forge_core::tokens::default_tokens;
use tokio_util::sync::CancellationToken;

fn requirements() -> ApprovedRequirements {
    let mut p = RequirementProposal::new(
        RequirementCategory::Props,
        "variant",
        "default|destructive",
        0.9,
        "",
        "props",
    );
    p.approve().unwrap();
    ApprovedRequirements::from_proposals(&[p])
}

fn direct_input() -> PipelineInput {
    PipelineInput {
        source: RunSource::Direct {
            tokens: default_tokens(),
            requirements: requirements(),
        },
        pattern_override: Some("shadcn-button".into()),
    }
}

#[tokio::test]
async fn test_second_run_hits_cache_with_identical_bytes() {
    let llm = ScriptedLlm::new();
    // Exactly one generation scripted: a second generator call would fail.
    llm.push_generation(Ok(generation_json(&clean_component(), &clean_stories())));
    let h = harness(llm, None);

    let first = h
        .orchestrator
        .run(direct_input(), CancellationToken::new())
        .await
        .expect("first run generates");
    assert!(!first.context.cache_hit);

    let started = Instant::now();
    let second = h
        .orchestrator
        .run(direct_input(), CancellationToken::new())
        .await
        .expect("second run is served from cache");
    let elapsed = started.elapsed();

    assert!(second.context.cache_hit);
    assert!(second.generated.cache_hit);
    assert_eq!(second.generated.component, first.generated.component);
    assert_eq!(second.context.cache_key, first.context.cache_key);
    assert!(
        elapsed.as_millis() < 500,
        "cache hit took {}ms",
        elapsed.as_millis()
    );
}

#[tokio::test]
async fn test_changed_requirements_miss_cache() {
    let llm = ScriptedLlm::new();
    llm.push_generation(Ok(generation_json(&clean_component(), &clean_stories())));
    llm.push_generation(Ok(generation_json(&clean_component(), &clean_stories())));
    let h = harness(llm, None);

    let first = h
        .orchestrator
        .run(direct_input(), CancellationToken::new())
        .await
        .expect("first run");

    let mut other = requirements();
    let mut extra = RequirementProposal::new(
        RequirementCategory::States,
        "loading",
        "true",
        0.9,
        "",
        "states",
    );
    extra.approve().unwrap();
    other.states.push(extra);

    let second = h
        .orchestrator
        .run(
            PipelineInput {
                source: RunSource::Direct {
                    tokens: default_tokens(),
                    requirements: other,
                },
                pattern_override: Some("shadcn-button".into()),
            },
            CancellationToken::new(),
        )
        .await
        .expect("second run generates fresh");

    assert!(!second.context.cache_hit);
    assert_ne!(second.context.cache_key, first.context.cache_key);
}

#[tokio::test]
async fn test_cache_hit_emits_full_progress_sequence() {
    let llm = ScriptedLlm::new();
    llm.push_generation(Ok(generation_json(&clean_component(), &clean_stories())));
    let h = harness(llm, None);

    h.orchestrator
        .run(direct_input(), CancellationToken::new())
        .await
        .expect("first run");

    let mut rx = h.bus.subscribe();
    h.orchestrator
        .run(direct_input(), CancellationToken::new())
        .await
        .expect("cached run");

    let mut progresses = Vec::new();
    let mut terminals = 0;
    while let Ok(event) = rx.try_recv() {
        if let Some(p) = event.progress() {
            progresses.push(p);
        }
        if event.is_terminal() {
            terminals += 1;
        }
    }
    assert_eq!(progresses, vec![0, 15, 30, 50, 75, 90, 100]);
    assert_eq!(terminals, 1);
}
