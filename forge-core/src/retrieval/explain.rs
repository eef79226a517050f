//! Retrieval explanations.
//!
//! Every returned pattern carries the intersection of the requested
//! props/variants/a11y features with the pattern's metadata, a one-sentence
//! reason stitched from those matches, and the per-method ranks.

use serde::{Deserialize, Serialize};

use super::fusion::{FusedScore, FusionWeights};
use super::query::RetrievalQuery;
use crate::patterns::Pattern;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchExplanation {
    pub matched_props: Vec<String>,
    pub matched_variants: Vec<String>,
    pub matched_a11y: Vec<String>,
    pub match_reason: String,
    pub weight_breakdown: WeightBreakdown,
}

/// How the weighted score decomposes, for the response metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightBreakdown {
    pub bm25_weight: f64,
    pub bm25_score: f64,
    pub semantic_weight: f64,
    pub semantic_score: f64,
    pub weighted_score: f64,
}

/// Case-insensitive intersection preserving the request's order.
fn intersect(requested: &[String], available: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|r| available.iter().any(|a| a.eq_ignore_ascii_case(r)))
        .cloned()
        .collect()
}

pub fn explain(
    pattern: &Pattern,
    query: &RetrievalQuery,
    score: &FusedScore,
    weights: &FusionWeights,
) -> MatchExplanation {
    let matched_props = intersect(&query.requested_props, &pattern.metadata.props);
    let matched_variants = intersect(&query.requested_variants, &pattern.metadata.variants);
    let matched_a11y = intersect(&query.requested_a11y, &pattern.metadata.a11y);

    let mut clauses: Vec<String> = Vec::new();
    if !matched_props.is_empty() {
        clauses.push(format!(
            "supports {} of {} requested props ({})",
            matched_props.len(),
            query.requested_props.len(),
            matched_props.join(", ")
        ));
    }
    if !matched_variants.is_empty() {
        clauses.push(format!("offers the {} variants", matched_variants.join(", ")));
    }
    if !matched_a11y.is_empty() {
        clauses.push(format!(
            "covers the {} accessibility features",
            matched_a11y.join(", ")
        ));
    }
    if clauses.is_empty() {
        clauses.push("matched on overall description similarity".to_string());
    }

    let match_reason = format!(
        "{} {} (lexical rank #{}, semantic rank #{}).",
        pattern.name,
        clauses.join(", "),
        score.bm25_rank,
        score.semantic_rank
    );

    MatchExplanation {
        matched_props,
        matched_variants,
        matched_a11y,
        match_reason,
        weight_breakdown: WeightBreakdown {
            bm25_weight: weights.bm25,
            bm25_score: score.bm25,
            semantic_weight: weights.semantic,
            semantic_score: score.semantic,
            weighted_score: score.weighted,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::PatternMetadata;
    use crate::requirements::{
        ApprovedRequirements, ComponentClassification, ComponentType, RequirementCategory,
        RequirementProposal,
    };

    fn pattern() -> Pattern {
        Pattern {
            id: "shadcn-button".into(),
            name: "Button".into(),
            source: "shadcn/ui".into(),
            version: "1.2.0".into(),
            code: String::new(),
            metadata: PatternMetadata {
                component_type: ComponentType::Button,
                description: "button".into(),
                props: vec!["variant".into(), "size".into(), "loading".into()],
                variants: vec!["default".into(), "destructive".into()],
                states: vec!["hover".into()],
                a11y: vec!["aria-label".into(), "focus-visible".into()],
            },
            bm25_doc: String::new(),
            dense_embedding: None,
        }
    }

    fn query() -> RetrievalQuery {
        let mut p = RequirementProposal::new(
            RequirementCategory::Props,
            "variant",
            "default|destructive",
            0.9,
            "",
            "props",
        );
        p.approve().unwrap();
        let mut a = RequirementProposal::new(
            RequirementCategory::Accessibility,
            "aria-label",
            "string",
            0.9,
            "",
            "a11y",
        );
        a.approve().unwrap();
        let approved = ApprovedRequirements::from_proposals(&[p, a]);
        RetrievalQuery::from_requirements(
            &ComponentClassification {
                component_type: ComponentType::Button,
                confidence: 0.9,
                candidates: vec![],
            },
            &approved,
        )
    }

    fn score() -> FusedScore {
        FusedScore {
            pattern_id: "shadcn-button".into(),
            bm25: 0.8,
            semantic: 0.95,
            weighted: 0.905,
            bm25_rank: 2,
            semantic_rank: 1,
        }
    }

    #[test]
    fn test_matched_sets_are_intersections() {
        let e = explain(&pattern(), &query(), &score(), &FusionWeights::default());
        assert_eq!(e.matched_props, vec!["variant"]);
        assert_eq!(e.matched_variants, vec!["default", "destructive"]);
        assert_eq!(e.matched_a11y, vec!["aria-label"]);
    }

    #[test]
    fn test_matched_props_subset_of_request() {
        let q = query();
        let e = explain(&pattern(), &q, &score(), &FusionWeights::default());
        for p in &e.matched_props {
            assert!(q.requested_props.contains(p));
        }
    }

    #[test]
    fn test_reason_mentions_ranks() {
        let e = explain(&pattern(), &query(), &score(), &FusionWeights::default());
        assert!(e.match_reason.contains("#2"));
        assert!(e.match_reason.contains("#1"));
        assert!(e.match_reason.starts_with("Button"));
    }

    #[test]
    fn test_no_overlap_falls_back_to_description_reason() {
        let mut p = pattern();
        p.metadata.props.clear();
        p.metadata.variants.clear();
        p.metadata.a11y.clear();
        let e = explain(&p, &query(), &score(), &FusionWeights::default());
        assert!(e.match_reason.contains("description similarity"));
    }

    #[test]
    fn test_weight_breakdown_carries_both_components() {
        let e = explain(&pattern(), &query(), &score(), &FusionWeights::default());
        assert_eq!(e.weight_breakdown.bm25_weight, 0.3);
        assert_eq!(e.weight_breakdown.semantic_weight, 0.7);
        assert!((e.weight_breakdown.weighted_score - 0.905).abs() < 1e-9);
    }
}
