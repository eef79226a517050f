//! Retrieval query construction.
//!
//! One structured query combines a component-type filter, a keyword bag of
//! requested props/variants/a11y features for BM25, and a natural-language
//! summary of the requirement set for the embedder.

use serde::{Deserialize, Serialize};

use crate::requirements::{ApprovedRequirements, ComponentClassification, ComponentType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalQuery {
    /// Hard filter; `None` disables type filtering.
    pub component_type: Option<ComponentType>,
    /// Keyword bag for lexical scoring.
    pub keywords: Vec<String>,
    /// Natural-language summary embedded for semantic scoring.
    pub summary: String,
    /// Requested props, kept separately for explanation building.
    pub requested_props: Vec<String>,
    pub requested_variants: Vec<String>,
    pub requested_a11y: Vec<String>,
}

impl RetrievalQuery {
    pub fn from_requirements(
        classification: &ComponentClassification,
        requirements: &ApprovedRequirements,
    ) -> Self {
        let requested_props = requirements.prop_names();
        let requested_a11y = requirements.a11y_names();

        // Variant-style props carry their values as requested variants.
        let requested_variants: Vec<String> = requirements
            .props
            .iter()
            .filter(|p| p.name == "variant" || p.name == "size")
            .flat_map(|p| {
                p.effective_value()
                    .split([',', '|'])
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut keywords: Vec<String> = Vec::new();
        keywords.push(classification.component_type.to_string().to_lowercase());
        keywords.extend(requested_props.iter().map(|s| s.to_lowercase()));
        keywords.extend(requested_variants.iter().map(|s| s.to_lowercase()));
        keywords.extend(requirements.event_names().iter().map(|s| s.to_lowercase()));
        keywords.extend(requirements.state_names().iter().map(|s| s.to_lowercase()));
        keywords.extend(requested_a11y.iter().map(|s| s.to_lowercase()));
        keywords.dedup();

        let summary = build_summary(classification, requirements);

        Self {
            component_type: match classification.component_type {
                ComponentType::Unknown => None,
                other => Some(other),
            },
            keywords,
            summary,
            requested_props,
            requested_variants,
            requested_a11y,
        }
    }

    /// The keyword bag joined for the BM25 scorer.
    pub fn keyword_text(&self) -> String {
        self.keywords.join(" ")
    }
}

fn join_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}

fn build_summary(
    classification: &ComponentClassification,
    requirements: &ApprovedRequirements,
) -> String {
    format!(
        "A {} component with props: {}; events: {}; states: {}; accessibility: {}.",
        classification.component_type,
        join_or(&requirements.prop_names(), "none"),
        join_or(&requirements.event_names(), "none"),
        join_or(&requirements.state_names(), "none"),
        join_or(&requirements.a11y_names(), "none"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::{RequirementCategory, RequirementProposal};

    fn approved(category: RequirementCategory, name: &str, value: &str) -> RequirementProposal {
        let mut p = RequirementProposal::new(category, name, value, 0.9, "test", "test");
        p.approve().unwrap();
        p
    }

    fn classification() -> ComponentClassification {
        ComponentClassification {
            component_type: ComponentType::Button,
            confidence: 0.95,
            candidates: vec![
                (ComponentType::Button, 0.95),
                (ComponentType::Badge, 0.03),
                (ComponentType::Card, 0.02),
            ],
        }
    }

    fn requirements() -> ApprovedRequirements {
        ApprovedRequirements::from_proposals(&[
            approved(RequirementCategory::Props, "variant", "default|destructive"),
            approved(RequirementCategory::Props, "size", "sm|md|lg"),
            approved(RequirementCategory::Events, "onClick", "() => void"),
            approved(RequirementCategory::States, "hover", "true"),
            approved(RequirementCategory::Accessibility, "aria-label", "string"),
        ])
    }

    #[test]
    fn test_keywords_cover_all_categories() {
        let q = RetrievalQuery::from_requirements(&classification(), &requirements());
        for expected in ["button", "variant", "onclick", "hover", "aria-label"] {
            assert!(
                q.keywords.iter().any(|k| k == expected),
                "missing keyword {expected}: {:?}",
                q.keywords
            );
        }
    }

    #[test]
    fn test_variant_values_become_requested_variants() {
        let q = RetrievalQuery::from_requirements(&classification(), &requirements());
        assert!(q.requested_variants.contains(&"destructive".to_string()));
        assert!(q.requested_variants.contains(&"lg".to_string()));
    }

    #[test]
    fn test_summary_is_natural_language() {
        let q = RetrievalQuery::from_requirements(&classification(), &requirements());
        assert!(q.summary.starts_with("A Button component"));
        assert!(q.summary.contains("aria-label"));
    }

    #[test]
    fn test_unknown_type_disables_filter() {
        let mut c = classification();
        c.component_type = ComponentType::Unknown;
        let q = RetrievalQuery::from_requirements(&c, &requirements());
        assert!(q.component_type.is_none());
    }
}
