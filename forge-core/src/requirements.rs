//! Requirement proposals and component classification.
//!
//! The proposer stage emits proposals in four categories; an approval
//! collaborator then moves each proposal through the
//! `proposed → {approved | edited | removed}` state machine before
//! retrieval. Merging analyzer outputs is fully deterministic.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ForgeError, ForgeResult};

/// The component families the classifier distinguishes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ComponentType {
    Button,
    Card,
    Input,
    Badge,
    Alert,
    Checkbox,
    RadioGroup,
    Select,
    Switch,
    Tabs,
    #[default]
    Unknown,
}

impl ComponentType {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "button" => Self::Button,
            "card" => Self::Card,
            "input" | "textfield" | "text-field" => Self::Input,
            "badge" | "chip" | "tag" => Self::Badge,
            "alert" | "banner" | "callout" => Self::Alert,
            "checkbox" => Self::Checkbox,
            "radiogroup" | "radio-group" | "radio" => Self::RadioGroup,
            "select" | "dropdown" | "combobox" => Self::Select,
            "switch" | "toggle" => Self::Switch,
            "tabs" | "tablist" => Self::Tabs,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The four requirement dimensions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RequirementCategory {
    Props,
    Events,
    States,
    Accessibility,
}

impl RequirementCategory {
    pub const ALL: [Self; 4] = [Self::Props, Self::Events, Self::States, Self::Accessibility];
}

impl std::fmt::Display for RequirementCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Props => write!(f, "props"),
            Self::Events => write!(f, "events"),
            Self::States => write!(f, "states"),
            Self::Accessibility => write!(f, "accessibility"),
        }
    }
}

/// Lifecycle of one proposal. Only `Approved` and `Edited` proposals pass
/// to retrieval and generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProposalStatus {
    Proposed,
    Approved,
    Edited { new_value: String },
    Removed,
}

/// One inferred requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementProposal {
    pub category: RequirementCategory,
    pub name: String,
    pub value: String,
    pub confidence: f64,
    pub rationale: String,
    #[serde(flatten)]
    pub status: ProposalStatus,
    /// Which analyzer produced this proposal; tie-breaker during merge.
    pub analyzer: String,
}

impl RequirementProposal {
    pub fn new(
        category: RequirementCategory,
        name: impl Into<String>,
        value: impl Into<String>,
        confidence: f64,
        rationale: impl Into<String>,
        analyzer: impl Into<String>,
    ) -> Self {
        Self {
            category,
            name: name.into(),
            value: value.into(),
            confidence: confidence.clamp(0.0, 1.0),
            rationale: rationale.into(),
            status: ProposalStatus::Proposed,
            analyzer: analyzer.into(),
        }
    }

    fn transition(&mut self, next: ProposalStatus) -> ForgeResult<()> {
        if self.status != ProposalStatus::Proposed {
            return Err(ForgeError::InvalidInput(format!(
                "proposal '{}' already resolved, cannot transition again",
                self.name
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn approve(&mut self) -> ForgeResult<()> {
        self.transition(ProposalStatus::Approved)
    }

    pub fn edit(&mut self, new_value: impl Into<String>) -> ForgeResult<()> {
        self.transition(ProposalStatus::Edited {
            new_value: new_value.into(),
        })
    }

    pub fn remove(&mut self) -> ForgeResult<()> {
        self.transition(ProposalStatus::Removed)
    }

    /// Whether this proposal flows into retrieval and generation.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            ProposalStatus::Approved | ProposalStatus::Edited { .. }
        )
    }

    /// The value to use downstream, honoring edits.
    pub fn effective_value(&self) -> &str {
        match &self.status {
            ProposalStatus::Edited { new_value } => new_value,
            _ => &self.value,
        }
    }
}

/// Classifier output: best guess plus the runner-up candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentClassification {
    pub component_type: ComponentType,
    pub confidence: f64,
    pub candidates: Vec<(ComponentType, f64)>,
}

/// Merge analyzer outputs, deduplicating by `(category, name)`.
///
/// The higher-confidence duplicate wins and keeps its rationale; exact
/// confidence ties resolve to the lexicographically smaller analyzer id.
/// Output is sorted by category then name, so the result is independent of
/// analyzer completion order.
pub fn merge_proposals(proposals: Vec<RequirementProposal>) -> Vec<RequirementProposal> {
    use std::collections::BTreeMap;

    let mut best: BTreeMap<(RequirementCategory, String), RequirementProposal> = BTreeMap::new();
    for p in proposals {
        let key = (p.category, p.name.clone());
        match best.get(&key) {
            None => {
                best.insert(key, p);
            }
            Some(existing) => {
                let replace = p.confidence > existing.confidence
                    || (p.confidence == existing.confidence && p.analyzer < existing.analyzer);
                if replace {
                    best.insert(key, p);
                }
            }
        }
    }
    best.into_values().collect()
}

/// The approved subset of a proposal list, partitioned by category, as fed
/// to retrieval and generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApprovedRequirements {
    pub props: Vec<RequirementProposal>,
    pub events: Vec<RequirementProposal>,
    pub states: Vec<RequirementProposal>,
    pub accessibility: Vec<RequirementProposal>,
}

impl ApprovedRequirements {
    /// Keep only active (approved or edited) proposals.
    pub fn from_proposals(proposals: &[RequirementProposal]) -> Self {
        let mut out = Self::default();
        for p in proposals.iter().filter(|p| p.is_active()) {
            match p.category {
                RequirementCategory::Props => out.props.push(p.clone()),
                RequirementCategory::Events => out.events.push(p.clone()),
                RequirementCategory::States => out.states.push(p.clone()),
                RequirementCategory::Accessibility => out.accessibility.push(p.clone()),
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
            && self.events.is_empty()
            && self.states.is_empty()
            && self.accessibility.is_empty()
    }

    pub fn len(&self) -> usize {
        self.props.len() + self.events.len() + self.states.len() + self.accessibility.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequirementProposal> {
        self.props
            .iter()
            .chain(self.events.iter())
            .chain(self.states.iter())
            .chain(self.accessibility.iter())
    }

    pub fn prop_names(&self) -> Vec<String> {
        self.props.iter().map(|p| p.name.clone()).collect()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events.iter().map(|p| p.name.clone()).collect()
    }

    pub fn state_names(&self) -> Vec<String> {
        self.states.iter().map(|p| p.name.clone()).collect()
    }

    pub fn a11y_names(&self) -> Vec<String> {
        self.accessibility.iter().map(|p| p.name.clone()).collect()
    }

    /// Canonical JSON of the approved subset.
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(self).expect("requirement serialization is infallible")
    }

    /// SHA-256 over the canonical serialization, hex-encoded.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_canonical_json().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
