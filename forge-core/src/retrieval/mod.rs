//! Hybrid pattern retrieval: BM25 ⊕ dense-vector fusion with explanations.
//!
//! The retriever owns the lexical index and a seam to the vector index.
//! When the vector index is unreachable the search degrades to BM25-only
//! with adjusted weights; that is a warning, never a failure.

pub mod bm25;
pub mod explain;
pub mod fusion;
pub mod query;
pub mod vector;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::patterns::{Pattern, PatternLibrary};
use bm25::{Bm25Index, Bm25Params};
use explain::MatchExplanation;
use fusion::{fuse, Candidate, FusionWeights};
use query::RetrievalQuery;
use vector::VectorIndex;

pub use explain::WeightBreakdown;
pub use fusion::FusedScore;

/// Tuning for one retriever instance.
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Result count after ranking. Default 3.
    pub k: usize,
    pub weights: FusionWeights,
    pub bm25: Bm25Params,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            k: 3,
            weights: FusionWeights::default(),
            bm25: Bm25Params::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalScores {
    pub bm25: f64,
    pub semantic: f64,
    pub weighted: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalRanks {
    pub bm25_rank: usize,
    pub semantic_rank: usize,
}

/// One ranked pattern with its scores, pre-truncation ranks, and
/// explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub pattern: Pattern,
    pub scores: RetrievalScores,
    pub ranks: RetrievalRanks,
    pub explanation: MatchExplanation,
}

/// Response-level metadata, including the degraded-mode flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalMetadata {
    pub methods_used: Vec<String>,
    pub weights: FusionWeights,
    pub latency_ms: u64,
    pub total_candidates: usize,
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResponse {
    pub results: Vec<RetrievalResult>,
    pub metadata: RetrievalMetadata,
}

/// The hybrid retriever. Shared read-only across runs.
pub struct Retriever {
    library: Arc<PatternLibrary>,
    bm25: Bm25Index,
    /// Pattern ids in BM25 corpus order.
    corpus_ids: Vec<String>,
    vector: Option<Arc<dyn VectorIndex>>,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(
        library: Arc<PatternLibrary>,
        vector: Option<Arc<dyn VectorIndex>>,
        config: RetrieverConfig,
    ) -> Self {
        let corpus_ids: Vec<String> = library.iter().map(|(_, p)| p.id.clone()).collect();
        let bm25 = Bm25Index::build(
            library.iter().map(|(_, p)| p.bm25_doc.as_str()),
            config.bm25.clone(),
        );
        Self {
            library,
            bm25,
            corpus_ids,
            vector,
            config,
        }
    }

    pub fn library(&self) -> &Arc<PatternLibrary> {
        &self.library
    }

    /// Rank the library against the query. `query_embedding` is the
    /// embedded natural-language summary; `None` forces BM25-only mode.
    pub async fn search(
        &self,
        query: &RetrievalQuery,
        query_embedding: Option<&[f32]>,
    ) -> RetrievalResponse {
        let start = Instant::now();
        let mut warnings: Vec<String> = Vec::new();

        let bm25_scores = self.bm25.scores(&query.keyword_text());

        // Semantic scores keyed by pattern id, when the index is reachable.
        let mut degraded = false;
        let semantic_by_id: HashMap<String, f64> = match (&self.vector, query_embedding) {
            (Some(index), Some(embedding)) => {
                match index.query(embedding, self.corpus_ids.len().max(1)).await {
                    Ok(hits) => hits
                        .into_iter()
                        .map(|h| (h.pattern_id, h.similarity))
                        .collect(),
                    Err(e) => {
                        warn!(error = %e, "Vector index unreachable, degrading to BM25-only");
                        warnings.push(format!("vector index unavailable: {e}"));
                        degraded = true;
                        HashMap::new()
                    }
                }
            }
            (None, _) => {
                warnings.push("no vector index configured".into());
                degraded = true;
                HashMap::new()
            }
            (_, None) => {
                warnings.push("no query embedding available".into());
                degraded = true;
                HashMap::new()
            }
        };

        let weights = if degraded {
            FusionWeights::bm25_only()
        } else {
            self.config.weights
        };

        // Candidate set: patterns surviving the component-type filter.
        let typed: Vec<Candidate> = self
            .library
            .iter()
            .enumerate()
            .filter(|(_, (_, pattern))| match query.component_type {
                Some(ct) => pattern.metadata.component_type == ct,
                None => true,
            })
            .map(|(corpus_idx, (_, pattern))| Candidate {
                pattern_id: pattern.id.clone(),
                bm25_raw: bm25_scores.get(corpus_idx).copied().unwrap_or(0.0),
                semantic_raw: semantic_by_id.get(&pattern.id).copied().unwrap_or(0.0),
            })
            .collect();
        let total_candidates = typed.len();

        // A candidate with no evidence from any active method carries no
        // signal; when nothing scores, the retriever returns empty and the
        // generator takes its no-pattern path.
        let candidates: Vec<Candidate> = typed
            .into_iter()
            .filter(|c| c.bm25_raw > 0.0 || c.semantic_raw > 0.0)
            .collect();

        let fused = fuse(&candidates, &weights);

        let results: Vec<RetrievalResult> = fused
            .iter()
            .take(self.config.k)
            .filter_map(|score| {
                let pattern = self.library.get_by_name(&score.pattern_id)?;
                Some(RetrievalResult {
                    pattern: pattern.clone(),
                    scores: RetrievalScores {
                        bm25: score.bm25,
                        semantic: score.semantic,
                        weighted: score.weighted,
                    },
                    ranks: RetrievalRanks {
                        bm25_rank: score.bm25_rank,
                        semantic_rank: score.semantic_rank,
                    },
                    explanation: explain::explain(pattern, query, score, &weights),
                })
            })
            .collect();

        let methods_used = if degraded {
            vec!["bm25".to_string()]
        } else {
            vec!["bm25".to_string(), "semantic".to_string()]
        };

        let latency_ms = start.elapsed().as_millis() as u64;
        info!(
            results = results.len(),
            total_candidates,
            degraded,
            latency_ms,
            "Retrieval complete"
        );

        RetrievalResponse {
            results,
            metadata: RetrievalMetadata {
                methods_used,
                weights,
                latency_ms,
                total_candidates,
                degraded,
                warnings,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::seed::seed_library;
    use crate::requirements::{
        ApprovedRequirements, ComponentClassification, ComponentType, RequirementCategory,
        RequirementProposal,
    };
    use vector::{InMemoryVectorIndex, UnreachableVectorIndex};

    fn approved(category: RequirementCategory, name: &str, value: &str) -> RequirementProposal {
        let mut p = RequirementProposal::new(category, name, value, 0.9, "test", "test");
        p.approve().unwrap();
        p
    }

    fn button_query() -> RetrievalQuery {
        let requirements = ApprovedRequirements::from_proposals(&[
            approved(RequirementCategory::Props, "variant", "default|destructive"),
            approved(RequirementCategory::Props, "size", "sm|md|lg"),
            approved(RequirementCategory::Events, "onClick", "() => void"),
            approved(RequirementCategory::States, "hover", "true"),
            approved(RequirementCategory::States, "disabled", "true"),
            approved(RequirementCategory::Accessibility, "aria-label", "string"),
        ]);
        RetrievalQuery::from_requirements(
            &ComponentClassification {
                component_type: ComponentType::Button,
                confidence: 0.95,
                candidates: vec![],
            },
            &requirements,
        )
    }

    fn retriever_with(vector: Option<Arc<dyn VectorIndex>>) -> Retriever {
        let library = Arc::new(seed_library().unwrap());
        Retriever::new(library, vector, RetrieverConfig::default())
    }

    #[tokio::test]
    async fn test_bm25_only_selects_button_pattern() {
        let retriever = retriever_with(None);
        let response = retriever.search(&button_query(), None).await;

        assert!(response.metadata.degraded);
        assert_eq!(response.metadata.methods_used, vec!["bm25"]);
        assert_eq!(response.metadata.weights, FusionWeights::bm25_only());
        assert_eq!(response.results[0].pattern.id, "shadcn-button");
    }

    #[tokio::test]
    async fn test_hybrid_mode_uses_both_methods() {
        let mut index = InMemoryVectorIndex::new();
        // One-hot toy embeddings: button aligned with the query axis.
        index.insert("shadcn-button", vec![1.0, 0.0, 0.0]);
        index.insert("shadcn-card", vec![0.0, 1.0, 0.0]);
        index.insert("shadcn-badge", vec![0.0, 0.0, 1.0]);

        let retriever = retriever_with(Some(Arc::new(index)));
        let response = retriever
            .search(&button_query(), Some(&[1.0, 0.0, 0.0]))
            .await;

        assert!(!response.metadata.degraded);
        assert_eq!(response.metadata.methods_used, vec!["bm25", "semantic"]);
        assert_eq!(response.results[0].pattern.id, "shadcn-button");
        assert!(response.results[0].scores.weighted >= 0.85);
    }

    #[tokio::test]
    async fn test_vector_failure_degrades_with_warning() {
        let retriever = retriever_with(Some(Arc::new(UnreachableVectorIndex)));
        let response = retriever
            .search(&button_query(), Some(&[1.0, 0.0, 0.0]))
            .await;

        assert!(response.metadata.degraded);
        assert_eq!(response.metadata.methods_used, vec!["bm25"]);
        assert!(!response.metadata.warnings.is_empty());
        // Still returns ranked results
        assert_eq!(response.results[0].pattern.id, "shadcn-button");
    }

    #[tokio::test]
    async fn test_results_sorted_by_weighted_desc() {
        let retriever = retriever_with(None);
        let response = retriever.search(&button_query(), None).await;
        for pair in response.results.windows(2) {
            assert!(pair[0].scores.weighted >= pair[1].scores.weighted);
        }
    }

    #[tokio::test]
    async fn test_type_filter_limits_candidates() {
        let retriever = retriever_with(None);
        let response = retriever.search(&button_query(), None).await;
        // Only one Button pattern in the seed library
        assert_eq!(response.metadata.total_candidates, 1);
        assert_eq!(response.results.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_type_searches_whole_library() {
        let requirements = ApprovedRequirements::from_proposals(&[approved(
            RequirementCategory::Props,
            "variant",
            "default",
        )]);
        let query = RetrievalQuery::from_requirements(
            &ComponentClassification {
                component_type: ComponentType::Unknown,
                confidence: 0.2,
                candidates: vec![],
            },
            &requirements,
        );
        let retriever = retriever_with(None);
        let response = retriever.search(&query, None).await;
        assert_eq!(response.metadata.total_candidates, 10);
        assert_eq!(response.results.len(), 3);
    }

    #[tokio::test]
    async fn test_no_evidence_returns_empty() {
        let requirements = ApprovedRequirements::from_proposals(&[approved(
            RequirementCategory::Props,
            "zeppelin",
            "true",
        )]);
        let query = RetrievalQuery::from_requirements(
            &ComponentClassification {
                component_type: ComponentType::Unknown,
                confidence: 0.1,
                candidates: vec![],
            },
            &requirements,
        );
        let retriever = retriever_with(None);
        let response = retriever.search(&query, None).await;
        assert!(response.results.is_empty());
        assert_eq!(response.metadata.total_candidates, 10);
    }

    #[tokio::test]
    async fn test_matched_props_subset_of_requested() {
        let retriever = retriever_with(None);
        let query = button_query();
        let response = retriever.search(&query, None).await;
        for result in &response.results {
            for p in &result.explanation.matched_props {
                assert!(query.requested_props.contains(p));
            }
        }
    }
}
