//! Curated pattern library.
//!
//! Patterns are immutable per `(id, version)` and stored in an arena: a
//! dense `Vec<Pattern>` plus an id → index map. Callers pass [`PatternId`]
//! handles across tasks, never references. Each pattern carries a
//! normalized text document for the BM25 index; dense embeddings are
//! attached at curation time by the embedder.

pub mod seed;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, ForgeResult};
use crate::requirements::ComponentType;

/// Arena handle into a [`PatternLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternId(pub usize);

/// Structured metadata describing what a pattern supports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternMetadata {
    pub component_type: ComponentType,
    pub description: String,
    #[serde(default)]
    pub props: Vec<String>,
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub a11y: Vec<String>,
}

/// One curated reference component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub name: String,
    pub source: String,
    pub version: String,
    /// TypeScript reference source used as the generation baseline.
    pub code: String,
    pub metadata: PatternMetadata,
    /// Normalized text document for lexical retrieval.
    pub bm25_doc: String,
    /// Dense embedding (1536-dim by contract) attached at curation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dense_embedding: Option<Vec<f32>>,
}

/// The persisted JSON record; the code lives in a sibling `.tsx` blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PatternRecord {
    id: String,
    name: String,
    source: String,
    version: String,
    metadata: PatternMetadata,
    #[serde(default)]
    bm25_doc: Option<String>,
}

impl Pattern {
    /// Parse a JSON record and attach its sibling TypeScript source.
    pub fn from_record(json: &str, code: &str) -> ForgeResult<Self> {
        let record: PatternRecord = serde_json::from_str(json)
            .map_err(|e| ForgeError::InvalidInput(format!("bad pattern record: {e}")))?;
        let mut pattern = Self {
            id: record.id,
            name: record.name,
            source: record.source,
            version: record.version,
            code: code.to_string(),
            metadata: record.metadata,
            bm25_doc: record.bm25_doc.unwrap_or_default(),
            dense_embedding: None,
        };
        if pattern.bm25_doc.is_empty() {
            pattern.bm25_doc = pattern.build_bm25_doc();
        }
        Ok(pattern)
    }

    /// Normalized lexical document: name, type, and metadata terms.
    pub fn build_bm25_doc(&self) -> String {
        let mut terms: Vec<String> = Vec::new();
        terms.push(self.name.to_lowercase());
        terms.push(self.metadata.component_type.to_string().to_lowercase());
        terms.push(self.metadata.description.to_lowercase());
        for group in [
            &self.metadata.props,
            &self.metadata.variants,
            &self.metadata.states,
            &self.metadata.a11y,
        ] {
            for term in group {
                terms.push(term.to_lowercase());
            }
        }
        terms.join(" ")
    }
}

/// Read-only after curation; shared across runs behind `Arc` without locks.
#[derive(Debug, Default)]
pub struct PatternLibrary {
    patterns: Vec<Pattern>,
    by_id: HashMap<String, PatternId>,
}

impl PatternLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pattern. Duplicate string ids are rejected; a new version of
    /// a pattern is a new record with a new id suffix.
    pub fn insert(&mut self, pattern: Pattern) -> ForgeResult<PatternId> {
        if self.by_id.contains_key(&pattern.id) {
            return Err(ForgeError::InvalidInput(format!(
                "duplicate pattern id '{}'",
                pattern.id
            )));
        }
        let id = PatternId(self.patterns.len());
        self.by_id.insert(pattern.id.clone(), id);
        self.patterns.push(pattern);
        Ok(id)
    }

    pub fn get(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(id.0)
    }

    pub fn get_by_name(&self, pattern_id: &str) -> Option<&Pattern> {
        self.by_id.get(pattern_id).and_then(|id| self.get(*id))
    }

    pub fn resolve(&self, pattern_id: &str) -> Option<PatternId> {
        self.by_id.get(pattern_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PatternId, &Pattern)> {
        self.patterns
            .iter()
            .enumerate()
            .map(|(i, p)| (PatternId(i), p))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Attach a curated embedding to a pattern.
    pub fn set_embedding(&mut self, pattern_id: &str, embedding: Vec<f32>) -> ForgeResult<()> {
        let id = self.resolve(pattern_id).ok_or_else(|| {
            ForgeError::InvalidInput(format!("unknown pattern id '{pattern_id}'"))
        })?;
        self.patterns[id.0].dense_embedding = Some(embedding);
        Ok(())
    }

    /// Load every `*.json` record (with its sibling `.tsx` blob) from a
    /// directory. Records without a code blob are rejected.
    pub fn load_dir(dir: &Path) -> ForgeResult<Self> {
        let mut library = Self::new();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| ForgeError::InvalidInput(format!("cannot read pattern dir: {e}")))?;
        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for json_path in paths {
            let code_path = json_path.with_extension("tsx");
            let json = std::fs::read_to_string(&json_path)
                .map_err(|e| ForgeError::InvalidInput(format!("cannot read record: {e}")))?;
            let code = std::fs::read_to_string(&code_path).map_err(|e| {
                ForgeError::InvalidInput(format!(
                    "pattern record {} has no code blob: {e}",
                    json_path.display()
                ))
            })?;
            library.insert(Pattern::from_record(&json, &code)?)?;
        }
        Ok(library)
    }
}
