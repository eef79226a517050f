//! Pipeline configuration from the environment.
//!
//! Every recognized variable has a pinned default except the API key,
//! which is required for any run that reaches a provider. Tests construct
//! configs directly and never read the process environment.

use std::time::Duration;

use anyhow::{Context, Result};

fn env_string(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_opt(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn env_u32(var: &str, default: u32) -> u32 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn env_bool(var: &str, default: bool) -> bool {
    std::env::var(var)
        .map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    /// Provider API key (`OPENAI_API_KEY`). Required.
    pub openai_api_key: String,
    /// Chat endpoint base URL; overridable for proxies and tests.
    pub llm_base_url: String,
    /// Pinned generation model (`LLM_MODEL`).
    pub llm_model: String,
    /// Pinned 1536-dim embedding model (`EMBEDDING_MODEL`).
    pub embedding_model: String,
    /// Managed vector index endpoint (`VECTOR_INDEX_URL`); in-memory when
    /// unset.
    pub vector_index_url: Option<String>,
    /// External result cache endpoint (`CACHE_URL`); in-memory when unset.
    pub cache_url: Option<String>,
    /// `TRACING_ENABLED`.
    pub tracing_enabled: bool,
    /// `TRACING_ENDPOINT`; spans fall back to the log sink when unset.
    pub tracing_endpoint: Option<String>,
    /// Baked into every cache key (`PIPELINE_VERSION`).
    pub pipeline_version: String,
    /// Repair-loop bound (`MAX_FIX_ATTEMPTS`).
    pub max_fix_attempts: u32,
    /// Hard generation timeout (`GENERATION_TIMEOUT_MS`).
    pub generation_timeout: Duration,
    /// Figma API base; overridable for tests (`FIGMA_API_BASE`).
    pub figma_api_base: String,
    /// Concurrent runs per process; validation is CPU-bound.
    pub max_concurrent_runs: usize,
    /// Separate bound for LLM fan-out (the four analyzers).
    pub llm_fanout_limit: usize,
}

impl ForgeConfig {
    /// Read the full configuration, failing only on the missing API key.
    pub fn from_env() -> Result<Self> {
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .context("OPENAI_API_KEY is required")?;
        Ok(Self {
            openai_api_key,
            ..Self::with_key("unused")
        })
    }

    /// Defaults with an explicit key; the base for tests and embedding.
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            openai_api_key: api_key.into(),
            llm_base_url: env_string("LLM_BASE_URL", "https://api.openai.com/v1"),
            llm_model: env_string("LLM_MODEL", "gpt-4o-2024-08-06"),
            embedding_model: env_string("EMBEDDING_MODEL", "text-embedding-3-small"),
            vector_index_url: env_opt("VECTOR_INDEX_URL"),
            cache_url: env_opt("CACHE_URL"),
            tracing_enabled: env_bool("TRACING_ENABLED", true),
            tracing_endpoint: env_opt("TRACING_ENDPOINT"),
            pipeline_version: env_string("PIPELINE_VERSION", "1.0.0"),
            max_fix_attempts: env_u32("MAX_FIX_ATTEMPTS", 2),
            generation_timeout: Duration::from_millis(env_u64("GENERATION_TIMEOUT_MS", 150_000)),
            figma_api_base: env_string("FIGMA_API_BASE", "https://api.figma.com"),
            max_concurrent_runs: env_u64("FORGE_MAX_CONCURRENT_RUNS", num_cpus() as u64) as usize,
            llm_fanout_limit: env_u64("FORGE_LLM_FANOUT_LIMIT", 8) as usize,
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ForgeConfig::with_key("test-key");
        assert_eq!(config.openai_api_key, "test-key");
        assert_eq!(config.max_fix_attempts, 2);
        assert_eq!(config.generation_timeout, Duration::from_millis(150_000));
        assert!(config.figma_api_base.contains("figma.com"));
        assert!(config.max_concurrent_runs >= 1);
    }

    #[test]
    fn test_from_env_requires_key() {
        std::env::remove_var("OPENAI_API_KEY");
        assert!(ForgeConfig::from_env().is_err());
    }
}
