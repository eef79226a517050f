//! ComponentForge CLI.
//!
//! Drives the pipeline from the command line: extract tokens from a
//! screenshot or Figma file, run a full generation, or list the pattern
//! library. The HTTP transport is a separate deployment concern; this
//! binary exercises the same orchestrator through the same shapes.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use forge_agents::config::ForgeConfig;
use forge_agents::llm::OpenAiClient;
use forge_agents::orchestrator::{
    ApproveAll, Orchestrator, PipelineDeps, PipelineInput, RunSource,
};
use forge_core::cache::InMemoryCache;
use forge_core::events::ProgressBus;
use forge_core::patterns::seed::seed_library;
use forge_core::retrieval::{Retriever, RetrieverConfig};
use forge_core::tokens::UploadVerdict;
use forge_core::trace::{LogSink, TraceExporter};
use forge_core::validation::ChainConfig;

#[derive(Parser)]
#[command(name = "forge-agents", about = "Design-to-component generation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract design tokens from a screenshot.
    Extract {
        /// Path to a PNG/JPG/SVG screenshot.
        #[arg(long)]
        image: PathBuf,
    },
    /// Run the full pipeline on a screenshot.
    Generate {
        /// Path to a PNG/JPG/SVG screenshot.
        #[arg(long)]
        image: PathBuf,
        /// Pin a pattern id instead of retrieving.
        #[arg(long)]
        pattern: Option<String>,
        /// Write the component and report into this directory.
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,
    },
    /// List the curated pattern library.
    Patterns,
}

fn mime_from_path(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn build_orchestrator(config: &ForgeConfig) -> Result<Orchestrator<OpenAiClient>> {
    let llm = Arc::new(OpenAiClient::new(
        &config.llm_base_url,
        &config.openai_api_key,
        &config.llm_model,
        &config.embedding_model,
    )?);

    let library = Arc::new(seed_library()?);
    let retriever = Arc::new(Retriever::new(
        library,
        None, // vector index attaches when VECTOR_INDEX_URL is wired
        RetrieverConfig::default(),
    ));

    let exporter = if config.tracing_enabled {
        TraceExporter::spawn(Box::new(LogSink), 1024)
    } else {
        TraceExporter::disabled()
    };

    Ok(Orchestrator::new(PipelineDeps {
        llm,
        retriever,
        cache: Arc::new(InMemoryCache::new()),
        bus: ProgressBus::new().shared(),
        exporter,
        chain_config: ChainConfig::default(),
        approval: Arc::new(ApproveAll),
        pipeline_version: config.pipeline_version.clone(),
        max_fix_attempts: config.max_fix_attempts,
        generation_timeout: config.generation_timeout,
        max_concurrent_runs: config.max_concurrent_runs,
        llm_fanout_limit: config.llm_fanout_limit,
        figma_api_base: config.figma_api_base.clone(),
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Patterns => {
            let library = seed_library()?;
            for (_, pattern) in library.iter() {
                println!(
                    "{:<20} v{:<7} {:?}  {}",
                    pattern.id,
                    pattern.version,
                    pattern.metadata.component_type,
                    pattern.metadata.description
                );
            }
            Ok(())
        }
        Command::Extract { image } => {
            let config = ForgeConfig::from_env()?;
            let bytes = std::fs::read(&image)
                .with_context(|| format!("cannot read {}", image.display()))?;
            let llm = Arc::new(OpenAiClient::new(
                &config.llm_base_url,
                &config.openai_api_key,
                &config.llm_model,
                &config.embedding_model,
            )?);
            let extractor =
                forge_agents::extractor::TokenExtractor::new(llm, &config.figma_api_base);
            let outcome = extractor
                .extract_from_image(&bytes, mime_from_path(&image), &UploadVerdict::safe())
                .await?;
            println!("{}", outcome.tokens.to_canonical_json());
            if !outcome.fallback_paths.is_empty() {
                info!(
                    fallbacks = outcome.fallback_paths.len(),
                    "Some token slots used fallback defaults"
                );
            }
            Ok(())
        }
        Command::Generate {
            image,
            pattern,
            out_dir,
        } => {
            let config = ForgeConfig::from_env()?;
            let bytes = std::fs::read(&image)
                .with_context(|| format!("cannot read {}", image.display()))?;
            let orchestrator = build_orchestrator(&config)?;

            let outcome = orchestrator
                .run(
                    PipelineInput {
                        source: RunSource::Image {
                            mime_type: mime_from_path(&image).to_string(),
                            bytes,
                            verdict: UploadVerdict::safe(),
                        },
                        pattern_override: pattern,
                    },
                    CancellationToken::new(),
                )
                .await
                .map_err(|failed| {
                    anyhow::anyhow!("{} ({:?})", failed.error.user_message(), failed.error.kind())
                })?;

            std::fs::create_dir_all(&out_dir)?;
            std::fs::write(out_dir.join("Component.tsx"), &outcome.generated.component)?;
            std::fs::write(
                out_dir.join("Component.stories.tsx"),
                &outcome.generated.stories,
            )?;
            std::fs::write(out_dir.join("tokens.json"), &outcome.generated.tokens_json)?;
            std::fs::write(out_dir.join("report.json"), outcome.report.to_json())?;
            std::fs::write(out_dir.join("report.html"), outcome.report.render_html())?;

            println!(
                "run {}: {:?}, overall score {:.0}, {} warnings, artifacts in {}",
                outcome.context.short_id(),
                outcome.report.status,
                outcome.report.scores.overall,
                outcome.context.warnings.len(),
                out_dir.display()
            );
            Ok(())
        }
    }
}
