//! Shared test support: a scripted in-process LLM backend and canned
//! pipeline fixtures.

// Each integration test binary compiles its own copy; not every binary
// uses every helper.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use forge_agents::llm::{ChatRequest, ChatResponse, ContentPart, LlmBackend, TokenUsage};
use forge_agents::orchestrator::{ApproveAll, Orchestrator, PipelineDeps};
use forge_core::cache::InMemoryCache;
use forge_core::error::{ForgeError, ForgeResult};
use forge_core::events::ProgressBus;
use forge_core::patterns::seed::seed_library;
use forge_core::retrieval::vector::VectorIndex;
use forge_core::retrieval::{Retriever, RetrieverConfig};
use forge_core::trace::TraceExporter;
use forge_core::validation::ChainConfig;

/// Routes requests by the system prompt's role marker, so concurrently
/// polled analyzer calls never race over a shared queue. Generation and
/// repair calls stay sequential queues to script multi-attempt behavior.
pub struct ScriptedLlm {
    pub vision: Mutex<Option<ForgeResult<String>>>,
    pub classifier: Mutex<Option<ForgeResult<String>>>,
    /// Keyed by analyzer marker: "props", "events", "states", "a11y".
    pub analyzers: Mutex<HashMap<&'static str, ForgeResult<String>>>,
    pub generations: Mutex<VecDeque<ForgeResult<String>>>,
    pub repairs: Mutex<VecDeque<ForgeResult<String>>>,
    /// Logprobs attached to vision responses.
    pub vision_logprobs: Vec<f64>,
    /// Purposes in call order, for assertions.
    pub call_log: Mutex<Vec<String>>,
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            vision: Mutex::new(None),
            classifier: Mutex::new(None),
            analyzers: Mutex::new(HashMap::new()),
            generations: Mutex::new(VecDeque::new()),
            repairs: Mutex::new(VecDeque::new()),
            vision_logprobs: vec![-0.02, -0.03, -0.01],
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// Fully scripted happy path for an image run.
    pub fn happy_path() -> Self {
        let llm = Self::new();
        *llm.vision.lock().unwrap() = Some(Ok(vision_json()));
        *llm.classifier.lock().unwrap() = Some(Ok(classification_json("Button", 0.95)));
        {
            let mut analyzers = llm.analyzers.lock().unwrap();
            analyzers.insert("props", Ok(props_analyzer_json()));
            analyzers.insert("events", Ok(events_analyzer_json()));
            analyzers.insert("states", Ok(states_analyzer_json()));
            analyzers.insert("a11y", Ok(a11y_analyzer_json()));
        }
        llm.generations
            .lock()
            .unwrap()
            .push_back(Ok(generation_json(&clean_component(), &clean_stories())));
        llm
    }

    pub fn push_generation(&self, result: ForgeResult<String>) {
        self.generations.lock().unwrap().push_back(result);
    }

    pub fn push_repair(&self, result: ForgeResult<String>) {
        self.repairs.lock().unwrap().push_back(result);
    }

    fn system_text(request: &ChatRequest) -> String {
        request
            .messages
            .first()
            .map(|m| {
                m.content
                    .iter()
                    .filter_map(|part| match part {
                        ContentPart::Text { text } => Some(text.clone()),
                        ContentPart::ImageUrl { .. } => None,
                    })
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn log(&self, purpose: &str) {
        self.call_log.lock().unwrap().push(purpose.to_string());
    }
}

fn clone_result(r: &ForgeResult<String>) -> ForgeResult<String> {
    match r {
        Ok(s) => Ok(s.clone()),
        Err(e) => Err(clone_error(e)),
    }
}

fn clone_error(e: &ForgeError) -> ForgeError {
    match e {
        ForgeError::InvalidInput(m) => ForgeError::InvalidInput(m.clone()),
        ForgeError::UpstreamAuth(m) => ForgeError::UpstreamAuth(m.clone()),
        ForgeError::UpstreamRateLimit { retry_after_secs } => ForgeError::UpstreamRateLimit {
            retry_after_secs: *retry_after_secs,
        },
        ForgeError::UpstreamUnavailable(m) => ForgeError::UpstreamUnavailable(m.clone()),
        ForgeError::InternalTimeout { stage, budget_ms } => ForgeError::InternalTimeout {
            stage: stage.clone(),
            budget_ms: *budget_ms,
        },
        ForgeError::Cancelled => ForgeError::Cancelled,
        ForgeError::InternalInvariant(m) => ForgeError::InternalInvariant(m.clone()),
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn complete(&self, request: ChatRequest) -> ForgeResult<ChatResponse> {
        let system = Self::system_text(&request);
        let usage = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
        };

        let (purpose, content, logprobs): (&str, ForgeResult<String>, Vec<f64>) =
            if system.contains("design token extractor") {
                let scripted = self.vision.lock().unwrap().take();
                (
                    "vision",
                    scripted.unwrap_or_else(|| {
                        Err(ForgeError::UpstreamUnavailable("vision unscripted".into()))
                    }),
                    self.vision_logprobs.clone(),
                )
            } else if system.contains("classify UI components") {
                let scripted = self.classifier.lock().unwrap().take();
                (
                    "classifier",
                    scripted.unwrap_or_else(|| {
                        Err(ForgeError::UpstreamUnavailable("classifier unscripted".into()))
                    }),
                    vec![],
                )
            } else if system.contains("props analyzer") {
                ("analyzer:props", self.take_analyzer("props"), vec![])
            } else if system.contains("events analyzer") {
                ("analyzer:events", self.take_analyzer("events"), vec![])
            } else if system.contains("states analyzer") {
                ("analyzer:states", self.take_analyzer("states"), vec![])
            } else if system.contains("accessibility analyzer") {
                ("analyzer:a11y", self.take_analyzer("a11y"), vec![])
            } else if system.contains("fixing a React/TypeScript component") {
                let scripted = self.repairs.lock().unwrap().pop_front();
                (
                    "repair",
                    scripted.unwrap_or_else(|| {
                        Err(ForgeError::UpstreamUnavailable("repair unscripted".into()))
                    }),
                    vec![],
                )
            } else if system.contains("senior React/TypeScript engineer") {
                let scripted = self.generations.lock().unwrap().pop_front();
                (
                    "generate",
                    scripted.unwrap_or_else(|| {
                        Err(ForgeError::UpstreamUnavailable("generation unscripted".into()))
                    }),
                    vec![],
                )
            } else {
                (
                    "unknown",
                    Err(ForgeError::InvalidInput(format!(
                        "unrecognized system prompt: {}",
                        &system[..system.len().min(60)]
                    ))),
                    vec![],
                )
            };

        self.log(purpose);
        content.map(|content| ChatResponse {
            content,
            logprobs,
            usage,
            model: "scripted".into(),
        })
    }

    async fn embed(&self, inputs: &[String]) -> ForgeResult<Vec<Vec<f32>>> {
        self.log("embed");
        // Deterministic toy embedding: byte histogram folded into 8 dims.
        Ok(inputs
            .iter()
            .map(|text| {
                let mut v = [0.0f32; 8];
                for (i, b) in text.bytes().enumerate() {
                    v[i % 8] += (b as f32) / 255.0;
                }
                v.to_vec()
            })
            .collect())
    }
}

impl ScriptedLlm {
    fn take_analyzer(&self, key: &'static str) -> ForgeResult<String> {
        self.analyzers
            .lock()
            .unwrap()
            .get(key)
            .map(clone_result)
            .unwrap_or_else(|| Err(ForgeError::UpstreamUnavailable(format!("{key} unscripted"))))
    }
}

// ── Canned payloads ──────────────────────────────────────────────────

pub fn vision_json() -> String {
    r##"{
        "colors": {
            "primary": "#3B82F6",
            "background": "#FFFFFF",
            "foreground": "#0F172A"
        },
        "typography": { "fontSizeBase": "1rem" },
        "spacing": { "md": "16px" },
        "borderRadius": { "md": "8px" }
    }"##
    .to_string()
}

pub fn classification_json(component_type: &str, confidence: f64) -> String {
    format!(
        r#"{{
            "component_type": "{component_type}",
            "confidence": {confidence},
            "candidates": [
                {{ "component_type": "{component_type}", "confidence": {confidence} }},
                {{ "component_type": "Badge", "confidence": 0.03 }},
                {{ "component_type": "Card", "confidence": 0.02 }}
            ]
        }}"#
    )
}

pub fn props_analyzer_json() -> String {
    r#"{ "proposals": [
        { "name": "variant", "value": "default|destructive", "confidence": 0.92, "rationale": "two visual treatments visible" },
        { "name": "size", "value": "sm|md|lg", "confidence": 0.85, "rationale": "padding scale suggests sizes" }
    ]}"#
    .to_string()
}

pub fn events_analyzer_json() -> String {
    r#"{ "proposals": [
        { "name": "onClick", "value": "() => void", "confidence": 0.95, "rationale": "buttons are clickable" }
    ]}"#
    .to_string()
}

pub fn states_analyzer_json() -> String {
    r#"{ "proposals": [
        { "name": "hover", "value": "true", "confidence": 0.9, "rationale": "hover affordance expected" },
        { "name": "focus", "value": "true", "confidence": 0.9, "rationale": "focus ring required" },
        { "name": "disabled", "value": "true", "confidence": 0.85, "rationale": "muted variant visible" }
    ]}"#
    .to_string()
}

pub fn a11y_analyzer_json() -> String {
    r#"{ "proposals": [
        { "name": "aria-label", "value": "string", "confidence": 0.9, "rationale": "icon-only usage needs a name" }
    ]}"#
    .to_string()
}

pub fn clean_component() -> String {
    r#"import * as React from "react";

export interface ButtonProps {
  variant?: "default" | "destructive";
  size?: "sm" | "md" | "lg";
  disabled?: boolean;
  onClick?: () => void;
  "aria-label"?: string;
  children?: React.ReactNode;
}

export function Button({
  variant = "default",
  size = "md",
  disabled = false,
  onClick,
  children,
  ...props
}: ButtonProps) {
  return (
    <button
      type="button"
      disabled={disabled}
      onClick={onClick}
      aria-label={props["aria-label"]}
      style={{
        backgroundColor:
          variant === "destructive"
            ? "var(--color-destructive)"
            : "var(--color-primary)",
        color: "var(--color-background)",
        padding:
          size === "lg"
            ? "var(--spacing-md) var(--spacing-lg)"
            : "var(--spacing-sm) var(--spacing-md)",
        borderRadius: "var(--radius-md)",
        fontSize: "var(--font-size-base)",
        opacity: disabled ? 0.6 : 1,
      }}
    >
      {children}
    </button>
  );
}
"#
    .to_string()
}

pub fn clean_stories() -> String {
    r#"import { Button } from "./Component";

export default { title: "Button", component: Button };

export const Default = { args: { children: "Click me" } };
export const Destructive = { args: { variant: "destructive", children: "Delete" } };
export const Disabled = { args: { disabled: true, children: "Disabled" } };
"#
    .to_string()
}

/// Component whose line 10 contains an eval call.
pub fn eval_component() -> String {
    let clean = clean_component();
    let mut lines: Vec<&str> = clean.lines().collect();
    lines.insert(9, r#"const result = eval("1+1");"#);
    lines.join("\n")
}

pub fn generation_json(component: &str, stories: &str) -> String {
    serde_json::json!({ "component": component, "stories": stories }).to_string()
}

/// A 200x120 SVG upload that passes admission.
pub fn svg_upload() -> Vec<u8> {
    br##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="120"><rect width="200" height="120" fill="#3B82F6"/></svg>"##.to_vec()
}

// ── Orchestrator wiring ──────────────────────────────────────────────

pub struct Harness {
    pub llm: Arc<ScriptedLlm>,
    pub cache: Arc<InMemoryCache>,
    pub bus: forge_core::events::SharedProgressBus,
    pub orchestrator: Orchestrator<ScriptedLlm>,
}

/// Wire an orchestrator around a scripted backend. Subprocess validators
/// are disabled so runs stay deterministic without a node toolchain.
pub fn harness(llm: ScriptedLlm, vector: Option<Arc<dyn VectorIndex>>) -> Harness {
    let llm = Arc::new(llm);
    let cache = Arc::new(InMemoryCache::new());
    let bus = ProgressBus::new().shared();
    let library = Arc::new(seed_library().expect("seed library"));
    let retriever = Arc::new(Retriever::new(library, vector, RetrieverConfig::default()));

    let orchestrator = Orchestrator::new(PipelineDeps {
        llm: llm.clone(),
        retriever,
        cache: cache.clone(),
        bus: bus.clone(),
        exporter: TraceExporter::disabled(),
        chain_config: ChainConfig::security_only(),
        approval: Arc::new(ApproveAll),
        pipeline_version: "test-1".into(),
        max_fix_attempts: 2,
        generation_timeout: std::time::Duration::from_secs(30),
        max_concurrent_runs: 4,
        llm_fanout_limit: 8,
        figma_api_base: "http://127.0.0.1:9".into(),
    });

    Harness {
        llm,
        cache,
        bus,
        orchestrator,
    }
}
