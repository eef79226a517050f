//! Token Extractor stage.
//!
//! Two entry points: a single multimodal completion over an admitted
//! screenshot, or the Figma styles path. Both funnel through the same
//! validation-and-fallback step so downstream stages always see a token
//! set that satisfies the invariants.

pub mod figma;

use std::time::Duration;

use base64::Engine;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};

use forge_core::error::{ForgeError, ForgeResult};
use forge_core::tokens::{
    admit_image, apply_fallbacks, classify_style, default_tokens, DesignTokens, ImageLimits,
    SemanticSlot, TokenField, UploadVerdict, FALLBACK_CONFIDENCE_THRESHOLD,
};
use forge_core::TtlCache;

use crate::llm::{ChatMessage, ChatRequest, LlmBackend};
use figma::FigmaClient;

/// Vision retry schedule: two retries with 0.5 s and 2 s backoff.
const VISION_RETRY_DELAYS: [Duration; 2] = [Duration::from_millis(500), Duration::from_secs(2)];

/// Figma style cache TTL.
const FIGMA_CACHE_TTL: Duration = Duration::from_secs(300);

const VISION_PREAMBLE: &str = "\
You are a design token extractor. Given a UI screenshot, identify the design \
tokens in use and return them as JSON matching the provided schema exactly.

Rules:
- Colors are 6-digit uppercase hex strings like #3B82F6. Never use names.
- Font sizes, spacing, and radii are CSS lengths: Npx or Nrem.
- Font weights are numeric strings: 400, 500, 600, 700.
- Only report values you can actually observe. Omit fields you cannot infer.
- Do not invent tokens that are not visible in the screenshot.
";

/// Structured output shape requested from the vision model. Kept flat and
/// string-typed; invariant checking happens after parsing.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct VisionTokens {
    #[serde(default)]
    pub colors: VisionColors,
    #[serde(default)]
    pub typography: VisionTypography,
    #[serde(default)]
    pub spacing: VisionScale,
    #[serde(default, rename = "borderRadius")]
    pub border_radius: VisionRadius,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct VisionColors {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub accent: Option<String>,
    pub background: Option<String>,
    pub foreground: Option<String>,
    pub muted: Option<String>,
    pub border: Option<String>,
    pub destructive: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct VisionTypography {
    #[serde(rename = "fontFamily")]
    pub font_family: Option<String>,
    #[serde(rename = "fontSizeBase")]
    pub font_size_base: Option<String>,
    #[serde(rename = "fontSizeLg")]
    pub font_size_lg: Option<String>,
    #[serde(rename = "fontSizeSm")]
    pub font_size_sm: Option<String>,
    #[serde(rename = "fontWeightNormal")]
    pub font_weight_normal: Option<String>,
    #[serde(rename = "fontWeightBold")]
    pub font_weight_bold: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct VisionScale {
    pub xs: Option<String>,
    pub sm: Option<String>,
    pub md: Option<String>,
    pub lg: Option<String>,
    pub xl: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct VisionRadius {
    pub sm: Option<String>,
    pub md: Option<String>,
    pub lg: Option<String>,
    pub full: Option<String>,
}

/// What the stage hands to the orchestrator, and the serialized response
/// shape of the extraction endpoints.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExtractionOutcome {
    pub tokens: DesignTokens,
    /// Geometric-mean token probability of the vision completion.
    pub confidence: Option<f64>,
    /// Dotted paths substituted from the fallback set.
    pub fallback_paths: Vec<String>,
    pub warnings: Vec<String>,
}

pub struct TokenExtractor<L: LlmBackend> {
    llm: std::sync::Arc<L>,
    figma: FigmaClient,
    figma_cache: TtlCache<DesignTokens>,
    limits: ImageLimits,
}

impl<L: LlmBackend> TokenExtractor<L> {
    pub fn new(llm: std::sync::Arc<L>, figma_api_base: &str) -> Self {
        Self {
            llm,
            figma: FigmaClient::new(figma_api_base),
            figma_cache: TtlCache::new(FIGMA_CACHE_TTL),
            limits: ImageLimits::default(),
        }
    }

    /// Extract tokens from an admitted screenshot via one multimodal call.
    ///
    /// Timeouts and transient provider failures retry twice (0.5 s, 2 s);
    /// a third failure substitutes the full fallback token set and the
    /// stage succeeds with a warning. Auth failures stay fatal.
    pub async fn extract_from_image(
        &self,
        image_bytes: &[u8],
        mime_type: &str,
        verdict: &UploadVerdict,
    ) -> ForgeResult<ExtractionOutcome> {
        let info = admit_image(image_bytes, mime_type, verdict, &self.limits)?;
        let data_url = format!(
            "data:{};base64,{}",
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(image_bytes)
        );

        let schema = schemars::schema_for!(VisionTokens);
        let schema_value = serde_json::to_value(schema)
            .map_err(|e| ForgeError::InternalInvariant(format!("vision schema: {e}")))?;

        let mut warnings: Vec<String> = Vec::new();
        let mut last_err: Option<ForgeError> = None;

        for attempt in 0..=VISION_RETRY_DELAYS.len() {
            if attempt > 0 {
                tokio::time::sleep(VISION_RETRY_DELAYS[attempt - 1]).await;
            }
            let request = ChatRequest::new(vec![
                ChatMessage::system(VISION_PREAMBLE),
                ChatMessage::user_with_image(
                    "Extract the design tokens from this screenshot.",
                    data_url.clone(),
                ),
            ])
            .with_json_schema("design_tokens", schema_value.clone())
            .with_logprobs();

            match self.llm.complete(request).await {
                Ok(response) => {
                    let parsed: VisionTokens =
                        match serde_json::from_str(&response.content) {
                            Ok(parsed) => parsed,
                            Err(e) => {
                                warn!(attempt, error = %e, "Vision response failed schema parse");
                                last_err = Some(ForgeError::InvalidInput(format!(
                                    "vision output: {e}"
                                )));
                                continue;
                            }
                        };
                    let confidence = response.mean_logprob_confidence();
                    let mut tokens = vision_to_tokens(parsed, confidence.unwrap_or(0.5));
                    let fallback_paths =
                        apply_fallbacks(&mut tokens, FALLBACK_CONFIDENCE_THRESHOLD);
                    if !fallback_paths.is_empty() {
                        warnings.push(format!(
                            "{} token slots substituted from the fallback set",
                            fallback_paths.len()
                        ));
                    }
                    info!(
                        digest = %info.digest,
                        confidence = confidence.unwrap_or(0.0),
                        fallbacks = fallback_paths.len(),
                        "Extracted tokens from image"
                    );
                    return Ok(ExtractionOutcome {
                        tokens,
                        confidence,
                        fallback_paths,
                        warnings,
                    });
                }
                Err(e @ ForgeError::UpstreamAuth(_)) => return Err(e),
                Err(e) => {
                    warn!(attempt, error = %e, "Vision extraction attempt failed");
                    last_err = Some(e);
                }
            }
        }

        // All attempts exhausted: continue on the fallback set.
        let reason = last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown".into());
        warn!(reason = %reason, "Vision extraction exhausted retries, using fallback tokens");
        let tokens = default_tokens();
        let fallback_paths: Vec<String> =
            tokens.slots().iter().map(|(path, _, _)| path.clone()).collect();
        warnings.push(format!("vision extraction failed after retries: {reason}"));
        Ok(ExtractionOutcome {
            tokens,
            confidence: None,
            fallback_paths,
            warnings,
        })
    }

    /// Extract tokens from a Figma file's published styles. Results are
    /// cached by file key for five minutes; auth and missing-file errors
    /// are fatal to the run.
    pub async fn extract_from_figma(
        &self,
        file_key: &str,
        access_token: &str,
    ) -> ForgeResult<ExtractionOutcome> {
        if let Some(tokens) = self.figma_cache.get(file_key).await {
            info!(file_key, "Figma style cache hit");
            return Ok(ExtractionOutcome {
                tokens,
                confidence: None,
                fallback_paths: Vec::new(),
                warnings: Vec::new(),
            });
        }

        let styles = self.figma.fetch_styles(file_key, access_token).await?;
        let mut tokens = DesignTokens::default();
        let mut unmapped = 0usize;

        for style in &styles {
            let Some(mapping) = classify_style(&style.name, style.style_type) else {
                continue;
            };
            let Some(value) = &style.value else {
                unmapped += 1;
                continue;
            };
            let field = TokenField::new(value.clone(), mapping.confidence);
            match mapping.slot {
                SemanticSlot::Color(slot) => tokens.colors.set(slot, field),
                SemanticSlot::ColorExtra(name) => tokens.colors.set(&name, field),
                SemanticSlot::FontSize(slot) => {
                    let target = match slot {
                        "xs" => &mut tokens.typography.font_size.xs,
                        "sm" => &mut tokens.typography.font_size.sm,
                        "base" => &mut tokens.typography.font_size.base,
                        "lg" => &mut tokens.typography.font_size.lg,
                        "xl" => &mut tokens.typography.font_size.xl,
                        "2xl" => &mut tokens.typography.font_size.xl2,
                        "3xl" => &mut tokens.typography.font_size.xl3,
                        "4xl" => &mut tokens.typography.font_size.xl4,
                        _ => continue,
                    };
                    *target = Some(field);
                }
                SemanticSlot::FontWeight(slot) => {
                    let target = match slot {
                        "normal" => &mut tokens.typography.font_weight.normal,
                        "medium" => &mut tokens.typography.font_weight.medium,
                        "semibold" => &mut tokens.typography.font_weight.semibold,
                        "bold" => &mut tokens.typography.font_weight.bold,
                        _ => continue,
                    };
                    *target = Some(field);
                }
            }
        }

        let mut warnings = Vec::new();
        if unmapped > 0 {
            warnings.push(format!("{unmapped} figma styles had no resolvable value"));
        }

        let fallback_paths = apply_fallbacks(&mut tokens, FALLBACK_CONFIDENCE_THRESHOLD);
        info!(
            file_key,
            styles = styles.len(),
            fallbacks = fallback_paths.len(),
            "Extracted tokens from figma"
        );

        self.figma_cache.insert(file_key, tokens.clone()).await;

        Ok(ExtractionOutcome {
            tokens,
            confidence: None,
            fallback_paths,
            warnings,
        })
    }
}

/// Map the vision DTO into the token model, stamping the completion-level
/// confidence onto every extracted field.
fn vision_to_tokens(vision: VisionTokens, confidence: f64) -> DesignTokens {
    let mut tokens = DesignTokens::default();
    let field = |v: Option<String>| v.map(|value| TokenField::new(value, confidence));

    tokens.colors.primary = field(vision.colors.primary);
    tokens.colors.secondary = field(vision.colors.secondary);
    tokens.colors.accent = field(vision.colors.accent);
    tokens.colors.background = field(vision.colors.background);
    tokens.colors.foreground = field(vision.colors.foreground);
    tokens.colors.muted = field(vision.colors.muted);
    tokens.colors.border = field(vision.colors.border);
    tokens.colors.destructive = field(vision.colors.destructive);

    tokens.typography.font_family = field(vision.typography.font_family);
    tokens.typography.font_size.sm = field(vision.typography.font_size_sm);
    tokens.typography.font_size.base = field(vision.typography.font_size_base);
    tokens.typography.font_size.lg = field(vision.typography.font_size_lg);
    tokens.typography.font_weight.normal = field(vision.typography.font_weight_normal);
    tokens.typography.font_weight.bold = field(vision.typography.font_weight_bold);

    tokens.spacing.xs = field(vision.spacing.xs);
    tokens.spacing.sm = field(vision.spacing.sm);
    tokens.spacing.md = field(vision.spacing.md);
    tokens.spacing.lg = field(vision.spacing.lg);
    tokens.spacing.xl = field(vision.spacing.xl);

    tokens.border_radius.sm = field(vision.border_radius.sm);
    tokens.border_radius.md = field(vision.border_radius.md);
    tokens.border_radius.lg = field(vision.border_radius.lg);
    tokens.border_radius.full = field(vision.border_radius.full);

    tokens
}
