//! Semantic classification of Figma style names.
//!
//! Published styles arrive as free-form names like `Primary/Blue`,
//! `Heading/Large`, or `error-red`. Slash, dash, underscore, and space
//! delimiters all normalize to the same segment form before keyword
//! matching. Confidence is 1.0 for an unambiguous keyword match, 0.7 when
//! two slots tie, and 0.5 for the best-effort heuristic bucket.

use serde::{Deserialize, Serialize};

/// The kind of a published Figma style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FigmaStyleType {
    Fill,
    Text,
    Effect,
    Grid,
}

/// Where a classified style lands in the token set.
#[derive(Debug, Clone, PartialEq)]
pub enum SemanticSlot {
    /// A canonical color slot (`primary`, `destructive`, …).
    Color(&'static str),
    /// A non-canonical color kept under `colors.extra`.
    ColorExtra(String),
    /// A font-size scale slot (`base`, `3xl`, …).
    FontSize(&'static str),
    /// A font-weight slot (`bold`, …).
    FontWeight(&'static str),
}

/// A classified style with the match confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleMapping {
    pub slot: SemanticSlot,
    pub confidence: f64,
}

/// Split a style name into lowercase segments. `Primary/Blue`,
/// `primary-blue`, `primary blue`, and `primary_blue` all produce
/// `["primary", "blue"]`.
pub fn normalize_segments(name: &str) -> Vec<String> {
    name.split(|c: char| c == '/' || c == '-' || c == '_' || c.is_whitespace())
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Canonical color slots in priority order; ties resolve to the earlier one.
const COLOR_KEYWORDS: &[(&str, &[&str])] = &[
    ("primary", &["primary", "brand", "main"]),
    ("secondary", &["secondary"]),
    ("accent", &["accent", "highlight"]),
    ("destructive", &["error", "danger", "destructive"]),
    ("background", &["background", "bg", "surface"]),
    ("foreground", &["foreground", "text", "fg"]),
    ("muted", &["muted", "subtle", "neutral", "gray", "grey"]),
    ("border", &["border", "stroke", "outline", "divider"]),
];

/// Non-canonical color names worth keeping under `colors.extra`.
const EXTRA_COLOR_KEYWORDS: &[&str] = &["success", "warning", "info"];

fn classify_fill(segments: &[String]) -> StyleMapping {
    let mut matched: Vec<&'static str> = Vec::new();
    for (slot, keywords) in COLOR_KEYWORDS {
        if segments.iter().any(|s| keywords.contains(&s.as_str())) {
            matched.push(slot);
        }
    }

    match matched.len() {
        1 => StyleMapping {
            slot: SemanticSlot::Color(matched[0]),
            confidence: 1.0,
        },
        2 => StyleMapping {
            // Two slots tied; priority order picks, confidence reflects it.
            slot: SemanticSlot::Color(matched[0]),
            confidence: 0.7,
        },
        0 => {
            if let Some(extra) = segments
                .iter()
                .find(|s| EXTRA_COLOR_KEYWORDS.contains(&s.as_str()))
            {
                return StyleMapping {
                    slot: SemanticSlot::ColorExtra(extra.clone()),
                    confidence: 1.0,
                };
            }
            // Best-effort: keep the style under its leading segment.
            StyleMapping {
                slot: SemanticSlot::ColorExtra(
                    segments.first().cloned().unwrap_or_else(|| "unnamed".into()),
                ),
                confidence: 0.5,
            }
        }
        _ => StyleMapping {
            slot: SemanticSlot::Color(matched[0]),
            confidence: 0.5,
        },
    }
}

fn classify_text(segments: &[String]) -> StyleMapping {
    let has = |words: &[&str]| segments.iter().any(|s| words.contains(&s.as_str()));

    let heading = has(&["heading", "title", "headline"]);
    let display = has(&["display", "hero"]);
    let body = has(&["body", "paragraph"]);
    let caption = has(&["caption", "overline", "footnote"]);
    let large = has(&["large", "lg", "big"]);
    let medium = has(&["medium", "md"]);
    let small = has(&["small", "sm"]);
    let weight_bold = has(&["bold", "heavy"]);
    let weight_medium_only = has(&["semibold"]);

    // Weight-only styles (e.g. `Weight/Bold`) map into the weight scale.
    if weight_bold && !heading && !body && !display && !caption {
        return StyleMapping {
            slot: SemanticSlot::FontWeight("bold"),
            confidence: 1.0,
        };
    }
    if weight_medium_only && !heading && !body {
        return StyleMapping {
            slot: SemanticSlot::FontWeight("semibold"),
            confidence: 1.0,
        };
    }

    let mut candidates: Vec<&'static str> = Vec::new();
    if display {
        candidates.push("4xl");
    }
    if heading {
        candidates.push(if large {
            "3xl"
        } else if medium {
            "2xl"
        } else if small {
            "xl"
        } else {
            "2xl"
        });
    }
    if body {
        candidates.push(if large {
            "lg"
        } else if small {
            "sm"
        } else {
            "base"
        });
    }
    if caption {
        candidates.push("xs");
    }

    match candidates.len() {
        1 => StyleMapping {
            slot: SemanticSlot::FontSize(candidates[0]),
            confidence: 1.0,
        },
        2 => StyleMapping {
            slot: SemanticSlot::FontSize(candidates[0]),
            confidence: 0.7,
        },
        0 => StyleMapping {
            slot: SemanticSlot::FontSize("base"),
            confidence: 0.5,
        },
        _ => StyleMapping {
            slot: SemanticSlot::FontSize(candidates[0]),
            confidence: 0.5,
        },
    }
}

/// Classify one published style name into a token slot.
///
/// Effect and grid styles have no token counterpart and return `None`.
pub fn classify_style(name: &str, style_type: FigmaStyleType) -> Option<StyleMapping> {
    let segments = normalize_segments(name);
    if segments.is_empty() {
        return None;
    }
    match style_type {
        FigmaStyleType::Fill => Some(classify_fill(&segments)),
        FigmaStyleType::Text => Some(classify_text(&segments)),
        FigmaStyleType::Effect | FigmaStyleType::Grid => None,
    }
}
