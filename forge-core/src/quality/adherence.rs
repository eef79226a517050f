//! Token adherence measurement.
//!
//! For every token-shaped value the component renders (literal hex colors,
//! literal px/rem lengths, and `var(--...)` references), compare against the
//! approved token set. Colors match within ΔE ≤ 2 (CIE76); dimensions must
//! match exactly. Adherence per category is matched/total; the overall
//! score is the mean of the categories present.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::color::{delta_e_cie76, parse_hex};
use crate::tokens::{CssLength, DesignTokens, SlotKind};

pub const DELTA_E_TOLERANCE: f64 = 2.0;
pub const ADHERENCE_TARGET: f64 = 0.9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryAdherence {
    pub matched: usize,
    pub total: usize,
}

impl CategoryAdherence {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.matched as f64 / self.total as f64
        }
    }

    fn record(&mut self, matched: bool) {
        self.total += 1;
        if matched {
            self.matched += 1;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenAdherence {
    pub colors: CategoryAdherence,
    pub typography: CategoryAdherence,
    pub spacing: CategoryAdherence,
    /// Values seen in the component with no counterpart in the token set.
    pub unmatched_values: Vec<String>,
}

impl TokenAdherence {
    /// Mean of the categories with at least one observation; 1.0 when the
    /// component uses no token-shaped values at all.
    pub fn overall(&self) -> f64 {
        let present: Vec<f64> = [&self.colors, &self.typography, &self.spacing]
            .into_iter()
            .filter(|c| c.total > 0)
            .map(|c| c.ratio())
            .collect();
        if present.is_empty() {
            1.0
        } else {
            present.iter().sum::<f64>() / present.len() as f64
        }
    }

    pub fn meets_target(&self) -> bool {
        self.overall() >= ADHERENCE_TARGET
    }
}

/// Measure how faithfully the component uses the approved tokens.
pub fn measure(code: &str, tokens: &DesignTokens) -> TokenAdherence {
    let mut adherence = TokenAdherence::default();

    let approved_colors: Vec<_> = tokens
        .colors
        .iter()
        .into_iter()
        .filter_map(|(_, f)| parse_hex(&f.value).ok())
        .collect();

    let (mut approved_lengths_typo, mut approved_lengths_spacing) =
        (HashSet::new(), HashSet::new());
    let mut approved_var_names: HashSet<String> = HashSet::new();
    for (path, field, kind) in tokens.slots() {
        approved_var_names.insert(css_var_name(&path));
        if kind == SlotKind::Length {
            let normalized = CssLength::parse(&field.value)
                .map(|l| l.to_string())
                .unwrap_or_else(|| field.value.clone());
            if path.starts_with("typography") {
                approved_lengths_typo.insert(normalized);
            } else {
                approved_lengths_spacing.insert(normalized);
            }
        }
    }

    // Literal hex colors
    let hex_re = Regex::new(r"#[0-9a-fA-F]{6}\b").expect("static regex");
    for m in hex_re.find_iter(code) {
        let Ok(used) = parse_hex(m.as_str()) else {
            continue;
        };
        let matched = approved_colors
            .iter()
            .any(|approved| delta_e_cie76(used, *approved) <= DELTA_E_TOLERANCE);
        adherence.colors.record(matched);
        if !matched {
            adherence.unmatched_values.push(m.as_str().to_string());
        }
    }

    // Literal lengths; only values inside style-ish contexts count, which
    // line-level filtering approximates well enough for generated code.
    let len_re = Regex::new(r"\b\d+(?:\.\d+)?(?:px|rem)\b").expect("static regex");
    for line in code.lines() {
        let is_font_context = line.contains("fontSize") || line.contains("font-size");
        let is_style_context = is_font_context
            || line.contains("padding")
            || line.contains("margin")
            || line.contains("gap")
            || line.contains("borderRadius")
            || line.contains("border-radius")
            || line.contains("width")
            || line.contains("height");
        if !is_style_context {
            continue;
        }
        for m in len_re.find_iter(line) {
            let normalized = CssLength::parse(m.as_str())
                .map(|l| l.to_string())
                .unwrap_or_else(|| m.as_str().to_string());
            if is_font_context {
                adherence
                    .typography
                    .record(approved_lengths_typo.contains(&normalized));
            } else {
                let matched = approved_lengths_spacing.contains(&normalized);
                adherence.spacing.record(matched);
                if !matched {
                    adherence.unmatched_values.push(m.as_str().to_string());
                }
            }
        }
    }

    // CSS variable references: adherent when the variable maps to a token.
    let var_re = Regex::new(r"var\(\s*(--[a-z0-9-]+)").expect("static regex");
    for caps in var_re.captures_iter(code) {
        let name = caps[1].to_string();
        let matched = approved_var_names.contains(&name);
        if name.starts_with("--color") {
            adherence.colors.record(matched);
        } else if name.starts_with("--font") || name.starts_with("--line-height") {
            adherence.typography.record(matched);
        } else if name.starts_with("--spacing") || name.starts_with("--radius") {
            adherence.spacing.record(matched);
        }
        if !matched {
            adherence.unmatched_values.push(format!("var({name})"));
        }
    }

    adherence
}

/// `colors.primary` → `--color-primary`, `spacing.md` → `--spacing-md`,
/// `typography.fontSize.xs` → `--font-size-xs`, `borderRadius.md` →
/// `--radius-md`. Matches the naming the generator emits.
pub fn css_var_name(path: &str) -> String {
    let parts: Vec<&str> = path.split('.').collect();
    match parts.as_slice() {
        ["colors", name] => format!("--color-{}", kebab(name)),
        ["spacing", name] => format!("--spacing-{}", kebab(name)),
        ["borderRadius", name] => format!("--radius-{}", kebab(name)),
        ["typography", "fontFamily"] => "--font-family".to_string(),
        ["typography", "fontSize", name] => format!("--font-size-{}", kebab(name)),
        ["typography", "fontWeight", name] => format!("--font-weight-{}", kebab(name)),
        ["typography", "lineHeight", name] => format!("--line-height-{}", kebab(name)),
        _ => format!("--{}", kebab(&path.replace('.', "-"))),
    }
}

fn kebab(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
