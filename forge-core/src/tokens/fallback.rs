//! Built-in fallback token set.
//!
//! When extraction fails for a group, or an individual field fails
//! validation or lands below the confidence threshold, the corresponding
//! default from this set is substituted and marked `fallback=true`.

use super::types::{CssLength, DesignTokens, SlotKind, TokenField};
use super::types::is_valid_hex_color;

/// Confidence below which an extracted value is replaced by its default.
pub const FALLBACK_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// The neutral default palette and scales. Values mirror the common
/// Tailwind-derived design system the pattern library is curated against.
pub fn default_tokens() -> DesignTokens {
    let mut t = DesignTokens::default();

    t.colors.primary = Some(TokenField::fallback_value("#3B82F6"));
    t.colors.secondary = Some(TokenField::fallback_value("#64748B"));
    t.colors.accent = Some(TokenField::fallback_value("#8B5CF6"));
    t.colors.background = Some(TokenField::fallback_value("#FFFFFF"));
    t.colors.foreground = Some(TokenField::fallback_value("#0F172A"));
    t.colors.muted = Some(TokenField::fallback_value("#F1F5F9"));
    t.colors.border = Some(TokenField::fallback_value("#E2E8F0"));
    t.colors.destructive = Some(TokenField::fallback_value("#EF4444"));

    t.typography.font_family = Some(TokenField::fallback_value(
        "Inter, system-ui, sans-serif",
    ));
    t.typography.font_size.xs = Some(TokenField::fallback_value("0.75rem"));
    t.typography.font_size.sm = Some(TokenField::fallback_value("0.875rem"));
    t.typography.font_size.base = Some(TokenField::fallback_value("1rem"));
    t.typography.font_size.lg = Some(TokenField::fallback_value("1.125rem"));
    t.typography.font_size.xl = Some(TokenField::fallback_value("1.25rem"));
    t.typography.font_size.xl2 = Some(TokenField::fallback_value("1.5rem"));
    t.typography.font_size.xl3 = Some(TokenField::fallback_value("1.875rem"));
    t.typography.font_size.xl4 = Some(TokenField::fallback_value("2.25rem"));
    t.typography.font_weight.normal = Some(TokenField::fallback_value("400"));
    t.typography.font_weight.medium = Some(TokenField::fallback_value("500"));
    t.typography.font_weight.semibold = Some(TokenField::fallback_value("600"));
    t.typography.font_weight.bold = Some(TokenField::fallback_value("700"));
    t.typography.line_height.tight = Some(TokenField::fallback_value("1.25"));
    t.typography.line_height.normal = Some(TokenField::fallback_value("1.5"));
    t.typography.line_height.relaxed = Some(TokenField::fallback_value("1.75"));

    t.spacing.xs = Some(TokenField::fallback_value("4px"));
    t.spacing.sm = Some(TokenField::fallback_value("8px"));
    t.spacing.md = Some(TokenField::fallback_value("16px"));
    t.spacing.lg = Some(TokenField::fallback_value("24px"));
    t.spacing.xl = Some(TokenField::fallback_value("32px"));
    t.spacing.xl2 = Some(TokenField::fallback_value("48px"));
    t.spacing.xl3 = Some(TokenField::fallback_value("64px"));

    t.border_radius.sm = Some(TokenField::fallback_value("4px"));
    t.border_radius.md = Some(TokenField::fallback_value("8px"));
    t.border_radius.lg = Some(TokenField::fallback_value("12px"));
    t.border_radius.full = Some(TokenField::fallback_value("9999px"));

    t
}

fn slot_is_acceptable(field: &TokenField, kind: SlotKind, min_confidence: f64) -> bool {
    let grammar_ok = match kind {
        SlotKind::Color => is_valid_hex_color(&field.value),
        SlotKind::Length => CssLength::parse(&field.value).is_some(),
        SlotKind::Weight => field
            .value
            .parse::<u32>()
            .map(|w| (100..=900).contains(&w))
            .unwrap_or(false),
        SlotKind::LineHeight => field
            .value
            .parse::<f64>()
            .map(|v| v.is_finite() && v > 0.0)
            .unwrap_or(false),
        SlotKind::FontFamily => !field.value.trim().is_empty(),
    };
    if !grammar_ok {
        return false;
    }
    match field.confidence {
        Some(c) => (min_confidence..=1.0).contains(&c),
        // No confidence reported (e.g. earlier fallbacks): keep as-is.
        None => true,
    }
}

fn resolve(
    path: &str,
    slot: &mut Option<TokenField>,
    default: &Option<TokenField>,
    kind: SlotKind,
    min_confidence: f64,
    substituted: &mut Vec<String>,
) {
    let acceptable = slot
        .as_ref()
        .map(|f| slot_is_acceptable(f, kind, min_confidence))
        .unwrap_or(false);
    if !acceptable {
        *slot = default.clone();
        substituted.push(path.to_string());
    }
}

/// Replace invalid, low-confidence, or missing canonical slots with their
/// defaults. Returns the dotted paths that were substituted. Extra (non
/// canonical) entries that fail their grammar are dropped rather than
/// defaulted, since the fallback set has nothing to offer for them.
pub fn apply_fallbacks(tokens: &mut DesignTokens, min_confidence: f64) -> Vec<String> {
    let defaults = default_tokens();
    let mut substituted = Vec::new();

    macro_rules! slot {
        ($path:expr, $field:expr, $default:expr, $kind:expr) => {
            resolve(
                $path,
                &mut $field,
                &$default,
                $kind,
                min_confidence,
                &mut substituted,
            );
        };
    }

    slot!("colors.primary", tokens.colors.primary, defaults.colors.primary, SlotKind::Color);
    slot!("colors.secondary", tokens.colors.secondary, defaults.colors.secondary, SlotKind::Color);
    slot!("colors.accent", tokens.colors.accent, defaults.colors.accent, SlotKind::Color);
    slot!("colors.background", tokens.colors.background, defaults.colors.background, SlotKind::Color);
    slot!("colors.foreground", tokens.colors.foreground, defaults.colors.foreground, SlotKind::Color);
    slot!("colors.muted", tokens.colors.muted, defaults.colors.muted, SlotKind::Color);
    slot!("colors.border", tokens.colors.border, defaults.colors.border, SlotKind::Color);
    slot!("colors.destructive", tokens.colors.destructive, defaults.colors.destructive, SlotKind::Color);

    tokens.colors.extra.retain(|named| {
        slot_is_acceptable(&named.field, SlotKind::Color, min_confidence)
    });

    slot!("typography.fontFamily", tokens.typography.font_family, defaults.typography.font_family, SlotKind::FontFamily);
    slot!("typography.fontSize.xs", tokens.typography.font_size.xs, defaults.typography.font_size.xs, SlotKind::Length);
    slot!("typography.fontSize.sm", tokens.typography.font_size.sm, defaults.typography.font_size.sm, SlotKind::Length);
    slot!("typography.fontSize.base", tokens.typography.font_size.base, defaults.typography.font_size.base, SlotKind::Length);
    slot!("typography.fontSize.lg", tokens.typography.font_size.lg, defaults.typography.font_size.lg, SlotKind::Length);
    slot!("typography.fontSize.xl", tokens.typography.font_size.xl, defaults.typography.font_size.xl, SlotKind::Length);
    slot!("typography.fontSize.2xl", tokens.typography.font_size.xl2, defaults.typography.font_size.xl2, SlotKind::Length);
    slot!("typography.fontSize.3xl", tokens.typography.font_size.xl3, defaults.typography.font_size.xl3, SlotKind::Length);
    slot!("typography.fontSize.4xl", tokens.typography.font_size.xl4, defaults.typography.font_size.xl4, SlotKind::Length);
    slot!("typography.fontWeight.normal", tokens.typography.font_weight.normal, defaults.typography.font_weight.normal, SlotKind::Weight);
    slot!("typography.fontWeight.medium", tokens.typography.font_weight.medium, defaults.typography.font_weight.medium, SlotKind::Weight);
    slot!("typography.fontWeight.semibold", tokens.typography.font_weight.semibold, defaults.typography.font_weight.semibold, SlotKind::Weight);
    slot!("typography.fontWeight.bold", tokens.typography.font_weight.bold, defaults.typography.font_weight.bold, SlotKind::Weight);
    slot!("typography.lineHeight.tight", tokens.typography.line_height.tight, defaults.typography.line_height.tight, SlotKind::LineHeight);
    slot!("typography.lineHeight.normal", tokens.typography.line_height.normal, defaults.typography.line_height.normal, SlotKind::LineHeight);
    slot!("typography.lineHeight.relaxed", tokens.typography.line_height.relaxed, defaults.typography.line_height.relaxed, SlotKind::LineHeight);

    slot!("spacing.xs", tokens.spacing.xs, defaults.spacing.xs, SlotKind::Length);
    slot!("spacing.sm", tokens.spacing.sm, defaults.spacing.sm, SlotKind::Length);
    slot!("spacing.md", tokens.spacing.md, defaults.spacing.md, SlotKind::Length);
    slot!("spacing.lg", tokens.spacing.lg, defaults.spacing.lg, SlotKind::Length);
    slot!("spacing.xl", tokens.spacing.xl, defaults.spacing.xl, SlotKind::Length);
    slot!("spacing.2xl", tokens.spacing.xl2, defaults.spacing.xl2, SlotKind::Length);
    slot!("spacing.3xl", tokens.spacing.xl3, defaults.spacing.xl3, SlotKind::Length);

    slot!("borderRadius.sm", tokens.border_radius.sm, defaults.border_radius.sm, SlotKind::Length);
    slot!("borderRadius.md", tokens.border_radius.md, defaults.border_radius.md, SlotKind::Length);
    slot!("borderRadius.lg", tokens.border_radius.lg, defaults.border_radius.lg, SlotKind::Length);
    slot!("borderRadius.full", tokens.border_radius.full, defaults.border_radius.full, SlotKind::Length);

    substituted
}
