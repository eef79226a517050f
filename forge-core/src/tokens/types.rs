//! Design token value types.
//!
//! Tokens are typed rather than stringly keyed: each group carries its
//! canonical semantic slots as struct fields, plus an insertion-ordered
//! `extra` list for semantic names outside the canonical set. Every color
//! value must match `#RRGGBB`; every dimension must parse as `Npx`/`Nrem`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single extracted token value with optional confidence and a marker for
/// values substituted from the built-in fallback set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenField {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

impl TokenField {
    pub fn new(value: impl Into<String>, confidence: f64) -> Self {
        Self {
            value: value.into(),
            confidence: Some(confidence),
            fallback: false,
        }
    }

    /// A value taken from the fallback token set.
    pub fn fallback_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            confidence: None,
            fallback: true,
        }
    }

    pub fn exact(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            confidence: Some(1.0),
            fallback: false,
        }
    }
}

/// A named token outside the canonical slot set (e.g. `colors.success`).
/// Kept as a list so insertion order survives serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedToken {
    pub name: String,
    #[serde(flatten)]
    pub field: TokenField,
}

/// Semantic color slots. All values are `#RRGGBB` hex strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorTokens {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muted: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive: Option<TokenField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<NamedToken>,
}

impl ColorTokens {
    /// Canonical slots in display order, then extras in insertion order.
    pub fn iter(&self) -> Vec<(String, &TokenField)> {
        let mut out = Vec::new();
        for (name, slot) in [
            ("primary", &self.primary),
            ("secondary", &self.secondary),
            ("accent", &self.accent),
            ("background", &self.background),
            ("foreground", &self.foreground),
            ("muted", &self.muted),
            ("border", &self.border),
            ("destructive", &self.destructive),
        ] {
            if let Some(field) = slot {
                out.push((name.to_string(), field));
            }
        }
        for named in &self.extra {
            out.push((named.name.clone(), &named.field));
        }
        out
    }

    pub fn get(&self, name: &str) -> Option<&TokenField> {
        match name {
            "primary" => self.primary.as_ref(),
            "secondary" => self.secondary.as_ref(),
            "accent" => self.accent.as_ref(),
            "background" => self.background.as_ref(),
            "foreground" => self.foreground.as_ref(),
            "muted" => self.muted.as_ref(),
            "border" => self.border.as_ref(),
            "destructive" => self.destructive.as_ref(),
            other => self
                .extra
                .iter()
                .find(|n| n.name == other)
                .map(|n| &n.field),
        }
    }

    /// Set a slot by semantic name; unknown names land in `extra`,
    /// overwriting an existing entry of the same name.
    pub fn set(&mut self, name: &str, field: TokenField) {
        match name {
            "primary" => self.primary = Some(field),
            "secondary" => self.secondary = Some(field),
            "accent" => self.accent = Some(field),
            "background" => self.background = Some(field),
            "foreground" => self.foreground = Some(field),
            "muted" => self.muted = Some(field),
            "border" => self.border = Some(field),
            "destructive" => self.destructive = Some(field),
            other => {
                if let Some(existing) = self.extra.iter_mut().find(|n| n.name == other) {
                    existing.field = field;
                } else {
                    self.extra.push(NamedToken {
                        name: other.to_string(),
                        field,
                    });
                }
            }
        }
    }
}

/// Font size scale `xs…4xl`. Values are CSS lengths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeScale {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xs: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sm: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lg: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xl: Option<TokenField>,
    #[serde(rename = "2xl", skip_serializing_if = "Option::is_none")]
    pub xl2: Option<TokenField>,
    #[serde(rename = "3xl", skip_serializing_if = "Option::is_none")]
    pub xl3: Option<TokenField>,
    #[serde(rename = "4xl", skip_serializing_if = "Option::is_none")]
    pub xl4: Option<TokenField>,
}

/// Font weight slots. Values are numeric weight strings (`400`, `700`, …).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightScale {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semibold: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<TokenField>,
}

/// Line height slots. Values are unitless multipliers (`1.5`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineHeightScale {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tight: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relaxed: Option<TokenField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<TokenField>,
    #[serde(default)]
    pub font_size: SizeScale,
    #[serde(default)]
    pub font_weight: WeightScale,
    #[serde(default)]
    pub line_height: LineHeightScale,
}

/// Spacing scale `xs…3xl`. Values are CSS lengths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpacingScale {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xs: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sm: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lg: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xl: Option<TokenField>,
    #[serde(rename = "2xl", skip_serializing_if = "Option::is_none")]
    pub xl2: Option<TokenField>,
    #[serde(rename = "3xl", skip_serializing_if = "Option::is_none")]
    pub xl3: Option<TokenField>,
}

/// Border radius scale `sm…full`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadiusScale {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sm: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lg: Option<TokenField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full: Option<TokenField>,
}

/// The complete extracted token set: four required groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignTokens {
    #[serde(default)]
    pub colors: ColorTokens,
    #[serde(default)]
    pub typography: Typography,
    #[serde(default)]
    pub spacing: SpacingScale,
    #[serde(default)]
    pub border_radius: RadiusScale,
}

/// What grammar a slot's value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// `#RRGGBB`
    Color,
    /// `Npx` or `Nrem`
    Length,
    /// Numeric font weight 100–900
    Weight,
    /// Unitless multiplier
    LineHeight,
    /// Free-form font stack
    FontFamily,
}

/// A failed invariant on one token slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenViolation {
    pub path: String,
    pub value: String,
    pub reason: String,
}

/// A parsed CSS length. Only the `px`/`rem` grammar is accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CssLength {
    Px(f64),
    Rem(f64),
}

impl CssLength {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(num) = s.strip_suffix("px") {
            return num.parse::<f64>().ok().filter(|n| n.is_finite()).map(Self::Px);
        }
        if let Some(num) = s.strip_suffix("rem") {
            return num
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Self::Rem);
        }
        None
    }

    /// Pixel value, assuming the conventional 16px root font size.
    pub fn to_px(&self) -> f64 {
        match self {
            Self::Px(v) => *v,
            Self::Rem(v) => v * 16.0,
        }
    }
}

impl std::fmt::Display for CssLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Px(v) => write!(f, "{v}px"),
            Self::Rem(v) => write!(f, "{v}rem"),
        }
    }
}

/// `^#[0-9a-fA-F]{6}$` without pulling a regex into the hot path.
pub fn is_valid_hex_color(s: &str) -> bool {
    let Some(hex) = s.strip_prefix('#') else {
        return false;
    };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn validate_slot(path: &str, field: &TokenField, kind: SlotKind, out: &mut Vec<TokenViolation>) {
    let ok = match kind {
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
    if !ok {
        out.push(TokenViolation {
            path: path.to_string(),
            value: field.value.clone(),
            reason: match kind {
                SlotKind::Color => "expected #RRGGBB".into(),
                SlotKind::Length => "expected Npx or Nrem".into(),
                SlotKind::Weight => "expected numeric weight 100-900".into(),
                SlotKind::LineHeight => "expected positive unitless multiplier".into(),
                SlotKind::FontFamily => "expected non-empty font stack".into(),
            },
        });
    }
    if let Some(c) = field.confidence {
        if !(0.0..=1.0).contains(&c) {
            out.push(TokenViolation {
                path: path.to_string(),
                value: format!("{c}"),
                reason: "confidence out of [0,1]".into(),
            });
        }
    }
}

impl DesignTokens {
    /// Every populated slot with its dotted path and expected grammar.
    pub fn slots(&self) -> Vec<(String, &TokenField, SlotKind)> {
        let mut out = Vec::new();
        for (name, field) in self.colors.iter() {
            // Borrowed iteration rebuilt here to attach paths and kinds.
            out.push((format!("colors.{name}"), field, SlotKind::Color));
        }
        if let Some(f) = &self.typography.font_family {
            out.push(("typography.fontFamily".into(), f, SlotKind::FontFamily));
        }
        let sizes = &self.typography.font_size;
        for (name, slot) in [
            ("xs", &sizes.xs),
            ("sm", &sizes.sm),
            ("base", &sizes.base),
            ("lg", &sizes.lg),
            ("xl", &sizes.xl),
            ("2xl", &sizes.xl2),
            ("3xl", &sizes.xl3),
            ("4xl", &sizes.xl4),
        ] {
            if let Some(f) = slot {
                out.push((format!("typography.fontSize.{name}"), f, SlotKind::Length));
            }
        }
        let weights = &self.typography.font_weight;
        for (name, slot) in [
            ("normal", &weights.normal),
            ("medium", &weights.medium),
            ("semibold", &weights.semibold),
            ("bold", &weights.bold),
        ] {
            if let Some(f) = slot {
                out.push((format!("typography.fontWeight.{name}"), f, SlotKind::Weight));
            }
        }
        let lh = &self.typography.line_height;
        for (name, slot) in [
            ("tight", &lh.tight),
            ("normal", &lh.normal),
            ("relaxed", &lh.relaxed),
        ] {
            if let Some(f) = slot {
                out.push((
                    format!("typography.lineHeight.{name}"),
                    f,
                    SlotKind::LineHeight,
                ));
            }
        }
        for (name, slot) in [
            ("xs", &self.spacing.xs),
            ("sm", &self.spacing.sm),
            ("md", &self.spacing.md),
            ("lg", &self.spacing.lg),
            ("xl", &self.spacing.xl),
            ("2xl", &self.spacing.xl2),
            ("3xl", &self.spacing.xl3),
        ] {
            if let Some(f) = slot {
                out.push((format!("spacing.{name}"), f, SlotKind::Length));
            }
        }
        for (name, slot) in [
            ("sm", &self.border_radius.sm),
            ("md", &self.border_radius.md),
            ("lg", &self.border_radius.lg),
            ("full", &self.border_radius.full),
        ] {
            if let Some(f) = slot {
                // `full` is conventionally a huge px value; same grammar.
                out.push((format!("borderRadius.{name}"), f, SlotKind::Length));
            }
        }
        out
    }

    /// Check every populated slot against the §3 invariants.
    pub fn validate(&self) -> Vec<TokenViolation> {
        let mut out = Vec::new();
        for (path, field, kind) in self.slots() {
            validate_slot(&path, field, kind, &mut out);
        }
        out
    }

    /// Canonical JSON serialization; struct field order makes this stable.
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(self).expect("token serialization is infallible")
    }

    /// SHA-256 over the canonical serialization, hex-encoded.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_canonical_json().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Names of every populated color slot, canonical order first.
    pub fn color_names(&self) -> Vec<String> {
        self.colors.iter().into_iter().map(|(n, _)| n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DesignTokens {
        let mut tokens = DesignTokens::default();
        tokens.colors.primary = Some(TokenField::new("#3B82F6", 0.95));
        tokens.colors.destructive = Some(TokenField::new("#EF4444", 0.9));
        tokens
            .colors
            .set("success", TokenField::new("#22C55E", 0.8));
        tokens.typography.font_size.base = Some(TokenField::exact("16px"));
        tokens.typography.font_size.xl3 = Some(TokenField::exact("1.875rem"));
        tokens.typography.font_weight.bold = Some(TokenField::exact("700"));
        tokens.typography.line_height.normal = Some(TokenField::exact("1.5"));
        tokens.spacing.md = Some(TokenField::exact("16px"));
        tokens.border_radius.md = Some(TokenField::exact("8px"));
        tokens
    }

    #[test]
    fn test_hex_color_grammar() {
        assert!(is_valid_hex_color("#3B82F6"));
        assert!(is_valid_hex_color("#000000"));
        assert!(is_valid_hex_color("#abcdef"));
        assert!(!is_valid_hex_color("3B82F6"));
        assert!(!is_valid_hex_color("#3B82F"));
        assert!(!is_valid_hex_color("#3B82F6A"));
        assert!(!is_valid_hex_color("#GGGGGG"));
        assert!(!is_valid_hex_color("#fff"));
    }

    #[test]
    fn test_css_length_grammar() {
        assert_eq!(CssLength::parse("16px"), Some(CssLength::Px(16.0)));
        assert_eq!(CssLength::parse("1.5rem"), Some(CssLength::Rem(1.5)));
        assert_eq!(CssLength::parse("0px"), Some(CssLength::Px(0.0)));
        assert!(CssLength::parse("16").is_none());
        assert!(CssLength::parse("16em").is_none());
        assert!(CssLength::parse("px").is_none());
        assert!(CssLength::parse("16 px").is_none());
    }

    #[test]
    fn test_css_length_to_px() {
        assert_eq!(CssLength::Rem(1.5).to_px(), 24.0);
        assert_eq!(CssLength::Px(8.0).to_px(), 8.0);
    }

    #[test]
    fn test_valid_tokens_have_no_violations() {
        assert!(sample().validate().is_empty());
    }

    #[test]
    fn test_invalid_color_is_flagged() {
        let mut tokens = sample();
        tokens.colors.primary = Some(TokenField::new("blue", 0.9));
        let violations = tokens.validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "colors.primary");
        assert!(violations[0].reason.contains("#RRGGBB"));
    }

    #[test]
    fn test_invalid_dimension_is_flagged() {
        let mut tokens = sample();
        tokens.spacing.md = Some(TokenField::exact("16"));
        let violations = tokens.validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "spacing.md");
    }

    #[test]
    fn test_confidence_out_of_range_is_flagged() {
        let mut tokens = sample();
        tokens.colors.primary = Some(TokenField::new("#3B82F6", 1.2));
        let violations = tokens.validate();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].reason.contains("confidence"));
    }

    #[test]
    fn test_json_round_trip_is_lossless() {
        let tokens = sample();
        let json = tokens.to_canonical_json();
        let restored: DesignTokens = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, tokens);
        assert_eq!(restored.hash(), tokens.hash());
    }

    #[test]
    fn test_scale_serde_names() {
        let tokens = sample();
        let json: serde_json::Value = serde_json::from_str(&tokens.to_canonical_json()).unwrap();
        assert_eq!(json["typography"]["fontSize"]["3xl"]["value"], "1.875rem");
        assert_eq!(json["borderRadius"]["md"]["value"], "8px");
    }

    #[test]
    fn test_extra_colors_preserve_insertion_order() {
        let mut tokens = DesignTokens::default();
        tokens.colors.set("warning", TokenField::exact("#F59E0B"));
        tokens.colors.set("success", TokenField::exact("#22C55E"));
        let names = tokens.color_names();
        assert_eq!(names, vec!["warning", "success"]);

        // Overwriting keeps the original position
        tokens.colors.set("warning", TokenField::exact("#FBBF24"));
        assert_eq!(tokens.color_names(), vec!["warning", "success"]);
        assert_eq!(tokens.colors.get("warning").unwrap().value, "#FBBF24");
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = sample();
        let mut b = sample();
        b.spacing.md = Some(TokenField::exact("20px"));
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_fallback_flag_survives_round_trip() {
        let mut tokens = DesignTokens::default();
        tokens.colors.primary = Some(TokenField::fallback_value("#3B82F6"));
        let json = tokens.to_canonical_json();
        assert!(json.contains("\"fallback\":true"));
        let restored: DesignTokens = serde_json::from_str(&json).unwrap();
        assert!(restored.colors.primary.unwrap().fallback);
    }
}
