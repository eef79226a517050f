//! WCAG AA contrast checks over the approved token palette.
//!
//! Thresholds: normal text 4.5:1, large text 3:1, UI components and focus
//! indicators 3:1. Checks run over the semantic pairs the generated
//! components actually compose: foreground on background, each accent
//! color used as a fill against the background, and the primary color as
//! the focus ring.

use serde::{Deserialize, Serialize};

use super::color::{contrast_ratio, parse_hex};
use crate::tokens::DesignTokens;

pub const NORMAL_TEXT_MIN: f64 = 4.5;
pub const LARGE_TEXT_MIN: f64 = 3.0;
pub const UI_COMPONENT_MIN: f64 = 3.0;
pub const FOCUS_INDICATOR_MIN: f64 = 3.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContrastViolation {
    /// What was being checked, e.g. `text: foreground on background`.
    pub context: String,
    pub foreground: String,
    pub background: String,
    pub ratio: f64,
    pub required: f64,
}

fn check_pair(
    context: &str,
    fg: Option<&str>,
    bg: Option<&str>,
    required: f64,
    out: &mut Vec<ContrastViolation>,
) {
    let (Some(fg), Some(bg)) = (fg, bg) else {
        return;
    };
    let (Ok(fg_rgb), Ok(bg_rgb)) = (parse_hex(fg), parse_hex(bg)) else {
        return;
    };
    let ratio = contrast_ratio(fg_rgb, bg_rgb);
    if ratio < required {
        out.push(ContrastViolation {
            context: context.to_string(),
            foreground: fg.to_string(),
            background: bg.to_string(),
            ratio: (ratio * 100.0).round() / 100.0,
            required,
        });
    }
}

/// Check the semantic color pairs of the token set.
pub fn check_palette(tokens: &DesignTokens) -> Vec<ContrastViolation> {
    let mut violations = Vec::new();
    let color = |name: &str| tokens.colors.get(name).map(|f| f.value.as_str());

    check_pair(
        "text: foreground on background",
        color("foreground"),
        color("background"),
        NORMAL_TEXT_MIN,
        &mut violations,
    );
    for accent in ["primary", "secondary", "destructive", "accent"] {
        check_pair(
            &format!("ui: {accent} fill on background"),
            color(accent),
            color("background"),
            UI_COMPONENT_MIN,
            &mut violations,
        );
    }
    check_pair(
        "ui: border on background",
        color("border"),
        color("background"),
        UI_COMPONENT_MIN,
        &mut violations,
    );
    check_pair(
        "focus: primary focus ring on background",
        color("primary"),
        color("background"),
        FOCUS_INDICATOR_MIN,
        &mut violations,
    );
    violations
}
