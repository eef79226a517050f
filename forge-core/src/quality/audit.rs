//! Static accessibility audit of generated TSX.
//!
//! An axe-style rule pass over the emitted source: images need alternatives,
//! interactive elements need accessible names and keyboard paths, tabindex
//! must not be positive. This is a source-level approximation of a runtime
//! audit; rules only fire on patterns that are reliably detectable in TSX.

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Minor,
    Moderate,
    Serious,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A11yViolation {
    /// Stable rule id, axe-style (e.g. `image-alt`).
    pub rule: String,
    pub impact: Impact,
    /// The offending source line, trimmed.
    pub element: String,
    pub message: String,
}

struct AuditRule {
    id: &'static str,
    impact: Impact,
    regex: Regex,
    /// When set, a line matching `regex` is exempt if it also matches this.
    exempt: Option<Regex>,
    message: &'static str,
}

fn rules() -> Vec<AuditRule> {
    vec![
        AuditRule {
            id: "image-alt",
            impact: Impact::Critical,
            regex: Regex::new(r"<img\b[^>]*>").expect("static regex"),
            exempt: Some(Regex::new(r#"\balt\s*="#).expect("static regex")),
            message: "image elements must have an alt attribute",
        },
        AuditRule {
            id: "button-name",
            impact: Impact::Serious,
            // Self-closing buttons have no children to provide a name.
            regex: Regex::new(r"<button\b[^>]*/>").expect("static regex"),
            exempt: Some(Regex::new(r#"aria-label(ledby)?\s*="#).expect("static regex")),
            message: "buttons without content need an aria-label",
        },
        AuditRule {
            id: "tabindex-positive",
            impact: Impact::Serious,
            regex: Regex::new(r#"tabIndex=\{?\s*[1-9]"#).expect("static regex"),
            exempt: None,
            message: "positive tabIndex breaks the natural focus order",
        },
        AuditRule {
            id: "click-without-keyboard",
            impact: Impact::Serious,
            // Click handlers on non-interactive elements need a key handler.
            regex: Regex::new(r"<(div|span)\b[^>]*onClick").expect("static regex"),
            exempt: Some(Regex::new(r"onKeyDown|onKeyUp|onKeyPress|role=").expect("static regex")),
            message: "click handlers on non-interactive elements need keyboard support",
        },
        AuditRule {
            id: "autofocus",
            impact: Impact::Moderate,
            regex: Regex::new(r"\bautoFocus\b").expect("static regex"),
            exempt: None,
            message: "autofocus moves focus unexpectedly for screen reader users",
        },
    ]
}

/// Run the rule pass over the component source.
pub fn audit_component(code: &str) -> Vec<A11yViolation> {
    let rules = rules();
    let mut violations = Vec::new();

    for line in code.lines() {
        for rule in &rules {
            if !rule.regex.is_match(line) {
                continue;
            }
            if let Some(exempt) = &rule.exempt {
                if exempt.is_match(line) {
                    continue;
                }
            }
            violations.push(A11yViolation {
                rule: rule.id.to_string(),
                impact: rule.impact,
                element: truncate(line.trim(), 120),
                message: rule.message.to_string(),
            });
        }
    }
    violations
}

/// Keyboard navigation check: interactive markup must remain reachable and
/// operable. Returns violations rather than a bool so the report can list
/// specifics.
pub fn check_keyboard_navigation(code: &str) -> Vec<A11yViolation> {
    let mut violations = Vec::new();

    // A component that disables outlines without providing a focus style
    // leaves keyboard users without a visible cursor.
    let kills_outline = code.contains("outline: \"none\"") || code.contains("outline:none");
    let restores_focus = code.contains(":focus") || code.contains("focus-visible")
        || code.contains("boxShadow");
    if kills_outline && !restores_focus {
        violations.push(A11yViolation {
            rule: "focus-visible".into(),
            impact: Impact::Serious,
            element: "outline: none".into(),
            message: "removing the outline without a replacement hides keyboard focus".into(),
        });
    }
    violations
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max])
    }
}

/// True when no violation is critical or serious; moderate and minor
/// findings stay warnings.
pub fn passes_a11y(violations: &[A11yViolation]) -> bool {
    !violations
        .iter()
        .any(|v| v.impact >= Impact::Serious)
}
