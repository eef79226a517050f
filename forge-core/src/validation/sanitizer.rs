//! Security sanitization of generated TypeScript.
//!
//! Regex scan over the emitted component for code-execution vectors,
//! DOM-injection sinks, prototype pollution, hardcoded secrets, and
//! server-side environment access in client code. A high-severity match
//! marks the code unsafe. A sanitized rewrite is attempted only for
//! patterns with a deterministic safe replacement; everything else is
//! reported for the repair loop to fix.

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One flagged occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityIssue {
    /// Stable pattern identifier (e.g. `eval-call`).
    pub pattern: String,
    pub severity: Severity,
    /// 1-based line in the scanned source.
    pub line: usize,
    /// The offending line, trimmed.
    pub snippet: String,
    pub description: String,
}

/// Scan verdict, in the shape the upload-safety collaborator also uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizationVerdict {
    pub is_safe: bool,
    pub issues: Vec<SecurityIssue>,
    /// Present when every high-severity finding had a deterministic rewrite.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_code: Option<String>,
}

impl SanitizationVerdict {
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            issues: Vec::new(),
            sanitized_code: None,
        }
    }
}

struct ScanPattern {
    id: &'static str,
    regex: Regex,
    severity: Severity,
    description: &'static str,
    /// Deterministic replacement, when one exists.
    rewrite: Option<(&'static str, &'static str)>,
}

/// The sanitizer owns its compiled pattern set; construction is cheap
/// enough to do once per generator.
pub struct SecuritySanitizer {
    patterns: Vec<ScanPattern>,
}

impl Default for SecuritySanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SecuritySanitizer {
    pub fn new() -> Self {
        let patterns = vec![
            ScanPattern {
                id: "eval-call",
                regex: Regex::new(r"\beval\s*\(").expect("static regex"),
                severity: Severity::High,
                description: "eval() executes arbitrary strings as code",
                rewrite: None,
            },
            ScanPattern {
                id: "dangerously-set-inner-html",
                regex: Regex::new(r"dangerouslySetInnerHTML").expect("static regex"),
                severity: Severity::High,
                description: "dangerouslySetInnerHTML bypasses React's XSS protection",
                rewrite: None,
            },
            ScanPattern {
                id: "document-write",
                regex: Regex::new(r"document\.write\s*\(").expect("static regex"),
                severity: Severity::High,
                description: "document.write injects markup directly into the document",
                rewrite: None,
            },
            ScanPattern {
                id: "new-function",
                regex: Regex::new(r"new\s+Function\s*\(").expect("static regex"),
                severity: Severity::High,
                description: "new Function() compiles strings to code at runtime",
                rewrite: None,
            },
            ScanPattern {
                id: "inner-html-assignment",
                regex: Regex::new(r"\.innerHTML\s*=").expect("static regex"),
                severity: Severity::High,
                description: "innerHTML assignment is an XSS sink",
                rewrite: Some((".innerHTML =", ".textContent =")),
            },
            ScanPattern {
                id: "proto-pollution",
                regex: Regex::new(r"__proto__").expect("static regex"),
                severity: Severity::High,
                description: "__proto__ access enables prototype pollution",
                rewrite: None,
            },
            ScanPattern {
                id: "hardcoded-secret",
                regex: Regex::new(
                    r#"(?i)(api[_-]?key|secret|password|token)\s*[:=]\s*["'][A-Za-z0-9_\-]{16,}["']"#,
                )
                .expect("static regex"),
                severity: Severity::High,
                description: "credential-shaped literal embedded in source",
                rewrite: None,
            },
            ScanPattern {
                id: "process-env",
                regex: Regex::new(r"process\.env\.\w+").expect("static regex"),
                severity: Severity::Medium,
                description: "server environment variables are not available in client code",
                rewrite: None,
            },
        ];
        Self { patterns }
    }

    /// Scan the source, line by line, against the full pattern set.
    pub fn scan(&self, code: &str) -> SanitizationVerdict {
        let mut issues: Vec<SecurityIssue> = Vec::new();

        for (line_idx, line) in code.lines().enumerate() {
            for pattern in &self.patterns {
                if pattern.regex.is_match(line) {
                    issues.push(SecurityIssue {
                        pattern: pattern.id.to_string(),
                        severity: pattern.severity,
                        line: line_idx + 1,
                        snippet: truncate(line.trim(), 120),
                        description: pattern.description.to_string(),
                    });
                }
            }
        }

        let high_issues: Vec<&SecurityIssue> = issues
            .iter()
            .filter(|i| i.severity == Severity::High)
            .collect();
        let is_safe = high_issues.is_empty();

        // Rewrite only when every high-severity finding is rewritable;
        // a partial rewrite would falsely suggest the output is clean.
        let sanitized_code = if !is_safe
            && high_issues.iter().all(|issue| {
                self.patterns
                    .iter()
                    .any(|p| p.id == issue.pattern && p.rewrite.is_some())
            }) {
            let mut rewritten = code.to_string();
            for pattern in self.patterns.iter().filter(|p| p.rewrite.is_some()) {
                let (from, to) = pattern.rewrite.expect("filtered on is_some");
                rewritten = rewritten.replace(from, to);
                // Also cover the no-space spelling of the same sink.
                let (from_tight, to_tight) =
                    (from.replace(" =", "="), to.replace(" =", "="));
                rewritten = rewritten.replace(&from_tight, &to_tight);
            }
            Some(rewritten)
        } else {
            None
        };

        SanitizationVerdict {
            is_safe,
            issues,
            sanitized_code,
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max])
    }
}
