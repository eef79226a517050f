//! The merged quality report.
//!
//! Combines validation results with the a11y audit, contrast checks, and
//! token adherence into one PASS/FAIL report, serializable as JSON and
//! renderable as a standalone HTML document. Warnings never cause FAIL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::adherence::{TokenAdherence, ADHERENCE_TARGET};
use super::audit::{A11yViolation, Impact};
use super::contrast::ContrastViolation;
use super::QualityScores;
use crate::validation::ValidationResults;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportStatus {
    Pass,
    Fail,
}

/// An auto-fix applied somewhere earlier in the pipeline, itemized for the
/// report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedFix {
    /// Fix category, e.g. `security-rewrite` or `import-order`.
    pub category: String,
    pub description: String,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub status: ReportStatus,
    pub scores: QualityScores,
    pub validation: ValidationResults,
    pub a11y_violations: Vec<A11yViolation>,
    pub contrast_violations: Vec<ContrastViolation>,
    pub adherence: TokenAdherence,
    pub applied_fixes: Vec<AppliedFix>,
    /// fixed / (fixed + unfixed); `None` when nothing needed fixing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_fix_success_rate: Option<f64>,
    /// False when generation ran without a retrieved pattern.
    pub pattern_matched: bool,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

/// PASS iff TypeScript passes, zero ESLint errors, zero critical/serious
/// a11y violations, and token adherence at target. Contrast findings and
/// everything else are warnings.
pub fn decide_status(
    validation: &ValidationResults,
    a11y: &[A11yViolation],
    adherence: &TokenAdherence,
) -> ReportStatus {
    let a11y_ok = !a11y.iter().any(|v| v.impact >= Impact::Serious);
    if validation.typescript_passed
        && validation.eslint_errors.is_empty()
        && a11y_ok
        && adherence.overall() >= ADHERENCE_TARGET
    {
        ReportStatus::Pass
    } else {
        ReportStatus::Fail
    }
}

/// fixed / (fixed + unfixed), where unfixed counts the findings that
/// survived into the final report.
pub fn auto_fix_success_rate(fixed: usize, unfixed: usize) -> Option<f64> {
    if fixed + unfixed == 0 {
        None
    } else {
        Some(fixed as f64 / (fixed + unfixed) as f64)
    }
}

impl QualityReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("report serialization is infallible")
    }

    /// Render a self-contained HTML document.
    pub fn render_html(&self) -> String {
        let status_color = match self.status {
            ReportStatus::Pass => "#16a34a",
            ReportStatus::Fail => "#dc2626",
        };
        let mut html = String::with_capacity(4096);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str("<title>Component Quality Report</title>\n");
        html.push_str(
            "<style>body{font-family:system-ui,sans-serif;margin:2rem;color:#0f172a}\
             table{border-collapse:collapse;margin:1rem 0}\
             td,th{border:1px solid #e2e8f0;padding:.4rem .8rem;text-align:left}\
             .status{font-size:1.4rem;font-weight:700}</style>\n</head>\n<body>\n",
        );
        html.push_str(&format!(
            "<h1>Component Quality Report</h1>\n<p class=\"status\" style=\"color:{status_color}\">{:?}</p>\n<p>{}</p>\n",
            self.status,
            escape(&self.summary)
        ));

        html.push_str("<h2>Scores</h2>\n<table>\n<tr><th>Dimension</th><th>Score</th></tr>\n");
        for (name, score) in [
            ("Compilation", self.scores.compilation),
            ("Type safety", self.scores.type_safety),
            ("Linting", self.scores.linting),
            ("Overall", self.scores.overall),
        ] {
            html.push_str(&format!("<tr><td>{name}</td><td>{score:.1}</td></tr>\n"));
        }
        html.push_str("</table>\n");

        html.push_str(&format!(
            "<h2>Token adherence</h2>\n<p>Overall {:.2} (target {ADHERENCE_TARGET})</p>\n",
            self.adherence.overall()
        ));

        if !self.a11y_violations.is_empty() {
            html.push_str("<h2>Accessibility</h2>\n<table>\n<tr><th>Rule</th><th>Impact</th><th>Message</th></tr>\n");
            for v in &self.a11y_violations {
                html.push_str(&format!(
                    "<tr><td>{}</td><td>{:?}</td><td>{}</td></tr>\n",
                    escape(&v.rule),
                    v.impact,
                    escape(&v.message)
                ));
            }
            html.push_str("</table>\n");
        }

        if !self.contrast_violations.is_empty() {
            html.push_str("<h2>Contrast</h2>\n<table>\n<tr><th>Context</th><th>Ratio</th><th>Required</th></tr>\n");
            for v in &self.contrast_violations {
                html.push_str(&format!(
                    "<tr><td>{}</td><td>{:.2}</td><td>{:.1}</td></tr>\n",
                    escape(&v.context),
                    v.ratio,
                    v.required
                ));
            }
            html.push_str("</table>\n");
        }

        if !self.applied_fixes.is_empty() {
            html.push_str("<h2>Auto-fixes</h2>\n<table>\n<tr><th>Category</th><th>Description</th></tr>\n");
            for fix in &self.applied_fixes {
                html.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td></tr>\n",
                    escape(&fix.category),
                    escape(&fix.description)
                ));
            }
            html.push_str("</table>\n");
            if let Some(rate) = self.auto_fix_success_rate {
                html.push_str(&format!("<p>Auto-fix success rate: {rate:.2}</p>\n"));
            }
        }

        if !self.pattern_matched {
            html.push_str("<p><strong>No pattern matched;</strong> the component was generated from tokens and requirements alone.</p>\n");
        }

        html.push_str(&format!(
            "<footer><small>Generated {}</small></footer>\n</body>\n</html>\n",
            self.generated_at.to_rfc3339()
        ));
        html
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::compute_scores;
    use crate::validation::FinalStatus;

    fn passing_validation() -> ValidationResults {
        ValidationResults {
            typescript_passed: true,
            eslint_passed: true,
            final_status: FinalStatus::Passed,
            token_adherence_score: 1.0,
            ..Default::default()
        }
    }

    fn full_adherence() -> TokenAdherence {
        TokenAdherence::default()
    }

    fn report(status: ReportStatus) -> QualityReport {
        QualityReport {
            status,
            scores: compute_scores(true, 0, 0, 0),
            validation: passing_validation(),
            a11y_violations: vec![],
            contrast_violations: vec![],
            adherence: full_adherence(),
            applied_fixes: vec![],
            auto_fix_success_rate: None,
            pattern_matched: true,
            summary: "All gates green".into(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_pass_requires_all_gates() {
        assert_eq!(
            decide_status(&passing_validation(), &[], &full_adherence()),
            ReportStatus::Pass
        );
    }

    #[test]
    fn test_typescript_failure_fails() {
        let mut v = passing_validation();
        v.typescript_passed = false;
        assert_eq!(
            decide_status(&v, &[], &full_adherence()),
            ReportStatus::Fail
        );
    }

    #[test]
    fn test_eslint_errors_fail_but_warnings_pass() {
        let mut v = passing_validation();
        v.eslint_warnings = vec![crate::validation::LintMessage {
            rule_id: Some("prefer-const".into()),
            severity: crate::validation::LintSeverity::Warning,
            line: 1,
            column: 1,
            message: "w".into(),
        }];
        assert_eq!(
            decide_status(&v, &[], &full_adherence()),
            ReportStatus::Pass
        );

        v.eslint_errors = vec![crate::validation::LintMessage {
            rule_id: Some("no-eval".into()),
            severity: crate::validation::LintSeverity::Error,
            line: 1,
            column: 1,
            message: "e".into(),
        }];
        assert_eq!(
            decide_status(&v, &[], &full_adherence()),
            ReportStatus::Fail
        );
    }

    #[test]
    fn test_serious_a11y_fails_moderate_passes() {
        let serious = vec![A11yViolation {
            rule: "button-name".into(),
            impact: Impact::Serious,
            element: "<button/>".into(),
            message: "m".into(),
        }];
        assert_eq!(
            decide_status(&passing_validation(), &serious, &full_adherence()),
            ReportStatus::Fail
        );

        let moderate = vec![A11yViolation {
            rule: "autofocus".into(),
            impact: Impact::Moderate,
            element: "autoFocus".into(),
            message: "m".into(),
        }];
        assert_eq!(
            decide_status(&passing_validation(), &moderate, &full_adherence()),
            ReportStatus::Pass
        );
    }

    #[test]
    fn test_low_adherence_fails() {
        let mut adherence = TokenAdherence::default();
        adherence.colors.total = 10;
        adherence.colors.matched = 5;
        assert_eq!(
            decide_status(&passing_validation(), &[], &adherence),
            ReportStatus::Fail
        );
    }

    #[test]
    fn test_auto_fix_success_rate() {
        assert_eq!(auto_fix_success_rate(0, 0), None);
        assert_eq!(auto_fix_success_rate(4, 1), Some(0.8));
        assert_eq!(auto_fix_success_rate(3, 0), Some(1.0));
    }

    #[test]
    fn test_json_round_trip() {
        let r = report(ReportStatus::Pass);
        let json = r.to_json();
        let restored: QualityReport = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.status, ReportStatus::Pass);
    }

    #[test]
    fn test_html_renders_status_and_scores() {
        let html = report(ReportStatus::Pass).render_html();
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("Pass"));
        assert!(html.contains("Overall"));
    }

    #[test]
    fn test_html_flags_missing_pattern() {
        let mut r = report(ReportStatus::Pass);
        r.pattern_matched = false;
        assert!(r.render_html().contains("No pattern matched"));
    }

    #[test]
    fn test_html_escapes_content() {
        let mut r = report(ReportStatus::Fail);
        r.summary = "<script>alert(1)</script>".into();
        let html = r.render_html();
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
