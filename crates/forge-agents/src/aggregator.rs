//! Quality Report Aggregator stage.
//!
//! Merges the generator's validation results with the static a11y audit,
//! keyboard-navigation check, palette contrast checks, and token
//! adherence into the single PASS/FAIL report.

use chrono::Utc;
use tracing::info;

use forge_core::generated::GeneratedCode;
use forge_core::quality::{
    audit_component, auto_fix_success_rate, check_keyboard_navigation, check_palette,
    decide_status, measure_adherence, AppliedFix, QualityReport, ReportStatus,
};
use forge_core::tokens::DesignTokens;
use forge_core::validation::ValidationResults;

/// Build the merged report for a finished generation.
pub fn aggregate(
    run_id: &str,
    generated: &GeneratedCode,
    tokens: &DesignTokens,
    applied_fixes: Vec<AppliedFix>,
    pattern_matched: bool,
) -> QualityReport {
    let mut a11y = audit_component(&generated.component);
    a11y.extend(check_keyboard_navigation(&generated.component));

    let contrast = check_palette(tokens);
    let adherence = measure_adherence(&generated.component, tokens);

    let mut validation: ValidationResults = generated.metadata.validation_results.clone();
    validation.a11y_violations = a11y.clone();
    validation.contrast_violations = contrast.clone();
    validation.token_adherence_score = adherence.overall();

    let status = decide_status(&validation, &a11y, &adherence);

    // Unfixed findings are the ones surviving into this report.
    let unfixed = validation.typescript_errors.len()
        + validation.eslint_errors.len()
        + validation
            .security
            .issues
            .iter()
            .filter(|i| i.severity == forge_core::validation::Severity::High)
            .count();
    let success_rate = auto_fix_success_rate(applied_fixes.len(), unfixed);

    let summary = match status {
        ReportStatus::Pass => format!(
            "Component passed all gates: overall score {:.0}, token adherence {:.2}.",
            generated.metadata.quality_scores.overall,
            adherence.overall()
        ),
        ReportStatus::Fail => format!(
            "Component failed quality gates after {} repair attempts: {} TS errors, {} lint errors, {} serious a11y findings, adherence {:.2}.",
            validation.attempts,
            validation.typescript_errors.len(),
            validation.eslint_errors.len(),
            a11y.iter()
                .filter(|v| v.impact >= forge_core::quality::Impact::Serious)
                .count(),
            adherence.overall()
        ),
    };

    info!(
        run_id,
        status = ?status,
        adherence = adherence.overall(),
        a11y_findings = a11y.len(),
        contrast_findings = contrast.len(),
        "Quality report aggregated"
    );

    QualityReport {
        status,
        scores: generated.metadata.quality_scores,
        validation,
        a11y_violations: a11y,
        contrast_violations: contrast,
        adherence,
        applied_fixes,
        auto_fix_success_rate: success_rate,
        pattern_matched,
        summary,
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::tokens::default_tokens;
    use forge_core::validation::FinalStatus;

    fn passing_bundle() -> GeneratedCode {
        let mut generated = GeneratedCode {
            component: r#"import * as React from "react";

export function Go() {
  return (
    <button
      type="button"
      style={{ backgroundColor: "var(--color-primary)", padding: "var(--spacing-md)" }}
    >
      Go
    </button>
  );
}
"#
            .into(),
            ..Default::default()
        };
        generated.metadata.validation_results.typescript_passed = true;
        generated.metadata.validation_results.eslint_passed = true;
        generated.metadata.validation_results.final_status = FinalStatus::Passed;
        generated
    }

    #[test]
    fn test_clean_component_passes() {
        let report = aggregate("r1", &passing_bundle(), &default_tokens(), vec![], true);
        assert_eq!(report.status, ReportStatus::Pass);
        assert!(report.validation.token_adherence_score >= 0.9);
        assert!(report.auto_fix_success_rate.is_none());
        assert!(report.pattern_matched);
    }

    #[test]
    fn test_serious_a11y_fails_report() {
        let mut bundle = passing_bundle();
        bundle.component = r#"<img src="/x.png" />"#.into();
        let report = aggregate("r1", &bundle, &default_tokens(), vec![], true);
        assert_eq!(report.status, ReportStatus::Fail);
        assert!(report
            .a11y_violations
            .iter()
            .any(|v| v.rule == "image-alt"));
    }

    #[test]
    fn test_off_palette_values_fail_adherence() {
        let mut bundle = passing_bundle();
        bundle.component = r#"
          const style = { padding: "17px", margin: "13px", gap: "5px" };
        "#
        .into();
        let report = aggregate("r1", &bundle, &default_tokens(), vec![], true);
        assert!(report.validation.token_adherence_score < 0.9);
        assert_eq!(report.status, ReportStatus::Fail);
    }

    #[test]
    fn test_auto_fix_rate_reported() {
        let fixes = vec![AppliedFix {
            category: "security-rewrite".into(),
            description: "d".into(),
            before: "b".into(),
            after: "a".into(),
        }];
        let report = aggregate("r1", &passing_bundle(), &default_tokens(), fixes, true);
        assert_eq!(report.auto_fix_success_rate, Some(1.0));
        assert_eq!(report.applied_fixes.len(), 1);
    }

    #[test]
    fn test_no_pattern_flag_propagates() {
        let report = aggregate("r1", &passing_bundle(), &default_tokens(), vec![], false);
        assert!(!report.pattern_matched);
        assert!(report.render_html().contains("No pattern matched"));
    }
}
