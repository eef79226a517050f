//! Stage C: post-processing.
//!
//! Import normalization, the provenance header, canonical token and
//! requirement serializations, and the quality score computation.

use chrono::Utc;

use forge_core::generated::{
    count_imports, render_provenance_header, resolve_imports, GeneratedCode, Provenance,
};
use forge_core::patterns::Pattern;
use forge_core::quality::{compute_scores, QualityScores};
use forge_core::requirements::ApprovedRequirements;
use forge_core::tokens::DesignTokens;
use forge_core::validation::{ChainReport, ValidatorStatus};

/// Finalize the winning iteration's code into the output bundle fields.
/// Returns the processed component plus its provenance.
pub fn post_process(
    component: &str,
    pattern: Option<&Pattern>,
    tokens: &DesignTokens,
    requirements: &ApprovedRequirements,
    fix_attempts: u32,
) -> (String, Provenance) {
    let resolved = resolve_imports(component);

    let provenance = Provenance {
        pattern_id: pattern.map(|p| p.id.clone()).unwrap_or_else(|| "none".into()),
        pattern_version: pattern
            .map(|p| p.version.clone())
            .unwrap_or_else(|| "-".into()),
        generated_at: Utc::now(),
        tokens_hash: tokens.hash(),
        requirements_hash: requirements.hash(),
    };

    let header = render_provenance_header(&provenance, fix_attempts);
    (format!("{header}{resolved}"), provenance)
}

/// Compute the score block from the final validator chain report. Skipped
/// validators score unpenalized; their absence is visible in the report's
/// validator statuses instead.
pub fn scores_from_report(report: &ChainReport) -> QualityScores {
    let compiled = report.typescript.status != ValidatorStatus::Failed;
    let ts_errors = report.typescript.diagnostics.len();
    let eslint_errors = report.eslint.error_count();
    let eslint_warnings = report.eslint.warning_count();
    compute_scores(compiled, ts_errors, eslint_errors, eslint_warnings)
}

/// Fill the derived metadata counters on a finished bundle.
pub fn finalize_metadata(
    generated: &mut GeneratedCode,
    pattern: Option<&Pattern>,
    tokens: &DesignTokens,
    requirements: &ApprovedRequirements,
    fix_attempts: u32,
) {
    generated.metadata.pattern_used = pattern.map(|p| p.id.clone());
    generated.metadata.pattern_version = pattern.map(|p| p.version.clone());
    generated.metadata.tokens_applied = tokens.slots().len();
    generated.metadata.requirements_implemented = requirements.len();
    generated.metadata.lines_of_code = GeneratedCode::count_lines(&generated.component);
    generated.metadata.imports_count = count_imports(&generated.component);
    generated.metadata.fix_attempts = fix_attempts;
    generated.tokens_json = tokens.to_canonical_json();
    generated.requirements_json = requirements.to_canonical_json();
}
