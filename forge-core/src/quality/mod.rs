//! Quality scoring and the merged report.

pub mod adherence;
pub mod audit;
pub mod color;
pub mod contrast;
pub mod report;

use serde::{Deserialize, Serialize};

pub use adherence::{measure as measure_adherence, TokenAdherence, ADHERENCE_TARGET};
pub use audit::{audit_component, check_keyboard_navigation, A11yViolation, Impact};
pub use contrast::{check_palette, ContrastViolation};
pub use report::{
    auto_fix_success_rate, decide_status, AppliedFix, QualityReport, ReportStatus,
};

/// Per-dimension scores on a 0–100 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    /// 100 minus a weighted function of TypeScript error count.
    pub type_safety: f64,
    /// 100 − 10·errors − 2·warnings, floored at 0.
    pub linting: f64,
    /// Pass/fail × 100.
    pub compilation: f64,
    /// 0.5·compilation + 0.3·type_safety + 0.2·linting.
    pub overall: f64,
}

/// Score weights for TypeScript errors: each error costs 10 points.
const TS_ERROR_WEIGHT: f64 = 10.0;

pub fn compute_scores(
    compiled: bool,
    ts_error_count: usize,
    eslint_error_count: usize,
    eslint_warning_count: usize,
) -> QualityScores {
    let type_safety = (100.0 - TS_ERROR_WEIGHT * ts_error_count as f64).max(0.0);
    let linting = (100.0 - 10.0 * eslint_error_count as f64 - 2.0 * eslint_warning_count as f64)
        .max(0.0);
    let compilation = if compiled { 100.0 } else { 0.0 };
    QualityScores {
        type_safety,
        linting,
        compilation,
        overall: 0.5 * compilation + 0.3 * type_safety + 0.2 * linting,
    }
}
