//! Static validation of generated code.
//!
//! The validator chain runs in fixed order: security sanitization, then the
//! TypeScript compiler, then ESLint. Results accumulate across repair
//! iterations into [`ValidationResults`].

pub mod chain;
pub mod eslint;
pub mod sanitizer;
pub mod typescript;

use serde::{Deserialize, Serialize};

use crate::quality::audit::A11yViolation;
use crate::quality::contrast::ContrastViolation;

pub use chain::{ChainConfig, ChainReport, StructuredError, ValidatorChain};
pub use eslint::{EslintChecker, EslintOutcome, LintMessage, LintSeverity};
pub use sanitizer::{SanitizationVerdict, SecurityIssue, SecuritySanitizer, Severity};
pub use typescript::{TsCheckOutcome, TsDiagnostic, TypeScriptChecker};

/// Outcome of one validator, mirroring gate outcomes: a validator whose
/// toolchain is absent reports `Skipped` rather than failing the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorStatus {
    Passed,
    Failed,
    Skipped,
}

/// Terminal status of the validation-repair loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalStatus {
    Passed,
    Failed,
    Skipped,
}

/// Accumulated validation state across repair iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResults {
    /// Repair attempts consumed; counted on entry to repair, so a run whose
    /// first generation passes reports 0.
    pub attempts: u32,
    pub final_status: FinalStatus,
    pub typescript_passed: bool,
    pub typescript_errors: Vec<TsDiagnostic>,
    pub eslint_passed: bool,
    pub eslint_errors: Vec<LintMessage>,
    pub eslint_warnings: Vec<LintMessage>,
    pub a11y_violations: Vec<A11yViolation>,
    pub contrast_violations: Vec<ContrastViolation>,
    /// Token adherence in [0,1]; filled by the aggregator.
    pub token_adherence_score: f64,
    pub security: SanitizationVerdict,
}

impl Default for ValidationResults {
    fn default() -> Self {
        Self {
            attempts: 0,
            final_status: FinalStatus::Skipped,
            typescript_passed: false,
            typescript_errors: Vec::new(),
            eslint_passed: false,
            eslint_errors: Vec::new(),
            eslint_warnings: Vec::new(),
            a11y_violations: Vec::new(),
            contrast_violations: Vec::new(),
            token_adherence_score: 0.0,
            security: SanitizationVerdict::safe(),
        }
    }
}

impl ValidationResults {
    /// Fold one chain report into the accumulated results, replacing the
    /// per-validator fields with the latest iteration's findings.
    pub fn absorb(&mut self, report: &ChainReport) {
        self.security = report.security.clone();

        self.typescript_passed = report.typescript.status != ValidatorStatus::Failed;
        self.typescript_errors = report.typescript.diagnostics.clone();

        self.eslint_passed = report.eslint.status != ValidatorStatus::Failed;
        self.eslint_errors = report
            .eslint
            .messages
            .iter()
            .filter(|m| m.severity == LintSeverity::Error)
            .cloned()
            .collect();
        self.eslint_warnings = report
            .eslint
            .messages
            .iter()
            .filter(|m| m.severity == LintSeverity::Warning)
            .cloned()
            .collect();
    }
}
