//! Fixed-order validator chain.
//!
//! Order is contractual: security sanitization first, then the TypeScript
//! compiler, then ESLint. Each validator can be disabled for environments
//! without the toolchain; disabled validators report `Skipped` and never
//! block. The chain also flattens every finding into a structured error
//! list for the repair prompt.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::eslint::{EslintChecker, EslintOutcome};
use super::sanitizer::{SanitizationVerdict, SecuritySanitizer};
use super::typescript::{TsCheckOutcome, TypeScriptChecker};
use super::{LintSeverity, ValidatorStatus};

/// Which validators run and with what tool bindings.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub check_security: bool,
    pub check_typescript: bool,
    pub check_eslint: bool,
    pub typescript: TypeScriptChecker,
    pub eslint: EslintChecker,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            check_security: true,
            check_typescript: true,
            check_eslint: true,
            typescript: TypeScriptChecker::default(),
            eslint: EslintChecker::default(),
        }
    }
}

impl ChainConfig {
    /// Sanitizer only. Used where the node toolchain is unavailable.
    pub fn security_only() -> Self {
        Self {
            check_typescript: false,
            check_eslint: false,
            ..Default::default()
        }
    }
}

/// One finding in repair-prompt form: where, what, and which rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// `security`, `typescript`, or `eslint`.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Rule id or compiler error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainReport {
    pub security: SanitizationVerdict,
    pub typescript: TsCheckOutcome,
    pub eslint: EslintOutcome,
    /// True when no enabled validator failed.
    pub all_passed: bool,
}

impl ChainReport {
    /// Flatten all blocking findings for the repair prompt.
    pub fn structured_errors(&self) -> Vec<StructuredError> {
        let mut errors = Vec::new();

        for issue in &self.security.issues {
            if issue.severity == super::Severity::High {
                errors.push(StructuredError {
                    source: "security".into(),
                    file: None,
                    line: Some(issue.line),
                    code: Some(issue.pattern.clone()),
                    message: format!("{} ({})", issue.description, issue.snippet),
                });
            }
        }
        for diag in &self.typescript.diagnostics {
            errors.push(StructuredError {
                source: "typescript".into(),
                file: Some(diag.file.clone()),
                line: Some(diag.line),
                code: Some(diag.code.clone()),
                message: diag.message.clone(),
            });
        }
        for msg in &self.eslint.messages {
            if msg.severity == LintSeverity::Error {
                errors.push(StructuredError {
                    source: "eslint".into(),
                    file: Some("Component.tsx".into()),
                    line: Some(msg.line),
                    code: msg.rule_id.clone(),
                    message: msg.message.clone(),
                });
            }
        }
        errors
    }

    pub fn summary(&self) -> String {
        let gate = |status: ValidatorStatus| match status {
            ValidatorStatus::Passed => "pass",
            ValidatorStatus::Failed => "FAIL",
            ValidatorStatus::Skipped => "skip",
        };
        format!(
            "security={} tsc={} eslint={}",
            if self.security.is_safe { "pass" } else { "FAIL" },
            gate(self.typescript.status),
            gate(self.eslint.status),
        )
    }
}

/// Runs the fixed-order chain. Construction compiles the sanitizer's
/// pattern set once.
pub struct ValidatorChain {
    config: ChainConfig,
    sanitizer: SecuritySanitizer,
}

impl ValidatorChain {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            config,
            sanitizer: SecuritySanitizer::new(),
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Run every enabled validator against the candidate code.
    pub async fn run(&self, component: &str, stories: Option<&str>) -> ChainReport {
        let security = if self.config.check_security {
            self.sanitizer.scan(component)
        } else {
            SanitizationVerdict::safe()
        };

        let typescript = if self.config.check_typescript {
            self.config.typescript.check(component, stories).await
        } else {
            TsCheckOutcome::skipped("disabled".into(), Duration::ZERO)
        };

        let eslint = if self.config.check_eslint {
            self.config.eslint.check(component).await
        } else {
            EslintOutcome::skipped("disabled".into(), Duration::ZERO)
        };

        let all_passed = security.is_safe
            && typescript.status != ValidatorStatus::Failed
            && eslint.status != ValidatorStatus::Failed;

        let report = ChainReport {
            security,
            typescript,
            eslint,
            all_passed,
        };
        info!(summary = %report.summary(), "Validator chain complete");
        report
    }
}
