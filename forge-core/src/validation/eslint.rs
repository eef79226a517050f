//! ESLint validator.
//!
//! Runs `eslint --format json` over the staged component with a
//! self-contained config (core rules only, no plugin installs) and parses
//! the structured output. A missing eslint binary degrades to `Skipped`.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ValidatorStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintMessage {
    /// Rule id such as `no-eval`; `None` for parse errors.
    pub rule_id: Option<String>,
    pub severity: LintSeverity,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EslintOutcome {
    pub status: ValidatorStatus,
    pub messages: Vec<LintMessage>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr_excerpt: Option<String>,
}

impl EslintOutcome {
    pub fn skipped(reason: String, duration: Duration) -> Self {
        Self {
            status: ValidatorStatus::Skipped,
            messages: Vec::new(),
            duration_ms: duration.as_millis() as u64,
            stderr_excerpt: Some(reason),
        }
    }

    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.severity == LintSeverity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.severity == LintSeverity::Warning)
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct EslintChecker {
    pub bin: String,
    pub timeout: Duration,
}

impl Default for EslintChecker {
    fn default() -> Self {
        Self {
            bin: "eslint".into(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Core-rules-only flat config; runs without any plugin installation.
const ESLINT_CONFIG: &str = r#"{
  "root": true,
  "parserOptions": { "ecmaVersion": 2022, "sourceType": "module", "ecmaFeatures": { "jsx": true } },
  "env": { "browser": true, "es2022": true },
  "rules": {
    "no-eval": "error",
    "no-implied-eval": "error",
    "no-new-func": "error",
    "no-proto": "error",
    "no-var": "error",
    "prefer-const": "warn",
    "eqeqeq": "warn",
    "no-unused-vars": "warn",
    "no-undef": "off"
  }
}
"#;

/// ESLint's `--format json` result shape, one entry per linted file.
#[derive(Debug, Deserialize)]
struct EslintFileReport {
    messages: Vec<EslintRawMessage>,
}

#[derive(Debug, Deserialize)]
struct EslintRawMessage {
    #[serde(rename = "ruleId")]
    rule_id: Option<String>,
    /// 1 = warning, 2 = error.
    severity: u8,
    #[serde(default)]
    line: usize,
    #[serde(default)]
    column: usize,
    message: String,
}

impl EslintChecker {
    pub async fn check(&self, component: &str) -> EslintOutcome {
        let start = Instant::now();

        let workspace = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return EslintOutcome::skipped(
                    format!("cannot stage workspace: {e}"),
                    start.elapsed(),
                )
            }
        };

        for (name, contents) in [(".eslintrc.json", ESLINT_CONFIG), ("Component.tsx", component)]
        {
            if let Err(e) = std::fs::write(workspace.path().join(name), contents) {
                return EslintOutcome::skipped(format!("cannot write {name}: {e}"), start.elapsed());
            }
        }

        let mut cmd = tokio::process::Command::new(&self.bin);
        cmd.args([
            "--no-eslintrc",
            "-c",
            ".eslintrc.json",
            "--format",
            "json",
            "Component.tsx",
        ])
        .current_dir(workspace.path())
        .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(error = %e, "eslint unavailable, skipping lint check");
                return EslintOutcome::skipped(format!("eslint unavailable: {e}"), start.elapsed());
            }
            Err(_) => {
                return EslintOutcome {
                    status: ValidatorStatus::Failed,
                    messages: Vec::new(),
                    duration_ms: start.elapsed().as_millis() as u64,
                    stderr_excerpt: Some(format!(
                        "eslint timed out after {}s",
                        self.timeout.as_secs()
                    )),
                }
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let messages = parse_eslint_json(&stdout);
        let has_errors = messages.iter().any(|m| m.severity == LintSeverity::Error);

        EslintOutcome {
            status: if has_errors {
                ValidatorStatus::Failed
            } else {
                ValidatorStatus::Passed
            },
            messages,
            duration_ms: start.elapsed().as_millis() as u64,
            stderr_excerpt: if output.stderr.is_empty() {
                None
            } else {
                Some(String::from_utf8_lossy(&output.stderr).chars().take(2048).collect())
            },
        }
    }
}

/// Parse ESLint's JSON formatter output.
pub fn parse_eslint_json(output: &str) -> Vec<LintMessage> {
    let reports: Vec<EslintFileReport> = match serde_json::from_str(output.trim()) {
        Ok(reports) => reports,
        Err(_) => return Vec::new(),
    };
    reports
        .into_iter()
        .flat_map(|r| r.messages)
        .map(|m| LintMessage {
            rule_id: m.rule_id,
            severity: if m.severity >= 2 {
                LintSeverity::Error
            } else {
                LintSeverity::Warning
            },
            line: m.line,
            column: m.column,
            message: m.message,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_eslint_json_output() {
        let output = r#"[
          {
            "filePath": "/tmp/x/Component.tsx",
            "messages": [
              { "ruleId": "no-eval", "severity": 2, "line": 4, "column": 11, "message": "eval can be harmful." },
              { "ruleId": "prefer-const", "severity": 1, "line": 9, "column": 5, "message": "'x' is never reassigned." }
            ],
            "errorCount": 1,
            "warningCount": 1
          }
        ]"#;
        let messages = parse_eslint_json(output);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].rule_id.as_deref(), Some("no-eval"));
        assert_eq!(messages[0].severity, LintSeverity::Error);
        assert_eq!(messages[0].line, 4);
        assert_eq!(messages[1].severity, LintSeverity::Warning);
    }

    #[test]
    fn test_parse_garbage_is_empty() {
        assert!(parse_eslint_json("not json").is_empty());
        assert!(parse_eslint_json("").is_empty());
    }

    #[test]
    fn test_counts() {
        let outcome = EslintOutcome {
            status: ValidatorStatus::Failed,
            messages: parse_eslint_json(
                r#"[{"messages":[
                    {"ruleId":"no-eval","severity":2,"line":1,"column":1,"message":"a"},
                    {"ruleId":"eqeqeq","severity":1,"line":2,"column":1,"message":"b"},
                    {"ruleId":null,"severity":2,"line":3,"column":1,"message":"c"}
                ]}]"#,
            ),
            duration_ms: 5,
            stderr_excerpt: None,
        };
        assert_eq!(outcome.error_count(), 2);
        assert_eq!(outcome.warning_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_binary_skips() {
        let checker = EslintChecker {
            bin: "definitely-not-a-real-eslint".into(),
            ..Default::default()
        };
        let outcome = checker.check("const x = 1;").await;
        assert_eq!(outcome.status, ValidatorStatus::Skipped);
    }
}
