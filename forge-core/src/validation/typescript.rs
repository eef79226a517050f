//! TypeScript compiler validator.
//!
//! Stages the generated component and stories into a throwaway workspace
//! with a strict tsconfig and ambient React declarations, then runs
//! `tsc --noEmit` with a timeout. A missing tsc binary degrades to
//! `Skipped` rather than failing the run.

use std::time::{Duration, Instant};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ValidatorStatus;

/// One compiler diagnostic in `file(line,col): error TSxxxx: message` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsDiagnostic {
    pub file: String,
    pub line: usize,
    pub column: usize,
    /// Error code such as `TS2322`.
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsCheckOutcome {
    pub status: ValidatorStatus,
    pub diagnostics: Vec<TsDiagnostic>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr_excerpt: Option<String>,
}

impl TsCheckOutcome {
    pub fn skipped(reason: String, duration: Duration) -> Self {
        Self {
            status: ValidatorStatus::Skipped,
            diagnostics: Vec::new(),
            duration_ms: duration.as_millis() as u64,
            stderr_excerpt: Some(reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeScriptChecker {
    /// Compiler binary; `tsc` on PATH by default.
    pub bin: String,
    pub timeout: Duration,
}

impl Default for TypeScriptChecker {
    fn default() -> Self {
        Self {
            bin: "tsc".into(),
            timeout: Duration::from_secs(60),
        }
    }
}

const TSCONFIG: &str = r#"{
  "compilerOptions": {
    "strict": true,
    "noEmit": true,
    "jsx": "react-jsx",
    "target": "ES2020",
    "module": "ESNext",
    "moduleResolution": "bundler",
    "skipLibCheck": true,
    "forceConsistentCasingInFileNames": true
  },
  "include": ["*.tsx", "*.d.ts"]
}
"#;

/// Ambient declarations so the check runs without a node_modules install.
/// Deliberately loose; real typing pressure comes from the generated code
/// itself under `strict`.
const REACT_SHIM: &str = r#"declare module "react" {
  export type ReactNode = unknown;
  export type CSSProperties = Record<string, string | number | undefined>;
  export type KeyboardEvent<T = Element> = { key: string; currentTarget: T };
  export type ButtonHTMLAttributes<T> = Record<string, unknown>;
  export type InputHTMLAttributes<T> = Record<string, unknown>;
  export type SelectHTMLAttributes<T> = Record<string, unknown>;
  export type HTMLAttributes<T> = Record<string, unknown>;
  export function forwardRef<T, P>(
    render: (props: P, ref: unknown) => ReactNode
  ): (props: P) => ReactNode;
  export function useId(): string;
  export function useRef<T>(initial: T | null): { current: T | null };
  export function useEffect(effect: () => void, deps?: unknown[]): void;
  export function useImperativeHandle(ref: unknown, init: () => unknown): void;
  export function useState<T>(initial: T): [T, (next: T) => void];
}
declare module "react/jsx-runtime" {
  export function jsx(type: unknown, props: unknown, key?: unknown): unknown;
  export function jsxs(type: unknown, props: unknown, key?: unknown): unknown;
  export const Fragment: unknown;
}
declare namespace JSX {
  interface IntrinsicElements {
    [element: string]: Record<string, unknown>;
  }
}
"#;

impl TypeScriptChecker {
    /// Type-check the component (and stories, when present).
    pub async fn check(&self, component: &str, stories: Option<&str>) -> TsCheckOutcome {
        let start = Instant::now();

        let workspace = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return TsCheckOutcome::skipped(
                    format!("cannot stage workspace: {e}"),
                    start.elapsed(),
                )
            }
        };

        let stage = [
            ("tsconfig.json", TSCONFIG),
            ("react-shim.d.ts", REACT_SHIM),
            ("Component.tsx", component),
        ];
        for (name, contents) in stage {
            if let Err(e) = std::fs::write(workspace.path().join(name), contents) {
                return TsCheckOutcome::skipped(format!("cannot write {name}: {e}"), start.elapsed());
            }
        }
        if let Some(stories) = stories {
            // Stories import from "./Component"; keep them in the workspace.
            if let Err(e) = std::fs::write(workspace.path().join("Component.stories.tsx"), stories)
            {
                return TsCheckOutcome::skipped(
                    format!("cannot write stories: {e}"),
                    start.elapsed(),
                );
            }
        }

        let mut cmd = tokio::process::Command::new(&self.bin);
        cmd.args(["--noEmit", "--pretty", "false", "-p", "."])
            .current_dir(workspace.path())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(error = %e, "tsc unavailable, skipping TypeScript check");
                return TsCheckOutcome::skipped(format!("tsc unavailable: {e}"), start.elapsed());
            }
            Err(_) => {
                return TsCheckOutcome {
                    status: ValidatorStatus::Failed,
                    diagnostics: Vec::new(),
                    duration_ms: start.elapsed().as_millis() as u64,
                    stderr_excerpt: Some(format!(
                        "tsc timed out after {}s",
                        self.timeout.as_secs()
                    )),
                }
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let diagnostics = parse_tsc_output(&stdout);
        let passed = output.status.success();

        TsCheckOutcome {
            status: if passed {
                ValidatorStatus::Passed
            } else {
                ValidatorStatus::Failed
            },
            diagnostics,
            duration_ms: start.elapsed().as_millis() as u64,
            stderr_excerpt: if passed {
                None
            } else {
                Some(truncate(&stdout, 4096))
            },
        }
    }
}

/// Parse `file(line,col): error TSxxxx: message` lines.
pub fn parse_tsc_output(output: &str) -> Vec<TsDiagnostic> {
    let re = Regex::new(r"^(.+?)\((\d+),(\d+)\): error (TS\d+): (.+)$").expect("static regex");
    output
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line.trim())?;
            Some(TsDiagnostic {
                file: caps[1].to_string(),
                line: caps[2].parse().ok()?,
                column: caps[3].parse().ok()?,
                code: caps[4].to_string(),
                message: caps[5].to_string(),
            })
        })
        .collect()
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...\n[truncated at {} bytes]", &s[..max], s.len())
    }
}
