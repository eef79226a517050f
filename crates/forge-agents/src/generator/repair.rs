//! Repair prompt construction.
//!
//! When validators report errors and the attempt budget allows, the
//! generator re-prompts with the previous code, the structured error list
//! (source, file, line, rule or error code, message), and an instruction
//! to emit the full corrected component only.

use forge_core::validation::StructuredError;

pub const REPAIR_SYSTEM_PROMPT: &str = "\
You are fixing a React/TypeScript component that failed validation.

## Output format
Return STRICT JSON with exactly two string fields:
{\"component\": \"<full corrected .tsx source>\", \"stories\": \"<full corrected .stories.tsx source>\"}

## Rules
- Emit the FULL corrected files, not a diff or a fragment.
- Fix every listed error. Do not introduce new patterns that the
  validators reject (eval, dangerouslySetInnerHTML, innerHTML, any).
- Keep everything that already works unchanged.
";

/// Build the repair user prompt from the failing code and findings.
pub fn build_repair_prompt(
    component: &str,
    stories: &str,
    errors: &[StructuredError],
) -> String {
    let mut prompt = String::with_capacity(component.len() + 2048);

    prompt.push_str("## Validation errors to fix\n");
    for (i, error) in errors.iter().enumerate() {
        let location = match (&error.file, error.line) {
            (Some(file), Some(line)) => format!("{file}:{line}"),
            (None, Some(line)) => format!("line {line}"),
            (Some(file), None) => file.clone(),
            (None, None) => "unknown location".into(),
        };
        let code = error.code.as_deref().unwrap_or("-");
        prompt.push_str(&format!(
            "{}. [{}] {} ({}): {}\n",
            i + 1,
            error.source,
            location,
            code,
            error.message
        ));
    }

    prompt.push_str("\n## Current component\n```tsx\n");
    prompt.push_str(component);
    prompt.push_str("\n```\n\n## Current stories\n```tsx\n");
    prompt.push_str(stories);
    prompt.push_str("\n```\n\nReturn the corrected JSON now.\n");
    prompt
}
