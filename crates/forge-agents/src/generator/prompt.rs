//! Stage A: prompt assembly.
//!
//! The system prompt fixes the role, the strict JSON output contract, and
//! the non-negotiable constraints. The user prompt carries the pattern
//! baseline, the approved requirements, the token table, and up to two
//! exemplars. A soft token budget shapes prompt size: pattern comments and
//! blank lines are stripped, the token table compresses to referenced
//! entries when oversized, and exemplars are capped.

use forge_core::patterns::Pattern;
use forge_core::quality::adherence::css_var_name;
use forge_core::requirements::ApprovedRequirements;
use forge_core::tokens::DesignTokens;

use crate::exemplars::Exemplar;

/// Soft budget in characters (~4 chars per LLM token). Exceeding it trims
/// the prompt; it never fails the call.
pub const SOFT_PROMPT_BUDGET_CHARS: usize = 48_000;

pub const GENERATOR_SYSTEM_PROMPT: &str = "\
You are a senior React/TypeScript engineer generating production
components from design tokens and requirements.

## Output format
Return STRICT JSON with exactly two string fields:
{\"component\": \"<full .tsx source>\", \"stories\": \"<full .stories.tsx source>\"}
No markdown fences, no commentary outside the JSON.

## Non-negotiable constraints
- TypeScript strict mode: no `any`, no implicit any, exhaustive props
  interfaces, typed event handlers.
- Accessibility by default: semantic elements, accessible names, visible
  focus, keyboard operability.
- Never use eval, new Function, dangerouslySetInnerHTML, document.write,
  innerHTML assignment, or __proto__.
- Never embed secrets or read process.env in component code.
- Every token-backed style value goes through its CSS variable
  (var(--color-primary), var(--spacing-md), ...). Do not inline raw hex
  or pixel values that have a token.
- Stories import the component from \"./Component\" and cover the main
  variants and states.
";

/// Strip comments and blank lines from the pattern baseline before it
/// enters the prompt.
pub fn trim_pattern_code(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut in_block_comment = false;
    for line in code.lines() {
        let trimmed = line.trim();
        if in_block_comment {
            if trimmed.contains("*/") {
                in_block_comment = false;
            }
            continue;
        }
        if trimmed.starts_with("/*") {
            if !trimmed.contains("*/") {
                in_block_comment = true;
            }
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Render the token table as `var-name: value` lines. When `compact` is
/// set, only tokens whose variable name appears in the requirement text
/// survive.
pub fn render_token_table(
    tokens: &DesignTokens,
    requirements: &ApprovedRequirements,
    compact: bool,
) -> String {
    let requirement_text: String = requirements
        .iter()
        .map(|p| format!("{} {} ", p.name, p.effective_value()))
        .collect::<String>()
        .to_lowercase();

    let mut lines = Vec::new();
    for (path, field, _) in tokens.slots() {
        let var = css_var_name(&path);
        if compact {
            // Keep the core palette and anything the requirements mention.
            let stem = var.trim_start_matches("--").replace('-', " ");
            let referenced = requirement_text.contains(var.trim_start_matches("--"))
                || stem
                    .split_whitespace()
                    .any(|word| requirement_text.contains(word));
            let is_core = matches!(
                var.as_str(),
                "--color-primary"
                    | "--color-background"
                    | "--color-foreground"
                    | "--spacing-md"
                    | "--radius-md"
                    | "--font-size-base"
            );
            if !referenced && !is_core {
                continue;
            }
        }
        lines.push(format!("{var}: {}", field.value));
    }
    lines.join("\n")
}

fn render_requirements(requirements: &ApprovedRequirements) -> String {
    let mut out = String::new();
    for (title, list) in [
        ("Props", &requirements.props),
        ("Events", &requirements.events),
        ("States", &requirements.states),
        ("Accessibility", &requirements.accessibility),
    ] {
        if list.is_empty() {
            continue;
        }
        out.push_str(&format!("### {title}\n"));
        for p in list {
            out.push_str(&format!("- {}: {}\n", p.name, p.effective_value()));
        }
    }
    if out.is_empty() {
        out.push_str("(no explicit requirements; derive sensible defaults)\n");
    }
    out
}

/// Assemble the user prompt for the initial generation call.
pub fn build_user_prompt(
    pattern: Option<&Pattern>,
    tokens: &DesignTokens,
    requirements: &ApprovedRequirements,
    exemplars: &[&Exemplar],
) -> String {
    let mut prompt = String::with_capacity(8192);

    match pattern {
        Some(pattern) => {
            prompt.push_str(&format!(
                "## Reference pattern: {} (v{}, {})\n\
                 Adapt this baseline to the requirements below. Do not copy it \
                 verbatim; keep its structure and accessibility approach.\n\n\
                 ```tsx\n{}\n```\n\n",
                pattern.name,
                pattern.version,
                pattern.source,
                trim_pattern_code(&pattern.code).trim_end(),
            ));
        }
        None => {
            prompt.push_str(
                "## No matching pattern\n\
                 No library pattern matched these requirements. Build the \
                 component from the requirements and tokens alone, following \
                 the exemplar style.\n\n",
            );
        }
    }

    prompt.push_str("## Requirements\n");
    prompt.push_str(&render_requirements(requirements));

    prompt.push_str("\n## Design tokens (CSS variables)\n```\n");
    prompt.push_str(&render_token_table(tokens, requirements, false));
    prompt.push_str("\n```\n");

    for exemplar in exemplars {
        prompt.push_str(&format!(
            "\n## Exemplar: {}\n```tsx\n{}\n```\n",
            exemplar.name,
            exemplar.code.trim_end()
        ));
    }

    // Soft budget pass: compress the token table first, then drop
    // exemplars from the end until the prompt fits.
    if prompt.len() > SOFT_PROMPT_BUDGET_CHARS {
        let mut reduced_exemplars = exemplars.to_vec();
        loop {
            let mut candidate = String::with_capacity(SOFT_PROMPT_BUDGET_CHARS);
            match pattern {
                Some(pattern) => candidate.push_str(&format!(
                    "## Reference pattern: {} (v{}, {})\n```tsx\n{}\n```\n\n",
                    pattern.name,
                    pattern.version,
                    pattern.source,
                    trim_pattern_code(&pattern.code).trim_end(),
                )),
                None => candidate.push_str("## No matching pattern\n\n"),
            }
            candidate.push_str("## Requirements\n");
            candidate.push_str(&render_requirements(requirements));
            candidate.push_str("\n## Design tokens (CSS variables)\n```\n");
            candidate.push_str(&render_token_table(tokens, requirements, true));
            candidate.push_str("\n```\n");
            for exemplar in &reduced_exemplars {
                candidate.push_str(&format!(
                    "\n## Exemplar: {}\n```tsx\n{}\n```\n",
                    exemplar.name,
                    exemplar.code.trim_end()
                ));
            }
            if candidate.len() <= SOFT_PROMPT_BUDGET_CHARS || reduced_exemplars.is_empty() {
                return candidate;
            }
            reduced_exemplars.pop();
        }
    }

    prompt
}
