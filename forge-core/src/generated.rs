//! Generated artifact model: the emitted code bundle, its provenance
//! header, import normalization, and the generation status machine.

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::quality::QualityScores;
use crate::validation::ValidationResults;

/// Run status for a generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    #[default]
    Pending,
    InProgress,
    /// The generator ran to completion. The code may still carry
    /// `final_status = failed` on its validation results.
    Completed,
    /// Unrecoverable external error before completion.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub pattern_id: String,
    pub pattern_version: String,
    pub generated_at: DateTime<Utc>,
    pub tokens_hash: String,
    pub requirements_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub pattern_used: Option<String>,
    pub pattern_version: Option<String>,
    pub tokens_applied: usize,
    pub requirements_implemented: usize,
    pub lines_of_code: usize,
    pub imports_count: usize,
    pub fix_attempts: u32,
    pub validation_results: ValidationResults,
    pub quality_scores: QualityScores,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timing {
    pub total_ms: u64,
    /// `(stage label, elapsed ms)` in execution order.
    pub stage_ms: Vec<(String, u64)>,
}

/// The full generation output bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub component: String,
    pub stories: String,
    pub tokens_json: String,
    pub requirements_json: String,
    pub metadata: GenerationMetadata,
    pub provenance: Option<Provenance>,
    pub timing: Timing,
    pub status: GenerationStatus,
    pub cache_hit: bool,
}

impl GeneratedCode {
    pub fn count_lines(code: &str) -> usize {
        code.lines().filter(|l| !l.trim().is_empty()).count()
    }
}

// ── Provenance header ────────────────────────────────────────────────

/// Render the provenance header comment prepended to the component.
pub fn render_provenance_header(provenance: &Provenance, fix_attempts: u32) -> String {
    format!(
        "/**\n\
         \x20* Generated by ComponentForge\n\
         \x20* pattern_id: {}\n\
         \x20* pattern_version: {}\n\
         \x20* generated_at: {}\n\
         \x20* tokens_hash: {}\n\
         \x20* requirements_hash: {}\n\
         \x20* fix_attempts: {}\n\
         \x20*/\n",
        provenance.pattern_id,
        provenance.pattern_version,
        provenance
            .generated_at
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        provenance.tokens_hash,
        provenance.requirements_hash,
        fix_attempts,
    )
}

/// Re-parse a provenance header from generated source. Returns the
/// provenance and the recorded fix attempt count.
pub fn parse_provenance_header(code: &str) -> Option<(Provenance, u32)> {
    let header_end = code.find("*/")?;
    let header = &code[..header_end];
    if !header.contains("Generated by ComponentForge") {
        return None;
    }

    let field = |name: &str| -> Option<String> {
        let re = Regex::new(&format!(r"\*\s*{name}:\s*(\S+)")).ok()?;
        re.captures(header).map(|c| c[1].to_string())
    };

    let generated_at = DateTime::parse_from_rfc3339(&field("generated_at")?)
        .ok()?
        .with_timezone(&Utc);

    Some((
        Provenance {
            pattern_id: field("pattern_id")?,
            pattern_version: field("pattern_version")?,
            generated_at,
            tokens_hash: field("tokens_hash")?,
            requirements_hash: field("requirements_hash")?,
        },
        field("fix_attempts")?.parse().ok()?,
    ))
}

// ── Import resolution ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ImportGroup {
    BuiltIn,
    ThirdParty,
    Alias,
    Relative,
}

fn classify_specifier(spec: &str) -> ImportGroup {
    if spec == "react" || spec.starts_with("react/") || spec == "react-dom" {
        ImportGroup::BuiltIn
    } else if spec.starts_with("@/") {
        ImportGroup::Alias
    } else if spec.starts_with("./") || spec.starts_with("../") {
        ImportGroup::Relative
    } else {
        ImportGroup::ThirdParty
    }
}

fn import_specifier(line: &str) -> Option<String> {
    let re = Regex::new(r#"^import\s+(?:[^'"]+\s+from\s+)?["']([^"']+)["'];?\s*$"#)
        .expect("static regex");
    re.captures(line.trim()).map(|c| c[1].to_string())
}

/// Normalize the import block: deduplicate, group (built-in → third-party
/// → `@/` aliases → relative), alphabetical within each group. The body of
/// the file is untouched.
pub fn resolve_imports(code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();

    // The import block is the leading run of import/blank lines.
    let mut block_end = 0;
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || import_specifier(trimmed).is_some() {
            block_end = i + 1;
        } else {
            break;
        }
    }

    let mut imports: Vec<(ImportGroup, String, String)> = Vec::new();
    for line in &lines[..block_end] {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(spec) = import_specifier(trimmed) {
            let entry = (classify_specifier(&spec), spec, trimmed.to_string());
            if !imports.iter().any(|(_, _, existing)| existing == &entry.2) {
                imports.push(entry);
            }
        }
    }

    if imports.is_empty() {
        return code.to_string();
    }

    imports.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut out = String::with_capacity(code.len());
    let mut last_group: Option<ImportGroup> = None;
    for (group, _, line) in &imports {
        if let Some(last) = last_group {
            if last != *group {
                out.push('\n');
            }
        }
        out.push_str(line);
        out.push('\n');
        last_group = Some(*group);
    }

    let body = lines[block_end..].join("\n");
    if !body.trim().is_empty() {
        out.push('\n');
        out.push_str(body.trim_start_matches('\n'));
        if code.ends_with('\n') && !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Count import statements in a source file.
pub fn count_imports(code: &str) -> usize {
    code.lines()
        .filter(|l| import_specifier(l.trim()).is_some())
        .count()
}
