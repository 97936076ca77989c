//! Markdown documents written into a generated project.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use kiln_store::Role;

use crate::analyze::{CodeReport, StructureReport};
use crate::context::ProjectContext;
use crate::structure::MANIFEST_FILE;

pub const STRUCTURE_ANALYSIS_PATH: &str = "docs/structure_analysis.md";
pub const CODE_ANALYSIS_PATH: &str = "docs/code_analysis.md";
pub const HISTORY_PATH: &str = "project_history.md";
pub const README_PATH: &str = "README.md";

/// Paths the pipeline writes itself; a layout may not claim them.
///
/// The project `README.md` is not listed: a layout may plan one, and the
/// summary stage replaces it.
pub fn is_reserved_path(path: &str) -> bool {
    path == MANIFEST_FILE
        || path == HISTORY_PATH
        || path == STRUCTURE_ANALYSIS_PATH
        || path == CODE_ANALYSIS_PATH
        || Role::TEXT_ROLES
            .into_iter()
            .filter_map(role_document)
            .any(|doc| doc.path == path)
}

/// Where a text role's output is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDocument {
    /// Artifact key in the run result.
    pub key: &'static str,
    pub path: &'static str,
    pub heading: &'static str,
}

/// The document for a text role; `None` for the layout role.
pub fn role_document(role: Role) -> Option<RoleDocument> {
    let (key, path, heading) = match role {
        Role::Visionary => ("vision", "docs/vision.md", "Vision"),
        Role::Strategist => (
            "technical_strategy",
            "docs/technical_strategy.md",
            "Technical Strategy",
        ),
        Role::Designer => ("architecture", "docs/architecture.md", "Architecture"),
        Role::Builder => (
            "implementation",
            "docs/implementation.md",
            "Implementation Plan",
        ),
        Role::Layout => return None,
    };
    Some(RoleDocument { key, path, heading })
}

pub fn render_role_document(doc: &RoleDocument, project: &str, role: Role, text: &str) -> String {
    format!(
        "# {project}: {}\n\n_Written by the {}._\n\n{}\n",
        doc.heading,
        role.title(),
        text.trim()
    )
}

fn score(value: f64) -> String {
    format!("{value:.2}")
}

pub fn render_structure_analysis(
    project: &str,
    report: &StructureReport,
    warnings: &[String],
) -> String {
    let mut out = format!("# {project}: Structure Analysis\n\n");
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "| --- | --- |");
    let _ = writeln!(out, "| Directories | {} |", report.directories);
    let _ = writeln!(out, "| Files | {} |", report.files);
    let _ = writeln!(out, "| Max depth | {} |", report.max_depth);
    let _ = writeln!(out, "| Widest directory | {} |", report.widest);
    let _ = writeln!(out, "| Complexity | {} |", score(report.scores.complexity));
    let _ = writeln!(out, "| Innovation | {} |", score(report.scores.innovation));
    let _ = writeln!(
        out,
        "| Maintainability | {} |",
        score(report.scores.maintainability)
    );

    if !report.files_by_kind.is_empty() {
        out.push_str("\n## Files by kind\n\n");
        for (kind, count) in &report.files_by_kind {
            let _ = writeln!(out, "- {kind}: {count}");
        }
    }

    out.push_str("\n## Opportunities\n\n");
    if report.opportunities.is_empty() {
        out.push_str("None found.\n");
    }
    for opportunity in &report.opportunities {
        let _ = writeln!(out, "- {}", opportunity.detail);
    }

    if !warnings.is_empty() {
        out.push_str("\n## Warnings\n\n");
        for warning in warnings {
            let _ = writeln!(out, "- {warning}");
        }
    }
    out
}

pub fn render_code_analysis(project: &str, report: &CodeReport) -> String {
    let mut out = format!("# {project}: Code Analysis\n\n");
    let _ = writeln!(out, "- Files: {}", report.files);
    let _ = writeln!(out, "- Total lines: {}", report.total_lines);
    let _ = writeln!(out, "- Average lines per file: {:.1}", report.average_lines);
    let _ = writeln!(out, "- TODO markers: {}", report.todo_markers);

    if !report.languages.is_empty() {
        out.push_str("\n## Languages\n\n");
        for (language, count) in &report.languages {
            let _ = writeln!(out, "- {language}: {count}");
        }
    }
    out
}

pub fn render_history(project: &str, context: &ProjectContext) -> String {
    let mut out = format!("# {project}: Project History\n");
    for entry in context.transcript() {
        let _ = write!(
            out,
            "\n## {} ({})\n\n{}\n",
            entry.role.title(),
            entry.recorded_at.format("%Y-%m-%d %H:%M:%S UTC"),
            entry.text.trim()
        );
    }
    out
}

/// Inputs to the project README.
#[derive(Debug)]
pub struct ReadmeInput<'a> {
    pub project: &'a str,
    pub description: &'a str,
    /// Artifact key to relative path, for documents already written.
    pub artifacts: &'a BTreeMap<String, String>,
    pub generated_files: &'a [String],
    pub structure: Option<&'a StructureReport>,
}

fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn render_readme(input: &ReadmeInput<'_>) -> String {
    let mut out = format!("# {}\n\n{}\n", input.project, input.description.trim());

    out.push_str("\n## Documents\n\n");
    for (key, path) in input.artifacts {
        if path.as_str() == README_PATH {
            continue;
        }
        let _ = writeln!(out, "- [{}]({path})", title_case(key));
    }

    if let Some(report) = input.structure {
        let _ = write!(
            out,
            "\n## Layout\n\n{} directories and {} files, at most {} levels deep.\n",
            report.directories, report.files, report.max_depth
        );
    }

    if !input.generated_files.is_empty() {
        out.push_str("\n## Files\n\n");
        for file in input.generated_files {
            let _ = writeln!(out, "- `{file}`");
        }
    }
    out
}
