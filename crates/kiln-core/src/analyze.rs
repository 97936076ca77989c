//! Heuristic reports over a layout tree and over synthesized files.
//!
//! The scores are illustrative: they are bounded, deterministic, and move
//! in the expected direction, but they are not calibrated against anything.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::structure::{ContentKind, GeneratedArtifact, StructureNode, StructureTree};

/// Nesting beyond this depth is flagged.
const FLATTEN_DEPTH: usize = 4;
/// Directories with more entries than this are flagged.
const SPLIT_FAN_OUT: usize = 15;
/// Depth up to which maintainability is not penalized.
const COMFORTABLE_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scores {
    pub complexity: f64,
    pub innovation: f64,
    pub maintainability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    FlattenNesting,
    SplitDirectory,
    AddTests,
    AddDocumentation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Opportunity {
    pub kind: OpportunityKind,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureReport {
    pub directories: usize,
    pub files: usize,
    pub max_depth: usize,
    pub files_by_kind: BTreeMap<ContentKind, usize>,
    /// Largest number of entries directly inside one directory (or the root).
    pub widest: usize,
    pub scores: Scores,
    pub opportunities: Vec<Opportunity>,
}

fn complexity(nodes: usize, depth: usize) -> f64 {
    let n = nodes as f64;
    let d = depth as f64;
    (0.5 * n / (n + 20.0) + 0.5 * d / (d + 3.0)).clamp(0.0, 1.0)
}

fn innovation(nested_files: usize, files: usize, dirs: usize) -> f64 {
    let nested = if files == 0 {
        0.0
    } else {
        nested_files as f64 / files as f64
    };
    let dirs = dirs as f64;
    (0.7 * nested + 0.3 * dirs / (dirs + 5.0)).clamp(0.0, 1.0)
}

fn maintainability(depth: usize, widest: usize) -> f64 {
    let excess_depth = depth.saturating_sub(COMFORTABLE_DEPTH) as f64;
    let excess_width = widest.saturating_sub(SPLIT_FAN_OUT) as f64;
    let depth_factor = 1.0 / (1.0 + 0.25 * excess_depth * excess_depth);
    let width_factor = 1.0 / (1.0 + 0.05 * excess_width);
    (depth_factor * width_factor).clamp(0.0, 1.0)
}

pub fn analyze_structure(tree: &StructureTree) -> StructureReport {
    let walked = tree.walk();

    let mut directories = 0;
    let mut files = 0;
    let mut nested_files = 0;
    let mut max_depth = 0;
    let mut files_by_kind: BTreeMap<ContentKind, usize> = BTreeMap::new();
    let mut widest = tree.roots.len();
    let mut crowded = Vec::new();

    for (path, depth, node) in &walked {
        max_depth = max_depth.max(*depth);
        match node {
            StructureNode::Directory(dir) => {
                directories += 1;
                widest = widest.max(dir.children.len());
                if dir.children.len() > SPLIT_FAN_OUT {
                    crowded.push((path.clone(), dir.children.len()));
                }
            }
            StructureNode::File(file) => {
                files += 1;
                if *depth > 1 {
                    nested_files += 1;
                }
                *files_by_kind.entry(file.kind).or_default() += 1;
            }
        }
    }

    let mut opportunities = Vec::new();
    if max_depth > FLATTEN_DEPTH {
        opportunities.push(Opportunity {
            kind: OpportunityKind::FlattenNesting,
            detail: format!(
                "layout is nested {max_depth} levels deep; consider flattening below {FLATTEN_DEPTH}"
            ),
        });
    }
    for (path, entries) in crowded {
        opportunities.push(Opportunity {
            kind: OpportunityKind::SplitDirectory,
            detail: format!("{path}/ holds {entries} entries; consider splitting it"),
        });
    }
    let count = |kind: ContentKind| files_by_kind.get(&kind).copied().unwrap_or(0);
    if count(ContentKind::Module) > 0 && count(ContentKind::Test) == 0 {
        opportunities.push(Opportunity {
            kind: OpportunityKind::AddTests,
            detail: "modules are planned but no test files are".to_owned(),
        });
    }
    if count(ContentKind::Documentation) == 0 {
        opportunities.push(Opportunity {
            kind: OpportunityKind::AddDocumentation,
            detail: "no documentation files are planned".to_owned(),
        });
    }

    StructureReport {
        directories,
        files,
        max_depth,
        widest,
        scores: Scores {
            complexity: complexity(walked.len(), max_depth),
            innovation: innovation(nested_files, files, directories),
            maintainability: maintainability(max_depth, widest),
        },
        files_by_kind,
        opportunities,
    }
}

// ---------------------------------------------------------------------------
// Code
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeReport {
    pub files: usize,
    pub total_lines: usize,
    pub average_lines: f64,
    pub languages: BTreeMap<String, usize>,
    /// Occurrences of `TODO`, `FIXME`, or `unimplemented!`.
    pub todo_markers: usize,
}

/// Language name for a file path, from its extension.
pub fn language_of(path: &str) -> &'static str {
    let name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
    if matches!(name.as_str(), "makefile" | "justfile") {
        return "Make";
    }
    if name == "dockerfile" {
        return "Docker";
    }
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("py") => "Python",
        Some("rs") => "Rust",
        Some("js" | "mjs" | "cjs" | "jsx") => "JavaScript",
        Some("ts" | "tsx") => "TypeScript",
        Some("go") => "Go",
        Some("java") => "Java",
        Some("kt") => "Kotlin",
        Some("c" | "h") => "C",
        Some("cpp" | "cc" | "hpp") => "C++",
        Some("cs") => "C#",
        Some("rb") => "Ruby",
        Some("swift") => "Swift",
        Some("sh" | "bash") => "Shell",
        Some("bat" | "cmd") => "Batch",
        Some("html" | "htm") => "HTML",
        Some("css" | "scss") => "CSS",
        Some("sql") => "SQL",
        Some("md" | "markdown") => "Markdown",
        Some("json") => "JSON",
        Some("yaml" | "yml") => "YAML",
        Some("toml") => "TOML",
        Some("ini" | "cfg") => "INI",
        Some("txt") => "Text",
        _ => "Other",
    }
}

fn todo_markers(content: &str) -> usize {
    ["TODO", "FIXME", "unimplemented!"]
        .iter()
        .map(|marker| content.matches(marker).count())
        .sum()
}

pub fn analyze_code(artifacts: &[GeneratedArtifact]) -> CodeReport {
    let mut languages: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_lines = 0;
    let mut markers = 0;

    for artifact in artifacts {
        total_lines += artifact.content.lines().count();
        markers += todo_markers(&artifact.content);
        *languages
            .entry(language_of(&artifact.path).to_owned())
            .or_default() += 1;
    }

    let average_lines = if artifacts.is_empty() {
        0.0
    } else {
        total_lines as f64 / artifacts.len() as f64
    };

    CodeReport {
        files: artifacts.len(),
        total_lines,
        average_lines,
        languages,
        todo_markers: markers,
    }
}
