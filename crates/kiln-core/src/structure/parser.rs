//! Tolerant extraction of a layout payload from free-form generator output.
//!
//! Candidates are tried in order and the first one that decodes as a
//! layout wins:
//!
//! 1. fenced blocks tagged `json` (content may start on the fence line),
//! 2. other fenced blocks whose content starts with `{`,
//! 3. the whole trimmed text,
//! 4. JSON objects embedded in prose, scanning each `{` with a streaming
//!    decoder.
//!
//! Structural problems that still leave a useful tree (duplicate or unsafe
//! names, unknown content types) become warnings. Only an undecodable
//! payload or a tree deeper than the configured limit is an error.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::types::{ContentKind, DirectoryNode, FileNode, StructureNode, StructureTree};
use super::wire::{Entries, WireDirectory, WireFile, WirePayload, WireStructure};

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```[ \t]*json[ \t]*\r?\n?(.*?)```").expect("static regex is valid")
});

static ANY_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+.-]*[ \t]*\r?\n?(.*?)```").expect("static regex is valid")
});

/// Default maximum nesting depth of a layout tree.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Upper bound on `{` positions tried when scanning prose for JSON.
const MAX_EMBEDDED_ATTEMPTS: usize = 64;

/// Errors that reject a layout payload outright.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StructureParseError {
    #[error("no layout payload could be decoded: {message}")]
    Decode { message: String, raw: String },

    #[error("layout node {path:?} is nested {depth} levels deep (limit {max_depth})")]
    TooDeep {
        path: String,
        depth: usize,
        max_depth: usize,
    },
}

impl StructureParseError {
    /// The offending text, when the error carries it.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Decode { raw, .. } => Some(raw),
            Self::TooDeep { .. } => None,
        }
    }
}

/// Non-fatal problems attached to a successfully parsed tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureWarning {
    #[error("duplicate name {path:?}: kept the first entry, dropped a later one")]
    DuplicateName { path: String },

    #[error("unsafe name {name:?} under {parent:?} was skipped")]
    UnsafeName { parent: String, name: String },

    #[error("unknown content type {tag:?} for {path:?}; treated as other")]
    UnknownContentType { path: String, tag: String },
}

/// A decoded tree plus the warnings found while building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStructure {
    pub tree: StructureTree,
    pub warnings: Vec<StructureWarning>,
}

/// Parses layout payloads with a fixed depth limit.
#[derive(Debug, Clone, Copy)]
pub struct StructureParser {
    max_depth: usize,
}

impl Default for StructureParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl StructureParser {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Locate, decode, and validate the layout in `raw`.
    pub fn parse(&self, raw: &str) -> Result<ParsedStructure, StructureParseError> {
        let wire = decode_wire(raw)?;
        self.build(&wire)
    }

    /// Convert a decoded layout into a validated tree.
    pub fn build(&self, wire: &WireStructure) -> Result<ParsedStructure, StructureParseError> {
        let mut builder = Builder {
            max_depth: self.max_depth,
            warnings: Vec::new(),
        };
        let roots = builder.children("", 1, &wire.directories, &wire.files)?;
        Ok(ParsedStructure {
            tree: StructureTree::new(roots),
            warnings: builder.warnings,
        })
    }
}

/// Parse with the default depth limit.
pub fn parse(raw: &str) -> Result<ParsedStructure, StructureParseError> {
    StructureParser::default().parse(raw)
}

// ---------------------------------------------------------------------------
// Candidate extraction
// ---------------------------------------------------------------------------

fn candidates(raw: &str) -> Vec<&str> {
    let json_blocks = JSON_FENCE
        .captures_iter(raw)
        .filter_map(|c| c.get(1).map(|m| m.as_str()));
    let other_blocks = ANY_FENCE
        .captures_iter(raw)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .filter(|s| s.trim_start().starts_with('{'));

    let mut out: Vec<&str> = Vec::new();
    for candidate in json_blocks.chain(other_blocks).chain(std::iter::once(raw)) {
        let candidate = candidate.trim();
        if !candidate.is_empty() && !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

fn decode_candidate(text: &str) -> Result<Option<WireStructure>, serde_json::Error> {
    let payload: WirePayload = serde_json::from_str(text)?;
    Ok(payload.into_structure())
}

/// Try each `{` in `raw` as the start of a JSON object.
fn scan_embedded(raw: &str) -> Option<WireStructure> {
    raw.match_indices('{')
        .take(MAX_EMBEDDED_ATTEMPTS)
        .find_map(|(start, _)| {
            let mut stream =
                serde_json::Deserializer::from_str(&raw[start..]).into_iter::<WirePayload>();
            match stream.next() {
                Some(Ok(payload)) => payload.into_structure(),
                _ => None,
            }
        })
}

fn decode_wire(raw: &str) -> Result<WireStructure, StructureParseError> {
    let mut first_error: Option<String> = None;

    for candidate in candidates(raw) {
        match decode_candidate(candidate) {
            Ok(Some(wire)) => return Ok(wire),
            Ok(None) => {
                first_error.get_or_insert_with(|| {
                    "JSON object has no \"directories\" or \"files\" member".to_owned()
                });
            }
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    if let Some(wire) = scan_embedded(raw) {
        return Ok(wire);
    }

    Err(StructureParseError::Decode {
        message: first_error.unwrap_or_else(|| "input is empty".to_owned()),
        raw: raw.to_owned(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Returns `true` if `name` can be used as a single path component.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && !(name.len() >= 2 && name.as_bytes()[1] == b':')
}

fn clean_text(text: &Option<String>) -> Option<String> {
    text.as_ref()
        .filter(|s| !s.trim().is_empty())
        .map(ToOwned::to_owned)
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}/{name}")
    }
}

struct Builder {
    max_depth: usize,
    warnings: Vec<StructureWarning>,
}

impl Builder {
    /// Build the children of `parent`, which sit at `depth`.
    ///
    /// Recursion is bounded: a child deeper than `max_depth` aborts before
    /// descending further, and the decoder's own nesting limit bounds the
    /// input.
    fn children(
        &mut self,
        parent: &str,
        depth: usize,
        directories: &Entries<WireDirectory>,
        files: &Entries<WireFile>,
    ) -> Result<Vec<StructureNode>, StructureParseError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut nodes = Vec::with_capacity(directories.0.len() + files.0.len());

        for (raw_name, dir) in directories.iter() {
            let name = raw_name.trim().trim_end_matches('/').to_owned();
            let Some(path) = self.admit(parent, &name, raw_name, depth, &mut seen)? else {
                continue;
            };
            let children = self.children(&path, depth + 1, &dir.directories, &dir.files)?;
            nodes.push(StructureNode::Directory(DirectoryNode {
                name,
                purpose: clean_text(&dir.description),
                children,
            }));
        }

        for (raw_name, file) in files.iter() {
            let name = raw_name.trim().to_owned();
            let Some(path) = self.admit(parent, &name, raw_name, depth, &mut seen)? else {
                continue;
            };
            let kind = match file.kind.as_deref().map(str::trim) {
                None | Some("") => ContentKind::infer(&name),
                Some(tag) => ContentKind::from_tag(tag).unwrap_or_else(|| {
                    self.warnings.push(StructureWarning::UnknownContentType {
                        path: path.clone(),
                        tag: tag.to_owned(),
                    });
                    ContentKind::Other
                }),
            };
            nodes.push(StructureNode::File(FileNode {
                name,
                purpose: clean_text(&file.description),
                kind,
                intent: clean_text(&file.content_template),
            }));
        }

        Ok(nodes)
    }

    /// Check depth, safety, and uniqueness. Returns the node's path if it
    /// should be kept.
    fn admit(
        &mut self,
        parent: &str,
        name: &str,
        raw_name: &str,
        depth: usize,
        seen: &mut HashSet<String>,
    ) -> Result<Option<String>, StructureParseError> {
        if !is_safe_name(name) {
            self.warnings.push(StructureWarning::UnsafeName {
                parent: parent.to_owned(),
                name: raw_name.to_owned(),
            });
            return Ok(None);
        }
        let path = join(parent, name);
        if depth > self.max_depth {
            return Err(StructureParseError::TooDeep {
                path,
                depth,
                max_depth: self.max_depth,
            });
        }
        if !seen.insert(name.to_owned()) {
            self.warnings
                .push(StructureWarning::DuplicateName { path: path.clone() });
            return Ok(None);
        }
        Ok(Some(path))
    }
}
