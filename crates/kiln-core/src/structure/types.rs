use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Content kind
// ---------------------------------------------------------------------------

/// Closed set of file content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Module,
    Configuration,
    Documentation,
    Test,
    Build,
    Other,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        Self::Module,
        Self::Configuration,
        Self::Documentation,
        Self::Test,
        Self::Build,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Configuration => "configuration",
            Self::Documentation => "documentation",
            Self::Test => "test",
            Self::Build => "build",
            Self::Other => "other",
        }
    }

    /// Map a free-form type tag to a kind.
    ///
    /// Returns `None` for tags that are not recognized; callers fall back
    /// to [`ContentKind::Other`] and report the tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized: String = tag
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        let kind = match normalized.as_str() {
            "module" | "python_module" | "source" | "src" | "code" | "script" | "library"
            | "lib" | "class" | "component" => Self::Module,
            "configuration" | "config" | "settings" | "cfg" | "conf" => Self::Configuration,
            "documentation" | "docs" | "doc" | "readme" | "markdown" => Self::Documentation,
            "test" | "tests" | "unit_test" | "test_module" | "spec" => Self::Test,
            "build" | "build_script" | "ci" | "makefile" | "dockerfile" => Self::Build,
            "other" | "data" | "asset" | "static" | "text" => Self::Other,
            _ => return None,
        };
        Some(kind)
    }

    /// Best guess from a file name, used when no type tag is given.
    pub fn infer(file_name: &str) -> Self {
        let lower = file_name.to_ascii_lowercase();
        let stem = lower.split('.').next().unwrap_or("");
        if stem.starts_with("test_") || stem.ends_with("_test") || lower.contains(".test.") {
            return Self::Test;
        }
        if matches!(
            lower.as_str(),
            "makefile" | "dockerfile" | "build.rs" | "setup.py" | "cmakelists.txt" | "justfile"
        ) {
            return Self::Build;
        }
        match lower.rsplit_once('.').map(|(_, ext)| ext) {
            Some("md" | "rst" | "adoc") => Self::Documentation,
            Some("toml" | "yaml" | "yml" | "json" | "ini" | "cfg" | "conf" | "env") => {
                Self::Configuration
            }
            Some(
                "py" | "rs" | "js" | "ts" | "go" | "java" | "kt" | "c" | "h" | "cpp" | "cs"
                | "rb" | "swift" | "sh",
            ) => Self::Module,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = ContentKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| ContentKindParseError(s.to_owned()))
    }
}

/// Error returned when parsing an unrecognized [`ContentKind`] tag.
#[derive(Debug, Clone)]
pub struct ContentKindParseError(pub String);

impl fmt::Display for ContentKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid content type: {:?}", self.0)
    }
}

impl std::error::Error for ContentKindParseError {}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub name: String,
    pub purpose: Option<String>,
    /// Subdirectories first, then files, each in payload order.
    pub children: Vec<StructureNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub name: String,
    pub purpose: Option<String>,
    pub kind: ContentKind,
    /// Short summary of what the file should contain.
    pub intent: Option<String>,
}

/// A parsed directory or file specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureNode {
    Directory(DirectoryNode),
    File(FileNode),
}

impl StructureNode {
    pub fn name(&self) -> &str {
        match self {
            Self::Directory(d) => &d.name,
            Self::File(f) => &f.name,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}

/// The parsed root-level nodes of a project layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructureTree {
    pub roots: Vec<StructureNode>,
}

impl StructureTree {
    pub fn new(roots: Vec<StructureNode>) -> Self {
        Self { roots }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Pre-order traversal yielding `(path, depth, node)`, where `path` is
    /// `/`-joined relative to the root and root-level nodes have depth 1.
    /// Iterative, so arbitrarily deep trees cannot exhaust the stack.
    pub fn walk(&self) -> Vec<(String, usize, &StructureNode)> {
        let mut out = Vec::new();
        let mut stack: Vec<(String, usize, &StructureNode)> = self
            .roots
            .iter()
            .rev()
            .map(|n| (n.name().to_owned(), 1, n))
            .collect();

        while let Some((path, depth, node)) = stack.pop() {
            if let StructureNode::Directory(dir) = node {
                for child in dir.children.iter().rev() {
                    stack.push((format!("{path}/{}", child.name()), depth + 1, child));
                }
            }
            out.push((path, depth, node));
        }
        out
    }

    /// Drop every node whose relative path satisfies `reserved`, along with
    /// its subtree. Returns the dropped paths.
    pub fn remove_paths(&mut self, reserved: impl Fn(&str) -> bool) -> Vec<String> {
        let mut removed = Vec::new();
        let mut stack: Vec<(String, &mut Vec<StructureNode>)> = vec![(String::new(), &mut self.roots)];

        while let Some((prefix, nodes)) = stack.pop() {
            let path_of = |name: &str| {
                if prefix.is_empty() {
                    name.to_owned()
                } else {
                    format!("{prefix}/{name}")
                }
            };
            nodes.retain(|node| {
                let path = path_of(node.name());
                if reserved(&path) {
                    removed.push(path);
                    false
                } else {
                    true
                }
            });
            for node in nodes {
                if let StructureNode::Directory(dir) = node {
                    stack.push((path_of(&dir.name), &mut dir.children));
                }
            }
        }
        removed
    }

    /// Every file node with its relative path.
    pub fn files(&self) -> Vec<(String, &FileNode)> {
        self.walk()
            .into_iter()
            .filter_map(|(path, _, node)| match node {
                StructureNode::File(f) => Some((path, f)),
                StructureNode::Directory(_) => None,
            })
            .collect()
    }

    pub fn count_directories(&self) -> usize {
        self.walk().iter().filter(|(_, _, n)| n.is_dir()).count()
    }

    pub fn count_files(&self) -> usize {
        self.walk().iter().filter(|(_, _, n)| !n.is_dir()).count()
    }

    /// Depth of the deepest node; 0 for an empty tree.
    pub fn max_depth(&self) -> usize {
        self.walk().iter().map(|(_, d, _)| *d).max().unwrap_or(0)
    }
}

/// A file's path, content, and kind, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    /// `/`-joined path relative to the project root.
    pub path: String,
    pub content: String,
    pub kind: ContentKind,
}
