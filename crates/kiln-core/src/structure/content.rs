//! Stub content for materialized files, keyed by content kind and
//! formatted for the file's language.

use super::types::{ContentKind, FileNode, GeneratedArtifact};

/// How comments are written in a file, chosen from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `# ...`
    Hash,
    /// `// ...`
    Slash,
    /// `-- ...`
    Dash,
    /// `<!-- ... -->`
    Markup,
    /// Markdown prose; no comment syntax needed.
    Markdown,
    /// JSON has no comments; stubs are rendered as an object.
    Json,
    /// Plain text.
    Plain,
}

impl CommentStyle {
    /// Style for a file name or a `/`-joined path; only the last component
    /// is considered.
    pub fn for_file(name: &str) -> Self {
        let base = name.rsplit('/').next().unwrap_or(name);
        let lower = base.to_ascii_lowercase();
        if matches!(
            lower.as_str(),
            "makefile" | "dockerfile" | "justfile" | ".gitignore" | ".dockerignore" | ".env"
        ) {
            return Self::Hash;
        }
        let Some((_, ext)) = lower.rsplit_once('.') else {
            return Self::Plain;
        };
        match ext {
            "py" | "sh" | "bash" | "toml" | "yaml" | "yml" | "ini" | "cfg" | "conf" | "rb"
            | "pl" | "r" | "env" | "mk" | "dockerfile" | "gitignore" => Self::Hash,
            "rs" | "js" | "jsx" | "ts" | "tsx" | "go" | "c" | "h" | "cpp" | "hpp" | "cc"
            | "java" | "kt" | "swift" | "cs" | "scala" | "dart" | "css" | "scss" | "proto" => {
                Self::Slash
            }
            "sql" | "lua" | "hs" => Self::Dash,
            "html" | "htm" | "xml" | "svg" | "vue" => Self::Markup,
            "md" | "markdown" | "rst" => Self::Markdown,
            "json" => Self::Json,
            _ => Self::Plain,
        }
    }

    /// Render `lines` as a comment block, or `None` for styles without
    /// comment syntax.
    pub fn block(self, lines: &[String]) -> Option<String> {
        let prefixed = |prefix: &str| -> String {
            lines
                .iter()
                .map(|l| {
                    if l.is_empty() {
                        prefix.trim_end().to_owned()
                    } else {
                        format!("{prefix}{l}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        };
        match self {
            Self::Hash => Some(prefixed("# ")),
            Self::Slash => Some(prefixed("// ")),
            Self::Dash => Some(prefixed("-- ")),
            Self::Markup => Some(format!("<!--\n{}\n-->", lines.join("\n"))),
            Self::Markdown | Self::Json | Self::Plain => None,
        }
    }
}

fn kind_heading(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Module => "Module",
        ContentKind::Configuration => "Configuration",
        ContentKind::Documentation => "Documentation",
        ContentKind::Test => "Tests",
        ContentKind::Build => "Build",
        ContentKind::Other => "File",
    }
}

fn kind_next_step(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Module => "Implement the module described above.",
        ContentKind::Configuration => "Fill in the configuration values.",
        ContentKind::Documentation => "Write this document.",
        ContentKind::Test => "Add test cases covering the behaviour described above.",
        ContentKind::Build => "Define the build steps.",
        ContentKind::Other => "Provide the content described above.",
    }
}

/// Render placeholder content for `file` at relative `path`. Never empty.
pub fn render_stub(path: &str, file: &FileNode) -> String {
    let purpose = file.purpose.as_deref().unwrap_or("No description provided.");
    let intent = file.intent.as_deref();
    let style = CommentStyle::for_file(&file.name);

    match style {
        CommentStyle::Json => {
            let mut obj = serde_json::Map::new();
            obj.insert("_path".into(), path.into());
            obj.insert("_kind".into(), file.kind.as_str().into());
            obj.insert("_description".into(), purpose.into());
            if let Some(intent) = intent {
                obj.insert("_content".into(), intent.into());
            }
            obj.insert("_next_step".into(), kind_next_step(file.kind).into());
            let mut out = serde_json::to_string_pretty(&serde_json::Value::Object(obj))
                .unwrap_or_else(|_| "{}".to_owned());
            out.push('\n');
            out
        }
        CommentStyle::Markdown => {
            let title = file
                .name
                .rsplit_once('.')
                .map(|(stem, _)| stem)
                .unwrap_or(&file.name);
            let mut out = format!("# {title}\n\n{purpose}\n");
            if let Some(intent) = intent {
                out.push_str(&format!("\n## Contents\n\n{intent}\n"));
            }
            out.push_str(&format!(
                "\n## {}\n\n{}\n",
                kind_heading(file.kind),
                kind_next_step(file.kind)
            ));
            out
        }
        _ => {
            let mut lines = vec![
                format!("{}: {path}", kind_heading(file.kind)),
                String::new(),
                format!("Purpose: {purpose}"),
            ];
            if let Some(intent) = intent {
                lines.push(format!("Intended content: {intent}"));
            }
            lines.push(String::new());
            lines.push(kind_next_step(file.kind).to_owned());

            let mut out = style.block(&lines).unwrap_or_else(|| lines.join("\n"));
            out.push('\n');
            out
        }
    }
}

/// A stub artifact for `file`.
pub fn stub_artifact(path: &str, file: &FileNode) -> GeneratedArtifact {
    GeneratedArtifact {
        path: path.to_owned(),
        content: render_stub(path, file),
        kind: file.kind,
    }
}

/// Content of the `README.md` sidecar written into a directory.
pub fn sidecar(name: &str, purpose: &str) -> String {
    format!("# {name}\n\n{purpose}\n")
}
