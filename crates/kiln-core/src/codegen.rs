//! Replace materialized stubs with generated file contents.
//!
//! One generator call per file, in layout order. A generator failure stops
//! synthesis and is returned as an error; a write failure is recorded and
//! the next file is attempted.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::context::ProjectContext;
use crate::docs::is_reserved_path;
use crate::generator::{GenerateError, GenerationRequest, Generator};
use crate::processor::extract_text;
use crate::structure::{CommentStyle, ContentKind, FileNode, GeneratedArtifact, StructureTree};
use crate::template::{Bindings, PromptTemplate};

use kiln_store::Role;

/// Label used for every code synthesis request.
pub const CODEGEN_LABEL: &str = "codegen";

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+.-]*[ \t]*\r?\n(.*?)```").expect("static regex is valid")
});

const CODEGEN_TEMPLATE: &str = "You are the Builder for the {project_name} project.

File: {file_path}
Type: {kind}
Purpose: {purpose}
Intended content: {intent}

Architecture:
{design}

Implementation plan:
{implementation}

{instruction}
Answer with the file content only, inside one fenced code block.";

static PROMPT: LazyLock<PromptTemplate> = LazyLock::new(|| PromptTemplate::parse(CODEGEN_TEMPLATE));

fn instruction(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Module => "Write the complete, working source code for this module.",
        ContentKind::Configuration => "Write this configuration file with sensible defaults.",
        ContentKind::Documentation => "Write this document in full.",
        ContentKind::Test => "Write thorough tests for the code this file covers.",
        ContentKind::Build => "Write this build file.",
        ContentKind::Other => "Write the content this file should hold.",
    }
}

/// The body of the first fenced block, or the whole text if there is none.
fn unwrap_fence(text: &str) -> &str {
    CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str())
}

/// Prefix `content` with a header comment naming the file, keeping any
/// shebang line first. Files without comment syntax are left alone.
fn with_header(path: &str, purpose: Option<&str>, content: &str) -> String {
    let mut lines = vec![path.to_owned()];
    if let Some(purpose) = purpose {
        lines.push(purpose.to_owned());
    }
    let Some(header) = CommentStyle::for_file(path).block(&lines) else {
        return ensure_newline(content.to_owned());
    };

    let (shebang, body) = match content.strip_prefix("#!") {
        Some(_) => match content.split_once('\n') {
            Some((first, rest)) => (Some(first), rest),
            None => (Some(content), ""),
        },
        None => (None, content),
    };

    let mut out = String::new();
    if let Some(shebang) = shebang {
        out.push_str(shebang);
        out.push('\n');
    }
    out.push_str(&header);
    out.push_str("\n\n");
    out.push_str(body.trim_start_matches('\n'));
    ensure_newline(out)
}

fn ensure_newline(mut s: String) -> String {
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

/// Files written and files that could not be written.
#[derive(Debug, Default, Clone)]
pub struct Synthesis {
    pub artifacts: Vec<GeneratedArtifact>,
    /// `(path, error)` for each failed write.
    pub failures: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct CodeSynthesizer {
    generator: Arc<dyn Generator>,
}

impl CodeSynthesizer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    pub fn build_request(
        &self,
        project: &str,
        path: &str,
        file: &FileNode,
        context: &ProjectContext,
    ) -> GenerationRequest {
        let mut variables = Bindings::new();
        variables.insert("project_name".into(), project.to_owned());
        variables.insert("file_path".into(), path.to_owned());
        variables.insert("kind".into(), file.kind.to_string());
        variables.insert(
            "purpose".into(),
            file.purpose.clone().unwrap_or_default(),
        );
        variables.insert("intent".into(), file.intent.clone().unwrap_or_default());
        variables.insert("design".into(), context.slot(Role::Designer).trim().to_owned());
        variables.insert(
            "implementation".into(),
            context.slot(Role::Builder).trim().to_owned(),
        );
        variables.insert("instruction".into(), instruction(file.kind).to_owned());

        GenerationRequest {
            label: CODEGEN_LABEL.to_owned(),
            template: PROMPT.as_str().to_owned(),
            prompt: PROMPT.render(&variables),
            variables,
        }
    }

    /// Generate and write every file in `tree` under `root`.
    pub async fn synthesize(
        &self,
        root: &Path,
        project: &str,
        tree: &StructureTree,
        context: &ProjectContext,
    ) -> Result<Synthesis, GenerateError> {
        let mut out = Synthesis::default();

        for (path, file) in tree.files() {
            if is_reserved_path(&path) {
                tracing::warn!(path = %path, "not synthesizing a reserved path");
                continue;
            }
            let request = self.build_request(project, &path, file, context);
            tracing::info!(path = %path, generator = self.generator.name(), "synthesizing file");

            let raw = self.generator.invoke(&request).await?;
            let text = extract_text(&raw);
            let body = unwrap_fence(&text);
            if body.trim().is_empty() {
                return Err(GenerateError::EmptyResponse {
                    label: format!("{CODEGEN_LABEL} {path}"),
                });
            }

            let content = with_header(&path, file.purpose.as_deref(), body);
            let target = path.split('/').fold(root.to_path_buf(), |p, part| p.join(part));
            let written = match target.parent() {
                Some(parent) => tokio::fs::create_dir_all(parent).await,
                None => Ok(()),
            };
            let written = match written {
                Ok(()) => tokio::fs::write(&target, &content).await,
                Err(e) => Err(e),
            };

            match written {
                Ok(()) => out.artifacts.push(GeneratedArtifact {
                    path,
                    content,
                    kind: file.kind,
                }),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "failed to write synthesized file");
                    out.failures.push((path, e.to_string()));
                }
            }
        }

        tracing::info!(
            written = out.artifacts.len(),
            failed = out.failures.len(),
            "code synthesis complete"
        );
        Ok(out)
    }
}

impl std::fmt::Debug for CodeSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeSynthesizer")
            .field("generator", &self.generator.name())
            .finish()
    }
}
