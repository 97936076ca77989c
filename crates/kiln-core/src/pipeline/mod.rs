//! Pipeline orchestrator: runs the roles in order, writes their documents,
//! and optionally materializes and fills in the project layout.
//!
//! ```text
//! visionary -> strategist -> designer -> builder      (docs/*.md)
//!     -> layout -> parse -> materialize -> analyze     (tree, .structure)
//!         -> code synthesis -> analyze                 (optional)
//!             -> project_history.md, README.md
//! ```
//!
//! A run never panics or returns `Err`: every outcome is a
//! [`PipelineResult`]. Files written before a failure are left in place.

pub mod error;
pub mod result;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::Instrument;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use kiln_store::Role;

use crate::analyze::{analyze_code, analyze_structure};
use crate::codegen::CodeSynthesizer;
use crate::context::ProjectContext;
use crate::docs::{
    self, CODE_ANALYSIS_PATH, HISTORY_PATH, README_PATH, ReadmeInput, STRUCTURE_ANALYSIS_PATH,
};
use crate::processor::RoleProcessor;
use crate::structure::{MANIFEST_FILE, MaterializeMeta, StructureParser, StructureTree, materialize};
use crate::template::Bindings;

pub use error::{PipelineError, Stage};
pub use result::{PipelineFailure, PipelineResult, PipelineWarning, RunMetrics, RunStatus};

/// Prefix of the warning attached when the layout cannot be parsed.
pub const STRUCTURE_FAILED: &str = "structure step failed";

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory under which each project gets its own output directory.
    pub projects_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            projects_root: PathBuf::from("projects"),
        }
    }
}

/// Normalize a user-supplied project name into a directory name.
///
/// Whitespace and every character outside `[A-Za-z0-9._-]` become `_`.
pub fn sanitize_project_name(name: &str) -> Result<String, PipelineError> {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let reason = match sanitized.as_str() {
        "" => Some("name is empty"),
        "." | ".." => Some("name refers to a relative directory"),
        _ => None,
    };
    match reason {
        Some(reason) => Err(PipelineError::InvalidProjectName {
            name: name.to_owned(),
            reason: reason.to_owned(),
        }),
        None => Ok(sanitized),
    }
}

fn role_task(role: Role, project: &str, description: &str) -> String {
    match role {
        Role::Visionary => format!(
            "Define the vision for {project}: {description}. Identify the core problem and what an ideal solution looks like."
        ),
        Role::Strategist => format!(
            "Choose the technology strategy for {project}: {description}. Build on the vision above."
        ),
        Role::Designer => format!(
            "Design the architecture of {project}: {description}. Follow the vision and technology strategy above."
        ),
        Role::Builder => format!(
            "Write the implementation plan for {project}: {description}. Turn the architecture above into concrete steps."
        ),
        Role::Layout => format!(
            "Lay out the directories and files for {project}: {description}, following the plan above."
        ),
    }
}

async fn write_document(root: &Path, rel: &str, content: &str) -> Result<(), PipelineError> {
    let path = rel.split('/').fold(root.to_path_buf(), |p, part| p.join(part));
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| PipelineError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(&path, content)
        .await
        .map_err(|source| PipelineError::Io {
            path: path.clone(),
            source,
        })?;
    tracing::debug!(path = %path.display(), "wrote document");
    Ok(())
}

fn checkpoint(cancel: &CancellationToken, stage: Stage) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        tracing::info!(stage = %stage, "pipeline cancelled");
        return Err(PipelineError::Cancelled { stage });
    }
    Ok(())
}

/// What a run has produced so far; becomes the [`PipelineResult`].
struct RunState {
    project: String,
    output_dir: PathBuf,
    artifacts: BTreeMap<String, String>,
    generated_files: Vec<String>,
    metrics: RunMetrics,
    warnings: Vec<PipelineWarning>,
}

impl RunState {
    fn warn(&mut self, message: String, raw: Option<String>) {
        tracing::warn!(project = %self.project, "{message}");
        self.warnings.push(PipelineWarning { message, raw });
    }

    fn artifact(&mut self, key: &str, path: &str) {
        self.artifacts.insert(key.to_owned(), path.to_owned());
    }
}

/// Runs the full generation pipeline for one project at a time.
#[derive(Debug, Clone)]
pub struct Pipeline {
    processor: RoleProcessor,
    config: PipelineConfig,
    structure: Option<StructureParser>,
    synthesizer: Option<CodeSynthesizer>,
}

impl Pipeline {
    /// A pipeline with the structure step enabled and code synthesis off.
    pub fn new(processor: RoleProcessor, config: PipelineConfig) -> Self {
        Self {
            processor,
            config,
            structure: Some(StructureParser::default()),
            synthesizer: None,
        }
    }

    pub fn with_structure_parser(mut self, parser: StructureParser) -> Self {
        self.structure = Some(parser);
        self
    }

    pub fn without_structure(mut self) -> Self {
        self.structure = None;
        self
    }

    /// Enable code synthesis using the role processor's generator.
    pub fn with_code_synthesis(mut self) -> Self {
        self.synthesizer = Some(CodeSynthesizer::new(self.processor.generator().clone()));
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: CodeSynthesizer) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, name: &str, description: &str) -> PipelineResult {
        self.run_with_cancel(name, description, CancellationToken::new())
            .await
    }

    /// Run the pipeline, stopping at the next stage boundary once `cancel`
    /// fires.
    pub async fn run_with_cancel(
        &self,
        name: &str,
        description: &str,
        cancel: CancellationToken,
    ) -> PipelineResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut state = RunState {
            project: name.to_owned(),
            output_dir: self.config.projects_root.clone(),
            artifacts: BTreeMap::new(),
            generated_files: Vec::new(),
            metrics: RunMetrics::default(),
            warnings: Vec::new(),
        };

        let span = tracing::info_span!("pipeline", run_id = %run_id);
        tracing::info!(parent: &span, project = name, "starting pipeline run");

        let outcome = self
            .execute(name, description, &cancel, &mut state)
            .instrument(span)
            .await;

        let (status, error) = match outcome {
            Ok(()) => {
                tracing::info!(project = %state.project, warnings = state.warnings.len(), "pipeline run succeeded");
                (RunStatus::Success, None)
            }
            Err(e) => {
                tracing::error!(project = %state.project, error = %e, "pipeline run failed");
                (
                    RunStatus::Error,
                    Some(PipelineFailure {
                        message: e.to_string(),
                        raw: e.raw(),
                    }),
                )
            }
        };

        PipelineResult {
            run_id,
            status,
            project: state.project,
            output_dir: state.output_dir,
            started_at,
            finished_at: Utc::now(),
            artifacts: state.artifacts,
            generated_files: state.generated_files,
            metrics: state.metrics,
            warnings: state.warnings,
            error,
        }
    }

    async fn execute(
        &self,
        name: &str,
        description: &str,
        cancel: &CancellationToken,
        state: &mut RunState,
    ) -> Result<(), PipelineError> {
        // 1. Resolve the output directory.
        let project = sanitize_project_name(name)?;
        let root = self.config.projects_root.join(&project);
        state.project = project.clone();
        state.output_dir = root.clone();

        let mut context = ProjectContext::new();
        let mut extra = Bindings::new();
        extra.insert("project_name".into(), project.clone());
        extra.insert("description".into(), description.to_owned());

        // 2. Text roles, each followed by its document.
        for role in Role::TEXT_ROLES {
            let stage = Stage::for_role(role);
            checkpoint(cancel, stage)?;

            let task = role_task(role, &project, description);
            let text = self
                .processor
                .process(role, &task, &context, &extra)
                .await
                .map_err(|source| PipelineError::Generate { stage, source })?;
            context.record(role, &text);

            if let Some(doc) = docs::role_document(role) {
                let content = docs::render_role_document(&doc, &project, role, &text);
                write_document(&root, doc.path, &content).await?;
                state.artifact(doc.key, doc.path);
            }
            state.metrics.stages.push(stage);
        }

        // 3. Layout.
        if let Some(parser) = &self.structure {
            checkpoint(cancel, Stage::Layout)?;
            let task = role_task(Role::Layout, &project, description);
            let text = self
                .processor
                .process(Role::Layout, &task, &context, &extra)
                .await
                .map_err(|source| PipelineError::Generate {
                    stage: Stage::Layout,
                    source,
                })?;
            context.record(Role::Layout, &text);
            state.metrics.stages.push(Stage::Layout);

            match parser.parse(&text) {
                Ok(parsed) => {
                    let mut tree = parsed.tree;
                    let mut warnings: Vec<String> =
                        parsed.warnings.iter().map(ToString::to_string).collect();
                    // Stage documents and the manifest win over planned files.
                    for path in tree.remove_paths(docs::is_reserved_path) {
                        warnings.push(format!("layout path {path:?} is reserved; skipped"));
                    }
                    for warning in &warnings {
                        state.warn(warning.clone(), None);
                    }
                    checkpoint(cancel, Stage::Materialize)?;
                    self.build_tree(&root, &project, &tree, &warnings, &context, cancel, state)
                        .await?;
                }
                Err(e) => {
                    let raw = e.raw().unwrap_or(text.as_str()).to_owned();
                    state.warn(format!("{STRUCTURE_FAILED}: {e}"), Some(raw));
                }
            }
        }

        // 4. Summary documents.
        checkpoint(cancel, Stage::Summary)?;
        write_document(&root, HISTORY_PATH, &docs::render_history(&project, &context)).await?;
        state.artifact("history", HISTORY_PATH);
        state.artifact("readme", README_PATH);

        let readme = docs::render_readme(&ReadmeInput {
            project: &project,
            description,
            artifacts: &state.artifacts,
            generated_files: &state.generated_files,
            structure: state.metrics.structure.as_ref(),
        });
        write_document(&root, README_PATH, &readme).await?;
        state.metrics.stages.push(Stage::Summary);
        Ok(())
    }

    /// Materialize, analyze, and optionally synthesize the parsed tree.
    #[allow(clippy::too_many_arguments)]
    async fn build_tree(
        &self,
        root: &Path,
        project: &str,
        tree: &StructureTree,
        parse_warnings: &[String],
        context: &ProjectContext,
        cancel: &CancellationToken,
        state: &mut RunState,
    ) -> Result<(), PipelineError> {
        let manifest = materialize(root, tree, &MaterializeMeta::now(project)).await;
        for (path, error) in manifest.failures() {
            state.warn(format!("failed to materialize {path}: {error}"), None);
        }
        if manifest.created_paths().contains(&MANIFEST_FILE) {
            state.artifact("structure_manifest", MANIFEST_FILE);
        }
        state.generated_files = manifest
            .created_files()
            .into_iter()
            .map(str::to_owned)
            .collect();
        state.metrics.stages.push(Stage::Materialize);

        let report = analyze_structure(tree);
        let content = docs::render_structure_analysis(project, &report, parse_warnings);
        write_document(root, STRUCTURE_ANALYSIS_PATH, &content).await?;
        state.artifact("structure_analysis", STRUCTURE_ANALYSIS_PATH);
        state.metrics.structure = Some(report);

        let Some(synthesizer) = &self.synthesizer else {
            return Ok(());
        };
        checkpoint(cancel, Stage::CodeSynthesis)?;
        let synthesis = synthesizer
            .synthesize(root, project, tree, context)
            .await
            .map_err(|source| PipelineError::Generate {
                stage: Stage::CodeSynthesis,
                source,
            })?;
        for (path, error) in &synthesis.failures {
            state.warn(format!("failed to write synthesized {path}: {error}"), None);
        }

        let report = analyze_code(&synthesis.artifacts);
        write_document(
            root,
            CODE_ANALYSIS_PATH,
            &docs::render_code_analysis(project, &report),
        )
        .await?;
        state.artifact("code_analysis", CODE_ANALYSIS_PATH);
        state.metrics.code = Some(report);
        state.metrics.stages.push(Stage::CodeSynthesis);
        Ok(())
    }
}
