//! End-to-end pipeline runs against scripted generators and a temporary
//! projects directory.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use kiln_core::generator::{GenerateError, GenerationRequest, Generator};
use kiln_core::pipeline::{RunStatus, STRUCTURE_FAILED};
use kiln_core::structure::{MANIFEST_FILE, Manifest};
use kiln_store::Role;
use kiln_test_utils::{
    FailingGenerator, ScriptedGenerator, duplicate_layout, garbage_layout, layout_payload,
    pipeline, single_file_layout,
};

const TEXT_DOCS: [&str; 4] = [
    "docs/vision.md",
    "docs/technical_strategy.md",
    "docs/architecture.md",
    "docs/implementation.md",
];

fn read(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
}

// ===========================================================================
// Happy path
// ===========================================================================

#[tokio::test]
async fn taskflow_run_writes_documents_and_layout() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(
        ScriptedGenerator::new()
            .with_role(Role::Visionary, "Tasks should organize themselves.")
            .with_role(Role::Layout, layout_payload()),
    );
    let result = pipeline(generator.clone(), tmp.path())
        .run("TaskFlow", "A task management application")
        .await;

    assert_eq!(result.status, RunStatus::Success, "{:?}", result.error);
    assert_eq!(result.project, "TaskFlow");
    let root = tmp.path().join("TaskFlow");
    assert_eq!(result.output_dir, root);

    for doc in TEXT_DOCS {
        assert!(root.join(doc).is_file(), "{doc} missing");
    }
    assert!(read(&root, "docs/vision.md").contains("Tasks should organize themselves."));
    assert!(root.join("project_history.md").is_file());
    assert!(root.join("docs/structure_analysis.md").is_file());
    assert!(root.join(MANIFEST_FILE).is_file());

    let readme = read(&root, "README.md");
    assert!(readme.starts_with("# TaskFlow\n\nA task management application\n"));
    assert!(readme.contains("(docs/vision.md)"));

    assert_eq!(
        generator.labels(),
        vec!["visionary", "strategist", "designer", "builder", "layout"]
    );
    for key in [
        "vision",
        "technical_strategy",
        "architecture",
        "implementation",
        "structure_manifest",
        "structure_analysis",
        "history",
        "readme",
    ] {
        assert!(result.artifacts.contains_key(key), "artifact {key} missing");
    }
    assert!(result.generated_files.contains(&"src/app.py".to_owned()));
    assert!(root.join("src/api/routes.py").is_file());
    assert!(root.join("src/README.md").is_file());

    let report = result.metrics.structure.as_ref().unwrap();
    assert_eq!(report.files, 5);
    assert!(result.metrics.code.is_none());
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert!(result.finished_at >= result.started_at);
}

#[tokio::test]
async fn earlier_output_reaches_later_roles() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(
        ScriptedGenerator::new()
            .with_role(Role::Visionary, "VISION-MARKER")
            .with_role(Role::Layout, single_file_layout()),
    );
    let result = pipeline(generator.clone(), tmp.path())
        .run("demo", "A demo")
        .await;
    assert!(result.is_success());

    let requests = generator.requests();
    assert!(!requests[0].prompt.contains("VISION-MARKER"));
    for later in &requests[1..] {
        assert!(
            later.prompt.contains("VISION-MARKER"),
            "{} prompt lacks the vision",
            later.label
        );
    }
    assert_eq!(requests[1].variables["vision"], "\nVISION-MARKER");
}

#[tokio::test]
async fn fenced_single_file_layout_is_materialized() {
    let tmp = TempDir::new().unwrap();
    let generator =
        Arc::new(ScriptedGenerator::new().with_role(Role::Layout, single_file_layout()));
    let result = pipeline(generator, tmp.path()).run("single", "One file").await;

    assert!(result.is_success());
    let root = tmp.path().join("single");
    let main = read(&root, "main.x");
    assert!(!main.trim().is_empty());
    assert!(main.contains("Purpose: d"));
    assert_eq!(result.generated_files, vec!["main.x".to_owned()]);

    let manifest = Manifest::load(&root).await.unwrap();
    assert_eq!(manifest.project, "single");
    assert_eq!(manifest.structure.files.0.len(), 1);
    assert_eq!(manifest.structure.files.0[0].0, "main.x");
}

#[tokio::test]
async fn rerun_overwrites_without_failures() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new().with_role(Role::Layout, layout_payload()));
    let p = pipeline(generator, tmp.path());

    let first = p.run("again", "Run twice").await;
    let second = p.run("again", "Run twice").await;
    assert!(first.is_success() && second.is_success());
    assert_eq!(first.generated_files, second.generated_files);
    assert_ne!(first.run_id, second.run_id);
    assert!(second.warnings.is_empty());
}

// ===========================================================================
// Degraded structure step
// ===========================================================================

#[tokio::test]
async fn garbage_layout_warns_and_still_succeeds() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new().with_role(Role::Layout, garbage_layout()));
    let result = pipeline(generator, tmp.path()).run("garbage", "Bad layout").await;

    assert_eq!(result.status, RunStatus::Success);
    assert!(result.has_warning(STRUCTURE_FAILED));
    let warning = &result.warnings[0];
    assert!(warning.message.starts_with("structure step failed: "));
    assert_eq!(warning.raw.as_deref(), Some(garbage_layout().as_str()));

    let root = tmp.path().join("garbage");
    assert!(!root.join(MANIFEST_FILE).exists());
    assert!(!root.join("docs/structure_analysis.md").exists());
    for doc in TEXT_DOCS {
        assert!(root.join(doc).is_file());
    }
    assert!(root.join("README.md").is_file());
    assert!(result.metrics.structure.is_none());
    assert!(result.generated_files.is_empty());
}

#[tokio::test]
async fn duplicate_names_are_reported() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new().with_role(Role::Layout, duplicate_layout()));
    let result = pipeline(generator, tmp.path()).run("dupes", "Duplicates").await;

    assert!(result.is_success());
    assert!(result.has_warning("duplicate name \"a.txt\""), "{:?}", result.warnings);
    assert_eq!(result.generated_files, vec!["a.txt".to_owned()]);
    let analysis = read(&tmp.path().join("dupes"), "docs/structure_analysis.md");
    assert!(analysis.contains("duplicate name"));
}

#[tokio::test]
async fn structure_step_can_be_disabled() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let result = pipeline(generator.clone(), tmp.path())
        .without_structure()
        .run("nolayout", "Docs only")
        .await;

    assert!(result.is_success());
    assert!(!generator.labels().contains(&"layout".to_owned()));
    assert!(!tmp.path().join("nolayout").join(MANIFEST_FILE).exists());
    assert!(!result.artifacts.contains_key("structure_manifest"));
}

#[tokio::test]
async fn layout_cannot_overwrite_stage_documents() {
    let tmp = TempDir::new().unwrap();
    let layout = r#"{
        "directories": {
            "docs": {
                "description": "Project documentation",
                "files": {
                    "architecture.md": {"description": "arch", "type": "documentation"},
                    "guide.md": {"description": "How to use it"}
                }
            }
        },
        "files": {
            "project_history.md": {},
            ".structure": {"type": "other"},
            "main.py": {"type": "module"}
        }
    }"#;
    let generator = Arc::new(
        ScriptedGenerator::new()
            .with_role(Role::Designer, "REAL-ARCHITECTURE-TEXT")
            .with_role(Role::Layout, layout)
            .with_response("codegen", "```\nbody\n```"),
    );
    let result = pipeline(generator.clone(), tmp.path())
        .with_code_synthesis()
        .run("reserved", "Layout collides with docs")
        .await;

    assert!(result.is_success(), "{:?}", result.error);
    let root = tmp.path().join("reserved");
    assert!(read(&root, "docs/architecture.md").contains("REAL-ARCHITECTURE-TEXT"));
    assert!(read(&root, "project_history.md").contains("REAL-ARCHITECTURE-TEXT"));
    assert!(Manifest::load(&root).await.is_ok());
    assert!(root.join("docs/guide.md").is_file());
    assert!(root.join("main.py").is_file());

    for path in ["docs/architecture.md", "project_history.md", ".structure"] {
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.message.contains(path) && w.message.contains("reserved")),
            "no warning for {path}: {:?}",
            result.warnings
        );
        assert!(!result.generated_files.iter().any(|f| f == path), "{path}");
    }
    let codegen_calls = generator.labels().iter().filter(|l| *l == "codegen").count();
    assert_eq!(codegen_calls, 2);
}

// ===========================================================================
// Code synthesis
// ===========================================================================

#[tokio::test]
async fn code_synthesis_replaces_stubs() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(
        ScriptedGenerator::new()
            .with_role(Role::Layout, layout_payload())
            .with_response("codegen", "```\nprint('generated')\n```"),
    );
    let result = pipeline(generator.clone(), tmp.path())
        .with_code_synthesis()
        .run("coded", "With code")
        .await;

    assert!(result.is_success(), "{:?}", result.error);
    let root = tmp.path().join("coded");
    assert!(read(&root, "src/app.py").contains("print('generated')"));
    assert!(root.join("docs/code_analysis.md").is_file());

    let code = result.metrics.code.as_ref().unwrap();
    assert_eq!(code.files, 5);
    let codegen_calls = generator.labels().iter().filter(|l| *l == "codegen").count();
    assert_eq!(codegen_calls, 5);
}

#[tokio::test]
async fn code_synthesis_failure_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let generator =
        Arc::new(FailingGenerator::on("codegen").with_response("layout", single_file_layout()));
    let result = pipeline(generator, tmp.path())
        .with_code_synthesis()
        .run("codefail", "Codegen breaks")
        .await;

    assert_eq!(result.status, RunStatus::Error);
    let error = result.error.as_ref().unwrap();
    assert!(error.message.starts_with("code_synthesis stage failed"));
    assert_eq!(error.raw.as_deref(), Some("scripted failure for codegen"));
    // Materialized stubs and the manifest stay behind.
    assert!(tmp.path().join("codefail/main.x").is_file());
    assert!(tmp.path().join("codefail").join(MANIFEST_FILE).is_file());
}

// ===========================================================================
// Failures and cancellation
// ===========================================================================

#[tokio::test]
async fn generator_failure_keeps_earlier_documents() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(FailingGenerator::on_role(Role::Designer));
    let result = pipeline(generator.clone(), tmp.path())
        .run("broken", "Designer fails")
        .await;

    assert_eq!(result.status, RunStatus::Error);
    let message = &result.error.as_ref().unwrap().message;
    assert!(message.starts_with("designer stage failed"), "{message}");

    let root = tmp.path().join("broken");
    assert!(root.join("docs/vision.md").is_file());
    assert!(root.join("docs/technical_strategy.md").is_file());
    assert!(!root.join("docs/architecture.md").exists());
    assert!(!root.join("README.md").exists());
    assert_eq!(generator.labels(), vec!["visionary", "strategist", "designer"]);
    assert!(!result.artifacts.contains_key("architecture"));
}

#[tokio::test]
async fn invalid_project_name_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let result = pipeline(generator.clone(), tmp.path()).run("..", "Nope").await;

    assert_eq!(result.status, RunStatus::Error);
    assert!(result.error.unwrap().message.starts_with("invalid project name"));
    assert!(generator.labels().is_empty());
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn cancelled_token_stops_before_first_stage() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = pipeline(generator.clone(), tmp.path())
        .run_with_cancel("stopped", "Never runs", cancel)
        .await;

    assert_eq!(result.status, RunStatus::Error);
    assert_eq!(result.error.unwrap().message, "cancelled before visionary");
    assert!(generator.labels().is_empty());
}

/// Cancels the token while answering a chosen role.
struct CancelDuring {
    label: String,
    cancel: CancellationToken,
}

#[async_trait]
impl Generator for CancelDuring {
    fn name(&self) -> &str {
        "cancel-during"
    }

    async fn invoke(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        if request.label == self.label {
            self.cancel.cancel();
        }
        Ok(format!("{} text", request.label))
    }
}

#[tokio::test]
async fn cancellation_mid_run_keeps_finished_stages() {
    let tmp = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let generator = Arc::new(CancelDuring {
        label: "strategist".into(),
        cancel: cancel.clone(),
    });

    let result = pipeline(generator, tmp.path())
        .run_with_cancel("halfway", "Stops after strategy", cancel)
        .await;

    assert_eq!(result.error.unwrap().message, "cancelled before designer");
    let root = tmp.path().join("halfway");
    assert!(root.join("docs/technical_strategy.md").is_file());
    assert!(!root.join("docs/architecture.md").exists());
    assert_eq!(result.metrics.stages.len(), 2);
}

#[tokio::test]
async fn result_serializes_for_the_cli() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new().with_role(Role::Layout, garbage_layout()));
    let result = pipeline(generator, tmp.path()).run("json", "Serialize me").await;

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(value["project"], "json");
    assert!(value["run_id"].is_string());
    assert!(value.get("error").is_none());
    assert_eq!(value["warnings"][0]["raw"], garbage_layout());
}
