//! `kiln materialize` command: rebuild a project tree from its manifest.

use std::path::Path;

use anyhow::{Context, Result, bail};

use kiln_core::structure::{MANIFEST_FILE, Manifest, MaterializeMeta, StructureParser, materialize};

/// Re-create every directory, stub, and sidecar recorded in
/// `<project_dir>/.structure`. Existing files are overwritten.
pub async fn run_materialize(project_dir: &Path, max_depth: usize) -> Result<()> {
    let previous = Manifest::load(project_dir).await.with_context(|| {
        format!(
            "failed to read {} in {}",
            MANIFEST_FILE,
            project_dir.display()
        )
    })?;

    let parsed = StructureParser::new(max_depth)
        .build(&previous.structure)
        .context("manifest holds an invalid structure")?;
    for warning in &parsed.warnings {
        eprintln!("warning: {warning}");
    }

    let manifest = materialize(
        project_dir,
        &parsed.tree,
        &MaterializeMeta::now(previous.project.clone()),
    )
    .await;

    if manifest.fingerprint != previous.fingerprint {
        tracing::warn!(
            previous = %previous.fingerprint,
            current = %manifest.fingerprint,
            "structure fingerprint changed"
        );
    }

    let failures: Vec<_> = manifest.failures().collect();
    for (path, error) in &failures {
        eprintln!("failed: {path}: {error}");
    }
    println!(
        "Materialized {} paths for {} in {}",
        manifest.created_paths().len(),
        manifest.project,
        project_dir.display()
    );
    if !failures.is_empty() {
        bail!("{} paths could not be written", failures.len());
    }
    Ok(())
}
