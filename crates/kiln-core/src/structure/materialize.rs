//! Turn a parsed layout into directories and files on disk.
//!
//! Materialization is idempotent: directories are created with
//! `create_dir_all`, and every file write is a full overwrite. A failed
//! entry is logged, recorded in the manifest, and skipped; it never aborts
//! its siblings.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::content::{sidecar, stub_artifact};
use super::types::{StructureNode, StructureTree};
use super::wire::WireStructure;

/// Name of the manifest written at the project root.
pub const MANIFEST_FILE: &str = ".structure";

/// Name of the purpose sidecar written into each described directory.
pub const SIDECAR_FILE: &str = "README.md";

/// Identifies the run a manifest belongs to.
#[derive(Debug, Clone)]
pub struct MaterializeMeta {
    pub project: String,
    pub generated_at: DateTime<Utc>,
}

impl MaterializeMeta {
    pub fn now(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Directory,
    File,
    Sidecar,
    Manifest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    Written,
    Failed { error: String },
}

/// Outcome for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// `/`-joined path relative to the project root.
    pub path: String,
    pub kind: EntryKind,
    #[serde(flatten)]
    pub status: EntryStatus,
}

impl ManifestEntry {
    pub fn is_written(&self) -> bool {
        self.status == EntryStatus::Written
    }
}

/// The serialized tree plus per-entry outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub project: String,
    pub generated_at: DateTime<Utc>,
    /// SHA-256 of the tree's canonical JSON.
    pub fingerprint: String,
    pub structure: WireStructure,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Paths that were written successfully.
    pub fn created_paths(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.is_written())
            .map(|e| e.path.as_str())
            .collect()
    }

    /// Files from the tree that were written successfully.
    pub fn created_files(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::File && e.is_written())
            .map(|e| e.path.as_str())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|e| match &e.status {
            EntryStatus::Failed { error } => Some((e.path.as_str(), error.as_str())),
            EntryStatus::Written => None,
        })
    }

    /// Read a manifest previously written under `root`.
    pub async fn load(root: &Path) -> std::io::Result<Self> {
        let raw = tokio::fs::read_to_string(root.join(MANIFEST_FILE)).await?;
        serde_json::from_str(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// SHA-256 of the tree's compact wire JSON, hex encoded.
pub fn fingerprint(tree: &StructureTree) -> String {
    let canonical = serde_json::to_vec(&tree.to_wire()).unwrap_or_default();
    hex::encode(Sha256::digest(&canonical))
}

fn to_fs_path(root: &Path, rel: &str) -> PathBuf {
    rel.split('/').fold(root.to_path_buf(), |p, part| p.join(part))
}

struct Recorder {
    entries: Vec<ManifestEntry>,
}

impl Recorder {
    fn record(&mut self, path: &str, kind: EntryKind, result: std::io::Result<()>) -> bool {
        let status = match result {
            Ok(()) => EntryStatus::Written,
            Err(e) => {
                tracing::warn!(path, ?kind, error = %e, "failed to materialize entry");
                EntryStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        let ok = status == EntryStatus::Written;
        self.entries.push(ManifestEntry {
            path: path.to_owned(),
            kind,
            status,
        });
        ok
    }
}

async fn write_file(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await
}

/// Create `tree` under `root` and write the `.structure` manifest.
///
/// The returned manifest lists every attempted entry, including the
/// manifest itself.
pub async fn materialize(root: &Path, tree: &StructureTree, meta: &MaterializeMeta) -> Manifest {
    let mut rec = Recorder {
        entries: Vec::new(),
    };

    if let Err(e) = tokio::fs::create_dir_all(root).await {
        tracing::error!(root = %root.display(), error = %e, "cannot create project root");
    }

    // Iterative pre-order walk; a directory that fails to create prunes
    // its subtree.
    let mut stack: Vec<(String, &StructureNode)> = tree
        .roots
        .iter()
        .rev()
        .map(|n| (n.name().to_owned(), n))
        .collect();

    while let Some((rel, node)) = stack.pop() {
        let fs_path = to_fs_path(root, &rel);
        match node {
            StructureNode::Directory(dir) => {
                let created = tokio::fs::create_dir_all(&fs_path).await;
                if !rec.record(&rel, EntryKind::Directory, created) {
                    continue;
                }

                let has_readme = dir.children.iter().any(|c| c.name() == SIDECAR_FILE);
                if let (Some(purpose), false) = (dir.purpose.as_deref(), has_readme) {
                    let sidecar_rel = format!("{rel}/{SIDECAR_FILE}");
                    let result =
                        tokio::fs::write(fs_path.join(SIDECAR_FILE), sidecar(&dir.name, purpose))
                            .await;
                    rec.record(&sidecar_rel, EntryKind::Sidecar, result);
                }

                for child in dir.children.iter().rev() {
                    stack.push((format!("{rel}/{}", child.name()), child));
                }
            }
            StructureNode::File(file) => {
                let artifact = stub_artifact(&rel, file);
                let result = write_file(&fs_path, &artifact.content).await;
                rec.record(&rel, EntryKind::File, result);
            }
        }
    }

    let mut manifest = Manifest {
        project: meta.project.clone(),
        generated_at: meta.generated_at,
        fingerprint: fingerprint(tree),
        structure: tree.to_wire(),
        entries: rec.entries,
    };

    let manifest_result = match serde_json::to_string_pretty(&manifest) {
        Ok(json) => tokio::fs::write(root.join(MANIFEST_FILE), json).await,
        Err(e) => Err(std::io::Error::other(e)),
    };
    let mut rec = Recorder {
        entries: std::mem::take(&mut manifest.entries),
    };
    rec.record(MANIFEST_FILE, EntryKind::Manifest, manifest_result);
    manifest.entries = rec.entries;

    let failed = manifest.failures().count();
    tracing::info!(
        root = %root.display(),
        entries = manifest.entries.len(),
        failed,
        "materialized structure"
    );
    manifest
}
