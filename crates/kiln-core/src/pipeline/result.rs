use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::error::Stage;
use crate::analyze::{CodeReport, StructureReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Error,
}

/// A non-fatal problem encountered during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineWarning {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Why a run ended with [`RunStatus::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineFailure {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunMetrics {
    /// Stages that finished, in order.
    pub stages: Vec<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<StructureReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeReport>,
}

/// Everything one pipeline invocation produced. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub project: String,
    pub output_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Artifact kind to path relative to `output_dir`.
    pub artifacts: BTreeMap<String, String>,
    pub generated_files: Vec<String>,
    pub metrics: RunMetrics,
    pub warnings: Vec<PipelineWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PipelineFailure>,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Absolute path of a recorded artifact.
    pub fn artifact_path(&self, key: &str) -> Option<PathBuf> {
        self.artifacts.get(key).map(|rel| self.output_dir.join(rel))
    }

    pub fn has_warning(&self, prefix: &str) -> bool {
        self.warnings.iter().any(|w| w.message.starts_with(prefix))
    }
}
