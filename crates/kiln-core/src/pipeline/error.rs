use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use kiln_store::Role;

use crate::generator::GenerateError;

/// A checkpoint in a pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Visionary,
    Strategist,
    Designer,
    Builder,
    Layout,
    Materialize,
    CodeSynthesis,
    Summary,
}

impl Stage {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Visionary => Self::Visionary,
            Role::Strategist => Self::Strategist,
            Role::Designer => Self::Designer,
            Role::Builder => Self::Builder,
            Role::Layout => Self::Layout,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visionary => "visionary",
            Self::Strategist => "strategist",
            Self::Designer => "designer",
            Self::Builder => "builder",
            Self::Layout => "layout",
            Self::Materialize => "materialize",
            Self::CodeSynthesis => "code_synthesis",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that end a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    Generate {
        stage: Stage,
        #[source]
        source: GenerateError,
    },

    #[error("invalid project name {name:?}: {reason}")]
    InvalidProjectName { name: String, reason: String },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cancelled before {stage}")]
    Cancelled { stage: Stage },
}

impl PipelineError {
    /// Raw generator output worth keeping alongside the message.
    pub fn raw(&self) -> Option<String> {
        match self {
            Self::Generate {
                source: GenerateError::Failed { stderr, .. },
                ..
            } if !stderr.trim().is_empty() => Some(stderr.clone()),
            _ => None,
        }
    }
}
