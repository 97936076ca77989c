use std::time::Duration;

use crate::template::Bindings;

/// One call to a generative text service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Short label for logs and errors (usually the role name).
    pub label: String,
    /// The unrendered template the prompt was built from.
    pub template: String,
    /// The fully rendered prompt. Contains no unresolved placeholders.
    pub prompt: String,
    /// Every value the template was rendered with.
    pub variables: Bindings,
}

impl GenerationRequest {
    /// A request whose prompt is used verbatim, with no template.
    pub fn raw(label: impl Into<String>, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        Self {
            label: label.into(),
            template: prompt.clone(),
            prompt,
            variables: Bindings::new(),
        }
    }
}

/// Failures at the generative-service boundary.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("generator {generator:?} is unavailable: {reason}")]
    Unavailable { generator: String, reason: String },

    #[error("generator {generator:?} timed out after {}s", after.as_secs())]
    Timeout { generator: String, after: Duration },

    #[error("generator {generator:?} exited with {}: {stderr}", status.map_or_else(|| "a signal".to_owned(), |c| format!("status {c}")))]
    Failed {
        generator: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("generator {generator:?} returned a malformed response: {reason}")]
    Malformed { generator: String, reason: String },

    #[error("generator returned no usable text for {label}")]
    EmptyResponse { label: String },

    #[error("I/O error talking to generator {generator:?}: {source}")]
    Io {
        generator: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_request_uses_prompt_as_template() {
        let req = GenerationRequest::raw("codegen", "write main.rs");
        assert_eq!(req.template, req.prompt);
        assert!(req.variables.is_empty());
    }

    #[test]
    fn failed_message_mentions_status() {
        let err = GenerateError::Failed {
            generator: "ollama".into(),
            status: Some(2),
            stderr: "model not found".into(),
        };
        assert_eq!(
            err.to_string(),
            "generator \"ollama\" exited with status 2: model not found"
        );

        let err = GenerateError::Failed {
            generator: "x".into(),
            status: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("a signal"));
    }

    #[test]
    fn timeout_message_in_seconds() {
        let err = GenerateError::Timeout {
            generator: "claude".into(),
            after: Duration::from_secs(90),
        };
        assert!(err.to_string().ends_with("after 90s"));
    }
}
