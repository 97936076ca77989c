//! Shared test utilities for kiln integration tests.
//!
//! Provides scripted generators that stand in for a real model backend,
//! canned layout payloads, and a helper that wires a pipeline to an
//! in-memory template registry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use kiln_core::generator::{GenerateError, GenerationRequest, Generator};
use kiln_core::pipeline::{Pipeline, PipelineConfig};
use kiln_core::processor::RoleProcessor;
use kiln_core::template::TemplateRegistry;
use kiln_store::Role;

/// A generator that answers from a script keyed by request label.
///
/// Labels without a scripted response get `"Generated <label> output."`.
/// Every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: HashMap<String, String>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response for `label` (a role name or `codegen`).
    pub fn with_response(mut self, label: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses.insert(label.into(), response.into());
        self
    }

    pub fn with_role(self, role: Role, response: impl Into<String>) -> Self {
        self.with_response(role.to_string(), response)
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Labels of every request received so far, in order.
    pub fn labels(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.label).collect()
    }

    fn respond(&self, request: &GenerationRequest) -> String {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .get(&request.label)
            .cloned()
            .unwrap_or_else(|| format!("Generated {} output.", request.label))
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        Ok(self.respond(request))
    }
}

/// A scripted generator that fails every request with a given label.
#[derive(Debug)]
pub struct FailingGenerator {
    inner: ScriptedGenerator,
    fail_on: String,
}

impl FailingGenerator {
    pub fn on(label: impl Into<String>) -> Self {
        Self {
            inner: ScriptedGenerator::new(),
            fail_on: label.into(),
        }
    }

    pub fn on_role(role: Role) -> Self {
        Self::on(role.to_string())
    }

    pub fn with_response(mut self, label: impl Into<String>, response: impl Into<String>) -> Self {
        self.inner = self.inner.with_response(label, response);
        self
    }

    pub fn labels(&self) -> Vec<String> {
        self.inner.labels()
    }
}

#[async_trait]
impl Generator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn invoke(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        if request.label == self.fail_on {
            self.inner.requests.lock().unwrap().push(request.clone());
            return Err(GenerateError::Failed {
                generator: "failing".to_owned(),
                status: Some(1),
                stderr: format!("scripted failure for {}", request.label),
            });
        }
        Ok(self.inner.respond(request))
    }
}

/// A pipeline over `generator` with built-in templates, writing under
/// `projects_root`.
pub fn pipeline(generator: Arc<dyn Generator>, projects_root: &Path) -> Pipeline {
    let processor = RoleProcessor::new(generator, Arc::new(TemplateRegistry::in_memory()));
    Pipeline::new(
        processor,
        PipelineConfig {
            projects_root: projects_root.to_path_buf(),
        },
    )
}

// ---------------------------------------------------------------------------
// Layout fixtures
// ---------------------------------------------------------------------------

/// A small, well-formed layout wrapped in prose and a json fence.
pub fn layout_payload() -> String {
    r#"Here is the proposed layout.

```json
{
  "directories": {
    "src": {
      "description": "Application source",
      "directories": {
        "api": {
          "description": "HTTP handlers",
          "files": {
            "routes.py": {"description": "Route table", "type": "module", "content_template": "Flask routes"}
          }
        }
      },
      "files": {
        "app.py": {"description": "Entry point", "type": "python_module", "content_template": "Create the app"}
      }
    },
    "tests": {
      "description": "Test suite",
      "files": {
        "test_app.py": {"description": "App tests", "type": "test"}
      }
    }
  },
  "files": {
    "README.md": {"description": "Overview", "type": "documentation"},
    "config.json": {"description": "Settings", "type": "config"}
  }
}
```

Let me know if you want changes."#
        .to_owned()
}

/// One root file, `main.x`, in a json fence surrounded by commentary.
pub fn single_file_layout() -> String {
    r#"Some commentary ```json {"directories": {}, "files": {"main.x": {"description": "d", "type": "other"}}} ``` trailing notes"#
        .to_owned()
}

/// Text with no decodable layout in it.
pub fn garbage_layout() -> String {
    "I could not decide on a layout {not json at all".to_owned()
}

/// A layout that declares `a.txt` twice at the root.
pub fn duplicate_layout() -> String {
    r#"{"files": {"a.txt": {"type": "other"}, "a.txt": {"description": "again"}}}"#.to_owned()
}
