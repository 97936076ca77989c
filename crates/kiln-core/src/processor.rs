//! Role processor: binds a role's template, parameters, and the shared
//! context into one generation request, then extracts the response text.
//!
//! The processor never mutates the [`ProjectContext`] and never retries.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use kiln_store::{Role, RoleParameters};

use crate::context::ProjectContext;
use crate::generator::{GenerateError, GenerationRequest, Generator};
use crate::template::{Bindings, TemplateRegistry};

static THINK_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<think(?:ing)?>.*?</think(?:ing)?>").expect("static regex is valid")
});

/// Render a list as markdown bullets, one per line.
fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bindings derived from a role's parameters.
pub fn parameter_bindings(params: &RoleParameters) -> Bindings {
    let mut b = Bindings::new();
    b.insert("focus_areas".into(), bullets(&params.focus_areas));
    b.insert("considerations".into(), bullets(&params.considerations));
    b.insert("intensity".into(), params.intensity.to_string());
    b.insert("elimination".into(), params.elimination.to_string());
    b.insert("detail_level".into(), params.detail_level.to_string());
    b.insert(
        "detail_instruction".into(),
        params.detail_level.instruction().to_owned(),
    );
    b
}

/// Strip reasoning blocks and surrounding whitespace from a raw response.
pub fn extract_text(raw: &str) -> String {
    THINK_BLOCK.replace_all(raw, "").trim().to_owned()
}

/// Builds and runs one generation per role.
#[derive(Clone)]
pub struct RoleProcessor {
    generator: Arc<dyn Generator>,
    templates: Arc<TemplateRegistry>,
}

impl RoleProcessor {
    pub fn new(generator: Arc<dyn Generator>, templates: Arc<TemplateRegistry>) -> Self {
        Self {
            generator,
            templates,
        }
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    pub fn templates(&self) -> &Arc<TemplateRegistry> {
        &self.templates
    }

    /// Assemble the request for `role` without sending it.
    ///
    /// Bindings are layered, later layers winning: the context snapshot,
    /// the role's parameters, `previous` and `task`, then `extra`. Every
    /// placeholder left unbound is bound to the empty string, so the
    /// rendered prompt never contains an unresolved slot.
    pub fn build_request(
        &self,
        role: Role,
        task: &str,
        context: &ProjectContext,
        extra: &Bindings,
    ) -> GenerationRequest {
        let resolved = self.templates.get(role);
        let template = resolved.prompt();

        let mut variables = context.snapshot();
        variables.extend(parameter_bindings(&resolved.parameters));
        variables.insert("previous".into(), context.slot(role).to_owned());
        variables.insert("task".into(), task.to_owned());
        variables.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        for name in template.missing(&variables) {
            tracing::debug!(role = %role, placeholder = name, "binding unresolved placeholder to empty");
            variables.insert(name.to_owned(), String::new());
        }

        GenerationRequest {
            label: role.to_string(),
            prompt: template.render(&variables),
            template: resolved.template,
            variables,
        }
    }

    /// Run `role` once and return its extracted text.
    pub async fn process(
        &self,
        role: Role,
        task: &str,
        context: &ProjectContext,
        extra: &Bindings,
    ) -> Result<String, GenerateError> {
        let request = self.build_request(role, task, context, extra);
        tracing::info!(role = %role, generator = self.generator.name(), "processing role");

        let raw = self.generator.invoke(&request).await?;
        let text = extract_text(&raw);
        if text.is_empty() {
            return Err(GenerateError::EmptyResponse {
                label: request.label,
            });
        }

        tracing::debug!(role = %role, chars = text.len(), "role produced text");
        Ok(text)
    }
}

impl std::fmt::Debug for RoleProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleProcessor")
            .field("generator", &self.generator.name())
            .field("templates", &self.templates)
            .finish()
    }
}
