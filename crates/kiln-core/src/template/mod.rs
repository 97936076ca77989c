//! Prompt templates: the named-slot template format, the built-in
//! per-role defaults, and the registry that layers persisted overrides
//! over those defaults.

pub mod defaults;
pub mod prompt;
pub mod registry;

pub use defaults::{default_parameters, default_template, recognized_placeholders};
pub use prompt::{Bindings, PromptTemplate};
pub use registry::{RoleTemplate, TemplateRegistry, TemplateSource, TemplateWarning, validate};
