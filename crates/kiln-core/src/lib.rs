pub mod analyze;
pub mod codegen;
pub mod context;
pub mod docs;
pub mod generator;
pub mod pipeline;
pub mod processor;
pub mod structure;
pub mod template;

pub use kiln_store::{Role, RoleParameters};

pub use analyze::{CodeReport, StructureReport, analyze_code, analyze_structure};
pub use codegen::CodeSynthesizer;
pub use context::ProjectContext;
pub use generator::{CommandGenerator, GenerateError, GenerationRequest, Generator, GeneratorRegistry};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, PipelineResult, RunStatus};
pub use processor::RoleProcessor;
pub use template::TemplateRegistry;
