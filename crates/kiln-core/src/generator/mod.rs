//! Generative text service interface.
//!
//! ```text
//! RoleProcessor / CodeSynthesizer
//!     |
//!     v
//! GenerationRequest { label, template, prompt, variables }
//!     |
//!     v
//! &dyn Generator --invoke--> Result<String, GenerateError>
//!     |
//!     +-- CommandGenerator (ollama / claude / custom command)
//! ```

pub mod command;
pub mod registry;
pub mod trait_def;
pub mod types;

pub use command::CommandGenerator;
pub use registry::GeneratorRegistry;
pub use trait_def::Generator;
pub use types::{GenerateError, GenerationRequest};
