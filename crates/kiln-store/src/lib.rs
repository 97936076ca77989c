//! Persisted data model and template store for kiln.
//!
//! - [`models`]: roles, parameter enums, and the stored template record.
//! - [`config`]: where the file-backed store lives on disk.
//! - [`store`]: the [`store::TemplateStore`] collaborator and its
//!   file-backed and in-memory implementations.

pub mod config;
pub mod models;
pub mod store;

pub use config::StoreConfig;
pub use models::{DetailLevel, Elimination, Intensity, Role, RoleParameters, TemplateRecord};
pub use store::{FileTemplateStore, MemoryTemplateStore, StoreError, TemplateStore};
