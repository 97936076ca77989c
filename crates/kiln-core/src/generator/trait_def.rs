//! The `Generator` trait -- the adapter interface for generative text
//! services.
//!
//! The pipeline treats the service as a black box: given a rendered
//! prompt, it returns one text blob or a distinct failure. The trait is
//! object-safe so adapters can be shared as `Arc<dyn Generator>`.

use async_trait::async_trait;

use super::types::{GenerateError, GenerationRequest};

/// Adapter interface for a generative text service.
///
/// Implementations must not retry internally unless that is part of the
/// service contract; callers do not retry either.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable name for this generator (e.g. "ollama").
    fn name(&self) -> &str;

    /// Run one generation and return the raw response text.
    async fn invoke(&self, request: &GenerationRequest) -> Result<String, GenerateError>;
}

// Compile-time assertion: Generator must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Generator) {}
};
