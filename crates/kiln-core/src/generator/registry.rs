//! Generator registry -- a named collection of available generator adapters.
//!
//! The CLI registers the configured backends here and looks one up by the
//! name given on the command line or in the config file.

use std::collections::HashMap;
use std::sync::Arc;

use super::trait_def::Generator;

/// A collection of registered [`Generator`] implementations, keyed by name.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: HashMap<String, Arc<dyn Generator>>,
}

impl GeneratorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator under the name returned by [`Generator::name`].
    ///
    /// Replaces and returns any generator already registered under that name.
    pub fn register(&mut self, generator: impl Generator + 'static) -> Option<Arc<dyn Generator>> {
        self.register_arc(Arc::new(generator))
    }

    /// Register an already shared generator.
    pub fn register_arc(&mut self, generator: Arc<dyn Generator>) -> Option<Arc<dyn Generator>> {
        let name = generator.name().to_string();
        self.generators.insert(name, generator)
    }

    /// Look up a generator by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Generator>> {
        self.generators.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.generators.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("generators", &self.list())
            .finish()
    }
}
