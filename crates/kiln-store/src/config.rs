use std::env;
use std::path::PathBuf;

/// Template store configuration.
///
/// Reads from the `KILN_TEMPLATES_DIR` environment variable, falling back to
/// `config/templates` (relative to the working directory) when unset.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding `<role>_template.json` override files.
    pub templates_dir: PathBuf,
}

impl StoreConfig {
    /// The default templates directory used when no environment variable is set.
    pub const DEFAULT_DIR: &str = "config/templates";

    /// Environment variable that overrides the templates directory.
    pub const ENV_VAR: &str = "KILN_TEMPLATES_DIR";

    /// Build a config from the environment.
    ///
    /// Priority: `KILN_TEMPLATES_DIR` env var, then the compile-time default.
    pub fn from_env() -> Self {
        let templates_dir = env::var(Self::ENV_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| Self::DEFAULT_DIR.to_owned());
        Self::new(templates_dir)
    }

    /// Build a config from an explicit directory (useful for tests and CLI flags).
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
        }
    }

    /// Path of the override file stored under `key`.
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.templates_dir.join(format!("{key}.json"))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
