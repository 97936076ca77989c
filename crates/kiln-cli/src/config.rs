//! Configuration file management for kiln.
//!
//! Provides a TOML-based config file at `~/.config/kiln/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use kiln_core::generator::{CommandGenerator, Generator, GeneratorRegistry};
use kiln_core::structure::DEFAULT_MAX_DEPTH;
use kiln_store::StoreConfig;

pub const DEFAULT_BACKEND: &str = "ollama";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";
pub const DEFAULT_PROJECTS_DIR: &str = "projects";

pub const ENV_BACKEND: &str = "KILN_BACKEND";
pub const ENV_MODEL: &str = "KILN_MODEL";
pub const ENV_PROJECTS_DIR: &str = "KILN_PROJECTS_DIR";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub generator: GeneratorSection,
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    /// `ollama`, `claude`, or `command`.
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Program run by the `command` backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_owned(),
            model: None,
            command: None,
            args: Vec::new(),
            timeout_secs: CommandGenerator::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub projects_dir: PathBuf,
    pub templates_dir: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            projects_dir: PathBuf::from(DEFAULT_PROJECTS_DIR),
            templates_dir: PathBuf::from(StoreConfig::DEFAULT_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub max_depth: usize,
    /// Run the layout role and materialize its tree.
    pub structure: bool,
    /// Replace materialized stubs with generated contents.
    pub synthesize_code: bool,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            structure: true,
            synthesize_code: true,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the kiln config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/kiln` or `~/.config/kiln`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("kiln");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("kiln")
}

/// Return the path to the kiln config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub backend: Option<String>,
    pub model: Option<String>,
    pub projects_dir: Option<PathBuf>,
    pub templates_dir: Option<PathBuf>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone)]
pub struct KilnConfig {
    pub generator: GeneratorSection,
    pub projects_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub pipeline: PipelineSection,
}

impl KilnConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// A missing config file means defaults. A config file that exists but
    /// cannot be parsed is an error.
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let file = if config_path().exists() {
            load_config()?
        } else {
            ConfigFile::default()
        };
        Ok(Self::resolve_with(cli, file))
    }

    /// Resolve against an already loaded config file.
    pub fn resolve_with(cli: &CliOverrides, file: ConfigFile) -> Self {
        let mut generator = file.generator;
        if let Some(backend) = cli.backend.clone().or_else(|| env_var(ENV_BACKEND)) {
            generator.backend = backend;
        }
        if let Some(model) = cli.model.clone().or_else(|| env_var(ENV_MODEL)) {
            generator.model = Some(model);
        }

        let projects_dir = cli
            .projects_dir
            .clone()
            .or_else(|| env_var(ENV_PROJECTS_DIR).map(PathBuf::from))
            .unwrap_or(file.paths.projects_dir);
        let templates_dir = cli
            .templates_dir
            .clone()
            .or_else(|| env_var(StoreConfig::ENV_VAR).map(PathBuf::from))
            .unwrap_or(file.paths.templates_dir);

        Self {
            generator,
            projects_dir,
            templates_dir,
            pipeline: file.pipeline,
        }
    }

    /// Every backend that can be built from this configuration.
    pub fn generator_registry(&self) -> GeneratorRegistry {
        let g = &self.generator;
        let timeout = Duration::from_secs(g.timeout_secs.max(1));
        let mut registry = GeneratorRegistry::new();

        registry.register(
            CommandGenerator::ollama(g.model.as_deref().unwrap_or(DEFAULT_OLLAMA_MODEL))
                .with_timeout(timeout),
        );
        registry.register(CommandGenerator::claude(g.model.as_deref()).with_timeout(timeout));
        if let Some(program) = &g.command {
            registry.register(
                CommandGenerator::new("command", program.as_str())
                    .with_args(g.args.iter().cloned())
                    .with_timeout(timeout),
            );
        }
        registry
    }

    /// The generator selected by `generator.backend`.
    pub fn build_generator(&self) -> Result<Arc<dyn Generator>> {
        let backend = self.generator.backend.as_str();
        let registry = self.generator_registry();
        if let Some(generator) = registry.get(backend) {
            tracing::debug!(backend, "selected generator backend");
            return Ok(generator);
        }
        if backend == "command" {
            bail!(
                "the \"command\" backend needs a program; set [generator] command in {}",
                config_path().display()
            );
        }
        bail!(
            "unknown generator backend {backend:?}; available: {}",
            registry.list().join(", ")
        );
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    fn clear_env() {
        for var in [ENV_BACKEND, ENV_MODEL, ENV_PROJECTS_DIR, StoreConfig::ENV_VAR] {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn defaults_when_nothing_set() {
        let _lock = lock_env();
        clear_env();

        let config = KilnConfig::resolve_with(&CliOverrides::default(), ConfigFile::default());
        assert_eq!(config.generator.backend, DEFAULT_BACKEND);
        assert_eq!(config.projects_dir, PathBuf::from("projects"));
        assert_eq!(config.templates_dir, PathBuf::from("config/templates"));
        assert_eq!(config.pipeline.max_depth, DEFAULT_MAX_DEPTH);
        assert!(config.pipeline.structure);
    }

    #[test]
    fn cli_flag_overrides_env_and_file() {
        let _lock = lock_env();
        clear_env();
        unsafe { std::env::set_var(ENV_BACKEND, "claude") };

        let mut file = ConfigFile::default();
        file.generator.backend = "command".into();
        let cli = CliOverrides {
            backend: Some("ollama".into()),
            ..CliOverrides::default()
        };
        let config = KilnConfig::resolve_with(&cli, file);
        assert_eq!(config.generator.backend, "ollama");

        clear_env();
    }

    #[test]
    fn env_var_overrides_config_file() {
        let _lock = lock_env();
        clear_env();
        unsafe { std::env::set_var(ENV_PROJECTS_DIR, "/tmp/kiln-env-projects") };
        unsafe { std::env::set_var(ENV_MODEL, "mistral") };

        let mut file = ConfigFile::default();
        file.paths.projects_dir = PathBuf::from("/from/file");
        file.generator.model = Some("from-file".into());
        let config = KilnConfig::resolve_with(&CliOverrides::default(), file);
        assert_eq!(config.projects_dir, PathBuf::from("/tmp/kiln-env-projects"));
        assert_eq!(config.generator.model.as_deref(), Some("mistral"));

        clear_env();
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            [generator]
            backend = "claude"

            [pipeline]
            synthesize_code = false
            "#,
        )
        .unwrap();
        assert_eq!(file.generator.backend, "claude");
        assert_eq!(file.generator.timeout_secs, 600);
        assert!(!file.pipeline.synthesize_code);
        assert!(file.pipeline.structure);
        assert_eq!(file.paths, PathsSection::default());
    }

    #[test]
    fn config_file_roundtrips_through_toml() {
        let mut original = ConfigFile::default();
        original.generator.backend = "command".into();
        original.generator.command = Some("./fake-model.sh".into());
        original.generator.args = vec!["--fast".into()];

        let text = toml::to_string_pretty(&original).unwrap();
        let loaded: ConfigFile = toml::from_str(&text).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn registry_has_presets() {
        let _lock = lock_env();
        clear_env();

        let config = KilnConfig::resolve_with(&CliOverrides::default(), ConfigFile::default());
        assert_eq!(config.generator_registry().list(), vec!["claude", "ollama"]);
        assert_eq!(config.build_generator().unwrap().name(), "ollama");
    }

    #[test]
    fn command_backend_requires_a_program() {
        let mut file = ConfigFile::default();
        file.generator.backend = "command".into();
        let config = KilnConfig {
            generator: file.generator.clone(),
            projects_dir: file.paths.projects_dir.clone(),
            templates_dir: file.paths.templates_dir.clone(),
            pipeline: file.pipeline.clone(),
        };
        let err = config.build_generator().err().expect("expected an error").to_string();
        assert!(err.contains("needs a program"), "{err}");

        let mut config = config;
        config.generator.command = Some("/bin/cat".into());
        assert_eq!(config.build_generator().unwrap().name(), "command");
    }

    #[test]
    fn unknown_backend_lists_available() {
        let mut config = KilnConfig::resolve_with(&CliOverrides::default(), ConfigFile::default());
        config.generator.backend = "gpt".into();
        let err = config.build_generator().err().expect("expected an error").to_string();
        assert!(err.contains("unknown generator backend \"gpt\""), "{err}");
        assert!(err.contains("claude, ollama"), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };

        let result = save_config(&ConfigFile::default());
        let path = config_path();
        let loaded = load_config();

        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }

        result.unwrap();
        assert_eq!(path, tmp.path().join("kiln/config.toml"));
        assert_eq!(loaded.unwrap(), ConfigFile::default());
        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("kiln/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
