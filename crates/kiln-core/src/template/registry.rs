//! Template registry: per-role prompt template and parameters, with
//! persisted overrides layered over built-in defaults.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use kiln_store::{Role, RoleParameters, StoreError, TemplateRecord, TemplateStore};

use super::defaults::{default_parameters, default_template, recognized_placeholders};
use super::prompt::PromptTemplate;

/// Where a resolved template came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSource {
    Builtin,
    Custom,
}

impl std::fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin => f.write_str("builtin"),
            Self::Custom => f.write_str("custom"),
        }
    }
}

/// The template and parameters a role renders with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleTemplate {
    pub role: Role,
    pub template: String,
    pub parameters: RoleParameters,
    pub source: TemplateSource,
}

impl RoleTemplate {
    pub fn prompt(&self) -> PromptTemplate {
        PromptTemplate::parse(self.template.as_str())
    }
}

/// Non-fatal problems found when validating a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateWarning {
    #[error("{role} template uses unrecognized placeholder {{{name}}}; it will render empty")]
    UnknownPlaceholder { role: Role, name: String },

    #[error("{role} template has no {{task}} placeholder")]
    MissingTask { role: Role },
}

/// Check `template` against the placeholders `role` recognizes.
pub fn validate(role: Role, template: &str) -> Vec<TemplateWarning> {
    let parsed = PromptTemplate::parse(template);
    let allowed = recognized_placeholders(role);
    let names = parsed.placeholders();

    let mut warnings: Vec<TemplateWarning> = names
        .iter()
        .filter(|name| !allowed.contains(name))
        .map(|name| TemplateWarning::UnknownPlaceholder {
            role,
            name: (*name).to_owned(),
        })
        .collect();
    if !names.contains(&"task") {
        warnings.push(TemplateWarning::MissingTask { role });
    }
    warnings
}

/// Per-role templates with persisted overrides.
///
/// Overrides are read from the store once at construction and written
/// through on every change. The registry is `Send + Sync`; share it with
/// `Arc` across concurrent pipelines.
pub struct TemplateRegistry {
    store: Arc<dyn TemplateStore>,
    overrides: RwLock<HashMap<Role, TemplateRecord>>,
}

impl TemplateRegistry {
    /// Build a registry, loading every stored override.
    ///
    /// A malformed or unreadable override is logged and skipped; that role
    /// falls back to its built-in default.
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        let mut overrides = HashMap::new();
        for role in Role::ALL {
            match store.load(&role.store_key()) {
                Ok(Some(record)) => {
                    tracing::info!(role = %role, "loaded custom template");
                    overrides.insert(role, record);
                }
                Ok(None) => {}
                Err(e @ StoreError::Malformed { .. }) => {
                    tracing::warn!(role = %role, error = %e, "ignoring malformed template override");
                }
                Err(e) => {
                    tracing::warn!(role = %role, error = %e, "failed to read template override");
                }
            }
        }
        Self {
            store,
            overrides: RwLock::new(overrides),
        }
    }

    /// A registry with no persistence beyond the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(kiln_store::MemoryTemplateStore::new()))
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Role, TemplateRecord>> {
        self.overrides.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Role, TemplateRecord>> {
        self.overrides.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolve the template for `role`, falling back to the built-in default.
    pub fn get(&self, role: Role) -> RoleTemplate {
        match self.read().get(&role) {
            Some(record) => RoleTemplate {
                role,
                template: record.template.clone(),
                parameters: record
                    .parameters
                    .clone()
                    .unwrap_or_else(|| default_parameters(role)),
                source: TemplateSource::Custom,
            },
            None => RoleTemplate {
                role,
                template: default_template(role).to_owned(),
                parameters: default_parameters(role),
                source: TemplateSource::Builtin,
            },
        }
    }

    /// Store a custom template for `role`.
    ///
    /// Validation problems are logged as warnings and do not block the
    /// save. When `parameters` is `None` the role keeps its current
    /// parameters. Returns `false` only if the store write fails.
    pub fn set(&self, role: Role, template: &str, parameters: Option<RoleParameters>) -> bool {
        for warning in validate(role, template) {
            tracing::warn!(role = %role, "{warning}");
        }

        let parameters = parameters.unwrap_or_else(|| self.get(role).parameters);
        let record = TemplateRecord {
            template: template.to_owned(),
            parameters: Some(parameters),
        };

        let mut overrides = self.write();
        match self.store.save(&role.store_key(), &record) {
            Ok(()) => {
                tracing::info!(role = %role, "saved custom template");
                overrides.insert(role, record);
                true
            }
            Err(e) => {
                tracing::error!(role = %role, error = %e, "failed to save template");
                false
            }
        }
    }

    /// Remove the custom template for `role`, reverting to the default.
    ///
    /// Returns `false` if there was no override or the store failed.
    pub fn remove(&self, role: Role) -> bool {
        let mut overrides = self.write();
        match self.store.remove(&role.store_key()) {
            Ok(removed) => {
                let had_override = overrides.remove(&role).is_some();
                if removed || had_override {
                    tracing::info!(role = %role, "removed custom template");
                    true
                } else {
                    tracing::warn!(role = %role, "no custom template to remove");
                    false
                }
            }
            Err(e) => {
                tracing::error!(role = %role, error = %e, "failed to remove template");
                false
            }
        }
    }

    /// Every role that has a template. Built-in defaults cover all roles.
    pub fn list(&self) -> BTreeSet<Role> {
        let mut roles: BTreeSet<Role> = Role::ALL.into_iter().collect();
        roles.extend(self.read().keys().copied());
        roles
    }

    /// Roles that currently have a custom override.
    pub fn overridden(&self) -> BTreeSet<Role> {
        self.read().keys().copied().collect()
    }

    /// Stored keys that belong to no role, such as a misspelled override
    /// file. They are never loaded.
    pub fn unrecognized_keys(&self) -> Result<Vec<String>, StoreError> {
        let known: BTreeSet<String> = Role::ALL.into_iter().map(Role::store_key).collect();
        let mut keys: Vec<String> = self
            .store
            .keys()?
            .into_iter()
            .filter(|k| !known.contains(k))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("overridden", &self.overridden())
            .finish()
    }
}
