//! `kiln template` subcommands: inspect and edit per-role templates.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use kiln_core::template::{TemplateRegistry, validate};
use kiln_store::{FileTemplateStore, Role, RoleParameters};

use crate::TemplateCommands;
use crate::config::KilnConfig;

/// Dispatch a template subcommand.
pub fn run_template_command(command: TemplateCommands, config: &KilnConfig) -> Result<()> {
    let store = FileTemplateStore::at(&config.templates_dir);
    let registry = TemplateRegistry::new(Arc::new(store));

    match command {
        TemplateCommands::List => cmd_list(&registry),
        TemplateCommands::Show { role } => cmd_show(&registry, &role),
        TemplateCommands::Set { role, file, params } => {
            cmd_set(&registry, &role, &file, params.as_deref())
        }
        TemplateCommands::Reset { role } => cmd_reset(&registry, &role),
    }
}

fn parse_role(role: &str) -> Result<Role> {
    role.parse::<Role>().with_context(|| {
        format!("unknown role {role:?}; expected visionary, strategist, designer, builder, or layout")
    })
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn cmd_list(registry: &TemplateRegistry) -> Result<()> {
    println!("{:<12} {:<8} TITLE", "ROLE", "SOURCE");
    for role in registry.list() {
        let resolved = registry.get(role);
        println!("{:<12} {:<8} {}", role, resolved.source, role.title());
    }
    match registry.unrecognized_keys() {
        Ok(keys) => {
            for key in keys {
                eprintln!("warning: stored template {key:?} matches no role and is ignored");
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to list stored templates"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn cmd_show(registry: &TemplateRegistry, role: &str) -> Result<()> {
    let role = parse_role(role)?;
    let resolved = registry.get(role);
    let json = serde_json::to_string_pretty(&resolved).context("failed to serialize template")?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// set
// ---------------------------------------------------------------------------

fn cmd_set(registry: &TemplateRegistry, role: &str, file: &Path, params: Option<&str>) -> Result<()> {
    let role = parse_role(role)?;
    let template = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read template file {}", file.display()))?;
    let parameters = params
        .map(|raw| {
            serde_json::from_str::<RoleParameters>(raw).context("invalid --params JSON")
        })
        .transpose()?;

    for warning in validate(role, &template) {
        eprintln!("warning: {warning}");
    }

    if !registry.set(role, &template, parameters) {
        bail!("failed to save template for {role}");
    }
    println!("Saved custom template for {role}.");
    Ok(())
}

// ---------------------------------------------------------------------------
// reset
// ---------------------------------------------------------------------------

fn cmd_reset(registry: &TemplateRegistry, role: &str) -> Result<()> {
    let role = parse_role(role)?;
    if registry.remove(role) {
        println!("Removed custom template for {role}; using the built-in default.");
    } else {
        println!("No custom template for {role}.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_role_accepts_aliases() {
        assert_eq!(parse_role("cto").unwrap(), Role::Strategist);
        assert_eq!(parse_role("Layout").unwrap(), Role::Layout);
    }

    #[test]
    fn parse_role_lists_valid_names() {
        let err = parse_role("manager").unwrap_err().to_string();
        assert!(err.contains("unknown role \"manager\""), "{err}");
    }

    #[test]
    fn set_then_reset_roundtrips_through_the_store() {
        let tmp = tempfile::TempDir::new().unwrap();
        let registry = TemplateRegistry::new(Arc::new(FileTemplateStore::at(tmp.path())));
        let file = tmp.path().join("visionary.txt");
        std::fs::write(&file, "Dream about {task}").unwrap();

        cmd_set(&registry, "visionary", &file, Some(r#"{"focus_areas": ["speed"]}"#)).unwrap();
        let reloaded = TemplateRegistry::new(Arc::new(FileTemplateStore::at(tmp.path())));
        let resolved = reloaded.get(Role::Visionary);
        assert_eq!(resolved.template, "Dream about {task}");
        assert_eq!(resolved.parameters.focus_areas, vec!["speed".to_owned()]);

        cmd_reset(&reloaded, "visionary").unwrap();
        assert!(reloaded.overridden().is_empty());
    }

    #[test]
    fn set_rejects_bad_params_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let registry = TemplateRegistry::new(Arc::new(FileTemplateStore::at(tmp.path())));
        let file = tmp.path().join("t.txt");
        std::fs::write(&file, "{task}").unwrap();

        let err = cmd_set(&registry, "builder", &file, Some("not json")).unwrap_err();
        assert!(err.to_string().contains("invalid --params JSON"));
        assert!(registry.overridden().is_empty());
    }
}
