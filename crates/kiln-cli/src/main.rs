mod config;
mod create_cmd;
mod materialize_cmd;
mod template_cmds;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};

use config::{CliOverrides, KilnConfig};

#[derive(Parser)]
#[command(
    name = "kiln",
    version,
    about = "Turn a project description into planning documents and a materialized skeleton"
)]
struct Cli {
    /// Generator backend: ollama, claude, or command (overrides KILN_BACKEND)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Model passed to the backend (overrides KILN_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Directory projects are written under (overrides KILN_PROJECTS_DIR)
    #[arg(long, global = true)]
    projects_dir: Option<PathBuf>,

    /// Directory holding template overrides (overrides KILN_TEMPLATES_DIR)
    #[arg(long, global = true)]
    templates_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            backend: self.backend.clone(),
            model: self.model.clone(),
            projects_dir: self.projects_dir.clone(),
            templates_dir: self.templates_dir.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a kiln config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Run the full pipeline for a new project
    Create {
        /// Project name; becomes the output directory name
        name: String,
        /// Free-text description of the project
        description: String,
        /// Skip the layout role and materialization
        #[arg(long)]
        no_structure: bool,
        /// Keep stub contents instead of generating code
        #[arg(long)]
        no_code: bool,
    },
    /// Role template management
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Re-create a project's tree from its .structure manifest
    Materialize {
        /// Project directory containing a .structure manifest
        project_dir: PathBuf,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// List every role and where its template comes from
    List,
    /// Print the template and parameters a role renders with
    Show {
        /// Role name (visionary, strategist, designer, builder, layout)
        role: String,
    },
    /// Store a custom template for a role
    Set {
        role: String,
        /// File containing the template text
        #[arg(long)]
        file: PathBuf,
        /// Parameters as JSON (keeps the current parameters when omitted)
        #[arg(long)]
        params: Option<String>,
    },
    /// Remove a role's custom template
    Reset { role: String },
}

fn cmd_init(cli: &CliOverrides, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let mut cfg = config::ConfigFile::default();
    if let Some(backend) = &cli.backend {
        cfg.generator.backend = backend.clone();
    }
    if let Some(model) = &cli.model {
        cfg.generator.model = Some(model.clone());
    }
    if let Some(dir) = &cli.projects_dir {
        cfg.paths.projects_dir = dir.clone();
    }
    if let Some(dir) = &cli.templates_dir {
        cfg.paths.templates_dir = dir.clone();
    }

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  generator.backend = {}", cfg.generator.backend);
    println!("  paths.projects_dir = {}", cfg.paths.projects_dir.display());
    println!("  paths.templates_dir = {}", cfg.paths.templates_dir.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = cli.overrides();

    match cli.command {
        Commands::Init { force } => {
            cmd_init(&overrides, force)?;
        }
        Commands::Create {
            name,
            description,
            no_structure,
            no_code,
        } => {
            let resolved = KilnConfig::resolve(&overrides)?;
            let options = create_cmd::CreateOptions {
                structure: resolved.pipeline.structure && !no_structure,
                synthesize_code: resolved.pipeline.synthesize_code && !no_code,
            };
            let result = create_cmd::run_create(&resolved, &name, &description, options).await?;
            if !result.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Template { command } => {
            let resolved = KilnConfig::resolve(&overrides)?;
            template_cmds::run_template_command(command, &resolved)?;
        }
        Commands::Materialize { project_dir } => {
            let resolved = KilnConfig::resolve(&overrides)?;
            materialize_cmd::run_materialize(&project_dir, resolved.pipeline.max_depth).await?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "kiln", &mut std::io::stdout());
        }
    }

    Ok(())
}
