//! `kiln create` command: run the pipeline for one project.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use kiln_core::pipeline::{Pipeline, PipelineConfig, PipelineResult};
use kiln_core::processor::RoleProcessor;
use kiln_core::structure::StructureParser;
use kiln_core::template::TemplateRegistry;
use kiln_store::FileTemplateStore;

use crate::config::KilnConfig;

/// Which optional pipeline steps to run.
#[derive(Debug, Clone, Copy)]
pub struct CreateOptions {
    pub structure: bool,
    pub synthesize_code: bool,
}

/// Assemble a pipeline from resolved configuration.
pub fn build_pipeline(config: &KilnConfig, options: CreateOptions) -> Result<Pipeline> {
    let generator = config.build_generator()?;
    let store = FileTemplateStore::at(&config.templates_dir);
    let templates = Arc::new(TemplateRegistry::new(Arc::new(store)));
    let processor = RoleProcessor::new(generator, templates);

    let mut pipeline = Pipeline::new(
        processor,
        PipelineConfig {
            projects_root: config.projects_dir.clone(),
        },
    );
    if options.structure {
        pipeline =
            pipeline.with_structure_parser(StructureParser::new(config.pipeline.max_depth));
        if options.synthesize_code {
            pipeline = pipeline.with_code_synthesis();
        }
    } else {
        pipeline = pipeline.without_structure();
    }
    Ok(pipeline)
}

/// Run the create command, printing the run result as JSON on stdout.
pub async fn run_create(
    config: &KilnConfig,
    name: &str,
    description: &str,
    options: CreateOptions,
) -> Result<PipelineResult> {
    let pipeline = build_pipeline(config, options)?;

    // First signal cancels at the next stage boundary, second force-exits.
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let got_first_signal = Arc::new(AtomicBool::new(false));
    let got_first_clone = Arc::clone(&got_first_signal);

    tokio::spawn(async move {
        loop {
            tokio::signal::ctrl_c().await.ok();
            if got_first_clone.swap(true, Ordering::SeqCst) {
                eprintln!("\nForce exit.");
                std::process::exit(130);
            }
            eprintln!("\nStopping after the current stage (Ctrl+C again to force)...");
            cancel_clone.cancel();
        }
    });

    let result = pipeline.run_with_cancel(name, description, cancel).await;

    let json = serde_json::to_string_pretty(&result).context("failed to serialize run result")?;
    println!("{json}");

    for warning in &result.warnings {
        eprintln!("warning: {}", warning.message);
    }
    if let Some(error) = &result.error {
        eprintln!("error: {}", error.message);
    }

    Ok(result)
}
