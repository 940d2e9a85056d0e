//! CLI binary for site-tour: select and write the documentation site's tour steps.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tour_core::config::TourConfig;
use tour_core::model::{EntityAccessor, KnowledgeBase, top_level, with_subtechniques};
use tour_nav::TourOptions;

#[derive(Parser)]
#[command(name = "site-tour", about = "Documentation site tour step generator")]
struct Cli {
    /// Project root directory (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select the tour and append it to the site's settings file
    Generate {
        /// Print the settings fragment instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the selected tour as JSON
    Show {
        /// Print the tour of every internal matrix instead of the selected one
        #[arg(long)]
        all: bool,
    },

    /// Show technique and sub-technique counts per matrix
    Info,
}

fn get_project_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.project {
        Some(p) => Ok(p.clone()),
        None => std::env::current_dir().context("failed to get current directory"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_root = get_project_root(&cli)?;

    match cli.command {
        Commands::Generate { dry_run } => cmd_generate(&project_root, dry_run),
        Commands::Show { all } => cmd_show(&project_root, all),
        Commands::Info => cmd_info(&project_root),
    }
}

/// Load config and the knowledge base of every internal matrix.
fn load(project_root: &Path) -> Result<(TourConfig, KnowledgeBase)> {
    let config = TourConfig::load(project_root)?;
    let stix_dir = TourConfig::resolve(project_root, &config.site.stix_dir);
    tracing::debug!("loading STIX bundles from {}", stix_dir.display());
    let kb = tour_core::storage::load_knowledge_base(&stix_dir, &config.matrices)?;
    tracing::debug!(
        "loaded {} matrices, {} sub-technique relationships",
        kb.domains.len(),
        kb.subtechnique_index().total_subtechniques()
    );
    Ok((config, kb))
}

fn cmd_generate(project_root: &Path, dry_run: bool) -> Result<()> {
    let (config, kb) = load(project_root)?;
    let options = TourOptions::from(&config.selection);
    let tour = tour_nav::select::select_tour(&config.matrices, &kb, &options);

    if dry_run {
        let fragment =
            tour_core::storage::render_tour_settings(&config.site.tour_template, &tour)?;
        print!("{}", fragment);
        return Ok(());
    }

    let javascript_dir = TourConfig::resolve(project_root, &config.site.javascript_path);
    let path = tour_core::storage::append_tour_settings(
        &javascript_dir,
        &config.site.settings_file,
        &config.site.tour_template,
        &tour,
    )?;

    eprintln!("Tour steps written to {}", path.display());
    eprintln!("  Steps: {}", tour.step_count());
    if let Some(matrix) = tour.matrix() {
        eprintln!("  Matrix: {}", matrix);
    }
    if tour.is_empty() {
        eprintln!("  No matrix has a technique with sub-techniques; tour is empty.");
    }

    Ok(())
}

fn cmd_show(project_root: &Path, all: bool) -> Result<()> {
    let (config, kb) = load(project_root)?;
    let options = TourOptions::from(&config.selection);

    let output = if all {
        let tours: Vec<serde_json::Value> =
            tour_nav::select::build_tours(&config.matrices, &kb, &options)
                .into_iter()
                .map(|(matrix, tour)| {
                    serde_json::json!({
                        "matrix_id": matrix.id,
                        "steps": tour,
                    })
                })
                .collect();
        serde_json::to_string_pretty(&tours)?
    } else {
        let tour = tour_nav::select::select_tour(&config.matrices, &kb, &options);
        serde_json::to_string_pretty(&tour)?
    };
    println!("{}", output);

    Ok(())
}

fn cmd_info(project_root: &Path) -> Result<()> {
    let (config, kb) = load(project_root)?;
    let index = kb.subtechnique_index();

    println!("Matrices: {}", config.matrices.len());
    println!("Sub-technique relationships: {}", index.total_subtechniques());
    println!();
    for matrix in &config.matrices {
        if matrix.is_external() {
            println!("  {} (external, skipped)", matrix.id);
            continue;
        }
        let techniques = kb.techniques(matrix);
        println!(
            "  {}: {} techniques, {} top-level, {} with sub-techniques",
            matrix.id,
            techniques.len(),
            top_level(techniques).len(),
            with_subtechniques(techniques, index).len()
        );
    }

    Ok(())
}
