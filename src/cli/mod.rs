//! Command-line interface for the multi-view pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "multiview-pipeline")]
#[command(about = "Multi-view snapshot generator for STEP CAD models", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render orbit views for every model in a directory
    Run {
        /// Directory containing STEP model files
        input_dir: Option<PathBuf>,
        /// Output directory for rendered views
        output_dir: Option<PathBuf>,
        /// Directory for run logs and the manifest
        #[arg(long)]
        log_dir: Option<PathBuf>,
        /// Number of orbit views per model
        #[arg(long)]
        views: Option<usize>,
        /// Re-render models whose output already exists
        #[arg(long)]
        force: bool,
        /// Render backends to try, in order (comma separated)
        #[arg(long, value_delimiter = ',')]
        backends: Vec<String>,
        /// Limit number of models to process
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show which models already have rendered output
    Status {
        /// Directory containing STEP model files
        input_dir: Option<PathBuf>,
        /// Output directory to inspect
        output_dir: Option<PathBuf>,
    },

    /// Print the orbit eye offsets for a sample count
    Preview {
        /// Number of orbit views
        #[arg(long, default_value_t = 36)]
        views: usize,
        /// Orbit radius
        #[arg(long, default_value_t = 1.0)]
        radius: f32,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.len() > 39 {
            format!("{}...", &value[..36])
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Run {
            input_dir,
            output_dir,
            log_dir,
            views,
            force,
            backends,
            limit,
        } => {
            cmd_run(input_dir, output_dir, log_dir, views, force, backends, limit, config);
        }
        Commands::Status {
            input_dir,
            output_dir,
        } => {
            cmd_status(input_dir, output_dir, config);
        }
        Commands::Preview { views, radius } => {
            cmd_preview(views, radius);
        }
    }
}

fn cmd_run(
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    views: Option<usize>,
    force: bool,
    backends: Vec<String>,
    limit: Option<usize>,
    mut config: PipelineConfig,
) {
    use crate::core::loaders::StepVertexLoader;
    use crate::pipeline::{BatchRunner, RunLog};
    use crate::render;

    let start = Instant::now();

    // CLI arguments override config file values
    if let Some(dir) = input_dir {
        config.input_dir = dir;
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = log_dir {
        config.log_dir = dir;
    }
    if let Some(count) = views {
        config.sample_count = count;
    }
    if force {
        config.force_reprocess = true;
    }
    if !backends.is_empty() {
        config.backend_variants = backends;
    }
    if limit.is_some() {
        config.limit = limit;
    }

    let resolved = render::resolve_backends(&config.backend_variants);
    if resolved.is_empty() {
        error!(
            "No usable render backend among: {}",
            config.backend_variants.join(", ")
        );
        std::process::exit(1);
    }

    if let Err(e) = config.create_directories() {
        error!("Failed to create output directories: {}", e);
        std::process::exit(1);
    }

    let mut log = match RunLog::create(&config.log_dir) {
        Ok(log) => log,
        Err(e) => {
            error!(
                "Failed to open run log in {}: {}",
                config.log_dir.display(),
                e
            );
            std::process::exit(1);
        }
    };

    let loader = StepVertexLoader::default();

    match BatchRunner::new(&config, &loader, &resolved, &mut log).run() {
        Ok(report) => {
            let log_path = log.close().ok();

            print_summary(
                "Batch Run Complete",
                &[
                    ("Input directory", config.input_dir.display().to_string()),
                    ("Output directory", config.output_dir.display().to_string()),
                    ("Models found", report.total.to_string()),
                    ("Processed", report.processed.to_string()),
                    ("Skipped", report.skipped.to_string()),
                    ("Errors", report.errors.to_string()),
                    ("Success rate", format!("{:.1}%", report.success_rate())),
                    (
                        "Log file",
                        log_path
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| "unavailable".to_string()),
                    ),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            let _ = log.close();
            error!("Batch run failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_status(input_dir: Option<PathBuf>, output_dir: Option<PathBuf>, mut config: PipelineConfig) {
    use crate::pipeline::runner::{completed_frames, plan_items};

    if let Some(dir) = input_dir {
        config.input_dir = dir;
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }

    let spinner = create_spinner("Scanning model and output directories...");

    let items = match plan_items(&config) {
        Ok(items) => items,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Status scan failed: {}", e);
            std::process::exit(1);
        }
    };

    spinner.finish_and_clear();

    let mut complete = 0;
    let mut partial = 0;
    let mut pending = 0;

    for item in &items {
        let have = completed_frames(item);
        if have >= config.sample_count {
            complete += 1;
            println!("  done     {} ({} frames)", item.file_name(), have);
        } else if have > 0 {
            partial += 1;
            println!(
                "  partial  {} ({}/{} frames)",
                item.file_name(),
                have,
                config.sample_count
            );
        } else {
            pending += 1;
            println!("  pending  {}", item.file_name());
        }
    }

    print_summary(
        "Output Status",
        &[
            ("Input directory", config.input_dir.display().to_string()),
            ("Output directory", config.output_dir.display().to_string()),
            ("Models", items.len().to_string()),
            ("Complete", complete.to_string()),
            ("Partial", partial.to_string()),
            ("Pending", pending.to_string()),
        ],
    );
}

fn cmd_preview(views: usize, radius: f32) {
    use crate::core::sampler::fibonacci_sphere;

    let offsets = fibonacci_sphere(views, radius);

    println!("Orbit eye offsets for {} view(s), radius {}:", views, radius);
    for (index, offset) in offsets.iter().enumerate() {
        println!(
            "  {:>4}  {:>10.4} {:>10.4} {:>10.4}",
            index, offset.x, offset.y, offset.z
        );
    }

    print_summary(
        "Orbit Preview",
        &[
            ("Views", views.to_string()),
            ("Radius", radius.to_string()),
            (
                "First offset",
                offsets
                    .first()
                    .map(|o| format!("({:.3}, {:.3}, {:.3})", o.x, o.y, o.z))
                    .unwrap_or_else(|| "none".to_string()),
            ),
        ],
    );
}
