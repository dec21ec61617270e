//! Sequential batch execution with per-item fault isolation.
//!
//! The runner plans one job item per model file, then walks the items in
//! order:
//! - Items whose first orbit frame already exists are skipped, making
//!   interrupted runs resumable
//! - Each remaining item is loaded and handed to the configured render
//!   backends in order; the first backend that produces every frame wins
//! - Any failure marks only that item as errored; the run continues
//!
//! Timing is tracked per item and fed into a remaining-time estimate
//! after each one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Local;
use regex::Regex;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::core::camera::{frame_path, orbit_capture};
use crate::core::loaders::{is_model_file, ModelLoader, ModelPoints};
use crate::render::RenderBackend;

use super::report::{emit_report, format_duration, write_manifest, BatchReport, RunLog};

/// How often orbit progress is logged, in frames.
const VIEW_LOG_EVERY: usize = 10;

/// Errors raised while planning a batch run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input directory does not exist: {0}")]
    InputDirMissing(PathBuf),

    #[error("no model files found in {0}")]
    NoModelsFound(PathBuf),
}

/// Outcome of one planned item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Skipped,
    Success { frames: usize },
    Error { message: String },
}

impl JobStatus {
    /// Stable lowercase label used in the manifest.
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Skipped => "skipped",
            JobStatus::Success { .. } => "success",
            JobStatus::Error { .. } => "error",
        }
    }
}

/// One model file scheduled for conversion.
#[derive(Debug, Clone)]
pub struct JobItem {
    pub source: PathBuf,
    pub name: String,
    pub output_dir: PathBuf,
    pub base_image: PathBuf,
    pub status: JobStatus,
    pub elapsed: Duration,
}

impl JobItem {
    /// Source file name, e.g. `part.stp`.
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }

    /// Path of the first orbit frame. Its existence marks the item as
    /// already processed.
    pub fn first_frame(&self) -> PathBuf {
        frame_path(&self.base_image, 0)
    }
}

/// Collects model files under `input_dir`, sorted by path.
pub fn scan_input(input_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !input_dir.is_dir() {
        return Err(PipelineError::InputDirMissing(input_dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(input_dir)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_model_file(path))
        .collect();

    if files.is_empty() {
        return Err(PipelineError::NoModelsFound(input_dir.to_path_buf()));
    }

    files.sort();
    Ok(files)
}

/// Plans one job item per model file in the input directory.
///
/// Each model `<name>.stp` renders into `<output_dir>/<name>/` with
/// frames derived from `<name>.<image_ext>`.
pub fn plan_items(config: &PipelineConfig) -> Result<Vec<JobItem>, PipelineError> {
    let files = scan_input(&config.input_dir)?;

    let items = files
        .into_iter()
        .map(|source| {
            let name = source
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "model".to_string());
            let output_dir = config.output_dir.join(&name);
            let base_image = output_dir.join(format!("{}.{}", name, config.render.image_ext));
            JobItem {
                source,
                name,
                output_dir,
                base_image,
                status: JobStatus::Pending,
                elapsed: Duration::ZERO,
            }
        })
        .collect();

    Ok(items)
}

/// Counts orbit frames already present for an item.
pub fn completed_frames(item: &JobItem) -> usize {
    let pattern = Regex::new(&format!(r"^{}_\d+$", regex::escape(&item.name))).unwrap();
    let wanted_ext = item.base_image.extension().map(|ext| ext.to_ascii_lowercase());

    fs::read_dir(&item.output_dir)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|ext| ext.to_ascii_lowercase()) == wanted_ext)
        .filter(|path| {
            path.file_stem()
                .map(|stem| pattern.is_match(&stem.to_string_lossy()))
                .unwrap_or(false)
        })
        .count()
}

/// Drives one batch run over all planned items.
///
/// Loader, backends, and log are injected so the runner can be exercised
/// without touching real CAD files or producing real images.
pub struct BatchRunner<'a> {
    config: &'a PipelineConfig,
    loader: &'a dyn ModelLoader,
    backends: &'a [Box<dyn RenderBackend>],
    log: &'a mut RunLog,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        loader: &'a dyn ModelLoader,
        backends: &'a [Box<dyn RenderBackend>],
        log: &'a mut RunLog,
    ) -> Self {
        BatchRunner {
            config,
            loader,
            backends,
            log,
        }
    }

    /// Executes the run and returns the final report.
    ///
    /// Item-level failures are captured in the report; only planning and
    /// manifest errors abort the run.
    pub fn run(self) -> anyhow::Result<BatchReport> {
        let BatchRunner {
            config,
            loader,
            backends,
            log,
        } = self;

        let mut items = plan_items(config)?;
        if let Some(limit) = config.limit {
            items.truncate(limit);
        }

        let run_start = Instant::now();

        log.rule('=');
        log.emit("Multi-view batch conversion");
        log.emit(&format!("Started at {}", Local::now().format("%Y-%m-%d %H:%M:%S")));
        log.emit(&format!("Input directory:  {}", config.input_dir.display()));
        log.emit(&format!("Output directory: {}", config.output_dir.display()));
        log.emit(&format!("Views per model:  {}", config.sample_count));
        let names: Vec<&str> = backends.iter().map(|backend| backend.name()).collect();
        log.emit(&format!("Render backends:  {}", names.join(", ")));
        if config.force_reprocess {
            log.emit("Force mode: existing outputs will be re-rendered");
        }
        log.emit(&format!("Found {} model file(s)", items.len()));
        log.rule('=');

        let total = items.len();
        let mut cumulative = Duration::ZERO;

        for (index, item) in items.iter_mut().enumerate() {
            log.emit(&format!("[{}/{}] {}", index + 1, total, item.file_name()));

            let item_start = Instant::now();
            process_item(item, config, loader, backends, log);
            item.elapsed = item_start.elapsed();
            cumulative += item.elapsed;

            log.emit(&format!(
                "Item finished in {}",
                format_duration(item.elapsed)
            ));

            let done = index + 1;
            let remaining = total - done;
            if remaining > 0 {
                let eta = cumulative / done as u32 * remaining as u32;
                log.emit(&format!(
                    "Estimated time remaining: {} ({} file(s) left)",
                    format_duration(eta),
                    remaining
                ));
            }
        }

        let report = BatchReport::from_items(items, run_start.elapsed());
        emit_report(log, &report);

        let manifest_path = config.log_dir.join("manifest.csv");
        write_manifest(&manifest_path, &report.items)
            .with_context(|| format!("Failed to write run manifest: {}", manifest_path.display()))?;
        log.emit(&format!("Manifest written to {}", manifest_path.display()));

        Ok(report)
    }
}

/// Runs the full state machine for one item, recording the outcome on it.
fn process_item(
    item: &mut JobItem,
    config: &PipelineConfig,
    loader: &dyn ModelLoader,
    backends: &[Box<dyn RenderBackend>],
    log: &mut RunLog,
) {
    if !config.force_reprocess && item.first_frame().exists() {
        let have = completed_frames(item);
        if have < config.sample_count {
            log.emit(&format!(
                "Warning: {} has {}/{} frames; rerun with force to regenerate",
                item.name, have, config.sample_count
            ));
        }
        log.emit(&format!("Skipping {} (output already exists)", item.file_name()));
        item.status = JobStatus::Skipped;
        return;
    }

    if let Err(e) = fs::create_dir_all(&item.output_dir) {
        let message = format!("failed to create output directory: {}", e);
        log.emit(&format!("Error: {}", message));
        item.status = JobStatus::Error { message };
        return;
    }

    let model = match loader.load(&item.source) {
        Ok(model) => model,
        Err(e) => {
            let message = e.to_string();
            log.emit(&format!("Error: {}", message));
            item.status = JobStatus::Error { message };
            return;
        }
    };
    log.emit(&format!("Loaded {} vertex positions", model.len()));

    for backend in backends {
        match render_item(backend.as_ref(), &model, item, config, log) {
            Ok(frames) => {
                log.emit(&format!(
                    "Rendered {} views via '{}' backend",
                    frames,
                    backend.name()
                ));
                item.status = JobStatus::Success { frames };
                return;
            }
            Err(e) => {
                log.emit(&format!("Backend '{}' failed: {}", backend.name(), e));
            }
        }
    }

    let message = "all render backends failed".to_string();
    log.emit(&format!("Error: {}", message));
    item.status = JobStatus::Error { message };
}

/// Attempts one backend for one item, capturing the full orbit.
///
/// The viewer lives only for this attempt, so backend resources are
/// released before any fallback attempt starts.
fn render_item(
    backend: &dyn RenderBackend,
    model: &ModelPoints,
    item: &JobItem,
    config: &PipelineConfig,
    log: &mut RunLog,
) -> crate::render::Result<usize> {
    let mut viewer = backend.create_viewer(model, &config.render)?;

    let name = &item.name;
    let total = config.sample_count;
    orbit_capture(viewer.as_mut(), &item.base_image, total, |index| {
        if (index + 1) % VIEW_LOG_EVERY == 0 {
            log.emit(&format!("  {} view {}/{}", name, index + 1, total));
        }
    })
}
