//! Run logging and end-of-batch reporting.
//!
//! Every batch run produces:
//! - A timestamped log file mirroring everything printed to the console,
//!   flushed line by line so a crashed run still leaves a usable trace
//! - A `manifest.csv` recording the outcome of every planned item
//!
//! Log lines carry a `[HH:MM:SS]` wall-clock prefix.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Local;
use log::warn;

use super::runner::{JobItem, JobStatus};

const RULE_WIDTH: usize = 60;

/// Line-buffered run log writing to console and file simultaneously.
pub struct RunLog {
    file: BufWriter<File>,
    path: PathBuf,
    started: Instant,
    write_failed: bool,
}

impl RunLog {
    /// Opens a new log file `multiview_<YYYYmmdd_HHMMSS>.log` under
    /// `log_dir`, creating the directory if needed.
    pub fn create(log_dir: &Path) -> io::Result<RunLog> {
        fs::create_dir_all(log_dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = log_dir.join(format!("multiview_{}.log", stamp));
        let file = BufWriter::new(File::create(&path)?);

        Ok(RunLog {
            file,
            path,
            started: Instant::now(),
            write_failed: false,
        })
    }

    /// Emits one timestamped line to the console and the log file.
    ///
    /// File write failures are reported once and never interrupt the
    /// run; console output continues either way.
    pub fn emit(&mut self, message: &str) {
        let line = format!("[{}] {}", Local::now().format("%H:%M:%S"), message);
        println!("{}", line);

        if self.write_failed {
            return;
        }
        let outcome = writeln!(self.file, "{}", line).and_then(|_| self.file.flush());
        if let Err(e) = outcome {
            self.write_failed = true;
            warn!("run log became unwritable: {}", e);
        }
    }

    /// Emits a horizontal rule of `ch`.
    pub fn rule(&mut self, ch: char) {
        let line: String = std::iter::repeat(ch).take(RULE_WIDTH).collect();
        self.emit(&line);
    }

    /// Path of the log file backing this run.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wall time since the log was opened.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Writes the closing banner, flushes, and returns the log path.
    pub fn close(mut self) -> io::Result<PathBuf> {
        let total = format_duration(self.started.elapsed());
        self.emit(&format!("Run finished in {}", total));
        self.file.flush()?;
        Ok(self.path)
    }
}

/// Aggregated outcome of one batch run.
#[derive(Debug)]
pub struct BatchReport {
    pub items: Vec<JobItem>,
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub elapsed: Duration,
}

impl BatchReport {
    /// Tallies final item states into a report.
    pub fn from_items(items: Vec<JobItem>, elapsed: Duration) -> Self {
        let total = items.len();
        let mut processed = 0;
        let mut skipped = 0;
        let mut errors = 0;

        for item in &items {
            match item.status {
                JobStatus::Success { .. } => processed += 1,
                JobStatus::Skipped => skipped += 1,
                JobStatus::Error { .. } => errors += 1,
                JobStatus::Pending => {}
            }
        }

        BatchReport {
            items,
            total,
            processed,
            skipped,
            errors,
            elapsed,
        }
    }

    /// Share of planned items that rendered successfully, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 / self.total as f64 * 100.0
        }
    }

    /// Mean processing time across successful items.
    pub fn average_success(&self) -> Option<Duration> {
        let times: Vec<Duration> = self
            .items
            .iter()
            .filter(|item| matches!(item.status, JobStatus::Success { .. }))
            .map(|item| item.elapsed)
            .collect();

        if times.is_empty() {
            return None;
        }
        Some(times.iter().sum::<Duration>() / times.len() as u32)
    }

    /// Quickest successful item. Ties keep the first one encountered.
    pub fn fastest(&self) -> Option<&JobItem> {
        self.successes().fold(None, |best, item| match best {
            Some(b) if item.elapsed < b.elapsed => Some(item),
            Some(b) => Some(b),
            None => Some(item),
        })
    }

    /// Slowest successful item. Ties keep the first one encountered.
    pub fn slowest(&self) -> Option<&JobItem> {
        self.successes().fold(None, |best, item| match best {
            Some(b) if item.elapsed > b.elapsed => Some(item),
            Some(b) => Some(b),
            None => Some(item),
        })
    }

    fn successes(&self) -> impl Iterator<Item = &JobItem> {
        self.items
            .iter()
            .filter(|item| matches!(item.status, JobStatus::Success { .. }))
    }
}

/// Formats a duration as `12.34s`, `3m 12.3s`, or `1h 4m 5s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else if secs < 3600.0 {
        let minutes = (secs / 60.0).floor() as u64;
        format!("{}m {:.1}s", minutes, secs - minutes as f64 * 60.0)
    } else {
        let hours = (secs / 3600.0).floor() as u64;
        let minutes = ((secs - hours as f64 * 3600.0) / 60.0).floor() as u64;
        let rem = secs - hours as f64 * 3600.0 - minutes as f64 * 60.0;
        format!("{}h {}m {}s", hours, minutes, rem.floor() as u64)
    }
}

/// Writes the per-item outcome manifest as CSV.
///
/// # Arguments
/// * `path` - Destination file, typically `<log_dir>/manifest.csv`
/// * `items` - Final item states from the run
pub fn write_manifest(path: &Path, items: &[JobItem]) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create manifest file: {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    writer.write_record(["file", "status", "seconds", "frames"])?;
    for item in items {
        let frames = match item.status {
            JobStatus::Success { frames } => frames,
            _ => 0,
        };
        let seconds = format!("{:.2}", item.elapsed.as_secs_f64());
        writer.write_record([
            item.file_name().as_str(),
            item.status.label(),
            seconds.as_str(),
            frames.to_string().as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Emits the end-of-run summary block to the run log.
pub fn emit_report(log: &mut RunLog, report: &BatchReport) {
    log.rule('=');
    log.emit("Batch run complete");
    log.emit(&format!("Total files:      {}", report.total));
    log.emit(&format!("Processed:        {}", report.processed));
    log.emit(&format!("Skipped:          {}", report.skipped));
    log.emit(&format!("Errors:           {}", report.errors));
    log.emit(&format!("Success rate:     {:.1}%", report.success_rate()));
    log.emit(&format!(
        "Total time:       {}",
        format_duration(report.elapsed)
    ));

    if let Some(avg) = report.average_success() {
        log.emit(&format!("Average per file: {}", format_duration(avg)));
    }
    if let Some(fastest) = report.fastest() {
        log.emit(&format!(
            "Fastest:          {} ({})",
            fastest.name,
            format_duration(fastest.elapsed)
        ));
    }
    if let Some(slowest) = report.slowest() {
        log.emit(&format!(
            "Slowest:          {} ({})",
            slowest.name,
            format_duration(slowest.elapsed)
        ));
    }

    log.rule('-');
    for item in &report.items {
        match &item.status {
            JobStatus::Success { frames } => log.emit(&format!(
                "  ✓ {} ({}, {} frames)",
                item.name,
                format_duration(item.elapsed),
                frames
            )),
            JobStatus::Error { message } => log.emit(&format!("  ✗ {}: {}", item.name, message)),
            JobStatus::Skipped => log.emit(&format!("  - {} (skipped)", item.name)),
            JobStatus::Pending => log.emit(&format!("  ? {} (not attempted)", item.name)),
        }
    }
    log.rule('=');
}
