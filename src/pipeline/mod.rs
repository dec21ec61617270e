//! Batch pipeline: job planning, sequential execution, and run reporting.

pub mod report;
pub mod runner;

pub use report::{BatchReport, RunLog};
pub use runner::{BatchRunner, JobItem, JobStatus};
