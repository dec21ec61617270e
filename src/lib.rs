//! Batch multi-view snapshot generator for STEP CAD models.
//!
//! This crate provides tools for:
//! - Harvesting vertex positions from STEP files
//! - Deterministic Fibonacci-sphere view sampling
//! - Camera orbit capture through pluggable render backends
//! - Resumable, fault-isolated batch runs with timing reports
//!
//! # Example
//!
//! ```
//! use multiview_pipeline::core::sampler::fibonacci_sphere;
//!
//! let offsets = fibonacci_sphere(8, 2.0);
//! assert_eq!(offsets.len(), 8);
//! for eye in &offsets {
//!     assert!((eye.norm() - 2.0).abs() < 1e-3);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod render;

pub use config::{PipelineConfig, RenderOptions};
pub use core::loaders::{ModelLoader, ModelPoints, StepVertexLoader};
pub use pipeline::{BatchReport, BatchRunner, JobItem, JobStatus, RunLog};
pub use render::{RenderBackend, Viewer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
