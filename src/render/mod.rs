//! Rendering seam: viewer traits, backend variants, shared projection.
//!
//! The batch runner drives rendering exclusively through [`RenderBackend`]
//! and [`Viewer`], so alternative implementations can be tried in order
//! until one succeeds. Two software variants are bundled:
//! - `chart`: plotters scatter render of the projected vertices
//! - `raster`: direct RGB point splat
//!
//! Both render one frame per dump from the viewer's current camera, using
//! an orthographic projection into the view plane.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use nalgebra::Vector3;
use thiserror::Error;

use crate::config::RenderOptions;
use crate::core::camera::CameraState;
use crate::core::loaders::ModelPoints;

pub mod chart;
pub mod raster;

pub use chart::ChartBackend;
pub use raster::RasterBackend;

/// Errors that can occur while creating a viewer or dumping frames.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("unknown render backend '{0}'")]
    UnknownVariant(String),

    #[error("model has no points to render")]
    EmptyModel,

    #[error("render failed: {0}")]
    Render(String),

    #[error("failed to write frame '{path}': {message}")]
    FrameWrite { path: PathBuf, message: String },

    #[error("failed to create output directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Eye distance as a multiple of the model's half extent at fit time.
pub(crate) const FIT_DISTANCE_FACTOR: f32 = 2.5;

/// Live rendering context bound to one model.
///
/// A viewer is exclusively owned by the current item's attempt and is
/// dropped before the next attempt begins, releasing whatever resources
/// the backend holds.
pub trait Viewer {
    /// Current camera pose.
    fn camera(&self) -> CameraState;

    /// Move the camera eye to an absolute position.
    fn set_eye(&mut self, eye: nalgebra::Point3<f32>);

    /// Re-fit the projection so the whole model is visible from the
    /// current eye.
    fn fit_all(&mut self);

    /// Refresh the view after camera changes.
    fn refresh(&mut self);

    /// Persist the current frame to `path`.
    fn dump_frame(&mut self, path: &Path) -> Result<()>;
}

/// One render-backend variant.
pub trait RenderBackend {
    /// Variant name as used in configuration.
    fn name(&self) -> &'static str;

    /// Create a viewer bound to `model`, performing the initial fit-all
    /// framing.
    fn create_viewer(&self, model: &ModelPoints, options: &RenderOptions)
        -> Result<Box<dyn Viewer>>;
}

/// Look up a backend variant by its configuration name.
pub fn backend_by_name(name: &str) -> Result<Box<dyn RenderBackend>> {
    match name {
        "chart" => Ok(Box::new(ChartBackend)),
        "raster" => Ok(Box::new(RasterBackend)),
        other => Err(BackendError::UnknownVariant(other.to_string())),
    }
}

/// Resolve an ordered variant list into backend instances.
///
/// Unknown names are logged and skipped; callers treat an empty result as
/// a configuration error.
pub fn resolve_backends(variants: &[String]) -> Vec<Box<dyn RenderBackend>> {
    let mut backends = Vec::with_capacity(variants.len());
    for name in variants {
        match backend_by_name(name) {
            Ok(backend) => backends.push(backend),
            Err(e) => warn!("skipping backend: {}", e),
        }
    }
    backends
}

/// Initial framing: center on the model, eye along a fixed diagonal at a
/// distance proportional to the model's extent.
pub(crate) fn initial_camera(model: &ModelPoints) -> CameraState {
    let center = model.center();
    let direction = Vector3::new(1.0, 1.0, 1.0).normalize();
    let eye = center + direction * (FIT_DISTANCE_FACTOR * model.half_extent());
    CameraState::from_center_eye(center, eye)
}

/// Orthonormal `(right, up)` basis spanning the view plane.
pub(crate) fn view_basis(state: &CameraState) -> (Vector3<f32>, Vector3<f32>) {
    let forward = state.view_direction();

    // World up, unless the camera looks straight along it
    let mut reference = Vector3::y();
    if forward.cross(&reference).norm() <= 1e-4 {
        reference = Vector3::x();
    }

    let right = forward.cross(&reference).normalize();
    let up = right.cross(&forward).normalize();
    (right, up)
}

/// Project the model's vertices into the current view plane, relative to
/// the camera center.
pub(crate) fn project_points(model: &ModelPoints, state: &CameraState) -> Vec<(f32, f32)> {
    let (right, up) = view_basis(state);
    model
        .points
        .iter()
        .map(|point| {
            let offset = point - state.center;
            (offset.dot(&right), offset.dot(&up))
        })
        .collect()
}

/// Half extent of the projected footprint, padded so points never sit on
/// the frame edge. Degenerate footprints get a fixed extent.
pub(crate) fn projected_half_extent(projected: &[(f32, f32)]) -> f32 {
    let mut extent = 0.0_f32;
    for &(u, v) in projected {
        extent = extent.max(u.abs()).max(v.abs());
    }

    if extent <= f32::EPSILON {
        1.0
    } else {
        extent * 1.05
    }
}

/// Creates parent directories for a frame path if they don't exist.
pub(crate) fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| BackendError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn cube_model() -> ModelPoints {
        ModelPoints::from_points(vec![
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(1.0, -1.0, 1.0),
        ])
    }

    #[test]
    fn test_backend_by_name() {
        assert_eq!(backend_by_name("chart").ok().map(|b| b.name()), Some("chart"));
        assert_eq!(backend_by_name("raster").ok().map(|b| b.name()), Some("raster"));
        assert!(matches!(
            backend_by_name("opengl"),
            Err(BackendError::UnknownVariant(_))
        ));
    }

    #[test]
    fn test_resolve_backends_skips_unknown() {
        let variants = vec![
            "chart".to_string(),
            "bogus".to_string(),
            "raster".to_string(),
        ];
        let backends = resolve_backends(&variants);

        let names: Vec<&str> = backends.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["chart", "raster"]);
    }

    #[test]
    fn test_initial_camera_framing() {
        let model = cube_model();
        let state = initial_camera(&model);

        assert_eq!(state.center, model.center());
        let expected = FIT_DISTANCE_FACTOR * model.half_extent();
        assert!((state.radius - expected).abs() < 1e-4);
    }

    #[test]
    fn test_view_basis_orthonormal() {
        let state = CameraState::from_center_eye(Point3::origin(), Point3::new(3.0, 2.0, 5.0));
        let forward = state.view_direction();
        let (right, up) = view_basis(&state);

        assert!((right.norm() - 1.0).abs() < 1e-5);
        assert!((up.norm() - 1.0).abs() < 1e-5);
        assert!(right.dot(&up).abs() < 1e-5);
        assert!(right.dot(&forward).abs() < 1e-5);
        assert!(up.dot(&forward).abs() < 1e-5);
    }

    #[test]
    fn test_view_basis_handles_vertical_view() {
        // Looking straight down the world up axis
        let state = CameraState::from_center_eye(Point3::origin(), Point3::new(0.0, 10.0, 0.0));
        let (right, up) = view_basis(&state);

        assert!((right.norm() - 1.0).abs() < 1e-5);
        assert!((up.norm() - 1.0).abs() < 1e-5);
        assert!(right.dot(&up).abs() < 1e-5);
    }

    #[test]
    fn test_project_points_from_x_axis() {
        let model = ModelPoints::from_points(vec![Point3::new(0.0, 2.0, 3.0)]);
        let state = CameraState::from_center_eye(Point3::origin(), Point3::new(10.0, 0.0, 0.0));

        let projected = project_points(&model, &state);

        assert_eq!(projected.len(), 1);
        let (u, v) = projected[0];
        assert!((u + 3.0).abs() < 1e-5);
        assert!((v - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_projected_half_extent() {
        let projected = vec![(1.0, -0.5), (-2.0, 0.25)];
        let extent = projected_half_extent(&projected);
        assert!((extent - 2.0 * 1.05).abs() < 1e-5);

        assert_eq!(projected_half_extent(&[]), 1.0);
        assert_eq!(projected_half_extent(&[(0.0, 0.0)]), 1.0);
    }
}
