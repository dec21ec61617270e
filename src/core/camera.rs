//! Camera state and the orbit capture loop.
//!
//! The capture loop drives a live viewer through the deterministic
//! viewpoint sequence: for each sampled offset it moves the eye, re-fits
//! the model, refreshes the view, and dumps one frame. Frame files are
//! named by inserting `_<index>` before the image extension, so view `i`
//! of `part.jpeg` is always `part_<i>.jpeg`.

use std::path::{Path, PathBuf};

use nalgebra::{Point3, Vector3};

use super::sampler::fibonacci_sphere;
use crate::render::{Result, Viewer};

/// Camera pose of a live viewer.
///
/// `radius` is the eye-to-center distance captured when the model was
/// first framed; it becomes the sampling sphere's radius so all views are
/// equidistant from the model's apparent center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// Point the camera looks at.
    pub center: Point3<f32>,
    /// Camera position.
    pub eye: Point3<f32>,
    /// Distance from eye to center at framing time.
    pub radius: f32,
}

impl CameraState {
    /// Build a camera state, deriving the radius from the eye position.
    pub fn from_center_eye(center: Point3<f32>, eye: Point3<f32>) -> Self {
        Self {
            center,
            eye,
            radius: (eye - center).norm(),
        }
    }

    /// Unit vector from the eye towards the center.
    ///
    /// Falls back to the z axis when eye and center coincide.
    pub fn view_direction(&self) -> Vector3<f32> {
        let direction = self.center - self.eye;
        let norm = direction.norm();
        if norm <= f32::EPSILON {
            Vector3::z()
        } else {
            direction / norm
        }
    }
}

/// Derive the output path for one view frame.
///
/// Inserts `_<index>` before the extension of the base image name;
/// extension-less bases get the suffix appended. The mapping from sample
/// index to file name is stable across runs.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use multiview_pipeline::core::camera::frame_path;
///
/// let path = frame_path(Path::new("views/part/part.jpeg"), 3);
/// assert_eq!(path, Path::new("views/part/part_3.jpeg").to_path_buf());
/// ```
pub fn frame_path(base: &Path, index: usize) -> PathBuf {
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let name = match base.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, index, ext),
        None => format!("{}_{}", stem, index),
    };
    base.with_file_name(name)
}

/// Drive the viewer through the full viewpoint sequence and dump frames.
///
/// Reads the viewer's fitted camera once, samples `sample_count` offsets
/// on a sphere of that radius, and for each offset in index order: moves
/// the eye to `center + offset`, re-fits so the model stays fully framed,
/// refreshes, and dumps the frame to `frame_path(base_image, index)`.
/// `on_frame(index)` is invoked after each written frame.
///
/// # Errors
///
/// A failed frame dump aborts the remaining views and returns the error;
/// frames written before the failure stay on disk.
pub fn orbit_capture<F>(
    viewer: &mut dyn Viewer,
    base_image: &Path,
    sample_count: usize,
    mut on_frame: F,
) -> Result<usize>
where
    F: FnMut(usize),
{
    let state = viewer.camera();
    let offsets = fibonacci_sphere(sample_count, state.radius);

    let mut written = 0;
    for (index, &offset) in offsets.iter().enumerate() {
        viewer.set_eye(state.center + offset);
        viewer.fit_all();
        viewer.refresh();
        viewer.dump_frame(&frame_path(base_image, index))?;
        written += 1;
        on_frame(index);
    }

    Ok(written)
}
