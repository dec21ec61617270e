//! Raster render backend built on the image crate.
//!
//! Maps projected vertices straight onto an RGB pixel grid with a small
//! frame margin. Has no chart scaffolding at all, which makes it the
//! fallback of choice when the chart variant cannot produce a frame.

use std::path::Path;

use image::{Rgb, RgbImage};
use nalgebra::Point3;

use crate::config::RenderOptions;
use crate::core::camera::CameraState;
use crate::core::loaders::ModelPoints;

use super::{
    ensure_parent_dirs, initial_camera, project_points, projected_half_extent, BackendError,
    RenderBackend, Result, Viewer,
};

const FRAME_MARGIN: u32 = 10;
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const POINT_COLOR: Rgb<u8> = Rgb([30, 30, 160]);

/// Backend variant splatting projected vertices into an RGB image.
pub struct RasterBackend;

impl RenderBackend for RasterBackend {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn create_viewer(
        &self,
        model: &ModelPoints,
        options: &RenderOptions,
    ) -> Result<Box<dyn Viewer>> {
        if model.is_empty() {
            return Err(BackendError::EmptyModel);
        }

        let mut viewer = RasterViewer {
            model: model.clone(),
            camera: initial_camera(model),
            frame_half_extent: 1.0,
            width: options.width,
            height: options.height,
        };
        viewer.fit_all();
        Ok(Box::new(viewer))
    }
}

struct RasterViewer {
    model: ModelPoints,
    camera: CameraState,
    frame_half_extent: f32,
    width: u32,
    height: u32,
}

impl Viewer for RasterViewer {
    fn camera(&self) -> CameraState {
        self.camera
    }

    fn set_eye(&mut self, eye: Point3<f32>) {
        self.camera = CameraState::from_center_eye(self.camera.center, eye);
    }

    fn fit_all(&mut self) {
        let projected = project_points(&self.model, &self.camera);
        self.frame_half_extent = projected_half_extent(&projected);
    }

    fn refresh(&mut self) {
        // Pixels are produced at dump time; nothing to invalidate
    }

    fn dump_frame(&mut self, path: &Path) -> Result<()> {
        ensure_parent_dirs(path)?;

        let projected = project_points(&self.model, &self.camera);
        let extent = self.frame_half_extent;

        let mut image = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        let usable_width = self.width.saturating_sub(2 * FRAME_MARGIN) as f32;
        let usable_height = self.height.saturating_sub(2 * FRAME_MARGIN) as f32;

        for (u, v) in projected {
            // View plane [-extent, extent] to pixels, v pointing up
            let px = FRAME_MARGIN as f32 + (u + extent) / (2.0 * extent) * usable_width;
            let py = FRAME_MARGIN as f32 + (extent - v) / (2.0 * extent) * usable_height;
            splat(&mut image, px as i64, py as i64);
        }

        image.save(path).map_err(|e| BackendError::FrameWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(())
    }
}

/// Draws a 2x2 point marker, skipping pixels outside the frame.
fn splat(image: &mut RgbImage, x: i64, y: i64) {
    for dy in 0..2 {
        for dx in 0..2 {
            let (px, py) = (x + dx, y + dy);
            if px >= 0 && py >= 0 && (px as u32) < image.width() && (py as u32) < image.height() {
                image.put_pixel(px as u32, py as u32, POINT_COLOR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_model() -> ModelPoints {
        ModelPoints::from_points(vec![
            Point3::new(-2.0, 0.0, 1.0),
            Point3::new(2.0, 1.0, -1.0),
            Point3::new(0.0, -1.5, 0.5),
        ])
    }

    fn small_options() -> RenderOptions {
        RenderOptions {
            width: 120,
            height: 120,
            image_ext: "jpeg".to_string(),
        }
    }

    #[test]
    fn test_create_viewer_rejects_empty_model() {
        let empty = ModelPoints::from_points(Vec::new());
        let result = RasterBackend.create_viewer(&empty, &small_options());
        assert!(matches!(result, Err(BackendError::EmptyModel)));
    }

    #[test]
    fn test_dump_frame_writes_decodable_jpeg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("part_0.jpeg");

        let mut viewer = RasterBackend
            .create_viewer(&sample_model(), &small_options())
            .unwrap();
        viewer.refresh();
        viewer.dump_frame(&path).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.width(), 120);
        assert_eq!(decoded.height(), 120);
    }

    #[test]
    fn test_dump_frame_marks_point_pixels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dots.png");

        let mut viewer = RasterBackend
            .create_viewer(
                &sample_model(),
                &RenderOptions {
                    width: 120,
                    height: 120,
                    image_ext: "png".to_string(),
                },
            )
            .unwrap();
        viewer.dump_frame(&path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgb8();
        let marked = decoded
            .pixels()
            .filter(|pixel| pixel.0 != BACKGROUND.0)
            .count();
        assert!(marked >= 3);
    }

    #[test]
    fn test_tiny_frame_does_not_panic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.png");

        let mut viewer = RasterBackend
            .create_viewer(
                &sample_model(),
                &RenderOptions {
                    width: 16,
                    height: 16,
                    image_ext: "png".to_string(),
                },
            )
            .unwrap();
        viewer.dump_frame(&path).unwrap();
        assert!(path.exists());
    }
}
