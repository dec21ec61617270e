//! Chart render backend built on plotters.
//!
//! Projects the model's vertices into the view plane and draws them as a
//! scatter chart with a square coordinate range, so every orbit frame of
//! one model shares the same scale until the next fit.

use std::path::Path;

use nalgebra::Point3;
use plotters::prelude::*;

use crate::config::RenderOptions;
use crate::core::camera::CameraState;
use crate::core::loaders::ModelPoints;

use super::{
    ensure_parent_dirs, initial_camera, project_points, projected_half_extent, BackendError,
    RenderBackend, Result, Viewer,
};

/// Backend variant rendering frames as plotters scatter charts.
pub struct ChartBackend;

impl RenderBackend for ChartBackend {
    fn name(&self) -> &'static str {
        "chart"
    }

    fn create_viewer(
        &self,
        model: &ModelPoints,
        options: &RenderOptions,
    ) -> Result<Box<dyn Viewer>> {
        if model.is_empty() {
            return Err(BackendError::EmptyModel);
        }

        let mut viewer = ChartViewer {
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

struct ChartViewer {
    model: ModelPoints,
    camera: CameraState,
    frame_half_extent: f32,
    width: u32,
    height: u32,
}

impl Viewer for ChartViewer {
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
        // Projection happens at dump time; nothing to invalidate
    }

    fn dump_frame(&mut self, path: &Path) -> Result<()> {
        ensure_parent_dirs(path)?;

        let projected = project_points(&self.model, &self.camera);
        let extent = self.frame_half_extent;

        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| BackendError::Render(e.to_string()))?;

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(-extent..extent, -extent..extent)
            .map_err(|e| BackendError::Render(e.to_string()))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .draw()
            .map_err(|e| BackendError::Render(e.to_string()))?;

        chart
            .draw_series(
                projected
                    .iter()
                    .map(|&(u, v)| Circle::new((u, v), 2, BLUE.filled())),
            )
            .map_err(|e| BackendError::Render(e.to_string()))?;

        root.present().map_err(|e| BackendError::FrameWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sample_model() -> ModelPoints {
        ModelPoints::from_points(vec![
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.5, -0.5, 0.0),
            Point3::new(-0.25, 0.75, 0.5),
        ])
    }

    fn small_options() -> RenderOptions {
        RenderOptions {
            width: 200,
            height: 200,
            image_ext: "png".to_string(),
        }
    }

    #[test]
    fn test_create_viewer_rejects_empty_model() {
        let empty = ModelPoints::from_points(Vec::new());
        let result = ChartBackend.create_viewer(&empty, &small_options());
        assert!(matches!(result, Err(BackendError::EmptyModel)));
    }

    #[test]
    fn test_dump_frame_writes_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frames").join("part_0.png");

        let mut viewer = ChartBackend
            .create_viewer(&sample_model(), &small_options())
            .unwrap();
        viewer.refresh();
        viewer.dump_frame(&path).unwrap();

        assert!(path.exists());
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_fit_all_tracks_eye_changes() {
        let model = ModelPoints::from_points(vec![
            Point3::new(-10.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]);

        let mut viewer = ChartViewer {
            model: model.clone(),
            camera: initial_camera(&model),
            frame_half_extent: 1.0,
            width: 200,
            height: 200,
        };

        viewer.fit_all();
        let diagonal_extent = viewer.frame_half_extent;

        // Looking straight down the long axis shrinks the footprint
        viewer.set_eye(Point3::new(30.0, 0.0, 0.0));
        viewer.fit_all();
        let end_on_extent = viewer.frame_half_extent;

        assert!(end_on_extent < diagonal_extent);
    }
}
