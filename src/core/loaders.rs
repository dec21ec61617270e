//! Model loading seam and the bundled STEP vertex harvester.
//!
//! The pipeline only ever talks to a [`ModelLoader`], which turns a source
//! file into a [`ModelPoints`] handle. The bundled [`StepVertexLoader`]
//! harvests `CARTESIAN_POINT` coordinates from STEP part 21 text with a
//! lexical scan; it does not parse or validate the STEP structure, it
//! only recovers enough geometry to frame and project the model.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use nalgebra::Point3;
use thiserror::Error;

/// Errors that can occur while loading a model file.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no usable geometry in '{path}'")]
    NoGeometry { path: PathBuf },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Vertex-set handle for a loaded model.
#[derive(Debug, Clone)]
pub struct ModelPoints {
    /// Harvested vertex positions.
    pub points: Vec<Point3<f32>>,
}

impl ModelPoints {
    /// Creates a handle from a vertex list.
    pub fn from_points(points: Vec<Point3<f32>>) -> Self {
        Self { points }
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the model has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Axis-aligned bounding box as `(min, max)` corners.
    pub fn bounding_box(&self) -> (Point3<f32>, Point3<f32>) {
        if self.points.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = self.points[0];
        let mut max = self.points[0];
        for point in &self.points[1..] {
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            min.z = min.z.min(point.z);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
            max.z = max.z.max(point.z);
        }

        (min, max)
    }

    /// Center of the bounding box.
    pub fn center(&self) -> Point3<f32> {
        let (min, max) = self.bounding_box();
        Point3::new(
            (min.x + max.x) / 2.0,
            (min.y + max.y) / 2.0,
            (min.z + max.z) / 2.0,
        )
    }

    /// Largest distance from the center to any vertex.
    ///
    /// Degenerate clouds (single vertex, or all vertices coincident)
    /// report `1.0` so framing math stays finite.
    pub fn half_extent(&self) -> f32 {
        if self.points.is_empty() {
            return 1.0;
        }

        let center = self.center();
        let extent = self
            .points
            .iter()
            .map(|point| (point - center).norm())
            .fold(0.0_f32, f32::max);

        if extent <= f32::EPSILON {
            1.0
        } else {
            extent
        }
    }
}

/// Opens a CAD source file and produces a renderable vertex handle.
pub trait ModelLoader {
    /// Load the model at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Io`] when the file cannot be read and
    /// [`LoaderError::NoGeometry`] when nothing renderable was found.
    fn load(&self, path: &Path) -> Result<ModelPoints>;
}

/// Returns true for the recognized model extensions (`.stp`, `.step`).
pub fn is_model_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("stp") || ext.eq_ignore_ascii_case("step"))
        .unwrap_or(false)
}

/// Bundled loader that harvests vertex coordinates from STEP text.
#[derive(Debug, Default)]
pub struct StepVertexLoader;

impl ModelLoader for StepVertexLoader {
    fn load(&self, path: &Path) -> Result<ModelPoints> {
        let text = fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let points = harvest_cartesian_points(&text);
        if points.is_empty() {
            return Err(LoaderError::NoGeometry {
                path: path.to_path_buf(),
            });
        }

        debug!(
            "harvested {} cartesian points from {}",
            points.len(),
            path.display()
        );
        Ok(ModelPoints::from_points(points))
    }
}

/// Collect every `CARTESIAN_POINT` coordinate tuple in the file text.
///
/// Occurrences that do not carry a parseable tuple are skipped.
fn harvest_cartesian_points(text: &str) -> Vec<Point3<f32>> {
    let mut points = Vec::new();
    for (pos, _) in text.match_indices("CARTESIAN_POINT") {
        if let Some(point) = extract_coordinate_tuple(&text[pos..]) {
            points.push(point);
        }
    }
    points
}

/// Pull `(x, y, z)` out of one `CARTESIAN_POINT('name',(x,y,z))` entity.
///
/// Two-dimensional points (drawing geometry) get `z = 0`.
fn extract_coordinate_tuple(entity: &str) -> Option<Point3<f32>> {
    let outer = entity.find('(')?;
    let inner = entity[outer + 1..].find('(')? + outer + 1;
    let close = entity[inner..].find(')')? + inner;
    let tuple = &entity[inner + 1..close];

    let mut values = tuple.split(',').map(parse_step_float);
    let x = values.next()??;
    let y = values.next()??;
    let z = match values.next() {
        Some(value) => value?,
        None => 0.0,
    };

    Some(Point3::new(x, y, z))
}

/// Parse one STEP real.
///
/// STEP allows a bare decimal point before the exponent (`1.E+01`); when
/// the straight parse rejects that form, retry with a zero patched in.
fn parse_step_float(token: &str) -> Option<f32> {
    let trimmed = token.trim();
    if let Ok(value) = trimmed.parse::<f32>() {
        return Some(value);
    }
    let patched = trimmed.replace(".E", ".0E").replace(".e", ".0e");
    patched.parse::<f32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn step_fixture(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ISO-10303-21;").unwrap();
        writeln!(file, "HEADER;").unwrap();
        writeln!(file, "FILE_DESCRIPTION((''),'2;1');").unwrap();
        writeln!(file, "ENDSEC;").unwrap();
        writeln!(file, "DATA;").unwrap();
        writeln!(file, "{}", body).unwrap();
        writeln!(file, "ENDSEC;").unwrap();
        writeln!(file, "END-ISO-10303-21;").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_harvest_basic_points() {
        let text = "#10=CARTESIAN_POINT('',(0.,0.,0.));\n\
                    #11=CARTESIAN_POINT('origin shifted',(2.,4.,6.));";
        let points = harvest_cartesian_points(text);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(points[1], Point3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn test_harvest_step_exponent_form() {
        let text = "#12=CARTESIAN_POINT('',(1.E+01,-5.,2.5));";
        let points = harvest_cartesian_points(text);

        assert_eq!(points.len(), 1);
        assert!((points[0].x - 10.0).abs() < 1e-6);
        assert!((points[0].y + 5.0).abs() < 1e-6);
        assert!((points[0].z - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_harvest_two_dimensional_point() {
        let points = harvest_cartesian_points("#2=CARTESIAN_POINT('',(3.,4.));");

        assert_eq!(points.len(), 1);
        assert_eq!(points[0], Point3::new(3.0, 4.0, 0.0));
    }

    #[test]
    fn test_harvest_skips_malformed_entity() {
        let text = "#1=CARTESIAN_POINT('',(not,a,number));\n\
                    #2=CARTESIAN_POINT('',(1.,2.,3.));";
        let points = harvest_cartesian_points(text);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0], Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_parse_step_float() {
        assert_eq!(parse_step_float(" 1.5 "), Some(1.5));
        assert_eq!(parse_step_float("-2."), Some(-2.0));
        assert_eq!(parse_step_float("1.E+01"), Some(10.0));
        assert_eq!(parse_step_float("word"), None);
    }

    #[test]
    fn test_loader_reads_step_file() {
        let file = step_fixture(
            "#10=CARTESIAN_POINT('',(0.,0.,0.));\n#11=CARTESIAN_POINT('',(2.,4.,6.));",
        );

        let model = StepVertexLoader.load(file.path()).unwrap();
        assert_eq!(model.len(), 2);
    }

    #[test]
    fn test_loader_missing_file() {
        let result = StepVertexLoader.load(Path::new("definitely/not/here.stp"));
        assert!(matches!(result, Err(LoaderError::Io { .. })));
    }

    #[test]
    fn test_loader_no_geometry() {
        let file = step_fixture("#10=SHAPE_REPRESENTATION('',(),#5);");
        let result = StepVertexLoader.load(file.path());
        assert!(matches!(result, Err(LoaderError::NoGeometry { .. })));
    }

    #[test]
    fn test_bounding_box_and_center() {
        let model = ModelPoints::from_points(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 4.0, 6.0),
        ]);

        let (min, max) = model.bounding_box();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(2.0, 4.0, 6.0));
        assert_eq!(model.center(), Point3::new(1.0, 2.0, 3.0));

        let expected = (1.0f32 + 4.0 + 9.0).sqrt();
        assert!((model.half_extent() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_half_extent_degenerate() {
        let single = ModelPoints::from_points(vec![Point3::new(5.0, 5.0, 5.0)]);
        assert_eq!(single.half_extent(), 1.0);

        let empty = ModelPoints::from_points(Vec::new());
        assert_eq!(empty.half_extent(), 1.0);
    }

    #[test]
    fn test_is_model_file() {
        assert!(is_model_file(Path::new("part.stp")));
        assert!(is_model_file(Path::new("part.STEP")));
        assert!(is_model_file(Path::new("nested/part.Step")));
        assert!(!is_model_file(Path::new("part.txt")));
        assert!(!is_model_file(Path::new("part")));
    }
}
