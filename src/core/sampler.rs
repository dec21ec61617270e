//! Deterministic viewpoint sampling on a sphere.
//!
//! This module places N camera positions near-uniformly on a sphere using
//! the golden-angle (Fibonacci) spiral. The sequence for a given
//! `(samples, radius)` pair is fully deterministic, so re-running the
//! pipeline reproduces the same viewpoints for every model.

use std::f32::consts::PI;

use nalgebra::Vector3;

/// Distribute points on a sphere surface using the Fibonacci spiral.
///
/// Latitudes are spaced linearly in `y` from `+radius` down to `-radius`,
/// and longitudes advance by the golden angle `π·(3 − √5)` per point, which
/// avoids periodic clustering for any sample count.
///
/// Edge cases are defined rather than left to the formulas: `samples == 0`
/// returns an empty vector, and `samples == 1` returns the single point
/// `(radius, 0, 0)` (the latitude formula would otherwise divide by zero).
///
/// # Arguments
///
/// * `samples` - Number of points to generate
/// * `radius` - Sphere radius; every returned point lies at this distance
///   from the origin
///
/// # Returns
///
/// A vector of exactly `samples` offset vectors, ordered by index.
///
/// # Example
///
/// ```
/// use multiview_pipeline::core::sampler::fibonacci_sphere;
///
/// let points = fibonacci_sphere(36, 10.0);
/// assert_eq!(points.len(), 36);
/// ```
pub fn fibonacci_sphere(samples: usize, radius: f32) -> Vec<Vector3<f32>> {
    if samples == 0 {
        return Vec::new();
    }
    if samples == 1 {
        return vec![Vector3::new(radius, 0.0, 0.0)];
    }

    let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
    let mut points = Vec::with_capacity(samples);

    for i in 0..samples {
        // y runs linearly from +radius (i = 0) to -radius (i = samples - 1)
        let y = (1.0 - 2.0 * i as f32 / (samples - 1) as f32) * radius;

        // Radius of the latitude band; clamp against rounding underflow
        let band = (radius * radius - y * y).max(0.0).sqrt();

        let theta = i as f32 * golden_angle;
        let x = band * theta.cos();
        let z = band * theta.sin();

        points.push(Vector3::new(x, y, z));
    }

    points
}
