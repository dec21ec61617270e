//! Core geometry: model loading, view sampling, and camera orbits.

pub mod camera;
pub mod loaders;
pub mod sampler;

pub use camera::{frame_path, CameraState};
pub use loaders::{ModelLoader, ModelPoints, StepVertexLoader};
pub use sampler::fibonacci_sphere;
