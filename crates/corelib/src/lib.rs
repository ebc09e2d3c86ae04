//! Core types: math re-exports, fly camera, model transform, input state.

pub use glam::{Mat4, Vec3, vec3};

pub mod camera;
pub mod error;
pub mod exercise;
pub mod frame;
pub mod input;
pub mod transform;

pub use error::{CoreError, CoreResult};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_pv_is_finite() {
        let cam = camera::FlyCamera::looking_at(vec3(0.0, 0.0, 4.0), Vec3::ZERO);
        let pv = cam.projection_matrix(16.0 / 9.0, frame::Z_NEAR, frame::Z_FAR) * cam.view_matrix();
        let a = pv.to_cols_array();
        assert!(a.iter().all(|f| f.is_finite()));
    }
}
