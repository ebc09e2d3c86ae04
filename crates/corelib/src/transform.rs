use crate::{Mat4, Vec3};

/// Spin rate applied around the selected axis, degrees per second.
pub const ROTATION_DEG_PER_SEC: f32 = 50.0;
/// Model-space X offset between consecutive instances.
pub const INSTANCE_OFFSET_X: f32 = 1.5;
pub const DEFAULT_SCALE: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RotationAxis {
    X,
    Y,
    Z,
}

impl RotationAxis {
    #[inline]
    pub fn unit(self) -> Vec3 {
        match self {
            RotationAxis::X => Vec3::X,
            RotationAxis::Y => Vec3::Y,
            RotationAxis::Z => Vec3::Z,
        }
    }
}

/// Keyboard-driven model transform: translation, scale and an optional
/// continuous spin around one principal axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelTransform {
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation_axis: Option<RotationAxis>,
}

impl ModelTransform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation_axis: None,
        }
    }

    #[inline]
    pub fn with_uniform_scale(scale: f32) -> Self {
        Self {
            scale: Vec3::splat(scale),
            ..Self::identity()
        }
    }

    /// Build matrix = T * S * R(axis, elapsed * rate).
    pub fn matrix(&self, elapsed_secs: f32) -> Mat4 {
        let base = Mat4::from_translation(self.position) * Mat4::from_scale(self.scale);
        match self.rotation_axis {
            Some(axis) => {
                let angle = (elapsed_secs * ROTATION_DEG_PER_SEC).to_radians();
                base * Mat4::from_axis_angle(axis.unit(), angle)
            }
            None => base,
        }
    }

    /// Matrices for `count` copies, each shifted by [`INSTANCE_OFFSET_X`]
    /// in the previous one's model space.
    pub fn instance_matrices(&self, elapsed_secs: f32, count: usize) -> Vec<Mat4> {
        let first = self.matrix(elapsed_secs);
        (0..count)
            .map(|i| first * Mat4::from_translation(Vec3::new(INSTANCE_OFFSET_X * i as f32, 0.0, 0.0)))
            .collect()
    }
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self::with_uniform_scale(DEFAULT_SCALE)
    }
}
