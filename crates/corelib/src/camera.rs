use crate::{Mat4, Vec3};

/// Default yaw in degrees: looking down -Z.
pub const YAW: f32 = -90.0;
pub const PITCH: f32 = 0.0;
pub const SPEED: f32 = 2.5;
pub const SENSITIVITY: f32 = 0.1;
/// Default vertical field of view in degrees.
pub const ZOOM: f32 = 45.0;

pub const PITCH_LIMIT: f32 = 89.0;
pub const ZOOM_MIN: f32 = 1.0;
pub const ZOOM_MAX: f32 = 45.0;

/// Keyboard-driven translation directions. There is no vertical fly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Free-fly yaw/pitch camera (right-handed, angles in degrees).
///
/// `front`, `right` and `up` are derived from yaw/pitch and refreshed on
/// every orientation change, so they are only exposed through getters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlyCamera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    zoom: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
}

impl FlyCamera {
    pub fn new(position: Vec3) -> Self {
        Self::with_orientation(position, Vec3::Y, YAW, PITCH)
    }

    pub fn with_orientation(position: Vec3, world_up: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: world_up,
            right: Vec3::X,
            world_up,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            zoom: ZOOM,
            movement_speed: SPEED,
            mouse_sensitivity: SENSITIVITY,
        };
        camera.update_vectors();
        camera
    }

    /// Camera at `eye` oriented towards `target` (Y up).
    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        let dir = (target - eye).normalize_or(Vec3::NEG_Z);
        let pitch = dir.y.clamp(-1.0, 1.0).asin().to_degrees();
        let yaw = dir.z.atan2(dir.x).to_degrees();
        Self::with_orientation(eye, Vec3::Y, yaw, pitch)
    }

    #[inline]
    pub fn front(&self) -> Vec3 {
        self.front
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.right
    }

    #[inline]
    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    #[inline]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    #[inline]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Field of view in degrees.
    #[inline]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Look-at view matrix. Not cached.
    #[inline]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.world_up)
    }

    /// Perspective projection from the current zoom, depth range [0,1].
    #[inline]
    pub fn projection_matrix(&self, aspect: f32, z_near: f32, z_far: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect.max(1e-6), z_near, z_far)
    }

    pub fn process_keyboard(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// `dy` must already be inverted by the caller (`last_y - current_y`).
    pub fn process_mouse_movement(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.mouse_sensitivity;
        self.pitch = (self.pitch + dy * self.mouse_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    pub fn process_mouse_scroll(&mut self, dy: f32) {
        self.zoom = (self.zoom - dy).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(pitch.cos() * yaw.cos(), pitch.sin(), pitch.cos() * yaw.sin())
            .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 3.0))
    }
}
