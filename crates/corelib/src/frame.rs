//! Per-frame timing and the matrices handed to the renderer.

use std::time::{Duration, Instant};

use crate::camera::FlyCamera;
use crate::transform::ModelTransform;
use crate::{Mat4, Vec3};

pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;
/// Upper bound on a single frame's delta, so a stall does not teleport the camera.
pub const MAX_FRAME_DT: f32 = 0.1;

/// Everything the renderer needs to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameParams {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_pos: Vec3,
    /// One model matrix per drawn instance.
    pub models: Vec<Mat4>,
}

impl FrameParams {
    pub fn compute(
        camera: &FlyCamera,
        model: &ModelTransform,
        elapsed_secs: f32,
        aspect: f32,
        instances: usize,
    ) -> Self {
        Self {
            view: camera.view_matrix(),
            projection: camera.projection_matrix(aspect, Z_NEAR, Z_FAR),
            view_pos: camera.position,
            models: model.instance_matrices(elapsed_secs, instances),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTick {
    pub dt: f32,
    pub elapsed: f32,
    /// Set once per second with the frame rate over that second.
    pub fps: Option<f32>,
}

#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    window_start: Instant,
    window_frames: u32,
}

impl FrameClock {
    pub fn new(now: Instant) -> Self {
        Self {
            start: now,
            last: now,
            window_start: now,
            window_frames: 0,
        }
    }

    pub fn tick(&mut self, now: Instant) -> FrameTick {
        let dt = now.saturating_duration_since(self.last).as_secs_f32().min(MAX_FRAME_DT);
        self.last = now;

        self.window_frames += 1;
        let window = now.saturating_duration_since(self.window_start);
        let fps = (window >= Duration::from_secs(1)).then(|| {
            let fps = self.window_frames as f32 / window.as_secs_f32();
            self.window_start = now;
            self.window_frames = 0;
            fps
        });

        FrameTick {
            dt,
            elapsed: now.saturating_duration_since(self.start).as_secs_f32(),
            fps,
        }
    }
}
