//! Backend-neutral input state.
//!
//! The platform layer translates window events into [`InputEvent`]s and feeds
//! them to [`InputState::update_state`]. Once per frame
//! [`InputState::apply_state`] turns the accumulated state into camera and
//! model changes.

use std::collections::HashSet;

use crate::Vec3;
use crate::camera::{CameraMovement, FlyCamera};
use crate::transform::{ModelTransform, RotationAxis};

/// Model translation speed, units per second.
pub const MODEL_MOVE_SPEED: f32 = 0.6;
/// Relative scale change per second while a scale key is held.
pub const MODEL_SCALE_RATE: f32 = 0.6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    I,
    J,
    U,
    P,
    X,
    Y,
    Z,
    Escape,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Repeat,
    Release,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    Key { key: Key, action: KeyAction },
    /// Absolute cursor position in window pixels (y grows downwards).
    CursorMoved { x: f64, y: f64 },
    /// Raw pointer motion in device units (y grows downwards), unbounded by
    /// the window edge.
    MouseMotion { dx: f64, dy: f64 },
    /// Vertical scroll in lines, positive away from the user.
    Scroll { dy: f32 },
    FocusLost,
}

/// Turns absolute cursor positions into look deltas.
///
/// The first position after construction or [`MouseTracker::reset`] seeds the
/// tracker and yields a zero delta.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MouseTracker {
    last: Option<(f64, f64)>,
}

impl MouseTracker {
    /// Returns `(x - last_x, last_y - y)`.
    pub fn delta(&mut self, x: f64, y: f64) -> (f32, f32) {
        let (last_x, last_y) = self.last.unwrap_or((x, y));
        self.last = Some((x, y));
        ((x - last_x) as f32, (last_y - y) as f32)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn is_seeded(&self) -> bool {
        self.last.is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct InputState {
    fly_camera: bool,
    cursor_captured: bool,
    held: HashSet<Key>,
    mouse: MouseTracker,
    pending_look: Vec<(f32, f32)>,
    pending_scroll: Vec<f32>,
    axis_request: Option<RotationAxis>,
    quit_requested: bool,
}

impl InputState {
    /// With `fly_camera` set, W/A/S/D and the mouse drive the camera instead
    /// of the model.
    pub fn new(fly_camera: bool) -> Self {
        Self {
            fly_camera,
            ..Self::default()
        }
    }

    pub fn fly_camera(&self) -> bool {
        self.fly_camera
    }

    /// While captured, look deltas come from [`InputEvent::MouseMotion`] and
    /// absolute cursor positions only keep the tracker current.
    pub fn set_cursor_captured(&mut self, captured: bool) {
        self.cursor_captured = captured;
    }

    pub fn cursor_captured(&self) -> bool {
        self.cursor_captured
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn update_state(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::Key { key, action } => self.on_key(key, action),
            InputEvent::CursorMoved { x, y } => {
                let delta = self.mouse.delta(x, y);
                if self.fly_camera && !self.cursor_captured && delta != (0.0, 0.0) {
                    self.pending_look.push(delta);
                }
            }
            InputEvent::MouseMotion { dx, dy } => {
                if self.fly_camera && self.cursor_captured && (dx, dy) != (0.0, 0.0) {
                    self.pending_look.push((dx as f32, -dy as f32));
                }
            }
            InputEvent::Scroll { dy } => {
                if self.fly_camera {
                    self.pending_scroll.push(dy);
                }
            }
            InputEvent::FocusLost => {
                self.cursor_captured = false;
                self.held.clear();
                self.mouse.reset();
            }
        }
    }

    fn on_key(&mut self, key: Key, action: KeyAction) {
        match (key, action) {
            (Key::Escape, KeyAction::Press) => self.quit_requested = true,
            (Key::X, KeyAction::Press) => self.axis_request = Some(RotationAxis::X),
            (Key::Y, KeyAction::Press) => self.axis_request = Some(RotationAxis::Y),
            (Key::Z, KeyAction::Press) => self.axis_request = Some(RotationAxis::Z),
            (_, KeyAction::Press | KeyAction::Repeat) => {
                self.held.insert(key);
            }
            (_, KeyAction::Release) => {
                self.held.remove(&key);
            }
        }
    }

    /// Drains queued look/scroll events and applies held keys for `dt` seconds.
    pub fn apply_state(&mut self, camera: &mut FlyCamera, model: &mut ModelTransform, dt: f32) {
        if let Some(axis) = self.axis_request.take() {
            model.rotation_axis = Some(axis);
        }

        if self.fly_camera() {
            for (key, movement) in [
                (Key::W, CameraMovement::Forward),
                (Key::S, CameraMovement::Backward),
                (Key::A, CameraMovement::Left),
                (Key::D, CameraMovement::Right),
            ] {
                if self.is_held(key) {
                    camera.process_keyboard(movement, dt);
                }
            }
            for (dx, dy) in self.pending_look.drain(..) {
                camera.process_mouse_movement(dx, dy);
            }
            for dy in self.pending_scroll.drain(..) {
                camera.process_mouse_scroll(dy);
            }
        } else {
            self.pending_look.clear();
            self.pending_scroll.clear();
        }

        let step = MODEL_MOVE_SPEED * dt;
        let mut shift = Vec3::ZERO;
        if !self.fly_camera {
            for (key, dir) in [
                (Key::W, Vec3::Y),
                (Key::S, Vec3::NEG_Y),
                (Key::D, Vec3::X),
                (Key::A, Vec3::NEG_X),
            ] {
                if self.is_held(key) {
                    shift += dir;
                }
            }
        }
        if self.is_held(Key::I) {
            shift += Vec3::Z;
        }
        if self.is_held(Key::J) {
            shift += Vec3::NEG_Z;
        }
        model.position += shift * step;

        if self.is_held(Key::U) {
            model.scale *= 1.0 + MODEL_SCALE_RATE * dt;
        }
        if self.is_held(Key::P) {
            model.scale *= 1.0 - MODEL_SCALE_RATE * dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, action: KeyAction) -> InputEvent {
        InputEvent::Key { key, action }
    }

    #[test]
    fn first_cursor_position_seeds_tracker() {
        let mut tracker = MouseTracker::default();
        assert!(!tracker.is_seeded());
        assert_eq!(tracker.delta(640.0, 360.0), (0.0, 0.0));
        assert!(tracker.is_seeded());
        // y is inverted: moving the cursor up yields a positive dy.
        assert_eq!(tracker.delta(650.0, 350.0), (10.0, 10.0));
    }

    #[test]
    fn first_mouse_event_does_not_jump_camera() {
        let mut input = InputState::new(true);
        let mut camera = FlyCamera::default();
        let before = camera;
        let mut model = ModelTransform::default();

        input.update_state(&InputEvent::CursorMoved { x: 1900.0, y: 20.0 });
        input.apply_state(&mut camera, &mut model, 0.016);
        assert_eq!(camera, before);

        input.update_state(&InputEvent::CursorMoved { x: 1910.0, y: 20.0 });
        input.apply_state(&mut camera, &mut model, 0.016);
        assert!((camera.yaw() - (before.yaw() + 1.0)).abs() < 1e-5);
    }

    #[test]
    fn rotation_axis_selection_is_exclusive() {
        let mut input = InputState::new(false);
        let mut camera = FlyCamera::default();
        let mut model = ModelTransform::default();

        input.update_state(&key(Key::X, KeyAction::Press));
        input.apply_state(&mut camera, &mut model, 0.0);
        assert_eq!(model.rotation_axis, Some(RotationAxis::X));

        input.update_state(&key(Key::Z, KeyAction::Press));
        input.apply_state(&mut camera, &mut model, 0.0);
        assert_eq!(model.rotation_axis, Some(RotationAxis::Z));

        // Release and repeat do not change the selection.
        input.update_state(&key(Key::Y, KeyAction::Repeat));
        input.update_state(&key(Key::Y, KeyAction::Release));
        input.apply_state(&mut camera, &mut model, 0.0);
        assert_eq!(model.rotation_axis, Some(RotationAxis::Z));
    }

    #[test]
    fn held_keys_move_model_without_fly_camera() {
        let mut input = InputState::new(false);
        let mut camera = FlyCamera::default();
        let cam_before = camera;
        let mut model = ModelTransform::default();

        input.update_state(&key(Key::W, KeyAction::Press));
        input.update_state(&key(Key::D, KeyAction::Repeat));
        input.apply_state(&mut camera, &mut model, 1.0);
        assert!(model.position.abs_diff_eq(Vec3::new(0.6, 0.6, 0.0), 1e-6));
        assert_eq!(camera, cam_before);

        input.update_state(&key(Key::W, KeyAction::Release));
        input.update_state(&key(Key::D, KeyAction::Release));
        input.apply_state(&mut camera, &mut model, 1.0);
        assert!(model.position.abs_diff_eq(Vec3::new(0.6, 0.6, 0.0), 1e-6));
    }

    #[test]
    fn wasd_drives_camera_in_fly_mode() {
        let mut input = InputState::new(true);
        let mut camera = FlyCamera::new(Vec3::ZERO);
        let mut model = ModelTransform::default();
        let model_before = model;

        input.update_state(&key(Key::W, KeyAction::Press));
        input.apply_state(&mut camera, &mut model, 0.5);
        assert!(camera.position.z < 0.0);
        assert_eq!(model, model_before);
    }

    #[test]
    fn scale_keys_compound_per_frame() {
        let mut input = InputState::new(true);
        let mut camera = FlyCamera::default();
        let mut model = ModelTransform::with_uniform_scale(1.0);

        input.update_state(&key(Key::U, KeyAction::Press));
        input.apply_state(&mut camera, &mut model, 0.5);
        assert!((model.scale.x - 1.3).abs() < 1e-6);

        input.update_state(&key(Key::U, KeyAction::Release));
        input.update_state(&key(Key::P, KeyAction::Press));
        input.apply_state(&mut camera, &mut model, 0.5);
        assert!((model.scale.x - 1.3 * 0.7).abs() < 1e-6);
    }

    #[test]
    fn look_events_apply_in_order_with_clamp() {
        let mut input = InputState::new(true);
        let mut camera = FlyCamera::default();
        let mut model = ModelTransform::default();

        input.update_state(&InputEvent::CursorMoved { x: 0.0, y: 0.0 });
        // +1000 px up then 10 px down: clamp to 89 first, then 88.
        input.update_state(&InputEvent::CursorMoved { x: 0.0, y: -1000.0 });
        input.update_state(&InputEvent::CursorMoved { x: 0.0, y: -990.0 });
        input.apply_state(&mut camera, &mut model, 0.0);
        assert!((camera.pitch() - 88.0).abs() < 1e-4);
    }

    #[test]
    fn scroll_is_ignored_without_fly_camera() {
        let mut input = InputState::new(false);
        let mut camera = FlyCamera::default();
        let mut model = ModelTransform::default();
        input.update_state(&InputEvent::Scroll { dy: 10.0 });
        input.apply_state(&mut camera, &mut model, 0.0);
        assert_eq!(camera.zoom(), crate::camera::ZOOM);
    }

    #[test]
    fn focus_loss_releases_keys_and_reseeds_mouse() {
        let mut input = InputState::new(true);
        input.update_state(&key(Key::A, KeyAction::Press));
        input.update_state(&InputEvent::CursorMoved { x: 5.0, y: 5.0 });
        input.update_state(&InputEvent::FocusLost);
        assert!(!input.is_held(Key::A));

        let mut camera = FlyCamera::default();
        let before = camera;
        let mut model = ModelTransform::default();
        input.update_state(&InputEvent::CursorMoved { x: 500.0, y: 500.0 });
        input.apply_state(&mut camera, &mut model, 0.1);
        assert_eq!(camera, before);
    }

    #[test]
    fn captured_cursor_looks_with_raw_motion() {
        let mut input = InputState::new(true);
        input.set_cursor_captured(true);
        let mut camera = FlyCamera::default();
        let before = camera;
        let mut model = ModelTransform::default();

        // Pinned at the window edge: positions stop changing, motion does not.
        input.update_state(&InputEvent::CursorMoved { x: 1279.0, y: 360.0 });
        for _ in 0..20 {
            input.update_state(&InputEvent::CursorMoved { x: 1279.0, y: 360.0 });
            input.update_state(&InputEvent::MouseMotion { dx: 100.0, dy: 0.0 });
        }
        input.apply_state(&mut camera, &mut model, 0.016);
        assert!((camera.yaw() - (before.yaw() + 200.0)).abs() < 1e-3);

        // Device y grows downwards; moving down looks down.
        input.update_state(&InputEvent::MouseMotion { dx: 0.0, dy: 50.0 });
        input.apply_state(&mut camera, &mut model, 0.016);
        assert!((camera.pitch() + 5.0).abs() < 1e-4);
    }

    #[test]
    fn raw_motion_is_ignored_until_captured() {
        let mut input = InputState::new(true);
        assert!(!input.cursor_captured());
        let mut camera = FlyCamera::default();
        let before = camera;
        let mut model = ModelTransform::default();

        input.update_state(&InputEvent::MouseMotion { dx: 30.0, dy: 30.0 });
        input.apply_state(&mut camera, &mut model, 0.016);
        assert_eq!(camera, before);

        input.set_cursor_captured(true);
        input.update_state(&InputEvent::FocusLost);
        assert!(!input.cursor_captured());
        input.update_state(&InputEvent::MouseMotion { dx: 30.0, dy: 30.0 });
        input.apply_state(&mut camera, &mut model, 0.016);
        assert_eq!(camera, before);
    }

    #[test]
    fn only_fly_mode_reports_fly_camera() {
        assert!(InputState::new(true).fly_camera());
        assert!(!InputState::new(false).fly_camera());
    }

    #[test]
    fn escape_requests_quit() {
        let mut input = InputState::new(false);
        assert!(!input.quit_requested());
        input.update_state(&key(Key::Escape, KeyAction::Press));
        assert!(input.quit_requested());
    }
}
