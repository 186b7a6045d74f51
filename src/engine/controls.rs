//! Orbit camera controls.
//!
//! The camera circles `target` on a sphere. Rotation, dolly and pan requests build up
//! deltas that `update` applies once per tick, either at once or, with damping, as a
//! decaying tail.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use winit::event::MouseButton;

use crate::engine::camera::PerspectiveCamera;
use crate::engine::user_input::InputState;

const POLAR_EPS: f32 = 1e-3;
const ZOOM_BASE: f32 = 0.95;

/// Pointer input for one update, in pixels (drag) and wheel lines.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrbitInput {
    pub rotate: (f32, f32),
    pub pan: (f32, f32),
    pub wheel: f32,
}

impl OrbitInput {
    /// Left drag rotates, right drag pans.
    pub fn from_state(state: &InputState) -> Self {
        let mut input = Self {
            wheel: state.wheel_delta,
            ..Self::default()
        };
        if state.button_down(MouseButton::Left) {
            input.rotate = state.drag_delta;
        } else if state.button_down(MouseButton::Right) {
            input.pan = state.drag_delta;
        }
        input
    }

    fn is_dragging(&self) -> bool {
        self.rotate != (0.0, 0.0) || self.pan != (0.0, 0.0)
    }
}

/// Radius, polar angle from +Y (`phi`) and azimuth around +Y from +Z (`theta`).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(v: Vec3) -> Self {
        let radius = v.length();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vec3 {
        let s = self.phi.sin() * self.radius;
        Vec3::new(s * self.theta.sin(), self.phi.cos() * self.radius, s * self.theta.cos())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,

    pub enable_damping: bool,
    pub damping_factor: f32,

    pub enable_rotate: bool,
    pub rotate_speed: f32,

    pub enable_zoom: bool,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    pub enable_pan: bool,
    pub pan_speed: f32,

    pub auto_rotate: bool,
    /// 1.0 is one full turn per 60 s at 60 updates per second.
    pub auto_rotate_speed: f32,

    pub min_polar_angle: f32,
    pub max_polar_angle: f32,

    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vec3,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            enable_damping: false,
            damping_factor: 0.05,
            enable_rotate: true,
            rotate_speed: 1.0,
            enable_zoom: true,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            enable_pan: true,
            pan_speed: 1.0,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
        }
    }
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// `factor > 1` moves the camera closer.
    pub fn dolly_in(&mut self, factor: f32) {
        self.scale /= factor;
    }

    /// Translate the target in screen space, `dx`/`dy` in pixels.
    pub fn pan(&mut self, camera: &PerspectiveCamera, dx: f32, dy: f32, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        let distance = (camera.position - self.target).length()
            * (camera.fov_y_deg.to_radians() / 2.0).tan();
        let world_per_px = 2.0 * distance / viewport_height;

        let camera_to_world = camera.view().inverse();
        let right = camera_to_world.x_axis.truncate();
        let up = camera_to_world.y_axis.truncate();

        self.pan_offset += right * (-dx * world_per_px) + up * (dy * world_per_px);
    }

    /// Feed pointer input into the pending deltas.
    pub fn handle_input(&mut self, camera: &PerspectiveCamera, input: OrbitInput, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        if self.enable_rotate && input.rotate != (0.0, 0.0) {
            let (dx, dy) = input.rotate;
            self.rotate_left(TAU * dx / viewport_height * self.rotate_speed);
            self.rotate_up(TAU * dy / viewport_height * self.rotate_speed);
        }
        if self.enable_pan && input.pan != (0.0, 0.0) {
            let (dx, dy) = input.pan;
            self.pan(camera, dx * self.pan_speed, dy * self.pan_speed, viewport_height);
        }
        if self.enable_zoom && input.wheel != 0.0 {
            self.dolly_in(ZOOM_BASE.powf(-self.zoom_speed * input.wheel));
        }
    }

    /// Auto-rotation step for one update, radians.
    pub fn auto_rotation_angle(&self) -> f32 {
        TAU / 60.0 / 60.0 * self.auto_rotate_speed
    }

    /// Apply pending deltas to `camera` and point it at the target.
    ///
    /// `time_scale` stretches auto-rotation only; damping decays per update.
    /// Returns `true` if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera, time_scale: f32, dragging: bool) -> bool {
        let before = camera.position;

        if self.auto_rotate && !dragging {
            self.rotate_left(self.auto_rotation_angle() * time_scale);
        }

        let mut s = Spherical::from_offset(camera.position - self.target);

        if self.enable_damping {
            s.theta += self.delta_theta * self.damping_factor;
            s.phi += self.delta_phi * self.damping_factor;
            self.target += self.pan_offset * self.damping_factor;
        } else {
            s.theta += self.delta_theta;
            s.phi += self.delta_phi;
            self.target += self.pan_offset;
        }

        let min_phi = self.min_polar_angle.max(POLAR_EPS);
        let max_phi = self.max_polar_angle.min(PI - POLAR_EPS);
        s.phi = s.phi.clamp(min_phi, max_phi.max(min_phi));

        s.radius = (s.radius * self.scale).clamp(self.min_distance, self.max_distance);

        camera.position = self.target + s.to_offset();
        camera.look_at(self.target);

        if self.enable_damping {
            let keep = 1.0 - self.damping_factor;
            self.delta_theta *= keep;
            self.delta_phi *= keep;
            self.pan_offset *= keep;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        camera.position.distance_squared(before) > 1e-10
    }

    /// `handle_input` followed by `update`.
    pub fn tick(
        &mut self,
        camera: &mut PerspectiveCamera,
        input: OrbitInput,
        viewport_height: f32,
        time_scale: f32,
    ) -> bool {
        self.handle_input(camera, input, viewport_height);
        self.update(camera, time_scale, input.is_dragging())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at(p: Vec3) -> PerspectiveCamera {
        PerspectiveCamera::new(60.0, 1.0, 0.1, 1000.0).with_position(p)
    }

    fn azimuth(c: &PerspectiveCamera, target: Vec3) -> f32 {
        Spherical::from_offset(c.position - target).theta
    }

    #[test]
    fn auto_rotate_turns_by_fixed_step() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 10.0));
        let mut c = OrbitControls::new(Vec3::ZERO);
        c.auto_rotate = true;
        c.auto_rotate_speed = 0.2;

        assert!(c.update(&mut cam, 1.0, false));
        let expected = -(TAU / 3600.0 * 0.2);
        assert!((azimuth(&cam, Vec3::ZERO) - expected).abs() < 1e-5);
        assert!((cam.position.length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn auto_rotate_pauses_while_dragging() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 10.0));
        let mut c = OrbitControls::new(Vec3::ZERO);
        c.auto_rotate = true;
        assert!(!c.update(&mut cam, 1.0, true));
    }

    #[test]
    fn damping_spreads_a_drag_over_later_updates() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 10.0));
        let mut c = OrbitControls::new(Vec3::ZERO);
        c.enable_damping = true;
        c.damping_factor = 0.03;

        c.rotate_left(1.0);
        c.update(&mut cam, 1.0, false);
        let first = azimuth(&cam, Vec3::ZERO);
        assert!((first + 0.03).abs() < 1e-5);

        // No more input: the camera keeps moving, by less each time.
        c.update(&mut cam, 1.0, false);
        let second = azimuth(&cam, Vec3::ZERO) - first;
        assert!((second + 0.03 * 0.97).abs() < 1e-5);
    }

    #[test]
    fn wheel_is_ignored_when_zoom_is_disabled() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 10.0));
        let mut c = OrbitControls::new(Vec3::ZERO);
        c.enable_zoom = false;
        let input = OrbitInput {
            wheel: 3.0,
            ..OrbitInput::default()
        };
        c.tick(&mut cam, input, 600.0, 1.0);
        assert!((cam.position.length() - 10.0).abs() < 1e-4);

        c.enable_zoom = true;
        let input = OrbitInput {
            wheel: 1.0,
            ..OrbitInput::default()
        };
        c.tick(&mut cam, input, 600.0, 1.0);
        assert!((cam.position.length() - 9.5).abs() < 1e-4);
    }

    #[test]
    fn pan_moves_target_only_when_enabled() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 10.0));
        let mut c = OrbitControls::new(Vec3::ZERO);
        c.enable_pan = false;
        let input = OrbitInput {
            pan: (50.0, 0.0),
            ..OrbitInput::default()
        };
        c.tick(&mut cam, input, 600.0, 1.0);
        assert_eq!(c.target, Vec3::ZERO);

        c.enable_pan = true;
        c.tick(&mut cam, input, 600.0, 1.0);
        // Dragging right moves the scene right, so the target goes left.
        assert!(c.target.x < 0.0);
        assert!((cam.position - c.target - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-3);
    }

    #[test]
    fn polar_angle_stays_off_the_poles() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 10.0));
        let mut c = OrbitControls::new(Vec3::ZERO);
        let input = OrbitInput {
            rotate: (0.0, 10_000.0),
            ..OrbitInput::default()
        };
        c.tick(&mut cam, input, 600.0, 1.0);
        assert!(cam.position.y < 10.0);
        assert!(cam.view().is_finite());
    }

    #[test]
    fn left_drag_maps_to_rotate_and_right_drag_to_pan() {
        let mut s = InputState::default();
        s.on_mouse_button(MouseButton::Right, true);
        s.on_cursor_moved(0.0, 0.0);
        s.on_cursor_moved(4.0, 2.0);
        let i = OrbitInput::from_state(&s);
        assert_eq!(i.pan, (4.0, 2.0));
        assert_eq!(i.rotate, (0.0, 0.0));
    }
}
