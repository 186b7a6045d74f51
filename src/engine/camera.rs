//! Perspective camera.

use glam::{Mat4, Vec3};

use crate::engine::graphics::visual_world::CameraMatrices;

/// Right-handed perspective camera, depth mapped to 0..1 for Vulkan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub up: Vec3,
    target: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_y_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            fov_y_deg,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            up: Vec3::Y,
            target: Vec3::NEG_Z,
            projection: Mat4::IDENTITY,
        };
        cam.update_projection_matrix();
        cam
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection_matrix();
    }

    /// Recompute the projection after changing fov, aspect or clip planes.
    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        // look_at_rh is undefined when eye == target.
        let target = if self.target.distance_squared(self.position) < f32::EPSILON {
            self.position + Vec3::NEG_Z
        } else {
            self.target
        };
        Mat4::look_at_rh(self.position, target, self.up)
    }

    pub fn matrices(&self) -> CameraMatrices {
        CameraMatrices {
            view: self.view().to_cols_array_2d(),
            proj: self.projection.to_cols_array_2d(),
            position: self.position.to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_change_updates_projection() {
        let mut cam = PerspectiveCamera::new(60.0, 1.0, 0.1, 1000.0);
        let before = cam.projection();
        cam.set_aspect(2.0);
        assert_eq!(cam.aspect, 2.0);
        assert_ne!(cam.projection(), before);
        // x scale is y scale / aspect
        let p = cam.projection();
        assert!((p.x_axis.x * 2.0 - p.y_axis.y).abs() < 1e-5);
    }

    #[test]
    fn view_moves_target_onto_negative_z() {
        let mut cam =
            PerspectiveCamera::new(60.0, 1.0, 0.1, 1000.0).with_position(Vec3::new(0.0, 5.0, 10.0));
        cam.look_at(Vec3::ZERO);
        let p = cam.view().transform_point3(Vec3::ZERO);
        assert!(p.x.abs() < 1e-5);
        assert!(p.y.abs() < 1e-5);
        assert!((p.z + Vec3::new(0.0, 5.0, 10.0).length()).abs() < 1e-4);
    }

    #[test]
    fn view_is_finite_when_eye_sits_on_target() {
        let mut cam = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);
        cam.look_at(Vec3::ZERO);
        assert!(cam.view().is_finite());
    }
}
