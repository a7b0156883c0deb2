//! Camera for 3D rendering

use crate::core::types::{Vec3, Mat4};

/// Perspective camera looking at a target point
#[derive(Clone, Debug)]
pub struct Camera {
    /// World position
    pub position: Vec3,
    /// Point the camera looks at
    pub target: Vec3,
    /// Up vector
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Camera {
    /// Create a new camera
    pub fn new(position: Vec3, target: Vec3, fov_y_degrees: f32, aspect: f32) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near: 0.05,
            far: 500.0,
        }
    }

    /// Get view matrix (world to camera space)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get projection matrix (camera to clip space)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Place the camera on a horizontal circle around `target`
    pub fn orbit(&mut self, angle: f32, radius: f32, height: f32) {
        self.position = self.target + Vec3::new(angle.cos() * radius, height, angle.sin() * radius);
    }

    /// Update aspect ratio (call on window resize)
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        self.aspect = width / height;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 4.0, 12.0), Vec3::ZERO, 60.0, 16.0 / 9.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_matrix_moves_target_forward() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 60.0, 1.0);
        let target_in_camera = camera.view_matrix().transform_point3(Vec3::ZERO);
        // Right-handed: forward is -Z
        assert!((target_in_camera.z - (-10.0)).abs() < 0.001);
    }

    #[test]
    fn test_orbit_keeps_radius() {
        let mut camera = Camera::default();
        camera.orbit(1.3, 8.0, 2.0);
        let flat = Vec3::new(camera.position.x, 0.0, camera.position.z);
        assert!((flat.length() - 8.0).abs() < 0.001);
        assert!((camera.position.y - 2.0).abs() < 0.001);
    }
}
