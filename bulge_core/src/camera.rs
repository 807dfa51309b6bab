//! Orthographic camera framed in pixels: the frustum spans the viewport size
//! divided by `zoom`, so `zoom` is "pixels per world unit". The camera always
//! looks at the world origin with +Y up.

use glam::{Mat4, Vec2, Vec3};

use crate::settings::CameraSettings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub zoom: f32,
    pub near: f32,
    pub far: f32,
}

impl OrthoCamera {
    pub fn from_settings(settings: &CameraSettings) -> Self {
        Self {
            position: settings.position,
            target: Vec3::ZERO,
            up: Vec3::Y,
            zoom: settings.zoom,
            near: settings.near,
            far: settings.far,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        let forward = self.target - self.position;
        // Looking straight along the up axis leaves look_at without a basis.
        let up = if forward.cross(self.up).length_squared() <= f32::EPSILON {
            Vec3::Z
        } else {
            self.up
        };
        Mat4::look_at_rh(self.position, self.target, up)
    }

    pub fn projection_matrix(&self, viewport: Vec2) -> Mat4 {
        let zoom = if self.zoom > 0.0 && self.zoom.is_finite() {
            self.zoom
        } else {
            1.0
        };
        let half_width = viewport.x.max(1.0) * 0.5 / zoom;
        let half_height = viewport.y.max(1.0) * 0.5 / zoom;
        Mat4::orthographic_rh(
            -half_width,
            half_width,
            -half_height,
            half_height,
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self, viewport: Vec2) -> Mat4 {
        self.projection_matrix(viewport) * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_lands_in_the_middle_of_the_viewport() {
        let camera = OrthoCamera::from_settings(&CameraSettings::default());
        let vp = camera.view_projection(Vec2::new(800.0, 600.0));
        let ndc = vp.project_point3(Vec3::ZERO);
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn zoom_is_pixels_per_world_unit() {
        let camera = OrthoCamera::from_settings(&CameraSettings::default());
        let vp = camera.view_projection(Vec2::new(800.0, 600.0));
        // One unit along world X is 100 px right of centre: 0.25 of the half-width.
        let ndc = vp.project_point3(Vec3::X);
        assert!((ndc.x - 0.25).abs() < 1e-5, "{}", ndc.x);
    }

    #[test]
    fn camera_on_up_axis_still_has_a_basis() {
        let camera = OrthoCamera::from_settings(&CameraSettings {
            position: Vec3::new(0.0, 25.0, 0.0),
            ..CameraSettings::default()
        });
        let view = camera.view_matrix();
        assert!(view.is_finite());
    }
}
