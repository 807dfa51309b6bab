//! CPU mirror of the main layer's vertex program. The WGSL in
//! `bulge_viewer::viewer::shaders` evaluates the same falloff per vertex; the
//! functions here exist so the curve can be unit tested and so picking/HUD code
//! can reason about the bulge without a GPU round trip.

use glam::{Mat4, Vec3, Vec4};

/// Radius/height pair fed into the displacement uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulgeParameters {
    pub radius: f32,
    pub height: f32,
}

impl BulgeParameters {
    /// Flat configuration used when the requested values cannot displace anything.
    pub const FLAT: Self = Self {
        radius: 0.0,
        height: 0.0,
    };

    pub const fn new(radius: f32, height: f32) -> Self {
        Self { radius, height }
    }

    /// True when no vertex can ever be displaced: a non-positive or non-finite
    /// radius, or a height that would feed NaN/inf into the shader.
    pub fn is_degenerate(&self) -> bool {
        !(self.radius > 0.0 && self.radius.is_finite()) || !self.height.is_finite()
    }

    /// Collapse degenerate values to [`BulgeParameters::FLAT`] so the GPU never
    /// sees a division by zero or a NaN height.
    pub fn sanitized(self) -> Self {
        if self.is_degenerate() { Self::FLAT } else { self }
    }

    /// Height offset for a vertex whose planar distance to the contact point is
    /// `distance`. Zero at and beyond the radius, `height` at the contact point.
    pub fn offset_at(&self, distance: f32) -> f32 {
        if self.is_degenerate() || !(distance < self.radius) {
            return 0.0;
        }
        let proximity = map_range(distance, 0.0, self.radius, 1.0, 0.0);
        ease_in_out_cubic(proximity) * self.height
    }
}

/// Cubic ease-in-out on `[0, 1]`.
pub fn ease_in_out_cubic(x: f32) -> f32 {
    if x < 0.5 {
        4.0 * x * x * x
    } else {
        let falling = -2.0 * x + 2.0;
        1.0 - falling * falling * falling / 2.0
    }
}

/// Linear remap of `value` from `[min1, max1]` onto `[min2, max2]`.
pub fn map_range(value: f32, min1: f32, max1: f32, min2: f32, max2: f32) -> f32 {
    min2 + (value - min1) * (max2 - min2) / (max1 - min1)
}

/// Distance between two points measured in the XY plane only.
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    a.truncate().distance(b.truncate())
}

/// Displace a model-space vertex. Distance is measured in world space but the
/// offset is applied along the mesh's local Z, so the bulge stays normal to the
/// plane however the scene is rotated.
pub fn displace_local(
    model: &Mat4,
    local: Vec3,
    displacement: Vec3,
    params: BulgeParameters,
) -> Vec3 {
    let world = model.transform_point3(local);
    let offset = params.offset_at(planar_distance(world, displacement));
    local + Vec3::Z * offset
}

/// Full vertex stage: displacement followed by the model-view-projection.
pub fn displaced_clip_position(
    view_projection: &Mat4,
    model: &Mat4,
    local: Vec3,
    displacement: Vec3,
    params: BulgeParameters,
) -> Vec4 {
    let displaced = displace_local(model, local, displacement, params);
    *view_projection * *model * displaced.extend(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(lhs: f32, rhs: f32) {
        assert!((lhs - rhs).abs() <= EPSILON, "{lhs} != {rhs}");
    }

    #[test]
    fn ease_hits_fixed_points() {
        approx_eq(ease_in_out_cubic(0.0), 0.0);
        approx_eq(ease_in_out_cubic(0.5), 0.5);
        approx_eq(ease_in_out_cubic(1.0), 1.0);
    }

    #[test]
    fn ease_is_continuous_and_monotonic() {
        let mut previous = ease_in_out_cubic(0.0);
        for step in 1..=1000 {
            let x = step as f32 / 1000.0;
            let value = ease_in_out_cubic(x);
            assert!(value >= previous, "ease decreased at {x}");
            assert!(value - previous < 0.01, "ease jumped at {x}");
            previous = value;
        }
        let below = ease_in_out_cubic(0.5 - 1e-4);
        let above = ease_in_out_cubic(0.5 + 1e-4);
        assert!((above - below).abs() < 1e-3);
    }

    #[test]
    fn offset_is_zero_at_and_beyond_radius() {
        let params = BulgeParameters::new(3.0, 0.8);
        assert_eq!(params.offset_at(3.0), 0.0);
        assert_eq!(params.offset_at(3.0 + 1e-4), 0.0);
        assert_eq!(params.offset_at(250.0), 0.0);
    }

    #[test]
    fn offset_peaks_at_contact_point() {
        let params = BulgeParameters::new(3.0, 0.8);
        assert_eq!(params.offset_at(0.0), 0.8);
    }

    #[test]
    fn offset_never_increases_with_distance() {
        let params = BulgeParameters::new(2.5, 1.2);
        let mut previous = params.offset_at(0.0);
        for step in 1..=500 {
            let distance = step as f32 * 2.5 / 500.0;
            let offset = params.offset_at(distance);
            assert!(offset <= previous, "offset rose at d={distance}");
            previous = offset;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn degenerate_radius_never_displaces() {
        for radius in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let params = BulgeParameters::new(radius, 0.8);
            assert!(params.is_degenerate());
            assert_eq!(params.offset_at(0.0), 0.0);
            assert_eq!(params.sanitized(), BulgeParameters::FLAT);
        }
    }

    #[test]
    fn non_finite_height_is_flattened() {
        let params = BulgeParameters::new(2.0, f32::NAN);
        let offset = params.offset_at(0.5);
        assert_eq!(offset, 0.0);
        assert!(!offset.is_nan());
    }

    #[test]
    fn planar_distance_ignores_depth() {
        let a = Vec3::new(1.0, 1.0, -40.0);
        let b = Vec3::new(0.0, 0.0, 100.0);
        approx_eq(planar_distance(a, b), 2.0_f32.sqrt());
    }

    #[test]
    fn offset_follows_local_normal_under_rotation() {
        let model = Mat4::from_quat(Quat::from_rotation_x(0.7) * Quat::from_rotation_z(0.5));
        let params = BulgeParameters::new(2.0, 0.5);
        let displaced = displace_local(&model, Vec3::ZERO, Vec3::ZERO, params);
        approx_eq(displaced.x, 0.0);
        approx_eq(displaced.y, 0.0);
        approx_eq(displaced.z, 0.5);

        let world_lift = model.transform_point3(displaced);
        let local_normal = model.transform_vector3(Vec3::Z);
        approx_eq(world_lift.dot(local_normal), 0.5);
    }

    #[test]
    fn clip_position_matches_manual_transform() {
        let model = Mat4::from_translation(Vec3::new(0.0, 0.0, 1.0));
        let view_projection = Mat4::from_scale(Vec3::splat(0.5));
        let params = BulgeParameters::new(1.0, 1.0);
        let clip = displaced_clip_position(
            &view_projection,
            &model,
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 1.0),
            params,
        );
        approx_eq(clip.z, 1.0);
        approx_eq(clip.w, 1.0);
    }
}
