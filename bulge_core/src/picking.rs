//! Pointer hit testing against the interactive plane. The hit test runs on the
//! flat plane; the vertex program's bulge never feeds back into picking.

use glam::{Mat4, Vec2, Vec3};

use crate::controller::PointerEvent;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneHit {
    /// Intersection in world space; what the controller tracks.
    pub world: Vec3,
    /// Intersection in the plane's local space (z is always 0).
    pub local: Vec3,
    pub distance: f32,
}

/// Build the world-space ray under a cursor given in physical pixels with the
/// origin at the top-left of the viewport.
pub fn cursor_ray(cursor: Vec2, viewport: Vec2, view_projection: &Mat4) -> Option<Ray> {
    if viewport.x <= 0.0 || viewport.y <= 0.0 {
        return None;
    }
    let ndc_x = 2.0 * cursor.x / viewport.x - 1.0;
    let ndc_y = 1.0 - 2.0 * cursor.y / viewport.y;

    let inverse = view_projection.inverse();
    if !inverse.is_finite() {
        return None;
    }
    let near = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
    let far = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
    let direction = (far - near).try_normalize()?;
    Some(Ray {
        origin: near,
        direction,
    })
}

/// Intersect a ray with a `half_extents`-sized plane placed by `model`. Both
/// faces count as hits.
pub fn intersect_plane(ray: &Ray, model: &Mat4, half_extents: Vec2) -> Option<PlaneHit> {
    let inverse = model.inverse();
    if !inverse.is_finite() {
        return None;
    }
    let origin = inverse.transform_point3(ray.origin);
    let direction = inverse.transform_vector3(ray.direction);
    if direction.z.abs() <= f32::EPSILON {
        return None;
    }
    let t = -origin.z / direction.z;
    if t < 0.0 {
        return None;
    }
    let local = origin + direction * t;
    if local.x.abs() > half_extents.x || local.y.abs() > half_extents.y {
        return None;
    }
    let world = model.transform_point3(Vec3::new(local.x, local.y, 0.0));
    Some(PlaneHit {
        world,
        local: Vec3::new(local.x, local.y, 0.0),
        distance: world.distance(ray.origin),
    })
}

/// Translate a cursor position into the pointer event the controller expects.
pub fn hit_test(
    cursor: Vec2,
    viewport: Vec2,
    view_projection: &Mat4,
    model: &Mat4,
    half_extents: Vec2,
) -> PointerEvent {
    cursor_ray(cursor, viewport, view_projection)
        .and_then(|ray| intersect_plane(&ray, model, half_extents))
        .map(|hit| PointerEvent::Move(hit.world))
        .unwrap_or(PointerEvent::Leave)
}
