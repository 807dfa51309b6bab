use bulge_core::{
    ALPHA_DISCARD_THRESHOLD, BulgeParameters, DisplacementController, LayerStyle, OrthoCamera,
    PlaneGeometry, PointerEvent, SENTINEL_POINT, SceneGraph, WidgetSettings, displace_local,
    ease_in_out_cubic, hit_test,
};
use glam::{Vec2, Vec3};

fn main_layer(settings: &WidgetSettings) -> bulge_core::DrawItem {
    SceneGraph::isometric(settings)
        .interactive_item()
        .expect("widget has an interactive layer")
}

#[test]
fn pointer_at_one_one_lifts_origin_vertex() {
    let mut settings = WidgetSettings::default();
    settings.bulge.radius = 3.0;
    settings.bulge.height = 0.8;
    let item = main_layer(&settings);

    let mut controller = DisplacementController::new();
    controller.handle(PointerEvent::Move(Vec3::new(1.0, 1.0, 0.0)));
    let displacement = controller.advance();

    let params = item.bulge(settings.bulge.parameters());
    let lifted = displace_local(&item.model, Vec3::ZERO, displacement, params);

    let proximity = 1.0 - 2.0_f32.sqrt() / 3.0;
    let expected = ease_in_out_cubic(proximity) * 0.8;
    assert!((lifted.z - expected).abs() < 1e-5, "{} != {expected}", lifted.z);
    assert!((lifted.z - 0.4648).abs() < 1e-3);
    assert_eq!(lifted.truncate(), Vec2::ZERO);
}

#[test]
fn boundary_and_just_beyond_stay_flat() {
    let params = BulgeParameters::new(3.0, 0.8);
    let model = glam::Mat4::IDENTITY;
    let at_radius = displace_local(&model, Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0), params);
    let beyond = displace_local(&model, Vec3::ZERO, Vec3::new(3.0 + 1e-4, 0.0, 0.0), params);
    assert_eq!(at_radius.z, 0.0);
    assert_eq!(beyond.z, 0.0);

    let just_inside = displace_local(&model, Vec3::ZERO, Vec3::new(2.999, 0.0, 0.0), params);
    assert!(just_inside.z >= 0.0 && just_inside.z < 1e-6);
}

#[test]
fn faint_texels_are_discarded_at_any_opacity() {
    for opacity in [0.0, 0.3, 1.0] {
        let style = LayerStyle {
            color: [0.0, 0.0, 0.0],
            opacity,
        };
        assert!(style.shade([1.0, 1.0, 1.0, 0.05]).is_none());
        assert!(style.shade([1.0, 1.0, 1.0, ALPHA_DISCARD_THRESHOLD]).is_some());
    }
}

#[test]
fn zero_radius_never_displaces_the_mesh() {
    let mut settings = WidgetSettings::default();
    settings.bulge.radius = 0.0;
    let item = main_layer(&settings);
    let params = item.bulge(settings.bulge.parameters());
    let geometry = PlaneGeometry::square(item.size.x, item.size.y, 8);

    for pointer in [Vec3::ZERO, Vec3::new(1.0, -2.0, 0.0), SENTINEL_POINT] {
        for vertex in &geometry.vertices {
            let local = Vec3::from_array(vertex.position);
            let displaced = displace_local(&item.model, local, pointer, params);
            assert_eq!(displaced, local);
        }
    }
}

#[test]
fn smoothing_converges_without_overshoot() {
    let mut controller = DisplacementController::new();
    controller.handle(PointerEvent::Move(Vec3::ZERO));
    controller.advance();

    let target = Vec3::new(2.0, -1.0, 0.0);
    controller.handle(PointerEvent::Move(target));
    let mut residual = (controller.displacement() - target).length();
    for _ in 0..60 {
        let value = controller.advance();
        let next = (value - target).length();
        assert!((next - residual * 0.9).abs() < 1e-4);
        assert!(value.x <= target.x + 1e-6 && value.y >= target.y - 1e-6);
        residual = next;
    }
    assert!(residual < 0.01);
}

#[test]
fn cursor_over_the_widget_drives_the_controller() {
    let settings = WidgetSettings::default();
    let item = main_layer(&settings);
    let camera = OrthoCamera::from_settings(&settings.camera);
    let viewport = Vec2::new(800.0, 600.0);
    let view_projection = camera.view_projection(viewport);

    let mut controller = DisplacementController::new();
    let event = hit_test(
        viewport * 0.5,
        viewport,
        &view_projection,
        &item.model,
        item.half_extents(),
    );
    controller.handle(event);
    assert!(controller.advance().length() < 1e-3);

    let miss = hit_test(
        Vec2::new(2.0, 2.0),
        viewport,
        &view_projection,
        &item.model,
        item.half_extents(),
    );
    assert_eq!(miss, PointerEvent::Leave);
    controller.handle(miss);
    assert_eq!(controller.target(), SENTINEL_POINT);
}
