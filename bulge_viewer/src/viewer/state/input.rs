use bulge_core::{
    Axis, CameraSettings, ControlAction, DrawItem, HoverTransition, OrthoCamera, PointerEvent,
    hit_test,
};
use glam::Vec2;
use log::{debug, info};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent},
    keyboard::{Key, NamedKey},
};

use super::ViewerState;
use super::layout;
use super::render;

pub(super) fn handle_key_event(state: &mut ViewerState, event: &KeyEvent) {
    if event.state != ElementState::Pressed {
        return;
    }
    let Some(action) = action_for_key(event.logical_key.as_ref()) else {
        return;
    };
    if !state.controls.apply(action) {
        return;
    }

    let settings = state.controls.settings();
    info!(
        "{action:?}: radius {:.1} height {:.1} zoom {:.1}",
        settings.bulge.radius, settings.bulge.height, settings.camera.zoom
    );
    let revision = state.controls.revision();
    if revision != state.synced_revision {
        state.renderer.sync_scene(&state.device, settings);
        state.synced_revision = revision;
    }
    if let Some(hud) = state.hud.as_mut() {
        hud.set_lines(state.controls.hud_lines());
    }
    render::warn_if_degenerate(state);
    refresh_hover(state);
}

/// Key bindings for the control panel. Escape is handled by the event loop.
pub(super) fn action_for_key(key: Key<&str>) -> Option<ControlAction> {
    let action = match key {
        Key::Named(NamedKey::ArrowUp) => ControlAction::RadiusUp,
        Key::Named(NamedKey::ArrowDown) => ControlAction::RadiusDown,
        Key::Named(NamedKey::ArrowRight) => ControlAction::HeightUp,
        Key::Named(NamedKey::ArrowLeft) => ControlAction::HeightDown,
        Key::Character(symbol) => match symbol {
            "r" | "R" => ControlAction::ResetBulge,
            "q" | "Q" => rotate(Axis::Z, true),
            "e" | "E" => rotate(Axis::Z, false),
            "w" | "W" => rotate(Axis::X, true),
            "s" | "S" => rotate(Axis::X, false),
            "a" | "A" => rotate(Axis::Y, true),
            "d" | "D" => rotate(Axis::Y, false),
            "+" | "=" => ControlAction::ZoomIn,
            "-" | "_" => ControlAction::ZoomOut,
            "l" | "L" => move_camera(Axis::X, true),
            "j" | "J" => move_camera(Axis::X, false),
            "i" | "I" => move_camera(Axis::Y, true),
            "k" | "K" => move_camera(Axis::Y, false),
            "u" | "U" => move_camera(Axis::Z, true),
            "o" | "O" => move_camera(Axis::Z, false),
            "0" => ControlAction::ResetView,
            "h" | "H" => ControlAction::ToggleHud,
            _ => return None,
        },
        _ => return None,
    };
    Some(action)
}

fn rotate(axis: Axis, positive: bool) -> ControlAction {
    ControlAction::Rotate { axis, positive }
}

fn move_camera(axis: Axis, positive: bool) -> ControlAction {
    ControlAction::MoveCamera { axis, positive }
}

pub(super) fn cursor_moved(state: &mut ViewerState, position: PhysicalPosition<f64>) {
    state.cursor = Some(Vec2::new(position.x as f32, position.y as f32));
    refresh_hover(state);
}

pub(super) fn cursor_left(state: &mut ViewerState) {
    state.cursor = None;
    if !state.renderer.is_ready() {
        return;
    }
    let transition = state.controller.pointer_leave();
    log_transition(transition, PointerEvent::Leave);
}

/// Re-run the hit test for the last known cursor position against the
/// renderer's cached main layer. Pointer input is ignored until the layers are
/// drawable.
pub(super) fn refresh_hover(state: &mut ViewerState) {
    let Some(cursor) = state.cursor else {
        return;
    };
    let Some(item) = state.renderer.interactive_item() else {
        return;
    };
    let event = hover_event(
        cursor,
        layout::viewport(state),
        &state.controls.settings().camera,
        item,
    );
    let transition = state.controller.handle(event);
    log_transition(transition, event);
}

fn hover_event(
    cursor: Vec2,
    viewport: Vec2,
    camera: &CameraSettings,
    item: &DrawItem,
) -> PointerEvent {
    let view_projection = OrthoCamera::from_settings(camera).view_projection(viewport);
    hit_test(
        cursor,
        viewport,
        &view_projection,
        &item.model,
        item.half_extents(),
    )
}

fn log_transition(transition: HoverTransition, event: PointerEvent) {
    match (transition, event) {
        (HoverTransition::Entered, PointerEvent::Move(point)) => debug!(
            "pointer entered at ({:.2}, {:.2}, {:.2})",
            point.x, point.y, point.z
        ),
        (HoverTransition::Left, _) => debug!("pointer left"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulge_core::{SceneGraph, WidgetSettings};

    #[test]
    fn hover_hits_the_cached_main_layer() {
        let settings = WidgetSettings::default();
        let item = SceneGraph::isometric(&settings)
            .interactive_item()
            .expect("main layer");
        let viewport = Vec2::new(800.0, 600.0);

        match hover_event(viewport * 0.5, viewport, &settings.camera, &item) {
            PointerEvent::Move(point) => assert!(point.truncate().length() < 1e-3, "{point:?}"),
            PointerEvent::Leave => panic!("centre of the viewport should hit the plane"),
        }
        assert_eq!(
            hover_event(Vec2::new(2.0, 2.0), viewport, &settings.camera, &item),
            PointerEvent::Leave
        );
    }

    #[test]
    fn arrows_adjust_the_bulge() {
        assert_eq!(
            action_for_key(Key::Named(NamedKey::ArrowUp)),
            Some(ControlAction::RadiusUp)
        );
        assert_eq!(
            action_for_key(Key::Named(NamedKey::ArrowLeft)),
            Some(ControlAction::HeightDown)
        );
    }

    #[test]
    fn letters_match_either_case() {
        assert_eq!(action_for_key(Key::Character("r")), Some(ControlAction::ResetBulge));
        assert_eq!(action_for_key(Key::Character("R")), Some(ControlAction::ResetBulge));
        assert_eq!(
            action_for_key(Key::Character("Q")),
            Some(ControlAction::Rotate {
                axis: Axis::Z,
                positive: true
            })
        );
        assert_eq!(
            action_for_key(Key::Character("k")),
            Some(ControlAction::MoveCamera {
                axis: Axis::Y,
                positive: false
            })
        );
    }

    #[test]
    fn unshifted_plus_zooms_in() {
        assert_eq!(action_for_key(Key::Character("=")), Some(ControlAction::ZoomIn));
        assert_eq!(action_for_key(Key::Character("-")), Some(ControlAction::ZoomOut));
    }

    #[test]
    fn unbound_keys_are_ignored() {
        assert_eq!(action_for_key(Key::Character("z")), None);
        assert_eq!(action_for_key(Key::Named(NamedKey::Escape)), None);
    }
}
