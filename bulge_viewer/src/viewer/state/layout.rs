use glam::Vec2;
use winit::dpi::PhysicalSize;

use super::ViewerState;
use super::input;

pub(super) fn resize(state: &mut ViewerState, new_size: PhysicalSize<u32>) {
    if new_size.width == 0 || new_size.height == 0 {
        return;
    }

    state.size = new_size;
    state.config.width = new_size.width;
    state.config.height = new_size.height;
    state.surface.configure(&state.device, &state.config);
    state
        .renderer
        .resize(&state.device, new_size.width, new_size.height);
    if let Some(hud) = state.hud.as_mut() {
        hud.resize(&state.device, new_size);
    }
    // The projection changed under a stationary cursor.
    input::refresh_hover(state);
}

pub(super) fn viewport(state: &ViewerState) -> Vec2 {
    Vec2::new(
        state.size.width.max(1) as f32,
        state.size.height.max(1) as f32,
    )
}
