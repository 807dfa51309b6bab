use bulge_core::OrthoCamera;
use log::{error, info, trace, warn};
use wgpu::SurfaceError;

use super::ViewerState;
use super::input;
use super::layout;
use crate::texture::TextureSlot;

/// One frame: absorb finished texture loads, tick the hover controller, write
/// uniforms, then draw the layers and the HUD.
pub(super) fn render(state: &mut ViewerState) -> Result<(), SurfaceError> {
    poll_textures(state);

    let settings = state.controls.settings();
    let view_projection =
        OrthoCamera::from_settings(&settings.camera).view_projection(layout::viewport(state));
    if state.renderer.is_ready() {
        let displacement = state.controller.advance();
        trace!(
            "displacement ({:.3}, {:.3}, {:.3}) phase {:?}",
            displacement.x,
            displacement.y,
            displacement.z,
            state.controller.phase()
        );
        state.renderer.prepare(
            &state.queue,
            view_projection,
            displacement,
            settings.bulge.parameters(),
        );
    }

    let frame = state.surface.get_current_texture()?;
    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("bulge-widget-encoder"),
        });

    state.renderer.draw(&mut encoder, &view);

    if state.controls.hud_visible() {
        if let Some(hud) = state.hud.as_mut() {
            hud.upload(&state.device, &state.queue);
            hud.draw(&mut encoder, &view);
        }
    }

    state.queue.submit(std::iter::once(encoder.finish()));
    frame.present();
    Ok(())
}

fn poll_textures(state: &mut ViewerState) {
    if state.loader.is_finished() {
        return;
    }

    for (layer, result) in state.loader.poll() {
        let slot = match result {
            Ok(image) => {
                info!(
                    "{} texture ready: {} ({}x{})",
                    layer.label(),
                    image.source.display(),
                    image.width,
                    image.height
                );
                TextureSlot::Ready(image)
            }
            Err(err) => {
                error!("{} texture failed to load: {err}", layer.label());
                TextureSlot::Failed
            }
        };
        *state.textures.slot_mut(layer) = slot;
    }

    let Some((main, shadow)) = state.textures.ready() else {
        return;
    };
    if state.renderer.has_textures() {
        return;
    }
    if let Err(err) = state
        .renderer
        .set_textures(&state.device, &state.queue, main, shadow)
    {
        error!("uploading glyph textures: {err:?}");
        return;
    }
    state
        .renderer
        .sync_scene(&state.device, state.controls.settings());
    state.synced_revision = state.controls.revision();
    // A cursor that was already over the window starts tracking now.
    input::refresh_hover(state);
}

/// Log a degenerate bulge once per transition into that state.
pub(super) fn warn_if_degenerate(state: &mut ViewerState) {
    let params = state.controls.settings().bulge.parameters();
    if params.is_degenerate() {
        if !state.degenerate_warned {
            warn!(
                "bulge radius {} / height {} is degenerate; the main layer renders flat",
                params.radius, params.height
            );
            state.degenerate_warned = true;
        }
    } else {
        state.degenerate_warned = false;
    }
}
