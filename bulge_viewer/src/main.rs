use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use pollster::FutureExt;
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

mod cli;
mod offscreen;
mod texture;
mod viewer;

use cli::Args;
use texture::load_layer_textures;
use viewer::{HudText, ViewerState};

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();

    let settings = cli::resolve_settings(&args).context("resolving widget settings")?;
    info!(
        "bulge radius {} height {}, plane {}x{} ({} / {} segments), zoom {}",
        settings.bulge.radius,
        settings.bulge.height,
        settings.plane.width,
        settings.plane.height,
        settings.plane.main_segments,
        settings.plane.shadow_segments,
        settings.camera.zoom
    );

    if let Some(output_path) = args.dump_render.as_ref() {
        let summary = offscreen::render_widget_offscreen(
            &settings,
            args.render_size,
            args.hover,
            args.frames,
            output_path,
        )
        .with_context(|| format!("rendering widget to {}", output_path.display()))?;
        println!(
            "Widget rendered to {} ({}x{}, {} covered pixels)",
            output_path.display(),
            summary.width,
            summary.height,
            summary.covered_pixels
        );
        println!(
            "  displacement ({:.3}, {:.3}, {:.3})",
            summary.displacement.x, summary.displacement.y, summary.displacement.z
        );
        return Ok(());
    }

    if args.headless {
        let (main, shadow) =
            load_layer_textures(&settings.textures.main, &settings.textures.shadow)
                .context("validating glyph textures")?;
        println!(
            "Headless check passed: main {}x{} ({}), shadow {}x{} ({})",
            main.width,
            main.height,
            main.source.display(),
            shadow.width,
            shadow.height,
            shadow.source.display()
        );
        return Ok(());
    }

    let hud_text = load_hud_text(args.hud_font.as_deref());

    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Bulge Widget")
            .with_inner_size(PhysicalSize::new(800, 600))
            .with_transparent(true)
            .build(&event_loop)
            .context("creating widget window")?,
    );

    let mut state = ViewerState::new(window, settings, hud_text).block_on()?;

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Escape),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => target.exit(),
                        WindowEvent::KeyboardInput { event, .. } => {
                            state.handle_key_event(&event)
                        }
                        WindowEvent::CursorMoved { position, .. } => state.cursor_moved(position),
                        WindowEvent::CursorLeft { .. } => state.cursor_left(),
                        WindowEvent::Resized(new_size) => state.resize(new_size),
                        WindowEvent::RedrawRequested => match state.render() {
                            Ok(_) => {}
                            Err(SurfaceError::Lost) => state.resize(state.size()),
                            Err(SurfaceError::OutOfMemory) => target.exit(),
                            Err(err) => error!("render error: {err:?}"),
                        },
                        _ => {}
                    }
                }
                Event::AboutToWait => state.window().request_redraw(),
                _ => {}
            }
        })
        .context("running widget event loop")?;
    Ok(())
}

fn load_hud_text(path: Option<&Path>) -> Option<HudText> {
    let Some(path) = path else {
        warn!("no --hud-font given; control HUD disabled");
        return None;
    };
    match HudText::load(path) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!("control HUD disabled: {err:?}");
            None
        }
    }
}
