use std::sync::Arc;

use anyhow::{Context, Result};
use bulge_core::{ControlState, DisplacementController, LayerKind, WidgetSettings};
use log::{info, warn};
use winit::window::Window;

use super::super::hud::{HudOverlay, HudText};
use super::super::renderer::SceneRenderer;
use super::ViewerState;
use super::render;
use crate::texture::{LayerTextures, TextureLoader};

/// Bundles the wgpu objects tied to the widget window.
struct WgpuBootstrap {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    present_mode: wgpu::PresentMode,
    alpha_mode: wgpu::CompositeAlphaMode,
}

/// Brings up wgpu against the window, builds the layer renderer and HUD, and
/// starts decoding both glyph textures in the background. The returned state
/// clears to transparent until both textures arrive.
pub(super) async fn new(
    window: Arc<Window>,
    settings: WidgetSettings,
    hud_text: Option<HudText>,
) -> Result<ViewerState> {
    let size = window.inner_size();
    let wgpu = bootstrap_wgpu(window.clone()).await?;

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: wgpu.surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu.present_mode,
        alpha_mode: wgpu.alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 1,
    };
    wgpu.surface.configure(&wgpu.device, &config);

    let renderer = SceneRenderer::new(&wgpu.device, config.format, config.width, config.height);

    let loader = TextureLoader::spawn(&[
        (LayerKind::Main, settings.textures.main.clone()),
        (LayerKind::Shadow, settings.textures.shadow.clone()),
    ])
    .context("starting texture loads")?;
    info!(
        "loading textures: main {} shadow {}",
        settings.textures.main.display(),
        settings.textures.shadow.display()
    );

    let controls = ControlState::new(settings);
    let synced_revision = controls.revision();
    let hud = hud_text.map(|text| {
        let mut hud = HudOverlay::new(&wgpu.device, config.format, size, text);
        hud.set_lines(controls.hud_lines());
        hud
    });

    let mut state = ViewerState {
        window,
        surface: wgpu.surface,
        device: wgpu.device,
        queue: wgpu.queue,
        config,
        size,
        renderer,
        hud,
        controls,
        synced_revision,
        controller: DisplacementController::new(),
        textures: LayerTextures::loading(),
        loader,
        cursor: None,
        degenerate_warned: false,
    };
    render::warn_if_degenerate(&mut state);
    Ok(state)
}

async fn bootstrap_wgpu(window: Arc<Window>) -> Result<WgpuBootstrap> {
    let instance = wgpu::Instance::default();
    let surface = instance
        .create_surface(window.clone())
        .context("creating wgpu surface")?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await
        .context("requesting wgpu adapter")?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("bulge-widget-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .await
        .context("requesting wgpu device")?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .or_else(|| surface_caps.formats.first().copied())
        .context("surface reports no supported formats")?;
    let present_mode = surface_caps
        .present_modes
        .iter()
        .copied()
        .find(|mode| *mode == wgpu::PresentMode::Mailbox)
        .unwrap_or(wgpu::PresentMode::Fifo);
    let alpha_mode = select_alpha_mode(&surface_caps.alpha_modes);

    let adapter_info = adapter.get_info();
    info!(
        "adapter {} ({:?}), surface {:?}, alpha {:?}, present {:?}",
        adapter_info.name, adapter_info.backend, surface_format, alpha_mode, present_mode
    );

    Ok(WgpuBootstrap {
        surface,
        device,
        queue,
        surface_format,
        present_mode,
        alpha_mode,
    })
}

/// Prefer a compositor mode that lets the transparent clear show the desktop.
fn select_alpha_mode(supported: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    let transparent = [
        wgpu::CompositeAlphaMode::PreMultiplied,
        wgpu::CompositeAlphaMode::PostMultiplied,
    ]
    .into_iter()
    .find(|mode| supported.contains(mode));
    match transparent {
        Some(mode) => mode,
        None => {
            let fallback = supported
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Opaque);
            warn!("surface has no transparent alpha mode (supported {supported:?}); using {fallback:?}");
            fallback
        }
    }
}
