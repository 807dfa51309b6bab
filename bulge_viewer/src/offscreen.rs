//! Headless render of the widget into a PNG. Shares `SceneRenderer` with the
//! windowed path so the dump shows exactly what the window would draw.

use std::{path::Path, sync::mpsc};

use anyhow::{Context, Result, bail, ensure};
use bulge_core::{DisplacementController, OrthoCamera, PointerEvent, WidgetSettings};
use glam::{Vec2, Vec3};
use log::info;
use pollster::FutureExt;
use wgpu::{Backends, COPY_BYTES_PER_ROW_ALIGNMENT, InstanceDescriptor, InstanceFlags, Maintain};

use crate::cli::RenderSize;
use crate::texture::{export_rgba_to_png, load_layer_textures};
use crate::viewer::SceneRenderer;

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// What ended up in the dumped frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSummary {
    pub width: u32,
    pub height: u32,
    pub covered_pixels: u32,
    pub displacement: Vec3,
}

pub fn render_widget_offscreen(
    settings: &WidgetSettings,
    size: RenderSize,
    hover: Option<Vec3>,
    frames: u32,
    destination: &Path,
) -> Result<RenderSummary> {
    ensure!(
        size.width > 0 && size.height > 0,
        "render size must be non-zero (got {}x{})",
        size.width,
        size.height
    );

    let (main, shadow) = load_layer_textures(&settings.textures.main, &settings.textures.shadow)
        .context("loading glyph textures for offscreen render")?;
    let (device, queue) = request_headless_device()?;

    let mut renderer = SceneRenderer::new(&device, TARGET_FORMAT, size.width, size.height);
    renderer.set_textures(&device, &queue, &main, &shadow)?;
    renderer.sync_scene(&device, settings);

    let displacement = simulate_hover(hover, frames);
    let viewport = Vec2::new(size.width as f32, size.height as f32);
    let view_projection = OrthoCamera::from_settings(&settings.camera).view_projection(viewport);
    renderer.prepare(
        &queue,
        view_projection,
        displacement,
        settings.bulge.parameters(),
    );

    let extent = wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    };
    let render_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen-target"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let render_view = render_texture.create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("offscreen-encoder"),
    });
    renderer.draw(&mut encoder, &render_view);

    let bytes_per_row = 4 * size.width;
    let padded_bytes_per_row = bytes_per_row.div_ceil(COPY_BYTES_PER_ROW_ALIGNMENT)
        * COPY_BYTES_PER_ROW_ALIGNMENT;
    let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("offscreen-readback"),
        size: padded_bytes_per_row as u64 * size.height as u64,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture: &render_texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &readback_buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(size.height),
            },
        },
        extent,
    );

    queue.submit(std::iter::once(encoder.finish()));
    device.poll(Maintain::Wait);

    let buffer_slice = readback_buffer.slice(..);
    let (tx, rx) = mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(Maintain::Wait);
    match rx
        .recv()
        .context("waiting for offscreen readback completion")?
    {
        Ok(()) => {}
        Err(err) => bail!("mapping offscreen readback buffer: {err}"),
    }
    let padded = buffer_slice.get_mapped_range();
    let rgba = unpad_rows(&padded, size.height, bytes_per_row, padded_bytes_per_row);
    drop(padded);
    readback_buffer.unmap();

    export_rgba_to_png(destination, size.width, size.height, &rgba)?;
    Ok(RenderSummary {
        width: size.width,
        height: size.height,
        covered_pixels: count_covered_pixels(&rgba),
        displacement,
    })
}

fn request_headless_device() -> Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(InstanceDescriptor {
        backends: Backends::all(),
        flags: InstanceFlags::default(),
        ..Default::default()
    });
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        })
        .block_on()
        .or_else(|| {
            instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::LowPower,
                    force_fallback_adapter: true,
                    compatible_surface: None,
                })
                .block_on()
        })
        .context("requesting adapter for offscreen render")?;
    let adapter_info = adapter.get_info();
    info!(
        "offscreen adapter {} ({:?})",
        adapter_info.name, adapter_info.backend
    );

    adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("bulge-widget-offscreen-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .block_on()
        .context("requesting device for offscreen render")
}

/// Drive the controller the way the window would: one pointer move, then
/// `frames` ticks. With no pointer the displacement stays at the sentinel.
fn simulate_hover(hover: Option<Vec3>, frames: u32) -> Vec3 {
    let mut controller = DisplacementController::new();
    if let Some(point) = hover {
        controller.handle(PointerEvent::Move(point));
    }
    let mut displacement = controller.displacement();
    for _ in 0..frames.max(1) {
        displacement = controller.advance();
    }
    displacement
}

fn unpad_rows(padded: &[u8], height: u32, bytes_per_row: u32, padded_bytes_per_row: u32) -> Vec<u8> {
    let row_bytes = bytes_per_row as usize;
    let mut rgba = vec![0u8; row_bytes * height as usize];
    for row in 0..height as usize {
        let src_offset = row * padded_bytes_per_row as usize;
        let dst_offset = row * row_bytes;
        rgba[dst_offset..dst_offset + row_bytes]
            .copy_from_slice(&padded[src_offset..src_offset + row_bytes]);
    }
    rgba
}

fn count_covered_pixels(rgba: &[u8]) -> u32 {
    rgba.chunks_exact(4).filter(|pixel| pixel[3] > 0).count() as u32
}
