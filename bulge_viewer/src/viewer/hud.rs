//! Control panel text drawn as a screen-space quad at the bottom centre of the
//! window. Glyphs are rasterised on the CPU with fontdue into an RGBA buffer
//! that is re-uploaded only when the text changes. The panel is sized from the
//! laid-out text, so every line fits at its natural width.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use bytemuck::cast_slice;
use fontdue::{Font, FontSettings, Metrics};
use log::warn;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use super::shaders::{HUD_SHADER_SOURCE, QUAD_INDICES, QuadVertex};
use crate::texture::prepare_rgba_upload;

const FONT_SIZE_PX: f32 = 16.0;
const PANEL_PADDING: u32 = 8;
const PANEL_MARGIN_BOTTOM: f32 = 24.0;

/// Pixel rectangle in window coordinates, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PanelRect {
    /// Centre horizontally and sit `PANEL_MARGIN_BOTTOM` above the bottom edge.
    /// A panel larger than the window is scaled down to fit, never cropped.
    pub fn bottom_centre(window: PhysicalSize<u32>, width: u32, height: u32) -> Self {
        let window_w = window.width.max(1) as f32;
        let window_h = window.height.max(1) as f32;
        let scale = (window_w / width.max(1) as f32)
            .min(window_h / height.max(1) as f32)
            .min(1.0);
        let width = width as f32 * scale;
        let height = height as f32 * scale;
        let x = ((window_w - width) * 0.5).max(0.0);
        let y = (window_h - height - PANEL_MARGIN_BOTTOM).max(0.0);
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn vertices(&self, window: PhysicalSize<u32>) -> [QuadVertex; 4] {
        let width = window.width.max(1) as f32;
        let height = window.height.max(1) as f32;

        let left = (self.x / width) * 2.0 - 1.0;
        let right = ((self.x + self.width) / width) * 2.0 - 1.0;
        let top = 1.0 - (self.y / height) * 2.0;
        let bottom = 1.0 - ((self.y + self.height) / height) * 2.0;

        [
            QuadVertex {
                position: [left, top],
                uv: [0.0, 0.0],
            },
            QuadVertex {
                position: [right, top],
                uv: [1.0, 0.0],
            },
            QuadVertex {
                position: [left, bottom],
                uv: [0.0, 1.0],
            },
            QuadVertex {
                position: [right, bottom],
                uv: [1.0, 1.0],
            },
        ]
    }
}

#[derive(Clone)]
struct GlyphBitmap {
    width: u32,
    height: u32,
    xmin: i32,
    ymin: i32,
    advance: f32,
    alpha: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GlyphLayout {
    line_height: u32,
    ascent: i32,
    left_bearing: i32,
}

impl GlyphLayout {
    fn from_font(font: &Font, size: f32) -> Self {
        let mut min_xmin = i32::MAX;
        let mut min_ymin = i32::MAX;
        let mut max_ymax = i32::MIN;

        for ch in (32u8..=126).map(char::from) {
            let metrics: Metrics = font.metrics(ch, size);
            if metrics.width == 0 || metrics.height == 0 {
                continue;
            }
            min_xmin = min_xmin.min(metrics.xmin);
            min_ymin = min_ymin.min(metrics.ymin);
            max_ymax = max_ymax.max(metrics.ymin + metrics.height as i32);
        }

        if min_ymin > max_ymax {
            return Self {
                line_height: 1,
                ascent: 0,
                left_bearing: 0,
            };
        }

        Self {
            line_height: (max_ymax - min_ymin).max(1) as u32,
            ascent: max_ymax,
            left_bearing: (-min_xmin).max(0),
        }
    }

    /// Panel size that holds every line at its laid-out width plus padding.
    fn panel_size(&self, lines: &[String], advance: impl Fn(char) -> f32) -> (u32, u32) {
        let widest = lines
            .iter()
            .map(|line| line.chars().map(&advance).sum::<f32>())
            .fold(0.0f32, f32::max);
        let width = widest.ceil() as u32 + self.left_bearing as u32 + PANEL_PADDING * 2;
        let height = lines.len() as u32 * self.line_height + PANEL_PADDING * 2;
        (width.max(1), height.max(1))
    }
}

/// Proportional text rasteriser over a fontdue font.
pub struct HudText {
    font: Font,
    layout: GlyphLayout,
    glyphs: HashMap<char, GlyphBitmap>,
}

impl HudText {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|err| anyhow!("parsing HUD font: {err}"))?;
        let layout = GlyphLayout::from_font(&font, FONT_SIZE_PX);
        Ok(Self {
            font,
            layout,
            glyphs: HashMap::new(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("reading HUD font {}", path.display()))?;
        Self::from_bytes(&bytes).with_context(|| format!("loading HUD font {}", path.display()))
    }

    pub fn panel_size(&self, lines: &[String]) -> (u32, u32) {
        self.layout
            .panel_size(lines, |ch| self.font.metrics(ch, FONT_SIZE_PX).advance_width)
    }

    /// Rasterise `lines` into a `width` x `height` RGBA buffer, advancing the
    /// pen by each glyph's own advance width.
    pub fn render_lines(&mut self, lines: &[String], width: u32, height: u32) -> Vec<u8> {
        const FG_COLOR: [u8; 4] = [255, 255, 255, 240];
        const BG_COLOR: [u8; 4] = [0, 0, 0, 160];

        let mut pixels = vec![0u8; (width * height * 4) as usize];
        for chunk in pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&BG_COLOR);
        }

        let GlyphLayout {
            line_height,
            ascent,
            left_bearing,
        } = self.layout;

        for (row, line) in lines.iter().enumerate() {
            let line_top = PANEL_PADDING + row as u32 * line_height;
            let mut pen_x = (PANEL_PADDING as i32 + left_bearing) as f32;
            for ch in line.chars() {
                let glyph = self.glyph(ch);
                let start_x = pen_x.round() as i32 + glyph.xmin;
                pen_x += glyph.advance;
                if glyph.width == 0 || glyph.height == 0 {
                    continue;
                }
                let start_y = line_top as i32 + ascent - (glyph.ymin + glyph.height as i32);
                for gy in 0..glyph.height {
                    let dest_y = start_y + gy as i32;
                    if dest_y < 0 || dest_y >= height as i32 {
                        continue;
                    }
                    for gx in 0..glyph.width {
                        let coverage = glyph.alpha[(gy * glyph.width + gx) as usize];
                        let dest_x = start_x + gx as i32;
                        if coverage == 0 || dest_x < 0 || dest_x >= width as i32 {
                            continue;
                        }
                        let idx = ((dest_y as u32 * width + dest_x as u32) * 4) as usize;
                        let alpha = ((coverage as u16 * FG_COLOR[3] as u16) / u8::MAX as u16) as u8;
                        pixels[idx..idx + 4].copy_from_slice(&[
                            FG_COLOR[0],
                            FG_COLOR[1],
                            FG_COLOR[2],
                            alpha.max(BG_COLOR[3]),
                        ]);
                    }
                }
            }
        }
        pixels
    }

    fn glyph(&mut self, ch: char) -> GlyphBitmap {
        let font = &self.font;
        self.glyphs
            .entry(ch)
            .or_insert_with(|| {
                let (metrics, alpha) = font.rasterize(ch, FONT_SIZE_PX);
                GlyphBitmap {
                    width: metrics.width as u32,
                    height: metrics.height as u32,
                    xmin: metrics.xmin,
                    ymin: metrics.ymin,
                    advance: metrics.advance_width,
                    alpha,
                }
            })
            .clone()
    }
}

struct PanelTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

/// GPU half of the HUD: texture, quad, and pipeline.
pub struct HudOverlay {
    text: HudText,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    panel: Option<PanelTexture>,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: wgpu::Buffer,
    window: PhysicalSize<u32>,
    lines: Vec<String>,
    dirty: bool,
}

impl HudOverlay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: PhysicalSize<u32>,
        text: HudText,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("hud-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("hud-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("hud-shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(HUD_SHADER_SOURCE)),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("hud-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("hud-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<QuadVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("hud-index-buffer"),
            contents: cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            text,
            pipeline,
            bind_group_layout,
            sampler,
            panel: None,
            vertex_buffer: None,
            index_buffer,
            window,
            lines: Vec::new(),
            dirty: true,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, window: PhysicalSize<u32>) {
        self.window = window;
        if let Some(panel) = self.panel.as_ref() {
            self.vertex_buffer = Some(create_vertex_buffer(
                device,
                window,
                panel.width,
                panel.height,
            ));
        }
    }

    pub fn set_lines(&mut self, lines: Vec<String>) {
        if self.lines != lines {
            self.lines = lines;
            self.dirty = true;
        }
    }

    /// Re-rasterise after a text change, growing or shrinking the panel
    /// texture to the new layout.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if !self.dirty {
            return;
        }
        let (width, height) = self.text.panel_size(&self.lines);
        let resized = self
            .panel
            .as_ref()
            .is_none_or(|panel| panel.width != width || panel.height != height);
        if resized {
            self.panel = Some(self.create_panel_texture(device, width, height));
            self.vertex_buffer = Some(create_vertex_buffer(device, self.window, width, height));
        }
        let Some(panel) = self.panel.as_ref() else {
            return;
        };

        let pixels = self.text.render_lines(&self.lines, width, height);
        let upload = match prepare_rgba_upload(width, height, &pixels) {
            Ok(upload) => upload,
            Err(err) => {
                warn!("HUD upload failed ({width}x{height}): {err}");
                return;
            }
        };
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &panel.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            upload.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(upload.bytes_per_row()),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.dirty = false;
    }

    /// Draw over whatever the scene pass left in `target`.
    pub fn draw(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let (Some(panel), Some(vertex_buffer)) = (self.panel.as_ref(), self.vertex_buffer.as_ref())
        else {
            return;
        };
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("hud-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &panel.bind_group, &[]);
        rpass.set_vertex_buffer(0, vertex_buffer.slice(..));
        rpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
    }

    fn create_panel_texture(&self, device: &wgpu::Device, width: u32, height: u32) -> PanelTexture {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("hud-texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("hud-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        PanelTexture {
            texture,
            bind_group,
            width,
            height,
        }
    }
}

fn create_vertex_buffer(
    device: &wgpu::Device,
    window: PhysicalSize<u32>,
    width: u32,
    height: u32,
) -> wgpu::Buffer {
    let rect = PanelRect::bottom_centre(window, width, height);
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("hud-vertex-buffer"),
        contents: cast_slice(&rect.vertices(window)),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulge_core::{ControlState, WidgetSettings};

    // Wider than any ASCII glyph in common sans faces at 16 px.
    const WIDE_ADVANCE: f32 = 17.0;

    fn wide_layout() -> GlyphLayout {
        GlyphLayout {
            line_height: 19,
            ascent: 15,
            left_bearing: 1,
        }
    }

    #[test]
    fn panel_holds_every_control_line() {
        let layout = wide_layout();
        let lines = ControlState::new(WidgetSettings::default()).hud_lines();
        let (width, height) = layout.panel_size(&lines, |_| WIDE_ADVANCE);

        for line in &lines {
            let right_edge = PANEL_PADDING as f32
                + layout.left_bearing as f32
                + line.chars().count() as f32 * WIDE_ADVANCE;
            assert!(
                right_edge <= (width - PANEL_PADDING) as f32,
                "'{line}' ends at {right_edge} in a {width} px panel"
            );
        }
        assert_eq!(
            height,
            lines.len() as u32 * layout.line_height + PANEL_PADDING * 2
        );
    }

    #[test]
    fn panel_tracks_proportional_advances() {
        let layout = wide_layout();
        let lines = vec!["iii".to_string(), "MM".to_string()];
        let advance = |ch: char| if ch == 'M' { 14.0 } else { 4.5 };
        let (width, _) = layout.panel_size(&lines, advance);
        // "MM" is the widest line at 28 px; "iii" needs only 13.5.
        assert_eq!(width, 28 + 1 + PANEL_PADDING * 2);
    }

    #[test]
    fn empty_text_still_has_a_panel() {
        let (width, height) = wide_layout().panel_size(&[], |_| WIDE_ADVANCE);
        assert_eq!(width, 1 + PANEL_PADDING * 2);
        assert_eq!(height, PANEL_PADDING * 2);
    }

    #[test]
    fn panel_sits_bottom_centre() {
        let rect = PanelRect::bottom_centre(PhysicalSize::new(1280, 720), 360, 120);
        assert_eq!(rect.x, 460.0);
        assert_eq!(rect.y, 720.0 - 120.0 - PANEL_MARGIN_BOTTOM);
        assert_eq!(rect.width, 360.0);
    }

    #[test]
    fn oversized_panel_is_scaled_not_cropped() {
        let rect = PanelRect::bottom_centre(PhysicalSize::new(200, 100), 400, 100);
        assert_eq!(rect.width, 200.0);
        assert_eq!(rect.height, 50.0);
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.y, 100.0 - 50.0 - PANEL_MARGIN_BOTTOM);
    }

    #[test]
    fn quad_spans_rect_in_ndc() {
        let window = PhysicalSize::new(800, 600);
        let rect = PanelRect {
            x: 0.0,
            y: 0.0,
            width: 400.0,
            height: 300.0,
        };
        let vertices = rect.vertices(window);
        assert_eq!(vertices[0].position, [-1.0, 1.0]);
        assert_eq!(vertices[3].position, [0.0, 0.0]);
        assert_eq!(vertices[3].uv, [1.0, 1.0]);
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        assert!(HudText::from_bytes(b"not a font").is_err());
    }
}
