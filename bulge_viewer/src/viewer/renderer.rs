//! Draws the two glyph layers into any colour target. The windowed viewer and
//! the offscreen dump share this type; it owns pipelines, the multisampled
//! attachments, and per-layer GPU resources, and knows nothing about surfaces
//! or input.

use std::borrow::Cow;

use anyhow::Result;
use bulge_core::{BulgeParameters, DrawItem, LayerKind, SceneGraph, WidgetSettings};
use bytemuck::cast_slice;
use glam::{Mat4, Vec3};
use log::{debug, info};
use wgpu::util::DeviceExt;

use super::mesh::{LayerUniforms, PlaneBuffers, plane_vertex_layout, upload_plane};
use super::shaders::LAYER_SHADER_SOURCE;
use crate::texture::{GlyphImage, prepare_rgba_upload};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Samples per pixel for the layer pass; resolved into the caller's target.
/// Four is guaranteed for every renderable format and for `Depth32Float`.
const SAMPLE_COUNT: u32 = 4;

struct GlyphTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct LayerResources {
    item: DrawItem,
    plane: PlaneBuffers,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct SceneRenderer {
    bind_group_layout: wgpu::BindGroupLayout,
    main_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    sampler: wgpu::Sampler,
    color_format: wgpu::TextureFormat,
    _color_texture: wgpu::Texture,
    color_view: wgpu::TextureView,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    main_texture: Option<GlyphTexture>,
    shadow_texture: Option<GlyphTexture>,
    layers: Vec<LayerResources>,
}

impl SceneRenderer {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("layer-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<LayerUniforms>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("layer-shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(LAYER_SHADER_SOURCE)),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("layer-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let main_pipeline = create_layer_pipeline(
            device,
            &pipeline_layout,
            &shader,
            color_format,
            LayerKind::Main,
        );
        let shadow_pipeline = create_layer_pipeline(
            device,
            &pipeline_layout,
            &shader,
            color_format,
            LayerKind::Shadow,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("layer-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let (color_texture, color_view) =
            create_attachment(device, "layer-msaa-color", color_format, width, height);
        let (depth_texture, depth_view) =
            create_attachment(device, "layer-depth-texture", DEPTH_FORMAT, width, height);

        Self {
            bind_group_layout,
            main_pipeline,
            shadow_pipeline,
            sampler,
            color_format,
            _color_texture: color_texture,
            color_view,
            _depth_texture: depth_texture,
            depth_view,
            main_texture: None,
            shadow_texture: None,
            layers: Vec::new(),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let (texture, view) =
            create_attachment(device, "layer-msaa-color", self.color_format, width, height);
        self._color_texture = texture;
        self.color_view = view;
        let (texture, view) =
            create_attachment(device, "layer-depth-texture", DEPTH_FORMAT, width, height);
        self._depth_texture = texture;
        self.depth_view = view;
    }

    /// Upload both glyph textures. Layers become drawable on the next
    /// [`SceneRenderer::sync_scene`].
    pub fn set_textures(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        main: &GlyphImage,
        shadow: &GlyphImage,
    ) -> Result<()> {
        self.main_texture = Some(upload_glyph_texture(device, queue, LayerKind::Main, main)?);
        self.shadow_texture = Some(upload_glyph_texture(
            device,
            queue,
            LayerKind::Shadow,
            shadow,
        )?);
        self.layers.clear();
        Ok(())
    }

    pub fn has_textures(&self) -> bool {
        self.main_texture.is_some() && self.shadow_texture.is_some()
    }

    /// Rebuild per-layer resources from the settings' scene graph. Does nothing
    /// until both textures are uploaded.
    pub fn sync_scene(&mut self, device: &wgpu::Device, settings: &WidgetSettings) {
        let (Some(main_texture), Some(shadow_texture)) =
            (self.main_texture.as_ref(), self.shadow_texture.as_ref())
        else {
            return;
        };

        let graph = SceneGraph::isometric(settings);
        let items = graph.draw_items();

        let geometry_unchanged = self.layers.len() == items.len()
            && self.layers.iter().zip(&items).all(|(layer, item)| {
                layer.item.size == item.size && layer.item.segments == item.segments
            });
        if geometry_unchanged {
            for (layer, item) in self.layers.iter_mut().zip(items) {
                layer.item = item;
            }
            return;
        }

        self.layers = items
            .into_iter()
            .map(|item| {
                let texture = match item.layer {
                    LayerKind::Main => &main_texture.view,
                    LayerKind::Shadow => &shadow_texture.view,
                };
                create_layer_resources(device, &self.bind_group_layout, &self.sampler, texture, item)
            })
            .collect();
        debug!("rebuilt {} layer meshes", self.layers.len());
    }

    pub fn is_ready(&self) -> bool {
        !self.layers.is_empty()
    }

    /// The pointer-reactive layer as of the last [`SceneRenderer::sync_scene`].
    pub fn interactive_item(&self) -> Option<&DrawItem> {
        self.layers
            .iter()
            .map(|layer| &layer.item)
            .find(|item| item.interactive)
    }

    /// Write every layer's uniforms for this frame.
    pub fn prepare(
        &self,
        queue: &wgpu::Queue,
        view_projection: Mat4,
        displacement: Vec3,
        bulge: BulgeParameters,
    ) {
        for layer in &self.layers {
            let uniforms = LayerUniforms::new(view_projection, &layer.item, displacement, bulge);
            queue.write_buffer(&layer.uniform_buffer, 0, cast_slice(&[uniforms]));
        }
    }

    /// Clear to transparent, then draw shadow before main and resolve the
    /// samples into `target`, which must match the renderer's current size.
    /// With no textures yet the pass only clears.
    pub fn draw(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("bulge-scene-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.color_view,
                resolve_target: Some(target),
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Discard,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for layer in &self.layers {
            let pipeline = match layer.item.layer {
                LayerKind::Main => &self.main_pipeline,
                LayerKind::Shadow => &self.shadow_pipeline,
            };
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &layer.bind_group, &[]);
            rpass.set_vertex_buffer(0, layer.plane.vertex.slice(..));
            rpass.set_index_buffer(layer.plane.index.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..layer.plane.index_count, 0, 0..1);
        }
    }
}

fn create_layer_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    layer: LayerKind,
) -> wgpu::RenderPipeline {
    // The shadow never writes depth so the coplanar main layer always lands on top.
    let (entry_point, depth_write_enabled) = match layer {
        LayerKind::Main => ("vs_main_layer", true),
        LayerKind::Shadow => ("vs_shadow_layer", false),
    };
    let label = format!("{}-layer-pipeline", layer.label());
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point,
            buffers: &[plane_vertex_layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_layer",
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            cull_mode: None,
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: layer_multisample(),
        multiview: None,
    })
}

fn create_layer_resources(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    texture: &wgpu::TextureView,
    item: DrawItem,
) -> LayerResources {
    let label = item.layer.label();
    let plane = upload_plane(device, &item);

    let uniform_label = format!("{label}-layer-uniform-buffer");
    let initial = LayerUniforms::new(Mat4::IDENTITY, &item, Vec3::ZERO, BulgeParameters::FLAT);
    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&uniform_label),
        contents: cast_slice(&[initial]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let bind_group_label = format!("{label}-layer-bind-group");
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&bind_group_label),
        layout: bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(texture),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    LayerResources {
        item,
        plane,
        uniform_buffer,
        bind_group,
    }
}

fn upload_glyph_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layer: LayerKind,
    image: &GlyphImage,
) -> Result<GlyphTexture> {
    let extent = wgpu::Extent3d {
        width: image.width,
        height: image.height,
        depth_or_array_layers: 1,
    };
    let label = format!("{}-glyph-texture", layer.label());
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&label),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let upload = prepare_rgba_upload(image.width, image.height, &image.pixels)?;
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        upload.pixels(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(upload.bytes_per_row()),
            rows_per_image: Some(image.height),
        },
        extent,
    );
    info!(
        "{} texture uploaded from {} ({}x{})",
        layer.label(),
        image.source.display(),
        image.width,
        image.height
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Ok(GlyphTexture {
        _texture: texture,
        view,
    })
}

fn layer_multisample() -> wgpu::MultisampleState {
    wgpu::MultisampleState {
        count: SAMPLE_COUNT,
        ..wgpu::MultisampleState::default()
    }
}

/// Describes a render attachment for the layer pass. Colour and depth must
/// share the pipelines' sample count or the pass is rejected.
fn attachment_descriptor(
    label: &'static str,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: layer_multisample().count,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    }
}

fn create_attachment(
    device: &wgpu::Device,
    label: &'static str,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&attachment_descriptor(label, format, width, height));
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
