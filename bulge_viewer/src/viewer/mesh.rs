//! GPU-side plane meshes and the per-layer uniform block.

use bulge_core::{BulgeParameters, DrawItem, PlaneGeometry, PlaneVertex};
use bytemuck::{Pod, Zeroable, cast_slice};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

/// Matches `LayerUniforms` in the layer shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LayerUniforms {
    pub view_projection: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub displacement: [f32; 4],
    pub color: [f32; 4],
    pub bulge: [f32; 4],
}

impl LayerUniforms {
    pub fn new(
        view_projection: Mat4,
        item: &DrawItem,
        displacement: Vec3,
        bulge: BulgeParameters,
    ) -> Self {
        let bulge = item.bulge(bulge);
        Self {
            view_projection: view_projection.to_cols_array_2d(),
            model: item.model.to_cols_array_2d(),
            displacement: displacement.extend(0.0).to_array(),
            color: item.style.as_uniform(),
            bulge: [bulge.radius, bulge.height, 0.0, 0.0],
        }
    }
}

pub(super) const PLANE_VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

pub(super) fn plane_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<PlaneVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &PLANE_VERTEX_ATTRIBUTES,
    }
}

pub(super) struct PlaneBuffers {
    pub vertex: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub index_count: u32,
}

pub(super) fn upload_plane(device: &wgpu::Device, item: &DrawItem) -> PlaneBuffers {
    let layer = item.layer;
    let geometry = PlaneGeometry::square(item.size.x, item.size.y, item.segments);
    let vertex_label = format!("{}-plane-vertex-buffer", layer.label());
    let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&vertex_label),
        contents: cast_slice(&geometry.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let index_label = format!("{}-plane-index-buffer", layer.label());
    let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&index_label),
        contents: cast_slice(&geometry.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    PlaneBuffers {
        vertex,
        index,
        index_count: geometry.indices.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulge_core::{SceneGraph, WidgetSettings};

    #[test]
    fn uniform_block_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<LayerUniforms>(), 176);
        assert_eq!(std::mem::size_of::<LayerUniforms>() % 16, 0);
    }

    #[test]
    fn shadow_uniforms_carry_no_bulge() {
        let graph = SceneGraph::isometric(&WidgetSettings::default());
        let items = graph.draw_items();
        let params = BulgeParameters::new(3.0, 0.8);
        let shadow = LayerUniforms::new(Mat4::IDENTITY, &items[0], Vec3::ZERO, params);
        let main = LayerUniforms::new(Mat4::IDENTITY, &items[1], Vec3::ZERO, params);
        assert_eq!(shadow.bulge, [0.0; 4]);
        assert_eq!(main.bulge, [3.0, 0.8, 0.0, 0.0]);
        assert_eq!(shadow.color[3], 0.3);
    }

    #[test]
    fn degenerate_bulge_is_sanitised_before_upload() {
        let graph = SceneGraph::isometric(&WidgetSettings::default());
        let main = graph.interactive_item().expect("main layer");
        let uniforms = LayerUniforms::new(
            Mat4::IDENTITY,
            &main,
            Vec3::ZERO,
            BulgeParameters::new(f32::NAN, 0.8),
        );
        assert_eq!(uniforms.bulge, [0.0; 4]);
    }
}
