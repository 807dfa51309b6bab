//! Tessellated planes for both layers. The grid lies in the local XY plane,
//! centred on the origin and facing +Z. Rows run top to bottom so UV (0, 0) is
//! the top-left texel, matching how image rows land in a wgpu texture.
//!
//! Subdivision density is the spatial resolution of the bulge: the vertex
//! program only moves vertices, so a coarse grid shows facets at the rim.

use bytemuck::{Pod, Zeroable};

/// Segment count per axis for the interactive layer.
pub const MAIN_SEGMENTS: u32 = 64;
/// Segment count per axis for the static shadow layer.
pub const SHADOW_SEGMENTS: u32 = 1;
/// Keeps `(segments + 1)^2` inside the `u16` index range.
pub const MAX_SEGMENTS: u32 = 254;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PlaneVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone)]
pub struct PlaneGeometry {
    pub vertices: Vec<PlaneVertex>,
    pub indices: Vec<u16>,
    pub width: f32,
    pub height: f32,
    pub segments_x: u32,
    pub segments_y: u32,
}

impl PlaneGeometry {
    pub fn new(width: f32, height: f32, segments_x: u32, segments_y: u32) -> Self {
        let grid_x = segments_x.clamp(1, MAX_SEGMENTS);
        let grid_y = segments_y.clamp(1, MAX_SEGMENTS);
        let columns = grid_x + 1;
        let rows = grid_y + 1;

        let half_width = width * 0.5;
        let half_height = height * 0.5;
        let segment_width = width / grid_x as f32;
        let segment_height = height / grid_y as f32;

        let mut vertices = Vec::with_capacity((columns * rows) as usize);
        for iy in 0..rows {
            let y = half_height - iy as f32 * segment_height;
            for ix in 0..columns {
                let x = ix as f32 * segment_width - half_width;
                vertices.push(PlaneVertex {
                    position: [x, y, 0.0],
                    uv: [ix as f32 / grid_x as f32, iy as f32 / grid_y as f32],
                });
            }
        }

        let mut indices = Vec::with_capacity((grid_x * grid_y * 6) as usize);
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let top_left = (ix + columns * iy) as u16;
                let bottom_left = (ix + columns * (iy + 1)) as u16;
                let bottom_right = (ix + 1 + columns * (iy + 1)) as u16;
                let top_right = (ix + 1 + columns * iy) as u16;
                indices.extend_from_slice(&[top_left, bottom_left, top_right]);
                indices.extend_from_slice(&[bottom_left, bottom_right, top_right]);
            }
        }

        Self {
            vertices,
            indices,
            width,
            height,
            segments_x: grid_x,
            segments_y: grid_y,
        }
    }

    /// Square-segmented grid, the layout both layers use.
    pub fn square(width: f32, height: f32, segments: u32) -> Self {
        Self::new(width, height, segments, segments)
    }
}
