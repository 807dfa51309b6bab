use bytemuck::{Pod, Zeroable};

/// Both glyph layers share one module. `vs_main_layer` lifts vertices around
/// the displacement point; `vs_shadow_layer` is a plain transform. The falloff
/// mirrors `bulge_core::bulge` and must stay in sync with it.
pub(super) const LAYER_SHADER_SOURCE: &str = r#"
struct LayerUniforms {
    view_projection: mat4x4<f32>,
    model: mat4x4<f32>,
    displacement: vec4<f32>,
    color: vec4<f32>,
    bulge: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: LayerUniforms;
@group(0) @binding(1)
var layer_texture: texture_2d<f32>;
@group(0) @binding(2)
var layer_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

fn ease_in_out_cubic(x: f32) -> f32 {
    if x < 0.5 {
        return 4.0 * x * x * x;
    }
    let falling = -2.0 * x + 2.0;
    return 1.0 - falling * falling * falling / 2.0;
}

fn map_range(value: f32, min1: f32, max1: f32, min2: f32, max2: f32) -> f32 {
    return min2 + (value - min1) * (max2 - min2) / (max1 - min1);
}

@vertex
fn vs_main_layer(input: VertexInput) -> VertexOutput {
    var local = input.position;
    let radius = uniforms.bulge.x;
    let height = uniforms.bulge.y;
    if radius > 0.0 {
        let world = uniforms.model * vec4<f32>(local, 1.0);
        let distance_to_contact = distance(world.xy, uniforms.displacement.xy);
        if distance_to_contact < radius {
            let proximity = map_range(distance_to_contact, 0.0, radius, 1.0, 0.0);
            local.z = local.z + ease_in_out_cubic(proximity) * height;
        }
    }

    var out: VertexOutput;
    out.position = uniforms.view_projection * uniforms.model * vec4<f32>(local, 1.0);
    out.uv = input.uv;
    return out;
}

@vertex
fn vs_shadow_layer(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = uniforms.view_projection * uniforms.model * vec4<f32>(input.position, 1.0);
    out.uv = input.uv;
    return out;
}

@fragment
fn fs_layer(input: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(layer_texture, layer_sampler, input.uv);
    if texel.a < 0.1 {
        discard;
    }
    return vec4<f32>(uniforms.color.rgb, texel.a * uniforms.color.a);
}
"#;

pub(super) const HUD_SHADER_SOURCE: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(input.position, 0.0, 1.0);
    out.uv = input.uv;
    return out;
}

@group(0) @binding(0)
var hud_texture: texture_2d<f32>;
@group(0) @binding(1)
var hud_sampler: sampler;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let uv = clamp(input.uv, vec2<f32>(0.0, 0.0), vec2<f32>(1.0, 1.0));
    return textureSample(hud_texture, hud_sampler, uv);
}
"#;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

pub(super) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];
