//! Vertex fetch for ray programs.
//!
//! Ray stages read world-space vertices straight from storage buffers, using
//! the variant's vertex layout as float offsets.

use crate::combiner::{AttributeKind, CombinerFormula, VertexLayout};
use crate::renderer::types::{INDEX_DATA_BINDING, VERTEX_DATA_BINDING};

/// Geometry buffers, layout constants and interpolation helpers.
pub fn build_ray_geometry(layout: &VertexLayout) -> String {
    let mut out = format!(
        r#"
struct Intersection {{
    barycentrics: vec2f,
    ray_t: f32,
    instance_id: u32,
    primitive_index: u32,
    index_base: u32,
    vertex_base: u32,
    _pad0: u32,
    pixel: vec2u,
}};

@group(0) @binding({VERTEX_DATA_BINDING})
var<storage, read> vertex_data: array<f32>;

@group(0) @binding({INDEX_DATA_BINDING})
var<storage, read> index_data: array<u32>;

const VERTEX_STRIDE: u32 = {}u;
"#,
        layout.stride_floats()
    );

    for attr in &layout.attributes {
        out.push_str(&format!(
            "const {}_OFFSET: u32 = {}u;\n",
            attr.name().to_ascii_uppercase(),
            attr.offset / 4
        ));
    }

    out.push_str(VERTEX_FETCH_HELPERS);
    out
}

const VERTEX_FETCH_HELPERS: &str = r#"
fn vertex_float(vtx: u32, offset: u32) -> f32 {
    return vertex_data[vtx * VERTEX_STRIDE + offset];
}

fn vertex_vec2(vtx: u32, offset: u32) -> vec2f {
    return vec2f(vertex_float(vtx, offset), vertex_float(vtx, offset + 1u));
}

fn vertex_vec3(vtx: u32, offset: u32) -> vec3f {
    return vec3f(vertex_float(vtx, offset), vertex_float(vtx, offset + 1u), vertex_float(vtx, offset + 2u));
}

fn vertex_vec4(vtx: u32, offset: u32) -> vec4f {
    return vec4f(vertex_vec3(vtx, offset), vertex_float(vtx, offset + 3u));
}

fn triangle_vertices(hit: Intersection) -> vec3u {
    let first_index = hit.index_base + hit.primitive_index * 3u;
    let local = vec3u(index_data[first_index], index_data[first_index + 1u], index_data[first_index + 2u]);
    return local + vec3u(hit.vertex_base);
}

fn barycentric_weights(hit: Intersection) -> vec3f {
    return vec3f(1.0 - hit.barycentrics.x - hit.barycentrics.y, hit.barycentrics.x, hit.barycentrics.y);
}

fn interpolate_vec2(tri: vec3u, offset: u32, bary: vec3f) -> vec2f {
    return vertex_vec2(tri.x, offset) * bary.x + vertex_vec2(tri.y, offset) * bary.y + vertex_vec2(tri.z, offset) * bary.z;
}

fn interpolate_vec3(tri: vec3u, offset: u32, bary: vec3f) -> vec3f {
    return vertex_vec3(tri.x, offset) * bary.x + vertex_vec3(tri.y, offset) * bary.y + vertex_vec3(tri.z, offset) * bary.z;
}

fn interpolate_vec4(tri: vec3u, offset: u32, bary: vec3f) -> vec4f {
    return vertex_vec4(tri.x, offset) * bary.x + vertex_vec4(tri.y, offset) * bary.y + vertex_vec4(tri.z, offset) * bary.z;
}
"#;

/// `fetch_combiner_inputs`: interpolated vertex colors plus the texels the
/// formula reads.
pub fn build_ray_combiner_fetch(formula: &CombinerFormula, layout: &VertexLayout) -> String {
    let mut out = String::from(
        r#"
fn fetch_combiner_inputs(tri: vec3u, bary: vec3f, uv: vec2f, material: InstanceMaterial) -> CombinerInputs {
    var ci: CombinerInputs;
"#,
    );
    for attr in layout.inputs() {
        let AttributeKind::Input(n) = attr.kind else {
            continue;
        };
        let offset = format!("{}_OFFSET", attr.name().to_ascii_uppercase());
        if attr.components == 4 {
            out.push_str(&format!("    ci.input_{n} = interpolate_vec4(tri, {offset}, bary);\n"));
        } else {
            out.push_str(&format!(
                "    ci.input_{n} = vec4f(interpolate_vec3(tri, {offset}, bary), 1.0);\n"
            ));
        }
    }
    if formula.uses_texture0 {
        out.push_str("    ci.texel0 = sample_diffuse(material.diffuse_tex_index, uv);\n");
    }
    if formula.uses_texture1 {
        out.push_str(
            "    ci.texel1 = sample_diffuse(material.diffuse_tex_index, uv * material.uv_detail_scale);\n",
        );
    }
    out.push_str("    return ci;\n}\n");
    out
}

/// Statement binding `uv` for the hit, zero when the layout has no texture coordinate.
pub fn build_ray_uv(layout: &VertexLayout) -> &'static str {
    if layout.has_tex_coord() {
        "    let uv = interpolate_vec2(tri, UV_OFFSET, bary);\n"
    } else {
        "    let uv = vec2f(0.0);\n"
    }
}
