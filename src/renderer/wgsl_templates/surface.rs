//! Surface-ray program: any-hit shades the candidate and merges it into the
//! pixel's K-slot hit buffers, closest-hit records which slot is visible.

use crate::combiner::VertexLayout;
use crate::renderer::types::{
    HIT_COLOR_BINDING, HIT_DISTANCE_FLOW_BINDING, HIT_INSTANCE_ID_BINDING, HIT_NORMAL_BINDING,
    HIT_SPECULAR_BINDING, NO_SLOT,
};
use crate::renderer::utils::fmt_f32;

use super::geometry::build_ray_uv;

/// Options that shape the surface program beyond the formula itself.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceOptions {
    pub hit_slots: u32,
    pub instance_distance_bias: f32,
    pub normal_map: bool,
    pub specular_map: bool,
}

/// Hit buffers, payload and the ordered insertion used by `surface_any_hit`.
pub fn build_hit_merge(hit_slots: u32, instance_distance_bias: f32) -> String {
    let mut out = format!(
        r#"
const HIT_SLOTS: u32 = {hit_slots}u;
const NO_SLOT: u32 = {NO_SLOT}u;
const INSTANCE_DISTANCE_BIAS: f32 = {bias};

struct SurfacePayload {{
    write_count: u32,
    floor_index: u32,
    terminal_slot: u32,
    visible_slot: u32,
}};

struct HitRecord {{
    distance: f32,
    flow: vec2f,
    color: vec4f,
    normal: vec3f,
    specular: vec3f,
    instance_id: u32,
}};

@group(0) @binding({HIT_DISTANCE_FLOW_BINDING})
var<storage, read_write> hit_distance_flow: array<vec4f>;

@group(0) @binding({HIT_COLOR_BINDING})
var<storage, read_write> hit_color: array<vec4f>;

@group(0) @binding({HIT_NORMAL_BINDING})
var<storage, read_write> hit_normal: array<vec4f>;

@group(0) @binding({HIT_SPECULAR_BINDING})
var<storage, read_write> hit_specular: array<vec4f>;

@group(0) @binding({HIT_INSTANCE_ID_BINDING})
var<storage, read_write> hit_instance_id: array<u32>;
"#,
        bias = fmt_f32(instance_distance_bias),
    );
    out.push_str(HIT_MERGE_FUNCTIONS);
    out
}

const HIT_MERGE_FUNCTIONS: &str = r#"
fn hit_index(pixel: vec2u, slot: u32) -> u32 {
    let width = u32(frame.viewport_size.x);
    return (pixel.y * width + pixel.x) * HIT_SLOTS + slot;
}

fn slot_distance(pixel: vec2u, slot: u32) -> f32 {
    return hit_distance_flow[hit_index(pixel, slot)].x;
}

fn copy_slot(pixel: vec2u, from_slot: u32, to_slot: u32) {
    let src = hit_index(pixel, from_slot);
    let dst = hit_index(pixel, to_slot);
    hit_distance_flow[dst] = hit_distance_flow[src];
    hit_color[dst] = hit_color[src];
    hit_normal[dst] = hit_normal[src];
    hit_specular[dst] = hit_specular[src];
    hit_instance_id[dst] = hit_instance_id[src];
}

fn write_slot(pixel: vec2u, slot: u32, record: HitRecord) {
    let dst = hit_index(pixel, slot);
    hit_distance_flow[dst] = vec4f(record.distance, record.flow, 0.0);
    hit_color[dst] = record.color;
    hit_normal[dst] = vec4f(record.normal, 0.0);
    hit_specular[dst] = vec4f(record.specular, 0.0);
    hit_instance_id[dst] = record.instance_id;
}

// Returns true when the candidate became the farthest occupied record.
fn consider_hit(pixel: vec2u, record: HitRecord, payload: ptr<function, SurfacePayload>) -> bool {
    let floor_slot = (*payload).floor_index;
    if floor_slot >= HIT_SLOTS {
        return false;
    }
    let count = max((*payload).write_count, floor_slot);
    if count >= HIT_SLOTS && record.distance >= slot_distance(pixel, HIT_SLOTS - 1u) {
        return false;
    }
    var probe = min(count, HIT_SLOTS - 1u);
    loop {
        if probe <= floor_slot {
            break;
        }
        if record.distance >= slot_distance(pixel, probe - 1u) {
            break;
        }
        copy_slot(pixel, probe - 1u, probe);
        probe = probe - 1u;
    }
    write_slot(pixel, probe, record);

    let occupied = min(count + 1u, HIT_SLOTS);
    (*payload).write_count = occupied;
    let terminal = probe == occupied - 1u;
    if terminal {
        (*payload).terminal_slot = probe;
    } else if (*payload).terminal_slot != NO_SLOT && (*payload).terminal_slot >= probe {
        let shifted = (*payload).terminal_slot + 1u;
        (*payload).terminal_slot = select(shifted, NO_SLOT, shifted >= HIT_SLOTS);
    }
    return terminal;
}

fn screen_flow(world_pos: vec3f) -> vec2f {
    let current = frame.view_proj * vec4f(world_pos, 1.0);
    let previous = frame.prev_view_proj * vec4f(world_pos, 1.0);
    let current_w = select(current.w, 1.0, abs(current.w) < 0.000001);
    let previous_w = select(previous.w, 1.0, abs(previous.w) < 0.000001);
    let delta = previous.xy / previous_w - current.xy / current_w;
    return delta * 0.5 * frame.viewport_size;
}
"#;

/// `surface_any_hit` and `surface_closest_hit` for one variant.
pub fn build_surface_stages(layout: &VertexLayout, options: SurfaceOptions) -> String {
    let mut shading = String::new();

    let has_uv = layout.has_tex_coord();
    if options.normal_map && has_uv {
        shading.push_str(NORMAL_MAPPING);
    }
    shading.push_str("    var specular = vec3f(1.0);\n");
    if options.specular_map && has_uv {
        shading.push_str(
            r#"    if material.specular_tex_index >= 0 {
        specular = textureSampleLevel(textures[material.specular_tex_index], internal_sampler, uv, 0.0).rgb;
    }
"#,
        );
    }

    format!(
        r#"
fn surface_any_hit(hit: Intersection, payload: ptr<function, SurfacePayload>) -> bool {{
    let material = instance_materials[hit.instance_id];
    let tri = triangle_vertices(hit);
    let bary = barycentric_weights(hit);
{uv}    let ci = fetch_combiner_inputs(tri, bary, uv, material);
    let combined = combine_color(ci);
    let alpha = resolve_alpha(combined.a, material.solid_alpha_multiplier, hit.pixel);
    if alpha < 0.0 {{
        return false;
    }}
    let rgb = apply_darken_mix(combined.rgb, material.diffuse_color_mix);

    let world_pos = interpolate_vec3(tri, POSITION_OFFSET, bary);
    var normal = normalize(interpolate_vec3(tri, NORMAL_OFFSET, bary));
{shading}
    var record: HitRecord;
    record.distance = hit.ray_t + f32(hit.instance_id) * INSTANCE_DISTANCE_BIAS;
    record.flow = screen_flow(world_pos);
    record.color = vec4f(rgb, alpha);
    record.normal = normal;
    record.specular = specular;
    record.instance_id = hit.instance_id;
    return consider_hit(hit.pixel, record, payload);
}}

fn surface_closest_hit(hit: Intersection, payload: ptr<function, SurfacePayload>) {{
    let slot = (*payload).terminal_slot;
    if slot != NO_SLOT && hit_instance_id[hit_index(hit.pixel, slot)] == hit.instance_id {{
        (*payload).visible_slot = slot;
    }} else {{
        (*payload).visible_slot = NO_SLOT;
    }}
}}
"#,
        uv = build_ray_uv(layout),
    )
}

// Per-triangle tangent frame from positions and texture coordinates.
const NORMAL_MAPPING: &str = r#"    if material.normal_tex_index >= 0 {
        let p0 = vertex_vec3(tri.x, POSITION_OFFSET);
        let e1 = vertex_vec3(tri.y, POSITION_OFFSET) - p0;
        let e2 = vertex_vec3(tri.z, POSITION_OFFSET) - p0;
        let t0 = vertex_vec2(tri.x, UV_OFFSET);
        let d1 = vertex_vec2(tri.y, UV_OFFSET) - t0;
        let d2 = vertex_vec2(tri.z, UV_OFFSET) - t0;
        let det = d1.x * d2.y - d2.x * d1.y;
        if abs(det) > 0.00000001 {
            let r = 1.0 / det;
            let tangent = normalize((e1 * d2.y - e2 * d1.y) * r);
            let bitangent = normalize((e2 * d1.x - e1 * d2.x) * r);
            let tbn = mat3x3f(tangent, bitangent, normal);
            let texel = textureSampleLevel(textures[material.normal_tex_index], internal_sampler, uv, 0.0).xyz;
            normal = normalize(tbn * (texel * 2.0 - vec3f(1.0)));
        }
    }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::layout::layout_for;

    fn options(normal_map: bool, specular_map: bool) -> SurfaceOptions {
        SurfaceOptions {
            hit_slots: 13,
            instance_distance_bias: 1e-5,
            normal_map,
            specular_map,
        }
    }

    #[test]
    fn hit_merge_constants_follow_config() {
        let wgsl = build_hit_merge(4, 0.5);
        assert!(wgsl.contains("const HIT_SLOTS: u32 = 4u;"));
        assert!(wgsl.contains("const INSTANCE_DISTANCE_BIAS: f32 = 0.5;"));
        assert!(wgsl.contains("const NO_SLOT: u32 = 4294967295u;"));
    }

    #[test]
    fn insertion_never_probes_below_the_floor() {
        let wgsl = build_hit_merge(4, 0.5);
        assert!(wgsl.contains("if floor_slot >= HIT_SLOTS {"));
        assert!(wgsl.contains("let count = max((*payload).write_count, floor_slot);"));
        assert!(wgsl.contains("if probe <= floor_slot {"));
    }

    #[test]
    fn maps_require_texture_coordinates() {
        let textured = layout_for(true, 1, false);
        let with_maps = build_surface_stages(&textured, options(true, true));
        assert!(with_maps.contains("material.normal_tex_index >= 0"));
        assert!(with_maps.contains("material.specular_tex_index >= 0"));

        let untextured = layout_for(false, 1, false);
        let without = build_surface_stages(&untextured, options(true, true));
        assert!(!without.contains("normal_tex_index"));
        assert!(without.contains("var specular = vec3f(1.0);"));
        assert!(without.contains("let uv = vec2f(0.0);"));
    }

    #[test]
    fn maps_are_opt_in() {
        let textured = layout_for(true, 1, false);
        let plain = build_surface_stages(&textured, options(false, false));
        assert!(!plain.contains("normal_tex_index"));
        assert!(!plain.contains("specular_tex_index"));
    }
}
