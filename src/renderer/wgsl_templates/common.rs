//! Declarations shared by the raster, surface-ray and shadow-ray programs.

use crate::combiner::CombinerFlags;
use crate::combiner::post::TEXTURE_EDGE_THRESHOLD;
use crate::renderer::types::{
    COMBINER_SAMPLER_BINDING, FRAME_PARAMS_BINDING, INSTANCE_MATERIALS_BINDING,
    INTERNAL_SAMPLER_BINDING, TEXTURES_BINDING,
};
use crate::renderer::utils::fmt_f32;

/// Structs and group-0 bindings every program declares.
pub fn build_shared_declarations(max_textures: u32) -> String {
    format!(
        r#"
struct FrameParams {{
    view_proj: mat4x4f,
    prev_view_proj: mat4x4f,
    viewport_size: vec2f,
    frame_counter: u32,
    _pad0: u32,
}};

struct InstanceMaterial {{
    diffuse_color_mix: vec4f,
    diffuse_tex_index: i32,
    normal_tex_index: i32,
    specular_tex_index: i32,
    solid_alpha_multiplier: f32,
    shadow_alpha_multiplier: f32,
    uv_detail_scale: f32,
    _pad0: f32,
    _pad1: f32,
}};

@group(0) @binding({FRAME_PARAMS_BINDING})
var<uniform> frame: FrameParams;

@group(0) @binding({INSTANCE_MATERIALS_BINDING})
var<storage, read> instance_materials: array<InstanceMaterial>;

@group(0) @binding({TEXTURES_BINDING})
var textures: binding_array<texture_2d<f32>, {max_textures}>;

@group(0) @binding({COMBINER_SAMPLER_BINDING})
var combiner_sampler: sampler;

@group(0) @binding({INTERNAL_SAMPLER_BINDING})
var internal_sampler: sampler;

fn sample_diffuse(index: i32, uv: vec2f) -> vec4f {{
    if index < 0 {{
        return vec4f(1.0);
    }}
    return textureSampleLevel(textures[index], combiner_sampler, uv, 0.0);
}}
"#
    )
}

/// Noise, diffuse mix and alpha resolution. Only the steps enabled by the
/// opcode are emitted into `resolve_alpha`; a negative result means reject.
pub fn build_post_process(flags: CombinerFlags) -> String {
    let mut out = String::from(POST_PROCESS_HELPERS);

    out.push_str(
        r#"
fn resolve_alpha(alpha_in: f32, multiplier: f32, pixel: vec2u) -> f32 {
    var alpha = clamp(alpha_in * multiplier, 0.0, 1.0);
"#,
    );
    if flags.texture_edge {
        out.push_str(&format!(
            r#"    if alpha > {} {{
        alpha = 1.0;
    }} else {{
        return REJECTED;
    }}
"#,
            fmt_f32(TEXTURE_EDGE_THRESHOLD)
        ));
    }
    if flags.noise_dither {
        out.push_str(
            r#"    let draw = dither_draw(pixel, frame.frame_counter);
    if draw == 0.0 {
        return REJECTED;
    }
    alpha = alpha * draw;
"#,
        );
    }
    out.push_str("    return alpha;\n}\n");
    out
}

const POST_PROCESS_HELPERS: &str = r#"
const REJECTED: f32 = -1.0;

fn pcg_hash(v: u32) -> u32 {
    let state = v * 747796405u + 2891336453u;
    let word = ((state >> ((state >> 28u) + 4u)) ^ state) * 277803737u;
    return (word >> 22u) ^ word;
}

fn dither_noise(pixel: vec2u, frame_counter: u32) -> f32 {
    let h = pcg_hash(pixel.x + pcg_hash(pixel.y + pcg_hash(frame_counter)));
    return f32(h >> 8u) / 16777216.0;
}

fn dither_draw(pixel: vec2u, frame_counter: u32) -> f32 {
    return select(0.0, 1.0, dither_noise(pixel, frame_counter) >= 0.5);
}

fn apply_darken_mix(rgb: vec3f, mix_color: vec4f) -> vec3f {
    return mix(rgb, mix_color.rgb, vec3f(max(-mix_color.a, 0.0)));
}

fn apply_brighten_mix(rgb: vec3f, mix_color: vec4f) -> vec3f {
    return mix(rgb, mix_color.rgb, vec3f(max(mix_color.a, 0.0)));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_and_dither_are_opt_in() {
        let plain = build_post_process(CombinerFlags::default());
        assert!(!plain.contains("alpha > 0.3"));
        assert!(!plain.contains("let draw = dither_draw"));

        let all = build_post_process(CombinerFlags {
            alpha_test: false,
            texture_edge: true,
            noise_dither: true,
        });
        assert!(all.contains("if alpha > 0.300000012"));
        assert!(all.contains("let draw = dither_draw(pixel, frame.frame_counter);"));
    }

    #[test]
    fn shared_declarations_size_texture_array() {
        let decls = build_shared_declarations(64);
        assert!(decls.contains("binding_array<texture_2d<f32>, 64>"));
        assert!(decls.contains("@group(0) @binding(3)\nvar combiner_sampler: sampler;"));
    }
}
