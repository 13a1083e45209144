//! Raster program: `vs_main` transforms world-space vertices and forwards the
//! layout's attributes, `fs_main` evaluates the combiner and the post chain.

use crate::combiner::{AttributeKind, CombinerFormula, VertexLayout};

/// Vertex input struct, varyings and both raster entry points.
pub fn build_raster_stages(formula: &CombinerFormula, layout: &VertexLayout) -> String {
    let mut vertex_input = String::from("struct VertexInput {\n");
    for attr in &layout.attributes {
        vertex_input.push_str(&format!(
            "    @location({}) {}: {},\n",
            attr.location,
            attr.name(),
            attr.wgsl_type()
        ));
    }
    vertex_input.push_str("};\n");

    // Varyings: everything except position, inputs widened to vec4f.
    let mut varyings =
        String::from("struct VertexOutput {\n    @builtin(position) clip_position: vec4f,\n");
    let mut forward = String::new();
    let mut fill_inputs = String::new();
    let mut location = 0u32;
    for attr in &layout.attributes {
        let name = attr.name();
        match attr.kind {
            AttributeKind::Position => continue,
            AttributeKind::Normal | AttributeKind::TexCoord => {
                varyings.push_str(&format!(
                    "    @location({location}) {name}: {},\n",
                    attr.wgsl_type()
                ));
                forward.push_str(&format!("    out.{name} = v.{name};\n"));
            }
            AttributeKind::Input(_) => {
                varyings.push_str(&format!("    @location({location}) {name}: vec4f,\n"));
                if attr.components == 4 {
                    forward.push_str(&format!("    out.{name} = v.{name};\n"));
                } else {
                    forward.push_str(&format!("    out.{name} = vec4f(v.{name}, 1.0);\n"));
                }
                fill_inputs.push_str(&format!("    ci.{name} = in.{name};\n"));
            }
        }
        location += 1;
    }
    varyings.push_str(&format!(
        "    @location({location}) @interpolate(flat) instance_id: u32,\n}};\n"
    ));

    let uv = if layout.has_tex_coord() { "in.uv" } else { "vec2f(0.0)" };
    if formula.uses_texture0 {
        fill_inputs.push_str(&format!(
            "    ci.texel0 = sample_diffuse(material.diffuse_tex_index, {uv});\n"
        ));
    }
    if formula.uses_texture1 {
        fill_inputs.push_str(&format!(
            "    ci.texel1 = sample_diffuse(material.diffuse_tex_index, {uv} * material.uv_detail_scale);\n"
        ));
    }

    format!(
        r#"
{vertex_input}
{varyings}
@vertex
fn vs_main(v: VertexInput, @builtin(instance_index) instance_index: u32) -> VertexOutput {{
    var out: VertexOutput;
    out.clip_position = frame.view_proj * vec4f(v.position, 1.0);
{forward}    out.instance_id = instance_index;
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4f {{
    let material = instance_materials[in.instance_id];
    var ci: CombinerInputs;
{fill_inputs}    let combined = combine_color(ci);
    let pixel = vec2u(in.clip_position.xy);
    let alpha = resolve_alpha(combined.a, material.solid_alpha_multiplier, pixel);
    if alpha < 0.0 {{
        discard;
    }}
    let darkened = apply_darken_mix(combined.rgb, material.diffuse_color_mix);
    return vec4f(apply_brighten_mix(darkened, material.diffuse_color_mix), alpha);
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::layout::layout_for;
    use crate::combiner::{CombinerFlags, CombinerOpcode, Operand, decode};

    #[test]
    fn varyings_skip_position_and_widen_inputs() {
        let formula = decode(CombinerOpcode::from_parts(
            [Operand::Input(1), Operand::Zero, Operand::Texel0, Operand::Zero],
            [Operand::Input(1), Operand::Zero, Operand::Texel0, Operand::Zero],
            CombinerFlags::default(),
        ));
        let layout = layout_for(true, 1, false);
        let wgsl = build_raster_stages(&formula, &layout);
        assert!(wgsl.contains("@location(3) input_1: vec3f,"));
        assert!(wgsl.contains("@location(2) input_1: vec4f,"));
        assert!(wgsl.contains("out.input_1 = vec4f(v.input_1, 1.0);"));
        assert!(wgsl.contains("@location(3) @interpolate(flat) instance_id: u32,"));
        assert!(wgsl.contains("ci.texel0 = sample_diffuse(material.diffuse_tex_index, in.uv);"));
    }
}
