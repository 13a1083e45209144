//! Shadow-ray program: each accepted candidate attenuates the remaining light.

use crate::combiner::VertexLayout;

use super::geometry::build_ray_uv;

/// `shadow_any_hit` returns true once no light remains and the search may end.
pub fn build_shadow_stages(layout: &VertexLayout) -> String {
    format!(
        r#"
struct ShadowPayload {{
    remaining_light: f32,
}};

fn shadow_any_hit(hit: Intersection, payload: ptr<function, ShadowPayload>) -> bool {{
    let material = instance_materials[hit.instance_id];
    let tri = triangle_vertices(hit);
    let bary = barycentric_weights(hit);
{uv}    let ci = fetch_combiner_inputs(tri, bary, uv, material);
    let alpha = resolve_alpha(combine_alpha(ci), material.shadow_alpha_multiplier, hit.pixel);
    if alpha < 0.0 {{
        return false;
    }}
    (*payload).remaining_light = max((*payload).remaining_light - alpha, 0.0);
    return (*payload).remaining_light <= 0.0;
}}

fn shadow_closest_hit(hit: Intersection, payload: ptr<function, ShadowPayload>) {{
    (*payload).remaining_light = 0.0;
}}
"#,
        uv = build_ray_uv(layout),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::layout::layout_for;

    #[test]
    fn shadow_uses_alpha_and_shadow_multiplier() {
        let wgsl = build_shadow_stages(&layout_for(true, 1, true));
        assert!(wgsl.contains("combine_alpha(ci), material.shadow_alpha_multiplier"));
        assert!(wgsl.contains("let uv = interpolate_vec2(tri, UV_OFFSET, bary);"));
    }
}
