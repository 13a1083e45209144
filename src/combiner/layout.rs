//! Per-vertex attribute layout derived from a combiner formula.
//!
//! Attributes are packed in a fixed order (position, normal, uv, inputs) as
//! tightly packed `f32` components, so the stride is the sum of present fields.

use serde::Serialize;

use super::opcode::CombinerFormula;

const F32_SIZE: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AttributeKind {
    Position,
    Normal,
    TexCoord,
    /// 1-based per-vertex color input.
    Input(u8),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct VertexAttribute {
    pub kind: AttributeKind,
    /// Shader location in the rasterization vertex stage.
    pub location: u32,
    pub offset: u32,
    pub components: u32,
}

impl VertexAttribute {
    pub fn size(&self) -> u32 {
        self.components * F32_SIZE
    }

    pub fn wgsl_type(&self) -> &'static str {
        match self.components {
            2 => "vec2f",
            3 => "vec3f",
            _ => "vec4f",
        }
    }

    pub fn name(&self) -> String {
        match self.kind {
            AttributeKind::Position => "position".to_string(),
            AttributeKind::Normal => "normal".to_string(),
            AttributeKind::TexCoord => "uv".to_string(),
            AttributeKind::Input(n) => format!("input_{n}"),
        }
    }
}

/// Concrete per-vertex layout. Byte-identical for formulas that agree on
/// texture use, input count and alpha test.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct VertexLayout {
    pub attributes: Vec<VertexAttribute>,
    pub stride: u32,
}

impl VertexLayout {
    pub fn attribute(&self, kind: AttributeKind) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.kind == kind)
    }

    pub fn position_offset(&self) -> u32 {
        self.attribute(AttributeKind::Position).map_or(0, |a| a.offset)
    }

    pub fn normal_offset(&self) -> u32 {
        self.attribute(AttributeKind::Normal).map_or(0, |a| a.offset)
    }

    pub fn uv_offset(&self) -> Option<u32> {
        self.attribute(AttributeKind::TexCoord).map(|a| a.offset)
    }

    pub fn has_tex_coord(&self) -> bool {
        self.uv_offset().is_some()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &VertexAttribute> {
        self.attributes
            .iter()
            .filter(|a| matches!(a.kind, AttributeKind::Input(_)))
    }

    /// Stride in `f32` elements, for hosts that expose vertex data as `array<f32>`.
    pub fn stride_floats(&self) -> u32 {
        self.stride / F32_SIZE
    }
}

/// Derive the vertex layout for a formula.
pub fn derive_vertex_layout(formula: &CombinerFormula, alpha_test: bool) -> VertexLayout {
    layout_for(formula.uses_texture(), formula.input_count, alpha_test)
}

/// Layout from the three inputs that determine it.
pub fn layout_for(uses_texture: bool, input_count: u8, alpha_test: bool) -> VertexLayout {
    let mut attributes = Vec::new();
    let mut offset = 0u32;
    let mut push = |kind: AttributeKind, components: u32| {
        let attr = VertexAttribute {
            kind,
            location: attributes.len() as u32,
            offset,
            components,
        };
        offset += attr.size();
        attributes.push(attr);
    };

    push(AttributeKind::Position, 3);
    push(AttributeKind::Normal, 3);
    if uses_texture {
        push(AttributeKind::TexCoord, 2);
    }
    let input_components = if alpha_test { 4 } else { 3 };
    for n in 1..=input_count.min(4) {
        push(AttributeKind::Input(n), input_components);
    }

    VertexLayout {
        attributes,
        stride: offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combiner::opcode::{CombinerFlags, CombinerOpcode, Operand, decode};
    use proptest::prelude::*;

    #[test]
    fn minimal_layout_is_position_and_normal() {
        let layout = layout_for(false, 0, false);
        assert_eq!(layout.attributes.len(), 2);
        assert_eq!(layout.position_offset(), 0);
        assert_eq!(layout.normal_offset(), 12);
        assert_eq!(layout.stride, 24);
        assert!(!layout.has_tex_coord());
    }

    #[test]
    fn offsets_follow_fixed_order() {
        let layout = layout_for(true, 2, true);
        let offsets: Vec<(AttributeKind, u32)> =
            layout.attributes.iter().map(|a| (a.kind, a.offset)).collect();
        assert_eq!(
            offsets,
            vec![
                (AttributeKind::Position, 0),
                (AttributeKind::Normal, 12),
                (AttributeKind::TexCoord, 24),
                (AttributeKind::Input(1), 32),
                (AttributeKind::Input(2), 48),
            ]
        );
        assert_eq!(layout.stride, 64);
        assert_eq!(layout.stride_floats(), 16);
        assert_eq!(layout.attributes[4].location, 4);
    }

    #[test]
    fn inputs_are_rgb_without_alpha_test() {
        let layout = layout_for(false, 3, false);
        assert!(layout.inputs().all(|a| a.components == 3));
        assert_eq!(layout.stride, 24 + 3 * 12);
    }

    #[test]
    fn distinct_opcodes_share_layout() {
        let a = decode(CombinerOpcode::from_parts(
            [Operand::Texel0, Operand::Zero, Operand::Input(2), Operand::Zero],
            [Operand::Zero; 4],
            CombinerFlags::default(),
        ));
        let b = decode(CombinerOpcode::from_parts(
            [Operand::Zero, Operand::Zero, Operand::Zero, Operand::Texel1],
            [Operand::Zero, Operand::Zero, Operand::Zero, Operand::Input(2)],
            CombinerFlags::default(),
        ));
        assert_ne!(a.opcode, b.opcode);
        assert_eq!(derive_vertex_layout(&a, false), derive_vertex_layout(&b, false));
    }

    proptest! {
        #[test]
        fn layout_depends_only_on_its_inputs(
            x in any::<u32>(),
            y in any::<u32>(),
            alpha_test in any::<bool>(),
        ) {
            let (fx, fy) = (decode(CombinerOpcode(x)), decode(CombinerOpcode(y)));
            let lx = derive_vertex_layout(&fx, alpha_test);
            let ly = derive_vertex_layout(&fy, alpha_test);
            if fx.uses_texture() == fy.uses_texture() && fx.input_count == fy.input_count {
                prop_assert_eq!(lx, ly);
            }
        }

        #[test]
        fn stride_is_sum_of_fields(
            tex in any::<bool>(),
            inputs in 0u8..=4,
            alpha_test in any::<bool>(),
        ) {
            let layout = layout_for(tex, inputs, alpha_test);
            let sum: u32 = layout.attributes.iter().map(|a| a.size()).sum();
            prop_assert_eq!(layout.stride, sum);
        }
    }
}
