//! Combiner opcode decoding.
//!
//! A combiner opcode packs a two-channel blending formula into 32 bits:
//! - bits 0..=11: color equation, four 3-bit operand slots
//! - bits 12..=23: alpha equation, four 3-bit operand slots
//! - bit 24: alpha test
//! - bit 26: texture edge
//! - bit 27: noise dither
//!
//! Every other bit is ignored. Decoding is total: any `u32` yields a formula.

use serde::Serialize;

const SLOT_BITS: u32 = 3;
const SLOT_MASK: u32 = 0b111;
const EQUATION_BITS: u32 = 12;
const EQUATION_MASK: u32 = (1 << EQUATION_BITS) - 1;

const ALPHA_TEST_BIT: u32 = 1 << 24;
const TEXTURE_EDGE_BIT: u32 = 1 << 26;
const NOISE_DITHER_BIT: u32 = 1 << 27;

/// Channel index of the color equation.
pub const COLOR: usize = 0;
/// Channel index of the alpha equation.
pub const ALPHA: usize = 1;

/// Opaque 32-bit combiner opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CombinerOpcode(pub u32);

impl CombinerOpcode {
    /// Build an opcode from color and alpha slots plus flags.
    pub fn from_parts(color: [Operand; 4], alpha: [Operand; 4], flags: CombinerFlags) -> Self {
        let mut bits = pack_equation(color) | (pack_equation(alpha) << EQUATION_BITS);
        if flags.alpha_test {
            bits |= ALPHA_TEST_BIT;
        }
        if flags.texture_edge {
            bits |= TEXTURE_EDGE_BIT;
        }
        if flags.noise_dither {
            bits |= NOISE_DITHER_BIT;
        }
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn color_equation(self) -> u32 {
        self.0 & EQUATION_MASK
    }

    pub fn alpha_equation(self) -> u32 {
        (self.0 >> EQUATION_BITS) & EQUATION_MASK
    }

    pub fn flags(self) -> CombinerFlags {
        CombinerFlags {
            alpha_test: self.0 & ALPHA_TEST_BIT != 0,
            texture_edge: self.0 & TEXTURE_EDGE_BIT != 0,
            noise_dither: self.0 & NOISE_DITHER_BIT != 0,
        }
    }
}

impl std::fmt::Display for CombinerOpcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Auxiliary test flags carried in the high bits of the opcode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CombinerFlags {
    pub alpha_test: bool,
    pub texture_edge: bool,
    pub noise_dither: bool,
}

/// A named input usable inside a formula slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Operand {
    Zero,
    /// Interpolated per-vertex color, 1-based (`Input(1)..=Input(4)`).
    Input(u8),
    Texel0,
    /// Alpha of the first texture stage, broadcast as a scalar.
    Texel0Alpha,
    Texel1,
}

impl Operand {
    pub fn from_bits(bits: u32) -> Self {
        match bits & SLOT_MASK {
            0 => Operand::Zero,
            n @ 1..=4 => Operand::Input(n as u8),
            5 => Operand::Texel0,
            6 => Operand::Texel0Alpha,
            _ => Operand::Texel1,
        }
    }

    pub fn to_bits(self) -> u32 {
        match self {
            Operand::Zero => 0,
            Operand::Input(n) => u32::from(n.clamp(1, 4)),
            Operand::Texel0 => 5,
            Operand::Texel0Alpha => 6,
            Operand::Texel1 => 7,
        }
    }

    pub fn input_index(self) -> Option<u8> {
        match self {
            Operand::Input(n) => Some(n),
            _ => None,
        }
    }

    pub fn uses_texture0(self) -> bool {
        matches!(self, Operand::Texel0 | Operand::Texel0Alpha)
    }

    pub fn uses_texture1(self) -> bool {
        matches!(self, Operand::Texel1)
    }
}

/// Structural form of a channel's equation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FormulaShape {
    /// `c[3]`
    Single,
    /// `c[0] * c[2]`
    Multiply,
    /// `lerp(c[1], c[0], c[2])`
    Mix,
    /// `(c[0] - c[1]) * c[2] + c[3]`
    General,
}

impl FormulaShape {
    /// Classify a slot pattern. The checks run in a fixed order, so exactly one
    /// shape is returned.
    pub fn classify(slots: &[Operand; 4]) -> Self {
        if slots[2] == Operand::Zero {
            FormulaShape::Single
        } else if slots[1] == Operand::Zero && slots[3] == Operand::Zero {
            FormulaShape::Multiply
        } else if slots[1] == slots[3] {
            FormulaShape::Mix
        } else {
            FormulaShape::General
        }
    }

    pub fn is_single(self) -> bool {
        self == FormulaShape::Single
    }

    pub fn is_multiply(self) -> bool {
        self == FormulaShape::Multiply
    }

    pub fn is_mix(self) -> bool {
        self == FormulaShape::Mix
    }
}

/// Normalized two-channel formula description. Immutable once decoded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CombinerFormula {
    pub opcode: CombinerOpcode,
    /// `slots[channel][0..4]`, channel 0 is color, channel 1 is alpha.
    pub slots: [[Operand; 4]; 2],
    /// Shape per channel. Both entries come from the color channel's pattern:
    /// the alpha equation is emitted with the color equation's shape.
    pub shapes: [FormulaShape; 2],
    pub color_alpha_same: bool,
    /// Highest `Input(n)` referenced by either channel, 0 if none.
    pub input_count: u8,
    pub uses_texture0: bool,
    pub uses_texture1: bool,
    pub flags: CombinerFlags,
}

impl CombinerFormula {
    pub fn shape(&self, channel: usize) -> FormulaShape {
        self.shapes[channel]
    }

    pub fn uses_texture(&self) -> bool {
        self.uses_texture0 || self.uses_texture1
    }
}

/// Decode an opcode into its formula.
pub fn decode(opcode: CombinerOpcode) -> CombinerFormula {
    let slots = [
        unpack_equation(opcode.color_equation()),
        unpack_equation(opcode.alpha_equation()),
    ];
    let color_shape = FormulaShape::classify(&slots[COLOR]);

    let mut input_count = 0u8;
    let mut uses_texture0 = false;
    let mut uses_texture1 = false;
    for op in slots.iter().flat_map(|ch| ch.iter().copied()) {
        if let Some(n) = op.input_index() {
            input_count = input_count.max(n);
        }
        uses_texture0 |= op.uses_texture0();
        uses_texture1 |= op.uses_texture1();
    }

    CombinerFormula {
        opcode,
        slots,
        shapes: [color_shape, color_shape],
        color_alpha_same: opcode.color_equation() == opcode.alpha_equation(),
        input_count,
        uses_texture0,
        uses_texture1,
        flags: opcode.flags(),
    }
}

fn unpack_equation(bits: u32) -> [Operand; 4] {
    std::array::from_fn(|i| Operand::from_bits(bits >> (SLOT_BITS * i as u32)))
}

fn pack_equation(slots: [Operand; 4]) -> u32 {
    slots
        .iter()
        .enumerate()
        .fold(0, |acc, (i, op)| acc | (op.to_bits() << (SLOT_BITS * i as u32)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use Operand::*;

    #[test]
    fn decodes_slots_in_bit_order() {
        // color: TEXEL0, ZERO, INPUT1, ZERO -> multiply
        let op = CombinerOpcode::from_parts(
            [Texel0, Zero, Input(1), Zero],
            [Texel0, Zero, Input(1), Zero],
            CombinerFlags::default(),
        );
        let f = decode(op);
        assert_eq!(f.slots[COLOR], [Texel0, Zero, Input(1), Zero]);
        assert_eq!(f.shape(COLOR), FormulaShape::Multiply);
        assert!(f.color_alpha_same);
        assert_eq!(f.input_count, 1);
        assert!(f.uses_texture0);
        assert!(!f.uses_texture1);
    }

    #[test]
    fn flags_come_from_high_bits() {
        let f = decode(CombinerOpcode((1 << 24) | (1 << 27)));
        assert!(f.flags.alpha_test);
        assert!(!f.flags.texture_edge);
        assert!(f.flags.noise_dither);

        let f = decode(CombinerOpcode(1 << 26));
        assert!(f.flags.texture_edge);
    }

    #[test]
    fn unused_high_bits_are_ignored() {
        let base = CombinerOpcode::from_parts(
            [Input(2), Input(1), Texel0Alpha, Input(1)],
            [Zero, Zero, Zero, Input(3)],
            CombinerFlags::default(),
        );
        let noisy = CombinerOpcode(base.0 | (1 << 25) | 0xF000_0000);
        let (a, b) = (decode(base), decode(noisy));
        assert_eq!(a.slots, b.slots);
        assert_eq!(a.shapes, b.shapes);
        assert_eq!(a.input_count, b.input_count);
    }

    #[test]
    fn classification_follows_fixed_order() {
        let classify = FormulaShape::classify;
        assert_eq!(classify(&[Texel0, Input(1), Zero, Input(2)]), FormulaShape::Single);
        assert_eq!(classify(&[Texel0, Zero, Input(1), Zero]), FormulaShape::Multiply);
        assert_eq!(classify(&[Texel0, Input(1), Texel0Alpha, Input(1)]), FormulaShape::Mix);
        assert_eq!(classify(&[Texel0, Input(1), Input(2), Input(3)]), FormulaShape::General);
        // Both zero in slots 1 and 3 is multiply, not mix.
        assert_eq!(classify(&[Texel0, Zero, Texel1, Zero]), FormulaShape::Multiply);
    }

    #[test]
    fn alpha_channel_uses_color_shape() {
        // color is Single, alpha pattern alone would classify as General.
        let f = decode(CombinerOpcode::from_parts(
            [Zero, Zero, Zero, Input(1)],
            [Texel0, Input(1), Input(2), Input(3)],
            CombinerFlags::default(),
        ));
        assert_eq!(f.shape(COLOR), FormulaShape::Single);
        assert_eq!(f.shape(ALPHA), FormulaShape::Single);
        assert!(!f.color_alpha_same);
        assert_eq!(f.input_count, 3);
    }

    #[test]
    fn texel1_sets_texture1_only() {
        let f = decode(CombinerOpcode::from_parts(
            [Zero, Zero, Zero, Texel1],
            [Zero, Zero, Zero, Texel1],
            CombinerFlags::default(),
        ));
        assert!(f.uses_texture1);
        assert!(!f.uses_texture0);
        assert!(f.uses_texture());
    }

    proptest! {
        #[test]
        fn decoding_is_deterministic(bits in any::<u32>()) {
            prop_assert_eq!(decode(CombinerOpcode(bits)), decode(CombinerOpcode(bits)));
        }

        #[test]
        fn exactly_one_shape_per_channel(bits in any::<u32>()) {
            let f = decode(CombinerOpcode(bits));
            for ch in [COLOR, ALPHA] {
                let s = f.shape(ch);
                let general = !s.is_single() && !s.is_multiply() && !s.is_mix();
                let held = [s.is_single(), s.is_multiply(), s.is_mix(), general]
                    .iter()
                    .filter(|b| **b)
                    .count();
                prop_assert_eq!(held, 1);
            }
        }

        #[test]
        fn packing_inverts_decoding(bits in 0u32..(1 << 24)) {
            let f = decode(CombinerOpcode(bits));
            let repacked = CombinerOpcode::from_parts(f.slots[COLOR], f.slots[ALPHA], f.flags);
            prop_assert_eq!(repacked.0, bits);
        }
    }
}
