//! Color-combiner model: opcode decoding, vertex layout derivation, sampler
//! slots and the host-side reference of the post-combiner chain.

pub mod layout;
pub mod opcode;
pub mod post;
pub mod sampler;

pub use layout::{AttributeKind, VertexAttribute, VertexLayout, derive_vertex_layout};
pub use opcode::{
    ALPHA, COLOR, CombinerFlags, CombinerFormula, CombinerOpcode, FormulaShape, Operand, decode,
};
pub use sampler::{
    AddressMode, FilterMode, INTERNAL_SAMPLER_SLOT, SamplerDesc, SamplerRegistry, VariantKey,
    variant_key,
};
