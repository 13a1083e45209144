//! Shader variant synthesis.
//!
//! - `types`: value types, program bundles, binding signatures, GPU structs
//! - `expr`: combiner expression tree, evaluated on the CPU or rendered to WGSL
//! - `wgsl_templates`: WGSL building blocks for the three programs
//! - `synth`: formula + layout -> raster, surface-ray and shadow-ray programs
//! - `validation`: compiler seam and the naga-backed compiler
//! - `variant_cache`: compiled variants keyed by `VariantKey`

pub mod expr;
pub mod synth;
pub mod types;
pub mod utils;
pub mod validation;
pub mod variant_cache;
pub mod wgsl_templates;

pub use synth::{ProgramSynthesizer, VariantRequest};
pub use types::{
    BindingSignature, FrameParams, InstanceMaterial, Intersection, ProgramBundle, ProgramKind,
};
pub use validation::{CompileRequest, CompiledProgram, NagaCompiler, ProgramCompiler, validate_wgsl};
pub use variant_cache::{CompiledVariantProgram, ShaderVariantCache, ShaderVariantSet};
