//! Data-driven color-combiner shading for a hybrid raster / ray-traced pipeline.
//!
//! A combiner opcode is decoded into a formula, a vertex layout is derived from
//! it, and three WGSL programs are synthesized per variant: raster, surface-ray
//! (with the bounded K-slot hit merge) and shadow-ray.

pub mod combiner;
pub mod config;
pub mod error;
pub mod hit_merge;
pub mod logging;
pub mod renderer;

pub use combiner::{CombinerFormula, CombinerOpcode, VariantKey, VertexLayout, decode, variant_key};
pub use config::SynthConfig;
pub use error::{ProgramCompilationError, SynthError, SynthResult};
pub use renderer::{NagaCompiler, ProgramCompiler, ShaderVariantCache, ShaderVariantSet};
