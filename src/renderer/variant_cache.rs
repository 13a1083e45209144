//! Compiled shader variants and the per-context cache that owns them.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use log::debug;

use crate::combiner::{
    AddressMode, CombinerFormula, FilterMode, SamplerDesc, SamplerRegistry, VariantKey,
    VertexLayout,
};
use crate::config::SynthConfig;
use crate::error::SynthResult;

use super::synth::{ProgramSynthesizer, VariantRequest};
use super::types::{BindingSignature, ProgramBundle, ProgramKind};
use super::validation::{CompiledProgram, ProgramCompiler};

/// One program with both of its compiled stages.
#[derive(Clone, Debug)]
pub struct CompiledVariantProgram {
    pub bundle: ProgramBundle,
    /// In `ProgramKind::entry_points` order.
    pub stages: [CompiledProgram; 2],
    pub signature: BindingSignature,
}

impl CompiledVariantProgram {
    pub fn stage(&self, entry_point: &str) -> Option<&CompiledProgram> {
        self.stages.iter().find(|s| s.entry_point == entry_point)
    }
}

/// The three compiled programs of a variant. Only ever built complete.
#[derive(Clone, Debug)]
pub struct ShaderVariantSet {
    pub key: VariantKey,
    pub formula: CombinerFormula,
    pub layout: VertexLayout,
    pub raster: CompiledVariantProgram,
    pub surface: CompiledVariantProgram,
    pub shadow: CompiledVariantProgram,
}

impl ShaderVariantSet {
    pub fn program(&self, kind: ProgramKind) -> &CompiledVariantProgram {
        match kind {
            ProgramKind::Raster => &self.raster,
            ProgramKind::SurfaceRay => &self.surface,
            ProgramKind::ShadowRay => &self.shadow,
        }
    }

    pub fn signature(&self, kind: ProgramKind) -> &BindingSignature {
        &self.program(kind).signature
    }

    /// Sampler the host binds as the combiner sampler.
    pub fn sampler(&self) -> Option<SamplerDesc> {
        SamplerDesc::from_slot(self.key.sampler_slot)
    }
}

/// Variants compiled for one device context, keyed by [`VariantKey`].
pub struct ShaderVariantCache<C: ProgramCompiler> {
    compiler: C,
    synthesizer: ProgramSynthesizer,
    samplers: SamplerRegistry,
    variants: HashMap<VariantKey, ShaderVariantSet>,
}

impl<C: ProgramCompiler> ShaderVariantCache<C> {
    pub fn new(compiler: C, config: SynthConfig) -> Self {
        Self {
            compiler,
            synthesizer: ProgramSynthesizer::new(config),
            samplers: SamplerRegistry::new(),
            variants: HashMap::new(),
        }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn synthesizer(&self) -> &ProgramSynthesizer {
        &self.synthesizer
    }

    pub fn register_sampler(
        &mut self,
        filter: FilterMode,
        address_u: AddressMode,
        address_v: AddressMode,
    ) -> u32 {
        self.samplers.register_sampler(filter, address_u, address_v)
    }

    pub fn samplers(&self) -> &SamplerRegistry {
        &self.samplers
    }

    /// Return the cached variant, synthesizing it on first request. A failed
    /// synthesis leaves the cache unchanged.
    pub fn get_or_create(&mut self, key: VariantKey) -> SynthResult<&ShaderVariantSet> {
        match self.variants.entry(key) {
            Entry::Occupied(entry) => {
                debug!("shader variant cache hit: {}", key.base_name());
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let request = VariantRequest::new(key);
                let set = self.synthesizer.synthesize(&self.compiler, &request)?;
                Ok(entry.insert(set))
            }
        }
    }

    pub fn get(&self, key: &VariantKey) -> Option<&ShaderVariantSet> {
        self.variants.get(key)
    }

    /// Release one variant.
    pub fn evict(&mut self, key: &VariantKey) -> Option<ShaderVariantSet> {
        self.variants.remove(key)
    }

    /// Context teardown: release every variant and sampler.
    pub fn clear(&mut self) {
        self.variants.clear();
        self.samplers = SamplerRegistry::new();
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
