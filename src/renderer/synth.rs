//! Program synthesis: decoded formula + vertex layout -> three WGSL programs,
//! compiled through a [`ProgramCompiler`] into a [`ShaderVariantSet`].

use log::{debug, error, info, warn};

use crate::combiner::{CombinerFormula, VariantKey, VertexLayout, decode, derive_vertex_layout};
use crate::config::SynthConfig;
use crate::error::{ProgramCompilationError, SynthError, SynthResult};

use super::expr::wgsl_combiner_functions;
use super::types::{ProgramBundle, ProgramKind};
use super::utils::sanitize_wgsl_ident;
use super::validation::{CompileRequest, ProgramCompiler};
use super::variant_cache::{CompiledVariantProgram, ShaderVariantSet};
use super::wgsl_templates::{
    SurfaceOptions, build_hit_merge, build_post_process, build_raster_stages,
    build_ray_combiner_fetch, build_ray_geometry, build_shadow_stages, build_shared_declarations,
    build_surface_stages,
};

impl VariantKey {
    /// Stable, identifier-safe name of one program of this variant.
    pub fn program_name(&self, kind: ProgramKind) -> String {
        sanitize_wgsl_ident(&format!("{}_{}", self.base_name(), kind.suffix()))
    }
}

/// Everything the synthesizer needs for one variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantRequest {
    pub key: VariantKey,
    pub formula: CombinerFormula,
    pub layout: VertexLayout,
}

impl VariantRequest {
    /// Decode the key's opcode and derive the matching layout.
    pub fn new(key: VariantKey) -> Self {
        let formula = decode(key.opcode);
        let layout = derive_vertex_layout(&formula, formula.flags.alpha_test);
        Self {
            key,
            formula,
            layout,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProgramSynthesizer {
    config: SynthConfig,
}

impl ProgramSynthesizer {
    pub fn new(config: SynthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Map flags need a texture coordinate. Without one they are dropped, or
    /// rejected when `strict_flag_combinations` is set.
    pub fn check_flag_combination(&self, request: &VariantRequest) -> SynthResult<()> {
        if request.layout.has_tex_coord() {
            return Ok(());
        }
        let key = request.key;
        let dropped: Vec<&str> = [
            (key.normal_map_enabled, "normal map"),
            (key.specular_map_enabled, "specular map"),
        ]
        .into_iter()
        .filter_map(|(enabled, name)| enabled.then_some(name))
        .collect();
        if dropped.is_empty() {
            return Ok(());
        }

        let reason = format!(
            "{} requested but the formula samples no texture",
            dropped.join(" and ")
        );
        if self.config.strict_flag_combinations {
            return Err(SynthError::UnsupportedCombinerFlagCombination { key, reason });
        }
        warn!("variant {}: {reason}; skipping", key.base_name());
        Ok(())
    }

    /// Emit the WGSL for one program of the variant.
    pub fn emit_program(&self, request: &VariantRequest, kind: ProgramKind) -> ProgramBundle {
        let name = request.key.program_name(kind);
        let formula = &request.formula;
        let layout = &request.layout;

        let mut module = format!("// {name}\n");
        module.push_str(&build_shared_declarations(self.config.max_textures));
        module.push_str(&wgsl_combiner_functions(formula));
        module.push_str(&build_post_process(formula.flags));

        match kind {
            ProgramKind::Raster => {
                module.push_str(&build_raster_stages(formula, layout));
            }
            ProgramKind::SurfaceRay => {
                let options = SurfaceOptions {
                    hit_slots: self.config.hit_slots,
                    instance_distance_bias: self.config.instance_distance_bias,
                    normal_map: request.key.normal_map_enabled,
                    specular_map: request.key.specular_map_enabled,
                };
                module.push_str(&build_ray_geometry(layout));
                module.push_str(&build_ray_combiner_fetch(formula, layout));
                module.push_str(&build_hit_merge(
                    options.hit_slots,
                    options.instance_distance_bias,
                ));
                module.push_str(&build_surface_stages(layout, options));
            }
            ProgramKind::ShadowRay => {
                module.push_str(&build_ray_geometry(layout));
                module.push_str(&build_ray_combiner_fetch(formula, layout));
                module.push_str(&build_shadow_stages(layout));
            }
        }

        debug!("emitted {name}: {} bytes of WGSL", module.len());
        if self.config.log_emitted_source {
            debug!("{name}:\n{module}");
        }
        ProgramBundle { kind, name, module }
    }

    /// Emit all three programs, raster first.
    pub fn emit(&self, request: &VariantRequest) -> SynthResult<[ProgramBundle; 3]> {
        self.check_flag_combination(request)?;
        Ok(ProgramKind::ALL.map(|kind| self.emit_program(request, kind)))
    }

    /// Emit and compile every program. Nothing is returned unless all six
    /// stages and all three signatures succeed.
    pub fn synthesize<C: ProgramCompiler>(
        &self,
        compiler: &C,
        request: &VariantRequest,
    ) -> SynthResult<ShaderVariantSet> {
        let [raster, surface, shadow] = self.emit(request)?;
        let raster = compile_bundle(compiler, raster)?;
        let surface = compile_bundle(compiler, surface)?;
        let shadow = compile_bundle(compiler, shadow)?;

        info!("compiled shader variant {}", request.key.base_name());
        Ok(ShaderVariantSet {
            key: request.key,
            formula: request.formula.clone(),
            layout: request.layout.clone(),
            raster,
            surface,
            shadow,
        })
    }
}

fn compile_bundle<C: ProgramCompiler>(
    compiler: &C,
    bundle: ProgramBundle,
) -> Result<CompiledVariantProgram, ProgramCompilationError> {
    let failure = |entry_point: &str, diagnostic: String| {
        error!("{} ({entry_point}) failed to compile", bundle.name);
        ProgramCompilationError {
            program_name: bundle.name.clone(),
            entry_point: entry_point.to_string(),
            emitted_source: bundle.module.clone(),
            diagnostic,
        }
    };

    let [first, second] = bundle.entry_points();
    let compile = |entry_point: &str| {
        compiler
            .compile(&CompileRequest {
                name: &bundle.name,
                source: &bundle.module,
                entry_point,
            })
            .map_err(|diagnostic| failure(entry_point, diagnostic))
    };
    let stages = [compile(first)?, compile(second)?];
    let signature = compiler
        .binding_signature(&stages[0])
        .map_err(|diagnostic| failure(first, diagnostic))?;

    Ok(CompiledVariantProgram {
        bundle,
        stages,
        signature,
    })
}
