//! Program compilation seam and the naga-backed implementation.
//!
//! The synthesizer only talks to [`ProgramCompiler`]. The default
//! [`NagaCompiler`] parses and validates WGSL on the CPU and reflects the
//! module's bound globals into a [`BindingSignature`].

use std::sync::Arc;

use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};

use super::types::{BindingEntry, BindingKind, BindingSignature};

/// One compilation request: a program's source and the entry point to build.
#[derive(Clone, Copy, Debug)]
pub struct CompileRequest<'a> {
    /// Program name, used only for diagnostics.
    pub name: &'a str,
    pub source: &'a str,
    pub entry_point: &'a str,
}

/// A compiled entry point. The parsed module is shared between the entry
/// points of one program.
#[derive(Clone, Debug)]
pub struct CompiledProgram {
    pub name: String,
    pub entry_point: String,
    pub module: Arc<naga::Module>,
    pub info: Arc<ModuleInfo>,
}

/// Compiler collaborator. Errors are the compiler's diagnostic text.
pub trait ProgramCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompiledProgram, String>;

    fn binding_signature(&self, program: &CompiledProgram) -> Result<BindingSignature, String>;
}

/// WGSL compiler built on naga's front end and validator.
#[derive(Clone, Copy, Debug, Default)]
pub struct NagaCompiler;

impl NagaCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl ProgramCompiler for NagaCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompiledProgram, String> {
        let (module, info) = validate_wgsl(request.source)?;
        if !has_entry_point(&module, request.entry_point) {
            return Err(format!(
                "entry point `{}` not found in {}",
                request.entry_point, request.name
            ));
        }
        Ok(CompiledProgram {
            name: request.name.to_string(),
            entry_point: request.entry_point.to_string(),
            module: Arc::new(module),
            info: Arc::new(info),
        })
    }

    fn binding_signature(&self, program: &CompiledProgram) -> Result<BindingSignature, String> {
        reflect_bindings(&program.module)
    }
}

/// Parse and validate WGSL source.
pub fn validate_wgsl(source: &str) -> Result<(naga::Module, ModuleInfo), String> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| format!("WGSL parse failed:\n  {}", e.emit_to_string(source)))?;
    let info = Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| format!("WGSL validation failed:\n  {e:?}"))?;
    Ok((module, info))
}

/// Ray-stage programs are plain functions; raster stages are pipeline entry points.
fn has_entry_point(module: &naga::Module, name: &str) -> bool {
    module.entry_points.iter().any(|ep| ep.name == name)
        || module
            .functions
            .iter()
            .any(|(_, f)| f.name.as_deref() == Some(name))
}

fn reflect_bindings(module: &naga::Module) -> Result<BindingSignature, String> {
    let mut entries = Vec::new();
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else {
            continue;
        };
        let name = var
            .name
            .clone()
            .ok_or_else(|| format!("unnamed global at binding {}", binding.binding))?;
        let kind = binding_kind(module, var)
            .ok_or_else(|| format!("unsupported binding type for `{name}`"))?;
        entries.push(BindingEntry {
            group: binding.group,
            binding: binding.binding,
            name,
            kind,
        });
    }
    entries.sort_by_key(|e| (e.group, e.binding));
    Ok(BindingSignature { entries })
}

fn binding_kind(module: &naga::Module, var: &naga::GlobalVariable) -> Option<BindingKind> {
    match var.space {
        naga::AddressSpace::Uniform => Some(BindingKind::Uniform),
        naga::AddressSpace::Storage { access } => {
            if access.contains(naga::StorageAccess::STORE) {
                Some(BindingKind::StorageReadWrite)
            } else {
                Some(BindingKind::StorageRead)
            }
        }
        naga::AddressSpace::Handle => match &module.types[var.ty].inner {
            naga::TypeInner::Image { .. } => Some(BindingKind::Texture),
            naga::TypeInner::Sampler { .. } => Some(BindingKind::Sampler),
            naga::TypeInner::BindingArray { base, .. } => match module.types[*base].inner {
                naga::TypeInner::Image { .. } => Some(BindingKind::TextureArray),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RASTER: &str = r#"
@group(0) @binding(0)
var<uniform> tint: vec4f;

@group(0) @binding(2)
var tex: texture_2d<f32>;

@group(0) @binding(1)
var samp: sampler;

@vertex
fn vs_main(@location(0) position: vec3f) -> @builtin(position) vec4f {
    return vec4f(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4f {
    return tint * textureSample(tex, samp, vec2f(0.5));
}
"#;

    #[test]
    fn test_valid_wgsl() {
        assert!(validate_wgsl(RASTER).is_ok());
    }

    #[test]
    fn test_invalid_wgsl_syntax() {
        let source = "fn invalid() -> { return vec4f(1.0); }";
        assert!(validate_wgsl(source).is_err());
    }

    #[test]
    fn test_invalid_wgsl_type_error() {
        let source = r#"
@fragment
fn fs_main() -> @location(0) vec4f {
    let x: vec4f = 1.0;
    return x;
}
"#;
        assert!(validate_wgsl(source).is_err());
    }

    #[test]
    fn compile_checks_entry_point() {
        let compiler = NagaCompiler::new();
        let ok = compiler.compile(&CompileRequest {
            name: "raster",
            source: RASTER,
            entry_point: "fs_main",
        });
        assert!(ok.is_ok());

        let missing = compiler.compile(&CompileRequest {
            name: "raster",
            source: RASTER,
            entry_point: "surface_any_hit",
        });
        let err = missing.unwrap_err();
        assert!(err.contains("surface_any_hit"), "{err}");
    }

    #[test]
    fn plain_functions_count_as_entry_points() {
        let source = "fn shadow_any_hit(alpha: f32) -> bool { return alpha > 0.5; }";
        let compiler = NagaCompiler::new();
        assert!(compiler
            .compile(&CompileRequest {
                name: "shadow",
                source,
                entry_point: "shadow_any_hit",
            })
            .is_ok());
    }

    #[test]
    fn signature_is_sorted_by_binding() {
        let compiler = NagaCompiler::new();
        let program = compiler
            .compile(&CompileRequest {
                name: "raster",
                source: RASTER,
                entry_point: "vs_main",
            })
            .unwrap();
        let sig = compiler.binding_signature(&program).unwrap();
        let kinds: Vec<(u32, BindingKind)> =
            sig.entries.iter().map(|e| (e.binding, e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (0, BindingKind::Uniform),
                (1, BindingKind::Sampler),
                (2, BindingKind::Texture),
            ]
        );
        assert_eq!(sig.by_name("samp").map(|e| e.binding), Some(1));
    }
}
