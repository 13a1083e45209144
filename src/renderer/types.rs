//! Core type definitions for the renderer module.

use bytemuck::{Pod, Zeroable};
use serde::Serialize;

/// WGSL value type for emitted expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ValueType {
    F32,
    Vec4,
}

/// A rendered WGSL expression with its type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedExpr {
    pub ty: ValueType,
    pub expr: String,
}

impl TypedExpr {
    pub fn new(expr: impl Into<String>, ty: ValueType) -> Self {
        Self {
            ty,
            expr: expr.into(),
        }
    }
}

/// The three programs every variant is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ProgramKind {
    /// Vertex + fragment.
    Raster,
    /// Primary-ray any-hit + closest-hit.
    SurfaceRay,
    /// Shadow-ray any-hit + closest-hit.
    ShadowRay,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 3] = [
        ProgramKind::Raster,
        ProgramKind::SurfaceRay,
        ProgramKind::ShadowRay,
    ];

    pub fn entry_points(self) -> [&'static str; 2] {
        match self {
            ProgramKind::Raster => ["vs_main", "fs_main"],
            ProgramKind::SurfaceRay => ["surface_any_hit", "surface_closest_hit"],
            ProgramKind::ShadowRay => ["shadow_any_hit", "shadow_closest_hit"],
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            ProgramKind::Raster => "raster",
            ProgramKind::SurfaceRay => "surface",
            ProgramKind::ShadowRay => "shadow",
        }
    }
}

/// Emitted WGSL for one program, before compilation.
#[derive(Clone, Debug)]
pub struct ProgramBundle {
    pub kind: ProgramKind,
    /// Stable program name, see `VariantKey::base_name`.
    pub name: String,
    /// Complete WGSL module containing both entry points.
    pub module: String,
}

impl ProgramBundle {
    pub fn entry_points(&self) -> [&'static str; 2] {
        self.kind.entry_points()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BindingKind {
    Uniform,
    StorageRead,
    StorageReadWrite,
    Texture,
    TextureArray,
    Sampler,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BindingEntry {
    pub group: u32,
    pub binding: u32,
    pub name: String,
    pub kind: BindingKind,
}

/// Resources a compiled program expects, ordered by (group, binding).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BindingSignature {
    pub entries: Vec<BindingEntry>,
}

impl BindingSignature {
    pub fn get(&self, group: u32, binding: u32) -> Option<&BindingEntry> {
        self.entries
            .iter()
            .find(|e| e.group == group && e.binding == binding)
    }

    pub fn by_name(&self, name: &str) -> Option<&BindingEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

// Group 0 binding indices shared by every emitted program.
pub const FRAME_PARAMS_BINDING: u32 = 0;
pub const INSTANCE_MATERIALS_BINDING: u32 = 1;
pub const TEXTURES_BINDING: u32 = 2;
pub const COMBINER_SAMPLER_BINDING: u32 = 3;
pub const INTERNAL_SAMPLER_BINDING: u32 = 4;
// Ray programs only.
pub const VERTEX_DATA_BINDING: u32 = 5;
pub const INDEX_DATA_BINDING: u32 = 6;
// Surface-ray program only.
pub const HIT_DISTANCE_FLOW_BINDING: u32 = 7;
pub const HIT_COLOR_BINDING: u32 = 8;
pub const HIT_NORMAL_BINDING: u32 = 9;
pub const HIT_SPECULAR_BINDING: u32 = 10;
pub const HIT_INSTANCE_ID_BINDING: u32 = 11;

/// Sentinel for "no slot" in GPU payloads.
pub const NO_SLOT: u32 = u32::MAX;

/// Per-frame uniform. Must match `FrameParams` in the emitted WGSL.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FrameParams {
    pub view_proj: [[f32; 4]; 4],
    pub prev_view_proj: [[f32; 4]; 4],
    pub viewport_size: [f32; 2],
    pub frame_counter: u32,
    pub _pad0: u32,
}

/// Per-instance material supplied by the geometry side.
/// Texture indices below zero mean "not bound".
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceMaterial {
    /// rgb: mix color, a: signed weight (negative darkens, positive applies after shading).
    pub diffuse_color_mix: [f32; 4],
    pub diffuse_tex_index: i32,
    pub normal_tex_index: i32,
    pub specular_tex_index: i32,
    pub solid_alpha_multiplier: f32,
    pub shadow_alpha_multiplier: f32,
    pub uv_detail_scale: f32,
    pub _pad0: f32,
    pub _pad1: f32,
}

impl Default for InstanceMaterial {
    fn default() -> Self {
        Self {
            diffuse_color_mix: [0.0; 4],
            diffuse_tex_index: -1,
            normal_tex_index: -1,
            specular_tex_index: -1,
            solid_alpha_multiplier: 1.0,
            shadow_alpha_multiplier: 1.0,
            uv_detail_scale: 1.0,
            _pad0: 0.0,
            _pad1: 0.0,
        }
    }
}

/// Candidate intersection handed to the ray programs by the tracing host.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Intersection {
    pub barycentrics: [f32; 2],
    pub ray_t: f32,
    pub instance_id: u32,
    pub primitive_index: u32,
    /// First index of the instance in the index buffer.
    pub index_base: u32,
    /// First vertex of the instance in the vertex buffer.
    pub vertex_base: u32,
    pub _pad0: u32,
    pub pixel: [u32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_struct_sizes_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<FrameParams>(), 144);
        assert_eq!(std::mem::size_of::<InstanceMaterial>(), 48);
        assert_eq!(std::mem::size_of::<Intersection>(), 40);
    }

    #[test]
    fn default_material_binds_no_textures() {
        let m = InstanceMaterial::default();
        assert!(m.diffuse_tex_index < 0 && m.normal_tex_index < 0 && m.specular_tex_index < 0);
        assert_eq!(bytemuck::bytes_of(&m).len(), 48);
    }

    #[test]
    fn entry_points_per_kind() {
        assert_eq!(ProgramKind::Raster.entry_points(), ["vs_main", "fs_main"]);
        assert_eq!(ProgramKind::SurfaceRay.suffix(), "surface");
    }
}
