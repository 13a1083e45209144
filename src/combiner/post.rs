//! Post-combiner alpha and color resolution.
//!
//! The emitted programs apply the same chain on the GPU; this module is the
//! host-side reference used by tests and by tools that preview a material.

use super::opcode::CombinerFlags;
use crate::renderer::types::InstanceMaterial;

/// Texture-edge cutoff. Alpha strictly above snaps to opaque, at or below rejects.
pub const TEXTURE_EDGE_THRESHOLD: f32 = 0.3;

/// PCG output permutation, the same integer steps the WGSL `pcg_hash` uses.
pub fn pcg_hash(v: u32) -> u32 {
    let state = v.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Stateless noise in `[0, 1)` seeded by pixel coordinates and frame counter.
pub fn dither_noise(pixel: [u32; 2], frame: u32) -> f32 {
    let h = pcg_hash(pixel[0].wrapping_add(pcg_hash(pixel[1].wrapping_add(pcg_hash(frame)))));
    // Top 24 bits keep the division exact in f32.
    (h >> 8) as f32 / 16_777_216.0
}

/// 0/1 stochastic-transparency draw.
pub fn dither_draw(pixel: [u32; 2], frame: u32) -> f32 {
    if dither_noise(pixel, frame) >= 0.5 { 1.0 } else { 0.0 }
}

fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    std::array::from_fn(|i| a[i] * (1.0 - t) + b[i] * t)
}

/// Darkening half of the diffuse mix: blends toward the mix color by the
/// negative part of the signed weight.
pub fn apply_darken_mix(rgb: [f32; 3], mix: [f32; 4]) -> [f32; 3] {
    lerp3(rgb, [mix[0], mix[1], mix[2]], (-mix[3]).max(0.0))
}

/// Post-shading half of the diffuse mix, driven by the positive part.
pub fn apply_brighten_mix(rgb: [f32; 3], mix: [f32; 4]) -> [f32; 3] {
    lerp3(rgb, [mix[0], mix[1], mix[2]], mix[3].max(0.0))
}

/// Pixel and frame that seed the dither draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleSite {
    pub pixel: [u32; 2],
    pub frame: u32,
}

/// Steps (2)..(4): multiplier, texture edge, dither. `None` rejects the candidate.
pub fn resolve_alpha(
    alpha: f32,
    multiplier: f32,
    flags: CombinerFlags,
    site: SampleSite,
) -> Option<f32> {
    let mut alpha = (alpha * multiplier).clamp(0.0, 1.0);
    if flags.texture_edge {
        if alpha > TEXTURE_EDGE_THRESHOLD {
            alpha = 1.0;
        } else {
            return None;
        }
    }
    if flags.noise_dither {
        let draw = dither_draw(site.pixel, site.frame);
        if draw == 0.0 {
            return None;
        }
        alpha *= draw;
    }
    Some(alpha)
}

/// Full chain for surface and raster samples. The brighten half of the mix is
/// left to the stage that runs after shading.
pub fn resolve_surface_color(
    color: [f32; 4],
    material: &InstanceMaterial,
    flags: CombinerFlags,
    site: SampleSite,
) -> Option<[f32; 4]> {
    let rgb = apply_darken_mix([color[0], color[1], color[2]], material.diffuse_color_mix);
    let alpha = resolve_alpha(color[3], material.solid_alpha_multiplier, flags, site)?;
    Some([rgb[0], rgb[1], rgb[2], alpha])
}

/// Shadow chain on a lone alpha scalar.
pub fn resolve_shadow_alpha(
    alpha: f32,
    material: &InstanceMaterial,
    flags: CombinerFlags,
    site: SampleSite,
) -> Option<f32> {
    resolve_alpha(alpha, material.shadow_alpha_multiplier, flags, site)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_only() -> CombinerFlags {
        CombinerFlags {
            texture_edge: true,
            ..Default::default()
        }
    }

    #[test]
    fn texture_edge_boundary_is_exclusive() {
        let site = SampleSite::default();
        assert_eq!(resolve_alpha(0.31, 1.0, edge_only(), site), Some(1.0));
        assert_eq!(resolve_alpha(0.30, 1.0, edge_only(), site), None);
        assert_eq!(resolve_alpha(0.0, 1.0, edge_only(), site), None);
    }

    #[test]
    fn multiplier_is_clamped_before_edge_test() {
        let site = SampleSite::default();
        assert_eq!(resolve_alpha(0.8, 2.0, CombinerFlags::default(), site), Some(1.0));
        assert_eq!(resolve_alpha(0.5, -1.0, CombinerFlags::default(), site), Some(0.0));
        // 0.2 * 2 = 0.4 passes the edge test.
        assert_eq!(resolve_alpha(0.2, 2.0, edge_only(), site), Some(1.0));
    }

    #[test]
    fn dither_is_reproducible_and_decorrelates() {
        let a = dither_noise([10, 20], 7);
        assert_eq!(a, dither_noise([10, 20], 7));
        assert!((0.0..1.0).contains(&a));

        let per_frame: Vec<f32> = (0..64).map(|f| dither_draw([3, 4], f)).collect();
        assert!(per_frame.contains(&0.0));
        assert!(per_frame.contains(&1.0));
    }

    #[test]
    fn dither_rejects_on_zero_draw() {
        let flags = CombinerFlags {
            noise_dither: true,
            ..Default::default()
        };
        for frame in 0..32 {
            let site = SampleSite { pixel: [5, 9], frame };
            let resolved = resolve_alpha(0.75, 1.0, flags, site);
            if dither_draw(site.pixel, frame) == 0.0 {
                assert_eq!(resolved, None);
            } else {
                assert_eq!(resolved, Some(0.75));
            }
        }
    }

    #[test]
    fn darken_uses_negative_weight_only() {
        let mix = [1.0, 0.0, 0.0, -0.5];
        assert_eq!(apply_darken_mix([0.0, 1.0, 0.0], mix), [0.5, 0.5, 0.0]);
        assert_eq!(apply_brighten_mix([0.0, 1.0, 0.0], mix), [0.0, 1.0, 0.0]);

        let mix = [1.0, 1.0, 1.0, 0.25];
        assert_eq!(apply_darken_mix([0.0, 0.0, 0.0], mix), [0.0, 0.0, 0.0]);
        assert_eq!(apply_brighten_mix([0.0, 0.0, 0.0], mix), [0.25, 0.25, 0.25]);
    }

    #[test]
    fn shadow_uses_shadow_multiplier() {
        let material = InstanceMaterial {
            solid_alpha_multiplier: 1.0,
            shadow_alpha_multiplier: 0.5,
            ..InstanceMaterial::default()
        };
        let site = SampleSite::default();
        assert_eq!(
            resolve_shadow_alpha(0.8, &material, CombinerFlags::default(), site),
            Some(0.4)
        );
        let color =
            resolve_surface_color([0.2, 0.2, 0.2, 0.8], &material, CombinerFlags::default(), site);
        assert_eq!(color, Some([0.2, 0.2, 0.2, 0.8]));
    }
}
