//! Synthesizer configuration, loaded from JSON.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Slots per pixel in the hit buffers.
pub const DEFAULT_HIT_SLOTS: u32 = 13;
pub const DEFAULT_INSTANCE_DISTANCE_BIAS: f32 = 1e-5;
pub const DEFAULT_MAX_TEXTURES: u32 = 512;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// K: hits kept per pixel by the surface program.
    pub hit_slots: u32,
    /// Distance added per instance id to order coplanar surfaces.
    pub instance_distance_bias: f32,
    /// Length of the texture binding array.
    pub max_textures: u32,
    /// Fail instead of degrading when a map flag has no texture coordinate to use.
    pub strict_flag_combinations: bool,
    /// Log every emitted program at debug level.
    pub log_emitted_source: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            hit_slots: DEFAULT_HIT_SLOTS,
            instance_distance_bias: DEFAULT_INSTANCE_DISTANCE_BIAS,
            max_textures: DEFAULT_MAX_TEXTURES,
            strict_flag_combinations: false,
            log_emitted_source: false,
        }
    }
}

impl SynthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hit_slots == 0 {
            bail!("hit_slots must be >= 1");
        }
        if !self.instance_distance_bias.is_finite() || self.instance_distance_bias < 0.0 {
            bail!(
                "instance_distance_bias must be finite and >= 0, got {}",
                self.instance_distance_bias
            );
        }
        if self.max_textures == 0 {
            bail!("max_textures must be >= 1");
        }
        Ok(())
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: SynthConfig =
            serde_json::from_str(text).context("failed to parse synth config json")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read synth config at {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("invalid synth config at {}", path.display()))
    }
}
