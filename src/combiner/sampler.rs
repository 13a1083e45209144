//! Sampler slots and variant identity.
//!
//! A sampler slot is a base-N encoding of (filter, horizontal address,
//! vertical address) offset by one, so slot 0 stays reserved for the internal
//! sampler used by normal and specular maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::opcode::CombinerOpcode;

/// Slot of the fixed internal sampler.
pub const INTERNAL_SAMPLER_SLOT: u32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    Point,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressMode {
    Wrap,
    Mirror,
    Clamp,
}

impl FilterMode {
    pub const ALL: [FilterMode; 2] = [FilterMode::Point, FilterMode::Linear];

    fn index(self) -> u32 {
        self as u32
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point" | "nearest" => Some(FilterMode::Point),
            "linear" | "bilinear" => Some(FilterMode::Linear),
            _ => None,
        }
    }
}

impl AddressMode {
    pub const ALL: [AddressMode; 3] = [AddressMode::Wrap, AddressMode::Mirror, AddressMode::Clamp];

    fn index(self) -> u32 {
        self as u32
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wrap" | "repeat" => Some(AddressMode::Wrap),
            "mirror" | "mirror-repeat" => Some(AddressMode::Mirror),
            "clamp" | "clamp-to-edge" => Some(AddressMode::Clamp),
            _ => None,
        }
    }
}

const ADDRESS_MODES: u32 = AddressMode::ALL.len() as u32;
const FILTER_MODES: u32 = FilterMode::ALL.len() as u32;

/// Highest slot a user sampler can occupy.
pub const MAX_SAMPLER_SLOT: u32 = FILTER_MODES * ADDRESS_MODES * ADDRESS_MODES;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SamplerDesc {
    pub filter: FilterMode,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
}

impl SamplerDesc {
    pub fn new(filter: FilterMode, address_u: AddressMode, address_v: AddressMode) -> Self {
        Self {
            filter,
            address_u,
            address_v,
        }
    }

    pub fn slot(self) -> u32 {
        1 + (self.filter.index() * ADDRESS_MODES + self.address_u.index()) * ADDRESS_MODES
            + self.address_v.index()
    }

    /// Inverse of [`SamplerDesc::slot`]. Slot 0 and out-of-range slots have no descriptor.
    pub fn from_slot(slot: u32) -> Option<Self> {
        if slot == INTERNAL_SAMPLER_SLOT || slot > MAX_SAMPLER_SLOT {
            return None;
        }
        let n = slot - 1;
        let v = n % ADDRESS_MODES;
        let u = (n / ADDRESS_MODES) % ADDRESS_MODES;
        let f = n / (ADDRESS_MODES * ADDRESS_MODES);
        Some(Self {
            filter: FilterMode::ALL[f as usize],
            address_u: AddressMode::ALL[u as usize],
            address_v: AddressMode::ALL[v as usize],
        })
    }
}

/// Registered samplers, one per distinct descriptor.
#[derive(Clone, Debug, Default)]
pub struct SamplerRegistry {
    by_slot: BTreeMap<u32, SamplerDesc>,
}

impl SamplerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sampler and return its slot. Idempotent.
    pub fn register_sampler(
        &mut self,
        filter: FilterMode,
        address_u: AddressMode,
        address_v: AddressMode,
    ) -> u32 {
        let desc = SamplerDesc::new(filter, address_u, address_v);
        let slot = desc.slot();
        self.by_slot.entry(slot).or_insert(desc);
        slot
    }

    pub fn get(&self, slot: u32) -> Option<&SamplerDesc> {
        self.by_slot.get(&slot)
    }

    /// Registered samplers in slot order.
    pub fn samplers(&self) -> impl Iterator<Item = (u32, &SamplerDesc)> {
        self.by_slot.iter().map(|(slot, desc)| (*slot, desc))
    }

    pub fn len(&self) -> usize {
        self.by_slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slot.is_empty()
    }
}

/// Stable identity of a compiled shader variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VariantKey {
    pub opcode: CombinerOpcode,
    pub sampler_slot: u32,
    pub normal_map_enabled: bool,
    pub specular_map_enabled: bool,
}

pub fn variant_key(
    opcode: CombinerOpcode,
    sampler_slot: u32,
    normal_map_enabled: bool,
    specular_map_enabled: bool,
) -> VariantKey {
    VariantKey {
        opcode,
        sampler_slot,
        normal_map_enabled,
        specular_map_enabled,
    }
}

impl VariantKey {
    /// Identifier-safe base name shared by every program of this variant.
    pub fn base_name(&self) -> String {
        format!(
            "combiner_{}_s{}_n{}_p{}",
            self.opcode,
            self.sampler_slot,
            u8::from(self.normal_map_enabled),
            u8::from(self.specular_map_enabled)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_descs() -> Vec<SamplerDesc> {
        let mut out = Vec::new();
        for f in FilterMode::ALL {
            for u in AddressMode::ALL {
                for v in AddressMode::ALL {
                    out.push(SamplerDesc::new(f, u, v));
                }
            }
        }
        out
    }

    #[test]
    fn slots_are_injective_and_skip_zero() {
        let mut registry = SamplerRegistry::new();
        let mut seen = HashSet::new();
        for d in all_descs() {
            let slot = registry.register_sampler(d.filter, d.address_u, d.address_v);
            assert_ne!(slot, INTERNAL_SAMPLER_SLOT);
            assert!(slot <= MAX_SAMPLER_SLOT);
            assert!(seen.insert(slot), "duplicate slot {slot} for {d:?}");
        }
        assert_eq!(registry.len(), all_descs().len());
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = SamplerRegistry::new();
        let a =
            registry.register_sampler(FilterMode::Linear, AddressMode::Mirror, AddressMode::Clamp);
        let b =
            registry.register_sampler(FilterMode::Linear, AddressMode::Mirror, AddressMode::Clamp);
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn from_slot_inverts_slot() {
        for d in all_descs() {
            assert_eq!(SamplerDesc::from_slot(d.slot()), Some(d));
        }
        assert_eq!(SamplerDesc::from_slot(0), None);
        assert_eq!(SamplerDesc::from_slot(MAX_SAMPLER_SLOT + 1), None);
    }

    #[test]
    fn variant_names_differ_by_flags() {
        let op = CombinerOpcode(0x1234);
        let a = variant_key(op, 3, false, false);
        let b = variant_key(op, 3, true, false);
        assert_ne!(a, b);
        assert_ne!(a.base_name(), b.base_name());
        assert_eq!(a.base_name(), "combiner_00001234_s3_n0_p0");
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!(FilterMode::parse("Nearest"), Some(FilterMode::Point));
        assert_eq!(AddressMode::parse("clamp-to-edge"), Some(AddressMode::Clamp));
        assert_eq!(AddressMode::parse("bogus"), None);
    }
}
