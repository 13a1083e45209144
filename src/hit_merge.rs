//! Host-side bounded hit merge.
//!
//! Mirrors `consider_hit` in the surface-ray program: each pixel keeps its
//! nearest K accepted hits sorted by biased distance in parallel arrays laid
//! out `(pixel * K + slot)`, pixels row-major. Hits may arrive in any order.

use serde::Serialize;

/// Tie-break offset for coplanar surfaces, strictly increasing in `instance_id`.
pub fn instance_bias(instance_id: u32, step: f32) -> f32 {
    instance_id as f32 * step
}

/// A shaded candidate as produced by the surface any-hit stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct HitRecord {
    /// Ray parameter before the instance bias is applied.
    pub distance: f32,
    pub flow: [f32; 2],
    pub color: [f32; 4],
    pub normal: [f32; 3],
    pub specular: [f32; 3],
    pub instance_id: u32,
}

/// Per-ray surface state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfacePayload {
    /// Accepted hits, saturating at K.
    pub write_count: u32,
    /// Slots below this index belong to earlier work and are never moved.
    pub floor_index: u32,
    /// Slot holding the current farthest-occupied (terminal) hit. `None` once
    /// that hit has been pushed out of the buffer.
    pub terminal_slot: Option<u32>,
}

impl SurfacePayload {
    /// Start above `floor_index` slots finalized by earlier work.
    pub fn with_floor(floor_index: u32) -> Self {
        Self {
            write_count: floor_index,
            floor_index,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted { slot: u32, terminal: bool },
    /// Farther than every kept hit with the buffer full, or no slot above
    /// the floor.
    Discarded,
}

/// Parallel K-slot arrays for a `width * height` target. With zero slots
/// every candidate is discarded.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HitBuffer {
    width: u32,
    height: u32,
    slots: u32,
    /// x: biased distance, yz: flow. Same packing as the GPU `vec4f`.
    pub distance_flow: Vec<[f32; 4]>,
    pub color: Vec<[f32; 4]>,
    pub normal: Vec<[f32; 4]>,
    pub specular: Vec<[f32; 4]>,
    pub instance_id: Vec<u32>,
}

impl HitBuffer {
    pub fn new(width: u32, height: u32, slots: u32) -> Self {
        let len = width as usize * height as usize * slots as usize;
        Self {
            width,
            height,
            slots,
            distance_flow: vec![[0.0; 4]; len],
            color: vec![[0.0; 4]; len],
            normal: vec![[0.0; 4]; len],
            specular: vec![[0.0; 4]; len],
            instance_id: vec![0; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// K.
    pub fn slots(&self) -> u32 {
        self.slots
    }

    pub fn index(&self, pixel: [u32; 2], slot: u32) -> usize {
        (pixel[1] as usize * self.width as usize + pixel[0] as usize) * self.slots as usize
            + slot as usize
    }

    pub fn distance(&self, pixel: [u32; 2], slot: u32) -> f32 {
        self.distance_flow[self.index(pixel, slot)][0]
    }

    /// Record in a slot, with the biased distance.
    pub fn record(&self, pixel: [u32; 2], slot: u32) -> HitRecord {
        let i = self.index(pixel, slot);
        let df = self.distance_flow[i];
        let n = self.normal[i];
        let s = self.specular[i];
        HitRecord {
            distance: df[0],
            flow: [df[1], df[2]],
            color: self.color[i],
            normal: [n[0], n[1], n[2]],
            specular: [s[0], s[1], s[2]],
            instance_id: self.instance_id[i],
        }
    }

    /// Biased distances of the occupied prefix.
    pub fn occupied_distances(&self, pixel: [u32; 2], payload: &SurfacePayload) -> Vec<f32> {
        (0..payload.write_count.min(self.slots))
            .map(|slot| self.distance(pixel, slot))
            .collect()
    }

    fn copy_slot(&mut self, pixel: [u32; 2], from: u32, to: u32) {
        let src = self.index(pixel, from);
        let dst = self.index(pixel, to);
        self.distance_flow[dst] = self.distance_flow[src];
        self.color[dst] = self.color[src];
        self.normal[dst] = self.normal[src];
        self.specular[dst] = self.specular[src];
        self.instance_id[dst] = self.instance_id[src];
    }

    fn write_slot(&mut self, pixel: [u32; 2], slot: u32, record: &HitRecord, biased: f32) {
        let dst = self.index(pixel, slot);
        self.distance_flow[dst] = [biased, record.flow[0], record.flow[1], 0.0];
        self.color[dst] = record.color;
        self.normal[dst] = [record.normal[0], record.normal[1], record.normal[2], 0.0];
        self.specular[dst] = [record.specular[0], record.specular[1], record.specular[2], 0.0];
        self.instance_id[dst] = record.instance_id;
    }

    /// Merge one candidate into the pixel's ordered slots.
    ///
    /// The candidate is terminal when it lands at the last occupied slot. A
    /// record shifted toward the end keeps its terminal mark until it falls out.
    pub fn consider_hit(
        &mut self,
        pixel: [u32; 2],
        record: &HitRecord,
        bias_step: f32,
        payload: &mut SurfacePayload,
    ) -> MergeOutcome {
        let k = self.slots;
        let floor = payload.floor_index;
        if floor >= k {
            return MergeOutcome::Discarded;
        }
        let biased = record.distance + instance_bias(record.instance_id, bias_step);
        // Slots below the floor count as occupied even before this ray wrote any.
        let count = payload.write_count.max(floor);

        if count >= k && biased >= self.distance(pixel, k - 1) {
            return MergeOutcome::Discarded;
        }

        let mut probe = count.min(k - 1);
        while probe > floor && biased < self.distance(pixel, probe - 1) {
            self.copy_slot(pixel, probe - 1, probe);
            probe -= 1;
        }
        self.write_slot(pixel, probe, record, biased);

        let occupied = (count + 1).min(k);
        payload.write_count = occupied;
        let terminal = probe == occupied - 1;
        if terminal {
            payload.terminal_slot = Some(probe);
        } else if let Some(slot) = payload.terminal_slot {
            if slot >= probe {
                payload.terminal_slot = Some(slot + 1).filter(|s| *s < k);
            }
        }
        MergeOutcome::Inserted {
            slot: probe,
            terminal,
        }
    }
}

/// Per-ray shadow state: light left after the occluders seen so far.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowPayload {
    pub remaining_light: f32,
}

impl Default for ShadowPayload {
    fn default() -> Self {
        Self {
            remaining_light: 1.0,
        }
    }
}

impl ShadowPayload {
    /// Attenuate by one accepted occluder. Returns true once fully occluded,
    /// at which point traversal may stop.
    pub fn accumulate(&mut self, alpha: f32) -> bool {
        self.remaining_light = (self.remaining_light - alpha.clamp(0.0, 1.0)).max(0.0);
        self.is_occluded()
    }

    pub fn is_occluded(&self) -> bool {
        self.remaining_light <= 0.0
    }
}
