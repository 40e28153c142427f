use core::ops::Range;

use crate::coords::Vec2;

use super::{CapacityError, Quad, QuadBuffer, Quads, Slot, SlotMut, Primitive};

/// Handle to one light's occluder block inside a [`ShadowQuadBuffer`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ShadowLight {
    shadow_index: u32,
}

impl ShadowLight {
    /// Block number; doubles as the light's cell in the shadow atlas.
    #[inline]
    pub const fn shadow_index(self) -> u32 {
        self.shadow_index
    }
}

/// Which part of the shared index table a shadow draw covers.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShadowRange {
    /// Only the light's own block.
    Own,
    /// The light's block and every block allocated after it.
    Remaining,
}

/// Quad buffer partitioned into equal occluder blocks, one per shadow-casting light.
///
/// Blocks are never returned; light registration happens once at scene setup.
#[derive(Debug)]
pub struct ShadowQuadBuffer {
    quads: QuadBuffer,
    quads_per_light: u32,
    max_lights: u32,
    lights: u32,
}

impl ShadowQuadBuffer {
    pub fn new(max_lights: u32, quads_per_light: u32) -> Self {
        let quads_per_light = quads_per_light.max(1);
        Self {
            quads: QuadBuffer::new(max_lights * quads_per_light),
            quads_per_light,
            max_lights,
            lights: 0,
        }
    }

    /// Sub-allocates the next occluder block.
    pub fn new_light(&mut self) -> Result<ShadowLight, CapacityError> {
        if self.lights >= self.max_lights {
            log::error!("shadow buffer exhausted at {} lights", self.max_lights);
            return Err(CapacityError::Lights { max_lights: self.max_lights });
        }
        for _ in 0..self.quads_per_light {
            self.quads.allocate()?;
        }
        let light = ShadowLight { shadow_index: self.lights };
        self.lights += 1;
        Ok(light)
    }

    /// The `n`-th occluder quad of a light's block.
    pub fn occluder(&mut self, light: ShadowLight, n: u32) -> SlotMut<'_, Quads> {
        debug_assert!(n < self.quads_per_light);
        let slot: Quad = Slot::new(self.quads.id(), self.first_quad(light) + n);
        self.quads.slot_mut(slot)
    }

    /// Sets the light's first occluder quad to the region centred on `centre`
    /// and disables the rest of its block.
    pub fn set_region(&mut self, light: ShadowLight, centre: Vec2, half_extent: Vec2) {
        self.occluder(light, 0)
            .set_vertices(centre - half_extent, centre + half_extent, 0.0)
            .enable();
        for n in 1..self.quads_per_light {
            self.occluder(light, n).disable();
        }
    }

    /// Disables every occluder of a light's block.
    pub fn clear_region(&mut self, light: ShadowLight) {
        for n in 0..self.quads_per_light {
            self.occluder(light, n).disable();
        }
    }

    /// Index range of a shadow draw for `light`.
    pub fn index_range(&self, light: ShadowLight, range: ShadowRange) -> Range<u32> {
        let per_quad = Quads::PATTERN.len() as u32;
        let start = self.first_quad(light) * per_quad;
        let end = match range {
            ShadowRange::Own => start + self.quads_per_light * per_quad,
            ShadowRange::Remaining => self.quads.index_count(),
        };
        start..end.max(start)
    }

    /// Underlying quad storage, read by the shadow pass.
    #[inline]
    pub fn quads(&self) -> &QuadBuffer {
        &self.quads
    }

    #[inline]
    pub fn lights(&self) -> u32 {
        self.lights
    }

    #[inline]
    pub fn max_lights(&self) -> u32 {
        self.max_lights
    }

    #[inline]
    pub fn quads_per_light(&self) -> u32 {
        self.quads_per_light
    }

    #[inline]
    fn first_quad(&self, light: ShadowLight) -> u32 {
        light.shadow_index * self.quads_per_light
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_light_hands_out_consecutive_indices() {
        let mut sb = ShadowQuadBuffer::new(4, 2);
        assert_eq!(sb.new_light().unwrap().shadow_index(), 0);
        assert_eq!(sb.new_light().unwrap().shadow_index(), 1);
        assert_eq!(sb.quads().high_water(), 4);
    }

    #[test]
    fn new_light_fails_past_max_lights() {
        let mut sb = ShadowQuadBuffer::new(1, 1);
        sb.new_light().unwrap();
        assert_eq!(sb.new_light().unwrap_err(), CapacityError::Lights { max_lights: 1 });
    }

    #[test]
    fn own_range_covers_only_that_block() {
        let mut sb = ShadowQuadBuffer::new(4, 2);
        let _a = sb.new_light().unwrap();
        let b = sb.new_light().unwrap();
        let _c = sb.new_light().unwrap();
        assert_eq!(sb.index_range(b, ShadowRange::Own), 12..24);
    }

    #[test]
    fn remaining_range_runs_to_high_water() {
        let mut sb = ShadowQuadBuffer::new(8, 1);
        let mouse = sb.new_light().unwrap();
        sb.new_light().unwrap();
        sb.new_light().unwrap();
        assert_eq!(sb.index_range(mouse, ShadowRange::Remaining), 0..18);
    }

    #[test]
    fn set_region_writes_first_occluder() {
        let mut sb = ShadowQuadBuffer::new(2, 2);
        let light = sb.new_light().unwrap();
        sb.set_region(light, Vec2::new(100.0, 100.0), Vec2::new(10.0, 20.0));
        let first = Slot::new(sb.quads().id(), 0);
        let second = Slot::new(sb.quads().id(), 1);
        assert_eq!(sb.quads().vertices(first)[0], [90.0, 80.0, 0.0]);
        assert_eq!(sb.quads().vertices(first)[2], [110.0, 120.0, 0.0]);
        assert!(!sb.quads().is_enabled(second));
    }

    #[test]
    fn clear_region_disables_block() {
        let mut sb = ShadowQuadBuffer::new(2, 1);
        let light = sb.new_light().unwrap();
        sb.set_region(light, Vec2::new(5.0, 5.0), Vec2::new(1.0, 1.0));
        sb.clear_region(light);
        assert!(!sb.quads().is_enabled(Slot::new(sb.quads().id(), 0)));
    }
}
