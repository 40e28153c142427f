use crate::coords::Vec2;
use crate::geometry::{CapacityError, Quad, QuadBuffer};

/// Single-slot quad buffer covering a light's area of effect.
#[derive(Debug)]
pub struct LightQuad {
    buffer: QuadBuffer,
    quad: Quad,
}

impl LightQuad {
    pub fn new() -> Result<Self, CapacityError> {
        let mut buffer = QuadBuffer::new(1);
        let quad = buffer.allocate()?;
        Ok(Self { buffer, quad })
    }

    /// Axis-aligned box `centre ± half_extent`.
    pub fn cover(&mut self, centre: Vec2, half_extent: Vec2) {
        self.buffer
            .slot_mut(self.quad)
            .set_vertices(centre - half_extent, centre + half_extent, 0.0);
    }

    pub fn cover_box(&mut self, bottom_left: Vec2, top_right: Vec2) {
        self.buffer.slot_mut(self.quad).set_vertices(bottom_left, top_right, 0.0);
    }

    #[inline]
    pub fn buffer(&self) -> &QuadBuffer {
        &self.buffer
    }

    /// Corners in buffer order (bottom-left first).
    pub fn corners(&self) -> &[[f32; 3]] {
        self.buffer.vertices(self.quad)
    }
}
