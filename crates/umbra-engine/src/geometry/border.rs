use crate::coords::{ColorRgba, Vec2};

use super::{CapacityError, Quad, QuadBuffer};

/// Rectangle outline made of four thin quads in one buffer.
#[derive(Debug, Copy, Clone)]
pub struct QuadBorder {
    sides: [Quad; 4],
    line_width: f32,
}

impl QuadBorder {
    /// Allocates the four sides. On failure nothing stays allocated.
    pub fn new(buffer: &mut QuadBuffer, line_width: f32) -> Result<Self, CapacityError> {
        let mut sides = Vec::with_capacity(4);
        for _ in 0..4 {
            match buffer.allocate() {
                Ok(q) => sides.push(q),
                Err(e) => {
                    for q in sides {
                        buffer.delete(q);
                    }
                    return Err(e);
                }
            }
        }
        Ok(Self {
            sides: [sides[0], sides[1], sides[2], sides[3]],
            line_width,
        })
    }

    #[inline]
    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    /// Takes effect on the next `set_vertices`.
    #[inline]
    pub fn set_line_width(&mut self, line_width: f32) {
        self.line_width = line_width;
    }

    /// Lays the sides out along the rectangle's inner edge.
    pub fn set_vertices(&self, buffer: &mut QuadBuffer, bottom_left: Vec2, top_right: Vec2, depth: f32) {
        let w = self.line_width;
        let [bottom, top, left, right] = self.sides;

        buffer
            .slot_mut(bottom)
            .set_vertices(bottom_left, Vec2::new(top_right.x, bottom_left.y + w), depth);
        buffer
            .slot_mut(top)
            .set_vertices(Vec2::new(bottom_left.x, top_right.y - w), top_right, depth);
        buffer
            .slot_mut(left)
            .set_vertices(bottom_left, Vec2::new(bottom_left.x + w, top_right.y), depth);
        buffer
            .slot_mut(right)
            .set_vertices(Vec2::new(top_right.x - w, bottom_left.y), top_right, depth);
    }

    pub fn set_colour(&self, buffer: &mut QuadBuffer, colour: ColorRgba) {
        for side in self.sides {
            buffer.slot_mut(side).set_colour(colour);
        }
    }

    pub fn enable(&self, buffer: &mut QuadBuffer) {
        for side in self.sides {
            buffer.slot_mut(side).enable();
        }
    }

    pub fn disable(&self, buffer: &mut QuadBuffer) {
        for side in self.sides {
            buffer.slot_mut(side).disable();
        }
    }

    pub fn delete(self, buffer: &mut QuadBuffer) {
        for side in self.sides {
            buffer.delete(side);
        }
    }

    #[inline]
    pub fn sides(&self) -> &[Quad; 4] {
        &self.sides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_hug_inner_edge() {
        let mut buf = QuadBuffer::new(4);
        let border = QuadBorder::new(&mut buf, 2.0).unwrap();
        border.set_vertices(&mut buf, Vec2::new(0.0, 0.0), Vec2::new(10.0, 20.0), 5.0);

        let [bottom, top, left, right] = *border.sides();
        assert_eq!(buf.vertices(bottom)[2], [10.0, 2.0, 5.0]);
        assert_eq!(buf.vertices(top)[0], [0.0, 18.0, 5.0]);
        assert_eq!(buf.vertices(left)[2], [2.0, 20.0, 5.0]);
        assert_eq!(buf.vertices(right)[0], [8.0, 0.0, 5.0]);
    }

    #[test]
    fn failed_allocation_releases_partial_sides() {
        let mut buf = QuadBuffer::new(3);
        assert!(QuadBorder::new(&mut buf, 1.0).is_err());
        assert_eq!(buf.live(), 0);
    }

    #[test]
    fn delete_returns_all_sides() {
        let mut buf = QuadBuffer::new(4);
        let border = QuadBorder::new(&mut buf, 1.0).unwrap();
        border.delete(&mut buf);
        assert_eq!(buf.live(), 0);
        assert!(QuadBorder::new(&mut buf, 1.0).is_ok());
    }
}
