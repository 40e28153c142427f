use core::fmt;

/// Primitive shape stored in a geometry buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveKind {
    /// Four corners, drawn as two triangles.
    Quad,
    /// Two endpoints, drawn as a line list.
    Line,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quad => f.write_str("quad"),
            Self::Line => f.write_str("line"),
        }
    }
}

/// Compile-time description of a slot layout.
///
/// `PATTERN` is the per-slot index pattern relative to the slot's first vertex.
/// It is fixed for the lifetime of a buffer; only vertex contents change.
pub trait Primitive: 'static {
    const KIND: PrimitiveKind;
    const VERTICES: usize;
    const PATTERN: &'static [u32];
    /// Texture coordinates written when a slot is (re)allocated.
    const FULL_TEX_COORDS: &'static [[f32; 2]];
}

/// Quad slots. Corner order: bottom-left, top-left, top-right, bottom-right.
#[derive(Debug, Copy, Clone)]
pub enum Quads {}

/// Line slots. Vertex order: start, end.
#[derive(Debug, Copy, Clone)]
pub enum Lines {}

impl Primitive for Quads {
    const KIND: PrimitiveKind = PrimitiveKind::Quad;
    const VERTICES: usize = 4;
    const PATTERN: &'static [u32] = &[0, 1, 2, 0, 2, 3];
    const FULL_TEX_COORDS: &'static [[f32; 2]] = &[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]];
}

impl Primitive for Lines {
    const KIND: PrimitiveKind = PrimitiveKind::Line;
    const VERTICES: usize = 2;
    const PATTERN: &'static [u32] = &[0, 1];
    const FULL_TEX_COORDS: &'static [[f32; 2]] = &[[0.0, 0.0], [1.0, 1.0]];
}
