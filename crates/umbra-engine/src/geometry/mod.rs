//! Geometry arena.
//!
//! Fixed-capacity pools of quad and line slots backed by flat position,
//! texture-coordinate and colour arrays plus a static index table.
//!
//! Responsibilities:
//! - hand out reusable slots without per-frame allocation (free list + high-water mark)
//! - let owners mutate a slot's vertices, texture coordinates and colours in place
//! - hide disabled slots by collapsing them to a degenerate point
//!
//! Buffers never grow. Capacity is chosen at construction; running out is a
//! [`CapacityError`].

mod border;
mod buffer;
mod error;
mod primitive;
mod shadow;

pub use border::QuadBorder;
pub use buffer::{
    BufferId, BufferOptions, GeometryBuffer, Line, LineBuffer, Quad, QuadBuffer, Slot, SlotMut,
    VertexStreams,
};
pub use error::CapacityError;
pub use primitive::{Lines, Primitive, PrimitiveKind, Quads};
pub use shadow::{ShadowLight, ShadowQuadBuffer, ShadowRange};
