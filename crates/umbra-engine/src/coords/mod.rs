//! Coordinate and colour types shared by the geometry arena, lights and renderer.
//!
//! Canonical CPU space:
//! - pixels
//! - origin bottom-left
//! - +X right, +Y up
//! - z is a paint-order depth in `[0, z_max]`; higher values are drawn in front
//!
//! Shaders map to NDC with `(position + translation) * scale / screen`.

mod color;
mod vec2;
mod vec3;
mod viewport;

pub use color::ColorRgba;
pub use vec2::Vec2;
pub use vec3::Vec3;
pub use viewport::Viewport;
