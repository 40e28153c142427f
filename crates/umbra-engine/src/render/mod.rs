//! GPU rendering subsystem.
//!
//! [`DeferredRenderer`] encodes a frame recorded by
//! [`crate::frame::RenderContext`] with wgpu: geometry into the G-buffer,
//! per-light visibility into the shadow atlas, additive lighting onto the
//! surface, then the UI composite.
//!
//! Convention:
//! - CPU geometry is in pixels (bottom-left origin, +Y up).
//! - Vertex shaders convert to NDC using `screen_dimensions`.

mod ctx;
mod deferred;
mod error;
mod pipelines;
mod targets;
mod textures;

pub use ctx::{RenderCtx, RenderTarget};
pub use deferred::DeferredRenderer;
pub use error::TextureError;
pub use textures::TextureSet;
