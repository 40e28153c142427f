//! Frame pipeline.
//!
//! [`RenderContext`] sequences a frame as geometry → shadow → light → UI and
//! records it into [`FrameCommands`]. Nothing here touches the GPU; the
//! recorded frame is encoded by [`crate::render::DeferredRenderer`].

mod commands;
mod context;
mod error;
mod ui_queue;

pub use commands::{DrawCmd, FrameCommands, Pass, PassKind, TextureSetId};
pub use context::{Lighting, RenderContext};
pub use error::{FrameError, FramePhase, RenderContextError};
pub use ui_queue::{UiEntry, UiQueue};
