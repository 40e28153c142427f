//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and wires them to the GPU layer.
//! Input is delivered to the game as raw `winit` events; the runtime only
//! tracks the cursor for the per-frame pointer position.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
