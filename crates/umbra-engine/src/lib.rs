//! Umbra engine crate.
//!
//! A 2D deferred lighting renderer: sprites are written into a G-buffer,
//! shadow-casting lights compute visibility into a shadow atlas, lights are
//! accumulated additively onto the surface, and UI is composited last.
//!
//! Layers, bottom-up:
//! - [`coords`], [`geometry`]: CPU-side vertex arenas
//! - [`shading`], [`camera`], [`lights`]: program state and light descriptions
//! - [`frame`]: the per-frame sequence, recorded GPU-free
//! - [`render`], [`device`], [`window`], [`core`]: wgpu and winit plumbing

pub mod camera;
pub mod config;
pub mod coords;
pub mod core;
pub mod device;
pub mod frame;
pub mod geometry;
pub mod lights;
pub mod logging;
pub mod render;
pub mod shading;
pub mod time;
pub mod window;
