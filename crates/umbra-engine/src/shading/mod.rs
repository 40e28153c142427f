//! Shading program registry.
//!
//! Programs are loaded by name from a [`ShaderLibrary`] and resolved into a
//! [`ProgramLayout`] of typed handles once. The registry then behaves like GL
//! program state: one program is bound at a time, each program keeps its own
//! uniform values, and binding a program re-pushes the camera to it.
//!
//! All programs share one uniform block ([`DrawUniforms`], declared in
//! `shaders/common.wgsl`) and one bind group convention:
//! - group 0: uniform block at a dynamic offset
//! - group 1: textures (sprite maps for geometry/UI, G-buffer and shadow atlas for shadow/light)

mod error;
mod layout;
mod library;
mod program;
mod registry;
mod uniforms;

pub use error::ShaderError;
pub use layout::ProgramLayout;
pub use library::{ProgramSource, ShaderLibrary, PRELUDE};
pub use program::{Attribute, ProgramDesc, ProgramKind, Uniform};
pub use registry::ProgramRegistry;
pub use uniforms::{light_type, DrawUniforms, UniformWriter};
