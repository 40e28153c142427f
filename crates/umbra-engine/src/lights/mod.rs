//! Light descriptors.
//!
//! Lights are owned by game code and read by the frame pipeline through
//! [`LightSource`]. Each light carries its own single-quad buffer sized to its
//! area of effect; shadow-casting lights also own a block of the shared
//! [`ShadowQuadBuffer`](crate::geometry::ShadowQuadBuffer) and a cell of the
//! shadow atlas, both addressed by the light's shadow index.

mod daylight;
mod mouse;
mod point;
mod quad;
mod set;

pub use daylight::{Daylight, TimeOfDay};
pub use mouse::{MouseLight, MouseLightConfig};
pub use point::{AmbientBox, Cone, PointLight};
pub use quad::LightQuad;
pub use set::LightSet;

use crate::coords::{ColorRgba, Vec3};
use crate::geometry::{QuadBuffer, ShadowLight};

/// Uniform values for one light draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightParams {
    pub light_type: u32,
    /// World x, y and height above the scene.
    pub position: Vec3,
    pub colour: ColorRgba,
    pub radius: f32,
    pub intensity: f32,
    pub cone: Cone,
    pub shadow: Option<ShadowLight>,
}

/// Read-only view the frame pipeline takes of a light.
pub trait LightSource {
    /// Lights that are off are skipped entirely.
    fn is_on(&self) -> bool;
    fn params(&self) -> LightParams;
    /// World-space quad covering the light's area of effect.
    fn quad(&self) -> &QuadBuffer;
}
