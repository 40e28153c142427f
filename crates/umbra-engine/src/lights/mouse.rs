use crate::coords::{ColorRgba, Vec2};
use crate::geometry::{CapacityError, ShadowLight};

use super::{Cone, LightQuad};

/// Transient light following the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct MouseLightConfig {
    pub radius: f32,
    pub height: f32,
    pub colour: ColorRgba,
    pub intensity: f32,
    pub cone: Cone,
}

impl Default for MouseLightConfig {
    fn default() -> Self {
        Self {
            radius: 400.0,
            height: 120.0,
            colour: ColorRgba::white(),
            intensity: 1.0,
            cone: Cone { direction: 0.0, width: 4.0 },
        }
    }
}

/// Shadow-casting light re-centred on the mouse every lit frame.
///
/// Its shadow draw covers its own occluder block and every block after it.
#[derive(Debug)]
pub struct MouseLight {
    pub config: MouseLightConfig,
    pub on: bool,
    shadow: ShadowLight,
    quad: LightQuad,
}

impl MouseLight {
    pub(crate) fn new(shadow: ShadowLight, config: MouseLightConfig) -> Result<Self, CapacityError> {
        Ok(Self {
            config,
            on: true,
            shadow,
            quad: LightQuad::new()?,
        })
    }

    #[inline]
    pub fn shadow(&self) -> ShadowLight {
        self.shadow
    }

    /// Centres the light quad on the mouse's world position.
    pub(crate) fn follow(&mut self, world: Vec2) {
        self.quad.cover(world, Vec2::splat(self.config.radius));
    }

    #[inline]
    pub fn quad(&self) -> &LightQuad {
        &self.quad
    }
}
