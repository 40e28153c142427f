use crate::coords::{ColorRgba, Vec2, Vec3};
use crate::geometry::{CapacityError, QuadBuffer, ShadowLight};
use crate::shading::light_type;

use super::{LightParams, LightQuad, LightSource};

/// Cone restriction of a point light, in radians.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Cone {
    /// Centre direction, counter-clockwise from +X.
    pub direction: f32,
    /// Full opening angle. `>= 2π` is omnidirectional.
    pub width: f32,
}

impl Cone {
    /// Omnidirectional.
    pub const FULL: Cone = Cone { direction: 0.0, width: 7.0 };
}

/// Point light, optionally shadow-casting and optionally restricted to a cone.
///
/// Position is in world space; `height` is the light's distance above the
/// scene plane in pixels.
#[derive(Debug)]
pub struct PointLight {
    on: bool,
    position: Vec2,
    height: f32,
    colour: ColorRgba,
    radius: f32,
    intensity: f32,
    cone: Cone,
    shadow: Option<ShadowLight>,
    quad: LightQuad,
}

impl PointLight {
    pub const DEFAULT_HEIGHT: f32 = 60.0;

    /// Shadow-casting omnidirectional light.
    pub fn shadowed(shadow: ShadowLight, position: Vec2, radius: f32, colour: ColorRgba) -> Result<Self, CapacityError> {
        Self::build(Some(shadow), position, radius, colour, Cone::FULL)
    }

    /// Shadow-casting cone light.
    pub fn cone(shadow: ShadowLight, position: Vec2, radius: f32, colour: ColorRgba, cone: Cone) -> Result<Self, CapacityError> {
        Self::build(Some(shadow), position, radius, colour, cone)
    }

    /// Light without shadows.
    pub fn soft(position: Vec2, radius: f32, colour: ColorRgba, intensity: f32) -> Result<Self, CapacityError> {
        let mut light = Self::build(None, position, radius, colour, Cone::FULL)?;
        light.intensity = intensity;
        Ok(light)
    }

    fn build(
        shadow: Option<ShadowLight>,
        position: Vec2,
        radius: f32,
        colour: ColorRgba,
        cone: Cone,
    ) -> Result<Self, CapacityError> {
        let mut light = Self {
            on: true,
            position,
            height: Self::DEFAULT_HEIGHT,
            colour,
            radius,
            intensity: 1.0,
            cone,
            shadow,
            quad: LightQuad::new()?,
        };
        light.refit();
        Ok(light)
    }

    pub fn set_on(&mut self, on: bool) -> &mut Self {
        self.on = on;
        self
    }

    pub fn set_position(&mut self, position: Vec2) -> &mut Self {
        self.position = position;
        self.refit();
        self
    }

    pub fn set_height(&mut self, height: f32) -> &mut Self {
        self.height = height;
        self
    }

    pub fn set_colour(&mut self, colour: ColorRgba) -> &mut Self {
        self.colour = colour;
        self
    }

    pub fn set_radius(&mut self, radius: f32) -> &mut Self {
        self.radius = radius;
        self.refit();
        self
    }

    pub fn set_intensity(&mut self, intensity: f32) -> &mut Self {
        self.intensity = intensity;
        self
    }

    pub fn set_cone(&mut self, direction: f32, width: f32) -> &mut Self {
        self.cone = Cone { direction, width };
        self
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn cone_params(&self) -> Cone {
        self.cone
    }

    #[inline]
    pub fn shadow(&self) -> Option<ShadowLight> {
        self.shadow
    }

    fn refit(&mut self) {
        self.quad.cover(self.position, Vec2::splat(self.radius));
    }
}

impl LightSource for PointLight {
    fn is_on(&self) -> bool {
        self.on
    }

    fn params(&self) -> LightParams {
        LightParams {
            light_type: if self.shadow.is_some() { light_type::SHADOWED } else { light_type::SOFT },
            position: Vec3::new(self.position.x, self.position.y, self.height),
            colour: self.colour,
            radius: self.radius,
            intensity: self.intensity,
            cone: self.cone,
            shadow: self.shadow,
        }
    }

    fn quad(&self) -> &QuadBuffer {
        self.quad.buffer()
    }
}

/// Uniform light over a fixed world-space box.
#[derive(Debug)]
pub struct AmbientBox {
    on: bool,
    bottom_left: Vec2,
    top_right: Vec2,
    colour: ColorRgba,
    quad: LightQuad,
}

impl AmbientBox {
    pub fn new(bottom_left: Vec2, top_right: Vec2, colour: ColorRgba) -> Result<Self, CapacityError> {
        let mut quad = LightQuad::new()?;
        quad.cover_box(bottom_left, top_right);
        Ok(Self { on: true, bottom_left, top_right, colour, quad })
    }

    pub fn set_on(&mut self, on: bool) -> &mut Self {
        self.on = on;
        self
    }

    pub fn set_colour(&mut self, colour: ColorRgba) -> &mut Self {
        self.colour = colour;
        self
    }

    pub fn set_box(&mut self, bottom_left: Vec2, top_right: Vec2) -> &mut Self {
        self.bottom_left = bottom_left;
        self.top_right = top_right;
        self.quad.cover_box(bottom_left, top_right);
        self
    }
}

impl LightSource for AmbientBox {
    fn is_on(&self) -> bool {
        self.on
    }

    fn params(&self) -> LightParams {
        let centre = (self.bottom_left + self.top_right) / 2.0;
        LightParams {
            light_type: light_type::AMBIENT_BOX,
            position: Vec3::new(centre.x, centre.y, 0.0),
            colour: self.colour,
            radius: 0.0,
            intensity: 1.0,
            cone: Cone::FULL,
            shadow: None,
        }
    }

    fn quad(&self) -> &QuadBuffer {
        self.quad.buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_radius_around_position() {
        let light = PointLight::soft(Vec2::new(100.0, 50.0), 30.0, ColorRgba::white(), 1.0).unwrap();
        let streams = light.quad().streams();
        assert_eq!(streams.positions[0], [70.0, 20.0, 0.0]);
        assert_eq!(streams.positions[2], [130.0, 80.0, 0.0]);
    }

    #[test]
    fn moving_refits_quad() {
        let mut light = PointLight::soft(Vec2::zero(), 10.0, ColorRgba::white(), 1.0).unwrap();
        light.set_position(Vec2::new(5.0, 5.0)).set_radius(20.0);
        assert_eq!(light.quad().streams().positions[0], [-15.0, -15.0, 0.0]);
    }

    #[test]
    fn type_tag_follows_shadow() {
        let soft = PointLight::soft(Vec2::zero(), 10.0, ColorRgba::white(), 0.5).unwrap();
        assert_eq!(soft.params().light_type, light_type::SOFT);
        assert_eq!(soft.params().intensity, 0.5);
    }

    #[test]
    fn ambient_box_covers_box() {
        let b = AmbientBox::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 20.0), ColorRgba::white()).unwrap();
        assert_eq!(b.quad().streams().positions[2], [10.0, 20.0, 0.0]);
        assert_eq!(b.params().light_type, light_type::AMBIENT_BOX);
    }
}
