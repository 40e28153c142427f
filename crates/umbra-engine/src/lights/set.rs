use crate::camera::View;
use crate::config::ShadowConfig;
use crate::coords::{ColorRgba, Vec2};
use crate::geometry::{CapacityError, ShadowLight, ShadowQuadBuffer};

use super::{AmbientBox, Cone, LightSource, MouseLight, MouseLightConfig, PointLight};

/// Every light in the scene plus the shared occluder buffer.
///
/// Game code owns and mutates the lights; the frame pipeline only reads them
/// in a fixed order: mouse, shadowed points, cones, soft lights, ambient boxes.
#[derive(Debug)]
pub struct LightSet {
    shadows: ShadowQuadBuffer,
    pub mouse: Option<MouseLight>,
    pub points: Vec<PointLight>,
    pub cones: Vec<PointLight>,
    pub soft: Vec<PointLight>,
    pub ambient: Vec<AmbientBox>,
}

impl LightSet {
    pub fn new(config: &ShadowConfig) -> Self {
        Self {
            shadows: ShadowQuadBuffer::new(config.max_lights, config.quads_per_light),
            mouse: None,
            points: Vec::new(),
            cones: Vec::new(),
            soft: Vec::new(),
            ambient: Vec::new(),
        }
    }

    /// Reserves the next occluder block and atlas cell.
    pub fn new_light(&mut self) -> Result<ShadowLight, CapacityError> {
        self.shadows.new_light()
    }

    /// Enables the pointer light. Call before adding other shadow-casting
    /// lights so its shadow draw covers every block.
    pub fn enable_mouse_light(&mut self, config: MouseLightConfig) -> Result<&mut MouseLight, CapacityError> {
        if self.shadows.lights() > 0 {
            log::warn!(
                "mouse light added after {} shadow lights; their occluders are not covered",
                self.shadows.lights()
            );
        }
        let shadow = self.new_light()?;
        Ok(self.mouse.insert(MouseLight::new(shadow, config)?))
    }

    pub fn add_point(&mut self, position: Vec2, radius: f32, colour: ColorRgba) -> Result<&mut PointLight, CapacityError> {
        let shadow = self.new_light()?;
        self.points.push(PointLight::shadowed(shadow, position, radius, colour)?);
        Ok(last(&mut self.points))
    }

    pub fn add_cone(
        &mut self,
        position: Vec2,
        radius: f32,
        colour: ColorRgba,
        cone: Cone,
    ) -> Result<&mut PointLight, CapacityError> {
        let shadow = self.new_light()?;
        self.cones.push(PointLight::cone(shadow, position, radius, colour, cone)?);
        Ok(last(&mut self.cones))
    }

    pub fn add_soft(
        &mut self,
        position: Vec2,
        radius: f32,
        colour: ColorRgba,
        intensity: f32,
    ) -> Result<&mut PointLight, CapacityError> {
        self.soft.push(PointLight::soft(position, radius, colour, intensity)?);
        Ok(last(&mut self.soft))
    }

    pub fn add_ambient(
        &mut self,
        bottom_left: Vec2,
        top_right: Vec2,
        colour: ColorRgba,
    ) -> Result<&mut AmbientBox, CapacityError> {
        self.ambient.push(AmbientBox::new(bottom_left, top_right, colour)?);
        Ok(last(&mut self.ambient))
    }

    #[inline]
    pub fn shadows(&self) -> &ShadowQuadBuffer {
        &self.shadows
    }

    /// Re-centres each shadow caster's occluder region on its screen
    /// position. Lights that are off, and the mouse light without a pointer,
    /// get an empty region.
    pub(crate) fn fit_shadow_regions(&mut self, world: View, pointer: Option<Vec2>) {
        let Self { shadows, mouse, points, cones, .. } = self;
        let extent = |radius: f32| Vec2::new(radius * world.scale.x.abs(), radius * world.scale.y.abs());

        if let Some(m) = mouse {
            match pointer {
                Some(screen) if m.on => shadows.set_region(m.shadow(), screen, extent(m.config.radius)),
                _ => shadows.clear_region(m.shadow()),
            }
        }

        for light in points.iter().chain(cones.iter()) {
            let Some(shadow) = light.shadow() else { continue };
            if light.is_on() {
                shadows.set_region(shadow, world.to_screen(light.position()), extent(light.radius()));
            } else {
                shadows.clear_region(shadow);
            }
        }
    }
}

fn last<T>(items: &mut [T]) -> &mut T {
    let n = items.len() - 1;
    &mut items[n]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(max_lights: u32) -> LightSet {
        LightSet::new(&ShadowConfig { max_lights, ..ShadowConfig::default() })
    }

    #[test]
    fn shadow_lights_take_consecutive_indices() {
        let mut lights = set(4);
        let mouse = lights.enable_mouse_light(MouseLightConfig::default()).unwrap().shadow();
        let p = lights.add_point(Vec2::zero(), 10.0, ColorRgba::white()).unwrap().shadow();
        let c = lights
            .add_cone(Vec2::zero(), 10.0, ColorRgba::white(), Cone { direction: 0.0, width: 1.0 })
            .unwrap()
            .shadow();
        assert_eq!(mouse.shadow_index(), 0);
        assert_eq!(p.map(|s| s.shadow_index()), Some(1));
        assert_eq!(c.map(|s| s.shadow_index()), Some(2));
    }

    #[test]
    fn soft_lights_do_not_use_shadow_blocks() {
        let mut lights = set(1);
        lights.add_soft(Vec2::zero(), 10.0, ColorRgba::white(), 1.0).unwrap();
        lights.add_soft(Vec2::zero(), 10.0, ColorRgba::white(), 1.0).unwrap();
        assert_eq!(lights.shadows().lights(), 0);
        assert!(lights.add_point(Vec2::zero(), 10.0, ColorRgba::white()).is_ok());
    }

    #[test]
    fn shadow_capacity_is_enforced() {
        let mut lights = set(1);
        lights.add_point(Vec2::zero(), 10.0, ColorRgba::white()).unwrap();
        assert!(lights.add_point(Vec2::zero(), 10.0, ColorRgba::white()).is_err());
    }

    #[test]
    fn regions_follow_screen_position() {
        let mut lights = set(2);
        lights.add_point(Vec2::new(10.0, 10.0), 5.0, ColorRgba::white()).unwrap();
        let world = View::new(Vec2::new(10.0, 0.0), Vec2::new(2.0, 2.0));
        lights.fit_shadow_regions(world, None);

        let quads = lights.shadows().quads();
        let first = crate::geometry::Slot::new(quads.id(), 0);
        assert_eq!(quads.vertices(first)[0], [30.0, 10.0, 0.0]);
        assert_eq!(quads.vertices(first)[2], [50.0, 30.0, 0.0]);
    }

    #[test]
    fn switched_off_light_has_empty_region() {
        let mut lights = set(2);
        lights.add_point(Vec2::new(10.0, 10.0), 5.0, ColorRgba::white()).unwrap().set_on(false);
        lights.fit_shadow_regions(View::IDENTITY, None);
        let quads = lights.shadows().quads();
        assert!(!quads.is_enabled(crate::geometry::Slot::new(quads.id(), 0)));
    }

    #[test]
    fn returned_reference_mutates_stored_light() {
        let mut lights = set(2);
        lights.add_point(Vec2::zero(), 10.0, ColorRgba::white()).unwrap().set_on(false);
        assert!(!lights.points[0].is_on());
    }
}
