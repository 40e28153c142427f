use bytemuck::{Pod, Zeroable};

use crate::camera::View;
use crate::coords::{ColorRgba, Vec2, Vec3};

use super::{ProgramLayout, Uniform};

/// CPU copy of the WGSL `Uniforms` block in `common.wgsl`.
///
/// One snapshot is taken per recorded draw and uploaded at a dynamic offset.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    pub translation: [f32; 2],
    pub scale: [f32; 2],
    /// width, height, z_max, unused
    pub screen_dimensions: [f32; 4],

    pub using_textures: u32,
    pub light_type: u32,
    pub shadow_index: u32,
    pub light_radius: f32,

    /// screen x, screen y, height, unused
    pub light_pos: [f32; 4],
    pub light_colour: [f32; 4],
    pub ambient_colour: [f32; 4],
    pub directional_light_dir: [f32; 4],

    pub cone_dir: f32,
    pub cone_width: f32,
    pub light_intensity: f32,
    pub ambient_attenuation: f32,

    /// atlas columns, rows
    pub shadow_grid: [f32; 2],
    pub _pad: [f32; 2],
}

impl DrawUniforms {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;
}

impl Default for DrawUniforms {
    fn default() -> Self {
        Self {
            scale: [1.0, 1.0],
            light_intensity: 1.0,
            ..Zeroable::zeroed()
        }
    }
}

/// Light type tags understood by the light program.
pub mod light_type {
    pub const DIRECTIONAL: u32 = 1;
    pub const SHADOWED: u32 = 2;
    pub const SOFT: u32 = 3;
    pub const AMBIENT_BOX: u32 = 4;
}

/// Typed writer over one program's uniform state.
///
/// Writes to uniforms the program did not resolve are dropped.
pub struct UniformWriter<'a> {
    layout: &'a ProgramLayout,
    state: &'a mut DrawUniforms,
}

macro_rules! setter {
    ($(#[$m:meta])* $fn:ident, $uniform:ident, |$s:ident, $v:ident: $ty:ty| $body:expr) => {
        $(#[$m])*
        pub fn $fn(&mut self, $v: $ty) -> &mut Self {
            if self.layout.has(Uniform::$uniform) {
                let $s = &mut *self.state;
                $body;
            }
            self
        }
    };
}

impl<'a> UniformWriter<'a> {
    pub(crate) fn new(layout: &'a ProgramLayout, state: &'a mut DrawUniforms) -> Self {
        Self { layout, state }
    }

    /// Translation and scale together.
    pub fn view(&mut self, view: View) -> &mut Self {
        self.translation(view.translation).scale(view.scale)
    }

    setter!(translation, Translation, |s, v: Vec2| s.translation = v.to_array());
    setter!(scale, Scale, |s, v: Vec2| s.scale = v.to_array());
    setter!(
        /// Width and height in pixels plus the depth range.
        screen_dimensions, ScreenDimensions, |s, v: Vec3| s.screen_dimensions = v.extend(0.0)
    );
    setter!(using_textures, UsingTextures, |s, v: bool| s.using_textures = v as u32);
    setter!(light_type, LightType, |s, v: u32| s.light_type = v);
    setter!(
        /// Screen position and height above the scene.
        light_pos, LightPos, |s, v: Vec3| s.light_pos = v.extend(0.0)
    );
    setter!(light_colour, LightColour, |s, v: ColorRgba| s.light_colour = v.to_array());
    setter!(ambient_colour, AmbientColour, |s, v: ColorRgba| s.ambient_colour = v.to_array());
    setter!(ambient_attenuation, AmbientAttenuation, |s, v: f32| s.ambient_attenuation = v);
    setter!(directional_light_dir, DirectionalLightDir, |s, v: Vec3| s.directional_light_dir = v.extend(0.0));
    setter!(cone_dir, ConeDir, |s, v: f32| s.cone_dir = v);
    setter!(cone_width, ConeWidth, |s, v: f32| s.cone_width = v);
    setter!(shadow_index, ShadowIndex, |s, v: u32| s.shadow_index = v);
    setter!(shadow_grid, ShadowGrid, |s, v: [u32; 2]| s.shadow_grid = [v[0] as f32, v[1] as f32]);
    setter!(light_radius, LightRadius, |s, v: f32| s.light_radius = v);
    setter!(light_intensity, LightIntensity, |s, v: f32| s.light_intensity = v);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_matches_wgsl_layout() {
        assert_eq!(DrawUniforms::SIZE, 144);
        assert_eq!(std::mem::offset_of!(DrawUniforms, light_pos), 48);
        assert_eq!(std::mem::offset_of!(DrawUniforms, cone_dir), 112);
        assert_eq!(std::mem::offset_of!(DrawUniforms, shadow_grid), 128);
    }

    #[test]
    fn default_has_unit_scale() {
        let u = DrawUniforms::default();
        assert_eq!(u.scale, [1.0, 1.0]);
        assert_eq!(u.translation, [0.0, 0.0]);
    }
}
