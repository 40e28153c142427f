use core::fmt;

/// The four shading programs the frame pipeline drives.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ProgramKind {
    /// Scene sprites into the G-buffer.
    Geometry,
    /// Per-light occlusion into the shadow atlas.
    Shadow,
    /// Additive light accumulation onto the surface.
    Light,
    /// Deferred UI composite onto the surface.
    Ui,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 4] = [Self::Geometry, Self::Shadow, Self::Light, Self::Ui];

    /// Source name: `<name>_vertex.wgsl` / `<name>_fragment.wgsl`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::Shadow => "shadow",
            Self::Light => "light",
            Self::Ui => "default",
        }
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Uniforms and attributes requested at load.
    pub fn desc(self) -> ProgramDesc {
        use Attribute as A;
        use Uniform as U;

        match self {
            Self::Geometry | Self::Ui => ProgramDesc {
                kind: self,
                uniforms: &[U::ScreenDimensions, U::UsingTextures, U::Translation, U::Scale],
                attributes: &[A::Position, A::TexCoord, A::Colour],
            },
            Self::Shadow => ProgramDesc {
                kind: self,
                uniforms: &[U::ScreenDimensions, U::LightPos],
                attributes: &[A::Position],
            },
            Self::Light => ProgramDesc {
                kind: self,
                uniforms: &[
                    U::ScreenDimensions,
                    U::Translation,
                    U::Scale,
                    U::LightType,
                    U::LightPos,
                    U::LightColour,
                    U::AmbientColour,
                    U::AmbientAttenuation,
                    U::DirectionalLightDir,
                    U::ConeDir,
                    U::ConeWidth,
                    U::ShadowIndex,
                    U::ShadowGrid,
                    U::LightRadius,
                    U::LightIntensity,
                ],
                attributes: &[A::Position],
            },
        }
    }
}

impl fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Load request for one program.
#[derive(Debug, Copy, Clone)]
pub struct ProgramDesc {
    pub kind: ProgramKind,
    pub uniforms: &'static [Uniform],
    pub attributes: &'static [Attribute],
}

/// Every field of the shared uniform block a program may read.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Uniform {
    ScreenDimensions,
    UsingTextures,
    Translation,
    Scale,
    LightType,
    LightPos,
    LightColour,
    AmbientColour,
    AmbientAttenuation,
    DirectionalLightDir,
    ConeDir,
    ConeWidth,
    ShadowIndex,
    ShadowGrid,
    LightRadius,
    LightIntensity,
}

impl Uniform {
    /// Field name inside the WGSL `Uniforms` struct.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ScreenDimensions => "screen_dimensions",
            Self::UsingTextures => "using_textures",
            Self::Translation => "translation",
            Self::Scale => "scale",
            Self::LightType => "light_type",
            Self::LightPos => "light_pos",
            Self::LightColour => "light_colour",
            Self::AmbientColour => "ambient_colour",
            Self::AmbientAttenuation => "ambient_attenuation",
            Self::DirectionalLightDir => "directional_light_dir",
            Self::ConeDir => "cone_dir",
            Self::ConeWidth => "cone_width",
            Self::ShadowIndex => "shadow_index",
            Self::ShadowGrid => "shadow_grid",
            Self::LightRadius => "light_radius",
            Self::LightIntensity => "light_intensity",
        }
    }

    #[inline]
    pub(crate) const fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// Per-vertex input streams.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Attribute {
    /// `vec3<f32>`: x, y, depth.
    Position,
    /// `vec2<f32>`.
    TexCoord,
    /// `vec4<f32>`.
    Colour,
}

impl Attribute {
    pub const ALL: [Attribute; 3] = [Self::Position, Self::TexCoord, Self::Colour];

    /// Parameter name of the vertex entry point input.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Position => "in_position",
            Self::TexCoord => "in_tex_coord",
            Self::Colour => "in_colour",
        }
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_program_uses_default_sources() {
        assert_eq!(ProgramKind::Ui.name(), "default");
    }

    #[test]
    fn shadow_program_does_not_request_camera() {
        let desc = ProgramKind::Shadow.desc();
        assert!(!desc.uniforms.contains(&Uniform::Translation));
        assert!(!desc.uniforms.contains(&Uniform::Scale));
    }

    #[test]
    fn uniform_bits_are_distinct() {
        let all = ProgramKind::Light.desc().uniforms;
        let mut seen = 0u32;
        for u in all {
            assert_eq!(seen & u.bit(), 0, "{u:?}");
            seen |= u.bit();
        }
    }
}
