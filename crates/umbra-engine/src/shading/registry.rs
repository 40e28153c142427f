use crate::camera::View;
use crate::coords::Vec3;

use super::{
    DrawUniforms, ProgramDesc, ProgramKind, ProgramLayout, ProgramSource, ShaderError,
    ShaderLibrary, UniformWriter,
};

/// One loaded program and its current uniform values.
#[derive(Debug)]
struct Program {
    source: ProgramSource,
    layout: ProgramLayout,
    state: DrawUniforms,
}

/// All shading programs plus the currently bound one.
///
/// Each program keeps its own uniform values between binds, so switching
/// programs never loses state.
#[derive(Debug)]
pub struct ProgramRegistry {
    programs: Vec<Program>,
    bound: ProgramKind,
}

impl ProgramRegistry {
    /// Loads and resolves every program in [`ProgramKind::ALL`].
    pub fn load(library: &ShaderLibrary) -> Result<Self, ShaderError> {
        let programs = ProgramKind::ALL
            .into_iter()
            .map(|kind| load_program(library, &kind.desc()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { programs, bound: ProgramKind::Geometry })
    }

    /// Binds `kind` and pushes `view` to it.
    ///
    /// Programs without translation/scale ignore the push.
    pub fn use_program(&mut self, kind: ProgramKind, view: View) {
        self.bound = kind;
        self.uniforms().view(view);
    }

    #[inline]
    pub fn bound(&self) -> ProgramKind {
        self.bound
    }

    /// Writer for the bound program.
    pub fn uniforms(&mut self) -> UniformWriter<'_> {
        self.uniforms_of(self.bound)
    }

    /// Writer for any program, bound or not.
    pub fn uniforms_of(&mut self, kind: ProgramKind) -> UniformWriter<'_> {
        let p = &mut self.programs[kind.index()];
        UniformWriter::new(&p.layout, &mut p.state)
    }

    /// Current values of the bound program, as a draw would see them.
    #[inline]
    pub fn snapshot(&self) -> DrawUniforms {
        self.programs[self.bound.index()].state
    }

    #[inline]
    pub fn state(&self, kind: ProgramKind) -> &DrawUniforms {
        &self.programs[kind.index()].state
    }

    #[inline]
    pub fn layout(&self, kind: ProgramKind) -> &ProgramLayout {
        &self.programs[kind.index()].layout
    }

    #[inline]
    pub fn source(&self, kind: ProgramKind) -> &ProgramSource {
        &self.programs[kind.index()].source
    }

    /// Screen size and depth range, written to every program that reads them.
    pub fn set_screen(&mut self, width: f32, height: f32, z_max: f32) {
        for kind in ProgramKind::ALL {
            self.uniforms_of(kind).screen_dimensions(Vec3::new(width, height, z_max));
        }
    }

    /// Shadow atlas grid, written to every program that reads it.
    pub fn set_shadow_grid(&mut self, grid: [u32; 2]) {
        for kind in ProgramKind::ALL {
            self.uniforms_of(kind).shadow_grid(grid);
        }
    }
}

fn load_program(library: &ShaderLibrary, desc: &ProgramDesc) -> Result<Program, ShaderError> {
    let source = library.sources(desc.kind)?;
    let layout = ProgramLayout::resolve(desc, &source)?;
    log::info!("loaded {} program", desc.kind);

    Ok(Program {
        source,
        layout,
        state: DrawUniforms::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;

    fn registry() -> ProgramRegistry {
        ProgramRegistry::load(&ShaderLibrary::Embedded).unwrap()
    }

    #[test]
    fn use_program_pushes_camera() {
        let mut reg = registry();
        let view = View::new(Vec2::new(10.0, 20.0), Vec2::new(2.0, 2.0));
        reg.use_program(ProgramKind::Light, view);
        assert_eq!(reg.bound(), ProgramKind::Light);
        assert_eq!(reg.snapshot().translation, [10.0, 20.0]);
        assert_eq!(reg.snapshot().scale, [2.0, 2.0]);
    }

    #[test]
    fn shadow_program_ignores_camera() {
        let mut reg = registry();
        let view = View::new(Vec2::new(10.0, 20.0), Vec2::new(3.0, 3.0));
        reg.use_program(ProgramKind::Shadow, view);
        assert_eq!(reg.snapshot().translation, [0.0, 0.0]);
        assert_eq!(reg.snapshot().scale, [1.0, 1.0]);
    }

    #[test]
    fn state_survives_rebinding() {
        let mut reg = registry();
        reg.use_program(ProgramKind::Light, View::IDENTITY);
        reg.uniforms().light_radius(250.0);
        reg.use_program(ProgramKind::Ui, View::IDENTITY);
        reg.use_program(ProgramKind::Light, View::IDENTITY);
        assert_eq!(reg.snapshot().light_radius, 250.0);
    }

    #[test]
    fn writes_to_unresolved_uniform_are_ignored() {
        let mut reg = registry();
        reg.use_program(ProgramKind::Geometry, View::IDENTITY);
        reg.uniforms().light_radius(99.0);
        assert_eq!(reg.snapshot().light_radius, 0.0);
    }

    #[test]
    fn embedded_programs_read_every_requested_uniform() {
        let reg = registry();
        for kind in ProgramKind::ALL {
            for &u in kind.desc().uniforms {
                assert!(reg.layout(kind).has(u), "{kind} does not read {}", u.name());
            }
        }
    }

    #[test]
    fn set_screen_reaches_every_program() {
        let mut reg = registry();
        reg.set_screen(800.0, 600.0, 10_000.0);
        for kind in ProgramKind::ALL {
            assert_eq!(reg.state(kind).screen_dimensions[..3], [800.0, 600.0, 10_000.0], "{kind}");
        }
    }
}
