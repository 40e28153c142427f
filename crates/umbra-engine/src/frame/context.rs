use crate::camera::{Camera, View};
use crate::config::RendererConfig;
use crate::coords::{ColorRgba, Vec2, Vec3};
use crate::geometry::{
    GeometryBuffer, Primitive, Quad, QuadBuffer, ShadowLight, ShadowQuadBuffer, ShadowRange,
};
use crate::lights::{Daylight, LightSet, LightSource};
use crate::shading::{light_type, ProgramKind, ProgramRegistry};

use super::{
    DrawCmd, FrameCommands, FrameError, FramePhase, PassKind, RenderContextError, TextureSetId,
    UiQueue,
};

/// Inputs to the lighting phase of a game-mode frame.
pub struct Lighting<'a> {
    pub daylight: Daylight,
    /// Fixed night light drawn as a second directional light, e.g.
    /// [`TimeOfDay::nightlight`](crate::lights::TimeOfDay::nightlight).
    pub moonlight: Option<(Vec3, ColorRgba)>,
    /// Pointer in screen pixels (bottom-left origin). `None` hides the mouse light.
    pub mouse: Option<Vec2>,
    /// Must come from [`RenderContext::new_light_set`] or share its shadow config.
    pub lights: &'a mut LightSet,
}

/// Explicit rendering state owned by the frame loop.
///
/// Holds the camera, the program registry and the deferred UI queue, and
/// records each frame as [`FrameCommands`] for the GPU renderer:
///
/// 1. [`new_frame`](Self::new_frame) opens the geometry pass.
/// 2. [`draw`](Self::draw) records scene buffers and queues UI buffers.
/// 3. [`end_frame`](Self::end_frame) records the shadow and light passes (game mode only).
/// 4. [`draw_ui`](Self::draw_ui) flushes the UI queue.
///
/// Calls out of that order fail with [`FrameError::OutOfOrder`].
pub struct RenderContext {
    config: RendererConfig,
    screen: (f32, f32),
    camera: Camera,
    programs: ProgramRegistry,
    ui: UiQueue,
    commands: FrameCommands,
    phase: FramePhase,
    sun: QuadBuffer,
    sun_quad: Quad,
}

impl RenderContext {
    /// Loads every shading program. Screen size is in physical pixels.
    pub fn new(config: RendererConfig, width: u32, height: u32) -> Result<Self, RenderContextError> {
        let mut programs = ProgramRegistry::load(&config.shaders)?;
        programs.set_shadow_grid(config.shadow.grid());

        let mut sun = QuadBuffer::new(1);
        let sun_quad = sun.allocate()?;

        let mut ctx = Self {
            config,
            screen: (0.0, 0.0),
            camera: Camera::new(),
            programs,
            ui: UiQueue::default(),
            commands: FrameCommands::default(),
            phase: FramePhase::Idle,
            sun,
            sun_quad,
        };
        ctx.resize(width, height);
        Ok(ctx)
    }

    /// Updates the screen size every program sees.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        self.screen = (w, h);
        self.programs.set_screen(w, h, self.config.z_max);
        self.sun
            .slot_mut(self.sun_quad)
            .set_vertices(Vec2::zero(), Vec2::new(w, h), 0.0);
        log::debug!("render context resized to {width}x{height}");
    }

    // ── camera ────────────────────────────────────────────────────────────

    /// Identity view, pushed to the bound program.
    pub fn reset_camera(&mut self) {
        let view = self.camera.reset();
        self.programs.uniforms().view(view);
    }

    /// Adds to the translation, pushed to the bound program.
    pub fn translate(&mut self, delta: Vec2) {
        let view = self.camera.translate(delta);
        self.programs.uniforms().view(view);
    }

    /// Replaces the scale, pushed to the bound program.
    pub fn scale(&mut self, scale: Vec2) {
        let view = self.camera.scale(scale);
        self.programs.uniforms().view(view);
    }

    /// Replaces the whole view, pushed to the bound program.
    pub fn set_camera(&mut self, view: View) {
        let view = self.camera.set(view);
        self.programs.uniforms().view(view);
    }

    #[inline]
    pub fn camera(&self) -> View {
        self.camera.view()
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Resets the UI queue, binds the geometry program and opens the
    /// geometry pass (colour and depth cleared).
    pub fn new_frame(&mut self) -> Result<(), FrameError> {
        self.expect("new_frame", &[FramePhase::Idle, FramePhase::Composited])?;

        self.commands.clear();
        self.ui.reset();
        self.programs.use_program(ProgramKind::Geometry, self.camera.view());
        self.commands.begin_pass(PassKind::Geometry);

        self.phase = FramePhase::Scene;
        Ok(())
    }

    /// Records one draw of `[0, high_water)`.
    ///
    /// UI buffers are queued for [`draw_ui`](Self::draw_ui) instead, with the
    /// current camera captured when the buffer is mouse-relative. They may
    /// also be queued after [`end_frame`](Self::end_frame).
    pub fn draw<P: Primitive>(
        &mut self,
        buffer: &GeometryBuffer<P>,
        textures: Option<TextureSetId>,
    ) -> Result<(), FrameError> {
        if buffer.is_ui() {
            self.expect("draw", &[FramePhase::Scene, FramePhase::Lit])?;
        } else {
            self.expect("draw", &[FramePhase::Scene])?;
        }
        if buffer.high_water() == 0 {
            return Ok(());
        }

        let base = self.commands.push_streams(buffer.streams());

        if buffer.is_ui() {
            let mut cmd = DrawCmd::whole(ProgramKind::Ui, buffer, base);
            cmd.textures = textures;
            let view = buffer.is_mouse_relative().then(|| self.camera.view());
            self.ui.push(cmd, view);
            return Ok(());
        }

        self.programs.uniforms().using_textures(textures.is_some());
        let mut cmd = DrawCmd::whole(ProgramKind::Geometry, buffer, base);
        cmd.textures = textures;
        cmd.uniforms = self.commands.push_uniforms(self.programs.snapshot());
        self.commands.record(cmd);
        Ok(())
    }

    /// Closes the geometry pass. With `lighting`, records the shadow and
    /// light passes; without, the frame is a non-game view and stays unlit.
    ///
    /// After the light pass the camera is reset to identity so UI composites
    /// in screen space. Re-apply the world view at the start of each frame.
    ///
    /// Fails with [`FrameError::ShadowAtlas`] when the light set holds more
    /// shadow-casting lights than the atlas has cells.
    pub fn end_frame(&mut self, lighting: Option<Lighting<'_>>) -> Result<(), FrameError> {
        self.expect("end_frame", &[FramePhase::Scene])?;
        if let Some(lighting) = &lighting {
            self.check_atlas(lighting.lights)?;
        }

        match lighting {
            Some(lighting) => self.light_frame(lighting),
            None => log::trace!("non-game view; lighting skipped"),
        }

        self.phase = FramePhase::Lit;
        Ok(())
    }

    /// Binds the UI program and flushes the UI queue in insertion order.
    ///
    /// Mouse-relative entries draw with their captured camera; the live
    /// camera is pushed back after each.
    pub fn draw_ui(&mut self) -> Result<(), FrameError> {
        self.expect("draw_ui", &[FramePhase::Lit])?;

        let clear = !self.commands.has_light_pass();
        self.commands.begin_pass(PassKind::Ui { clear });
        self.programs.use_program(ProgramKind::Ui, self.camera.view());

        for entry in self.ui.take() {
            if let Some(view) = entry.view {
                self.programs.uniforms().view(view);
            }

            let mut cmd = entry.cmd;
            self.programs.uniforms().using_textures(cmd.textures.is_some());
            cmd.uniforms = self.commands.push_uniforms(self.programs.snapshot());
            self.commands.record(cmd);

            if entry.view.is_some() {
                self.programs.uniforms().view(self.camera.view());
            }
        }

        self.phase = FramePhase::Composited;
        Ok(())
    }

    /// Light set whose occluder blocks match this context's shadow atlas.
    pub fn new_light_set(&self) -> LightSet {
        LightSet::new(&self.config.shadow)
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Recorded frame; complete once the phase is `Composited`.
    #[inline]
    pub fn commands(&self) -> &FrameCommands {
        &self.commands
    }

    #[inline]
    pub fn programs(&self) -> &ProgramRegistry {
        &self.programs
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    pub fn ui_queue(&self) -> &UiQueue {
        &self.ui
    }

    #[inline]
    pub fn screen(&self) -> (f32, f32) {
        self.screen
    }

    // ── lighting ──────────────────────────────────────────────────────────

    fn light_frame(&mut self, lighting: Lighting<'_>) {
        let Lighting { daylight, moonlight, mouse, lights } = lighting;
        let world = self.camera.view();

        lights.fit_shadow_regions(world, mouse);
        self.shadow_pass(lights, mouse);

        self.commands.begin_pass(PassKind::Light);
        self.programs.use_program(ProgramKind::Light, world);

        // Sun: full-screen quad in screen space.
        self.reset_camera();
        self.programs
            .uniforms()
            .light_type(light_type::DIRECTIONAL)
            .directional_light_dir(daylight.direction)
            .light_colour(daylight.colour)
            .ambient_colour(daylight.ambient)
            .ambient_attenuation(daylight.attenuation);
        record_light(&mut self.commands, &self.programs, &self.sun);

        if let Some((direction, colour)) = moonlight {
            self.programs
                .uniforms()
                .directional_light_dir(direction)
                .light_colour(colour)
                .ambient_colour(ColorRgba::black());
            record_light(&mut self.commands, &self.programs, &self.sun);
        }

        self.set_camera(world);
        // Point lights do not fade with daylight.
        self.programs.uniforms().ambient_attenuation(0.0);

        if let (Some(m), Some(screen)) = (lights.mouse.as_mut(), mouse) {
            if m.on {
                m.follow(world.to_world(screen));
                self.programs
                    .uniforms()
                    .light_type(light_type::SHADOWED)
                    .shadow_index(m.shadow().shadow_index())
                    .light_pos(Vec3::new(screen.x, screen.y, m.config.height))
                    .light_colour(m.config.colour)
                    .light_radius(m.config.radius * world.scale.x.abs())
                    .light_intensity(m.config.intensity)
                    .cone_dir(m.config.cone.direction)
                    .cone_width(m.config.cone.width);
                record_light(&mut self.commands, &self.programs, m.quad().buffer());
            }
        }

        for light in lights.points.iter().chain(&lights.cones).chain(&lights.soft) {
            self.light_source(light, world);
        }
        for light in &lights.ambient {
            self.light_source(light, world);
        }

        self.reset_camera();
    }

    fn check_atlas(&self, lights: &LightSet) -> Result<(), FrameError> {
        let (lights, cells) = (lights.shadows().lights(), self.config.shadow.max_lights);
        if lights > cells {
            log::warn!("{lights} shadow-casting lights exceed the {cells}-cell atlas; frame not lit");
            return Err(FrameError::ShadowAtlas { lights, cells });
        }
        Ok(())
    }

    fn shadow_pass(&mut self, lights: &LightSet, mouse: Option<Vec2>) {
        self.commands.begin_pass(PassKind::Shadow);
        self.programs.use_program(ProgramKind::Shadow, self.camera.view());

        let shadows = lights.shadows();
        if shadows.quads().high_water() == 0 {
            return;
        }
        let base = self.commands.push_streams(shadows.quads().streams());
        let world = self.camera.view();

        if let (Some(m), Some(screen)) = (lights.mouse.as_ref(), mouse) {
            if m.on {
                let pos = Vec3::new(screen.x, screen.y, m.config.height);
                self.record_shadow(shadows, base, m.shadow(), ShadowRange::Remaining, pos);
            }
        }

        for light in lights.points.iter().chain(&lights.cones) {
            let Some(shadow) = light.shadow() else { continue };
            if !light.is_on() {
                continue;
            }
            let p = light.params();
            let screen = world.to_screen(p.position.xy());
            let pos = Vec3::new(screen.x, screen.y, p.position.z);
            self.record_shadow(shadows, base, shadow, ShadowRange::Own, pos);
        }
    }

    fn record_shadow(
        &mut self,
        shadows: &ShadowQuadBuffer,
        base: i32,
        light: ShadowLight,
        range: ShadowRange,
        light_pos: Vec3,
    ) {
        self.programs.uniforms().light_pos(light_pos);
        let mut cmd = DrawCmd::whole(ProgramKind::Shadow, shadows.quads(), base);
        cmd.index_range = shadows.index_range(light, range);
        cmd.shadow_cell = Some(light.shadow_index());
        cmd.uniforms = self.commands.push_uniforms(self.programs.snapshot());
        self.commands.record(cmd);
    }

    fn light_source(&mut self, light: &impl LightSource, world: View) {
        if !light.is_on() {
            return;
        }
        let p = light.params();
        let screen = world.to_screen(p.position.xy());

        self.programs
            .uniforms()
            .light_type(p.light_type)
            .light_pos(Vec3::new(screen.x, screen.y, p.position.z))
            .light_colour(p.colour)
            .light_radius(p.radius * world.scale.x.abs())
            .light_intensity(p.intensity)
            .cone_dir(p.cone.direction)
            .cone_width(p.cone.width);
        if let Some(shadow) = p.shadow {
            self.programs.uniforms().shadow_index(shadow.shadow_index());
        }
        record_light(&mut self.commands, &self.programs, light.quad());
    }

    fn expect(&self, op: &'static str, allowed: &[FramePhase]) -> Result<(), FrameError> {
        if allowed.contains(&self.phase) {
            return Ok(());
        }
        log::warn!("{op} called in the {} phase; ignored", self.phase);
        Err(FrameError::OutOfOrder { op, phase: self.phase })
    }
}

/// Records one light-program draw of `quad` with the bound program's uniforms.
fn record_light(commands: &mut FrameCommands, programs: &ProgramRegistry, quad: &QuadBuffer) {
    if quad.high_water() == 0 {
        return;
    }
    let base = commands.push_streams(quad.streams());
    let mut cmd = DrawCmd::whole(ProgramKind::Light, quad, base);
    cmd.uniforms = commands.push_uniforms(programs.snapshot());
    commands.record(cmd);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShadowConfig;
    use crate::geometry::{BufferOptions, LineBuffer};
    use crate::lights::{MouseLightConfig, TimeOfDay};
    use crate::shading::ShaderLibrary;

    fn ctx() -> RenderContext {
        let config = RendererConfig { shaders: ShaderLibrary::Embedded, ..RendererConfig::default() };
        RenderContext::new(config, 800, 600).unwrap()
    }

    fn scene_quads(n: u32) -> QuadBuffer {
        let mut buf = QuadBuffer::new(16);
        for i in 0..n {
            let q = buf.allocate().unwrap();
            let x = i as f32 * 10.0;
            buf.slot_mut(q).set_vertices(Vec2::new(x, 0.0), Vec2::new(x + 5.0, 5.0), 1.0);
        }
        buf
    }

    fn draws(ctx: &RenderContext, kind: PassKind) -> Vec<DrawCmd> {
        ctx.commands().pass(kind).map(|p| p.draws.clone()).unwrap_or_default()
    }

    fn lit(ctx: &mut RenderContext, lights: &mut LightSet, mouse: Option<Vec2>) {
        let lighting = Lighting { daylight: TimeOfDay::new(0.5).daylight(), moonlight: None, mouse, lights };
        ctx.end_frame(Some(lighting)).unwrap();
    }

    // ── phases ────────────────────────────────────────────────────────────

    #[test]
    fn draw_outside_frame_is_rejected() {
        let mut ctx = ctx();
        let buf = scene_quads(1);
        assert_eq!(
            ctx.draw(&buf, None),
            Err(FrameError::OutOfOrder { op: "draw", phase: FramePhase::Idle })
        );
    }

    #[test]
    fn phases_must_run_in_order() {
        let mut ctx = ctx();
        assert!(ctx.end_frame(None).is_err());
        assert!(ctx.draw_ui().is_err());

        ctx.new_frame().unwrap();
        assert!(ctx.new_frame().is_err());
        assert!(ctx.draw_ui().is_err());
        ctx.end_frame(None).unwrap();
        assert!(ctx.end_frame(None).is_err());
        assert!(ctx.draw(&scene_quads(1), None).is_err());
        ctx.draw_ui().unwrap();
        assert_eq!(ctx.phase(), FramePhase::Composited);

        ctx.new_frame().unwrap();
        assert_eq!(ctx.phase(), FramePhase::Scene);
    }

    #[test]
    fn new_frame_discards_previous_commands() {
        let mut ctx = ctx();
        ctx.new_frame().unwrap();
        ctx.draw(&scene_quads(2), None).unwrap();
        ctx.end_frame(None).unwrap();
        ctx.draw_ui().unwrap();

        ctx.new_frame().unwrap();
        assert!(draws(&ctx, PassKind::Geometry).is_empty());
        assert!(ctx.commands().positions.is_empty());
    }

    // ── scene draws ───────────────────────────────────────────────────────

    #[test]
    fn scene_draw_covers_high_water() {
        let mut ctx = ctx();
        let mut buf = scene_quads(3);
        let second = crate::geometry::Slot::new(buf.id(), 1);
        buf.delete(second);

        ctx.new_frame().unwrap();
        ctx.draw(&buf, None).unwrap();

        let d = draws(&ctx, PassKind::Geometry);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].index_range, 0..18);
        assert_eq!(d[0].topology, crate::geometry::PrimitiveKind::Quad);
        assert_eq!(ctx.commands().positions.len(), 12);
    }

    #[test]
    fn draws_share_vertex_streams_by_base_vertex() {
        let mut ctx = ctx();
        let quads = scene_quads(2);
        let mut lines = LineBuffer::new(4);
        let l = lines.allocate().unwrap();
        lines.slot_mut(l).set_endpoints(Vec2::zero(), Vec2::new(1.0, 1.0), 1.0);

        ctx.new_frame().unwrap();
        ctx.draw(&quads, None).unwrap();
        ctx.draw(&lines, None).unwrap();

        let d = draws(&ctx, PassKind::Geometry);
        assert_eq!(d[1].base_vertex, 8);
        assert_eq!(d[1].index_range, 0..2);
        assert_eq!(ctx.commands().positions[9], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn empty_buffer_records_nothing() {
        let mut ctx = ctx();
        ctx.new_frame().unwrap();
        ctx.draw(&QuadBuffer::new(4), None).unwrap();
        assert!(draws(&ctx, PassKind::Geometry).is_empty());
    }

    #[test]
    fn scene_draw_snapshots_camera() {
        let mut ctx = ctx();
        ctx.new_frame().unwrap();
        ctx.translate(Vec2::new(4.0, 2.0));
        ctx.draw(&scene_quads(1), None).unwrap();
        ctx.scale(Vec2::new(3.0, 3.0));
        ctx.draw(&scene_quads(1), None).unwrap();

        let d = draws(&ctx, PassKind::Geometry);
        let cmds = ctx.commands();
        assert_eq!(cmds.uniforms_of(&d[0]).translation, [4.0, 2.0]);
        assert_eq!(cmds.uniforms_of(&d[0]).scale, [1.0, 1.0]);
        assert_eq!(cmds.uniforms_of(&d[1]).scale, [3.0, 3.0]);
        assert_eq!(cmds.uniforms_of(&d[1]).using_textures, 0);
    }

    // ── camera ────────────────────────────────────────────────────────────

    #[test]
    fn reset_then_translate_pushes_exact_delta() {
        let mut ctx = ctx();
        ctx.translate(Vec2::new(50.0, 50.0));
        ctx.reset_camera();
        ctx.translate(Vec2::new(7.0, -3.0));
        assert_eq!(ctx.programs().snapshot().translation, [7.0, -3.0]);
    }

    #[test]
    fn scale_push_is_absolute() {
        let mut ctx = ctx();
        ctx.scale(Vec2::new(2.0, 2.0));
        ctx.scale(Vec2::new(0.5, 0.25));
        assert_eq!(ctx.programs().snapshot().scale, [0.5, 0.25]);
    }

    // ── ui queue ──────────────────────────────────────────────────────────

    #[test]
    fn ui_buffers_are_deferred_to_ui_pass() {
        let mut ctx = ctx();
        let mut ui = QuadBuffer::with_options(4, BufferOptions::ui());
        ui.allocate().unwrap();

        ctx.new_frame().unwrap();
        ctx.draw(&ui, None).unwrap();
        assert!(draws(&ctx, PassKind::Geometry).is_empty());
        assert_eq!(ctx.ui_queue().len(), 1);

        ctx.end_frame(None).unwrap();
        ctx.draw_ui().unwrap();

        let d = draws(&ctx, PassKind::Ui { clear: true });
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].program, ProgramKind::Ui);
        assert!(ctx.ui_queue().is_empty());
    }

    #[test]
    fn ui_queue_flushes_in_insertion_order() {
        let mut ctx = ctx();
        let mut a = QuadBuffer::with_options(1, BufferOptions::ui());
        let mut b = QuadBuffer::with_options(1, BufferOptions::ui());
        a.allocate().unwrap();
        b.allocate().unwrap();

        ctx.new_frame().unwrap();
        ctx.draw(&b, None).unwrap();
        ctx.draw(&a, None).unwrap();
        ctx.end_frame(None).unwrap();
        ctx.draw_ui().unwrap();

        let d = draws(&ctx, PassKind::Ui { clear: true });
        assert_eq!(d[0].buffer, b.id());
        assert_eq!(d[1].buffer, a.id());
    }

    #[test]
    fn mouse_relative_ui_uses_snapshot_then_restores_live_camera() {
        let mut ctx = ctx();
        let mut label = QuadBuffer::with_options(1, BufferOptions::mouse_relative());
        let mut panel = QuadBuffer::with_options(1, BufferOptions::ui());
        label.allocate().unwrap();
        panel.allocate().unwrap();

        ctx.new_frame().unwrap();
        ctx.translate(Vec2::new(10.0, 20.0));
        ctx.scale(Vec2::new(2.0, 2.0));
        ctx.draw(&label, None).unwrap();

        ctx.reset_camera();
        ctx.translate(Vec2::new(-5.0, 0.0));
        ctx.draw(&panel, None).unwrap();
        ctx.end_frame(None).unwrap();
        ctx.draw_ui().unwrap();

        let d = draws(&ctx, PassKind::Ui { clear: true });
        let cmds = ctx.commands();
        assert_eq!(cmds.uniforms_of(&d[0]).translation, [10.0, 20.0]);
        assert_eq!(cmds.uniforms_of(&d[0]).scale, [2.0, 2.0]);
        assert_eq!(cmds.uniforms_of(&d[1]).translation, [-5.0, 0.0]);
        assert_eq!(cmds.uniforms_of(&d[1]).scale, [1.0, 1.0]);

        let live = View::new(Vec2::new(-5.0, 0.0), Vec2::new(1.0, 1.0));
        assert_eq!(ctx.camera(), live);
        assert_eq!(ctx.programs().snapshot().translation, [-5.0, 0.0]);
        assert_eq!(ctx.programs().snapshot().scale, [1.0, 1.0]);
    }

    #[test]
    fn ui_queued_after_end_frame_is_composited() {
        let mut ctx = ctx();
        let mut cursor = QuadBuffer::with_options(1, BufferOptions::mouse_relative());
        cursor.allocate().unwrap();

        ctx.new_frame().unwrap();
        ctx.end_frame(None).unwrap();
        ctx.translate(Vec2::new(7.0, 8.0));
        ctx.draw(&cursor, None).unwrap();
        ctx.draw_ui().unwrap();

        let d = draws(&ctx, PassKind::Ui { clear: true });
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].buffer, cursor.id());
        assert_eq!(ctx.commands().uniforms_of(&d[0]).translation, [7.0, 8.0]);
    }

    #[test]
    fn scene_buffer_after_end_frame_is_rejected() {
        let mut ctx = ctx();
        ctx.new_frame().unwrap();
        ctx.end_frame(None).unwrap();
        assert_eq!(
            ctx.draw(&scene_quads(1), None),
            Err(FrameError::OutOfOrder { op: "draw", phase: FramePhase::Lit })
        );
    }

    #[test]
    fn textured_ui_sets_using_textures() {
        let mut ctx = ctx();
        let mut ui = QuadBuffer::with_options(1, BufferOptions::ui());
        ui.allocate().unwrap();

        ctx.new_frame().unwrap();
        ctx.draw(&ui, Some(TextureSetId(3))).unwrap();
        ctx.end_frame(None).unwrap();
        ctx.draw_ui().unwrap();

        let d = draws(&ctx, PassKind::Ui { clear: true });
        assert_eq!(d[0].textures, Some(TextureSetId(3)));
        assert_eq!(ctx.commands().uniforms_of(&d[0]).using_textures, 1);
    }

    // ── lighting ──────────────────────────────────────────────────────────

    fn light_set() -> LightSet {
        LightSet::new(&ShadowConfig { max_lights: 8, ..ShadowConfig::default() })
    }

    #[test]
    fn non_game_view_skips_lighting() {
        let mut ctx = ctx();
        ctx.new_frame().unwrap();
        ctx.end_frame(None).unwrap();
        ctx.draw_ui().unwrap();
        assert!(ctx.commands().pass(PassKind::Light).is_none());
        assert!(ctx.commands().pass(PassKind::Shadow).is_none());
        assert!(ctx.commands().pass(PassKind::Ui { clear: true }).is_some());
    }

    #[test]
    fn lit_frame_loads_surface_for_ui() {
        let mut ctx = ctx();
        let mut lights = light_set();
        ctx.new_frame().unwrap();
        lit(&mut ctx, &mut lights, None);
        ctx.draw_ui().unwrap();
        assert!(ctx.commands().pass(PassKind::Ui { clear: false }).is_some());
    }

    #[test]
    fn light_order_is_sun_mouse_points_cones_soft_ambient() {
        let mut ctx = ctx();
        let mut lights = light_set();
        lights.enable_mouse_light(MouseLightConfig::default()).unwrap();
        lights.add_point(Vec2::new(100.0, 100.0), 50.0, ColorRgba::white()).unwrap();
        lights
            .add_cone(Vec2::new(200.0, 100.0), 50.0, ColorRgba::white(), crate::lights::Cone { direction: 1.0, width: 0.5 })
            .unwrap();
        lights.add_soft(Vec2::new(300.0, 100.0), 50.0, ColorRgba::white(), 0.5).unwrap();
        lights.add_ambient(Vec2::zero(), Vec2::new(10.0, 10.0), ColorRgba::white()).unwrap();

        ctx.new_frame().unwrap();
        lit(&mut ctx, &mut lights, Some(Vec2::new(400.0, 300.0)));

        let d = draws(&ctx, PassKind::Light);
        let types: Vec<u32> = d.iter().map(|c| ctx.commands().uniforms_of(c).light_type).collect();
        assert_eq!(
            types,
            [
                light_type::DIRECTIONAL,
                light_type::SHADOWED,
                light_type::SHADOWED,
                light_type::SHADOWED,
                light_type::SOFT,
                light_type::AMBIENT_BOX,
            ]
        );
        assert_eq!(ctx.commands().uniforms_of(&d[3]).cone_dir, 1.0);
    }

    #[test]
    fn sun_draws_with_identity_camera_then_world_view_returns_for_lights() {
        let mut ctx = ctx();
        let mut lights = light_set();
        lights.add_soft(Vec2::new(0.0, 0.0), 10.0, ColorRgba::white(), 1.0).unwrap();

        ctx.new_frame().unwrap();
        ctx.translate(Vec2::new(-30.0, -40.0));
        ctx.scale(Vec2::new(2.0, 2.0));
        lit(&mut ctx, &mut lights, None);

        let d = draws(&ctx, PassKind::Light);
        let cmds = ctx.commands();
        assert_eq!(cmds.uniforms_of(&d[0]).translation, [0.0, 0.0]);
        assert_eq!(cmds.uniforms_of(&d[0]).scale, [1.0, 1.0]);
        assert_eq!(cmds.uniforms_of(&d[1]).translation, [-30.0, -40.0]);
        assert_eq!(cmds.uniforms_of(&d[1]).scale, [2.0, 2.0]);
        assert_eq!(cmds.uniforms_of(&d[1]).light_pos[..2], [-60.0, -80.0]);
        assert_eq!(cmds.uniforms_of(&d[1]).light_radius, 20.0);
    }

    #[test]
    fn lighting_leaves_ui_in_screen_space() {
        let mut ctx = ctx();
        let mut lights = light_set();
        let mut hud = QuadBuffer::with_options(1, BufferOptions::ui());
        hud.allocate().unwrap();

        ctx.new_frame().unwrap();
        ctx.translate(Vec2::new(-300.0, -200.0));
        ctx.scale(Vec2::new(2.0, 2.0));
        ctx.draw(&hud, None).unwrap();
        lit(&mut ctx, &mut lights, None);
        ctx.draw_ui().unwrap();

        let d = draws(&ctx, PassKind::Ui { clear: false });
        let u = ctx.commands().uniforms_of(&d[0]);
        assert_eq!(u.translation, [0.0, 0.0]);
        assert_eq!(u.scale, [1.0, 1.0]);
        assert_eq!(ctx.camera(), View::IDENTITY);
    }

    #[test]
    fn set_camera_restores_a_saved_view() {
        let mut ctx = ctx();
        let view = View::new(Vec2::new(-30.0, 12.0), Vec2::new(3.0, 3.0));
        ctx.new_frame().unwrap();
        ctx.set_camera(view);
        assert_eq!(ctx.camera(), view);
        assert_eq!(ctx.programs().snapshot().translation, [-30.0, 12.0]);
        assert_eq!(ctx.programs().snapshot().scale, [3.0, 3.0]);
    }

    #[test]
    fn point_lights_do_not_fade_with_daylight() {
        let mut ctx = ctx();
        let mut lights = light_set();
        lights.add_point(Vec2::new(100.0, 100.0), 50.0, ColorRgba::white()).unwrap();
        lights.add_soft(Vec2::new(200.0, 100.0), 50.0, ColorRgba::white(), 1.0).unwrap();

        ctx.new_frame().unwrap();
        lit(&mut ctx, &mut lights, None);

        let d = draws(&ctx, PassKind::Light);
        let attenuation: Vec<f32> = d
            .iter()
            .map(|c| ctx.commands().uniforms_of(c).ambient_attenuation)
            .collect();
        assert_eq!(attenuation, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn moonlight_draws_a_second_directional_light() {
        let mut ctx = ctx();
        let mut lights = light_set();
        let night = TimeOfDay::new(0.9);

        ctx.new_frame().unwrap();
        let lighting = Lighting {
            daylight: night.daylight(),
            moonlight: Some(night.nightlight()),
            mouse: None,
            lights: &mut lights,
        };
        ctx.end_frame(Some(lighting)).unwrap();

        let d = draws(&ctx, PassKind::Light);
        assert_eq!(d.len(), 2);
        let moon = ctx.commands().uniforms_of(&d[1]);
        assert_eq!(moon.light_type, light_type::DIRECTIONAL);
        assert_eq!(moon.light_colour[..3], TimeOfDay::NIGHT_COLOUR.rgb_array());
        assert_eq!(moon.ambient_colour[..3], [0.0, 0.0, 0.0]);
        assert_eq!(d[1].buffer, d[0].buffer);
    }

    #[test]
    fn light_that_is_off_contributes_nothing() {
        let mut ctx = ctx();
        let mut lights = light_set();
        let off = lights.add_point(Vec2::new(100.0, 100.0), 50.0, ColorRgba::rgb(1.0, 0.0, 0.0)).unwrap();
        off.set_on(false);
        let off_quad = off.quad().id();
        lights.add_soft(Vec2::new(9.0, 9.0), 5.0, ColorRgba::white(), 1.0).unwrap().set_on(false);

        ctx.new_frame().unwrap();
        lit(&mut ctx, &mut lights, None);

        assert!(ctx.commands().draws().all(|d| d.buffer != off_quad));
        assert_eq!(draws(&ctx, PassKind::Light).len(), 1, "only the sun");
        assert!(draws(&ctx, PassKind::Shadow).is_empty());
    }

    #[test]
    fn shadow_pass_draws_mouse_then_each_caster_into_its_cell() {
        let mut ctx = ctx();
        let mut lights = light_set();
        lights.enable_mouse_light(MouseLightConfig::default()).unwrap();
        lights.add_point(Vec2::new(100.0, 100.0), 50.0, ColorRgba::white()).unwrap();
        lights.add_point(Vec2::new(300.0, 100.0), 50.0, ColorRgba::white()).unwrap();

        ctx.new_frame().unwrap();
        lit(&mut ctx, &mut lights, Some(Vec2::new(10.0, 10.0)));

        let d = draws(&ctx, PassKind::Shadow);
        assert_eq!(d.len(), 3);
        assert_eq!(d[0].shadow_cell, Some(0));
        assert_eq!(d[0].index_range, 0..18);
        assert_eq!(d[1].shadow_cell, Some(1));
        assert_eq!(d[1].index_range, 6..12);
        assert_eq!(d[2].shadow_cell, Some(2));
        assert_eq!(ctx.commands().uniforms_of(&d[0]).light_pos[..2], [10.0, 10.0]);
        assert_eq!(ctx.commands().uniforms_of(&d[2]).light_pos[..2], [300.0, 100.0]);
    }

    #[test]
    fn mouse_light_follows_pointer_in_world_space() {
        let mut ctx = ctx();
        let mut lights = light_set();
        let config = MouseLightConfig { radius: 10.0, ..MouseLightConfig::default() };
        lights.enable_mouse_light(config).unwrap();

        ctx.new_frame().unwrap();
        ctx.translate(Vec2::new(100.0, 0.0));
        lit(&mut ctx, &mut lights, Some(Vec2::new(150.0, 50.0)));

        let corners = lights.mouse.as_ref().unwrap().quad().corners();
        assert_eq!(corners[0], [40.0, 40.0, 0.0]);
        assert_eq!(corners[2], [60.0, 60.0, 0.0]);
    }

    #[test]
    fn mouse_light_hidden_without_pointer() {
        let mut ctx = ctx();
        let mut lights = light_set();
        lights.enable_mouse_light(MouseLightConfig::default()).unwrap();

        ctx.new_frame().unwrap();
        lit(&mut ctx, &mut lights, None);
        assert_eq!(draws(&ctx, PassKind::Light).len(), 1);
        assert!(draws(&ctx, PassKind::Shadow).is_empty());
    }

    // ── shadow atlas capacity ─────────────────────────────────────────────

    #[test]
    fn light_set_larger_than_atlas_is_rejected() {
        let small = ShadowConfig { max_lights: 1, ..ShadowConfig::default() };
        let config = RendererConfig {
            shaders: ShaderLibrary::Embedded,
            shadow: small,
            ..RendererConfig::default()
        };
        let mut ctx = RenderContext::new(config, 800, 600).unwrap();
        let mut lights = LightSet::new(&ShadowConfig { max_lights: 4, ..ShadowConfig::default() });
        lights.add_point(Vec2::new(10.0, 10.0), 50.0, ColorRgba::white()).unwrap();
        lights.add_point(Vec2::new(90.0, 10.0), 50.0, ColorRgba::white()).unwrap();

        ctx.new_frame().unwrap();
        let lighting = Lighting {
            daylight: TimeOfDay::new(0.5).daylight(),
            moonlight: None,
            mouse: None,
            lights: &mut lights,
        };
        assert_eq!(
            ctx.end_frame(Some(lighting)),
            Err(FrameError::ShadowAtlas { lights: 2, cells: 1 })
        );
        assert_eq!(ctx.phase(), FramePhase::Scene);
        assert!(ctx.commands().pass(PassKind::Shadow).is_none());

        ctx.end_frame(None).unwrap();
    }

    #[test]
    fn context_light_set_matches_atlas() {
        let ctx = ctx();
        let mut lights = ctx.new_light_set();
        for i in 0..ctx.config().shadow.max_lights {
            lights.add_point(Vec2::new(i as f32, 0.0), 10.0, ColorRgba::white()).unwrap();
        }
        assert!(lights.add_point(Vec2::zero(), 10.0, ColorRgba::white()).is_err());
    }
}
