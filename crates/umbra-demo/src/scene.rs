//! The demo level: a tiled floor, a few crates that cast shadows, some path
//! lines, a highlighted crate and a small HUD.

use umbra_engine::coords::{ColorRgba, Vec2};
use umbra_engine::frame::{FrameError, RenderContext, TextureSetId};
use umbra_engine::geometry::{BufferOptions, CapacityError, LineBuffer, Quad, QuadBorder, QuadBuffer};
use umbra_engine::lights::{Cone, LightSet, MouseLightConfig};

const TILE: f32 = 64.0;
const TILES_X: u32 = 24;
const TILES_Y: u32 = 16;

const FLOOR_DEPTH: f32 = 0.0;
const PATH_DEPTH: f32 = 5.0;
const CRATE_DEPTH: f32 = 10.0;
const OUTLINE_DEPTH: f32 = 20.0;

/// Registered texture bundles the scene draws with.
#[derive(Debug, Copy, Clone)]
pub struct SceneTextures {
    pub floor: TextureSetId,
    pub crates: TextureSetId,
}

pub struct Scene {
    floor: QuadBuffer,
    crates: QuadBuffer,
    paths: LineBuffer,
    outline: QuadBuffer,
    border: QuadBorder,

    hud: QuadBuffer,
    clock_bar: Quad,
    marker: QuadBuffer,
}

impl Scene {
    pub fn new() -> Result<Self, CapacityError> {
        let mut floor = QuadBuffer::new(TILES_X * TILES_Y);
        for ty in 0..TILES_Y {
            for tx in 0..TILES_X {
                let bl = Vec2::new(tx as f32 * TILE, ty as f32 * TILE);
                let q = floor.allocate()?;
                floor.slot_mut(q).set_vertices(bl, bl + Vec2::splat(TILE), FLOOR_DEPTH);
            }
        }

        let mut crates = QuadBuffer::new(8);
        for (x, y) in [(3, 4), (6, 9), (10, 5), (15, 10), (18, 3)] {
            let bl = Vec2::new(x as f32 * TILE, y as f32 * TILE);
            let q = crates.allocate()?;
            crates.slot_mut(q).set_vertices(bl, bl + Vec2::splat(TILE), CRATE_DEPTH);
        }
        // One crate knocked askew.
        let tilted = crates.allocate()?;
        let c = Vec2::new(12.0 * TILE, 12.0 * TILE);
        let corners = [
            c + Vec2::new(-10.0, -45.0),
            c + Vec2::new(-45.0, 10.0),
            c + Vec2::new(10.0, 45.0),
            c + Vec2::new(45.0, -10.0),
        ];
        crates.slot_mut(tilted).set_vertex_list(&corners, CRATE_DEPTH);

        let mut paths = LineBuffer::new(8);
        let waypoints = [(2.0, 2.0), (8.0, 2.5), (11.0, 8.0), (17.0, 8.5), (21.0, 13.0)];
        for pair in waypoints.windows(2) {
            let l = paths.allocate()?;
            let (a, b) = (Vec2::from(pair[0]) * TILE, Vec2::from(pair[1]) * TILE);
            paths
                .slot_mut(l)
                .set_endpoints(a, b, PATH_DEPTH)
                .set_colour(ColorRgba::rgb(0.9, 0.8, 0.3));
        }
        // Unfinished leg, hidden until the route is opened.
        let l = paths.allocate()?;
        paths
            .slot_mut(l)
            .set_endpoints(Vec2::new(21.0, 13.0) * TILE, Vec2::new(23.0, 15.0) * TILE, PATH_DEPTH)
            .disable();

        let mut outline = QuadBuffer::new(4);
        let border = QuadBorder::new(&mut outline, 3.0)?;
        let bl = Vec2::new(10.0 * TILE, 5.0 * TILE);
        border.set_vertices(&mut outline, bl, bl + Vec2::splat(TILE), OUTLINE_DEPTH);
        border.set_colour(&mut outline, ColorRgba::rgb(1.0, 0.85, 0.2));

        let mut hud = QuadBuffer::with_options(2, BufferOptions::ui());
        let panel = hud.allocate()?;
        hud.slot_mut(panel)
            .set_vertices(Vec2::new(16.0, 16.0), Vec2::new(232.0, 40.0), 0.0)
            .set_colour(ColorRgba::new(0.05, 0.05, 0.08, 0.75));
        let clock_bar = hud.allocate()?;

        let mut marker = QuadBuffer::with_options(1, BufferOptions::mouse_relative());
        let m = marker.allocate()?;
        let above = Vec2::new(10.5 * TILE, 6.0 * TILE + 12.0);
        marker
            .slot_mut(m)
            .set_vertices(above - Vec2::new(6.0, 0.0), above + Vec2::new(6.0, 12.0), 0.0)
            .set_colour(ColorRgba::rgb(1.0, 0.85, 0.2));

        log::info!(
            "scene built: {} floor tiles, {} crates, {} path segments",
            floor.live(),
            crates.live(),
            paths.live()
        );

        Ok(Self { floor, crates, paths, outline, border, hud, clock_bar, marker })
    }

    /// Populates the shadow-casting and ambient lights.
    pub fn light(lights: &mut LightSet) -> Result<(), CapacityError> {
        lights.enable_mouse_light(MouseLightConfig {
            colour: ColorRgba::rgb(1.0, 0.9, 0.7),
            ..MouseLightConfig::default()
        })?;

        lights.add_point(Vec2::new(5.0, 6.0) * TILE, 320.0, ColorRgba::rgb(1.0, 0.5, 0.2))?;
        lights.add_point(Vec2::new(16.0, 6.0) * TILE, 280.0, ColorRgba::rgb(0.3, 0.6, 1.0))?;
        lights.add_cone(
            Vec2::new(20.0, 12.0) * TILE,
            500.0,
            ColorRgba::rgb(0.9, 0.9, 0.6),
            Cone { direction: -2.4, width: 0.9 },
        )?;
        lights
            .add_soft(Vec2::new(12.0, 12.0) * TILE, 200.0, ColorRgba::rgb(0.4, 1.0, 0.5), 0.6)?
            .set_height(30.0);
        lights.add_ambient(
            Vec2::zero(),
            Vec2::new(TILES_X as f32, TILES_Y as f32) * TILE,
            ColorRgba::rgb(0.03, 0.03, 0.05),
        )?;
        Ok(())
    }

    /// Grows the HUD clock bar with the time of day.
    pub fn update_hud(&mut self, day: f32) {
        let width = 200.0 * day.clamp(0.0, 1.0);
        let (r, g) = if (0.25..0.75).contains(&day) { (1.0, 0.8) } else { (0.3, 0.4) };
        self.hud
            .slot_mut(self.clock_bar)
            .set_vertices(Vec2::new(24.0, 22.0), Vec2::new(24.0 + width.max(1.0), 34.0), 0.0)
            .set_colour(ColorRgba::rgb(r, g, 0.9));
    }

    /// Highlights whichever crate is selected by toggling the outline.
    pub fn set_outline_visible(&mut self, visible: bool) {
        if visible {
            self.border.enable(&mut self.outline);
        } else {
            self.border.disable(&mut self.outline);
        }
    }

    pub fn draw(
        &self,
        frame: &mut RenderContext,
        textures: Option<SceneTextures>,
    ) -> Result<(), FrameError> {
        frame.draw(&self.floor, textures.map(|t| t.floor))?;
        frame.draw(&self.paths, None)?;
        frame.draw(&self.crates, textures.map(|t| t.crates))?;
        frame.draw(&self.outline, None)?;
        frame.draw(&self.marker, None)?;
        Ok(())
    }

    /// Queues the screen-space HUD. Also valid after lighting.
    pub fn draw_hud(&self, frame: &mut RenderContext) -> Result<(), FrameError> {
        frame.draw(&self.hud, None)
    }
}
