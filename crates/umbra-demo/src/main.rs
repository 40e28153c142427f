//! Walkable lit scene exercising the umbra renderer.
//!
//! Controls: arrows pan, wheel zooms, `G` toggles lighting, `T` runs the
//! day cycle, `O` toggles the crate outline, `R` recentres, `Esc` quits.

mod scene;
mod textures;

use std::collections::HashSet;

use anyhow::{Context, Result};
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use umbra_engine::camera::View;
use umbra_engine::config::RendererConfig;
use umbra_engine::coords::{Vec2, Viewport};
use umbra_engine::core::{App, AppControl, FrameCtx};
use umbra_engine::device::GpuInit;
use umbra_engine::frame::{FrameError, Lighting, RenderContext};
use umbra_engine::lights::{LightSet, TimeOfDay};
use umbra_engine::logging::{init_logging, LoggingConfig};
use umbra_engine::render::{DeferredRenderer, RenderCtx, TextureSet};
use umbra_engine::window::{Runtime, RuntimeConfig};

use scene::{Scene, SceneTextures};
use textures::Image;

/// Pan speed in screen pixels per second.
const PAN_SPEED: f32 = 400.0;
/// Day cycles per second while the clock runs.
const DAY_SPEED: f32 = 1.0 / 60.0;
const ZOOM_RANGE: (f32, f32) = (0.25, 4.0);

struct Assets {
    renderer: DeferredRenderer,
    textures: SceneTextures,
}

struct Demo {
    frame: RenderContext,
    assets: Option<Assets>,
    scene: Scene,
    lights: LightSet,
    day: TimeOfDay,

    game_mode: bool,
    day_running: bool,
    outline: bool,
    held: HashSet<KeyCode>,
    /// World view, re-applied each frame since lighting resets the camera.
    view: View,
}

impl Demo {
    fn new() -> Result<Self> {
        let frame = RenderContext::new(RendererConfig::default(), 1280, 720)
            .context("failed to load shading programs")?;
        let mut lights = frame.new_light_set();
        Scene::light(&mut lights).context("scene lights exceed the shadow atlas")?;
        let scene = Scene::new().context("scene exceeds its buffers")?;

        Ok(Self {
            frame,
            assets: None,
            scene,
            lights,
            day: TimeOfDay::new(0.3),
            game_mode: true,
            day_running: false,
            outline: true,
            held: HashSet::new(),
            view: View::IDENTITY,
        })
    }

    fn on_key(&mut self, code: KeyCode) -> AppControl {
        match code {
            KeyCode::Escape => return AppControl::Exit,
            KeyCode::KeyG => {
                self.game_mode = !self.game_mode;
                log::info!("lighting {}", if self.game_mode { "on" } else { "off" });
            }
            KeyCode::KeyT => {
                self.day_running = !self.day_running;
                self.day.set_speed(if self.day_running { DAY_SPEED } else { 0.0 });
            }
            KeyCode::KeyO => {
                self.outline = !self.outline;
                self.scene.set_outline_visible(self.outline);
            }
            KeyCode::KeyR => self.view = View::IDENTITY,
            _ => {}
        }
        AppControl::Continue
    }

    fn pan(&mut self, dt: f32) {
        let mut dir = Vec2::zero();
        for (key, step) in [
            (KeyCode::ArrowLeft, Vec2::new(-1.0, 0.0)),
            (KeyCode::ArrowRight, Vec2::new(1.0, 0.0)),
            (KeyCode::ArrowDown, Vec2::new(0.0, -1.0)),
            (KeyCode::ArrowUp, Vec2::new(0.0, 1.0)),
        ] {
            if self.held.contains(&key) {
                dir += step;
            }
        }
        if dir != Vec2::zero() {
            // Screen-space speed regardless of zoom.
            self.view.translation += -dir * (PAN_SPEED * dt / self.view.scale.x);
        }
    }

    /// Records one frame into `self.frame`.
    fn record(&mut self, pointer: Option<Vec2>) -> Result<(), FrameError> {
        self.frame.new_frame()?;
        self.frame.set_camera(self.view);
        self.scene.draw(&mut self.frame, self.assets.as_ref().map(|a| a.textures))?;

        let lighting = if self.game_mode {
            let daylight = self.day.daylight();
            Some(Lighting {
                daylight,
                moonlight: (daylight.attenuation == 0.0).then(|| self.day.nightlight()),
                mouse: pointer,
                lights: &mut self.lights,
            })
        } else {
            None
        };
        self.frame.end_frame(lighting)?;

        self.frame.reset_camera();
        self.scene.draw_hud(&mut self.frame)?;
        self.frame.draw_ui()
    }
}

fn load_assets(rctx: &RenderCtx<'_>, frame: &RenderContext) -> Result<Assets> {
    let mut renderer = DeferredRenderer::new(rctx, frame).context("shading programs failed to compile")?;
    let upload = |label: &str, image: Image| {
        renderer.upload_rgba8(rctx, label, image.width, image.height, &image.rgba)
    };

    let floor = TextureSet::new(upload("floor diffuse", textures::floor_diffuse())?)
        .with_normal(upload("floor normal", textures::floor_normal())?);
    let crates = TextureSet::new(upload("crate diffuse", textures::crate_diffuse())?)
        .with_occlude(upload("crate occlusion", textures::crate_occlusion())?)
        .with_displace(upload("crate displacement", textures::crate_displacement())?);

    let textures = SceneTextures {
        floor: renderer.register_texture_set(rctx, &floor),
        crates: renderer.register_texture_set(rctx, &crates),
    };
    Ok(Assets { renderer, textures })
}

impl App for Demo {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return AppControl::Continue;
                };
                match event.state {
                    ElementState::Pressed => {
                        self.held.insert(code);
                        if !event.repeat {
                            return self.on_key(code);
                        }
                    }
                    ElementState::Released => {
                        self.held.remove(&code);
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                };
                let zoom = (self.view.scale.x * 1.1f32.powf(steps)).clamp(ZOOM_RANGE.0, ZOOM_RANGE.1);
                self.view.scale = Vec2::splat(zoom);
            }
            WindowEvent::Focused(false) => self.held.clear(),
            _ => {}
        }
        AppControl::Continue
    }

    fn on_resize(&mut self, _window_id: WindowId, viewport: Viewport) {
        let (w, h) = viewport.extent();
        self.frame.resize(w, h);
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.assets.is_none() {
            match load_assets(&ctx.render_ctx(), &self.frame) {
                Ok(assets) => self.assets = Some(assets),
                Err(err) => {
                    log::error!("failed to load demo assets: {err:#}");
                    return AppControl::Exit;
                }
            }
            let (w, h) = ctx.window.viewport().extent();
            self.frame.resize(w, h);
        }

        self.day.update(ctx.time.now);
        self.pan(ctx.time.dt);
        self.scene.update_hud(self.day.get());

        if let Err(err) = self.record(ctx.pointer) {
            log::error!("frame recording failed: {err}");
            return AppControl::Exit;
        }

        let Some(assets) = self.assets.as_mut() else {
            return AppControl::Continue;
        };
        let frame = &self.frame;
        ctx.render(|rctx, target| assets.renderer.render(rctx, target, frame))
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let demo = Demo::new()?;
    let config = RuntimeConfig {
        title: "umbra demo".into(),
        ..Default::default()
    };
    Runtime::run(config, GpuInit::default(), demo)
}
