use anyhow::{Context, Result};
use ouroboros::self_referencing;
use std::collections::HashMap;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::coords::{Vec2, Viewport};
use crate::core::{App, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::time::FrameClock;

/// Window settings.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Smallest size the window may be dragged to.
    pub min_size: Option<LogicalSize<f64>>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "umbra".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            min_size: Some(LogicalSize::new(320.0, 240.0)),
        }
    }
}

/// Requests an app can make from `on_frame`.
///
/// Buffered and applied once the callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    pub fn create_window(&mut self, config: RuntimeConfig) {
        self.commands.push(Command::CreateWindow(config));
    }

    pub fn close_window(&mut self, id: WindowId) {
        self.commands.push(Command::CloseWindow(id));
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }
}

enum Command {
    CreateWindow(RuntimeConfig),
    CloseWindow(WindowId),
    Exit,
}

/// Runs an [`App`] in a continuously redrawing game loop.
pub struct Runtime;

impl Runtime {
    /// Blocks until the last window closes or the app asks to exit.
    pub fn run<A>(initial: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut driver = Driver {
            initial,
            gpu_init,
            app,
            windows: HashMap::new(),
            exiting: false,
        };
        event_loop
            .run_app(&mut driver)
            .context("winit event loop terminated with error")?;

        log::info!("runtime stopped");
        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,
    /// Physical pixels, bottom-left origin.
    pointer: Option<Vec2>,
    /// Minimised or fully covered; frames are not drawn.
    hidden: bool,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct Driver<A: App + 'static> {
    initial: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,
    windows: HashMap<WindowId, WindowEntry>,
    exiting: bool,
}

impl<A: App + 'static> Driver<A> {
    fn open_window(&mut self, event_loop: &ActiveEventLoop, config: RuntimeConfig) -> Result<WindowId> {
        let mut attrs = Window::default_attributes()
            .with_title(config.title)
            .with_inner_size(config.initial_size);
        if let Some(min) = config.min_size {
            attrs = attrs.with_min_inner_size(min);
        }

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        let id = window.id();
        let gpu_init = self.gpu_init.clone();

        let entry = WindowEntryTryBuilder {
            clock: FrameClock::default(),
            pointer: None,
            hidden: false,
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        entry.with_window(|w| w.request_redraw());
        self.windows.insert(id, entry);
        log::info!("window {id:?} opened");
        Ok(id)
    }

    fn close_window(&mut self, id: WindowId) {
        if self.windows.remove(&id).is_some() {
            log::info!("window {id:?} closed");
        }
        if self.windows.is_empty() {
            self.exiting = true;
        }
    }

    fn resize(&mut self, id: WindowId, size: PhysicalSize<u32>) {
        let Some(entry) = self.windows.get_mut(&id) else { return };
        entry.with_gpu_mut(|gpu| gpu.resize(size));

        let minimised = size.width == 0 || size.height == 0;
        entry.with_hidden_mut(|hidden| *hidden = minimised);
        if !minimised {
            self.app
                .on_resize(id, Viewport::new(size.width as f32, size.height as f32));
        }
    }

    /// Ticks the window's clock and hands one frame to the app.
    fn redraw(&mut self, event_loop: &ActiveEventLoop, id: WindowId) {
        let mut runtime = RuntimeCtx::default();
        let app = &mut self.app;
        let Some(entry) = self.windows.get_mut(&id) else { return };
        if *entry.borrow_hidden() {
            return;
        }

        let control = entry.with_mut(|fields| {
            let mut ctx = FrameCtx {
                window: WindowCtx { id, window: fields.window },
                gpu: fields.gpu,
                pointer: *fields.pointer,
                time: fields.clock.tick(),
                runtime: &mut runtime,
            };
            app.on_frame(&mut ctx)
        });

        if control == AppControl::Exit {
            runtime.exit();
        }
        self.apply(event_loop, runtime);
    }

    fn apply(&mut self, event_loop: &ActiveEventLoop, mut runtime: RuntimeCtx) {
        for cmd in runtime.commands.drain(..) {
            match cmd {
                Command::CreateWindow(config) => {
                    if let Err(e) = self.open_window(event_loop, config) {
                        log::error!("failed to create window: {e:#}");
                    }
                }
                Command::CloseWindow(id) => self.close_window(id),
                Command::Exit => self.exiting = true,
            }
        }
    }
}

impl<A: App + 'static> ApplicationHandler for Driver<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.windows.is_empty() {
            return;
        }
        if let Err(e) = self.open_window(event_loop, self.initial.clone()) {
            log::error!("failed to create initial window: {e:#}");
            self.exiting = true;
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exiting {
            event_loop.exit();
            return;
        }
        for entry in self.windows.values() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(entry) = self.windows.get_mut(&id) else { return };
        entry.with_mut(|fields| track_pointer(fields.window, fields.pointer, &event));

        if self.app.on_window_event(id, &event) == AppControl::Exit {
            self.exiting = true;
        }

        match event {
            WindowEvent::CloseRequested => self.close_window(id),
            WindowEvent::Resized(size) => self.resize(id, size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.windows.get(&id).map(|e| e.with_window(|w| w.inner_size())) {
                    self.resize(id, size);
                }
            }
            WindowEvent::Occluded(occluded) => {
                if let Some(entry) = self.windows.get_mut(&id) {
                    entry.with_hidden_mut(|hidden| *hidden = occluded);
                    // The clock would otherwise report the whole hidden span as one frame.
                    entry.with_clock_mut(|clock| clock.reset());
                }
            }
            WindowEvent::RedrawRequested if !self.exiting => self.redraw(event_loop, id),
            _ => {}
        }

        if self.exiting {
            event_loop.exit();
        }
    }
}

/// Keeps the cursor position in physical pixels with a bottom-left origin.
fn track_pointer(window: &Window, pointer: &mut Option<Vec2>, event: &WindowEvent) {
    match event {
        WindowEvent::CursorMoved { position, .. } => {
            *pointer = Some(flip_y(*position, window.inner_size().height));
        }
        WindowEvent::CursorLeft { .. } => *pointer = None,
        _ => {}
    }
}

fn flip_y(position: PhysicalPosition<f64>, height: u32) -> Vec2 {
    Vec2::new(position.x as f32, height as f32 - position.y as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_origin_moves_to_bottom_left() {
        let p = flip_y(PhysicalPosition::new(10.0, 0.0), 600);
        assert_eq!(p, Vec2::new(10.0, 600.0));
        let p = flip_y(PhysicalPosition::new(0.0, 600.0), 600);
        assert_eq!(p, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn runtime_commands_are_buffered_in_order() {
        let mut ctx = RuntimeCtx::default();
        ctx.create_window(RuntimeConfig::default());
        ctx.exit();
        assert!(matches!(ctx.commands[0], Command::CreateWindow(_)));
        assert!(matches!(ctx.commands[1], Command::Exit));
    }
}
