use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::coords::Viewport;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Game contract driven by [`crate::window::Runtime`].
///
/// Per window and frame the runtime delivers pending window events, then one
/// `on_frame` call that is expected to run the `RenderContext` sequence and
/// render it.
pub trait App {
    /// Called for window events, before the runtime's own handling.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called after the surface was reconfigured to `viewport` (physical px).
    fn on_resize(&mut self, window_id: WindowId, viewport: Viewport) {
        let _ = (window_id, viewport);
    }

    /// Called once per rendered frame per window.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
