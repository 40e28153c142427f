use core::fmt;

use thiserror::Error;

use crate::geometry::CapacityError;
use crate::shading::ShaderError;

/// Position within the per-frame sequence.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FramePhase {
    /// Before the first frame.
    Idle,
    /// Between `new_frame` and `end_frame`; scene draws allowed.
    Scene,
    /// After `end_frame`; waiting for the UI composite.
    Lit,
    /// After `draw_ui`; commands are complete.
    Composited,
}

impl fmt::Display for FramePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Scene => "scene",
            Self::Lit => "lit",
            Self::Composited => "composited",
        };
        f.write_str(s)
    }
}

/// Frame operation rejected. The frame is left unchanged.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum FrameError {
    #[error("`{op}` is not allowed in the {phase} phase")]
    OutOfOrder { op: &'static str, phase: FramePhase },

    #[error("{lights} shadow-casting lights exceed the {cells}-cell shadow atlas")]
    ShadowAtlas { lights: u32, cells: u32 },
}

/// Failure to set up a [`super::RenderContext`].
#[derive(Debug, Error)]
pub enum RenderContextError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Capacity(#[from] CapacityError),
}
