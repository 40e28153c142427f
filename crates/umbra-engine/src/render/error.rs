use thiserror::Error;

/// Raw texture upload rejected before reaching the GPU.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum TextureError {
    #[error("texture `{label}` has zero extent ({width}x{height})")]
    Empty { label: String, width: u32, height: u32 },
    #[error("texture `{label}` expects {expected} bytes of RGBA8, got {actual}")]
    Size { label: String, expected: usize, actual: usize },
}
