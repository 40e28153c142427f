/// Screen dimensions in physical pixels.
///
/// Pushed to every shading program as `screen_dimensions`; also sizes the
/// G-buffer and the directional light's full-screen quad.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Physical extent for render-target allocation, never below 1×1.
    #[inline]
    pub fn extent(self) -> (u32, u32) {
        (self.width.max(1.0) as u32, self.height.max(1.0) as u32)
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 2] {
        [self.width, self.height]
    }
}
