//! 2D camera.
//!
//! The view is a translation followed by a per-axis scale:
//! `screen = (world + translation) * scale`. There is no rotation or skew.
//!
//! `Camera` only holds state. Pushing it into shading programs is done by
//! [`crate::frame::RenderContext`], which forwards every mutation to the bound
//! program.

use crate::coords::Vec2;

/// Translation + scale pair.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct View {
    pub translation: Vec2,
    pub scale: Vec2,
}

impl View {
    pub const IDENTITY: Self = Self {
        translation: Vec2 { x: 0.0, y: 0.0 },
        scale: Vec2 { x: 1.0, y: 1.0 },
    };

    #[inline]
    pub fn new(translation: Vec2, scale: Vec2) -> Self {
        Self { translation, scale }
    }

    /// World position to screen pixels (bottom-left origin).
    #[inline]
    pub fn to_screen(&self, world: Vec2) -> Vec2 {
        let p = world + self.translation;
        Vec2::new(p.x * self.scale.x, p.y * self.scale.y)
    }

    /// Screen pixels back to world position. Zero scale axes map to the translation origin.
    #[inline]
    pub fn to_world(&self, screen: Vec2) -> Vec2 {
        let inv = |v: f32, s: f32| if s == 0.0 { 0.0 } else { v / s };
        Vec2::new(inv(screen.x, self.scale.x), inv(screen.y, self.scale.y)) - self.translation
    }
}

impl Default for View {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Mutable view state.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Camera {
    view: View,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translation `(0, 0)`, scale `(1, 1)`.
    pub fn reset(&mut self) -> View {
        self.view = View::IDENTITY;
        self.view
    }

    /// Adds to the current translation.
    pub fn translate(&mut self, delta: Vec2) -> View {
        self.view.translation += delta;
        self.view
    }

    /// Replaces the scale. Not cumulative.
    pub fn scale(&mut self, scale: Vec2) -> View {
        self.view.scale = scale;
        self.view
    }

    /// Replaces the whole view.
    pub fn set(&mut self, view: View) -> View {
        self.view = view;
        self.view
    }

    #[inline]
    pub fn view(&self) -> View {
        self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_then_translate_yields_delta() {
        let mut cam = Camera::new();
        cam.translate(Vec2::new(5.0, 5.0));
        cam.reset();
        let v = cam.translate(Vec2::new(3.0, -2.0));
        assert_eq!(v.translation, Vec2::new(3.0, -2.0));
    }

    #[test]
    fn translate_accumulates() {
        let mut cam = Camera::new();
        cam.translate(Vec2::new(1.0, 1.0));
        cam.translate(Vec2::new(2.0, 3.0));
        assert_eq!(cam.view().translation, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn scale_is_absolute() {
        let mut cam = Camera::new();
        cam.scale(Vec2::new(2.0, 2.0));
        cam.scale(Vec2::new(0.5, 4.0));
        assert_eq!(cam.view().scale, Vec2::new(0.5, 4.0));
    }

    #[test]
    fn screen_world_round_trip() {
        let v = View::new(Vec2::new(-100.0, 50.0), Vec2::new(2.0, 2.0));
        let w = Vec2::new(130.0, 10.0);
        let s = v.to_screen(w);
        assert_eq!(s, Vec2::new(60.0, 120.0));
        assert_eq!(v.to_world(s), w);
    }
}
