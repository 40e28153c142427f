//! Renderer configuration.
//!
//! Plain data with sensible defaults. Construct with `..Default::default()`
//! and override what the deployment needs.

use crate::coords::ColorRgba;
use crate::shading::ShaderLibrary;

/// Shadow atlas and occluder buffer sizing.
///
/// Every shadow-casting light (including the mouse light) owns one square
/// cell of the atlas and one occluder block of the shadow quad buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowConfig {
    /// Cell edge in texels.
    pub cell_size: u32,
    /// Shadow-casting lights the atlas and occluder buffer can hold.
    pub max_lights: u32,
    /// Occluder quads per light block.
    pub quads_per_light: u32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            cell_size: 256,
            max_lights: 16,
            quads_per_light: 1,
        }
    }
}

impl ShadowConfig {
    /// Atlas grid as `[columns, rows]`; columns is `ceil(sqrt(max_lights))`.
    pub fn grid(&self) -> [u32; 2] {
        let n = self.max_lights.max(1);
        let mut cols = 1;
        while cols * cols < n {
            cols += 1;
        }
        [cols, n.div_ceil(cols)]
    }

    /// Atlas size in texels.
    pub fn atlas_size(&self) -> (u32, u32) {
        let [cols, rows] = self.grid();
        (cols * self.cell_size, rows * self.cell_size)
    }

    /// Top-left texel of a light's cell.
    pub fn cell_origin(&self, shadow_index: u32) -> (u32, u32) {
        let [cols, _] = self.grid();
        (
            (shadow_index % cols) * self.cell_size,
            (shadow_index / cols) * self.cell_size,
        )
    }
}

/// Renderer-wide settings.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Depth values are `z / z_max`; higher z draws in front.
    pub z_max: f32,
    /// Surface clear colour when no light pass runs.
    pub clear_colour: ColorRgba,
    /// Format of the four G-buffer colour targets.
    pub gbuffer_format: wgpu::TextureFormat,
    pub shadow: ShadowConfig,
    pub shaders: ShaderLibrary,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            z_max: 10_000.0,
            clear_colour: ColorRgba::black(),
            gbuffer_format: wgpu::TextureFormat::Rgba16Float,
            shadow: ShadowConfig::default(),
            shaders: ShaderLibrary::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_is_near_square() {
        let cfg = |n| ShadowConfig { max_lights: n, ..ShadowConfig::default() };
        assert_eq!(cfg(1).grid(), [1, 1]);
        assert_eq!(cfg(4).grid(), [2, 2]);
        assert_eq!(cfg(5).grid(), [3, 2]);
        assert_eq!(cfg(16).grid(), [4, 4]);
        assert_eq!(cfg(0).grid(), [1, 1]);
    }

    #[test]
    fn cell_origin_walks_rows() {
        let cfg = ShadowConfig { cell_size: 100, max_lights: 9, quads_per_light: 1 };
        assert_eq!(cfg.cell_origin(0), (0, 0));
        assert_eq!(cfg.cell_origin(2), (200, 0));
        assert_eq!(cfg.cell_origin(4), (100, 100));
        assert_eq!(cfg.atlas_size(), (300, 300));
    }
}
