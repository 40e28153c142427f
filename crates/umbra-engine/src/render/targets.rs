//! Offscreen render targets: the G-buffer and the shadow atlas.

use crate::config::ShadowConfig;

use super::RenderCtx;

pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub(super) const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// G-buffer attachment order; matches the geometry fragment outputs.
pub(super) const GBUFFER_LABELS: [&str; 4] = [
    "umbra gbuffer diffuse",
    "umbra gbuffer normal",
    "umbra gbuffer displacement",
    "umbra gbuffer occlusion",
];

/// Clear values per G-buffer attachment. Diffuse takes the configured clear
/// colour; normals clear to flat.
pub(super) fn gbuffer_clears(clear: wgpu::Color) -> [wgpu::Color; 4] {
    [
        clear,
        wgpu::Color { r: 0.5, g: 0.5, b: 1.0, a: 0.0 },
        wgpu::Color::TRANSPARENT,
        wgpu::Color::TRANSPARENT,
    ]
}

/// Screen-sized geometry targets, recreated when the viewport changes.
pub(super) struct GBuffer {
    pub extent: (u32, u32),
    pub colour: [wgpu::TextureView; 4],
    pub depth: wgpu::TextureView,
}

impl GBuffer {
    pub fn new(ctx: &RenderCtx<'_>, format: wgpu::TextureFormat) -> Self {
        let extent = ctx.extent();
        let colour = GBUFFER_LABELS.map(|label| ctx.render_target(label, extent, format));
        let depth = ctx.render_target("umbra gbuffer depth", extent, DEPTH_FORMAT);
        log::debug!("gbuffer allocated at {}x{}", extent.0, extent.1);
        Self { extent, colour, depth }
    }
}

/// One square cell per shadow-casting light.
pub(super) struct ShadowAtlas {
    pub config: ShadowConfig,
    pub view: wgpu::TextureView,
}

impl ShadowAtlas {
    pub fn new(ctx: &RenderCtx<'_>, config: &ShadowConfig) -> Self {
        let size = config.atlas_size();
        let view = ctx.render_target("umbra shadow atlas", size, SHADOW_FORMAT);
        log::debug!(
            "shadow atlas {}x{} ({} cells of {}px)",
            size.0,
            size.1,
            config.max_lights,
            config.cell_size
        );
        Self { config: config.clone(), view }
    }

    /// Viewport rectangle `(x, y, w, h)` of a light's cell.
    pub fn cell_rect(&self, shadow_index: u32) -> (f32, f32, f32, f32) {
        cell_rect(&self.config, shadow_index)
    }
}

pub(super) fn cell_rect(config: &ShadowConfig, shadow_index: u32) -> (f32, f32, f32, f32) {
    let (x, y) = config.cell_origin(shadow_index);
    let size = config.cell_size as f32;
    (x as f32, y as f32, size, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_tile_the_atlas_row_major() {
        let config = ShadowConfig { cell_size: 128, max_lights: 5, quads_per_light: 1 };
        assert_eq!(cell_rect(&config, 0), (0.0, 0.0, 128.0, 128.0));
        assert_eq!(cell_rect(&config, 2), (256.0, 0.0, 128.0, 128.0));
        assert_eq!(cell_rect(&config, 4), (128.0, 128.0, 128.0, 128.0));
    }

    #[test]
    fn normal_target_clears_flat() {
        let clears = gbuffer_clears(wgpu::Color::BLACK);
        assert_eq!(clears[1].b, 1.0);
        assert_eq!(clears[0], wgpu::Color::BLACK);
    }
}
