//! Texture bundles bound to the geometry and UI programs.

use wgpu::util::DeviceExt;

use super::{RenderCtx, TextureError};

/// Diffuse texture plus optional lighting maps for one sprite sheet.
///
/// Missing maps fall back to neutral 1×1 textures: a flat normal, no
/// occlusion and no displacement.
pub struct TextureSet {
    pub diffuse: wgpu::TextureView,
    pub normal: Option<wgpu::TextureView>,
    pub occlude: Option<wgpu::TextureView>,
    pub displace: Option<wgpu::TextureView>,
}

impl TextureSet {
    pub fn new(diffuse: wgpu::TextureView) -> Self {
        Self {
            diffuse,
            normal: None,
            occlude: None,
            displace: None,
        }
    }

    pub fn with_normal(mut self, normal: wgpu::TextureView) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn with_occlude(mut self, occlude: wgpu::TextureView) -> Self {
        self.occlude = Some(occlude);
        self
    }

    pub fn with_displace(mut self, displace: wgpu::TextureView) -> Self {
        self.displace = Some(displace);
        self
    }
}

// ── neutral maps ──────────────────────────────────────────────────────────

pub(super) const WHITE: [u8; 4] = [255, 255, 255, 255];
pub(super) const FLAT_NORMAL: [u8; 4] = [128, 128, 255, 255];
pub(super) const NO_OCCLUSION: [u8; 4] = [0, 0, 0, 0];
pub(super) const NO_DISPLACEMENT: [u8; 4] = [0, 0, 0, 255];

/// 1×1 stand-ins for absent maps.
pub(super) struct NeutralMaps {
    pub diffuse: wgpu::TextureView,
    pub normal: wgpu::TextureView,
    pub occlude: wgpu::TextureView,
    pub displace: wgpu::TextureView,
}

impl NeutralMaps {
    pub fn new(ctx: &RenderCtx<'_>) -> Self {
        let pixel = |label: &str, rgba: [u8; 4]| create_rgba8(ctx, label, 1, 1, &rgba);
        Self {
            diffuse: pixel("umbra neutral diffuse", WHITE),
            normal: pixel("umbra neutral normal", FLAT_NORMAL),
            occlude: pixel("umbra neutral occlude", NO_OCCLUSION),
            displace: pixel("umbra neutral displace", NO_DISPLACEMENT),
        }
    }
}

// ── upload ────────────────────────────────────────────────────────────────

/// Checks that `data` holds exactly `width * height` RGBA8 texels.
pub(super) fn check_rgba8(label: &str, width: u32, height: u32, data: &[u8]) -> Result<(), TextureError> {
    if width == 0 || height == 0 {
        return Err(TextureError::Empty { label: label.to_owned(), width, height });
    }
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(TextureError::Size {
            label: label.to_owned(),
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Creates a sampled RGBA8 texture from rows stored top first.
pub(super) fn create_rgba8(
    ctx: &RenderCtx<'_>,
    label: &str,
    width: u32,
    height: u32,
    data: &[u8],
) -> wgpu::TextureView {
    let texture = ctx.device.create_texture_with_data(
        ctx.queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        data,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_size_must_match_extent() {
        assert_eq!(check_rgba8("t", 2, 2, &[0; 16]), Ok(()));
        assert_eq!(
            check_rgba8("t", 2, 2, &[0; 12]),
            Err(TextureError::Size { label: "t".into(), expected: 16, actual: 12 })
        );
    }

    #[test]
    fn zero_extent_is_rejected() {
        assert!(matches!(check_rgba8("t", 0, 4, &[]), Err(TextureError::Empty { .. })));
    }

    #[test]
    fn flat_normal_points_out_of_the_screen() {
        let [x, y, z, _] = FLAT_NORMAL.map(|c| c as f32 / 255.0 * 2.0 - 1.0);
        assert!(x.abs() < 0.01 && y.abs() < 0.01);
        assert!(z > 0.99);
    }
}
