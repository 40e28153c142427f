use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

/// G-buffer colour targets the geometry pass writes at once.
const GBUFFER_TARGETS: u32 = 4;
/// Bytes per sample across all G-buffer targets (four `Rgba16Float`).
const GBUFFER_BYTES_PER_SAMPLE: u32 = GBUFFER_TARGETS * 8;
/// Uniforms, material or G-buffer inputs.
const BIND_GROUPS: u32 = 2;
/// Light pass samples four G-buffer textures and the shadow atlas.
const SAMPLED_TEXTURES: u32 = 5;

/// Device and surface preferences.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Backends to try. `WGPU_BACKEND` overrides this.
    pub backends: wgpu::Backends,

    pub power_preference: wgpu::PowerPreference,

    /// Prefer an sRGB surface format when available.
    ///
    /// Light accumulation is written in linear space and relies on the
    /// surface encoding to sRGB.
    pub prefer_srgb: bool,

    /// Falls back to FIFO when the surface does not offer it.
    pub present_mode: wgpu::PresentMode,

    /// Frames the CPU may queue ahead of presentation. A hint.
    pub max_frame_latency: u32,

    /// Checked against the renderer's own minimums before the device is requested.
    pub required_limits: wgpu::Limits,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            max_frame_latency: 2,
            required_limits: wgpu::Limits::default(),
        }
    }
}

/// Device, queue and the window surface they present to.
pub struct Gpu<'w> {
    /// Borrows the window for `'w`.
    surface: wgpu::Surface<'w>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    /// Physical pixels; may be 0×0 while minimised.
    size: PhysicalSize<u32>,
}

/// One acquired surface texture with an encoder to record into.
///
/// Present it with [`Gpu::submit`] promptly; the next frame cannot be
/// acquired while this one is alive.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

/// What the frame loop should do after [`Gpu::begin_frame`] failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; the next frame should succeed.
    Reconfigured,
    SkipFrame,
    /// Out of memory. Stop rendering.
    Fatal,
}

impl<'w> Gpu<'w> {
    /// Opens a device able to run the deferred renderer and configures the
    /// window surface for it.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let backends = wgpu::Backends::from_env().unwrap_or(init.backends);
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter can present to this window")?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?}, {:?})", info.name, info.backend, info.device_type);

        check_limits(&adapter.limits()).context("adapter cannot run the deferred renderer")?;
        check_limits(&init.required_limits).context("requested limits are below the renderer's")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("umbra device"),
                required_features: wgpu::Features::empty(),
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to open the wgpu device")?;

        let caps = surface.get_capabilities(&adapter);
        let format =
            choose_surface_format(&caps, init.prefer_srgb).context("surface offers no formats")?;
        let present_mode = choose_present_mode(&caps, init.present_mode);
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.max_frame_latency,
        };
        surface.configure(&device, &config);
        log::info!("surface: {format:?} {present_mode:?} {}x{}", size.width, size.height);

        Ok(Gpu { surface, adapter, device, queue, config, size })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Reconfigures the surface. A 0×0 size is recorded and configuration
    /// waits for a real size.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    pub fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("umbra frame encoder"),
            });

        Ok(GpuFrame { surface_texture, view, encoder })
    }

    /// Submits the frame's commands and presents it.
    pub fn submit(&self, frame: GpuFrame) {
        let GpuFrame { surface_texture, view, encoder } = frame;
        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
    }

    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        let action = surface_error_action(&err);
        if action == SurfaceErrorAction::Reconfigured && self.size.width > 0 && self.size.height > 0 {
            self.surface.configure(&self.device, &self.config);
        }
        action
    }
}

fn surface_error_action(err: &SurfaceError) -> SurfaceErrorAction {
    match err {
        SurfaceError::Lost | SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        SurfaceError::Timeout | SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

/// Fails when `limits` cannot hold the geometry pass or the light pass bindings.
fn check_limits(limits: &wgpu::Limits) -> Result<()> {
    anyhow::ensure!(
        limits.max_color_attachments >= GBUFFER_TARGETS,
        "{} colour attachments available, {GBUFFER_TARGETS} needed",
        limits.max_color_attachments
    );
    anyhow::ensure!(
        limits.max_color_attachment_bytes_per_sample >= GBUFFER_BYTES_PER_SAMPLE,
        "{} colour bytes per sample available, {GBUFFER_BYTES_PER_SAMPLE} needed",
        limits.max_color_attachment_bytes_per_sample
    );
    anyhow::ensure!(
        limits.max_bind_groups >= BIND_GROUPS,
        "{} bind groups available, {BIND_GROUPS} needed",
        limits.max_bind_groups
    );
    anyhow::ensure!(
        limits.max_sampled_textures_per_shader_stage >= SAMPLED_TEXTURES,
        "{} sampled textures per stage available, {SAMPLED_TEXTURES} needed",
        limits.max_sampled_textures_per_shader_stage
    );
    anyhow::ensure!(
        limits.max_dynamic_uniform_buffers_per_pipeline_layout >= 1,
        "dynamic uniform buffers are unavailable"
    );
    Ok(())
}

fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let first = caps.formats.first().copied()?;
    if !prefer_srgb {
        return Some(first);
    }
    let srgb = caps.formats.iter().copied().find(|f| f.is_srgb());
    Some(srgb.unwrap_or(first))
}

fn choose_present_mode(caps: &wgpu::SurfaceCapabilities, wanted: wgpu::PresentMode) -> wgpu::PresentMode {
    if caps.present_modes.contains(&wanted) {
        wanted
    } else {
        log::warn!("present mode {wanted:?} unsupported; using Fifo");
        wgpu::PresentMode::Fifo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat as F;

    fn caps(formats: &[F], modes: &[wgpu::PresentMode]) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats: formats.to_vec(),
            present_modes: modes.to_vec(),
            ..Default::default()
        }
    }

    // ── surface ───────────────────────────────────────────────────────────

    #[test]
    fn srgb_format_is_preferred() {
        let c = caps(&[F::Bgra8Unorm, F::Rgba8UnormSrgb], &[]);
        assert_eq!(choose_surface_format(&c, true), Some(F::Rgba8UnormSrgb));
        assert_eq!(choose_surface_format(&c, false), Some(F::Bgra8Unorm));
    }

    #[test]
    fn linear_only_surface_is_accepted() {
        let c = caps(&[F::Rgba16Float], &[]);
        assert_eq!(choose_surface_format(&c, true), Some(F::Rgba16Float));
        assert_eq!(choose_surface_format(&caps(&[], &[]), true), None);
    }

    #[test]
    fn unsupported_present_mode_falls_back_to_fifo() {
        use wgpu::PresentMode as P;
        let c = caps(&[], &[P::Fifo, P::Mailbox]);
        assert_eq!(choose_present_mode(&c, P::Mailbox), P::Mailbox);
        assert_eq!(choose_present_mode(&c, P::Immediate), P::Fifo);
    }

    #[test]
    fn surface_errors_map_to_actions() {
        assert_eq!(surface_error_action(&SurfaceError::Outdated), SurfaceErrorAction::Reconfigured);
        assert_eq!(surface_error_action(&SurfaceError::Timeout), SurfaceErrorAction::SkipFrame);
        assert_eq!(surface_error_action(&SurfaceError::OutOfMemory), SurfaceErrorAction::Fatal);
    }

    // ── limits ────────────────────────────────────────────────────────────

    #[test]
    fn default_limits_run_the_renderer() {
        assert!(check_limits(&wgpu::Limits::default()).is_ok());
        assert!(check_limits(&wgpu::Limits::downlevel_defaults()).is_ok());
    }

    #[test]
    fn too_few_colour_targets_are_rejected() {
        let limits = wgpu::Limits { max_color_attachments: 2, ..Default::default() };
        let err = check_limits(&limits).unwrap_err();
        assert!(err.to_string().contains("colour attachments"));
    }
}
