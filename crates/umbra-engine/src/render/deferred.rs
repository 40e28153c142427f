use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::coords::ColorRgba;
use crate::frame::{DrawCmd, FrameCommands, FramePhase, Pass, PassKind, RenderContext, TextureSetId};
use crate::geometry::BufferId;
use crate::shading::{Attribute, DrawUniforms, ProgramKind, ShaderError};

use super::pipelines::{BindLayouts, PipelineCache};
use super::targets::{gbuffer_clears, GBuffer, ShadowAtlas};
use super::textures::{check_rgba8, create_rgba8, NeutralMaps};
use super::{RenderCtx, RenderTarget, TextureError, TextureSet};

/// Index tables unused for this many frames are released.
const INDEX_RETENTION_FRAMES: u64 = 600;

struct IndexEntry {
    buffer: wgpu::Buffer,
    last_used: u64,
}

/// Encodes a recorded [`RenderContext`] frame with wgpu.
///
/// Owns the G-buffer, shadow atlas, pipelines and every per-frame upload
/// arena. Shader modules are compiled up front; pipelines and targets are
/// created lazily. Arenas grow to the next power of two and never shrink.
pub struct DeferredRenderer {
    clear_colour: ColorRgba,
    gbuffer_format: wgpu::TextureFormat,

    layouts: BindLayouts,
    sampler: wgpu::Sampler,
    neutral: NeutralMaps,
    default_material: wgpu::BindGroup,
    texture_sets: Vec<wgpu::BindGroup>,

    pipelines: PipelineCache,

    gbuffer: Option<GBuffer>,
    atlas: ShadowAtlas,
    shadow_bind_group: Option<wgpu::BindGroup>,
    light_bind_group: Option<wgpu::BindGroup>,

    uniform_stride: u64,
    uniform_ubo: Option<wgpu::Buffer>,
    uniform_capacity: usize,
    uniform_bind_group: Option<wgpu::BindGroup>,

    streams: [Option<wgpu::Buffer>; 3],
    stream_capacity: usize,

    index_buffers: HashMap<BufferId, IndexEntry>,
    frame: u64,
}

impl DeferredRenderer {
    /// Compiles every program `frame` loaded; a WGSL error fails here.
    pub fn new(ctx: &RenderCtx<'_>, frame: &RenderContext) -> Result<Self, ShaderError> {
        let config = frame.config();
        let mut pipelines = PipelineCache::default();
        pipelines.compile(ctx.device, frame.programs())?;

        let layouts = BindLayouts::new(ctx.device);
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("umbra sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let neutral = NeutralMaps::new(ctx);
        let default_material = material_bind_group(
            ctx.device,
            &layouts.material,
            &sampler,
            [&neutral.diffuse, &neutral.normal, &neutral.occlude, &neutral.displace],
        );
        let atlas = ShadowAtlas::new(ctx, &config.shadow);
        let align = ctx.device.limits().min_uniform_buffer_offset_alignment as u64;

        Ok(Self {
            clear_colour: config.clear_colour,
            gbuffer_format: config.gbuffer_format,
            layouts,
            sampler,
            neutral,
            default_material,
            texture_sets: Vec::new(),
            pipelines,
            gbuffer: None,
            atlas,
            shadow_bind_group: None,
            light_bind_group: None,
            uniform_stride: align_up(DrawUniforms::SIZE, align),
            uniform_ubo: None,
            uniform_capacity: 0,
            uniform_bind_group: None,
            streams: [None, None, None],
            stream_capacity: 0,
            index_buffers: HashMap::new(),
            frame: 0,
        })
    }

    /// Registers a texture bundle for use with [`RenderContext::draw`].
    pub fn register_texture_set(&mut self, ctx: &RenderCtx<'_>, set: &TextureSet) -> TextureSetId {
        let n = &self.neutral;
        let bind_group = material_bind_group(
            ctx.device,
            &self.layouts.material,
            &self.sampler,
            [
                &set.diffuse,
                set.normal.as_ref().unwrap_or(&n.normal),
                set.occlude.as_ref().unwrap_or(&n.occlude),
                set.displace.as_ref().unwrap_or(&n.displace),
            ],
        );
        self.texture_sets.push(bind_group);
        let id = TextureSetId(self.texture_sets.len() as u32 - 1);
        log::debug!("registered texture set {}", id.0);
        id
    }

    /// Uploads raw RGBA8 texels, rows top first.
    pub fn upload_rgba8(
        &self,
        ctx: &RenderCtx<'_>,
        label: &str,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<wgpu::TextureView, TextureError> {
        check_rgba8(label, width, height, data)?;
        Ok(create_rgba8(ctx, label, width, height, data))
    }

    /// Encodes the frame recorded in `frame` into `target`.
    ///
    /// Frames that have not reached [`FramePhase::Composited`] are skipped.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, frame: &RenderContext) {
        if frame.phase() != FramePhase::Composited {
            log::warn!("render called in the {} phase; frame skipped", frame.phase());
            return;
        }
        let commands = frame.commands();
        self.frame += 1;

        // Mutating methods must happen before borrowing pipelines/buffers immutably.
        self.ensure_gbuffer(ctx);
        self.write_uniforms(ctx, &commands.uniforms);
        self.write_streams(ctx, commands);
        for cmd in commands.draws() {
            self.ensure_indices(ctx, cmd);
            self.pipelines.ensure(
                ctx,
                &self.layouts,
                frame.programs(),
                self.gbuffer_format,
                (cmd.program, cmd.topology),
            );
        }
        self.evict_indices();

        for pass in &commands.passes {
            self.encode_pass(target, pass);
        }
    }

    // ── encoding ──────────────────────────────────────────────────────────

    fn encode_pass(&self, target: &mut RenderTarget<'_>, pass: &Pass) {
        let Some(gbuffer) = self.gbuffer.as_ref() else { return };
        let clear = wgpu::Color::from(self.clear_colour);

        let (label, attachments, depth) = match pass.kind {
            PassKind::Geometry => {
                let clears = gbuffer_clears(clear);
                let attachments: Vec<_> = gbuffer
                    .colour
                    .iter()
                    .zip(clears)
                    .map(|(view, c)| colour_attachment(view, wgpu::LoadOp::Clear(c)))
                    .collect();
                let depth = wgpu::RenderPassDepthStencilAttachment {
                    view: &gbuffer.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                };
                ("umbra geometry pass", attachments, Some(depth))
            }
            PassKind::Shadow => (
                "umbra shadow pass",
                vec![colour_attachment(&self.atlas.view, wgpu::LoadOp::Clear(wgpu::Color::WHITE))],
                None,
            ),
            PassKind::Light => (
                "umbra light pass",
                vec![colour_attachment(target.surface_view, wgpu::LoadOp::Clear(clear))],
                None,
            ),
            PassKind::Ui { clear: true } => (
                "umbra ui pass",
                vec![colour_attachment(target.surface_view, wgpu::LoadOp::Clear(clear))],
                None,
            ),
            PassKind::Ui { clear: false } => (
                "umbra ui pass",
                vec![colour_attachment(target.surface_view, wgpu::LoadOp::Load)],
                None,
            ),
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &attachments,
            depth_stencil_attachment: depth,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for cmd in &pass.draws {
            let group1 = match cmd.program {
                ProgramKind::Shadow => self.shadow_bind_group.as_ref(),
                ProgramKind::Light => self.light_bind_group.as_ref(),
                _ => Some(self.material(cmd.textures)),
            };
            let Some(group1) = group1 else { continue };

            if let Some(cell) = cmd.shadow_cell {
                let (x, y, w, h) = self.atlas.cell_rect(cell);
                rpass.set_viewport(x, y, w, h, 0.0, 1.0);
            }
            self.draw(&mut rpass, cmd, group1);
        }
    }

    fn draw(&self, rpass: &mut wgpu::RenderPass<'_>, cmd: &DrawCmd, group1: &wgpu::BindGroup) {
        let Some(entry) = self.pipelines.get((cmd.program, cmd.topology)) else { return };
        let Some(uniforms) = self.uniform_bind_group.as_ref() else { return };
        let Some(indices) = self.index_buffers.get(&cmd.buffer) else { return };

        rpass.set_pipeline(&entry.pipeline);
        rpass.set_bind_group(0, uniforms, &[dynamic_offset(cmd.uniforms, self.uniform_stride)]);
        rpass.set_bind_group(1, group1, &[]);
        for (slot, &attribute) in entry.streams.iter().enumerate() {
            let Some(stream) = self.streams[attribute_slot(attribute)].as_ref() else { return };
            rpass.set_vertex_buffer(slot as u32, stream.slice(..));
        }
        rpass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(cmd.index_range.clone(), cmd.base_vertex, 0..1);
    }

    fn material(&self, textures: Option<TextureSetId>) -> &wgpu::BindGroup {
        textures
            .and_then(|id| self.texture_sets.get(id.0 as usize))
            .unwrap_or(&self.default_material)
    }

    // ── targets ───────────────────────────────────────────────────────────

    fn ensure_gbuffer(&mut self, ctx: &RenderCtx<'_>) {
        if let Some(g) = &self.gbuffer {
            if g.extent == ctx.extent() {
                return;
            }
        }
        let gbuffer = GBuffer::new(ctx, self.gbuffer_format);
        let [diffuse, normal, displacement, occlusion] = &gbuffer.colour;

        self.shadow_bind_group = Some(sampled_bind_group(
            ctx.device,
            "umbra shadow bind group",
            &self.layouts.shadow,
            &self.sampler,
            &[diffuse, normal, displacement, occlusion],
        ));
        self.light_bind_group = Some(sampled_bind_group(
            ctx.device,
            "umbra light bind group",
            &self.layouts.light,
            &self.sampler,
            &[diffuse, normal, displacement, occlusion, &self.atlas.view],
        ));
        self.gbuffer = Some(gbuffer);
    }

    // ── uploads ───────────────────────────────────────────────────────────

    fn write_uniforms(&mut self, ctx: &RenderCtx<'_>, uniforms: &[DrawUniforms]) {
        if uniforms.is_empty() {
            return;
        }
        if uniforms.len() > self.uniform_capacity || self.uniform_ubo.is_none() {
            let cap = uniforms.len().next_power_of_two().max(64);
            let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("umbra uniform arena"),
                size: cap as u64 * self.uniform_stride,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.uniform_bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("umbra uniform bind group"),
                layout: &self.layouts.uniforms,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &ubo,
                        offset: 0,
                        size: wgpu::BufferSize::new(DrawUniforms::SIZE),
                    }),
                }],
            }));
            self.uniform_ubo = Some(ubo);
            self.uniform_capacity = cap;
        }

        let Some(ubo) = self.uniform_ubo.as_ref() else { return };
        ctx.queue.write_buffer(ubo, 0, &pack_uniforms(uniforms, self.uniform_stride));
    }

    fn write_streams(&mut self, ctx: &RenderCtx<'_>, commands: &FrameCommands) {
        let vertices = commands.positions.len();
        if vertices == 0 {
            return;
        }
        if vertices > self.stream_capacity || self.streams.iter().any(Option::is_none) {
            let cap = vertices.next_power_of_two().max(64);
            for (attribute, label) in [
                (Attribute::Position, "umbra positions"),
                (Attribute::TexCoord, "umbra tex coords"),
                (Attribute::Colour, "umbra colours"),
            ] {
                self.streams[attribute_slot(attribute)] = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label),
                    size: cap as u64 * super::pipelines::stream_stride(attribute),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }));
            }
            self.stream_capacity = cap;
        }

        let [Some(p), Some(t), Some(c)] = &self.streams else { return };
        ctx.queue.write_buffer(p, 0, bytemuck::cast_slice(&commands.positions));
        ctx.queue.write_buffer(t, 0, bytemuck::cast_slice(&commands.tex_coords));
        ctx.queue.write_buffer(c, 0, bytemuck::cast_slice(&commands.colours));
    }

    /// Index tables are static per buffer; each is uploaded once.
    fn ensure_indices(&mut self, ctx: &RenderCtx<'_>, cmd: &DrawCmd) {
        let frame = self.frame;
        self.index_buffers
            .entry(cmd.buffer)
            .and_modify(|e| e.last_used = frame)
            .or_insert_with(|| IndexEntry {
                buffer: ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("umbra index table"),
                    contents: bytemuck::cast_slice(&cmd.indices[..]),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                last_used: frame,
            });
    }

    fn evict_indices(&mut self) {
        let frame = self.frame;
        let before = self.index_buffers.len();
        self.index_buffers
            .retain(|_, e| frame - e.last_used <= INDEX_RETENTION_FRAMES);
        let evicted = before - self.index_buffers.len();
        if evicted > 0 {
            log::trace!("released {evicted} idle index tables");
        }
    }
}

fn colour_attachment(
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
        depth_slice: None,
    })
}

fn material_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    maps: [&wgpu::TextureView; 4],
) -> wgpu::BindGroup {
    sampled_bind_group(device, "umbra material bind group", layout, sampler, &maps)
}

/// Sampler at binding 0, `views` from binding 1.
fn sampled_bind_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    views: &[&wgpu::TextureView],
) -> wgpu::BindGroup {
    let mut entries = vec![wgpu::BindGroupEntry {
        binding: 0,
        resource: wgpu::BindingResource::Sampler(sampler),
    }];
    entries.extend(views.iter().zip(1u32..).map(|(view, binding)| wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::TextureView(view),
    }));
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &entries,
    })
}

#[inline]
fn attribute_slot(attribute: Attribute) -> usize {
    match attribute {
        Attribute::Position => 0,
        Attribute::TexCoord => 1,
        Attribute::Colour => 2,
    }
}

pub(super) fn align_up(size: u64, align: u64) -> u64 {
    let align = align.max(1);
    size.div_ceil(align) * align
}

#[inline]
fn dynamic_offset(slot: u32, stride: u64) -> u32 {
    (slot as u64 * stride) as u32
}

/// Lays snapshots out at `stride`-byte intervals for dynamic offsets.
pub(super) fn pack_uniforms(uniforms: &[DrawUniforms], stride: u64) -> Vec<u8> {
    let stride = stride as usize;
    let mut bytes = vec![0u8; uniforms.len() * stride];
    for (chunk, u) in bytes.chunks_exact_mut(stride).zip(uniforms) {
        let src = bytemuck::bytes_of(u);
        chunk[..src.len()].copy_from_slice(src);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_rounds_to_alignment() {
        assert_eq!(align_up(DrawUniforms::SIZE, 256), 256);
        assert_eq!(align_up(DrawUniforms::SIZE, 16), DrawUniforms::SIZE);
        assert_eq!(align_up(10, 0), 10);
    }

    #[test]
    fn packed_uniforms_start_at_each_stride() {
        let a = DrawUniforms { translation: [1.0, 2.0], ..DrawUniforms::default() };
        let b = DrawUniforms { light_type: 4, ..DrawUniforms::default() };
        let bytes = pack_uniforms(&[a, b], 256);

        assert_eq!(bytes.len(), 512);
        let first: DrawUniforms = bytemuck::pod_read_unaligned(&bytes[..DrawUniforms::SIZE as usize]);
        let second: DrawUniforms = bytemuck::pod_read_unaligned(&bytes[256..256 + DrawUniforms::SIZE as usize]);
        assert_eq!(first.translation, [1.0, 2.0]);
        assert_eq!(second.light_type, 4);
        assert!(bytes[DrawUniforms::SIZE as usize..256].iter().all(|&b| b == 0));
    }

    #[test]
    fn dynamic_offsets_follow_slot() {
        assert_eq!(dynamic_offset(0, 256), 0);
        assert_eq!(dynamic_offset(3, 256), 768);
    }
}
