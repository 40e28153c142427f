//! Bind-group layouts and per-(program, topology) render pipelines.

use std::collections::HashMap;

use crate::geometry::PrimitiveKind;
use crate::shading::{Attribute, DrawUniforms, ProgramKind, ProgramRegistry, ShaderError};

use super::targets::{DEPTH_FORMAT, SHADOW_FORMAT};
use super::RenderCtx;

// ── bind group layouts ────────────────────────────────────────────────────

/// Group 0 is the per-draw uniform block. Group 1 depends on the program:
/// texture maps for geometry/UI, G-buffer reads for shadow, G-buffer plus
/// shadow atlas for light.
pub(super) struct BindLayouts {
    pub uniforms: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub shadow: wgpu::BindGroupLayout,
    pub light: wgpu::BindGroupLayout,
}

impl BindLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniforms = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("umbra uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(DrawUniforms::SIZE),
                },
                count: None,
            }],
        });

        Self {
            uniforms,
            material: sampled_layout(device, "umbra material bgl", 4),
            shadow: sampled_layout(device, "umbra shadow bgl", 4),
            light: sampled_layout(device, "umbra light bgl", 5),
        }
    }

    pub fn group1(&self, kind: ProgramKind) -> &wgpu::BindGroupLayout {
        match kind {
            ProgramKind::Geometry | ProgramKind::Ui => &self.material,
            ProgramKind::Shadow => &self.shadow,
            ProgramKind::Light => &self.light,
        }
    }
}

/// Binding 0 sampler, bindings `1..=textures` filterable 2D textures.
fn sampled_layout(device: &wgpu::Device, label: &str, textures: u32) -> wgpu::BindGroupLayout {
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }];
    entries.extend((1..=textures).map(|binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }));
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

// ── pipelines ─────────────────────────────────────────────────────────────

/// A pipeline and the attribute streams bound to its vertex buffer slots,
/// in slot order.
pub(super) struct PipelineEntry {
    pub pipeline: wgpu::RenderPipeline,
    pub streams: Vec<Attribute>,
}

/// Shader modules compiled once, and lazily built pipelines invalidated when
/// the surface format changes.
#[derive(Default)]
pub(super) struct PipelineCache {
    surface_format: Option<wgpu::TextureFormat>,
    modules: HashMap<ProgramKind, wgpu::ShaderModule>,
    pipelines: HashMap<(ProgramKind, PrimitiveKind), PipelineEntry>,
}

impl PipelineCache {
    /// Creates one module per program, failing with the compiler's errors.
    pub fn compile(&mut self, device: &wgpu::Device, programs: &ProgramRegistry) -> Result<(), ShaderError> {
        for kind in ProgramKind::ALL {
            let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("umbra {kind} shader")),
                source: wgpu::ShaderSource::Wgsl(programs.source(kind).module_source().into()),
            });
            let info = pollster::block_on(module.get_compilation_info());
            let validation = pollster::block_on(scope.pop());

            if let Some(log) = compile_errors(&info).or_else(|| validation.map(|e| e.to_string())) {
                log::error!("{kind} shader failed to compile:\n{log}");
                return Err(ShaderError::Compile { program: kind, log });
            }
            log::debug!("compiled {kind} shader");
            self.modules.insert(kind, module);
        }
        Ok(())
    }

    pub fn ensure(
        &mut self,
        ctx: &RenderCtx<'_>,
        layouts: &BindLayouts,
        programs: &ProgramRegistry,
        gbuffer_format: wgpu::TextureFormat,
        key: (ProgramKind, PrimitiveKind),
    ) {
        if self.surface_format != Some(ctx.surface_format) {
            self.pipelines.clear();
            self.surface_format = Some(ctx.surface_format);
        }
        if self.pipelines.contains_key(&key) {
            return;
        }

        let (kind, topology) = key;
        let Some(module) = self.modules.get(&kind) else {
            log::error!("{kind} shader was never compiled; draws skipped");
            return;
        };

        let layout = programs.layout(kind);
        let streams: Vec<Attribute> = layout.attributes().map(|(a, _)| a).collect();
        let attrs: Vec<[wgpu::VertexAttribute; 1]> = layout
            .attributes()
            .map(|(a, location)| {
                [wgpu::VertexAttribute {
                    format: vertex_format(a),
                    offset: 0,
                    shader_location: location,
                }]
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = streams
            .iter()
            .zip(&attrs)
            .map(|(&a, attr)| wgpu::VertexBufferLayout {
                array_stride: stream_stride(a),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attr,
            })
            .collect();

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("umbra {kind} pipeline layout")),
            bind_group_layouts: &[&layouts.uniforms, layouts.group1(kind)],
            immediate_size: 0,
        });

        let targets = color_targets(kind, ctx.surface_format, gbuffer_format);
        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("umbra {kind} {topology} pipeline")),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &targets,
            }),

            primitive: wgpu::PrimitiveState {
                topology: primitive_topology(topology),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: (kind == ProgramKind::Geometry).then(|| wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::GreaterEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("built {kind} pipeline for {topology}");
        self.pipelines.insert(key, PipelineEntry { pipeline, streams });
    }

    pub fn get(&self, key: (ProgramKind, PrimitiveKind)) -> Option<&PipelineEntry> {
        self.pipelines.get(&key)
    }
}

/// Error messages of a compilation, one per line with `line:column` when known.
fn compile_errors(info: &wgpu::CompilationInfo) -> Option<String> {
    let errors: Vec<String> = info
        .messages
        .iter()
        .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
        .map(|m| match m.location {
            Some(at) => format!("{}:{}: {}", at.line_number, at.line_position, m.message),
            None => m.message.clone(),
        })
        .collect();
    (!errors.is_empty()).then(|| errors.join("\n"))
}

pub(super) fn vertex_format(attribute: Attribute) -> wgpu::VertexFormat {
    match attribute {
        Attribute::Position => wgpu::VertexFormat::Float32x3,
        Attribute::TexCoord => wgpu::VertexFormat::Float32x2,
        Attribute::Colour => wgpu::VertexFormat::Float32x4,
    }
}

pub(super) fn stream_stride(attribute: Attribute) -> u64 {
    vertex_format(attribute).size()
}

pub(super) fn primitive_topology(kind: PrimitiveKind) -> wgpu::PrimitiveTopology {
    match kind {
        PrimitiveKind::Quad => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveKind::Line => wgpu::PrimitiveTopology::LineList,
    }
}

fn additive_blend() -> wgpu::BlendState {
    let add = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState { color: add, alpha: add }
}

/// Colour targets per program: four blended G-buffer targets for geometry,
/// the atlas for shadow, additive surface for light, alpha-blended surface for UI.
pub(super) fn color_targets(
    kind: ProgramKind,
    surface: wgpu::TextureFormat,
    gbuffer: wgpu::TextureFormat,
) -> Vec<Option<wgpu::ColorTargetState>> {
    let target = |format, blend| {
        Some(wgpu::ColorTargetState {
            format,
            blend,
            write_mask: wgpu::ColorWrites::ALL,
        })
    };
    match kind {
        ProgramKind::Geometry => vec![target(gbuffer, Some(wgpu::BlendState::ALPHA_BLENDING)); 4],
        ProgramKind::Shadow => vec![target(SHADOW_FORMAT, None)],
        ProgramKind::Light => vec![target(surface, Some(additive_blend()))],
        ProgramKind::Ui => vec![target(surface, Some(wgpu::BlendState::ALPHA_BLENDING))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(message_type: wgpu::CompilationMessageType, line: u32, text: &str) -> wgpu::CompilationMessage {
        wgpu::CompilationMessage {
            message: text.to_owned(),
            message_type,
            location: Some(wgpu::SourceLocation { line_number: line, line_position: 5, offset: 0, length: 1 }),
        }
    }

    // ── compilation ───────────────────────────────────────────────────────

    #[test]
    fn compile_errors_keep_only_errors_with_positions() {
        use wgpu::CompilationMessageType as T;
        let info = wgpu::CompilationInfo {
            messages: vec![
                message(T::Warning, 3, "unused variable"),
                message(T::Error, 12, "unknown type `vec5`"),
                wgpu::CompilationMessage { message: "no entry point".into(), message_type: T::Error, location: None },
            ],
        };
        assert_eq!(compile_errors(&info).as_deref(), Some("12:5: unknown type `vec5`\nno entry point"));
    }

    #[test]
    fn warnings_alone_compile() {
        let info = wgpu::CompilationInfo {
            messages: vec![message(wgpu::CompilationMessageType::Warning, 1, "shadowed")],
        };
        assert_eq!(compile_errors(&info), None);
        assert_eq!(compile_errors(&wgpu::CompilationInfo { messages: vec![] }), None);
    }

    // ── layouts ───────────────────────────────────────────────────────────

    #[test]
    fn stream_strides_match_cpu_arrays() {
        assert_eq!(stream_stride(Attribute::Position), 12);
        assert_eq!(stream_stride(Attribute::TexCoord), 8);
        assert_eq!(stream_stride(Attribute::Colour), 16);
    }

    #[test]
    fn lines_use_line_list() {
        assert_eq!(primitive_topology(PrimitiveKind::Line), wgpu::PrimitiveTopology::LineList);
        assert_eq!(primitive_topology(PrimitiveKind::Quad), wgpu::PrimitiveTopology::TriangleList);
    }

    #[test]
    fn geometry_writes_four_gbuffer_targets() {
        let surface = wgpu::TextureFormat::Bgra8UnormSrgb;
        let gbuffer = wgpu::TextureFormat::Rgba16Float;
        let targets = color_targets(ProgramKind::Geometry, surface, gbuffer);
        assert_eq!(targets.len(), 4);
        assert!(targets.iter().flatten().all(|t| t.format == gbuffer));

        let light = color_targets(ProgramKind::Light, surface, gbuffer);
        assert_eq!(light[0].as_ref().map(|t| t.blend), Some(Some(additive_blend())));
    }
}
