use core::ops::Range;
use std::sync::Arc;

use crate::geometry::{BufferId, GeometryBuffer, Primitive, PrimitiveKind, VertexStreams};
use crate::shading::{DrawUniforms, ProgramKind};

/// Opaque handle to a registered texture bundle (diffuse + optional maps).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureSetId(pub(crate) u32);

/// Render pass kinds in frame order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PassKind {
    /// Scene sprites into the G-buffer, with depth.
    Geometry,
    /// Per-light visibility into the shadow atlas.
    Shadow,
    /// Additive light accumulation onto the surface.
    Light,
    /// Alpha-blended UI onto the surface. `clear` when no light pass ran.
    Ui { clear: bool },
}

/// One indexed draw.
#[derive(Debug, Clone)]
pub struct DrawCmd {
    pub program: ProgramKind,
    pub topology: PrimitiveKind,
    /// Source buffer; its index table is uploaded once per id.
    pub buffer: BufferId,
    pub indices: Arc<[u32]>,
    pub index_range: Range<u32>,
    /// Offset of the buffer's first vertex in the frame vertex streams.
    pub base_vertex: i32,
    /// Slot in [`FrameCommands::uniforms`].
    pub uniforms: u32,
    pub textures: Option<TextureSetId>,
    /// Shadow atlas cell the draw renders into.
    pub shadow_cell: Option<u32>,
}

impl DrawCmd {
    /// Draw of `[0, high_water)` of `buffer`.
    pub(crate) fn whole<P: Primitive>(program: ProgramKind, buffer: &GeometryBuffer<P>, base_vertex: i32) -> Self {
        Self {
            program,
            topology: P::KIND,
            buffer: buffer.id(),
            indices: Arc::clone(buffer.index_table()),
            index_range: 0..buffer.index_count(),
            base_vertex,
            uniforms: 0,
            textures: None,
            shadow_cell: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pass {
    pub kind: PassKind,
    pub draws: Vec<DrawCmd>,
}

/// Everything the GPU renderer needs for one frame.
///
/// Vertex data is copied out of the geometry buffers at draw time so later
/// mutations do not affect already-recorded draws.
#[derive(Debug, Default, Clone)]
pub struct FrameCommands {
    pub positions: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub colours: Vec<[f32; 4]>,
    pub uniforms: Vec<DrawUniforms>,
    pub passes: Vec<Pass>,
}

impl FrameCommands {
    pub fn clear(&mut self) {
        self.positions.clear();
        self.tex_coords.clear();
        self.colours.clear();
        self.uniforms.clear();
        self.passes.clear();
    }

    /// Appends vertex streams; returns their base vertex.
    pub(crate) fn push_streams(&mut self, streams: VertexStreams<'_>) -> i32 {
        let base = self.positions.len() as i32;
        self.positions.extend_from_slice(streams.positions);
        self.tex_coords.extend_from_slice(streams.tex_coords);
        self.colours.extend_from_slice(streams.colours);
        base
    }

    pub(crate) fn push_uniforms(&mut self, uniforms: DrawUniforms) -> u32 {
        self.uniforms.push(uniforms);
        (self.uniforms.len() - 1) as u32
    }

    pub(crate) fn begin_pass(&mut self, kind: PassKind) {
        self.passes.push(Pass { kind, draws: Vec::new() });
    }

    /// Adds to the most recently begun pass.
    pub(crate) fn record(&mut self, cmd: DrawCmd) {
        match self.passes.last_mut() {
            Some(pass) => pass.draws.push(cmd),
            None => log::warn!("draw recorded with no open pass; dropped"),
        }
    }

    pub fn pass(&self, kind: PassKind) -> Option<&Pass> {
        self.passes.iter().find(|p| p.kind == kind)
    }

    pub fn has_light_pass(&self) -> bool {
        self.passes.iter().any(|p| p.kind == PassKind::Light)
    }

    /// Every draw in pass order.
    pub fn draws(&self) -> impl Iterator<Item = &DrawCmd> {
        self.passes.iter().flat_map(|p| p.draws.iter())
    }

    /// Uniform snapshot a draw will see.
    pub fn uniforms_of(&self, cmd: &DrawCmd) -> &DrawUniforms {
        &self.uniforms[cmd.uniforms as usize]
    }
}
