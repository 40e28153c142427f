use core::fmt;
use core::marker::PhantomData;
use core::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::coords::{ColorRgba, Vec2};

use super::{CapacityError, Lines, Primitive, Quads};

/// Identity of a geometry buffer, unique for the process lifetime.
///
/// The renderer keys its cached GPU index tables by this id.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BufferId(u32);

impl BufferId {
    fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Draw-routing flags fixed at buffer construction.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BufferOptions {
    /// Deferred to the UI composite instead of the geometry pass.
    pub ui: bool,
    /// Camera state is captured when the buffer is queued and restored for its
    /// deferred draw. Only meaningful together with `ui`.
    pub mouse_relative: bool,
}

impl BufferOptions {
    /// Scene geometry drawn in the geometry pass.
    pub const fn scene() -> Self {
        Self { ui: false, mouse_relative: false }
    }

    /// UI geometry drawn with the live camera at end of frame.
    pub const fn ui() -> Self {
        Self { ui: true, mouse_relative: false }
    }

    /// UI geometry drawn with the camera captured at queue time.
    pub const fn mouse_relative() -> Self {
        Self { ui: true, mouse_relative: true }
    }
}

/// Handle to one allocated slot.
///
/// A handle is a plain index; it does not borrow its buffer. Using a handle
/// after [`GeometryBuffer::delete`] writes into whatever now owns that slot.
pub struct Slot<P> {
    buffer: BufferId,
    index: u32,
    _kind: PhantomData<fn() -> P>,
}

/// Quad slot handle.
pub type Quad = Slot<Quads>;
/// Line slot handle.
pub type Line = Slot<Lines>;

impl<P> Slot<P> {
    #[inline]
    pub(crate) const fn new(buffer: BufferId, index: u32) -> Self {
        Self { buffer, index, _kind: PhantomData }
    }

    /// Stable slot index within the owning buffer.
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn buffer(self) -> BufferId {
        self.buffer
    }
}

impl<P> Clone for Slot<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for Slot<P> {}

impl<P> PartialEq for Slot<P> {
    fn eq(&self, other: &Self) -> bool {
        self.buffer == other.buffer && self.index == other.index
    }
}

impl<P> Eq for Slot<P> {}

impl<P> fmt::Debug for Slot<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("buffer", &self.buffer)
            .field("index", &self.index)
            .finish()
    }
}

/// Borrowed view of the drawn range `[0, high_water)` of a buffer's arrays.
#[derive(Debug, Copy, Clone)]
pub struct VertexStreams<'a> {
    pub positions: &'a [[f32; 3]],
    pub tex_coords: &'a [[f32; 2]],
    pub colours: &'a [[f32; 4]],
}

/// Fixed-capacity pool of primitive slots.
///
/// Storage is allocated once for `capacity` slots. Allocation pops the free
/// list (LIFO) or advances the high-water mark. Every draw covers
/// `[0, high_water)`, so disabled slots cost degenerate geometry on the GPU
/// but allocation stays O(1).
pub struct GeometryBuffer<P: Primitive> {
    id: BufferId,
    options: BufferOptions,
    capacity: u32,

    positions: Vec<[f32; 3]>,
    tex_coords: Vec<[f32; 2]>,
    colours: Vec<[f32; 4]>,

    /// Positions of disabled slots, restored by `enable`.
    hidden: Vec<[f32; 3]>,
    enabled: Vec<bool>,

    indices: Arc<[u32]>,

    free: Vec<u32>,
    high_water: u32,

    _kind: PhantomData<P>,
}

/// Pool of quad slots.
pub type QuadBuffer = GeometryBuffer<Quads>;
/// Pool of line slots.
pub type LineBuffer = GeometryBuffer<Lines>;

impl<P: Primitive> GeometryBuffer<P> {
    /// Creates a scene buffer with room for `capacity` primitives.
    pub fn new(capacity: u32) -> Self {
        Self::with_options(capacity, BufferOptions::scene())
    }

    pub fn with_options(capacity: u32, options: BufferOptions) -> Self {
        let vertices = capacity as usize * P::VERTICES;
        let per_slot = P::VERTICES as u32;

        let indices: Arc<[u32]> = (0..capacity)
            .flat_map(|slot| P::PATTERN.iter().map(move |i| slot * per_slot + i))
            .collect();

        Self {
            id: BufferId::next(),
            options,
            capacity,
            positions: vec![[0.0; 3]; vertices],
            tex_coords: vec![[0.0; 2]; vertices],
            colours: vec![[0.0; 4]; vertices],
            hidden: vec![[0.0; 3]; vertices],
            enabled: vec![false; capacity as usize],
            indices,
            free: Vec::new(),
            high_water: 0,
            _kind: PhantomData,
        }
    }

    /// Returns a free slot: the most recently deleted one if any, otherwise the
    /// next slot past the high-water mark.
    ///
    /// The slot starts enabled, collapsed at the origin, white, with full-texture
    /// coordinates.
    pub fn allocate(&mut self) -> Result<Slot<P>, CapacityError> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.high_water < self.capacity => {
                let index = self.high_water;
                self.high_water += 1;
                index
            }
            None => {
                log::error!(
                    "{} buffer {:?} exhausted at {} slots",
                    P::KIND,
                    self.id,
                    self.capacity
                );
                return Err(CapacityError::Slots { kind: P::KIND, capacity: self.capacity });
            }
        };

        self.reset_slot(index);
        Ok(Slot::new(self.id, index))
    }

    /// Hides the slot and returns it to the free list.
    ///
    /// The handle must not be used afterwards.
    pub fn delete(&mut self, slot: Slot<P>) {
        self.slot_mut(slot).disable();
        self.free.push(slot.index);
    }

    /// Mutable accessor for one slot.
    #[inline]
    pub fn slot_mut(&mut self, slot: Slot<P>) -> SlotMut<'_, P> {
        debug_assert_eq!(slot.buffer, self.id, "slot handle used with a foreign buffer");
        debug_assert!(slot.index < self.high_water, "slot handle past the high-water mark");
        SlotMut { buffer: self, index: slot.index }
    }

    /// Current (drawn) positions of a slot. All equal while disabled.
    pub fn vertices(&self, slot: Slot<P>) -> &[[f32; 3]] {
        &self.positions[span::<P>(slot.index)]
    }

    pub fn texture_coordinates(&self, slot: Slot<P>) -> &[[f32; 2]] {
        &self.tex_coords[span::<P>(slot.index)]
    }

    pub fn colours(&self, slot: Slot<P>) -> &[[f32; 4]] {
        &self.colours[span::<P>(slot.index)]
    }

    pub fn is_enabled(&self, slot: Slot<P>) -> bool {
        self.enabled[slot.index as usize]
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn options(&self) -> BufferOptions {
        self.options
    }

    #[inline]
    pub fn is_ui(&self) -> bool {
        self.options.ui
    }

    #[inline]
    pub fn is_mouse_relative(&self) -> bool {
        self.options.mouse_relative
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of slots ever handed out; bounds every draw call.
    #[inline]
    pub fn high_water(&self) -> u32 {
        self.high_water
    }

    /// Slots currently allocated (not on the free list).
    #[inline]
    pub fn live(&self) -> u32 {
        self.high_water - self.free.len() as u32
    }

    /// Static index table covering the full capacity.
    #[inline]
    pub fn index_table(&self) -> &Arc<[u32]> {
        &self.indices
    }

    /// Indices covered by a draw of `[0, high_water)`.
    #[inline]
    pub fn index_count(&self) -> u32 {
        self.high_water * P::PATTERN.len() as u32
    }

    /// Arrays for `[0, high_water)`, as read by the frame pipeline at draw time.
    pub fn streams(&self) -> VertexStreams<'_> {
        let end = self.high_water as usize * P::VERTICES;
        VertexStreams {
            positions: &self.positions[..end],
            tex_coords: &self.tex_coords[..end],
            colours: &self.colours[..end],
        }
    }

    fn reset_slot(&mut self, index: u32) {
        let range = span::<P>(index);
        self.enabled[index as usize] = true;
        self.positions[range.clone()].fill([0.0; 3]);
        self.hidden[range.clone()].fill([0.0; 3]);
        self.tex_coords[range.clone()].copy_from_slice(P::FULL_TEX_COORDS);
        self.colours[range].fill(ColorRgba::white().to_array());
    }
}

impl<P: Primitive> fmt::Debug for GeometryBuffer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeometryBuffer")
            .field("kind", &P::KIND)
            .field("id", &self.id)
            .field("options", &self.options)
            .field("capacity", &self.capacity)
            .field("high_water", &self.high_water)
            .field("free", &self.free.len())
            .finish_non_exhaustive()
    }
}

#[inline]
fn span<P: Primitive>(index: u32) -> Range<usize> {
    let start = index as usize * P::VERTICES;
    start..start + P::VERTICES
}

/// Mutable view of one slot.
///
/// Position writes to a disabled slot are kept aside and become visible on
/// [`enable`](Self::enable).
pub struct SlotMut<'a, P: Primitive> {
    buffer: &'a mut GeometryBuffer<P>,
    index: u32,
}

impl<P: Primitive> SlotMut<'_, P> {
    /// Writes one position per vertex, in the primitive's vertex order.
    pub fn set_vertex_list(&mut self, points: &[Vec2], depth: f32) -> &mut Self {
        debug_assert_eq!(points.len(), P::VERTICES);
        let range = span::<P>(self.index);
        let target = if self.is_enabled() {
            &mut self.buffer.positions[range]
        } else {
            &mut self.buffer.hidden[range]
        };
        for (dst, p) in target.iter_mut().zip(points) {
            *dst = p.extend(depth);
        }
        self
    }

    /// Writes one UV pair per vertex. Positions are untouched.
    pub fn set_texture_coordinates(&mut self, coords: &[[f32; 2]]) -> &mut Self {
        debug_assert_eq!(coords.len(), P::VERTICES);
        let range = span::<P>(self.index);
        for (dst, uv) in self.buffer.tex_coords[range].iter_mut().zip(coords) {
            *dst = *uv;
        }
        self
    }

    /// Same colour on every vertex.
    pub fn set_colour(&mut self, colour: ColorRgba) -> &mut Self {
        let range = span::<P>(self.index);
        self.buffer.colours[range].fill(colour.to_array());
        self
    }

    /// One colour per vertex.
    pub fn set_colours(&mut self, colours: &[ColorRgba]) -> &mut Self {
        debug_assert_eq!(colours.len(), P::VERTICES);
        let range = span::<P>(self.index);
        for (dst, c) in self.buffer.colours[range].iter_mut().zip(colours) {
            *dst = c.to_array();
        }
        self
    }

    /// Restores the positions saved by [`disable`](Self::disable). No-op when enabled.
    pub fn enable(&mut self) -> &mut Self {
        if self.is_enabled() {
            return self;
        }
        let range = span::<P>(self.index);
        let GeometryBuffer { positions, hidden, .. } = &mut *self.buffer;
        positions[range.clone()].copy_from_slice(&hidden[range]);
        self.buffer.enabled[self.index as usize] = true;
        self
    }

    /// Collapses every vertex to the origin so the slot rasterizes nothing.
    /// No-op when already disabled.
    pub fn disable(&mut self) -> &mut Self {
        if !self.is_enabled() {
            return self;
        }
        let range = span::<P>(self.index);
        let GeometryBuffer { positions, hidden, .. } = &mut *self.buffer;
        hidden[range.clone()].copy_from_slice(&positions[range.clone()]);
        positions[range].fill([0.0; 3]);
        self.buffer.enabled[self.index as usize] = false;
        self
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.buffer.enabled[self.index as usize]
    }
}

impl SlotMut<'_, Quads> {
    /// Axis-aligned quad from two corners.
    pub fn set_vertices(&mut self, bottom_left: Vec2, top_right: Vec2, depth: f32) -> &mut Self {
        self.set_vertex_list(
            &[
                bottom_left,
                Vec2::new(bottom_left.x, top_right.y),
                top_right,
                Vec2::new(top_right.x, bottom_left.y),
            ],
            depth,
        )
    }
}

impl SlotMut<'_, Lines> {
    pub fn set_endpoints(&mut self, start: Vec2, end: Vec2, depth: f32) -> &mut Self {
        self.set_vertex_list(&[start, end], depth)
    }
}
