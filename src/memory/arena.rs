//! Frame arena
//!
//! A bump allocator for bulk per-frame data such as the staging copy of a
//! mesh's instance table before it is handed to the GPU. Individual
//! allocations are never freed; the whole arena is reset once per frame and
//! the backing storage is reused.

use bytemuck::{Pod, Zeroable};

/// Largest alignment the arena hands out.
pub const ARENA_ALIGN: usize = 16;

/// Backing storage unit. Keeps the base pointer 16-byte aligned.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Block([u8; ARENA_ALIGN]);

/// Bump allocator reset en masse.
#[derive(Debug)]
pub struct FrameArena {
    blocks: Vec<Block>,
    /// Bump offset in bytes.
    offset: usize,
    /// Largest offset reached since creation.
    high_water: usize,
    /// Number of times the backing storage had to grow.
    grow_count: u32,
}

impl FrameArena {
    /// Create an arena with `capacity_bytes` of backing storage (rounded up to 16).
    #[must_use]
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            blocks: vec![Block::zeroed(); capacity_bytes.div_ceil(ARENA_ALIGN)],
            offset: 0,
            high_water: 0,
            grow_count: 0,
        }
    }

    /// Allocate a zeroed slice of `len` values.
    ///
    /// The backing storage grows when the request does not fit. Earlier
    /// allocations from this frame are no longer borrowed at that point, so
    /// growing never invalidates live data.
    ///
    /// # Panics
    ///
    /// Panics if `T` needs an alignment above [`ARENA_ALIGN`].
    pub fn alloc_slice<T: Pod>(&mut self, len: usize) -> &mut [T] {
        let align = std::mem::align_of::<T>();
        assert!(align <= ARENA_ALIGN, "arena alignment limited to {ARENA_ALIGN}");

        let start = self.offset.next_multiple_of(align);
        let end = start + len * std::mem::size_of::<T>();
        if end > self.capacity() {
            self.grow(end);
        }

        self.offset = end;
        self.high_water = self.high_water.max(end);

        let bytes = &mut bytemuck::cast_slice_mut::<Block, u8>(&mut self.blocks)[start..end];
        bytes.fill(0);
        bytemuck::cast_slice_mut(bytes)
    }

    /// Release every allocation at once. Backing storage is kept.
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Bytes handed out since the last reset.
    #[must_use]
    #[inline]
    pub const fn used(&self) -> usize {
        self.offset
    }

    /// Size of the backing storage in bytes.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.blocks.len() * ARENA_ALIGN
    }

    /// Peak usage in bytes.
    #[must_use]
    #[inline]
    pub const fn high_water(&self) -> usize {
        self.high_water
    }

    /// How many times the arena outgrew its backing storage.
    #[must_use]
    #[inline]
    pub const fn grow_count(&self) -> u32 {
        self.grow_count
    }

    fn grow(&mut self, required_bytes: usize) {
        let new_capacity = required_bytes.max(self.capacity() * 2).max(ARENA_ALIGN);
        log::debug!(
            "frame arena growing from {} to {} bytes",
            self.capacity(),
            new_capacity
        );
        self.blocks
            .resize(new_capacity.div_ceil(ARENA_ALIGN), Block::zeroed());
        self.grow_count += 1;
    }
}

impl Default for FrameArena {
    fn default() -> Self {
        Self::new(64 * 1024)
    }
}
