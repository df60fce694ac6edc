//! Chunked Dynamic Array
//!
//! A growable sequence built from fixed-size chunks. Growth only ever appends
//! new chunks, so an element never moves once it has been pushed. References
//! and raw pointers into earlier chunks stay valid across later pushes.
//!
//! # Layout
//!
//! Every chunk is a `Vec<T>` allocated with exactly `elements_per_chunk`
//! capacity and never pushed past it, so the chunk's heap block is never
//! reallocated. The outer list of chunks may reallocate freely: that only
//! moves the chunk headers, not the elements they point to.
//!
//! # Example
//!
//! ```ignore
//! use brickyard::memory::ChunkedArray;
//!
//! let mut walls: ChunkedArray<u32> = ChunkedArray::new(16);
//! let index = walls.push_back(7);
//! assert_eq!(walls[index], 7);
//! ```

use std::ops::{Index, IndexMut};

/// Default chunk size used by [`ChunkedArray::default`].
pub const DEFAULT_ELEMENTS_PER_CHUNK: usize = 64;

// ============================================================================
// Chunked Array
// ============================================================================

/// A growable array of fixed-size chunks with stable element addresses.
///
/// | Operation        | Cost                 |
/// |------------------|----------------------|
/// | `push_back`      | O(1), one allocation per new chunk |
/// | index            | O(1)                 |
/// | `swap_remove`    | O(1)                 |
/// | `clear`          | O(n) drops, keeps every chunk |
#[derive(Debug)]
pub struct ChunkedArray<T> {
    chunks: Vec<Vec<T>>,
    elements_per_chunk: usize,
    count: usize,
}

impl<T> ChunkedArray<T> {
    /// Create an empty array. No chunk is allocated until the first push.
    ///
    /// # Panics
    ///
    /// Panics if `elements_per_chunk` is zero.
    #[must_use]
    pub fn new(elements_per_chunk: usize) -> Self {
        assert!(elements_per_chunk > 0, "chunk size must be non-zero");
        Self {
            chunks: Vec::new(),
            elements_per_chunk,
            count: 0,
        }
    }

    /// Create an array with room for at least `capacity` elements.
    #[must_use]
    pub fn with_capacity(elements_per_chunk: usize, capacity: usize) -> Self {
        let mut array = Self::new(elements_per_chunk);
        array.ensure_capacity(capacity);
        array
    }

    /// Number of live elements.
    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Whether the array holds no live elements.
    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Elements stored per chunk.
    #[must_use]
    #[inline]
    pub const fn elements_per_chunk(&self) -> usize {
        self.elements_per_chunk
    }

    /// Number of chunks allocated so far.
    #[must_use]
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Total element capacity across all allocated chunks.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.chunks.len() * self.elements_per_chunk
    }

    /// Append whole chunks until `capacity() >= capacity`.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        while self.capacity() < capacity {
            self.chunks.push(Vec::with_capacity(self.elements_per_chunk));
        }
    }

    /// Append a value and return its index.
    pub fn push_back(&mut self, value: T) -> usize {
        let index = self.count;
        self.ensure_capacity(index + 1);

        self.chunks[index / self.elements_per_chunk].push(value);

        self.count += 1;
        index
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        self.count -= 1;
        self.chunks[self.count / self.elements_per_chunk].pop()
    }

    /// Remove the element at `index` by moving the last element into its place.
    ///
    /// The element previously at `len() - 1` ends up at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn swap_remove(&mut self, index: usize) -> T {
        self.check_bounds(index);
        let Some(last) = self.pop() else {
            unreachable!("bounds check guarantees a last element");
        };
        if index == self.count {
            last
        } else {
            std::mem::replace(&mut self[index], last)
        }
    }

    /// Drop all elements. Chunks are kept for reuse.
    pub fn clear(&mut self) {
        for chunk in &mut self.chunks {
            chunk.clear();
        }
        self.count = 0;
    }

    /// Get an element, or `None` when out of bounds.
    #[must_use]
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.count {
            return None;
        }
        let (chunk, offset) = self.locate(index);
        self.chunks[chunk].get(offset)
    }

    /// Get an element mutably, or `None` when out of bounds.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.count {
            return None;
        }
        let (chunk, offset) = self.locate(index);
        self.chunks[chunk].get_mut(offset)
    }

    /// Last live element.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.count.checked_sub(1).and_then(|index| self.get(index))
    }

    /// Index of the first element matching `predicate`.
    pub fn position(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.iter().position(|value| predicate(value))
    }

    /// Iterate over live elements in index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.chunks.iter().flat_map(|chunk| chunk.iter())
    }

    /// Iterate mutably over live elements in index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.chunks.iter_mut().flat_map(|chunk| chunk.iter_mut())
    }

    /// Live elements grouped by chunk, as contiguous slices.
    pub fn chunks(&self) -> impl Iterator<Item = &[T]> {
        self.chunks
            .iter()
            .map(Vec::as_slice)
            .filter(|chunk| !chunk.is_empty())
    }

    #[inline]
    const fn locate(&self, index: usize) -> (usize, usize) {
        (
            index / self.elements_per_chunk,
            index % self.elements_per_chunk,
        )
    }

    #[inline]
    #[track_caller]
    fn check_bounds(&self, index: usize) {
        assert!(
            index < self.count,
            "chunked array index {index} out of bounds (len {})",
            self.count
        );
    }
}

impl<T: Copy> ChunkedArray<T> {
    /// Copy the live prefix into `out`, replacing its contents.
    pub fn copy_to(&self, out: &mut Vec<T>) {
        out.clear();
        out.reserve(self.count);
        for chunk in self.chunks() {
            out.extend_from_slice(chunk);
        }
    }
}

impl<T: Clone> Clone for ChunkedArray<T> {
    fn clone(&self) -> Self {
        // Vec::clone shrinks capacity to len, which would let a partial chunk reallocate
        let mut array = Self::with_capacity(self.elements_per_chunk, self.capacity());
        array.extend(self.iter().cloned());
        array
    }
}

impl<T> Default for ChunkedArray<T> {
    fn default() -> Self {
        Self::new(DEFAULT_ELEMENTS_PER_CHUNK)
    }
}

impl<T> Index<usize> for ChunkedArray<T> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        self.check_bounds(index);
        let (chunk, offset) = self.locate(index);
        &self.chunks[chunk][offset]
    }
}

impl<T> IndexMut<usize> for ChunkedArray<T> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.check_bounds(index);
        let (chunk, offset) = self.locate(index);
        &mut self.chunks[chunk][offset]
    }
}

impl<T> Extend<T> for ChunkedArray<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_index() {
        let mut array = ChunkedArray::new(4);
        for i in 0..10 {
            assert_eq!(array.push_back(i * 10), i);
        }

        assert_eq!(array.len(), 10);
        assert_eq!(array.chunk_count(), 3);
        assert_eq!(array[0], 0);
        assert_eq!(array[4], 40);
        assert_eq!(array[9], 90);
        assert!(array.get(10).is_none());
    }

    #[test]
    fn test_ensure_capacity_appends_whole_chunks() {
        let mut array: ChunkedArray<u8> = ChunkedArray::new(8);
        array.ensure_capacity(9);
        assert_eq!(array.chunk_count(), 2);
        assert_eq!(array.capacity(), 16);

        // Already satisfied, nothing added
        array.ensure_capacity(16);
        assert_eq!(array.chunk_count(), 2);
        assert!(array.is_empty());
    }

    #[test]
    fn test_pointer_stability_across_growth() {
        let mut array = ChunkedArray::new(2);
        array.push_back(String::from("first"));
        let first_ptr: *const String = &array[0];
        let first_data = array[0].as_ptr();

        for i in 0..100 {
            array.push_back(format!("wall {i}"));
        }

        assert_eq!(array.chunk_count(), 51);
        assert!(std::ptr::eq(first_ptr, &array[0]));
        assert_eq!(first_data, array[0].as_ptr());
        assert_eq!(array[0], "first");
    }

    #[test]
    fn test_swap_remove_moves_last_into_hole() {
        let mut array = ChunkedArray::new(3);
        array.extend([1, 2, 3, 4, 5]);

        assert_eq!(array.swap_remove(1), 2);
        assert_eq!(array.len(), 4);
        assert_eq!(array.iter().copied().collect::<Vec<_>>(), vec![1, 5, 3, 4]);

        // Removing the tail is a plain pop
        assert_eq!(array.swap_remove(3), 4);
        assert_eq!(array.iter().copied().collect::<Vec<_>>(), vec![1, 5, 3]);
    }

    #[test]
    fn test_clear_keeps_chunks() {
        let mut array = ChunkedArray::new(4);
        array.extend(0..12);
        assert_eq!(array.chunk_count(), 3);

        array.clear();
        assert!(array.is_empty());
        assert_eq!(array.chunk_count(), 3);

        array.extend(0..12);
        assert_eq!(array.chunk_count(), 3, "refill below high-water mark allocates nothing");
        assert_eq!(array[11], 11);
    }

    #[test]
    fn test_copy_to_copies_live_prefix_only() {
        let mut array = ChunkedArray::new(4);
        array.extend(0..6);
        array.pop();

        let mut out = vec![99; 32];
        array.copy_to(&mut out);
        assert_eq!(out, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_position() {
        let mut array = ChunkedArray::new(2);
        array.extend(["a", "b", "c"]);
        assert_eq!(array.position(|s| *s == "c"), Some(2));
        assert_eq!(array.position(|s| *s == "z"), None);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_out_of_bounds_index_panics() {
        let mut array = ChunkedArray::new(4);
        array.push_back(1);
        let _ = array[1];
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_index_past_len_within_capacity_panics() {
        let mut array: ChunkedArray<i32> = ChunkedArray::with_capacity(4, 4);
        array.push_back(1);
        array.clear();
        let _ = array[0];
    }
}
