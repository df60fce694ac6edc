//! Memory building blocks
//!
//! Chunked arrays with stable element addresses and a per-frame bump arena.

mod arena;
mod chunked;

pub use arena::{ARENA_ALIGN, FrameArena};
pub use chunked::{ChunkedArray, DEFAULT_ELEMENTS_PER_CHUNK};
