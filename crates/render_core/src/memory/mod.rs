//! GPU memory management
//!
//! Vertex storage for many meshes is sub-allocated out of one growable buffer
//! by the [`GeometryArena`]; vertex array handles are pooled by the
//! [`VaoAllocator`]. The backing buffer sits behind the [`GpuBuffer`] trait so
//! the arena can run against host memory in tests and tools.

mod arena;
mod buffer;
mod vao;

pub use arena::{Allocation, ArenaStats, FreeBlock, GeometryArena};
pub use buffer::{BufferId, GpuBuffer, HostBuffer};
pub use vao::VaoAllocator;
