//! Block-based geometry arena
//!
//! Sub-allocates fixed-stride vertex regions out of one growable backing
//! buffer. Space is handed out in whole blocks of `block_size` vertices.
//!
//! # Layout
//!
//! ```text
//! 0                                   final_offset          capacity
//! |  used  | free |   used   |  free  |  (never allocated)  |
//! ```
//!
//! Freed ranges go to an offset-sorted free list that is fully coalesced
//! after every free, so no two free blocks are ever byte-adjacent. New
//! allocations take the first free block large enough (splitting off the
//! remainder) and fall back to the high-water mark, growing the buffer when
//! the mark passes its capacity. Offsets never move, so growth invalidates
//! no outstanding [`Allocation`].

use bytemuck::Pod;

use crate::config::ArenaConfig;
use crate::memory::{BufferId, GpuBuffer, HostBuffer};
use crate::ArenaError;

/// Handle to a region of the arena
///
/// Owned by whoever allocated it and returned with [`GeometryArena::free`]
/// exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Allocation {
    /// Buffer the region lives in
    pub buffer_id: BufferId,
    /// Byte offset of the region
    pub offset: usize,
    /// Number of blocks in the region
    pub block_count: usize,
}

/// A free region of the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    /// Byte offset of the region
    pub offset: usize,
    /// Number of blocks in the region
    pub block_count: usize,
    /// Size of the region in bytes
    pub size_bytes: usize,
}

impl FreeBlock {
    /// One past the last byte of the region
    pub fn end(&self) -> usize {
        self.offset + self.size_bytes
    }
}

/// Arena occupancy snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaStats {
    /// Backing buffer size in bytes
    pub capacity_bytes: usize,
    /// Bytes below the high-water mark
    pub high_water_mark: usize,
    /// Bytes below the mark held by live allocations
    pub used_bytes: usize,
    /// Bytes below the mark on the free list
    pub free_bytes: usize,
    /// Entries on the free list
    pub free_block_count: usize,
}

/// Block allocator over a growable [`GpuBuffer`]
#[derive(Debug)]
pub struct GeometryArena<B: GpuBuffer = HostBuffer> {
    buffer: B,
    block_size: usize,
    stride_bytes: usize,
    block_bytes: usize,
    growth_bytes: usize,
    final_offset: usize,
    free_blocks: Vec<FreeBlock>,
}

impl<B: GpuBuffer> GeometryArena<B> {
    /// Create an arena over `buffer`
    ///
    /// The buffer is reallocated to one growth increment if it is smaller
    /// than that; its existing contents are not considered allocated.
    pub fn new(mut buffer: B, config: &ArenaConfig) -> Result<Self, ArenaError> {
        let invalid = ArenaError::InvalidLayout {
            block_size: config.block_size,
            stride_bytes: config.stride_bytes,
        };
        if config.block_size == 0 || config.stride_bytes == 0 {
            return Err(invalid);
        }
        if config.growth_blocks == 0 {
            return Err(ArenaError::ZeroGrowth);
        }
        let block_bytes = config.block_size.checked_mul(config.stride_bytes).ok_or(invalid)?;
        let growth_bytes = block_bytes
            .checked_mul(config.growth_blocks)
            .ok_or(ArenaError::CapacityOverflow {
                offset: 0,
                blocks: config.growth_blocks,
            })?;

        if buffer.size() < growth_bytes {
            buffer.reallocate(growth_bytes);
        }

        log::debug!(
            "Created geometry arena on buffer {}: {} vertices x {} bytes per block, {} bytes",
            buffer.id(),
            config.block_size,
            config.stride_bytes,
            buffer.size()
        );

        Ok(Self {
            buffer,
            block_size: config.block_size,
            stride_bytes: config.stride_bytes,
            block_bytes,
            growth_bytes,
            final_offset: 0,
            free_blocks: Vec::new(),
        })
    }

    /// Allocate room for `vertex_count` vertices
    ///
    /// A zero-vertex request yields a zero-block allocation that occupies
    /// nothing and whose release is a no-op.
    pub fn allocate(&mut self, vertex_count: usize) -> Result<Allocation, ArenaError> {
        let needed = vertex_count.div_ceil(self.block_size);
        if needed == 0 {
            return Ok(Allocation {
                buffer_id: self.buffer.id(),
                offset: self.final_offset,
                block_count: 0,
            });
        }

        if let Some(index) = self.free_blocks.iter().position(|b| b.block_count >= needed) {
            let block = &mut self.free_blocks[index];
            let offset = block.offset;
            let taken = needed * self.block_bytes;
            block.offset += taken;
            block.block_count -= needed;
            block.size_bytes -= taken;
            if block.block_count == 0 {
                self.free_blocks.remove(index);
            }

            log::debug!("Allocated {} blocks at offset {} from free list", needed, offset);
            return Ok(self.allocation(offset, needed));
        }

        let overflow = ArenaError::CapacityOverflow {
            offset: self.final_offset,
            blocks: needed,
        };
        let end = needed
            .checked_mul(self.block_bytes)
            .and_then(|bytes| self.final_offset.checked_add(bytes))
            .ok_or_else(|| overflow.clone())?;

        if end > self.buffer.size() {
            self.grow(end).ok_or(overflow)?;
        }

        let offset = self.final_offset;
        self.final_offset = end;
        log::debug!("Allocated {} blocks at offset {}", needed, offset);
        Ok(self.allocation(offset, needed))
    }

    /// Return an allocation's blocks to the free list
    ///
    /// Zero-block allocations and allocations from another buffer are
    /// ignored. A range that overlaps the free list (a double free) or lies
    /// past the high-water mark is rejected with a warning.
    pub fn free(&mut self, allocation: &Allocation) {
        if allocation.block_count == 0 || allocation.buffer_id != self.buffer.id() {
            return;
        }

        let Some(end) = allocation
            .block_count
            .checked_mul(self.block_bytes)
            .and_then(|bytes| allocation.offset.checked_add(bytes))
        else {
            log::warn!("Ignoring free of unaddressable allocation {:?}", allocation);
            return;
        };
        if end > self.final_offset || allocation.offset % self.block_bytes != 0 {
            log::warn!(
                "Ignoring free of {:?}: outside the allocated range of {} bytes",
                allocation,
                self.final_offset
            );
            return;
        }
        if self
            .free_blocks
            .iter()
            .any(|b| b.offset < end && allocation.offset < b.end())
        {
            log::warn!("Ignoring double free of {:?}", allocation);
            return;
        }

        self.free_blocks.push(FreeBlock {
            offset: allocation.offset,
            block_count: allocation.block_count,
            size_bytes: end - allocation.offset,
        });
        self.free_blocks.sort_by_key(|b| b.offset);
        self.coalesce();

        log::debug!(
            "Freed {} blocks at offset {} ({} free blocks)",
            allocation.block_count,
            allocation.offset,
            self.free_blocks.len()
        );
    }

    /// Upload vertex data to the start of an allocation
    pub fn write<T: Pod>(&mut self, allocation: &Allocation, vertices: &[T]) -> Result<(), ArenaError> {
        if allocation.buffer_id != self.buffer.id() {
            return Err(ArenaError::ForeignAllocation {
                expected: self.buffer.id().0,
                found: allocation.buffer_id.0,
            });
        }

        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let capacity = self.allocation_bytes(allocation);
        if bytes.len() > capacity {
            return Err(ArenaError::WriteOutOfBounds {
                bytes: bytes.len(),
                capacity,
            });
        }

        self.buffer.upload(allocation.offset, bytes);
        Ok(())
    }

    /// Index of an allocation's first vertex in the buffer
    pub fn first_vertex(&self, allocation: &Allocation) -> usize {
        allocation.offset / self.stride_bytes
    }

    /// Bytes covered by an allocation
    pub fn allocation_bytes(&self, allocation: &Allocation) -> usize {
        allocation.block_count.saturating_mul(self.block_bytes)
    }

    /// Vertices per block
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Bytes per vertex
    pub fn stride_bytes(&self) -> usize {
        self.stride_bytes
    }

    /// Backing buffer size in bytes
    pub fn capacity(&self) -> usize {
        self.buffer.size()
    }

    /// High-water mark in bytes
    pub fn final_offset(&self) -> usize {
        self.final_offset
    }

    /// The free list, sorted by offset
    pub fn free_blocks(&self) -> &[FreeBlock] {
        &self.free_blocks
    }

    /// The backing buffer
    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Occupancy snapshot
    pub fn stats(&self) -> ArenaStats {
        let free_bytes: usize = self.free_blocks.iter().map(|b| b.size_bytes).sum();
        ArenaStats {
            capacity_bytes: self.buffer.size(),
            high_water_mark: self.final_offset,
            used_bytes: self.final_offset - free_bytes,
            free_bytes,
            free_block_count: self.free_blocks.len(),
        }
    }

    /// Per-block occupancy up to the high-water mark, `true` for used
    pub fn block_map(&self) -> Vec<bool> {
        let mut map = vec![true; self.final_offset / self.block_bytes];
        for block in &self.free_blocks {
            let first = block.offset / self.block_bytes;
            map[first..first + block.block_count].fill(false);
        }
        map
    }

    fn allocation(&self, offset: usize, block_count: usize) -> Allocation {
        Allocation {
            buffer_id: self.buffer.id(),
            offset,
            block_count,
        }
    }

    /// Merge byte-adjacent neighbours in one forward pass over the sorted list
    fn coalesce(&mut self) {
        let blocks = std::mem::take(&mut self.free_blocks);
        let mut merged: Vec<FreeBlock> = Vec::with_capacity(blocks.len());

        for block in blocks {
            match merged.last_mut() {
                Some(prev) if prev.end() == block.offset => {
                    log::trace!(
                        "Merging free block at {} into block at {}",
                        block.offset,
                        prev.offset
                    );
                    prev.block_count += block.block_count;
                    prev.size_bytes += block.size_bytes;
                }
                _ => merged.push(block),
            }
        }

        self.free_blocks = merged;
    }

    /// Grow the buffer in whole increments until it holds `required` bytes,
    /// preserving everything below the high-water mark
    fn grow(&mut self, required: usize) -> Option<()> {
        let current = self.buffer.size();
        let increments = (required - current).div_ceil(self.growth_bytes);
        let new_size = increments
            .checked_mul(self.growth_bytes)
            .and_then(|extra| current.checked_add(extra))?;

        let preserved = self.buffer.read_back(self.final_offset);
        self.buffer.reallocate(new_size);
        self.buffer.upload(0, &preserved);

        log::info!(
            "Grew geometry buffer {} from {} to {} bytes",
            self.buffer.id(),
            current,
            new_size
        );
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10 vertices of 4 bytes per block, growing 2 blocks at a time
    fn arena() -> GeometryArena {
        let config = ArenaConfig {
            block_size: 10,
            stride_bytes: 4,
            growth_blocks: 2,
        };
        GeometryArena::new(HostBuffer::new(), &config).unwrap()
    }

    /// A = 25 verts (3 blocks), B = 5 verts (1 block), C = 10 verts (1 block)
    fn abc(arena: &mut GeometryArena) -> (Allocation, Allocation, Allocation) {
        let a = arena.allocate(25).unwrap();
        let b = arena.allocate(5).unwrap();
        let c = arena.allocate(10).unwrap();
        (a, b, c)
    }

    #[test]
    fn test_allocations_are_contiguous() {
        let mut arena = arena();
        let (a, b, c) = abc(&mut arena);

        assert_eq!((a.offset, a.block_count), (0, 3));
        assert_eq!((b.offset, b.block_count), (120, 1));
        assert_eq!((c.offset, c.block_count), (160, 1));
        assert_eq!(arena.final_offset(), 200);
    }

    #[test]
    fn test_free_b_then_a_coalesces() {
        let mut arena = arena();
        let (a, b, _c) = abc(&mut arena);

        arena.free(&b);
        arena.free(&a);

        assert_eq!(
            arena.free_blocks(),
            &[FreeBlock {
                offset: 0,
                block_count: 4,
                size_bytes: 160
            }]
        );
    }

    #[test]
    fn test_free_a_then_b_coalesces() {
        let mut arena = arena();
        let (a, b, _c) = abc(&mut arena);

        arena.free(&a);
        arena.free(&b);

        assert_eq!(arena.free_blocks().len(), 1);
        assert_eq!(arena.free_blocks()[0].block_count, 4);
    }

    #[test]
    fn test_free_between_two_free_blocks_merges_both_sides() {
        let mut arena = arena();
        let (a, b, c) = abc(&mut arena);

        arena.free(&a);
        arena.free(&c);
        assert_eq!(arena.free_blocks().len(), 2);

        arena.free(&b);
        assert_eq!(
            arena.free_blocks(),
            &[FreeBlock {
                offset: 0,
                block_count: 5,
                size_bytes: 200
            }]
        );
    }

    #[test]
    fn test_non_adjacent_frees_stay_separate() {
        let mut arena = arena();
        let (a, _b, c) = abc(&mut arena);

        arena.free(&c);
        arena.free(&a);

        let offsets: Vec<usize> = arena.free_blocks().iter().map(|b| b.offset).collect();
        assert_eq!(offsets, vec![0, 160]);
    }

    #[test]
    fn test_first_fit_splits_and_drops_empty_blocks() {
        let mut arena = arena();
        let (a, _b, _c) = abc(&mut arena);
        arena.free(&a);

        let first = arena.allocate(10).unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(
            arena.free_blocks(),
            &[FreeBlock {
                offset: 40,
                block_count: 2,
                size_bytes: 80
            }]
        );

        let second = arena.allocate(20).unwrap();
        assert_eq!(second.offset, 40);
        assert!(arena.free_blocks().is_empty());
        assert_eq!(arena.final_offset(), 200);
    }

    #[test]
    fn test_too_large_request_skips_free_list() {
        let mut arena = arena();
        let (_a, b, _c) = abc(&mut arena);
        arena.free(&b);

        let big = arena.allocate(30).unwrap();
        assert_eq!(big.offset, 200);
        assert_eq!(arena.free_blocks().len(), 1);
    }

    #[test]
    fn test_growth_preserves_bytes() {
        let mut arena = arena();
        assert_eq!(arena.capacity(), 80);

        let a = arena.allocate(15).unwrap();
        let vertices: Vec<u32> = (0..15).collect();
        arena.write(&a, &vertices).unwrap();
        let before = arena.buffer().bytes()[..arena.final_offset()].to_vec();

        let b = arena.allocate(50).unwrap();
        assert_eq!(b.offset, 80);
        assert_eq!(arena.capacity(), 320);
        assert!(arena.capacity() >= arena.final_offset());
        assert_eq!(&arena.buffer().bytes()[..before.len()], before.as_slice());
        assert_eq!(arena.buffer().reallocations(), 2);
    }

    #[test]
    fn test_zero_and_foreign_frees_are_ignored() {
        let mut arena = arena();
        let (a, _b, _c) = abc(&mut arena);

        let zero = arena.allocate(0).unwrap();
        assert_eq!(zero.block_count, 0);
        arena.free(&zero);

        let foreign = Allocation {
            buffer_id: BufferId(u32::MAX),
            ..a
        };
        arena.free(&foreign);

        assert!(arena.free_blocks().is_empty());
        assert_eq!(arena.final_offset(), 200);
    }

    #[test]
    fn test_double_free_is_rejected() {
        let mut arena = arena();
        let (a, b, _c) = abc(&mut arena);

        arena.free(&a);
        arena.free(&b);
        arena.free(&b);
        arena.free(&a);

        assert_eq!(arena.free_blocks().len(), 1);
        assert_eq!(arena.stats().free_bytes, 160);
    }

    #[test]
    fn test_free_past_high_water_mark_is_rejected() {
        let mut arena = arena();
        let a = arena.allocate(10).unwrap();
        let beyond = Allocation { offset: 400, ..a };

        arena.free(&beyond);
        assert!(arena.free_blocks().is_empty());
    }

    #[test]
    fn test_write_bounds() {
        let mut arena = arena();
        let a = arena.allocate(5).unwrap();

        assert!(arena.write(&a, &[1.0_f32; 10]).is_ok());
        assert_eq!(
            arena.write(&a, &[1.0_f32; 11]),
            Err(ArenaError::WriteOutOfBounds {
                bytes: 44,
                capacity: 40
            })
        );

        let foreign = Allocation {
            buffer_id: BufferId(u32::MAX),
            ..a
        };
        assert!(matches!(
            arena.write(&foreign, &[0_u32]),
            Err(ArenaError::ForeignAllocation { .. })
        ));
    }

    #[test]
    fn test_stats_and_block_map() {
        let mut arena = arena();
        let (_a, b, _c) = abc(&mut arena);
        arena.free(&b);

        let stats = arena.stats();
        assert_eq!(stats.high_water_mark, 200);
        assert_eq!(stats.free_bytes, 40);
        assert_eq!(stats.used_bytes, 160);
        assert_eq!(stats.free_block_count, 1);

        assert_eq!(arena.block_map(), vec![true, true, true, false, true]);
    }

    #[test]
    fn test_first_vertex() {
        let mut arena = arena();
        let (_a, b, _c) = abc(&mut arena);
        assert_eq!(arena.first_vertex(&b), 30);
    }

    #[test]
    fn test_invalid_layout() {
        let config = ArenaConfig {
            block_size: 0,
            ..ArenaConfig::default()
        };
        assert!(matches!(
            GeometryArena::new(HostBuffer::new(), &config),
            Err(ArenaError::InvalidLayout { .. })
        ));
    }

    #[test]
    fn test_zero_growth_rejected() {
        let config = ArenaConfig {
            growth_blocks: 0,
            ..ArenaConfig::default()
        };
        assert_eq!(
            GeometryArena::new(HostBuffer::new(), &config).err(),
            Some(ArenaError::ZeroGrowth)
        );
    }
}
