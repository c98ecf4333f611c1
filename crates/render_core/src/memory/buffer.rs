//! Backing buffer abstraction

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_BUFFER_ID: AtomicU32 = AtomicU32::new(1);

/// Identifier of a backing buffer
///
/// Stays the same for the lifetime of the buffer, including across
/// reallocation, so allocation handles never go stale when the arena grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

impl BufferId {
    /// Allocate a process-unique id
    pub fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A linear GPU buffer that cannot be resized in place
///
/// Growing means reading the live bytes back, reallocating storage (which
/// discards the old contents) and uploading them again.
pub trait GpuBuffer {
    /// Buffer identifier
    fn id(&self) -> BufferId;

    /// Current storage size in bytes
    fn size(&self) -> usize;

    /// Copy `len` bytes from the start of the buffer
    fn read_back(&self, len: usize) -> Vec<u8>;

    /// Replace the storage with `size` zeroed bytes
    fn reallocate(&mut self, size: usize);

    /// Copy `data` into the buffer at `offset`
    fn upload(&mut self, offset: usize, data: &[u8]);
}

/// Host-memory [`GpuBuffer`]
#[derive(Debug, Clone)]
pub struct HostBuffer {
    id: BufferId,
    bytes: Vec<u8>,
    reallocations: usize,
}

impl HostBuffer {
    /// Create an empty buffer with a fresh id
    pub fn new() -> Self {
        Self {
            id: BufferId::next(),
            bytes: Vec::new(),
            reallocations: 0,
        }
    }

    /// Raw contents
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// How many times the storage has been replaced
    pub fn reallocations(&self) -> usize {
        self.reallocations
    }
}

impl Default for HostBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBuffer for HostBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn read_back(&self, len: usize) -> Vec<u8> {
        self.bytes[..len.min(self.bytes.len())].to_vec()
    }

    fn reallocate(&mut self, size: usize) {
        self.bytes = vec![0; size];
        self.reallocations += 1;
    }

    fn upload(&mut self, offset: usize, data: &[u8]) {
        let Some(dst) = offset
            .checked_add(data.len())
            .and_then(|end| self.bytes.get_mut(offset..end))
        else {
            log::error!(
                "Upload of {} bytes at offset {} exceeds buffer {} of {} bytes",
                data.len(),
                offset,
                self.id,
                self.bytes.len()
            );
            return;
        };
        dst.copy_from_slice(data);
    }
}
