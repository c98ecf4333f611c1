//! Vertex array handle pool
//!
//! Vertex array objects are interchangeable, so released handles are simply
//! kept for the next request instead of being destroyed.

/// Free-list pool of fungible handles
///
/// New handles come from the factory only when the pool is empty.
pub struct VaoAllocator<H, F>
where
    F: FnMut() -> H,
{
    free: Vec<H>,
    factory: F,
    created: usize,
}

impl<H, F> VaoAllocator<H, F>
where
    F: FnMut() -> H,
{
    /// Create an empty pool
    pub fn new(factory: F) -> Self {
        Self {
            free: Vec::new(),
            factory,
            created: 0,
        }
    }

    /// Create a pool with `count` handles made up front
    pub fn with_capacity(count: usize, factory: F) -> Self {
        let mut pool = Self::new(factory);
        pool.free.reserve(count);
        for _ in 0..count {
            let handle = (pool.factory)();
            pool.free.push(handle);
        }
        pool.created = count;
        pool
    }

    /// Take a handle from the pool, creating one if none are free
    pub fn request(&mut self) -> H {
        if let Some(handle) = self.free.pop() {
            return handle;
        }
        self.created += 1;
        log::trace!("Created vertex array handle #{}", self.created);
        (self.factory)()
    }

    /// Return a handle to the pool
    pub fn release(&mut self, handle: H) {
        self.free.push(handle);
    }

    /// Handles waiting in the pool
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Handles made by the factory so far
    pub fn created(&self) -> usize {
        self.created
    }
}

impl<H, F> std::fmt::Debug for VaoAllocator<H, F>
where
    F: FnMut() -> H,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaoAllocator")
            .field("available", &self.free.len())
            .field("created", &self.created)
            .finish()
    }
}
