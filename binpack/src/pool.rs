//! Free lists of reusable encoders and decoders.
use parking_lot::Mutex;

/// Bounded, thread-safe free list.
///
/// Every checked-out item is owned exclusively by its caller until it is put back. Items
/// returned while the pool is full are dropped.
#[derive(Debug)]
pub(crate) struct Pool<T> {
    idle: Mutex<Vec<T>>,
    capacity: usize,
}

impl<T> Pool<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Take an idle item, or build one with `init` if none is available.
    #[inline]
    pub(crate) fn get(&self, init: impl FnOnce() -> T) -> T {
        let item = self.idle.lock().pop();
        item.unwrap_or_else(init)
    }

    #[inline]
    pub(crate) fn put(&self, item: T) {
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(item);
        }
    }

    pub(crate) fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}
