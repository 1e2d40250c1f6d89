//! Growable contiguous buffer with a fixed geometric growth policy.
//!
//! `Vec` alone leaves the growth factor to the standard library. The chunk
//! tables need deterministic capacities (8, 16, 32, …) so the buffer reserves
//! exactly what [`grow_capacity`] asks for and nothing more.

use core::ops::Deref;

/// Smallest non-zero capacity handed out by [`grow_capacity`].
pub const MIN_CAPACITY: usize = 8;

/// Next capacity for a buffer that is full at `old`.
pub const fn grow_capacity(old: usize) -> usize {
    if old < MIN_CAPACITY {
        MIN_CAPACITY
    } else {
        old.saturating_mul(2)
    }
}

/// Append-only buffer: `len() <= capacity()`, never shrinks on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowBuf<T> {
    items: Vec<T>,
}

impl<T> Default for GrowBuf<T> {
    fn default() -> Self { Self::new() }
}

impl<T> GrowBuf<T> {
    /// Empty buffer, no allocation.
    pub const fn new() -> Self { Self { items: Vec::new() } }

    /// Logical length.
    pub fn len(&self) -> usize { self.items.len() }

    /// Whether nothing was appended yet.
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Allocated capacity.
    pub fn capacity(&self) -> usize { self.items.capacity() }

    /// Append one item, growing the storage first when it is full.
    ///
    /// Allocation failure aborts the process.
    pub fn push(&mut self, item: T) {
        let cap = self.items.capacity();
        if self.items.len() == cap {
            self.items.reserve_exact(grow_capacity(cap) - cap);
        }
        self.items.push(item);
    }

    /// Drop the storage and return to the empty, unallocated state.
    pub fn free(&mut self) { self.items = Vec::new(); }

    /// Contents as a slice.
    pub fn as_slice(&self) -> &[T] { &self.items }
}

impl<T> Deref for GrowBuf<T> {
    type Target = [T];

    fn deref(&self) -> &[T] { &self.items }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn growth_policy() {
        assert_eq!(grow_capacity(0), 8);
        assert_eq!(grow_capacity(7), 8);
        assert_eq!(grow_capacity(8), 16);
        assert_eq!(grow_capacity(16), 32);
    }

    #[test]
    fn capacity_follows_policy() {
        let mut buf = GrowBuf::new();
        assert_eq!(buf.capacity(), 0);

        let mut seen = Vec::new();
        for i in 0..100u32 {
            buf.push(i);
            if seen.last() != Some(&buf.capacity()) {
                seen.push(buf.capacity());
            }
        }
        assert_eq!(seen, vec![8, 16, 32, 64, 128]);
        assert_eq!(buf.len(), 100);
    }

    #[test]
    fn free_resets() {
        let mut buf = GrowBuf::new();
        buf.push(1.5_f64);
        buf.free();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 0);
    }
}
