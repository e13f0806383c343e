// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Append-only object pools
//!
//! Pools are sized at build time. The cursor only grows; there is no free
//! list and slots are addressed by index.

use heapless::Vec;

/// Fixed-capacity arena with a monotonic cursor
pub struct Pool<T, const N: usize> {
    items: Vec<T, N>,
}

impl<T, const N: usize> Pool<T, N> {
    /// Create an empty pool
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Total capacity
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Allocation cursor (number of slots handed out)
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.items.len()
    }

    /// Slots still available
    #[must_use]
    pub fn remaining(&self) -> usize {
        N - self.items.len()
    }

    /// Check if no slot is left
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.is_full()
    }

    /// Allocate one slot, returning its index
    ///
    /// Hands the item back when the pool is full.
    pub fn alloc(&mut self, item: T) -> Result<usize, T> {
        let index = self.items.len();
        self.items.push(item)?;
        Ok(index)
    }

    /// Slot at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Mutable slot at `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Allocated slots in allocation order
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Mutable allocated slots
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<T, const N: usize> Default for Pool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_until_full() {
        let mut pool: Pool<u32, 2> = Pool::new();
        assert_eq!(pool.alloc(10), Ok(0));
        assert_eq!(pool.alloc(11), Ok(1));
        assert!(pool.is_full());
        assert_eq!(pool.alloc(12), Err(12));
        assert_eq!(pool.cursor(), 2);
        assert_eq!(pool.as_slice(), &[10, 11]);
    }

    #[test]
    fn test_remaining() {
        let mut pool: Pool<u8, 4> = Pool::new();
        pool.alloc(1).unwrap();
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.remaining(), 3);
        *pool.get_mut(0).unwrap() = 9;
        assert_eq!(pool.get(0), Some(&9));
        assert_eq!(pool.get(1), None);
    }
}
