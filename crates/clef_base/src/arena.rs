//! Bump allocation for AST nodes.
//!
//! A translation unit's syntax tree is built once, read many times, and
//! thrown away as a whole.  The [`Arena`] wraps a bump allocator so that
//! nodes can hand out plain references to each other without reference
//! counting; everything is released together when the arena is dropped.
//!
//! Values placed in an arena are **never dropped individually**: store
//! only `Copy`-ish payloads and references to other arena data.
//!
//! ## Example
//!
//! ```
//! use clef_base::Arena;
//!
//! let arena = Arena::new();
//! let a = arena.alloc(1u32);
//! let b = arena.alloc(2u32);
//! assert_eq!(*a + *b, 3);
//! ```

use bumpalo::Bump;

/// A bump allocator handing out references valid for its own lifetime.
pub struct Arena {
    bump: Bump,
}

impl Arena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Arena { bump: Bump::new() }
    }

    /// Allocates a value and returns a reference tied to the arena.
    pub fn alloc<T>(&self, value: T) -> &T {
        self.bump.alloc(value)
    }

    /// Allocates a slice from an iterator of known length.
    pub fn alloc_slice<T, I>(&self, items: I) -> &[T]
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_fill_iter(items)
    }

    /// Copies a byte slice into the arena.
    pub fn alloc_bytes(&self, bytes: &[u8]) -> &[u8] {
        self.bump.alloc_slice_copy(bytes)
    }

    /// Number of bytes currently allocated, for statistics output.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_stable_references() {
        let arena = Arena::new();
        let r1 = arena.alloc(42);
        let r2 = arena.alloc(100);
        assert_eq!(*r1, 42);
        assert_eq!(*r2, 100);
    }

    #[test]
    fn references_remain_valid_after_many_allocations() {
        let arena = Arena::new();
        let refs: Vec<&i32> = (0..10000).map(|i| arena.alloc(i)).collect();
        for (i, r) in refs.iter().enumerate() {
            assert_eq!(**r, i as i32);
        }
    }

    #[test]
    fn alloc_slice_from_vec() {
        let arena = Arena::new();
        let slice = arena.alloc_slice(vec![10, 20, 30]);
        assert_eq!(slice, &[10, 20, 30]);
    }

    #[test]
    fn alloc_empty_slice() {
        let arena = Arena::new();
        let slice: &[i32] = arena.alloc_slice(Vec::new());
        assert!(slice.is_empty());
    }

    #[test]
    fn alloc_bytes_copies_content() {
        let arena = Arena::new();
        let bytes = arena.alloc_bytes(b"hello");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn mixed_types_share_one_arena() {
        let arena = Arena::new();
        let n = arena.alloc(7u64);
        let s = arena.alloc_bytes(b"x");
        let p = arena.alloc((1u8, 2u8));
        assert_eq!(*n, 7);
        assert_eq!(s, b"x");
        assert_eq!(*p, (1, 2));
    }
}
