//! The interpreter's typed heap (§3 "Heap Key"/"Heap", §4.10).
//!
//! Allocations are arenas keyed by a monotonically increasing `base`;
//! `Key(base, offset)` pairs identify a single storage slot. Pointer
//! comparison is only meaningful within one allocation, so [`Key::cmp_within`]
//! rejects cross-`base` comparisons rather than silently ordering by `base`.

use crate::error::runtime_error::HeapError;
use num_bigint::BigInt;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub base: u64,
    pub offset: i64,
}

impl Key {
    #[must_use]
    pub fn new(base: u64, offset: i64) -> Self {
        Self { base, offset }
    }

    #[must_use]
    pub fn ptradd(self, delta: i64) -> Self {
        Self { base: self.base, offset: self.offset + delta }
    }

    pub fn cmp_within(self, other: Self) -> Result<Ordering, HeapError> {
        if self.base != other.base {
            return Err(HeapError::CrossAllocationComparison(self.base, other.base));
        }
        Ok(self.offset.cmp(&other.offset))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ptr base={} off={}>", self.base, self.offset)
    }
}

/// The interpreter's runtime value universe: everything a variable can be
/// bound to, or a heap slot can hold. A superset of [`crate::ir::Literal`]
/// (which only covers `const` payloads) because pointers are storable too.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(BigInt),
    Bool(bool),
    Ptr(Key),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Ptr(k) => write!(f, "{k}"),
        }
    }
}

struct Allocation {
    slots: Vec<Option<Value>>,
}

/// A per-allocation arena. `next_base` never reuses a freed `base`, so a
/// dangling `Key` can never alias a later allocation.
#[derive(Default)]
pub struct Heap {
    allocations: HashMap<u64, Allocation>,
    next_base: u64,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, len: i64) -> Result<Key, HeapError> {
        if len <= 0 {
            return Err(HeapError::NonPositiveSize(len));
        }
        let base = self.next_base;
        self.next_base += 1;
        self.allocations.insert(base, Allocation { slots: vec![None; len as usize] });
        Ok(Key::new(base, 0))
    }

    pub fn free(&mut self, key: Key) -> Result<(), HeapError> {
        if key.offset != 0 {
            return Err(HeapError::FreeNonzeroOffset(key.offset));
        }
        self.allocations.remove(&key.base).ok_or(HeapError::FreeUnallocated(key.base))?;
        Ok(())
    }

    fn slot(&self, key: Key) -> Result<&Option<Value>, HeapError> {
        let alloc = self.allocations.get(&key.base).ok_or(HeapError::UseAfterFree(key.base))?;
        alloc.slots.get(usize::try_from(key.offset).unwrap_or(usize::MAX)).ok_or(HeapError::OutOfBounds {
            base: key.base,
            offset: key.offset,
            length: alloc.slots.len(),
        })
    }

    fn slot_mut(&mut self, key: Key) -> Result<&mut Option<Value>, HeapError> {
        let alloc = self.allocations.get_mut(&key.base).ok_or(HeapError::UseAfterFree(key.base))?;
        let len = alloc.slots.len();
        alloc
            .slots
            .get_mut(usize::try_from(key.offset).unwrap_or(usize::MAX))
            .ok_or(HeapError::OutOfBounds { base: key.base, offset: key.offset, length: len })
    }

    pub fn read(&self, key: Key) -> Result<Value, HeapError> {
        self.slot(key)?.clone().ok_or(HeapError::Uninitialized { base: key.base, offset: key.offset })
    }

    pub fn write(&mut self, key: Key, value: Value) -> Result<(), HeapError> {
        *self.slot_mut(key)? = Some(value);
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.allocations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_rejects_nonpositive_size() {
        let mut heap = Heap::new();
        assert_eq!(heap.alloc(0), Err(HeapError::NonPositiveSize(0)));
        assert_eq!(heap.alloc(-1), Err(HeapError::NonPositiveSize(-1)));
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut heap = Heap::new();
        let p = heap.alloc(4).unwrap();
        let p1 = p.ptradd(1);
        heap.write(p1, Value::Bool(true)).unwrap();
        assert_eq!(heap.read(p1).unwrap(), Value::Bool(true));
    }

    #[test]
    fn free_requires_zero_offset_and_live_base() {
        let mut heap = Heap::new();
        let p = heap.alloc(2).unwrap();
        assert_eq!(heap.free(p.ptradd(1)), Err(HeapError::FreeNonzeroOffset(1)));
        heap.free(p).unwrap();
        assert_eq!(heap.free(p), Err(HeapError::FreeUnallocated(p.base)));
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut heap = Heap::new();
        let p = heap.alloc(2).unwrap();
        assert!(matches!(heap.read(p.ptradd(5)), Err(HeapError::OutOfBounds { .. })));
    }

    #[test]
    fn cross_allocation_comparison_is_rejected() {
        let mut heap = Heap::new();
        let a = heap.alloc(1).unwrap();
        let b = heap.alloc(1).unwrap();
        assert!(matches!(a.cmp_within(b), Err(HeapError::CrossAllocationComparison(..))));
    }

    #[test]
    fn empty_after_every_allocation_freed() {
        let mut heap = Heap::new();
        let p = heap.alloc(1).unwrap();
        assert!(!heap.is_empty());
        heap.free(p).unwrap();
        assert!(heap.is_empty());
    }
}
