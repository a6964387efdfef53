//! Interpreter and heap faults raised while executing a program (§7 kinds
//! 2, 3, 5, 6).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("type error: {0}")]
    TypeMismatch(String),

    #[error("call to undefined function '{0}'")]
    UnknownFunction(String),

    #[error("jump to undefined label '{0}'")]
    UnknownLabel(String),

    #[error(transparent)]
    Heap(#[from] HeapError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeapError {
    #[error("alloc of non-positive size {0}")]
    NonPositiveSize(i64),

    #[error("free of pointer with nonzero offset {0}")]
    FreeNonzeroOffset(i64),

    #[error("free of unallocated base {0}")]
    FreeUnallocated(u64),

    #[error("out-of-bounds access at base {base}, offset {offset} (length {length})")]
    OutOfBounds { base: u64, offset: i64, length: usize },

    #[error("read of uninitialized slot at base {base}, offset {offset}")]
    Uninitialized { base: u64, offset: i64 },

    #[error("program terminated with {0} unfreed allocation(s)")]
    UnfreedMemory(usize),

    #[error("pointer comparison across allocations (base {0} vs base {1})")]
    CrossAllocationComparison(u64, u64),

    #[error("dereference of unallocated base {0}")]
    UseAfterFree(u64),
}
