//! The reference interpreter (§4's "Interpreter" leaf, §6 `interp`
//! subcommand): walks a function's linear item list directly, without
//! building a CFG first, dispatching on [`crate::ir::Instruction`] and
//! threading a [`crate::heap::Heap`] through memory operations.

mod machine;

pub use machine::{InterpOutcome, Interpreter};
