//! Optimizer precondition failures (§7 kind 7) — these indicate a bug in the
//! CFG/dataflow/pass machinery itself, not a malformed input program.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("CFG entry block has {0} predecessor(s), expected 0")]
    EntryHasPredecessors(usize),

    #[error("CFG is malformed: {0}")]
    MalformedCfg(String),

    #[error("induction-variable descriptor has an unrecognized combinator for '{0}'")]
    UnrecognizedCombinator(String),

    #[error("dominance query on unreachable node")]
    UnreachableNode,
}
