//! Optimization passes (§4.7, §4.8) and the pass names the CLI's
//! `opt -n <pass>` flag dispatches on.

pub mod dce;
pub mod expr;
pub mod indvar;

use crate::cfg::ControlFlowGraph;

/// The optimization passes selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Pass {
    /// Identity pass: rebuilds the CFG without changing it. Useful for
    /// exercising the construct/serialize round trip in isolation.
    Nop,
    /// Dead-code elimination, run to fixpoint.
    Dce,
    /// Induction-variable strength reduction with basic-variable elimination.
    Licm,
}

/// Runs the named pass over `cfg` in place.
pub fn run_pass(pass: Pass, cfg: &mut ControlFlowGraph) {
    match pass {
        Pass::Nop => {}
        Pass::Dce => {
            let rounds = dce::run(cfg);
            tracing::debug!(rounds, "dce converged");
        }
        Pass::Licm => {
            let transformed = indvar::run(cfg);
            tracing::debug!(transformed, "induction-variable pass transformed loops");
        }
    }
}
