//! Live-variables analysis (§4.6), backward.

use super::{Analysis, Direction};
use crate::cfg::{ControlFlowGraph, Terminator};
use petgraph::graph::NodeIndex;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct LiveVars;

impl Analysis for LiveVars {
    type Domain = HashSet<String>;

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn init(&self) -> Self::Domain {
        HashSet::new()
    }

    fn merge<'a>(&self, values: impl Iterator<Item = &'a Self::Domain>) -> Self::Domain
    where
        Self::Domain: 'a,
    {
        values.fold(HashSet::new(), |mut acc, v| {
            acc.extend(v.iter().cloned());
            acc
        })
    }

    /// `transfer(b, out)`: walk the block backward from its terminator,
    /// killing each destination and adding each instruction's operands,
    /// yielding the variables live on entry to `b`.
    fn transfer(&self, cfg: &ControlFlowGraph, node: NodeIndex, in_set: &Self::Domain) -> Self::Domain {
        let block = cfg.node(node);
        let mut live = in_set.clone();
        if let Some(Terminator::Br { cond, .. }) = &block.terminator {
            live.insert(cond.clone());
        }
        for instr in block.instrs.iter().rev() {
            if let Some(dest) = instr.dest() {
                live.remove(dest);
            }
            for arg in instr.args() {
                live.insert(arg.to_string());
            }
        }
        live
    }
}
