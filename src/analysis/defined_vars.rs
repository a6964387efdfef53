//! Defined-variables analysis (§4.6): which variables definitely have a
//! value by the time control reaches a given program point.

use super::{Analysis, Direction};
use crate::cfg::ControlFlowGraph;
use petgraph::graph::NodeIndex;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct DefinedVars;

impl Analysis for DefinedVars {
    type Domain = HashSet<String>;

    fn direction(&self) -> Direction {
        Direction::Forward
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

    fn transfer(&self, cfg: &ControlFlowGraph, node: NodeIndex, in_set: &Self::Domain) -> Self::Domain {
        let mut out = in_set.clone();
        for instr in &cfg.node(node).instrs {
            if let Some(dest) = instr.dest() {
                out.insert(dest.to_string());
            }
        }
        out
    }
}
