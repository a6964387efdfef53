//! Reaching-definitions analysis (§4.6). Per Open Question 1, every consumer
//! needing `Definition`-valued results uses this analysis; nothing reuses
//! `live_variables` for that purpose.

use super::{Analysis, Direction};
use crate::cfg::ControlFlowGraph;
use petgraph::graph::NodeIndex;
use std::collections::HashSet;

/// A definition site: variable name plus the block/instruction-offset
/// location that writes it. Equality and hashing are structural over all
/// three fields (§3 "Definition").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Definition {
    pub var: String,
    pub block: NodeIndex,
    pub index: usize,
}

#[derive(Debug, Default)]
pub struct ReachingDefs;

impl Analysis for ReachingDefs {
    type Domain = HashSet<Definition>;

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
        for (index, instr) in cfg.node(node).instrs.iter().enumerate() {
            if let Some(dest) = instr.dest() {
                out.retain(|d| d.var != dest);
                out.insert(Definition { var: dest.to_string(), block: node, index });
            }
        }
        out
    }
}
