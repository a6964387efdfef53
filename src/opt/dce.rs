//! Dead-code elimination (§4.7): live-variables plus local dead-store
//! elimination, iterated to fixpoint.

use crate::analysis::{self, LiveVars};
use crate::cfg::{ControlFlowGraph, Terminator};
use std::collections::{HashMap, HashSet};

/// Runs DCE to fixpoint in place, returning the number of outer rounds it
/// took (logged by the CLI at `debug` level).
pub fn run(cfg: &mut ControlFlowGraph) -> usize {
    let mut rounds = 0;
    loop {
        rounds += 1;
        let live = analysis::run(cfg, &LiveVars);
        let mut any_changed = false;
        let node_indices: Vec<_> = cfg.nodes().collect();
        for idx in node_indices {
            let live_out = live.out_of(idx).clone();
            let terminator_use = match &cfg.node(idx).terminator {
                Some(Terminator::Br { cond, .. }) => Some(cond.clone()),
                _ => None,
            };
            if eliminate_local(cfg, idx, &live_out, terminator_use.as_deref()) {
                any_changed = true;
            }
        }
        if !any_changed {
            break;
        }
    }
    rounds
}

/// Local killed-locals elimination for one block (§4.7 step 2). Returns
/// whether the block's instruction count changed.
fn eliminate_local(cfg: &mut ControlFlowGraph, idx: petgraph::graph::NodeIndex, live_out: &HashSet<String>, terminator_use: Option<&str>) -> bool {
    let node = cfg.node_mut(idx);
    let original_len = node.instrs.len();

    let mut last_def: HashMap<String, usize> = HashMap::new();
    let mut to_drop: HashSet<usize> = HashSet::new();

    for (i, instr) in node.instrs.iter().enumerate() {
        for arg in instr.args() {
            last_def.remove(arg);
        }
        if let Some(dest) = instr.dest() {
            if let Some(&prev) = last_def.get(dest) {
                to_drop.insert(prev);
            }
            last_def.insert(dest.to_string(), i);
        }
    }

    for (var, idx_in_block) in &last_def {
        let still_used = live_out.contains(var) || terminator_use == Some(var.as_str());
        if !still_used {
            to_drop.insert(*idx_in_block);
        }
    }

    if to_drop.is_empty() {
        return false;
    }

    let mut kept = Vec::with_capacity(node.instrs.len());
    for (i, instr) in node.instrs.drain(..).enumerate() {
        if !to_drop.contains(&i) {
            kept.push(instr);
        }
    }
    node.instrs = kept;
    node.instrs.len() != original_len
}
