//! CFG-to-IR serialization (§4.9): the inverse of [`super::build::construct_cfg`].

use super::{ControlFlowGraph, Terminator};
use crate::ir::{Function, Item};

/// Walks the node list in insertion order, skipping `__entry__`/`__exit__`,
/// emitting each block's label, straight-line instructions, and terminator
/// (rewritten to `ret` when the sole successor is `__exit__`).
#[must_use]
pub fn cfg_to_function(cfg: &ControlFlowGraph, name: &str) -> Function {
    let mut items = Vec::new();
    for idx in cfg.nodes() {
        if idx == cfg.entry() || idx == cfg.exit() {
            continue;
        }
        let node = cfg.node(idx);
        items.push(Item::Label(node.name.clone()));
        for instr in &node.instrs {
            items.push(Item::Instr(instr.clone()));
        }
        let terminator = if node.successors.len() == 1 && node.successors[0] == cfg.exit() {
            Terminator::Ret
        } else {
            node.terminator.clone().unwrap_or(Terminator::Ret)
        };
        items.push(Item::Instr(terminator.to_instruction()));
    }
    Function::new(name.to_string(), items)
}
