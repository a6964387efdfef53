//! The CFG mutation API (§4.2). Every mutator maintains the bidirectional
//! edge invariant and snapshots the neighbor set it is about to rewrite
//! before mutating it, so iteration never aliases the structure being
//! mutated (§5).

use super::{ControlFlowGraph, Terminator};
use petgraph::graph::NodeIndex;
use std::collections::HashSet;

/// Replaces `node`'s successor set with `{target}` and its terminator with
/// `jmp target`.
pub fn set_successor(cfg: &mut ControlFlowGraph, node: NodeIndex, target: NodeIndex) {
    let old_successors: Vec<NodeIndex> = cfg.node(node).successors.clone();
    for succ in old_successors {
        cfg.node_mut(succ).predecessors.remove(&node);
    }
    cfg.node_mut(target).predecessors.insert(node);
    let target_name = cfg.node(target).name.clone();
    let node_mut = cfg.node_mut(node);
    node_mut.successors = vec![target];
    node_mut.terminator = Some(Terminator::Jmp { label: target_name });
}

/// Replaces `node`'s successor set with `{then_target, else_target}` and its
/// terminator with `br cond then_target else_target`.
pub fn set_successors(cfg: &mut ControlFlowGraph, node: NodeIndex, then_target: NodeIndex, else_target: NodeIndex, cond: impl Into<String>) {
    let old_successors: Vec<NodeIndex> = cfg.node(node).successors.clone();
    for succ in old_successors {
        cfg.node_mut(succ).predecessors.remove(&node);
    }
    cfg.node_mut(then_target).predecessors.insert(node);
    cfg.node_mut(else_target).predecessors.insert(node);
    let then_name = cfg.node(then_target).name.clone();
    let else_name = cfg.node(else_target).name.clone();
    let node_mut = cfg.node_mut(node);
    node_mut.successors = vec![then_target, else_target];
    node_mut.terminator = Some(Terminator::Br { cond: cond.into(), then_label: then_name, else_label: else_name });
}

/// Replaces the edge `node -> old_succ` with `node -> new_succ`, rewriting
/// every occurrence of `old_succ`'s name in the terminator's label-argument
/// list. A no-op if `old_succ` is not currently a successor of `node`.
pub fn replace_edge(cfg: &mut ControlFlowGraph, node: NodeIndex, old_succ: NodeIndex, new_succ: NodeIndex) {
    if !cfg.node(node).successors.contains(&old_succ) {
        return;
    }
    cfg.node_mut(old_succ).predecessors.remove(&node);
    cfg.node_mut(new_succ).predecessors.insert(node);
    let old_name = cfg.node(old_succ).name.clone();
    let new_name = cfg.node(new_succ).name.clone();
    let node_mut = cfg.node_mut(node);
    for succ in &mut node_mut.successors {
        if *succ == old_succ {
            *succ = new_succ;
        }
    }
    if let Some(term) = node_mut.terminator.as_mut() {
        term.rename_target(&old_name, &new_name);
    }
}

/// Removes every incoming and outgoing edge of `node`, leaving it isolated.
pub fn delete(cfg: &mut ControlFlowGraph, node: NodeIndex) {
    let successors: Vec<NodeIndex> = cfg.node(node).successors.clone();
    let predecessors: Vec<NodeIndex> = cfg.node(node).predecessors.iter().copied().collect();
    for succ in successors {
        cfg.node_mut(succ).predecessors.remove(&node);
    }
    for pred in predecessors {
        cfg.node_mut(pred).successors.retain(|&s| s != node);
    }
    let node_mut = cfg.node_mut(node);
    node_mut.successors.clear();
    node_mut.predecessors.clear();
}

/// For every predecessor of `loop_header` not in `back_edge_sources`,
/// redirects its edge to `pre_header` instead. After this call,
/// `loop_header`'s predecessors are exactly `back_edge_sources ∪
/// {pre_header}` (§4.8 "Pre-header creation").
pub fn add_header(cfg: &mut ControlFlowGraph, loop_header: NodeIndex, pre_header: NodeIndex, back_edge_sources: &HashSet<NodeIndex>) {
    let predecessors: Vec<NodeIndex> = cfg.node(loop_header).predecessors.iter().copied().collect();
    for pred in predecessors {
        if back_edge_sources.contains(&pred) {
            continue;
        }
        replace_edge(cfg, pred, loop_header, pre_header);
    }
}
