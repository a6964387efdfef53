//! Dominator computation (§4.3) and natural-loop discovery (§4.4), following
//! the Cooper/Harvey/Kennedy "engineering a fast dominance algorithm"
//! formulation as in the teacher's `ir::dominance` module.

pub mod loops;

use crate::cfg::ControlFlowGraph;
use petgraph::graph::NodeIndex;
use std::collections::{HashMap, HashSet};

pub use loops::{discover_loops, NaturalLoop};

/// Immediate-dominator tree for one function's CFG, plus dominance
/// frontiers and dominator-tree children derived from it.
#[derive(Debug, Clone, Default)]
pub struct DominanceInfo {
    idom: HashMap<NodeIndex, NodeIndex>,
    dominance_frontiers: HashMap<NodeIndex, HashSet<NodeIndex>>,
    dom_tree_children: HashMap<NodeIndex, Vec<NodeIndex>>,
}

impl DominanceInfo {
    #[must_use]
    pub fn compute(cfg: &ControlFlowGraph) -> Self {
        let entry = cfg.entry();
        let rpo = cfg.reverse_post_order();
        let rpo_index: HashMap<NodeIndex, usize> = rpo.iter().enumerate().map(|(i, &n)| (n, i)).collect();

        let mut idom: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        idom.insert(entry, entry);

        let mut changed = true;
        while changed {
            changed = false;
            for &node in &rpo {
                if node == entry {
                    continue;
                }
                let preds = cfg.predecessors(node);
                let mut new_idom: Option<NodeIndex> = None;
                for &pred in preds {
                    if idom.contains_key(&pred) {
                        new_idom = Some(match new_idom {
                            None => pred,
                            Some(cur) => intersect(cur, pred, &idom, &rpo_index),
                        });
                    }
                }
                let Some(new_idom) = new_idom else { continue };
                if idom.get(&node) != Some(&new_idom) {
                    idom.insert(node, new_idom);
                    changed = true;
                }
            }
        }

        let mut dom_tree_children: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
        for (&node, &parent) in &idom {
            if node != parent {
                dom_tree_children.entry(parent).or_default().push(node);
            }
        }

        let mut info = Self { idom, dominance_frontiers: HashMap::new(), dom_tree_children };
        info.compute_dominance_frontiers(cfg);
        info
    }

    fn compute_dominance_frontiers(&mut self, cfg: &ControlFlowGraph) {
        let entry = cfg.entry();
        for b in cfg.nodes() {
            let preds = cfg.predecessors(b);
            if preds.len() < 2 {
                continue;
            }
            for &p in preds {
                let mut runner = p;
                while !self.dominates(runner, b) && runner != entry {
                    self.dominance_frontiers.entry(runner).or_default().insert(b);
                    match self.idom.get(&runner) {
                        Some(&parent) if parent != runner => runner = parent,
                        _ => break,
                    }
                }
            }
        }
    }

    /// True iff `a` dominates `b` (every path from entry to `b` passes
    /// through `a`), including `a == b`.
    #[must_use]
    pub fn dominates(&self, a: NodeIndex, b: NodeIndex) -> bool {
        let mut current = b;
        loop {
            if current == a {
                return true;
            }
            match self.idom.get(&current) {
                Some(&parent) if parent != current => current = parent,
                _ => return false,
            }
        }
    }

    #[must_use]
    pub fn immediate_dominator(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.idom.get(&node).copied().filter(|&p| p != node)
    }

    #[must_use]
    pub fn dominance_frontier(&self, node: NodeIndex) -> Option<&HashSet<NodeIndex>> {
        self.dominance_frontiers.get(&node)
    }

    #[must_use]
    pub fn dominator_tree_children(&self, node: NodeIndex) -> &[NodeIndex] {
        self.dom_tree_children.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Pre-order walk of the dominator tree rooted at `entry`, used by the
    /// induction-variable pass to pick a deterministic surrogate (Open
    /// Question 3).
    #[must_use]
    pub fn pre_order(&self, entry: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack = vec![entry];
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut children = self.dominator_tree_children(node).to_vec();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// A back edge `a -> b` is one where `b` dominates `a`.
    #[must_use]
    pub fn is_back_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.dominates(to, from)
    }
}

/// Equalizes reverse-postorder "depth" and walks both fingers up the
/// partially-built dominator tree until they converge (Cooper/Harvey/Kennedy
/// `intersect`).
fn intersect(a: NodeIndex, b: NodeIndex, idom: &HashMap<NodeIndex, NodeIndex>, rpo_index: &HashMap<NodeIndex, usize>) -> NodeIndex {
    let mut finger1 = a;
    let mut finger2 = b;
    while finger1 != finger2 {
        while rpo_index[&finger1] > rpo_index[&finger2] {
            finger1 = idom[&finger1];
        }
        while rpo_index[&finger2] > rpo_index[&finger1] {
            finger2 = idom[&finger2];
        }
    }
    finger1
}
