//! The control-flow graph (§3 "CFGNode", §4.1/§4.2/§4.9).
//!
//! Nodes live in a [`petgraph::graph::DiGraph`] used purely as an owning
//! arena for [`NodeIndex`] allocation (design note 9: "represent nodes by
//! indices into an owning vector... and edges by index sets"); the actual
//! topology is the explicit `successors`/`predecessors` index sets on each
//! [`CfgNode`], not petgraph edges, so mutation never has to reason about
//! petgraph's own edge-removal semantics.

pub mod build;
pub mod dot;
pub mod mutate;
pub mod serialize;

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashSet;
use std::fmt;

pub const ENTRY_NAME: &str = "__entry__";
pub const EXIT_NAME: &str = "__exit__";

use crate::ir::Instruction;

/// A block's terminator, decoupled from [`Instruction`] so the CFG mutation
/// API can rewrite jump targets without pattern-matching the whole
/// instruction enum. `__entry__` carries no terminator of its own; it always
/// has exactly one successor, installed directly by the builder.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Jmp { label: String },
    Br { cond: String, then_label: String, else_label: String },
    Ret,
}

impl Terminator {
    #[must_use]
    pub fn from_instruction(instr: &Instruction) -> Option<Self> {
        match instr {
            Instruction::Jmp { label } => Some(Terminator::Jmp { label: label.clone() }),
            Instruction::Br { cond, then_label, else_label } => {
                Some(Terminator::Br { cond: cond.clone(), then_label: then_label.clone(), else_label: else_label.clone() })
            }
            Instruction::Ret => Some(Terminator::Ret),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_instruction(&self) -> Instruction {
        match self {
            Terminator::Jmp { label } => Instruction::Jmp { label: label.clone() },
            Terminator::Br { cond, then_label, else_label } => {
                Instruction::Br { cond: cond.clone(), then_label: then_label.clone(), else_label: else_label.clone() }
            }
            Terminator::Ret => Instruction::Ret,
        }
    }

    #[must_use]
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Terminator::Jmp { label } => vec![label.as_str()],
            Terminator::Br { then_label, else_label, .. } => vec![then_label.as_str(), else_label.as_str()],
            Terminator::Ret => Vec::new(),
        }
    }

    /// Rewrites every occurrence of `old` in the label-target list to `new`,
    /// used by [`mutate::replace_edge`].
    pub fn rename_target(&mut self, old: &str, new: &str) {
        match self {
            Terminator::Jmp { label } => {
                if label == old {
                    *label = new.to_string();
                }
            }
            Terminator::Br { then_label, else_label, .. } => {
                if then_label == old {
                    *then_label = new.to_string();
                }
                if else_label == old {
                    *else_label = new.to_string();
                }
            }
            Terminator::Ret => {}
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_instruction())
    }
}

/// One CFG node: identity is its graph index, which also backs equality in
/// `successors`/`predecessors` sets (§3 "Identity = name"; the name remains
/// unique and is kept around for lookup and serialization, but structural
/// identity inside the graph is the `NodeIndex`).
#[derive(Debug, Clone)]
pub struct CfgNode {
    pub name: String,
    pub instrs: Vec<Instruction>,
    pub terminator: Option<Terminator>,
    pub orig_index: Option<usize>,
    pub successors: Vec<NodeIndex>,
    pub predecessors: HashSet<NodeIndex>,
}

impl CfgNode {
    fn new(name: impl Into<String>, instrs: Vec<Instruction>, terminator: Option<Terminator>, orig_index: Option<usize>) -> Self {
        Self { name: name.into(), instrs, terminator, orig_index, successors: Vec::new(), predecessors: HashSet::new() }
    }
}

#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    graph: DiGraph<CfgNode, ()>,
    entry: NodeIndex,
    exit: NodeIndex,
}

impl ControlFlowGraph {
    fn empty() -> Self {
        let mut graph = DiGraph::new();
        let entry = graph.add_node(CfgNode::new(ENTRY_NAME, Vec::new(), None, None));
        let exit = graph.add_node(CfgNode::new(EXIT_NAME, Vec::new(), None, None));
        Self { graph, entry, exit }
    }

    #[must_use]
    pub fn entry(&self) -> NodeIndex {
        self.entry
    }

    #[must_use]
    pub fn exit(&self) -> NodeIndex {
        self.exit
    }

    pub fn add_block(&mut self, name: impl Into<String>, instrs: Vec<Instruction>, terminator: Terminator, orig_index: Option<usize>) -> NodeIndex {
        self.graph.add_node(CfgNode::new(name, instrs, Some(terminator), orig_index))
    }

    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> &CfgNode {
        &self.graph[idx]
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> &mut CfgNode {
        &mut self.graph[idx]
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeIndex> {
        self.graph.node_indices().find(|&idx| self.graph[idx].name == name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn successors(&self, idx: NodeIndex) -> &[NodeIndex] {
        &self.graph[idx].successors
    }

    #[must_use]
    pub fn predecessors(&self, idx: NodeIndex) -> &HashSet<NodeIndex> {
        &self.graph[idx].predecessors
    }

    /// Connects `from -> to`, maintaining the bidirectional invariant. Used
    /// only by the builder; after construction, callers go through
    /// [`mutate`] so the terminator stays consistent with the edge set.
    fn connect(&mut self, from: NodeIndex, to: NodeIndex) {
        self.graph[from].successors.push(to);
        self.graph[to].predecessors.insert(from);
    }

    /// Reverse-postorder over reachable nodes by DFS over successors from
    /// the entry (§4.3 "Ordering").
    #[must_use]
    pub fn reverse_post_order(&self) -> Vec<NodeIndex> {
        let mut visited = HashSet::new();
        let mut post_order = Vec::new();
        self.dfs_post_order(self.entry, &mut visited, &mut post_order);
        post_order.reverse();
        post_order
    }

    fn dfs_post_order(&self, node: NodeIndex, visited: &mut HashSet<NodeIndex>, out: &mut Vec<NodeIndex>) {
        if !visited.insert(node) {
            return;
        }
        for &succ in &self.graph[node].successors {
            self.dfs_post_order(succ, visited, out);
        }
        out.push(node);
    }

    /// Structural well-formedness check (§8 "CFG well-formedness").
    pub fn verify(&self) -> Result<(), String> {
        if !self.graph[self.entry].predecessors.is_empty() {
            return Err(format!("{ENTRY_NAME} has {} predecessor(s), expected 0", self.graph[self.entry].predecessors.len()));
        }
        if !self.graph[self.exit].successors.is_empty() {
            return Err(format!("{EXIT_NAME} has successors, expected none"));
        }
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            if idx != self.entry && idx != self.exit && node.terminator.is_none() {
                return Err(format!("block '{}' has no terminator", node.name));
            }
            for &succ in &node.successors {
                if !self.graph[succ].predecessors.contains(&idx) {
                    return Err(format!("edge {} -> {} is not mirrored in predecessors", node.name, self.graph[succ].name));
                }
            }
            for &pred in &node.predecessors {
                if !self.graph[pred].successors.contains(&idx) {
                    return Err(format!("edge {} -> {} is not mirrored in successors", self.graph[pred].name, node.name));
                }
            }
        }
        Ok(())
    }
}
