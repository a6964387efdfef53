//! Generic dataflow worklist framework (§4.5) and the three concrete
//! analyses it drives (§4.6). The framework is parameterized by an
//! [`Analysis`] trait so new analyses compose without reopening the driver
//! (§9 "Analysis/pass decoupling"), in the spirit of the trait-based
//! dataflow designs in the broader ecosystem.

pub mod defined_vars;
pub mod live_vars;
pub mod reaching_defs;

use crate::cfg::ControlFlowGraph;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

pub use defined_vars::DefinedVars;
pub use live_vars::LiveVars;
pub use reaching_defs::{Definition, ReachingDefs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// One dataflow analysis: a lattice element type plus the four operations
/// the worklist driver needs. `Domain` must support equality so the driver
/// can detect a fixpoint.
pub trait Analysis {
    type Domain: Clone + PartialEq;

    fn direction(&self) -> Direction;
    fn init(&self) -> Self::Domain;
    fn merge<'a>(&self, values: impl Iterator<Item = &'a Self::Domain>) -> Self::Domain
    where
        Self::Domain: 'a;
    fn transfer(&self, cfg: &ControlFlowGraph, node: NodeIndex, in_set: &Self::Domain) -> Self::Domain;
}

/// `in[n]`/`out[n]` for every block, oriented so callers always read `in` as
/// "flowing into the block in program order" and `out` as "flowing out",
/// regardless of the analysis's direction (§4.5).
#[derive(Debug, Clone)]
pub struct DataflowResult<D> {
    pub in_sets: HashMap<NodeIndex, D>,
    pub out_sets: HashMap<NodeIndex, D>,
}

impl<D> DataflowResult<D> {
    #[must_use]
    pub fn in_of(&self, node: NodeIndex) -> &D {
        &self.in_sets[&node]
    }

    #[must_use]
    pub fn out_of(&self, node: NodeIndex) -> &D {
        &self.out_sets[&node]
    }
}

/// Runs `analysis` to a fixpoint over `cfg` and returns `in`/`out` for every
/// node, including the synthetic `__entry__`/`__exit__` nodes.
pub fn run<A: Analysis>(cfg: &ControlFlowGraph, analysis: &A) -> DataflowResult<A::Domain> {
    match analysis.direction() {
        Direction::Forward => run_directed(cfg, analysis, cfg.entry(), |n| cfg.predecessors(n).iter().copied().collect(), |n| cfg.successors(n).to_vec()),
        Direction::Backward => run_directed(cfg, analysis, cfg.exit(), |n| cfg.successors(n).to_vec(), |n| cfg.predecessors(n).iter().copied().collect()),
    }
}

fn run_directed<A: Analysis>(
    cfg: &ControlFlowGraph,
    analysis: &A,
    start: NodeIndex,
    pred_of: impl Fn(NodeIndex) -> Vec<NodeIndex>,
    succ_of: impl Fn(NodeIndex) -> Vec<NodeIndex>,
) -> DataflowResult<A::Domain> {
    let mut flow_in: HashMap<NodeIndex, A::Domain> = HashMap::new();
    let mut flow_out: HashMap<NodeIndex, A::Domain> = HashMap::new();
    for node in cfg.nodes() {
        flow_in.insert(node, analysis.init());
        flow_out.insert(node, analysis.init());
    }
    flow_in.insert(start, analysis.init());

    let order = match analysis.direction() {
        Direction::Forward => cfg.reverse_post_order(),
        Direction::Backward => {
            let mut rpo = cfg.reverse_post_order();
            rpo.reverse();
            rpo
        }
    };

    let mut worklist: Vec<NodeIndex> = order;
    let mut queued: HashMap<NodeIndex, bool> = cfg.nodes().map(|n| (n, true)).collect();

    while let Some(node) = worklist.pop() {
        queued.insert(node, false);
        let preds = pred_of(node);
        let new_in = if preds.is_empty() {
            flow_in[&node].clone()
        } else {
            analysis.merge(preds.iter().map(|p| &flow_out[p]))
        };
        flow_in.insert(node, new_in.clone());
        let new_out = analysis.transfer(cfg, node, &new_in);
        if new_out != flow_out[&node] {
            flow_out.insert(node, new_out);
            for succ in succ_of(node) {
                if !queued.get(&succ).copied().unwrap_or(false) {
                    worklist.insert(0, succ);
                    queued.insert(succ, true);
                }
            }
        }
    }

    match analysis.direction() {
        Direction::Forward => DataflowResult { in_sets: flow_in, out_sets: flow_out },
        Direction::Backward => DataflowResult { in_sets: flow_out, out_sets: flow_in },
    }
}
