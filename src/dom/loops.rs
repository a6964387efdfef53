//! Natural-loop discovery (§4.4).

use super::DominanceInfo;
use crate::cfg::ControlFlowGraph;
use petgraph::graph::NodeIndex;
use std::collections::HashSet;

/// One back edge's natural loop: `header` dominates `tail`, and `body` is
/// every node that can reach `tail` without passing through `header` (plus
/// `header` itself).
#[derive(Debug, Clone)]
pub struct NaturalLoop {
    pub header: NodeIndex,
    pub tail: NodeIndex,
    pub body: HashSet<NodeIndex>,
}

/// Finds every back edge in `cfg` and computes its natural loop. Two back
/// edges sharing a header yield two separate [`NaturalLoop`] records in
/// back-edge-discovery order; no merging is performed (§4.4, Open Question 2
/// defers deduplication to the induction-variable pass).
#[must_use]
pub fn discover_loops(cfg: &ControlFlowGraph, dom: &DominanceInfo) -> Vec<NaturalLoop> {
    let mut loops = Vec::new();
    for node in cfg.nodes() {
        for &succ in cfg.successors(node) {
            if dom.is_back_edge(node, succ) {
                loops.push(natural_loop(cfg, succ, node));
            }
        }
    }
    loops
}

/// Reverse BFS over predecessors starting at `tail`, with `header`
/// pre-visited so the walk stops there.
fn natural_loop(cfg: &ControlFlowGraph, header: NodeIndex, tail: NodeIndex) -> NaturalLoop {
    let mut body = HashSet::new();
    body.insert(header);
    let mut stack = vec![tail];
    body.insert(tail);
    while let Some(node) = stack.pop() {
        for &pred in cfg.predecessors(node) {
            if body.insert(pred) {
                stack.push(pred);
            }
        }
    }
    NaturalLoop { header, tail, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::build::construct_cfg;
    use crate::dom::DominanceInfo;
    use crate::ir::{BinOp, Function, Instruction, Item, Literal, Type};
    use num_bigint::BigInt;

    /// `i = 0; loop: cond = lt i n; br cond body end; body: i = add i one; jmp loop; end: ret`
    fn counting_loop() -> Function {
        Function::new(
            "main",
            vec![
                Item::Instr(Instruction::Const { dest: "i".into(), ty: Type::Int, value: Literal::Int(BigInt::from(0)) }),
                Item::Instr(Instruction::Const { dest: "n".into(), ty: Type::Int, value: Literal::Int(BigInt::from(3)) }),
                Item::Instr(Instruction::Const { dest: "one".into(), ty: Type::Int, value: Literal::Int(BigInt::from(1)) }),
                Item::Label("loop".into()),
                Item::Instr(Instruction::Binary { dest: "cond".into(), ty: Type::Bool, op: BinOp::Lt, lhs: "i".into(), rhs: "n".into() }),
                Item::Instr(Instruction::Br { cond: "cond".into(), then_label: "body".into(), else_label: "end".into() }),
                Item::Label("body".into()),
                Item::Instr(Instruction::Binary { dest: "i".into(), ty: Type::Int, op: BinOp::Add, lhs: "i".into(), rhs: "one".into() }),
                Item::Instr(Instruction::Jmp { label: "loop".into() }),
                Item::Label("end".into()),
                Item::Instr(Instruction::Ret),
            ],
        )
    }

    #[test]
    fn back_edge_from_body_to_header_forms_one_loop() {
        let func = counting_loop();
        let cfg = construct_cfg(&func).unwrap();
        let dom = DominanceInfo::compute(&cfg);
        let loops = discover_loops(&cfg, &dom);
        assert_eq!(loops.len(), 1);

        let header = cfg.find_by_name("loop").unwrap();
        let body = cfg.find_by_name("body").unwrap();
        assert_eq!(loops[0].header, header);
        assert_eq!(loops[0].tail, body);
        assert!(loops[0].body.contains(&header));
        assert!(loops[0].body.contains(&body));
        assert!(!loops[0].body.contains(&cfg.find_by_name("end").unwrap()));
    }
}
