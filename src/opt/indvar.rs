//! Loop induction-variable strength reduction with basic-variable
//! elimination (§4.8). Named `licm` on the CLI for the loop-invariant-code-
//! motion flavor of its pre-header insertion.

use super::expr::{materialize, Expr};
use crate::analysis::{self, LiveVars};
use crate::cfg::{mutate, ControlFlowGraph, Terminator};
use crate::dom::{discover_loops, DominanceInfo, NaturalLoop};
use crate::ir::{BinOp, Instruction, Type};
use petgraph::graph::NodeIndex;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Int,
    Ptr,
}

impl Kind {
    fn ty(self) -> Type {
        match self {
            Kind::Int => Type::Int,
            Kind::Ptr => Type::Ptr(Box::new(Type::Int)),
        }
    }
}

#[derive(Debug, Clone)]
struct BasicIv {
    name: String,
    step_var: String,
    kind: Kind,
    def_site: (NodeIndex, usize),
}

#[derive(Debug, Clone)]
struct DerivedIv {
    name: String,
    base: String,
    a: Expr,
    b: Option<Expr>,
    kind: Kind,
    def_site: (NodeIndex, usize),
}

/// Runs the pass over every natural loop in `cfg`, deduplicated by header
/// (Open Question 2). Returns the number of loops actually transformed.
pub fn run(cfg: &mut ControlFlowGraph) -> usize {
    let dom = DominanceInfo::compute(cfg);
    let loops = discover_loops(cfg, &dom);
    let mut seen_headers = HashSet::new();
    let mut transformed = 0;
    for natural_loop in loops {
        if !seen_headers.insert(natural_loop.header) {
            continue;
        }
        if process_loop(cfg, &natural_loop) {
            transformed += 1;
        }
    }
    transformed
}

fn defs_in_body(cfg: &ControlFlowGraph, body: &HashSet<NodeIndex>, var: &str) -> Vec<(NodeIndex, usize)> {
    let mut out = Vec::new();
    for &block in body {
        for (i, instr) in cfg.node(block).instrs.iter().enumerate() {
            if instr.dest() == Some(var) {
                out.push((block, i));
            }
        }
    }
    out
}

fn is_loop_invariant(cfg: &ControlFlowGraph, body: &HashSet<NodeIndex>, var: &str) -> bool {
    let defs = defs_in_body(cfg, body, var);
    match defs.len() {
        0 => true,
        1 => matches!(cfg.node(defs[0].0).instrs[defs[0].1], Instruction::Const { .. }),
        _ => false,
    }
}

fn find_basic_ivs(cfg: &ControlFlowGraph, body: &HashSet<NodeIndex>) -> HashMap<String, BasicIv> {
    let mut out = HashMap::new();
    for &block in body {
        for (i, instr) in cfg.node(block).instrs.iter().enumerate() {
            let candidate = match instr {
                Instruction::Binary { dest, op: BinOp::Add, lhs, rhs, .. } if lhs == dest && is_loop_invariant(cfg, body, rhs) => {
                    Some((dest.clone(), rhs.clone(), Kind::Int))
                }
                Instruction::Binary { dest, op: BinOp::Add, lhs, rhs, .. } if rhs == dest && is_loop_invariant(cfg, body, lhs) => {
                    Some((dest.clone(), lhs.clone(), Kind::Int))
                }
                Instruction::PtrAdd { dest, ptr, offset, .. } if ptr == dest && is_loop_invariant(cfg, body, offset) => {
                    Some((dest.clone(), offset.clone(), Kind::Ptr))
                }
                _ => None,
            };
            if let Some((name, step_var, kind)) = candidate {
                if defs_in_body(cfg, body, &name).len() == 1 {
                    out.insert(name.clone(), BasicIv { name, step_var, kind, def_site: (block, i) });
                }
            }
        }
    }
    out
}

fn find_derived_ivs(cfg: &ControlFlowGraph, body: &HashSet<NodeIndex>, basics: &HashMap<String, BasicIv>) -> HashMap<String, DerivedIv> {
    let mut derived: HashMap<String, DerivedIv> = HashMap::new();
    loop {
        let mut found_new = false;
        for &block in body {
            for (i, instr) in cfg.node(block).instrs.iter().enumerate() {
                let (dest, op, x, y, ty) = match instr {
                    Instruction::Binary { dest, op: op @ (BinOp::Add | BinOp::Mul), lhs, rhs, ty } => {
                        (dest.clone(), *op, lhs.clone(), rhs.clone(), ty.clone())
                    }
                    Instruction::PtrAdd { dest, ptr, offset, ty } => {
                        (dest.clone(), BinOp::Add, ptr.clone(), offset.clone(), ty.clone())
                    }
                    _ => continue,
                };
                if basics.contains_key(&dest) || derived.contains_key(&dest) {
                    continue;
                }
                if defs_in_body(cfg, body, &dest).len() != 1 {
                    continue;
                }
                let iv_operand = if basics.contains_key(&x) || derived.contains_key(&x) {
                    Some((x.clone(), y.clone()))
                } else if basics.contains_key(&y) || derived.contains_key(&y) {
                    Some((y.clone(), x.clone()))
                } else {
                    None
                };
                let Some((j_name, m_name)) = iv_operand else { continue };
                if !is_loop_invariant(cfg, body, &m_name) {
                    continue;
                }
                let (base, a_j, b_j, kind) = if let Some(basic) = basics.get(&j_name) {
                    (basic.name.clone(), Expr::one(), None, basic.kind)
                } else {
                    let d = &derived[&j_name];
                    (d.base.clone(), d.a.clone(), d.b.clone(), d.kind)
                };
                let m = Expr::Var(m_name);
                let (a, b) = match op {
                    BinOp::Add => (a_j.clone(), Some(b_j.clone().map_or_else(|| m.clone(), |b| b.add(m.clone())))),
                    BinOp::Mul => (
                        m.clone().mul(a_j.clone()),
                        b_j.map(|b| m.clone().mul(b)),
                    ),
                    _ => continue,
                };
                derived.insert(dest.clone(), DerivedIv { name: dest, base, a, b, kind, def_site: (block, i) });
                found_new = true;
            }
        }
        if !found_new {
            break;
        }
    }
    derived
}

fn process_loop(cfg: &mut ControlFlowGraph, natural_loop: &NaturalLoop) -> bool {
    let body = &natural_loop.body;
    let header = natural_loop.header;

    let basics = find_basic_ivs(cfg, body);
    let derived = find_derived_ivs(cfg, body, &basics);
    if basics.is_empty() {
        return false;
    }

    let header_name = cfg.node(header).name.clone();
    let pre_header_name = format!("{header_name}_preentry");
    let pre_header = cfg.add_block(pre_header_name, Vec::new(), Terminator::Jmp { label: header_name }, None);
    mutate::set_successor(cfg, pre_header, header);

    let back_edge_sources: HashSet<NodeIndex> = body.iter().copied().filter(|&n| n != header).collect();
    mutate::add_header(cfg, header, pre_header, &back_edge_sources);

    // Previous loops in this run() may have mutated the CFG (pre-header
    // insertion, edge rerouting), so dominance is recomputed fresh per loop
    // rather than reused from the single compute in run().
    let dom = DominanceInfo::compute(cfg);
    let pre_order = dom.pre_order(cfg.entry());
    let order_key = |site: (NodeIndex, usize)| (pre_order.iter().position(|&n| n == site.0).unwrap_or(usize::MAX), site.1);

    let mut memo: HashMap<Expr, String> = HashMap::new();
    let mut fresh_counter = 0usize;
    let mut preheader_instrs: Vec<Instruction> = Vec::new();
    let mut fresh = || {
        fresh_counter += 1;
        format!("__indvar_{fresh_counter}")
    };

    let mut surrogate_of: HashMap<String, (String, Expr, Option<Expr>)> = HashMap::new();
    let mut first_derived_for_base: HashMap<String, String> = HashMap::new();
    for d in derived.values() {
        first_derived_for_base
            .entry(d.base.clone())
            .and_modify(|cur| {
                if order_key(d.def_site) < order_key(derived[cur].def_site) {
                    *cur = d.name.clone();
                }
            })
            .or_insert_with(|| d.name.clone());
    }

    for d in derived.values() {
        let ty = d.kind.ty();
        let a_name = materialize(&d.a, &ty, &mut preheader_instrs, &mut memo, &mut fresh);
        let b_name = d.b.as_ref().map(|b| materialize(b, &ty, &mut preheader_instrs, &mut memo, &mut fresh));

        let basic = &basics[&d.base];
        let t_name = fresh();
        let scaled = match d.kind {
            Kind::Int => Instruction::Binary { dest: t_name.clone(), ty: ty.clone(), op: BinOp::Mul, lhs: basic.name.clone(), rhs: a_name.clone() },
            Kind::Ptr => Instruction::PtrAdd { dest: t_name.clone(), ty: ty.clone(), ptr: basic.name.clone(), offset: a_name.clone() },
        };
        preheader_instrs.push(scaled);
        let t_final = if let Some(b_name) = &b_name {
            let combined = fresh();
            let instr = match d.kind {
                Kind::Int => Instruction::Binary { dest: combined.clone(), ty: ty.clone(), op: BinOp::Add, lhs: t_name.clone(), rhs: b_name.clone() },
                Kind::Ptr => Instruction::PtrAdd { dest: combined.clone(), ty: ty.clone(), ptr: t_name.clone(), offset: b_name.clone() },
            };
            preheader_instrs.push(instr);
            combined
        } else {
            t_name
        };

        for &block in body.iter() {
            if let Some(pos) = cfg.node(block).instrs.iter().position(|i| i.dest() == Some(d.name.as_str())) {
                cfg.node_mut(block).instrs[pos] = Instruction::Id { dest: d.name.clone(), ty: ty.clone(), src: t_final.clone() };
            }
        }

        // t must advance by a * basic.step_var each iteration, not by a
        // alone: if t = a*i + b and i itself steps by basic.step_var, then
        // t steps by a*basic.step_var. Both operands are loop-invariant, so
        // the product is computed once in the pre-header.
        let step_delta_expr = Expr::Var(a_name.clone()).mul(Expr::Var(basic.step_var.clone()));
        let step_delta = materialize(&step_delta_expr, &Type::Int, &mut preheader_instrs, &mut memo, &mut fresh);

        let (update_block, update_idx) = basic.def_site;
        let step_instr = match d.kind {
            Kind::Int => Instruction::Binary { dest: t_final.clone(), ty: ty.clone(), op: BinOp::Add, lhs: t_final.clone(), rhs: step_delta.clone() },
            Kind::Ptr => Instruction::PtrAdd { dest: t_final.clone(), ty: ty.clone(), ptr: t_final.clone(), offset: step_delta.clone() },
        };
        cfg.node_mut(update_block).instrs.insert(update_idx + 1, step_instr);

        if first_derived_for_base.get(&d.base) == Some(&d.name) {
            surrogate_of.insert(d.base.clone(), (t_final.clone(), d.a.clone(), d.b.clone()));
        }
    }

    for basic in basics.values() {
        let Some((t, a, b)) = surrogate_of.get(&basic.name) else { continue };
        rewrite_comparisons(cfg, body, basic, t, a, b.as_ref(), &mut memo, &mut preheader_instrs, &mut fresh);
    }

    cfg.node_mut(pre_header).instrs = preheader_instrs;

    eliminate_basic_ivs(cfg, &dom, natural_loop, &basics);

    true
}

/// Rewrites every `lt` comparison against `basic` to compare the surrogate
/// `t` against `n` scaled by the same `a`/`b` used to build `t` (§4.8
/// "Comparison rewriting").
fn rewrite_comparisons(
    cfg: &mut ControlFlowGraph,
    body: &HashSet<NodeIndex>,
    basic: &BasicIv,
    surrogate: &str,
    a: &Expr,
    b: Option<&Expr>,
    memo: &mut HashMap<Expr, String>,
    preheader_instrs: &mut Vec<Instruction>,
    fresh: &mut impl FnMut() -> String,
) {
    let ty = basic.kind.ty();
    for &block in body.iter() {
        let len = cfg.node(block).instrs.len();
        for i in 0..len {
            let rewrite = match &cfg.node(block).instrs[i] {
                Instruction::Binary { op: BinOp::Lt, lhs, rhs, ty: cmp_ty, dest } if lhs == &basic.name => {
                    Some((dest.clone(), cmp_ty.clone(), true, rhs.clone()))
                }
                Instruction::Binary { op: BinOp::Lt, lhs, rhs, ty: cmp_ty, dest } if rhs == &basic.name => {
                    Some((dest.clone(), cmp_ty.clone(), false, lhs.clone()))
                }
                _ => None,
            };
            let Some((dest, cmp_ty, iv_is_lhs, other)) = rewrite else { continue };
            if !is_loop_invariant(cfg, body, &other) {
                continue;
            }
            let n_scaled_expr = Expr::Var(other.clone()).mul(a.clone());
            let n_scaled_expr = match b {
                Some(b) => n_scaled_expr.add(b.clone()),
                None => n_scaled_expr,
            };
            let n_scaled = materialize(&n_scaled_expr, &ty, preheader_instrs, memo, fresh);
            let op = if basic.kind == Kind::Ptr { BinOp::PtrLt } else { BinOp::Lt };
            let new_instr = if iv_is_lhs {
                Instruction::Binary { dest, ty: cmp_ty, op, lhs: surrogate.to_string(), rhs: n_scaled }
            } else {
                Instruction::Binary { dest, ty: cmp_ty, op, lhs: n_scaled, rhs: surrogate.to_string() }
            };
            cfg.node_mut(block).instrs[i] = new_instr;
        }
    }
}

fn eliminate_basic_ivs(cfg: &mut ControlFlowGraph, _dom: &DominanceInfo, natural_loop: &NaturalLoop, basics: &HashMap<String, BasicIv>) {
    let body = &natural_loop.body;
    let exits: Vec<NodeIndex> = body
        .iter()
        .flat_map(|&n| cfg.successors(n).iter().copied().collect::<Vec<_>>())
        .filter(|n| !body.contains(n))
        .collect();
    let live = analysis::run(cfg, &LiveVars);

    for basic in basics.values() {
        let live_outside = exits.iter().any(|&e| live.in_of(e).contains(&basic.name));
        if live_outside {
            continue;
        }
        let (def_block, def_idx) = basic.def_site;
        let used_elsewhere = body.iter().any(|&b| {
            cfg.node(b).instrs.iter().enumerate().any(|(i, instr)| {
                (b != def_block || i != def_idx) && instr.args().contains(&basic.name.as_str())
            })
        });
        if used_elsewhere {
            continue;
        }
        cfg.node_mut(def_block).instrs.remove(def_idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::build::construct_cfg;
    use crate::ir::{Function, Literal};
    use num_bigint::BigInt;

    fn konst(dest: &str, n: i64) -> Instruction {
        Instruction::Const { dest: dest.to_string(), ty: Type::Int, value: Literal::Int(BigInt::from(n)) }
    }

    /// `i = 0; loop: cond = lt i n; br cond body end; body: k = mul i c; print k; i = add i one; jmp loop; end: ret`
    fn scaling_loop() -> Function {
        Function::new(
            "main",
            vec![
                crate::ir::Item::Instr(konst("i", 0)),
                crate::ir::Item::Instr(konst("n", 3)),
                crate::ir::Item::Instr(konst("c", 5)),
                crate::ir::Item::Instr(konst("one", 1)),
                crate::ir::Item::Label("loop".into()),
                crate::ir::Item::Instr(Instruction::Binary { dest: "cond".into(), ty: Type::Bool, op: BinOp::Lt, lhs: "i".into(), rhs: "n".into() }),
                crate::ir::Item::Instr(Instruction::Br { cond: "cond".into(), then_label: "body".into(), else_label: "end".into() }),
                crate::ir::Item::Label("body".into()),
                crate::ir::Item::Instr(Instruction::Binary { dest: "k".into(), ty: Type::Int, op: BinOp::Mul, lhs: "i".into(), rhs: "c".into() }),
                crate::ir::Item::Instr(Instruction::Print { args: vec!["k".into()] }),
                crate::ir::Item::Instr(Instruction::Binary { dest: "i".into(), ty: Type::Int, op: BinOp::Add, lhs: "i".into(), rhs: "one".into() }),
                crate::ir::Item::Instr(Instruction::Jmp { label: "loop".into() }),
                crate::ir::Item::Label("end".into()),
                crate::ir::Item::Instr(Instruction::Ret),
            ],
        )
    }

    #[test]
    fn strength_reduction_removes_the_multiply_and_preserves_output() {
        let func = scaling_loop();
        let mut cfg = construct_cfg(&func).unwrap();
        let transformed = run(&mut cfg);
        assert_eq!(transformed, 1);
        cfg.verify().unwrap();

        let body = cfg.find_by_name("body").unwrap();
        assert!(!cfg.node(body).instrs.iter().any(|i| matches!(i, Instruction::Binary { op: BinOp::Mul, .. })));

        let output = crate::interp::Interpreter::new(&crate::ir::Program::new(vec![crate::cfg::serialize::cfg_to_function(&cfg, "main")]))
            .run()
            .unwrap()
            .0;
        assert_eq!(output, vec!["0".to_string(), "5".to_string(), "10".to_string()]);
    }

    /// Same shape as `scaling_loop`, but the basic induction variable steps
    /// by `two` instead of `one`: `i = 0; loop: cond = lt i n; br cond body
    /// end; body: k = mul i c; print k; i = add i two; jmp loop; end: ret`.
    fn scaling_loop_with_nonunit_step() -> Function {
        Function::new(
            "main",
            vec![
                crate::ir::Item::Instr(konst("i", 0)),
                crate::ir::Item::Instr(konst("n", 6)),
                crate::ir::Item::Instr(konst("c", 5)),
                crate::ir::Item::Instr(konst("two", 2)),
                crate::ir::Item::Label("loop".into()),
                crate::ir::Item::Instr(Instruction::Binary { dest: "cond".into(), ty: Type::Bool, op: BinOp::Lt, lhs: "i".into(), rhs: "n".into() }),
                crate::ir::Item::Instr(Instruction::Br { cond: "cond".into(), then_label: "body".into(), else_label: "end".into() }),
                crate::ir::Item::Label("body".into()),
                crate::ir::Item::Instr(Instruction::Binary { dest: "k".into(), ty: Type::Int, op: BinOp::Mul, lhs: "i".into(), rhs: "c".into() }),
                crate::ir::Item::Instr(Instruction::Print { args: vec!["k".into()] }),
                crate::ir::Item::Instr(Instruction::Binary { dest: "i".into(), ty: Type::Int, op: BinOp::Add, lhs: "i".into(), rhs: "two".into() }),
                crate::ir::Item::Instr(Instruction::Jmp { label: "loop".into() }),
                crate::ir::Item::Label("end".into()),
                crate::ir::Item::Instr(Instruction::Ret),
            ],
        )
    }

    #[test]
    fn strength_reduction_scales_the_step_by_the_basic_ivs_own_step() {
        let func = scaling_loop_with_nonunit_step();

        let unoptimized_cfg = construct_cfg(&func).unwrap();
        let unoptimized_output =
            crate::interp::Interpreter::new(&crate::ir::Program::new(vec![crate::cfg::serialize::cfg_to_function(&unoptimized_cfg, "main")]))
                .run()
                .unwrap()
                .0;
        assert_eq!(unoptimized_output, vec!["0".to_string(), "10".to_string(), "20".to_string()]);

        let mut cfg = construct_cfg(&func).unwrap();
        let transformed = run(&mut cfg);
        assert_eq!(transformed, 1);
        cfg.verify().unwrap();

        let body = cfg.find_by_name("body").unwrap();
        assert!(!cfg.node(body).instrs.iter().any(|i| matches!(i, Instruction::Binary { op: BinOp::Mul, .. })));

        let optimized_output = crate::interp::Interpreter::new(&crate::ir::Program::new(vec![crate::cfg::serialize::cfg_to_function(&cfg, "main")]))
            .run()
            .unwrap()
            .0;
        assert_eq!(optimized_output, unoptimized_output);
    }
}
