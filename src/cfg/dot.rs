//! GraphViz rendering of a [`ControlFlowGraph`] for the `cfg` subcommand
//! (§6), grounded in the pretty-printing conventions of the wider ecosystem's
//! own CFG printers (record-shaped nodes, one `parent -> child` line per
//! edge).

use super::ControlFlowGraph;
use std::fmt::Write as _;

/// Writes `digraph <fname> { ... }` with one record-shaped node per block
/// (its name plus straight-line instructions) and one edge per successor.
pub fn write_dot(cfg: &ControlFlowGraph, fname: &str) -> String {
    let mut out = String::new();
    writeln!(out, "digraph \"{fname}\" {{").unwrap();
    writeln!(out, "    node [shape=record];").unwrap();

    for idx in cfg.nodes() {
        let node = cfg.node(idx);
        let mut label = escape(&node.name);
        for instr in &node.instrs {
            let _ = write!(label, "\\l{}", escape_instr(instr));
        }
        if let Some(term) = &node.terminator {
            let _ = write!(label, "\\l{}", escape(&term.to_string()));
        }
        label.push_str("\\l");
        writeln!(out, "    n{} [label=\"{{{label}}}\"];", idx.index()).unwrap();
    }

    for idx in cfg.nodes() {
        for &succ in cfg.successors(idx) {
            writeln!(out, "    n{} -> n{};", idx.index(), succ.index()).unwrap();
        }
    }

    out.push_str("}\n");
    out
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_instr(instr: &crate::ir::Instruction) -> String {
    escape(&instr.to_string())
}
