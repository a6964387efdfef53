//! CFG construction from a function's linear item list (§4.1).

use super::{ControlFlowGraph, Terminator};
use crate::error::ir_error::IrError;
use crate::ir::{Function, Instruction, Item};
use std::collections::{HashMap, HashSet};

struct BuiltBlock {
    name: String,
    instrs: Vec<Instruction>,
    terminator: Option<Terminator>,
}

/// Builds the CFG for one function, including fall-through normalization,
/// label resolution, and unreachable-block pruning.
pub fn construct_cfg(func: &Function) -> Result<ControlFlowGraph, IrError> {
    let user_labels: HashSet<&str> = func
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Label(l) => Some(l.as_str()),
            Item::Instr(_) => None,
        })
        .collect();

    let blocks = split_blocks(func, &user_labels)?;
    let name_to_pos: HashMap<&str, usize> = blocks.iter().enumerate().map(|(i, b)| (b.name.as_str(), i)).collect();

    for block in &blocks {
        if let Some(term) = &block.terminator {
            for target in term.targets() {
                if !name_to_pos.contains_key(target) {
                    return Err(IrError::UnknownLabel(block.name.clone(), target.to_string()));
                }
            }
        }
    }

    let reachable = reachable_positions(&blocks, &name_to_pos);

    let mut cfg = ControlFlowGraph::empty();
    let mut pos_to_node = HashMap::new();
    for (pos, block) in blocks.iter().enumerate() {
        if !reachable.contains(&pos) {
            continue;
        }
        let terminator = block.terminator.clone().unwrap_or(Terminator::Ret);
        let idx = cfg.add_block(block.name.clone(), block.instrs.clone(), terminator, Some(pos));
        pos_to_node.insert(pos, idx);
    }

    if let Some(&first) = pos_to_node.get(&0) {
        cfg.connect(cfg.entry(), first);
    } else {
        cfg.connect(cfg.entry(), cfg.exit());
    }

    for (pos, block) in blocks.iter().enumerate() {
        let Some(&from) = pos_to_node.get(&pos) else { continue };
        let term = block.terminator.as_ref().unwrap_or(&Terminator::Ret);
        match term {
            Terminator::Ret => cfg.connect(from, cfg.exit()),
            _ => {
                for target in term.targets() {
                    let target_pos = name_to_pos[target];
                    let to = pos_to_node[&target_pos];
                    cfg.connect(from, to);
                }
            }
        }
    }

    Ok(cfg)
}

/// Splits the item list into blocks in text order, closing at label
/// boundaries and at terminators, giving anonymous blocks fresh names.
fn split_blocks(func: &Function, user_labels: &HashSet<&str>) -> Result<Vec<BuiltBlock>, IrError> {
    let mut blocks = Vec::new();
    let mut seen_labels = HashSet::new();
    let mut fresh_counter = 0usize;

    let mut cur_label: Option<String> = None;
    let mut cur_instrs: Vec<Instruction> = Vec::new();
    let mut has_pending = true;

    let mut fresh_name = |counter: &mut usize| -> String {
        loop {
            let candidate = format!("__block_{counter}");
            *counter += 1;
            if !user_labels.contains(candidate.as_str()) {
                return candidate;
            }
        }
    };

    let mut close = |label: Option<String>, instrs: Vec<Instruction>, blocks: &mut Vec<BuiltBlock>, counter: &mut usize| {
        let nop_stripped_empty = instrs.iter().all(|i| matches!(i, Instruction::Nop));
        if label.is_none() && nop_stripped_empty {
            return;
        }
        let name = label.unwrap_or_else(|| fresh_name(counter));
        let instrs: Vec<Instruction> = instrs.into_iter().filter(|i| !matches!(i, Instruction::Nop)).collect();
        blocks.push(BuiltBlock { name, instrs, terminator: None });
    };

    for item in &func.items {
        match item {
            Item::Label(label) => {
                if !seen_labels.insert(label.clone()) {
                    return Err(IrError::DuplicateBlockName(label.clone(), func.name.clone()));
                }
                if has_pending {
                    close(cur_label.take(), std::mem::take(&mut cur_instrs), &mut blocks, &mut fresh_counter);
                }
                cur_label = Some(label.clone());
                cur_instrs = Vec::new();
                has_pending = true;
            }
            Item::Instr(instr) if instr.is_terminator() => {
                let terminator = Terminator::from_instruction(instr);
                let name = cur_label.take().unwrap_or_else(|| fresh_name(&mut fresh_counter));
                let instrs: Vec<Instruction> =
                    std::mem::take(&mut cur_instrs).into_iter().filter(|i| !matches!(i, Instruction::Nop)).collect();
                blocks.push(BuiltBlock { name, instrs, terminator });
                has_pending = false;
            }
            Item::Instr(instr) => {
                if !has_pending {
                    cur_label = None;
                    cur_instrs = Vec::new();
                    has_pending = true;
                }
                cur_instrs.push(instr.clone());
            }
        }
    }
    if has_pending {
        close(cur_label, cur_instrs, &mut blocks, &mut fresh_counter);
    }

    // Fall-through normalization: every block still missing a terminator
    // jumps to its text-order successor, or returns if it is last.
    let len = blocks.len();
    for i in 0..len {
        if blocks[i].terminator.is_none() {
            blocks[i].terminator = Some(if i + 1 < len {
                Terminator::Jmp { label: blocks[i + 1].name.clone() }
            } else {
                Terminator::Ret
            });
        }
    }

    Ok(blocks)
}

/// Forward BFS over terminator-derived edges, starting at the first block
/// (position 0). A block is reachable iff it is on some path from the
/// function's entry point.
fn reachable_positions(blocks: &[BuiltBlock], name_to_pos: &HashMap<&str, usize>) -> HashSet<usize> {
    let mut visited = HashSet::new();
    if blocks.is_empty() {
        return visited;
    }
    let mut queue = vec![0usize];
    visited.insert(0usize);
    while let Some(pos) = queue.pop() {
        let term = blocks[pos].terminator.as_ref().unwrap_or(&Terminator::Ret);
        for target in term.targets() {
            let target_pos = name_to_pos[target];
            if visited.insert(target_pos) {
                queue.push(target_pos);
            }
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOp, Literal, Type};
    use num_bigint::BigInt;

    fn konst(dest: &str, n: i64) -> Instruction {
        Instruction::Const { dest: dest.to_string(), ty: Type::Int, value: Literal::Int(BigInt::from(n)) }
    }

    #[test]
    fn straight_line_function_is_one_block() {
        let func = Function::new(
            "main",
            vec![
                Item::Instr(konst("a", 3)),
                Item::Instr(konst("b", 4)),
                Item::Instr(Instruction::Binary {
                    dest: "c".into(),
                    ty: Type::Int,
                    op: BinOp::Add,
                    lhs: "a".into(),
                    rhs: "b".into(),
                }),
                Item::Instr(Instruction::Print { args: vec!["c".into()] }),
            ],
        );
        let cfg = construct_cfg(&func).unwrap();
        // entry, one real block, exit.
        assert_eq!(cfg.node_count(), 3);
        cfg.verify().unwrap();
    }

    #[test]
    fn missing_terminator_falls_through_to_ret() {
        let func = Function::new("main", vec![Item::Instr(konst("a", 1))]);
        let cfg = construct_cfg(&func).unwrap();
        let real = cfg.nodes().find(|&n| n != cfg.entry() && n != cfg.exit()).unwrap();
        assert_eq!(cfg.node(real).terminator, Some(Terminator::Ret));
        assert!(cfg.successors(real).contains(&cfg.exit()));
    }

    #[test]
    fn unreachable_labeled_block_is_pruned() {
        let func = Function::new(
            "main",
            vec![
                Item::Instr(Terminator::Jmp { label: "end".into() }.to_instruction()),
                Item::Label("l".into()),
                Item::Instr(konst("x", 1)),
                Item::Instr(Instruction::Print { args: vec!["x".into()] }),
                Item::Label("end".into()),
                Item::Instr(Instruction::Ret),
            ],
        );
        let cfg = construct_cfg(&func).unwrap();
        assert!(cfg.find_by_name("l").is_none());
        assert!(cfg.find_by_name("end").is_some());
        cfg.verify().unwrap();
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let func = Function::new(
            "main",
            vec![Item::Label("l".into()), Item::Label("l".into()), Item::Instr(Instruction::Ret)],
        );
        assert!(matches!(construct_cfg(&func), Err(IrError::DuplicateBlockName(..))));
    }

    #[test]
    fn unknown_jump_target_is_rejected() {
        let func = Function::new("main", vec![Item::Instr(Terminator::Jmp { label: "nowhere".into() }.to_instruction())]);
        assert!(matches!(construct_cfg(&func), Err(IrError::UnknownLabel(..))));
    }
}
