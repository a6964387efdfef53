//! Expression trees for induction-variable descriptors (§3 "Induction-variable
//! descriptor", §4.8). Leaves are either a loop-invariant variable or an
//! integer constant; internal nodes are the three combinators the pass
//! needs to rebuild a derived variable's scale/offset.

use crate::ir::{BinOp, Instruction, Type};
use num_bigint::BigInt;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Var(String),
    Const(BigInt),
    Add(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    PtrAdd(Box<Expr>, Box<Expr>),
}

impl Expr {
    #[must_use]
    pub fn one() -> Self {
        Expr::Const(BigInt::from(1))
    }

    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Expr::Add(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        Expr::Mul(Box::new(self), Box::new(other))
    }
}

/// Lowers an expression tree to a sequence of instructions appended to
/// `out`, consulting/populating `memo` so identical trees are materialized
/// exactly once and share the resulting name (§4.8 step 1, Open Question 4).
pub fn materialize(expr: &Expr, ty: &Type, out: &mut Vec<Instruction>, memo: &mut HashMap<Expr, String>, fresh: &mut impl FnMut() -> String) -> String {
    if let Some(name) = memo.get(expr) {
        return name.clone();
    }
    let name = match expr {
        Expr::Var(v) => v.clone(),
        Expr::Const(c) => {
            let dest = fresh();
            out.push(Instruction::Const { dest: dest.clone(), ty: Type::Int, value: crate::ir::Literal::Int(c.clone()) });
            dest
        }
        Expr::Add(lhs, rhs) => {
            let l = materialize(lhs, &Type::Int, out, memo, fresh);
            let r = materialize(rhs, &Type::Int, out, memo, fresh);
            let dest = fresh();
            out.push(Instruction::Binary { dest: dest.clone(), ty: ty.clone(), op: BinOp::Add, lhs: l, rhs: r });
            dest
        }
        Expr::Mul(lhs, rhs) => {
            let l = materialize(lhs, &Type::Int, out, memo, fresh);
            let r = materialize(rhs, &Type::Int, out, memo, fresh);
            let dest = fresh();
            out.push(Instruction::Binary { dest: dest.clone(), ty: Type::Int, op: BinOp::Mul, lhs: l, rhs: r });
            dest
        }
        Expr::PtrAdd(ptr, offset) => {
            let p = materialize(ptr, ty, out, memo, fresh);
            let o = materialize(offset, &Type::Int, out, memo, fresh);
            let dest = fresh();
            out.push(Instruction::PtrAdd { dest: dest.clone(), ty: ty.clone(), ptr: p, offset: o });
            dest
        }
    };
    memo.insert(expr.clone(), name.clone());
    name
}
