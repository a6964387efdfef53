//! Literal constants carried by `const` instructions.
//!
//! Integers are arbitrary-precision: the interpreter must not truncate, so
//! literals and all arithmetic are backed by [`BigInt`] rather than a
//! fixed-width machine integer.

use num_bigint::BigInt;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(BigInt),
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}
