//! Malformed-IR and label-resolution errors (§7 kinds 1 and 4).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IrError {
    #[error("unknown opcode '{0}'")]
    UnknownOpcode(String),

    #[error("instruction '{op}' expects {expected} argument(s), got {got}")]
    WrongArgCount { op: String, expected: usize, got: usize },

    #[error("instruction '{op}' is missing required field '{field}'")]
    MissingField { op: String, field: &'static str },

    #[error("invalid type descriptor: {0}")]
    InvalidType(String),

    #[error("invalid literal value for '{op}': {0}", op = "const")]
    InvalidLiteral(String),

    #[error("program has no function named 'main'")]
    MissingMain,

    #[error("'{0}' refers to non-existent label '{1}'")]
    UnknownLabel(String, String),

    #[error("duplicate block name '{0}' in function '{1}'")]
    DuplicateBlockName(String, String),
}
