//! Error taxonomy for the toolchain (§7).
//!
//! Each tool invocation runs exactly one program and fails fast: there is no
//! retry or recovery path, only a typed error that the CLI renders as a
//! one-line diagnostic before exiting non-zero (see [`reporter`]).

pub mod ir_error;
pub mod optimizer_error;
pub mod reporter;
pub mod runtime_error;

use ir_error::IrError;
use optimizer_error::OptimizerError;
use runtime_error::RuntimeError;
use thiserror::Error;

/// Aggregates every error kind the CLI boundary can surface.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Ir(#[from] IrError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
