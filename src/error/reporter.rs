//! Renders a [`ToolError`] as a one-line diagnostic and picks the process
//! exit code, mirroring the teacher's `error::error_reporter` module but
//! without source spans: the IL carries no textual source locations, only
//! function/block/variable names.

use super::ToolError;

/// Prints `error: <message>` to stderr (also emitted at `tracing::error!`
/// level for structured log consumers) and returns the exit code the CLI
/// should use.
pub fn report(err: &ToolError) -> i32 {
    tracing::error!(error = %err, "tool invocation failed");
    eprintln!("error: {err}");
    1
}
