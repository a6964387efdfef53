//! Command-line surface (§6): `interp`, `opt`, `cfg`, `dom`.

use crate::opt::Pass;
use clap::{
    Parser, Subcommand, ValueHint,
    builder::{Styles, styling::{AnsiColor, Effects}},
};
use std::path::PathBuf;

const HELP_STR: &str = r#"
{before-help}{name} {version}
{author-with-newline}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"#;

/// Custom styles for clap, matched to the teacher's palette.
pub fn custom_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightMagenta.on_default() | Effects::BOLD)
        .error(AnsiColor::BrightRed.on_default() | Effects::BOLD)
        .valid(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .invalid(AnsiColor::BrightYellow.on_default() | Effects::BOLD | Effects::UNDERLINE)
        .placeholder(AnsiColor::BrightBlue.on_default())
        .usage(AnsiColor::BrightCyan.on_default() | Effects::BOLD | Effects::UNDERLINE)
}

#[derive(Parser, Debug)]
#[command(
    version = clap::crate_version!(),
    author = clap::crate_authors!("\n"),
    about,
    long_about = None,
    help_template = HELP_STR,
    styles = custom_styles()
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Raise log verbosity (`-v` = debug, `-vv` = trace). Overrides `RUST_LOG`.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Shared input/output pair for subcommands that read a program and
/// (optionally) write one back out.
#[derive(clap::Args, Debug)]
pub struct IoArgs {
    /// Input file (defaults to stdin).
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Output file (defaults to stdout).
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute `main` and print its `print` output.
    Interp {
        #[command(flatten)]
        io: IoArgs,

        /// Report the number of instructions executed.
        #[arg(long)]
        count: bool,
    },

    /// Run an optimization pass and emit the optimized program.
    Opt {
        #[command(flatten)]
        io: IoArgs,

        /// Which pass to run.
        #[arg(short = 'n', long, value_enum)]
        pass: Pass,
    },

    /// Emit a GraphViz rendering of every function's CFG.
    Cfg {
        #[command(flatten)]
        io: IoArgs,
    },

    /// Dump CFG structure, dominance, loops, and dataflow results.
    Dom {
        #[command(flatten)]
        io: IoArgs,
    },
}
