use clap::Parser;
use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tacvm::cfg::build::construct_cfg;
use tacvm::cfg::dot::write_dot;
use tacvm::cfg::serialize::cfg_to_function;
use tacvm::cli::{Args, Command, IoArgs};
use tacvm::dom::{loops::discover_loops, DominanceInfo};
use tacvm::error::{reporter, ToolError};
use tacvm::interp::Interpreter;
use tacvm::ir::json::{parse_program, program_to_json};
use tacvm::opt::run_pass;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = reporter::report(&err);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run(command: Command) -> Result<(), ToolError> {
    match command {
        Command::Interp { io, count } => run_interp(&io, count),
        Command::Opt { io, pass } => run_opt(&io, pass),
        Command::Cfg { io } => run_cfg(&io),
        Command::Dom { io } => run_dom(&io),
    }
}

fn read_input(io: &IoArgs) -> Result<String, ToolError> {
    let mut text = String::new();
    match &io.input {
        Some(path) => {
            text = std::fs::read_to_string(path)?;
        }
        None => {
            std::io::stdin().read_to_string(&mut text)?;
        }
    }
    Ok(text)
}

fn write_output(io: &IoArgs, text: &str) -> Result<(), ToolError> {
    match &io.output {
        Some(path) => std::fs::write(path, text)?,
        None => {
            print!("{text}");
            std::io::stdout().flush()?;
        }
    }
    Ok(())
}

fn run_interp(io: &IoArgs, count: bool) -> Result<(), ToolError> {
    let text = read_input(io)?;
    let program = parse_program(&text)?;
    program.require_main()?;

    let mut interpreter = Interpreter::new(&program);
    let (output, outcome) = interpreter.run()?;
    for line in output {
        println!("{line}");
    }
    if count {
        println!("Executed {} instructions.", outcome.instructions_executed);
    }
    Ok(())
}

fn run_opt(io: &IoArgs, pass: tacvm::opt::Pass) -> Result<(), ToolError> {
    let text = read_input(io)?;
    let mut program = parse_program(&text)?;
    program.require_main()?;

    for func in &mut program.functions {
        let mut cfg = construct_cfg(func)?;
        tracing::debug!(function = %func.name, "running pass");
        run_pass(pass, &mut cfg);
        cfg.verify().map_err(tacvm::error::optimizer_error::OptimizerError::MalformedCfg)?;
        *func = cfg_to_function(&cfg, &func.name);
    }

    let pretty = is_terminal_output(&io.output);
    let out = program_to_json(&program, pretty)?;
    write_output(io, &format!("{out}\n"))
}

fn run_cfg(io: &IoArgs) -> Result<(), ToolError> {
    let text = read_input(io)?;
    let program = parse_program(&text)?;

    let mut rendered = String::new();
    for func in &program.functions {
        let cfg = construct_cfg(func)?;
        rendered.push_str(&write_dot(&cfg, &func.name));
    }
    write_output(io, &rendered)
}

fn run_dom(io: &IoArgs) -> Result<(), ToolError> {
    let text = read_input(io)?;
    let program = parse_program(&text)?;

    for func in &program.functions {
        let cfg = construct_cfg(func)?;
        let dom = DominanceInfo::compute(&cfg);
        let loop_count = discover_loops(&cfg, &dom).len();
        eprintln!("function {}: {} block(s), {} natural loop(s)", func.name, cfg.node_count(), loop_count);
        for idx in cfg.nodes() {
            if let Some(idom) = dom.immediate_dominator(idx) {
                eprintln!("  idom({}) = {}", cfg.node(idx).name, cfg.node(idom).name);
            }
        }
    }
    Ok(())
}

fn is_terminal_output(output: &Option<PathBuf>) -> bool {
    output.is_none() && std::io::stdout().is_terminal()
}
