//! CLI entry point for the bus-script testbench.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use log as _;
use serde as _;
use serde_json as _;
use soc_core as _;
use soc_sim::{run_script, SimConfig};
#[cfg(test)]
use tempfile as _;
use thiserror as _;

const USAGE_TEXT: &str = "\
Usage: soc-sim <command> [options]

Commands:
  run <script>  Execute a bus script against the example system

Options:
  --latency <n>    Upstream wait ticks before each answer
  --max-stall <n>  Ticks a `hold` may stall before failing
  --config <file>  JSON configuration (flags override it)
  -q, --quiet      Print only the summary
  -h, --help       Show this help message

Set RUST_LOG to change log verbosity (default: warn).

Examples:
  soc-sim run bridge_write.bus
  soc-sim run bridge_read.bus --latency 4 --max-stall 64
";

#[derive(Debug, PartialEq, Eq, Default)]
struct RunArgs {
    script: PathBuf,
    latency: Option<u32>,
    max_stall: Option<u32>,
    config: Option<PathBuf>,
    quiet: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum ParseResult {
    Run(RunArgs),
    Help,
}

/// Parses the arguments after the program name; a help flag anywhere wins.
fn parse_args(args: &[OsString]) -> Result<ParseResult, String> {
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        return Ok(ParseResult::Help);
    }

    let (command, rest) = args
        .split_first()
        .ok_or_else(|| "missing command".to_string())?;
    match command.to_str() {
        Some("run") => parse_run_args(rest).map(ParseResult::Run),
        _ => Err(format!("unknown command: {}", command.to_string_lossy())),
    }
}

fn parse_run_args(args: &[OsString]) -> Result<RunArgs, String> {
    let mut script: Option<PathBuf> = None;
    let mut parsed = RunArgs::default();
    let mut args = args.iter();

    while let Some(arg) = args.next() {
        match arg.to_str() {
            Some("-q" | "--quiet") => parsed.quiet = true,
            Some("--latency") => parsed.latency = Some(parse_count("--latency", args.next())?),
            Some("--max-stall") => {
                parsed.max_stall = Some(parse_count("--max-stall", args.next())?);
            }
            Some("--config") => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --config".to_string())?;
                parsed.config = Some(PathBuf::from(value));
            }
            Some(flag) if flag.starts_with('-') => {
                return Err(format!("unknown option: {flag}"));
            }
            _ => {
                if script.is_some() {
                    return Err("multiple script paths provided".to_string());
                }
                script = Some(PathBuf::from(arg));
            }
        }
    }

    parsed.script = script.ok_or_else(|| "missing script path".to_string())?;
    Ok(parsed)
}

fn parse_count(flag: &str, value: Option<&OsString>) -> Result<u32, String> {
    let value = value.ok_or_else(|| format!("missing value for {flag}"))?;
    let text = value.to_string_lossy();
    text.parse()
        .map_err(|_| format!("invalid value for {flag}: {text}"))
}

fn run(args: &RunArgs) -> Result<(), i32> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path).map_err(|e| {
            eprintln!("error: {e}");
            1
        })?,
        None => SimConfig::default(),
    };
    if let Some(latency) = args.latency {
        config.latency = latency;
    }
    if let Some(max_stall) = args.max_stall {
        config.max_stall = max_stall;
    }

    let source = fs::read_to_string(&args.script).map_err(|e| {
        eprintln!("error: failed to read {}: {e}", args.script.display());
        1
    })?;

    let report = run_script(&source, &config);

    if !args.quiet {
        for line in &report.trace {
            println!("{line}");
        }
    }

    println!(
        "{}: {} ticks, {} upstream fault(s)",
        args.script.display(),
        report.trace.len(),
        report.faults
    );

    report.outcome.map_err(|e| {
        eprintln!("{}: error: {e}", args.script.display());
        1
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<OsString> = env::args_os().skip(1).collect();
    let exit_code = match parse_args(&args) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Run(args)) => match run(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            1
        }
    };

    std::process::exit(exit_code);
}
