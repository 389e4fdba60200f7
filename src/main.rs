// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use seisflow::config::{load_config, parse_flow_file, EngineConfig, RuntimeBuilder};
use seisflow::errors::FlowError;
use seisflow::modules::ModuleRegistry;
use seisflow::observability::FlowLog;

#[derive(Debug, Parser)]
#[command(name = "seisflow", version, about = "Run seismic trace flows")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a flow to completion
    Run {
        /// Flow description file
        flow: PathBuf,

        /// Engine configuration (YAML, or TOML with a .toml extension)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the flow log to this file instead of stdout
        #[arg(long)]
        log: Option<PathBuf>,

        /// Memory budget for trace samples, in MiB
        #[arg(long, value_name = "MB")]
        memory_budget_mb: Option<u64>,

        /// Write a JSON run summary to this file
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Fail if any module warns during initialization
        #[arg(long)]
        warnings_as_errors: bool,
    },

    /// Parse, build and initialize a flow without running it
    Check {
        flow: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the available modules and their parameters
    Modules,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err.downcast_ref::<FlowError>().map_or(1, FlowError::exit_code);
            ExitCode::from(code as u8)
        }
    }
}

fn execute(command: Command) -> Result<()> {
    match command {
        Command::Run {
            flow,
            config,
            log,
            memory_budget_mb,
            summary,
            warnings_as_errors,
        } => {
            let mut engine = engine_config(config.as_deref())?;
            if let Some(mb) = memory_budget_mb {
                engine
                    .set_memory_budget_mb(mb)
                    .map_err(|err| anyhow::Error::from(FlowError::from(err)))?;
            }
            if warnings_as_errors {
                engine.log_warnings_as_errors = Some(true);
            }
            run(&flow, &engine, log.as_deref(), summary.as_deref())
        }
        Command::Check { flow, config } => check(&flow, &engine_config(config.as_deref())?),
        Command::Modules => {
            list_modules(&ModuleRegistry::with_builtins());
            Ok(())
        }
    }
}

fn engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => load_config(path).map_err(|err| anyhow::Error::from(FlowError::from(err))),
        None => Ok(EngineConfig::default()),
    }
}

fn flow_log(path: Option<&Path>) -> Result<FlowLog> {
    match path {
        Some(path) => FlowLog::to_file(path)
            .with_context(|| format!("cannot create log file {}", path.display())),
        None => Ok(FlowLog::new(Box::new(io::stdout()))),
    }
}

fn run(flow: &Path, engine: &EngineConfig, log: Option<&Path>, summary: Option<&Path>) -> Result<()> {
    let description = parse_flow_file(flow).map_err(FlowError::from)?;
    let mut executor = RuntimeBuilder::new()
        .with_config(engine)
        .build(description)
        .map_err(FlowError::from)?;

    let mut log = flow_log(log)?;
    let result = executor.run(&mut log)?;

    log.line(format_args!(
        "Flow finished: {} trace(s) read, {} written, {} warning(s), {} ms",
        result.traces_read, result.traces_written, result.warnings, result.duration_ms
    ));
    log.flush();

    if let Some(path) = summary {
        let json = serde_json::to_string_pretty(&result)?;
        fs::write(path, json).with_context(|| format!("cannot write summary {}", path.display()))?;
    }
    Ok(())
}

fn check(flow: &Path, engine: &EngineConfig) -> Result<()> {
    let description = parse_flow_file(flow).map_err(FlowError::from)?;
    let mut executor = RuntimeBuilder::new()
        .with_config(engine)
        .build(description)
        .map_err(FlowError::from)?;

    let mut log = FlowLog::new(Box::new(io::stdout()));
    executor.check(&mut log)?;

    let modules: Vec<&str> = executor.module_names().collect();
    log.line(format_args!("Flow is valid: {}", modules.join(" -> ")));
    Ok(())
}

fn list_modules(registry: &ModuleRegistry) {
    for name in registry.list_available_modules() {
        let Some(module) = registry.create(name) else {
            continue;
        };
        println!("{:<12} {}", name, module.description());
        for spec in module.params() {
            let mut notes = vec![spec.kind.to_string()];
            if spec.required {
                notes.push("required".to_string());
            }
            if spec.repeatable {
                notes.push("repeatable".to_string());
            }
            println!("    {:<12} [{}] {}", spec.name, notes.join(", "), spec.description);
        }
    }
}
