// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! pbind: compile per-channel pulse plans for PulseBlaster boards.
//!
//! # Usage
//!
//! ```bash
//! # Print the compiled instruction table
//! pbind compile plan.yaml
//!
//! # Print the driver calls that would program the board
//! pbind compile plan.yaml --format calls --loops 0
//!
//! # Show effective configuration
//! pbind --config /path/to/config.yaml config
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pulseblaster_ind::{
    config::Config,
    driver::{Board, RecordingDriver},
    plan::SchedulePlan,
    timing::LoopCount,
    Result, VERSION,
};

/// PulseBlaster independent channel compiler
#[derive(Parser)]
#[command(name = "pbind")]
#[command(author = "pulseblaster-ind Contributors")]
#[command(version = VERSION)]
#[command(about = "Compile independent per-channel pulse schedules for PulseBlaster boards")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "PULSEBLASTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a schedule plan and print the program
    Compile {
        /// Schedule plan file (YAML)
        plan: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Cycle repetitions, 0 for infinite; overrides the plan
        #[arg(short, long)]
        loops: Option<u32>,
    },

    /// Show effective configuration
    Config,

    /// Validate configuration file
    Validate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Instruction listing
    Table,
    /// Driver calls, one `pb_inst_pbonly` line per instruction
    Calls,
    /// Program as JSON
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_deref())?;

    // Initialize logging
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level, &config.logging.format);

    match cli.command {
        Commands::Compile {
            plan,
            format,
            loops,
        } => {
            if let Err(e) = compile(&config, &plan, format, loops) {
                error!(plan = %plan.display(), error = %e, "Compilation failed");
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }

        Commands::Config => {
            // Show effective configuration
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Commands::Validate => {
            // Validate configuration
            match config.validate() {
                Ok(()) => {
                    println!("Configuration is valid");
                }
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Compile `plan_path` against the configured board and print the result.
fn compile(
    config: &Config,
    plan_path: &std::path::Path,
    format: OutputFormat,
    loops: Option<u32>,
) -> Result<()> {
    config.validate()?;

    let plan = SchedulePlan::load(plan_path)?;
    let loops = loops.map(LoopCount::from).unwrap_or_else(|| plan.loop_count());
    let schedule = plan.build(&config.timing, &config.board)?;
    let program = schedule.compile(loops)?;

    info!(
        plan = %plan_path.display(),
        instructions = program.len(),
        total_duration_ns = program.total_duration_ns(),
        "Compiled plan"
    );

    match format {
        OutputFormat::Table => print!("{}", program),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&program)?),
        OutputFormat::Calls => {
            let board = Board::open(RecordingDriver::new(), &config.board)?;
            board.load(&program)?;
            print!("{}", board.into_driver().listing());
        }
    }

    Ok(())
}

/// Initialize logging with tracing. Logs go to stderr.
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
