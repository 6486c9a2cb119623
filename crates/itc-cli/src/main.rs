#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use itc_core::{CodecConfig, ErrorCode};
use itc_core::config::resolve_config;
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "itc: create, advance and inspect Interval Tree Clock stamps",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to `ITC_CONFIG`, then built-in limits).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Print the seed stamp",
        after_help = "EXAMPLES:\n    # Start a new system of replicas\n    itc seed"
    )]
    Seed,

    #[command(
        about = "Split a stamp into two replicas",
        long_about = "Split a stamp's identity in two. Prints the stamp to keep, then the new replica.",
        after_help = "EXAMPLES:\n    itc fork itc:v1:30\n\n    # Emit machine-readable output\n    itc fork itc:v1:30 --json"
    )]
    Fork(cmd::StampArg),

    #[command(
        about = "Record events on a stamp",
        after_help = "EXAMPLES:\n    itc event itc:v1:30\n\n    # Record three events, reading the stamp from stdin\n    itc seed | itc event - -n 3"
    )]
    Event(cmd::EventArgs),

    #[command(
        about = "Merge two stamps",
        long_about = "Sum the identities and join the histories of two stamps."
    )]
    Join(cmd::PairArgs),

    #[command(about = "Print an anonymous read-only copy of a stamp")]
    Peek(cmd::StampArg),

    #[command(
        about = "Compare the causal histories of two stamps",
        long_about = "Print `equal`, `before`, `after` or `concurrent` for the first stamp relative to the second."
    )]
    Compare(cmd::PairArgs),

    #[command(about = "Show the structure and wire encoding of a stamp")]
    Inspect(cmd::StampArg),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("ITC_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "itc=debug,info"
        } else {
            "itc=info,warn"
        })
    });

    let format = env::var("ITC_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, codec: &CodecConfig) -> anyhow::Result<()> {
    let output = cli.output_mode();
    debug!(?codec, "resolved codec limits");

    match &cli.command {
        Commands::Seed => cmd::run_seed(output),
        Commands::Fork(args) => cmd::run_fork(args, codec, output),
        Commands::Event(args) => cmd::run_event(args, codec, output),
        Commands::Join(args) => cmd::run_join(args, codec, output),
        Commands::Peek(args) => cmd::run_peek(args, codec, output),
        Commands::Compare(args) => cmd::run_compare(args, codec, output),
        Commands::Inspect(args) => cmd::run_inspect(args, codec, output),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match resolve_config(cli.config.as_deref()) {
        Ok(config) => run(&cli, &config.codec).map_err(|err| CliError::from(&err)),
        Err(err) => Err(CliError::coded(
            ErrorCode::ConfigParseError,
            format!("{err:#}"),
        )),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if render_error(cli.output_mode(), &error).is_err() {
                eprintln!("error: {}", error.message);
            }
            ExitCode::FAILURE
        }
    }
}
