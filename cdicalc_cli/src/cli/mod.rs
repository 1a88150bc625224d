mod commands;
mod helpers;

use std::path::PathBuf;

use cdicalc_core::CalcError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Exit code for calculation and file errors
const EXIT_CALC: i32 = 1;
/// Exit code for malformed command lines
const EXIT_USAGE: i32 = 2;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(output) => {
            print!("{output}");
            0
        }
        Err(error) => {
            eprintln!("error: {error}");
            error.exit_code()
        }
    }
}

/// Run with arguments after the program name, returning what would be printed.
#[cfg(test)]
pub fn run<I, S>(args: I) -> Result<String, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("cdicalc".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<String, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_tracing(cli.verbose);
            dispatch_parsed(cli)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => Ok(err.to_string()),
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins unless `--verbose` is set.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(name = "cdicalc", version, about = "Unit-checked calculator for coherent X-ray diffraction imaging setups")]
struct Cli {
    /// Display preferences file (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// List formulas, optionally for one category (bcdi, cdi, diffraction, coherence)
    Formulas(commands::FormulasArgs),
    /// List unit symbols, optionally for one dimension
    Units(commands::UnitsArgs),
    /// Solve one role from the others
    Solve(commands::SolveArgs),
    /// Derive every role reachable from the given values
    Derive(commands::DeriveArgs),
    /// Print the Markdown formula reference
    Reference,
}

fn dispatch_parsed(cli: Cli) -> Result<String, CliError> {
    let config = cli.config.as_deref();
    match cli.command {
        CliCommand::Formulas(args) => commands::run_formulas_command(args),
        CliCommand::Units(args) => commands::run_units_command(args),
        CliCommand::Solve(args) => commands::run_solve_command(args, config),
        CliCommand::Derive(args) => commands::run_derive_command(args, config),
        CliCommand::Reference => Ok(commands::run_reference_command()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Calc(#[from] CalcError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => EXIT_USAGE,
            Self::Calc(_) | Self::Internal(_) => EXIT_CALC,
        }
    }
}
