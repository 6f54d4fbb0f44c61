//! QDA CLI - Command-line tool for QDA archives.
//!
//! This is the main entry point for the `qda` command-line application.

mod commands;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Commands also accepted with a single leading dash, e.g. `qda -print x.qda`.
const DASHED_COMMANDS: [&str; 5] = ["-help", "-print", "-dump", "-extract", "-build"];

/// QDA - inspect, extract and build QDA archives
#[derive(Parser, Debug)]
#[command(name = "qda")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
#[command(after_help = "Commands may also be written with a single dash: -help, -print, -dump, -extract, -build.\n\
Set QDA_LOG (or RUST_LOG) to control diagnostic output, e.g. QDA_LOG=debug.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Show usage
    Help,

    /// List entry names in file order
    Print {
        /// Path to the QDA file
        archive: PathBuf,
    },

    /// Extract every entry into a folder
    Dump {
        /// Path to the QDA file
        archive: PathBuf,

        /// Existing output folder
        output: PathBuf,
    },

    /// Extract one entry to a file of the same name
    Extract {
        /// Path to the QDA file
        archive: PathBuf,

        /// Entry name, also used as the output path
        name: OsString,
    },

    /// Create an archive from every file in a folder
    Build {
        /// Path of the QDA file to create
        archive: PathBuf,

        /// Input folder
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    init_logging();

    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => return usage_error(err),
    };

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    let mut stdout = io::stdout().lock();

    match command {
        Commands::Help => print_usage()?,
        Commands::Print { archive } => {
            commands::print(&archive, &mut stdout)?;
        }
        Commands::Dump { archive, output } => {
            commands::dump(&archive, &output, &mut stdout)?;
        }
        Commands::Extract { archive, name } => {
            commands::extract(&archive, &name, Path::new(""), &mut stdout)?;
        }
        Commands::Build { archive, input } => {
            commands::build(&archive, &input, &mut stdout)?;
        }
    }

    Ok(())
}

/// Rewrite a single-dash command in first position to its subcommand name.
fn normalize_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    let mut args: Vec<OsString> = args.into_iter().collect();

    let renamed = args
        .get(1)
        .and_then(|first| first.to_str())
        .filter(|first| DASHED_COMMANDS.contains(first))
        .map(|first| OsString::from(&first[1..]));

    if let Some(command) = renamed {
        args[1] = command;
    }

    args
}

/// Report a command-line error; exits 0 only for explicit help or version.
fn usage_error(err: clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        ErrorKind::MissingSubcommand
        | ErrorKind::InvalidSubcommand
        | ErrorKind::UnknownArgument
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            let _ = print_usage();
            ExitCode::FAILURE
        }
        _ => {
            let _ = err.print();
            ExitCode::FAILURE
        }
    }
}

fn print_usage() -> io::Result<()> {
    Cli::command().print_help()
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("QDA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
