mod commands;

use clap::Parser;
use vinyl_core::{VinylError, VinylErrorKind};

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{}", error.diagnostic_line());
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("vinyl-rs".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(name = "vinyl-rs", about = "Calculator snapshot inspection tools")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Print a human-readable summary of a calculator snapshot
    Inspect(commands::InspectArgs),
    /// Check that a snapshot restores and round-trips losslessly
    Verify(commands::VerifyArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Inspect(args) => commands::run_inspect_command(args),
        CliCommand::Verify(args) => commands::run_verify_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Calculator(#[from] VinylError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => VinylErrorKind::Type.exit_code(),
            Self::Calculator(error) => error.exit_code(),
            Self::Internal(_) => VinylErrorKind::Io.exit_code(),
        }
    }

    /// One-line diagnostic in the kind-tagged format shared with the
    /// library. Internal failures keep their full context chain instead
    /// of being squeezed into a library variant.
    pub fn diagnostic_line(&self) -> String {
        match self {
            Self::Usage(message) => VinylError::InvalidField {
                field: "cli arguments",
                expected: "a valid command line",
                actual: message.clone(),
            }
            .diagnostic_line(),
            Self::Calculator(error) => error.diagnostic_line(),
            Self::Internal(error) => {
                format!("ERROR: [{}] {error:#}", VinylErrorKind::Io.as_str())
            }
        }
    }
}
