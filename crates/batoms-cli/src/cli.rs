use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "batoms CLI - Build, repeat and publish atomic structures described in TOML files.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a structure file and print a summary of its species, sites and frames.
    Inspect(InspectArgs),
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the structure description in TOML format.
    #[arg(value_name = "PATH")]
    pub input: PathBuf,

    /// Repeat the structure along the cell axes after building, e.g. '2,2,1'.
    #[arg(short, long, value_name = "A,B,C", value_parser = parse_multiplicities)]
    pub repeat: Option<[usize; 3]>,

    /// Load deferred trajectory frames before summarizing.
    #[arg(long)]
    pub frames: bool,

    /// Publish the collection to an in-memory scene and list the created objects.
    #[arg(long)]
    pub publish: bool,
}

/// Parses a comma-separated triple of positive multiplicities.
pub fn parse_multiplicities(value: &str) -> Result<[usize; 3], String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [a, b, c] = parts.as_slice() else {
        return Err(format!(
            "expected three comma-separated values, got {}",
            parts.len()
        ));
    };
    let parse = |part: &str| {
        part.parse::<usize>()
            .map_err(|e| format!("invalid multiplicity '{}': {}", part, e))
    };
    Ok([parse(a)?, parse(b)?, parse(c)?])
}
