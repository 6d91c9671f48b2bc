use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};

#[derive(Debug, Default)]
pub struct CliSources {
    pub compact_from_cli: bool,
    pub audit_from_cli: bool,
}

impl CliSources {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            compact_from_cli: value_from_cli(matches, "compact"),
            audit_from_cli: value_from_cli(matches, "audit"),
        }
    }
}

fn value_from_cli(matches: &ArgMatches, id: &str) -> bool {
    matches
        .value_source(id)
        .is_some_and(|source| matches!(source, ValueSource::CommandLine))
}

pub fn parse_cli() -> (CliArgs, CliSources) {
    let command = CliArgs::command();
    let matches = command.get_matches();
    let args = match CliArgs::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => err.exit(),
    };
    let sources = CliSources::from_matches(&matches);
    (args, sources)
}

#[derive(Debug, Parser)]
#[command(
    name = "subtitle-qa",
    about = "Reconcile on-screen text, transcription and spell-check results into a subtitle QA report",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Raw text-detection payload (JSON)
    #[arg(long = "ocr", value_name = "FILE")]
    pub ocr: PathBuf,

    /// Transcription rows (JSON array or object with `segments`)
    #[arg(long = "transcript", value_name = "FILE")]
    pub transcript: PathBuf,

    /// Recorded spell-check responses keyed by request text (JSON object)
    #[arg(long = "spelling", value_name = "FILE")]
    pub spelling: Option<PathBuf>,

    /// Video length in seconds; inferred from the latest detection when omitted
    #[arg(long = "video-duration", value_name = "SECONDS")]
    pub video_duration: Option<f64>,

    /// Override the configuration file path
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Destination of the report JSON
    #[arg(long = "output", value_name = "FILE")]
    pub output: PathBuf,

    /// Also write the per-detection audit table to this file
    #[arg(long = "audit", id = "audit", value_name = "FILE")]
    pub audit: Option<PathBuf>,

    /// Write single-line JSON instead of pretty-printed output
    #[arg(long = "compact", id = "compact")]
    pub compact: bool,
}
