use std::io::{self, Write};

use chrono::NaiveDate;
use clap::{ArgAction, Args, ValueEnum};
use foodscores::Inspection;
use foodscores::dataset::{self, DatasetError};
use foodscores::utils::InspectionFilter;
use log::LevelFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

/// Flags shared by `download-scores` and `union-scores`.
#[derive(Debug, Args)]
pub struct CommonArgs {
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        help = "Increase logging verbosity; can be used multiple times"
    )]
    pub verbosity: u8,

    #[arg(
        long,
        value_name = "YYYY-MM-DD",
        help = "Only emit inspections on or after this date",
        value_parser = parse_date,
    )]
    pub start_date: Option<NaiveDate>,

    #[arg(
        long,
        value_name = "YYYY-MM-DD",
        help = "Only emit inspections on or before this date",
        value_parser = parse_date,
    )]
    pub end_date: Option<NaiveDate>,

    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value = "csv",
        help = "Output format"
    )]
    pub format: OutputFormat,
}

impl CommonArgs {
    pub fn filter(&self) -> Result<InspectionFilter, String> {
        InspectionFilter {
            start_date: self.start_date,
            end_date: self.end_date,
        }
        .validate()
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string())
}

/// Errors only by default; each `-v` raises the level by one step.
pub fn level_filter(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn init_logging(program: &'static str, verbosity: u8) {
    env_logger::Builder::new()
        .filter_level(level_filter(verbosity))
        .target(env_logger::Target::Stderr)
        .write_style(env_logger::WriteStyle::Never)
        .format(move |buf, record| writeln!(buf, "{}: {}", program, record.args()))
        .init();
}

/// Write inspections to stdout in the requested format.
pub fn emit(inspections: &[Inspection], format: OutputFormat) -> Result<(), DatasetError> {
    let stdout = io::stdout().lock();
    match format {
        OutputFormat::Csv => dataset::write_csv(inspections, stdout),
        OutputFormat::Json => {
            let mut stdout = stdout;
            dataset::write_json(inspections, &mut stdout)?;
            writeln!(stdout)?;
            Ok(())
        }
    }
}
