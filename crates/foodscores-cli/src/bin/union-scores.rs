use std::path::PathBuf;
use std::process;

use clap::Parser;
use foodscores::dataset;
use foodscores::utils::InspectionStats;
use foodscores_cli::{CommonArgs, emit, init_logging};

#[derive(Parser)]
#[command(name = "union-scores")]
#[command(
    about = "Combine CSV files from download-scores into one deduplicated, sorted CSV on stdout",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(value_name = "FILE", required = true, help = "CSV file to combine")]
    files: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    init_logging(env!("CARGO_BIN_NAME"), cli.common.verbosity);

    let filter = cli.common.filter().unwrap_or_else(|e| {
        log::error!("Invalid args: {e}");
        process::exit(1);
    });

    let mut batches = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let batch = dataset::read_csv_file(path).unwrap_or_else(|e| {
            log::error!("Error reading {}: {}", path.display(), e);
            process::exit(1);
        });
        log::info!("Read {} inspections from {}", batch.len(), path.display());
        batches.push(batch);
    }

    let inspections = filter.apply(dataset::sorted(dataset::union(batches)));

    emit(&inspections, cli.common.format).unwrap_or_else(|e| {
        log::error!("Error writing output: {}", e);
        process::exit(1);
    });

    log::info!("{}", InspectionStats::from_inspections(&inspections));
}
