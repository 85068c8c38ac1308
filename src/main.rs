use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use ifsc_results::api::ResultsApi;
use ifsc_results::config::{Overrides, Settings};
use ifsc_results::export;
use ifsc_results::logging::init_logging;
use ifsc_results::pipeline::run_pipeline;

/// Fetch a season of competition results, keep one discipline family and export it.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// TOML config file (defaults to ./config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Debug logging
    #[arg(long, short)]
    verbose: bool,
    #[command(flatten)]
    overrides: Overrides,
}

fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply_overrides(cli.overrides);
    settings.validate()?;

    let api = ResultsApi::new(&settings)?;
    let report = run_pipeline(
        &api,
        settings.year,
        &settings.filter_options(),
        settings.parallelism(),
    )?;

    if let Some(raw_path) = settings.raw_output.as_deref() {
        export::write_normalized(raw_path, &report.normalized)
            .with_context(|| format!("write normalized rows to {}", raw_path.display()))?;
    }
    export::write_enriched(&settings.output, &report.rows)
        .with_context(|| format!("write results to {}", settings.output.display()))?;

    println!("Results export complete");
    println!("Season: {}", settings.year);
    println!("Output: {}", settings.output.display());
    println!("Events: {}", report.events);
    println!("Normalized rows: {}", report.normalized.len());
    println!("Exported rows: {}", report.rows.len());
    println!("Athletes: {}", report.athletes);
    if !report.comps_without_final.is_empty() {
        println!(
            "Competitions without a final: {}",
            report.comps_without_final.join(", ")
        );
    }
    if !report.missing_profiles.is_empty() {
        println!("Athletes without profile: {}", report.missing_profiles.len());
    }
    if !report.errors.is_empty() {
        println!("Errors: {}", report.errors.len());
        for err in report.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    Ok(())
}
