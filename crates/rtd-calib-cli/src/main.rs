use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rtd_calib_core::{Campaign, SetId};
use rtd_calib_pipeline::{load_json_file, run_calibration, CalibrationConfig};
use serde::Serialize;

/// Multi-round RTD calibration: resolves every sensor's constant against the absolute reference.
#[derive(Debug, Parser)]
#[command(author, version, about = "RTD calibration network")]
struct Args {
    /// Path to the campaign JSON document.
    #[arg(long)]
    input: PathBuf,

    /// Optional path to a JSON CalibrationConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Absolute-reference set id, overriding the config.
    #[arg(long)]
    terminal_set: Option<u32>,

    /// Include the per-path breakdown of every computed constant.
    #[arg(long)]
    details: bool,

    /// Cross-check declared raised sensors against set membership.
    #[arg(long)]
    audit_raised: bool,

    /// Print only the summary instead of the full report.
    #[arg(long)]
    summary_only: bool,

    /// Write the JSON to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn resolve_config(args: &Args) -> Result<CalibrationConfig> {
    let mut config = match &args.config {
        Some(path) => load_json_file::<CalibrationConfig>(path)?,
        None => CalibrationConfig::default(),
    };
    if let Some(id) = args.terminal_set {
        config.network.terminal_set = Some(SetId(id));
    }
    config.include_path_details |= args.details;
    config.audit_raised |= args.audit_raised;
    Ok(config)
}

fn run_from_args(args: &Args) -> Result<String> {
    let campaign: Campaign = load_json_file(&args.input)?;
    let config = resolve_config(args)?;
    info!(
        "loaded {} sets from {}",
        campaign.sets.len(),
        args.input.display()
    );

    let report = run_calibration(&campaign, &config)?;
    if args.summary_only {
        to_json(&report.summary)
    } else {
        to_json(&report)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    let json = run_from_args(&args)?;
    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
