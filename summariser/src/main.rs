use anyhow::Context;
use bench_summariser::{summarise_results_root, SummariseOptions};
use chrono::Utc;
use log::{debug, info};
use std::fs::File;
use std::path::PathBuf;

/// Environment variable name to set a custom results root
const RESULTS_DIR_ENV: &str = "RESULTS_DIR";
/// Default path for the results root
const DEFAULT_RESULTS_DIR: &str = "./gatling-results";
/// Environment variable that opts defaulted-load groups into the summary
const INCLUDE_DEFAULTED_ENV: &str = "INCLUDE_DEFAULTED_LOADS";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let results_dir = std::env::var(RESULTS_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_RESULTS_DIR));
    let options = SummariseOptions {
        include_defaulted_loads: std::env::var(INCLUDE_DEFAULTED_ENV).is_ok(),
    };
    debug!("Summarising results under {}", results_dir.display());

    let report = summarise_results_root(&results_dir, &options)
        .with_context(|| format!("Summarise results under {}", results_dir.display()))?;
    info!("Summarised {} run groups", report.groups.len());

    let report_path = format!(
        "summariser-report-{}.json",
        Utc::now().format("%Y-%m-%dT%H.%M.%S%.fZ")
    );
    let file = File::create_new(&report_path)?;
    serde_json::to_writer_pretty(file, &report)?;
    info!("Wrote {report_path}");

    Ok(())
}
