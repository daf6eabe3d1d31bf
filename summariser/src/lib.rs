use bench_summary_model::{MetricKind, Series};
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::adapter::{event_log, range_series, report_stats};
use crate::aggregator::RunGroupRegistry;
use crate::discover::{ArtifactKind, DiscoveredArtifact};

mod adapter;
mod aggregator;
mod analyze;
mod discover;
pub mod model;

pub use adapter::range_series::{RangeSeriesError, TimeBase};
pub use aggregator::AggregateError;
pub use model::{GroupSummary, SummaryReport};

/// Options controlling a summarisation pass.
#[derive(Debug, Clone, Default)]
pub struct SummariseOptions {
    /// Include run groups whose load level was substituted rather than
    /// parsed from artifact names. Off by default: a defaulted load level
    /// is not trustworthy for statistical comparison across load levels.
    pub include_defaulted_loads: bool,
}

#[derive(Debug, Error)]
pub enum SummariseError {
    /// The results root held nothing matching either naming convention.
    #[error("no runs found under {root}")]
    NoRunsFound { root: PathBuf },
    /// Runs were discovered but no artifact yielded any usable data.
    #[error("no data could be extracted from any run under {root}")]
    NoDataExtracted { root: PathBuf },
    #[error("failed to scan results root: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Ingest every run artifact under `root` and produce one summary record
/// per (service variant, metric kind, load level) group.
///
/// Failures are isolated per artifact: a malformed file is logged and
/// skipped, and the pipeline continues. Only an empty results root or a
/// pass that extracts no data at all is fatal.
pub fn summarise_results_root(
    root: &Path,
    options: &SummariseOptions,
) -> Result<SummaryReport, SummariseError> {
    let artifacts = discover::discover_artifacts(root)?;
    if artifacts.is_empty() {
        return Err(SummariseError::NoRunsFound {
            root: root.to_path_buf(),
        });
    }
    log::info!(
        "Discovered {} artifacts under {}",
        artifacts.len(),
        root.display()
    );

    let mut registry = RunGroupRegistry::new();
    for artifact in &artifacts {
        ingest_artifact(&mut registry, artifact)?;
    }
    log::debug!("Accumulated {} run groups", registry.len());

    let groups = registry.finalise(options);
    if groups.is_empty() {
        return Err(SummariseError::NoDataExtracted {
            root: root.to_path_buf(),
        });
    }

    Ok(SummaryReport {
        generated_at: Utc::now(),
        results_root: root.to_path_buf(),
        groups,
    })
}

/// Dispatch one artifact to its format adapter and merge the result.
///
/// Adapter failures are logged and swallowed here, at the per-artifact
/// isolation boundary. Registry errors propagate; they indicate a pipeline
/// bug, not bad input.
fn ingest_artifact(
    registry: &mut RunGroupRegistry,
    artifact: &DiscoveredArtifact,
) -> Result<(), AggregateError> {
    let identity = &artifact.identity;
    let source = identity.source.display();

    match artifact.kind {
        ArtifactKind::RangeSeries => {
            match range_series::parse_file(&identity.source, identity.metric, TimeBase::Absolute) {
                Ok(Some(series_list)) => {
                    let values: Vec<f64> = series_list
                        .iter()
                        .flat_map(|series| series.values().collect::<Vec<_>>())
                        .collect();
                    log::debug!("{source}: {} samples", values.len());
                    registry.add_samples(identity, values)?;
                }
                Ok(None) => log::warn!("{source}: no data in range-series export"),
                Err(e) => log::warn!("Skipping {source}: {e}"),
            }
        }
        ArtifactKind::Report => match report_stats::load_report(&identity.source) {
            Some(document) => match report_stats::extract_stats(&document) {
                Some(reported) => {
                    log::debug!("{source}: report statistics extracted");
                    registry.add_reported(identity, reported, artifact.run_timestamp)?;
                }
                None => log::warn!("{source}: report has no recognizable statistics block"),
            },
            None => log::warn!("{source}: no report document found"),
        },
        ArtifactKind::EventLog => match event_log::parse_file(&identity.source) {
            Ok(Some(data)) => {
                log::debug!("{source}: {} request samples", data.series.len());
                registry.add_samples(identity, data.series.values().collect::<Vec<_>>())?;
                registry.add_request_counts(identity, &data.request_counts)?;
            }
            Ok(None) => log::warn!("{source}: no qualifying request records"),
            Err(e) => log::warn!("Skipping {source}: {e}"),
        },
    }

    Ok(())
}

/// Parse a single range-query export outside the aggregation pipeline,
/// for consumers that want the time axis (optionally re-based to zero).
pub fn load_range_series(
    path: &Path,
    metric: MetricKind,
    time_base: TimeBase,
) -> Result<Option<Vec<Series>>, RangeSeriesError> {
    range_series::parse_file(path, metric, time_base)
}
