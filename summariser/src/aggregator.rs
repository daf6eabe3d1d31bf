use bench_summary_model::{LoadProvenance, RunIdentity, RunKey, SummaryStatistics};
use chrono::NaiveDateTime;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::adapter::report_stats::ReportedStats;
use crate::analyze;
use crate::model::GroupSummary;
use crate::SummariseOptions;

#[derive(Debug, Error)]
pub enum AggregateError {
    /// The registry lifecycle is read-extend-only: once statistics are
    /// computed no further artifacts may be merged in the same pass.
    #[error("run group registry is already finalised")]
    AlreadyFinalised,
}

/// A reported-statistics contribution, kept alongside the run timestamp it
/// came from so collisions can be resolved latest-wins.
#[derive(Debug)]
struct ReportedContribution {
    run_timestamp: Option<NaiveDateTime>,
    stats: ReportedStats,
}

/// The accumulating state for one run key.
#[derive(Debug, Default)]
struct RunGroup {
    values: Vec<f64>,
    reported: Option<ReportedContribution>,
    request_counts: BTreeMap<String, u64>,
    sources: Vec<PathBuf>,
    provenance: Option<LoadProvenance>,
}

impl RunGroup {
    /// A parsed load level from any contributor outweighs a defaulted one.
    fn note_provenance(&mut self, provenance: LoadProvenance) {
        match (self.provenance, provenance) {
            (None, p) => self.provenance = Some(p),
            (Some(LoadProvenance::Defaulted), LoadProvenance::Parsed) => {
                self.provenance = Some(LoadProvenance::Parsed)
            }
            _ => {}
        }
    }

    fn note_source(&mut self, identity: &RunIdentity) {
        self.note_provenance(identity.load.provenance);
        self.sources.push(identity.source.clone());
    }
}

/// The per-invocation registry of run groups.
///
/// Groups are created lazily on first contribution and grow by
/// accumulation; [`RunGroupRegistry::finalise`] consumes the registry and
/// computes statistics once. Built fresh for every pipeline pass; nothing
/// survives across invocations.
#[derive(Debug, Default)]
pub(crate) struct RunGroupRegistry {
    groups: BTreeMap<RunKey, RunGroup>,
    finalised: bool,
}

impl RunGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union sample values from one artifact into the group for its key.
    ///
    /// The time axis is discarded here: aggregation is over values only.
    pub fn add_samples(
        &mut self,
        identity: &RunIdentity,
        values: impl IntoIterator<Item = f64>,
    ) -> Result<(), AggregateError> {
        let group = self.group_for(identity)?;
        group.values.extend(values);
        Ok(())
    }

    /// Merge per-request-type counts from one artifact into the group.
    pub fn add_request_counts(
        &mut self,
        identity: &RunIdentity,
        counts: &BTreeMap<String, u64>,
    ) -> Result<(), AggregateError> {
        let group = self.group_for(identity)?;
        for (name, count) in counts {
            *group.request_counts.entry(name.clone()).or_default() += count;
        }
        Ok(())
    }

    /// Record pre-aggregated statistics for the group.
    ///
    /// Reported statistics cannot be unioned, so when several artifacts
    /// report for the same key the one from the latest run wins and the
    /// older one is logged as superseded.
    pub fn add_reported(
        &mut self,
        identity: &RunIdentity,
        stats: ReportedStats,
        run_timestamp: Option<NaiveDateTime>,
    ) -> Result<(), AggregateError> {
        let key = identity.key();
        let group = self.group_for(identity)?;

        let replace = match &group.reported {
            Some(existing) if newer_than(run_timestamp, existing.run_timestamp) => {
                log::info!(
                    "Superseded report for {key}: replacing run at {:?} with {}",
                    existing.run_timestamp,
                    identity.source.display()
                );
                true
            }
            Some(existing) => {
                log::info!(
                    "Superseded report for {key}: keeping run at {:?}, ignoring {}",
                    existing.run_timestamp,
                    identity.source.display()
                );
                false
            }
            None => true,
        };
        if replace {
            group.reported = Some(ReportedContribution {
                run_timestamp,
                stats,
            });
        }
        Ok(())
    }

    fn group_for(&mut self, identity: &RunIdentity) -> Result<&mut RunGroup, AggregateError> {
        if self.finalised {
            return Err(AggregateError::AlreadyFinalised);
        }
        let group = self.groups.entry(identity.key()).or_default();
        group.note_source(identity);
        Ok(group)
    }

    /// The number of groups accumulated so far.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Compute statistics for every group and emit the summary rows.
    ///
    /// Sample-backed groups go through the percentile engine; groups with
    /// only reported statistics pass them through. When a group has both,
    /// the samples win (raw events beat pre-aggregated numbers), but the
    /// reported request counts are kept when the sample path produced none.
    /// Groups with a defaulted load level are excluded unless
    /// [`SummariseOptions::include_defaulted_loads`] is set.
    pub fn finalise(mut self, options: &SummariseOptions) -> Vec<GroupSummary> {
        self.finalised = true;

        let mut rows = Vec::with_capacity(self.groups.len());
        for (key, group) in std::mem::take(&mut self.groups) {
            let provenance = group.provenance.unwrap_or(LoadProvenance::Parsed);
            if provenance == LoadProvenance::Defaulted && !options.include_defaulted_loads {
                log::warn!(
                    "Excluding group {key} from summary: its load level was defaulted, not parsed"
                );
                continue;
            }

            let mut request_counts = group.request_counts;
            let statistics: SummaryStatistics = if !group.values.is_empty() {
                if let Some(reported) = &group.reported {
                    log::info!(
                        "Group {key} has both raw samples and a report ({:?}); using the samples",
                        reported.run_timestamp
                    );
                    if request_counts.is_empty() {
                        if let Some(counts) = &reported.stats.request_counts {
                            request_counts = counts.clone();
                        }
                    }
                }
                match analyze::summary_stats(&group.values) {
                    Some(stats) => stats,
                    None => continue,
                }
            } else if let Some(reported) = group.reported {
                if let Some(counts) = reported.stats.request_counts {
                    for (name, count) in counts {
                        *request_counts.entry(name).or_default() += count;
                    }
                }
                reported.stats.statistics
            } else {
                log::warn!("Group {key} has no data, skipping");
                continue;
            };

            rows.push(GroupSummary {
                variant: key.variant,
                metric: key.metric,
                rps: key.rps,
                load_provenance: provenance,
                statistics,
                request_counts: if request_counts.is_empty() {
                    None
                } else {
                    Some(request_counts)
                },
                sources: group.sources.into_iter().unique().sorted().collect(),
            });
        }

        rows
    }
}

/// True when `candidate` should replace `existing` under latest-wins.
fn newer_than(candidate: Option<NaiveDateTime>, existing: Option<NaiveDateTime>) -> bool {
    match (candidate, existing) {
        (Some(c), Some(e)) => c > e,
        (Some(_), None) => true,
        _ => false,
    }
}
