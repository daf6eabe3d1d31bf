use bench_summary_model::{LoadProvenance, MetricKind, ServiceVariant, SummaryStatistics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The finalized summary for one run group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub variant: ServiceVariant,
    pub metric: MetricKind,
    pub rps: u32,
    /// Whether the group's load level was read from artifact names or
    /// substituted. Defaulted groups only appear when explicitly requested.
    pub load_provenance: LoadProvenance,
    pub statistics: SummaryStatistics,
    /// Per-request-type (or response-time band) counts, where the source
    /// format provides them.
    pub request_counts: Option<BTreeMap<String, u64>>,
    /// The artifacts that contributed to this group.
    pub sources: Vec<PathBuf>,
}

/// The complete output of one summarisation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub generated_at: DateTime<Utc>,
    pub results_root: PathBuf,
    /// One entry per run group, ordered by (variant, metric, load level).
    pub groups: Vec<GroupSummary>,
}
