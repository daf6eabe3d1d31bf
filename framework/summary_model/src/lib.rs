use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Bytes per megabyte, used to normalize memory series.
pub const BYTES_PER_MEGABYTE: f64 = 1_048_576.0;

/// Load levels outside this window are treated as not-a-load-level when
/// scanning artifact names. Matches the sanity window used by the load
/// generator tooling.
pub const LOAD_LEVEL_RANGE: RangeInclusive<u32> = 1..=200_000;

/// Load level substituted for a range-series export whose filename does not
/// carry a parseable load. Substitutions are flagged as [`LoadProvenance::Defaulted`].
pub const DEFAULT_RANGE_SERIES_LOAD: u32 = 100;

/// Timestamp format of the trailing component of a run directory name.
pub const RUN_DIR_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Convert a raw byte count to megabytes.
///
/// Applied exactly once per series, gated on the series being classified
/// as [`MetricKind::Memory`], never on value magnitude.
pub fn bytes_to_megabytes(bytes: f64) -> f64 {
    bytes / BYTES_PER_MEGABYTE
}

/// The service implementation that was under test.
///
/// Classified from an artifact's identifying name by substring match. There
/// are exactly two categories; a name that matches neither substring is
/// classified as [`ServiceVariant::Reactive`], which is what the report
/// generator produces for its default variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceVariant {
    Common,
    Reactive,
}

impl ServiceVariant {
    /// Classify a run or artifact name.
    pub fn classify(name: &str) -> Self {
        if name.contains("common") {
            ServiceVariant::Common
        } else {
            ServiceVariant::Reactive
        }
    }
}

impl fmt::Display for ServiceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceVariant::Common => write!(f, "common"),
            ServiceVariant::Reactive => write!(f, "reactive"),
        }
    }
}

/// The kind of measurement a series or summary row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// CPU usage, in percent.
    Cpu,
    /// Memory usage, in megabytes after normalization.
    Memory,
    /// Request response time, in milliseconds.
    ResponseTime,
}

impl MetricKind {
    /// Classify a range-series export by its filename suffix.
    ///
    /// Returns `None` for anything that is not a `*_cpu.json` or
    /// `*_mem.json` export.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with("_cpu.json") {
            Some(MetricKind::Cpu)
        } else if name.ends_with("_mem.json") {
            Some(MetricKind::Memory)
        } else {
            None
        }
    }

    /// The unit values of this kind are expressed in once normalized.
    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "%",
            MetricKind::Memory => "MB",
            MetricKind::ResponseTime => "ms",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Cpu => write!(f, "cpu"),
            MetricKind::Memory => write!(f, "memory"),
            MetricKind::ResponseTime => write!(f, "response_time"),
        }
    }
}

/// Whether a load level was read from the artifact name or substituted.
///
/// The substitution cases are deliberate, documented fallbacks; carrying the
/// flag lets downstream consumers distinguish real from assumed values
/// instead of conflating them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadProvenance {
    Parsed,
    Defaulted,
}

/// The target request rate of a run, in requests per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadLevel {
    pub rps: u32,
    pub provenance: LoadProvenance,
}

impl LoadLevel {
    /// A load level read from an artifact name.
    pub fn parsed(rps: u32) -> Self {
        Self {
            rps,
            provenance: LoadProvenance::Parsed,
        }
    }

    /// A load level substituted because the artifact name carried none.
    pub fn defaulted(rps: u32) -> Self {
        Self {
            rps,
            provenance: LoadProvenance::Defaulted,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        self.provenance == LoadProvenance::Defaulted
    }
}

impl fmt::Display for LoadLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provenance {
            LoadProvenance::Parsed => write!(f, "{} RPS", self.rps),
            LoadProvenance::Defaulted => write!(f, "{} RPS (defaulted)", self.rps),
        }
    }
}

/// The identity of a single run artifact, extracted once from its name and
/// location. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunIdentity {
    pub variant: ServiceVariant,
    pub metric: MetricKind,
    pub load: LoadLevel,
    /// Where the artifact was found, kept for reporting and logging.
    pub source: PathBuf,
}

impl RunIdentity {
    /// The aggregation key this artifact contributes to.
    pub fn key(&self) -> RunKey {
        RunKey {
            variant: self.variant,
            metric: self.metric,
            rps: self.load.rps,
        }
    }
}

/// The aggregation key: all samples sharing a key are merged into one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunKey {
    pub variant: ServiceVariant,
    pub metric: MetricKind,
    pub rps: u32,
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{} RPS", self.variant, self.metric, self.rps)
    }
}

/// A single observation: a timestamp in seconds and a normalized value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp_secs: f64,
    pub value: f64,
}

/// An ordered collection of [`Sample`]s from one source series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    samples: Vec<Sample>,
}

impl Series {
    pub fn new(mut samples: Vec<Sample>) -> Self {
        samples.sort_by(|a, b| a.timestamp_secs.total_cmp(&b.timestamp_secs));
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Shift all timestamps so the first sample sits at zero.
    ///
    /// Only useful for single-run time-axis consumers; the aggregation
    /// pipeline discards the time axis and leaves timestamps absolute.
    pub fn rebase_to_start(&mut self) {
        let Some(start) = self.samples.first().map(|s| s.timestamp_secs) else {
            return;
        };
        for sample in &mut self.samples {
            sample.timestamp_secs -= start;
        }
    }
}

/// Summary statistics for one run group.
///
/// Every field is an explicit `Option`: a statistic that could not be
/// computed or was absent from a pre-aggregated report is `None`, never
/// silently zero. `sample_count` is zero when the underlying sample set was
/// empty, in which case no field is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p10: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
    pub sample_count: u64,
}

impl SummaryStatistics {
    /// True if no statistic is present at all.
    pub fn is_empty(&self) -> bool {
        [
            self.mean, self.median, self.std_dev, self.min, self.max, self.p10, self.p25,
            self.p50, self.p75, self.p90, self.p95, self.p99,
        ]
        .iter()
        .all(Option::is_none)
    }
}

/// The parsed components of a run directory name.
///
/// Run directories follow `<variant>-results-<load>-<timestamp>`. The
/// variant may itself contain hyphens, so parsing anchors on the `results`
/// marker rather than on positions.
#[derive(Debug, Clone, PartialEq)]
pub struct RunDirName {
    pub variant: ServiceVariant,
    /// `None` when no part after the `results` marker is a plausible load.
    pub load: Option<u32>,
    /// `None` when the trailing component is not a `%Y%m%dT%H%M%S` timestamp.
    pub timestamp: Option<NaiveDateTime>,
}

impl RunDirName {
    /// Parse a directory name, or `None` if it does not follow the run
    /// directory convention at all.
    pub fn parse(name: &str) -> Option<Self> {
        let parts: Vec<&str> = name.split('-').collect();
        let results_pos = parts.iter().position(|p| *p == "results")?;

        let load = parts[results_pos + 1..]
            .iter()
            .find_map(|part| parse_load_part(part));

        let timestamp = parts
            .last()
            .and_then(|part| NaiveDateTime::parse_from_str(part, RUN_DIR_TIMESTAMP_FORMAT).ok());

        Some(Self {
            variant: ServiceVariant::classify(name),
            load,
            timestamp,
        })
    }
}

/// The parsed components of a loose range-series export filename.
///
/// Loose exports follow `<variant>-<load>_<cpu|mem>.json`. A filename with
/// no plausible load falls back to [`DEFAULT_RANGE_SERIES_LOAD`], flagged
/// as defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFileName {
    pub variant: ServiceVariant,
    pub metric: MetricKind,
    pub load: LoadLevel,
}

impl RangeFileName {
    /// Parse a filename, or `None` if it is not a range-series export.
    pub fn parse(name: &str) -> Option<Self> {
        let metric = MetricKind::from_file_name(name)?;
        let stem = name
            .strip_suffix("_cpu.json")
            .or_else(|| name.strip_suffix("_mem.json"))
            .unwrap_or(name);

        let load = stem
            .split('-')
            .find_map(parse_load_part)
            .map(LoadLevel::parsed)
            .unwrap_or_else(|| {
                log::debug!(
                    "No load level in range-series filename {name:?}, defaulting to {DEFAULT_RANGE_SERIES_LOAD}"
                );
                LoadLevel::defaulted(DEFAULT_RANGE_SERIES_LOAD)
            });

        Some(Self {
            variant: ServiceVariant::classify(name),
            metric,
            load,
        })
    }
}

fn parse_load_part(part: &str) -> Option<u32> {
    part.parse::<u32>()
        .ok()
        .filter(|v| LOAD_LEVEL_RANGE.contains(v))
}
