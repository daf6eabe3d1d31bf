use bench_summary_model::{Sample, Series};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Marker a log line's first field must contain to be a request record.
const EVENT_MARKER: &str = "REQUEST";

/// Status a request record must carry to contribute a sample.
const STATUS_OK: &str = "OK";

/// Minimum tab-separated field count of a request-completion record.
const MIN_FIELDS: usize = 7;

/// The request names the simulations are known to issue. Lines with any
/// other name are dropped silently; they are scripted setup noise, not
/// measured traffic.
pub(crate) const KNOWN_REQUESTS: [&str; 6] = [
    "health_check",
    "Health Check",
    "login",
    "login_user",
    "login_for_refresh",
    "login_for_validation",
];

#[derive(Debug, Error)]
pub(crate) enum EventLogError {
    #[error("failed to read event log: {0}")]
    Io(#[from] std::io::Error),
}

/// Samples recovered from one simulation event log.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EventLogData {
    /// All recognized request types flattened into one series; the
    /// aggregate statistics do not separate by request type.
    pub series: Series,
    /// How many successful samples each recognized request type contributed.
    pub request_counts: BTreeMap<String, u64>,
}

/// Parse a simulation event log file.
///
/// `Ok(None)` means the file held no qualifying request records.
pub(crate) fn parse_file(path: &Path) -> Result<Option<EventLogData>, EventLogError> {
    let file = std::fs::File::open(path)?;
    parse_reader(file)
}

/// As [`parse_file`], from any reader.
///
/// A line qualifies only if it contains the request marker and a tab, has
/// at least [`MIN_FIELDS`] tab-separated fields, and its status field is
/// [`STATUS_OK`]. Malformed numeric fields skip that single line.
pub(crate) fn parse_reader<R: Read>(reader: R) -> Result<Option<EventLogData>, EventLogError> {
    let mut samples = Vec::new();
    let mut request_counts: BTreeMap<String, u64> = BTreeMap::new();

    for line in BufReader::new(reader).lines() {
        let line = line?;
        let Some((name, sample)) = parse_line(&line) else {
            continue;
        };
        *request_counts.entry(name.to_string()).or_default() += 1;
        samples.push(sample);
    }

    if samples.is_empty() {
        return Ok(None);
    }

    Ok(Some(EventLogData {
        series: Series::new(samples),
        request_counts,
    }))
}

/// Parse one log line into (request name, response-time sample).
///
/// Fields: `[marker, scenario, user, request-name, start-ms, end-ms, status, ...]`.
fn parse_line(line: &str) -> Option<(&str, Sample)> {
    if !line.contains('\t') || !line.contains(EVENT_MARKER) {
        return None;
    }
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }
    if !fields[0].contains(EVENT_MARKER) {
        return None;
    }
    if fields[6] != STATUS_OK {
        return None;
    }

    let name = fields[3];
    if !KNOWN_REQUESTS.contains(&name) {
        log::debug!("Dropping sample for unrecognized request {name:?}");
        return None;
    }

    let start_ms: i64 = fields[4].parse().ok()?;
    let end_ms: i64 = fields[5].parse().ok()?;

    Some((
        name,
        Sample {
            timestamp_secs: start_ms as f64 / 1000.0,
            value: (end_ms - start_ms) as f64,
        },
    ))
}
