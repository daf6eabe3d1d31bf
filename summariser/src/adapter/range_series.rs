use bench_summary_model::{bytes_to_megabytes, MetricKind, Sample, Series};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use super::json_number;

/// Status marker a range-query export must carry to be considered usable.
const STATUS_SUCCESS: &str = "success";

/// Whether parsed series keep their absolute timestamps or are re-based so
/// the first sample sits at zero. Aggregation discards the time axis and
/// uses [`TimeBase::Absolute`]; re-basing exists for single-run time-axis
/// consumers and is always the caller's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBase {
    Absolute,
    RelativeToStart,
}

#[derive(Debug, Error)]
pub enum RangeSeriesError {
    #[error("failed to read range-series export: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed range-series JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A Prometheus range-query API response.
#[derive(Debug, Deserialize)]
struct RangeQueryDocument {
    #[serde(default)]
    status: String,
    #[serde(default)]
    data: RangeQueryData,
}

#[derive(Debug, Default, Deserialize)]
struct RangeQueryData {
    #[serde(default)]
    result: Vec<RangeQueryResult>,
}

#[derive(Debug, Deserialize)]
struct RangeQueryResult {
    #[serde(default)]
    values: Vec<(serde_json::Value, serde_json::Value)>,
}

/// Parse a range-query export file into normalized series.
///
/// `Ok(None)` means the document parsed but carries no usable data (status
/// not `success`, or an empty result list). That is a soft condition, not
/// an error. Memory-kind values are converted from bytes to megabytes
/// exactly once, here.
pub fn parse_file(
    path: &Path,
    metric: MetricKind,
    time_base: TimeBase,
) -> Result<Option<Vec<Series>>, RangeSeriesError> {
    let file = std::fs::File::open(path)?;
    parse_reader(std::io::BufReader::new(file), metric, time_base)
}

/// As [`parse_file`], from any reader.
pub fn parse_reader<R: Read>(
    reader: R,
    metric: MetricKind,
    time_base: TimeBase,
) -> Result<Option<Vec<Series>>, RangeSeriesError> {
    let document: RangeQueryDocument = serde_json::from_reader(reader)?;
    Ok(extract_series(document, metric, time_base))
}

fn extract_series(
    document: RangeQueryDocument,
    metric: MetricKind,
    time_base: TimeBase,
) -> Option<Vec<Series>> {
    if document.status != STATUS_SUCCESS {
        log::warn!(
            "Range-series export has status {:?}, expected {STATUS_SUCCESS:?}",
            document.status
        );
        return None;
    }
    if document.data.result.is_empty() {
        return None;
    }

    let mut out = Vec::with_capacity(document.data.result.len());
    for result in document.data.result {
        let mut samples = Vec::with_capacity(result.values.len());
        for (ts, value) in &result.values {
            let (Some(timestamp_secs), Some(raw)) = (json_number(ts), json_number(value)) else {
                log::debug!("Skipping unparsable sample point [{ts}, {value}]");
                continue;
            };
            if !timestamp_secs.is_finite() || !raw.is_finite() {
                log::debug!("Skipping non-finite sample point [{ts}, {value}]");
                continue;
            }
            let value = match metric {
                MetricKind::Memory => bytes_to_megabytes(raw),
                _ => raw,
            };
            samples.push(Sample {
                timestamp_secs,
                value,
            });
        }
        if samples.is_empty() {
            continue;
        }
        let mut series = Series::new(samples);
        if time_base == TimeBase::RelativeToStart {
            series.rebase_to_start();
        }
        out.push(series);
    }

    if out.is_empty() {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_summary_model::BYTES_PER_MEGABYTE;
    use pretty_assertions::assert_eq;

    fn parse(doc: &str, metric: MetricKind, time_base: TimeBase) -> Option<Vec<Series>> {
        parse_reader(doc.as_bytes(), metric, time_base).unwrap()
    }

    const THREE_POINTS: &str = r#"{
        "status": "success",
        "data": {"result": [{"metric": {}, "values": [[0, "10"], [1, "20"], [2, "30"]]}]}
    }"#;

    #[test]
    fn cpu_values_pass_through_unchanged() {
        let series = parse(THREE_POINTS, MetricKind::Cpu, TimeBase::Absolute).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(
            series[0].values().collect::<Vec<_>>(),
            vec![10.0, 20.0, 30.0]
        );
    }

    #[test]
    fn memory_values_are_converted_to_megabytes_exactly_once() {
        let series = parse(THREE_POINTS, MetricKind::Memory, TimeBase::Absolute).unwrap();
        assert_eq!(
            series[0].values().collect::<Vec<_>>(),
            vec![
                10.0 / BYTES_PER_MEGABYTE,
                20.0 / BYTES_PER_MEGABYTE,
                30.0 / BYTES_PER_MEGABYTE
            ]
        );
    }

    #[test]
    fn conversion_is_gated_on_metric_kind_not_magnitude() {
        // Values that already look MB-sized must still pass through a CPU
        // classification untouched, and a memory classification exactly once.
        let doc = r#"{"status": "success", "data": {"result": [
            {"metric": {}, "values": [[0, "0.5"], [1, "1.5"]]}
        ]}}"#;
        let cpu = parse(doc, MetricKind::Cpu, TimeBase::Absolute).unwrap();
        assert_eq!(cpu[0].values().collect::<Vec<_>>(), vec![0.5, 1.5]);

        let mem = parse(doc, MetricKind::Memory, TimeBase::Absolute).unwrap();
        assert_eq!(
            mem[0].values().collect::<Vec<_>>(),
            vec![0.5 / BYTES_PER_MEGABYTE, 1.5 / BYTES_PER_MEGABYTE]
        );
    }

    #[test]
    fn non_success_status_is_no_data() {
        let doc = r#"{"status": "error", "data": {"result": [
            {"metric": {}, "values": [[0, "1"]]}
        ]}}"#;
        assert_eq!(parse(doc, MetricKind::Cpu, TimeBase::Absolute), None);
    }

    #[test]
    fn empty_result_list_is_no_data() {
        let doc = r#"{"status": "success", "data": {"result": []}}"#;
        assert_eq!(parse(doc, MetricKind::Cpu, TimeBase::Absolute), None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let result = parse_reader(
            "{not json".as_bytes(),
            MetricKind::Cpu,
            TimeBase::Absolute,
        );
        assert!(matches!(result, Err(RangeSeriesError::Json(_))));
    }

    #[test]
    fn string_and_numeric_timestamps_both_parse() {
        let doc = r#"{"status": "success", "data": {"result": [
            {"metric": {}, "values": [["1700000000", "1"], [1700000015.5, "2"]]}
        ]}}"#;
        let series = parse(doc, MetricKind::Cpu, TimeBase::Absolute).unwrap();
        assert_eq!(series[0].samples()[0].timestamp_secs, 1_700_000_000.0);
        assert_eq!(series[0].samples()[1].timestamp_secs, 1_700_000_015.5);
    }

    #[test]
    fn unparsable_points_are_skipped_not_fatal() {
        let doc = r#"{"status": "success", "data": {"result": [
            {"metric": {}, "values": [[0, "oops"], [1, "2"], ["bad", "3"]]}
        ]}}"#;
        let series = parse(doc, MetricKind::Cpu, TimeBase::Absolute).unwrap();
        assert_eq!(series[0].values().collect::<Vec<_>>(), vec![2.0]);
    }

    #[test]
    fn rebasing_is_caller_controlled() {
        let doc = r#"{"status": "success", "data": {"result": [
            {"metric": {}, "values": [[1700000000, "1"], [1700000030, "2"]]}
        ]}}"#;

        let absolute = parse(doc, MetricKind::Cpu, TimeBase::Absolute).unwrap();
        assert_eq!(absolute[0].samples()[0].timestamp_secs, 1_700_000_000.0);

        let rebased = parse(doc, MetricKind::Cpu, TimeBase::RelativeToStart).unwrap();
        assert_eq!(rebased[0].samples()[0].timestamp_secs, 0.0);
        assert_eq!(rebased[0].samples()[1].timestamp_secs, 30.0);
    }

    #[test]
    fn one_series_per_result_entry() {
        let doc = r#"{"status": "success", "data": {"result": [
            {"metric": {"__name__": "a"}, "values": [[0, "1"]]},
            {"metric": {"__name__": "b"}, "values": [[0, "2"]]}
        ]}}"#;
        let series = parse(doc, MetricKind::Cpu, TimeBase::Absolute).unwrap();
        assert_eq!(series.len(), 2);
    }
}
