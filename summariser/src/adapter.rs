pub(crate) mod event_log;
pub(crate) mod range_series;
pub(crate) mod report_stats;

/// Coerce a JSON value that may be a number or a numeric string into `f64`.
///
/// The report generators are inconsistent here: Prometheus encodes sample
/// values (and sometimes timestamps) as strings, and Gatling encodes its
/// totals as quoted integers. Non-numeric strings (for example the `"-"`
/// placeholder in failed-request columns) yield `None`.
pub(crate) fn json_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
