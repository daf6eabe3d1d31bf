use bench_summary_model::SummaryStatistics;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use super::json_number;
use crate::analyze::approx_p90;

/// Name of the report subdirectory holding the statistics document.
const JS_DIR: &str = "js";

/// Key of the whole-simulation statistics entry.
const GLOBAL_INFORMATION: &str = "Global Information";

/// The quantiles the report generator writes as `percentiles1..percentiles4`.
///
/// This is a fixed assumption inherited from the generator's configuration,
/// not introspected from the document. If the generator is reconfigured
/// with different quantiles this table must change with it.
pub(crate) const REPORT_QUANTILES: [(&str, f64); 4] = [
    ("percentiles1", 0.50),
    ("percentiles2", 0.75),
    ("percentiles3", 0.95),
    ("percentiles4", 0.99),
];

/// Histogram-group keys of the statistics block.
const GROUP_KEYS: [&str; 4] = ["group1", "group2", "group3", "group4"];

/// Statistics recovered from a pre-aggregated report document.
///
/// Unlike sample-backed groups these cannot be recomputed; fields the
/// report does not carry stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReportedStats {
    pub statistics: SummaryStatistics,
    /// Request/response-band counts from the report's histogram groups.
    pub request_counts: Option<BTreeMap<String, u64>>,
}

/// Locate and parse the statistics document for a run directory.
///
/// The report generator nests its output unpredictably, so four strategies
/// are tried in order:
///   1. any `*.json` file in `<run>/js/`;
///   2. any `*.js` file in `<run>/js/`, parsed from the first `{`;
///   3. both of the above in each immediate child directory;
///   4. both of the above in each grandchild directory named `js`.
///
/// Returns `None` only after all four strategies are exhausted.
pub(crate) fn load_report(run_dir: &Path) -> Option<Value> {
    if let Some(doc) = try_parse_js_dir(&run_dir.join(JS_DIR)) {
        return Some(doc);
    }

    for child in child_dirs(run_dir) {
        if let Some(doc) = try_parse_js_dir(&child.join(JS_DIR)) {
            return Some(doc);
        }
    }

    for child in child_dirs(run_dir) {
        for grandchild in child_dirs(&child) {
            if grandchild.file_name().and_then(|n| n.to_str()) == Some(JS_DIR) {
                if let Some(doc) = try_parse_js_dir(&grandchild) {
                    return Some(doc);
                }
            }
        }
    }

    None
}

fn child_dirs(dir: &Path) -> Vec<std::path::PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}

/// Try every JSON file, then every script file, in one `js` directory.
fn try_parse_js_dir(js_dir: &Path) -> Option<Value> {
    let Ok(entries) = std::fs::read_dir(js_dir) else {
        return None;
    };
    let mut files: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    files.sort();

    for file in files.iter().filter(|f| has_extension(f, "json")) {
        match std::fs::read_to_string(file) {
            Ok(text) => {
                if let Ok(doc) = serde_json::from_str::<Value>(&text) {
                    log::debug!("Parsed report document {}", file.display());
                    return Some(doc);
                }
            }
            Err(e) => log::debug!("Failed to read {}: {e}", file.display()),
        }
    }

    for file in files.iter().filter(|f| has_extension(f, "js")) {
        match std::fs::read_to_string(file) {
            Ok(text) => {
                if let Some(doc) = parse_embedded_json(&text) {
                    log::debug!("Parsed script-embedded report document {}", file.display());
                    return Some(doc);
                }
            }
            Err(e) => log::debug!("Failed to read {}: {e}", file.display()),
        }
    }

    None
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

/// Parse a JSON object embedded in a script file, starting at the first `{`.
///
/// Script files carry trailing code after the object, so parsing stops at
/// the end of the first complete value rather than requiring EOF.
pub(crate) fn parse_embedded_json(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<Value>()
        .next()?
        .ok()
}

/// The statistics-block shapes the report generator is known to produce,
/// in the order they are tried. Adding a new shape is one variant plus one
/// match arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockShape {
    /// `stats.contents["Global Information"].stats`
    NestedContents,
    /// `stats["Global Information"]`
    DirectKey,
    /// `stats.stats`, or the stats object itself.
    InnerStats,
}

const BLOCK_SHAPES: [BlockShape; 3] = [
    BlockShape::NestedContents,
    BlockShape::DirectKey,
    BlockShape::InnerStats,
];

fn locate_block<'doc>(shape: BlockShape, stats: &'doc Value) -> Option<&'doc Value> {
    match shape {
        BlockShape::NestedContents => stats
            .get("contents")
            .and_then(|c| c.get(GLOBAL_INFORMATION))
            .and_then(|g| g.get("stats")),
        BlockShape::DirectKey => stats.get(GLOBAL_INFORMATION),
        BlockShape::InnerStats => Some(stats.get("stats").unwrap_or(stats)),
    }
}

/// Find the whole-simulation statistics block in a parsed report document.
fn global_information(document: &Value) -> Option<&Value> {
    let stats = document.get("stats").unwrap_or(document);
    BLOCK_SHAPES
        .iter()
        .find_map(|&shape| locate_block(shape, stats))
}

/// Extract [`ReportedStats`] from a parsed report document.
///
/// Returns `None` when no statistics block with any recognizable field can
/// be located. That is "no data" for the run, not an error.
pub(crate) fn extract_stats(document: &Value) -> Option<ReportedStats> {
    let block = global_information(document)?;

    let mut quantiles = BTreeMap::new();
    for (field, q) in REPORT_QUANTILES {
        if let Some(value) = total_field(block, field) {
            // Scale the quantile to an integer key so it can live in a map.
            quantiles.insert((q * 100.0).round() as u32, value);
        }
    }

    let p75 = quantiles.get(&75).copied();
    let p95 = quantiles.get(&95).copied();
    // Prefer a quantile the report actually carries; fall back to
    // interpolation between its neighbours.
    let p90 = quantiles.get(&90).copied().or_else(|| match (p75, p95) {
        (Some(p75), Some(p95)) => Some(approx_p90(p75, p95)),
        _ => None,
    });
    let p50 = quantiles.get(&50).copied();

    let statistics = SummaryStatistics {
        mean: total_field(block, "meanResponseTime"),
        median: p50,
        std_dev: total_field(block, "standardDeviation"),
        min: total_field(block, "minResponseTime"),
        max: total_field(block, "maxResponseTime"),
        p10: None,
        p25: None,
        p50,
        p75,
        p90,
        p95,
        p99: quantiles.get(&99).copied(),
        sample_count: total_field(block, "numberOfRequests")
            .map(|v| v.max(0.0) as u64)
            .unwrap_or(0),
    };

    if statistics.is_empty() {
        return None;
    }

    Some(ReportedStats {
        request_counts: group_counts(block),
        statistics,
    })
}

/// Read the `total` column of one statistics field, accepting both native
/// numbers and the generator's quoted-number encoding.
fn total_field(block: &Value, field: &str) -> Option<f64> {
    block.get(field)?.get("total").and_then(json_number)
}

fn group_counts(block: &Value) -> Option<BTreeMap<String, u64>> {
    let mut counts = BTreeMap::new();
    for key in GROUP_KEYS {
        let Some(group) = block.get(key) else {
            continue;
        };
        let name = group.get("name").and_then(|n| n.as_str());
        let count = group.get("count").and_then(json_number);
        if let (Some(name), Some(count)) = (name, count) {
            counts.insert(name.to_string(), count.max(0.0) as u64);
        }
    }
    if counts.is_empty() {
        None
    } else {
        Some(counts)
    }
}
