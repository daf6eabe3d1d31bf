use bench_summary_model::SummaryStatistics;

/// The quantiles reported for every sample-backed run group.
pub(crate) const STANDARD_QUANTILES: [f64; 7] = [0.10, 0.25, 0.50, 0.75, 0.90, 0.95, 0.99];

/// Compute [`SummaryStatistics`] over an unordered sample set.
///
/// Returns `None` for an empty set; callers must check the sample count
/// rather than rely on a sentinel value. The result is deterministic and
/// independent of input order.
pub(crate) fn summary_stats(values: &[f64]) -> Option<SummaryStatistics> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

    let quantile = |q: f64| Some(percentile_sorted(&sorted, q));

    Some(SummaryStatistics {
        mean: Some(mean),
        median: quantile(0.50),
        std_dev: Some(variance.sqrt()),
        min: Some(sorted[0]),
        max: Some(sorted[n - 1]),
        p10: quantile(STANDARD_QUANTILES[0]),
        p25: quantile(STANDARD_QUANTILES[1]),
        p50: quantile(STANDARD_QUANTILES[2]),
        p75: quantile(STANDARD_QUANTILES[3]),
        p90: quantile(STANDARD_QUANTILES[4]),
        p95: quantile(STANDARD_QUANTILES[5]),
        p99: quantile(STANDARD_QUANTILES[6]),
        sample_count: n as u64,
    })
}

/// The value at quantile `q` of an ascending-sorted, non-empty slice.
///
/// Linear-interpolation semantics: the value at fractional rank `q * (n-1)`,
/// interpolated between the two bracketing order statistics.
pub(crate) fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    debug_assert!((0.0..=1.0).contains(&q));

    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

/// Approximate p90 by linear interpolation between p75 and p95.
///
/// Used when a pre-aggregated report carries only the restricted quantile
/// set {50, 75, 95, 99}.
pub(crate) fn approx_p90(p75: f64, p95: f64) -> f64 {
    p75 + (0.90 - 0.75) / (0.95 - 0.75) * (p95 - p75)
}
