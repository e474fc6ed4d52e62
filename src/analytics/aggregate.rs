//! Additive aggregation of fact rows and ratio derivation.
//!
//! Counts are always summed; ratios are derived from summed numerator and
//! denominator and never averaged across rows.

use std::collections::BTreeMap;

use crate::analytics::types::{FactRow, Granularity, Metrics};

/// Sums every count field across `rows`.
pub fn sum<'a, I>(rows: I) -> Metrics
where
    I: IntoIterator<Item = &'a FactRow>,
{
    let mut total = Metrics::default();
    for row in rows {
        total += &row.metrics;
    }
    total
}

/// Sums rows per key. Rows for which `key_fn` returns `None` are skipped.
pub fn group_by<'a, I, K, F>(rows: I, key_fn: F) -> BTreeMap<K, Metrics>
where
    I: IntoIterator<Item = &'a FactRow>,
    K: Ord,
    F: Fn(&FactRow) -> Option<K>,
{
    let mut groups: BTreeMap<K, Metrics> = BTreeMap::new();
    for row in rows {
        if let Some(key) = key_fn(row) {
            *groups.entry(key).or_default() += &row.metrics;
        }
    }
    groups
}

/// Late trips as a percentage of observed trips; 0 when nothing was observed.
pub fn derive_ratio(metrics: &Metrics) -> f64 {
    if metrics.observed > 0.0 {
        metrics.late / metrics.observed * 100.0
    } else {
        0.0
    }
}

/// Share of `part` in `total` as a percentage; 0 for an empty total.
pub fn pct(part: f64, total: f64) -> f64 {
    if total > 0.0 { part / total * 100.0 } else { 0.0 }
}

type RollupKey = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Rolls rows up to a coarser granularity.
///
/// Rows are grouped by truncated period plus every dimension key (category,
/// route, station, bucket); the hour is dropped. Output is sorted by key.
pub fn roll_up<'a, I>(rows: I, target: Granularity) -> Vec<FactRow>
where
    I: IntoIterator<Item = &'a FactRow>,
{
    let len = target.period_len();
    let groups = group_by(rows, |row| -> Option<RollupKey> {
        let period = row.period.get(..len).unwrap_or(&row.period);
        if period.is_empty() {
            return None;
        }
        let category = match row.category.trim() {
            "" => "all",
            c => c,
        };
        Some((
            period.to_string(),
            category.to_string(),
            row.origin.clone(),
            row.destination.clone(),
            row.station.clone(),
            row.bucket.clone(),
        ))
    });

    groups
        .into_iter()
        .map(
            |((period, category, origin, destination, station, bucket), metrics)| FactRow {
                period,
                hour: None,
                category,
                origin,
                destination,
                station,
                bucket,
                metrics,
            },
        )
        .collect()
}
