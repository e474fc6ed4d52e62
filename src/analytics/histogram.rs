//! Delay-bucket histogram.

use serde::Serialize;
use std::str::FromStr;

use crate::analytics::aggregate::pct;
use crate::analytics::dashboard::Dashboard;
use crate::analytics::filter::FilterState;
use crate::analytics::types::{Feature, View, ViewNote};

/// Raw counts or share of the filtered total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramMode {
    #[default]
    Count,
    Percent,
}

impl FromStr for HistogramMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(HistogramMode::Count),
            "percent" | "pct" => Ok(HistogramMode::Percent),
            other => Err(format!("unknown histogram mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub label: String,
    pub value: f64,
}

/// Whitespace-insensitive form of a bucket label.
pub fn canonical_bucket(label: &str) -> String {
    label.chars().filter(|c| !c.is_whitespace()).collect()
}

impl Dashboard<'_> {
    /// Trip counts per configured delay bucket, in configured order.
    ///
    /// Rows with labels outside the configured set are dropped. Histogram
    /// tables carry no route keys, so a route filter makes the view unavailable.
    pub fn delay_histogram(
        &self,
        filter: &FilterState,
        mode: HistogramMode,
    ) -> View<Vec<HistogramBin>> {
        if filter.has_route_filter() {
            return View::new(
                Vec::new(),
                vec![ViewNote::Unavailable(
                    "delay histogram is not broken down by route".to_string(),
                )],
            );
        }

        let labels = self.config.bucket_labels();
        if labels.is_empty() {
            return View::new(Vec::new(), Vec::new());
        }
        let canonical: Vec<String> = labels.iter().map(|l| canonical_bucket(l)).collect();

        let scan = self.scan(&self.tables.histogram, Feature::Histogram, filter, false);
        let mut counts = vec![0.0; labels.len()];
        for row in &scan.rows {
            let Some(bucket) = row.bucket.as_deref() else {
                continue;
            };
            let key = canonical_bucket(bucket);
            if let Some(idx) = canonical.iter().position(|c| *c == key) {
                counts[idx] += row.metrics.count;
            }
        }

        let total: f64 = counts.iter().sum();
        let bins = labels
            .iter()
            .zip(counts)
            .map(|(label, count)| HistogramBin {
                label: label.clone(),
                value: match mode {
                    HistogramMode::Count => count,
                    HistogramMode::Percent => pct(count, total),
                },
            })
            .collect();

        View::new(bins, scan.notes)
    }
}
