//! Dashboard configuration read from the published `manifest.json`.
//!
//! ```json
//! {
//!   "built_at_utc": "2024-06-01T03:00:00Z",
//!   "punctuality": { "on_time_threshold_minutes": 4 },
//!   "delay_buckets_minutes": {
//!     "buckets": [0, 5, 10, 15, 30, 60, 999999],
//!     "labels": ["0-4", "5-9", "10-14", "15-29", "30-59", "60+"]
//!   },
//!   "min_counts": { "stations": 20, "routes": 20, "cities": 20 },
//!   "gold_files": ["kpi_mese_categoria.csv", "..."]
//! }
//! ```
//!
//! Every key is optional; missing keys take the built-in defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Documentation-only punctuality settings; bucketing happens upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Punctuality {
    #[serde(alias = "on_time_max_delay_minutes")]
    pub on_time_threshold_minutes: u32,
}

impl Default for Punctuality {
    fn default() -> Self {
        Punctuality {
            on_time_threshold_minutes: 4,
        }
    }
}

/// Ordered delay-bucket edges and display labels, most early to most late.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayBuckets {
    pub buckets: Vec<i64>,
    pub labels: Vec<String>,
}

impl Default for DelayBuckets {
    fn default() -> Self {
        DelayBuckets {
            buckets: vec![0, 5, 10, 15, 30, 60, 999_999],
            labels: ["0-4", "5-9", "10-14", "15-29", "30-59", "60+"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Minimum observed trips for an entity to enter a leaderboard or the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinCounts {
    pub stations: f64,
    #[serde(alias = "od")]
    pub routes: f64,
    pub cities: f64,
}

impl Default for MinCounts {
    fn default() -> Self {
        MinCounts {
            stations: 20.0,
            routes: 20.0,
            cities: 20.0,
        }
    }
}

/// Leaderboard lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopN {
    pub stations: usize,
    pub routes: usize,
    pub cities: usize,
}

impl Default for TopN {
    fn default() -> Self {
        TopN {
            stations: 20,
            routes: 20,
            cities: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub built_at_utc: Option<String>,
    pub punctuality: Punctuality,
    pub delay_buckets_minutes: DelayBuckets,
    pub min_counts: MinCounts,
    pub top_n: TopN,
    pub gold_files: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            built_at_utc: None,
            punctuality: Punctuality::default(),
            delay_buckets_minutes: DelayBuckets::default(),
            min_counts: MinCounts::default(),
            top_n: TopN::default(),
            gold_files: [
                "kpi_mese_categoria.csv",
                "kpi_giorno_categoria.csv",
                "od_mese_categoria.csv",
                "stazioni_mese_categoria_nodo.csv",
                "hist_mese_categoria.csv",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl DashboardConfig {
    /// Parses a manifest document.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn bucket_labels(&self) -> &[String] {
        &self.delay_buckets_minutes.labels
    }
}
