//! Ranked, threshold-filtered leaderboards of stations, routes and cities.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use crate::analytics::aggregate::{derive_ratio, group_by};
use crate::analytics::dashboard::Dashboard;
use crate::analytics::filter::FilterState;
use crate::analytics::kpi::Totals;
use crate::analytics::types::{Feature, FactRow, Metrics, View};

/// The value a leaderboard is sorted by, descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    #[default]
    Ratio,
    Late,
    LateMinutes,
    Cancelled,
    Suppressed,
}

impl RankingMetric {
    pub fn value(self, m: &Metrics) -> f64 {
        match self {
            RankingMetric::Ratio => derive_ratio(m),
            RankingMetric::Late => m.late,
            RankingMetric::LateMinutes => m.late_minutes,
            RankingMetric::Cancelled => m.cancelled,
            RankingMetric::Suppressed => m.suppressed,
        }
    }
}

impl FromStr for RankingMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "ratio" => Ok(RankingMetric::Ratio),
            "late" => Ok(RankingMetric::Late),
            "late-minutes" => Ok(RankingMetric::LateMinutes),
            "cancelled" => Ok(RankingMetric::Cancelled),
            "suppressed" => Ok(RankingMetric::Suppressed),
            other => Err(format!("unknown ranking metric: {other}")),
        }
    }
}

/// Caller-selectable leaderboard settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LeaderboardOptions {
    pub metric: RankingMetric,
    /// Only rank cities in the configured capital set.
    pub capitals_only: bool,
}

/// Keeps groups with at least `min_observed` trips, sorts by `metric`
/// descending (ties by key ascending) and keeps the first `top_n`.
pub fn rank<K: Ord>(
    groups: BTreeMap<K, Metrics>,
    metric: RankingMetric,
    min_observed: f64,
    top_n: usize,
) -> Vec<(K, Metrics)> {
    let mut kept: Vec<(K, Metrics)> = groups
        .into_iter()
        .filter(|(_, m)| m.observed >= min_observed)
        .collect();
    // BTreeMap order is key order, so a stable sort keeps ties by key.
    kept.sort_by(|(_, a), (_, b)| metric.value(b).total_cmp(&metric.value(a)));
    kept.truncate(top_n);
    kept
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationEntry {
    pub rank: usize,
    pub code: String,
    pub name: String,
    pub city: Option<String>,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteEntry {
    pub rank: usize,
    pub origin_code: String,
    pub origin_name: String,
    pub destination_code: String,
    pub destination_name: String,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityEntry {
    pub rank: usize,
    pub city: String,
    /// Distinct stations contributing to the city total.
    pub stations: usize,
    #[serde(flatten)]
    pub totals: Totals,
}

/// How stations are attributed to cities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "station", rename_all = "snake_case")]
pub enum CityMode {
    /// Each station's own city, over the whole network.
    Network,
    /// Destination cities of trips leaving the given origin.
    DestinationsFrom(String),
    /// Origin cities of trips reaching the given destination.
    OriginsTo(String),
}

impl CityMode {
    /// An origin filter takes precedence over a destination filter.
    pub fn for_filter(filter: &FilterState) -> Self {
        if let Some(origin) = filter.origin().value() {
            CityMode::DestinationsFrom(origin.to_string())
        } else if let Some(destination) = filter.destination().value() {
            CityMode::OriginsTo(destination.to_string())
        } else {
            CityMode::Network
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityLeaderboard {
    pub mode: CityMode,
    pub entries: Vec<CityEntry>,
}

fn station_key(row: &FactRow) -> Option<String> {
    let code = row.station.as_deref()?.trim();
    (!code.is_empty()).then(|| code.to_string())
}

impl Dashboard<'_> {
    /// Per-station totals grouped by station code; not route-shaped.
    pub(crate) fn station_groups(
        &self,
        filter: &FilterState,
    ) -> View<BTreeMap<String, Metrics>> {
        let scan = self.scan(&self.tables.stations, Feature::Stations, filter, false);
        View::new(group_by(&scan.rows, station_key), scan.notes)
    }

    pub fn station_leaderboard(
        &self,
        filter: &FilterState,
        options: LeaderboardOptions,
    ) -> View<Vec<StationEntry>> {
        let groups = self.station_groups(filter);
        let ranked = rank(
            groups.data,
            options.metric,
            self.config.min_counts.stations,
            self.config.top_n.stations,
        );
        let entries = ranked
            .into_iter()
            .enumerate()
            .map(|(i, (code, m))| {
                let station = self.resolver.resolve(&code);
                StationEntry {
                    rank: i + 1,
                    code,
                    name: station.name,
                    city: station.city,
                    totals: Totals::from(&m),
                }
            })
            .collect();
        View::new(entries, groups.notes)
    }

    pub fn route_leaderboard(
        &self,
        filter: &FilterState,
        options: LeaderboardOptions,
    ) -> View<Vec<RouteEntry>> {
        let scan = self.scan(&self.tables.routes, Feature::Routes, filter, true);
        let groups = group_by(&scan.rows, |r| {
            let origin = r.origin.as_deref()?.trim();
            let destination = r.destination.as_deref()?.trim();
            (!origin.is_empty() && !destination.is_empty())
                .then(|| (origin.to_string(), destination.to_string()))
        });
        let ranked = rank(
            groups,
            options.metric,
            self.config.min_counts.routes,
            self.config.top_n.routes,
        );
        let entries = ranked
            .into_iter()
            .enumerate()
            .map(|(i, ((origin, destination), m))| RouteEntry {
                rank: i + 1,
                origin_name: self.resolver.resolve(&origin).name,
                destination_name: self.resolver.resolve(&destination).name,
                origin_code: origin,
                destination_code: destination,
                totals: Totals::from(&m),
            })
            .collect();
        View::new(entries, scan.notes)
    }

    /// City totals in network or route-counterpart mode.
    ///
    /// Stations without a known city are skipped. With `capitals_only` and a
    /// non-empty capital set, only member cities are ranked.
    pub fn city_leaderboard(
        &self,
        filter: &FilterState,
        options: LeaderboardOptions,
    ) -> View<CityLeaderboard> {
        let mode = CityMode::for_filter(filter);
        let (rows, notes) = match &mode {
            CityMode::Network => {
                let scan = self.scan(&self.tables.stations, Feature::Stations, filter, false);
                (scan.rows, scan.notes)
            }
            CityMode::DestinationsFrom(_) | CityMode::OriginsTo(_) => {
                let scan = self.scan(&self.tables.routes, Feature::Routes, filter, true);
                (scan.rows, scan.notes)
            }
        };

        let station_of = |row: &FactRow| -> Option<String> {
            let code = match &mode {
                CityMode::Network => row.station.as_deref(),
                CityMode::DestinationsFrom(_) => row.destination.as_deref(),
                CityMode::OriginsTo(_) => row.origin.as_deref(),
            }?;
            let code = code.trim();
            (!code.is_empty()).then(|| code.to_string())
        };

        let mut members: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let groups = group_by(&rows, |row| {
            let code = station_of(row)?;
            let city = self.resolver.city_of(&code)?;
            if options.capitals_only && !self.resolver.is_capital_city(city) {
                return None;
            }
            Some(city.to_string())
        });
        for row in &rows {
            if let Some(code) = station_of(row)
                && let Some(city) = self.resolver.city_of(&code)
                && groups.contains_key(city)
            {
                members.entry(city.to_string()).or_default().insert(code);
            }
        }

        let ranked = rank(
            groups,
            options.metric,
            self.config.min_counts.cities,
            self.config.top_n.cities,
        );
        let entries = ranked
            .into_iter()
            .enumerate()
            .map(|(i, (city, m))| CityEntry {
                rank: i + 1,
                stations: members.get(&city).map_or(0, BTreeSet::len),
                city,
                totals: Totals::from(&m),
            })
            .collect();

        View::new(CityLeaderboard { mode, entries }, notes)
    }
}
