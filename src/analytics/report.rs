//! One-shot assembly of every view for a filter state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::analytics::dashboard::Dashboard;
use crate::analytics::filter::FilterState;
use crate::analytics::histogram::{HistogramBin, HistogramMode};
use crate::analytics::kpi::KpiSummary;
use crate::analytics::leaderboard::{
    CityLeaderboard, LeaderboardOptions, RankingMetric, RouteEntry, StationEntry,
};
use crate::analytics::map::StationMap;
use crate::analytics::resolver::CoordinateCoverage;
use crate::analytics::series::SeriesPoint;
use crate::analytics::types::{Granularity, View};

/// Caller-selected display settings shared by the views.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportOptions {
    pub ranking: RankingMetric,
    pub histogram_mode: HistogramMode,
    pub capitals_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub generated_at: DateTime<Utc>,
    pub data_built_at: Option<String>,
    pub filter: FilterState,
    pub ranking: RankingMetric,
    pub histogram_mode: HistogramMode,
    pub kpi: View<KpiSummary>,
    pub daily_series: View<Vec<SeriesPoint>>,
    pub monthly_series: View<Vec<SeriesPoint>>,
    pub histogram: View<Vec<HistogramBin>>,
    pub stations: View<Vec<StationEntry>>,
    pub routes: View<Vec<RouteEntry>>,
    pub cities: View<CityLeaderboard>,
    pub map: View<StationMap>,
    pub coverage: CoordinateCoverage,
    /// Active filters the loaded data cannot fully honour.
    pub filter_notes: Vec<String>,
    pub warnings: Vec<String>,
}

impl Dashboard<'_> {
    /// Explains which active filters the loaded tables cannot support.
    ///
    /// Empty when no day, weekday or time filter is active.
    pub fn filter_notes(&self, filter: &FilterState) -> Vec<String> {
        let day_filter = filter.date_range().is_some();
        let weekday_filter = filter.weekdays().is_active();
        let time_filter = filter.time_window().is_active();
        if !day_filter && !weekday_filter && !time_filter {
            return Vec::new();
        }

        let t = self.tables;
        let mut notes = Vec::new();

        if weekday_filter && !t.kpi.has(Granularity::Day) {
            notes.push("Weekday filter active, but no daily series are loaded.".to_string());
        }
        if time_filter {
            if !t.kpi.has(Granularity::DayHour) {
                notes.push("Time filter active, but hourly KPI data is missing.".to_string());
            }
            if !t.histogram.has(Granularity::DayHour) {
                notes.push("Time filter active, but hourly histogram data is missing.".to_string());
            }
        }
        let any_daily_detail = t.routes.has(Granularity::Day)
            || t.stations.has(Granularity::Day)
            || t.histogram.has(Granularity::Day);
        if (day_filter || weekday_filter) && !any_daily_detail {
            notes.push(
                "Tables, map and routes also need daily route, station and histogram data."
                    .to_string(),
            );
        }
        if time_filter && filter.has_route_filter() {
            notes.push(
                "With an origin or destination filter the time filter does not apply to routes."
                    .to_string(),
            );
        }
        notes
    }

    /// Computes every view for `filter`.
    pub fn report(&self, filter: &FilterState, options: ReportOptions) -> DashboardReport {
        let mut warnings = Vec::new();
        if self.tables.is_empty() {
            warn!("No fact rows loaded");
            warnings.push("no data loaded".to_string());
        }

        let leaderboard = LeaderboardOptions {
            metric: options.ranking,
            capitals_only: options.capitals_only,
        };

        let report = DashboardReport {
            generated_at: Utc::now(),
            data_built_at: self.config.built_at_utc.clone(),
            filter: filter.clone(),
            ranking: options.ranking,
            histogram_mode: options.histogram_mode,
            kpi: self.kpi_summary(filter),
            daily_series: self.daily_series(filter),
            monthly_series: self.monthly_series(filter),
            histogram: self.delay_histogram(filter, options.histogram_mode),
            stations: self.station_leaderboard(filter, leaderboard),
            routes: self.route_leaderboard(filter, leaderboard),
            cities: self.city_leaderboard(filter, leaderboard),
            map: self.map_points(filter, options.ranking),
            coverage: self.resolver.coverage(),
            filter_notes: self.filter_notes(filter),
            warnings,
        };
        debug!(
            stations = report.stations.data.len(),
            routes = report.routes.data.len(),
            cities = report.cities.data.entries.len(),
            map_points = report.map.data.points.len(),
            "Report assembled"
        );
        report
    }
}
