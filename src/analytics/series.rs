//! Daily and monthly late-ratio time series.

use serde::Serialize;

use crate::analytics::aggregate::{derive_ratio, group_by};
use crate::analytics::dashboard::Dashboard;
use crate::analytics::filter::FilterState;
use crate::analytics::types::{Feature, FactRow, Granularity, Metrics, View, ViewNote};

/// One point of a series: the period key and the late percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub key: String,
    pub late_ratio: f64,
    pub observed: f64,
}

fn points<K: Into<String>>(groups: impl IntoIterator<Item = (K, Metrics)>) -> Vec<SeriesPoint> {
    groups
        .into_iter()
        .map(|(key, m)| SeriesPoint {
            key: key.into(),
            late_ratio: derive_ratio(&m),
            observed: m.observed,
        })
        .collect()
}

fn by_day(rows: &[FactRow]) -> Vec<SeriesPoint> {
    points(group_by(rows, |r| r.day().map(str::to_string)))
}

fn by_month(rows: &[FactRow]) -> Vec<SeriesPoint> {
    points(group_by(rows, |r| {
        let month = r.month();
        (!month.is_empty()).then(|| month.to_string())
    }))
}

impl Dashboard<'_> {
    /// Late ratio per day, ascending.
    ///
    /// Under a route filter the series needs daily origin-destination rows;
    /// without them the view carries an "unavailable" note instead of an
    /// empty chart.
    pub fn daily_series(&self, filter: &FilterState) -> View<Vec<SeriesPoint>> {
        let route = filter.has_route_filter();
        let table = if route {
            &self.tables.routes
        } else {
            &self.tables.kpi
        };

        let granularity = if !route
            && filter.time_window().is_active()
            && table.has(Granularity::DayHour)
        {
            Granularity::DayHour
        } else {
            Granularity::Day
        };

        if granularity == Granularity::Day && !table.has(Granularity::Day) {
            let reason = if route {
                "daily series needs daily origin-destination data"
            } else {
                "daily series needs daily KPI data"
            };
            return View::new(Vec::new(), vec![ViewNote::Unavailable(reason.to_string())]);
        }

        let scan = self.scan_at(table, granularity, filter, route);
        let mut notes = Vec::new();
        if filter.time_window().is_active() && granularity != Granularity::DayHour {
            notes.push(ViewNote::TimeWindowIgnored);
        }
        View::new(by_day(&scan.rows), notes)
    }

    /// Late ratio per month, ascending.
    ///
    /// Months are rolled up from daily rows whenever the filter required
    /// daily data and it was available; otherwise monthly rows are used.
    pub fn monthly_series(&self, filter: &FilterState) -> View<Vec<SeriesPoint>> {
        let scan = if filter.has_route_filter() {
            self.scan(&self.tables.routes, Feature::Routes, filter, true)
        } else {
            self.scan(&self.tables.kpi, Feature::Series, filter, false)
        };
        View::new(by_month(&scan.rows), scan.notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::filter::{TimeWindow, WeekdayMask};
    use crate::analytics::resolver::EntityResolver;
    use crate::analytics::types::FactTables;
    use crate::config::DashboardConfig;
    use chrono::Weekday;

    fn with_dashboard<T>(t: &FactTables, f: impl FnOnce(Dashboard<'_>) -> T) -> T {
        let resolver = EntityResolver::default();
        let config = DashboardConfig::default();
        f(Dashboard::new(t, &resolver, &config))
    }

    fn tables() -> FactTables {
        let mut t = FactTables::default();
        t.kpi.month.push(FactRow::new("2024-02", "REG").with_trips(10.0, 1.0));
        t.kpi.month.push(FactRow::new("2024-01", "REG").with_trips(100.0, 20.0));
        t.kpi.month.push(FactRow::new("2024-01", "IC").with_trips(100.0, 40.0));
        t.kpi.day.push(FactRow::new("2024-01-02", "REG").with_trips(50.0, 5.0));
        t.kpi.day.push(FactRow::new("2024-01-01", "REG").with_trips(50.0, 15.0));
        t.kpi.day.push(FactRow::new("2024-01-01", "IC").with_trips(50.0, 25.0));
        t.kpi.day.push(FactRow::new("2024-02-05", "REG").with_trips(10.0, 1.0));
        t.routes.month.push(FactRow::new("2024-01", "REG").with_route("A", "B").with_trips(4.0, 1.0));
        t
    }

    #[test]
    fn test_daily_series_sorted_and_weighted() {
        let t = tables();
        let view = with_dashboard(&t, |d| d.daily_series(&FilterState::new()));
        let keys: Vec<_> = view.data.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["2024-01-01", "2024-01-02", "2024-02-05"]);
        assert_eq!(view.data[0].late_ratio, 40.0);
        assert_eq!(view.data[0].observed, 100.0);
    }

    #[test]
    fn test_monthly_series_unfiltered_reads_monthly() {
        let t = tables();
        let view = with_dashboard(&t, |d| d.monthly_series(&FilterState::new()));
        assert_eq!(view.data.len(), 2);
        assert_eq!(view.data[0].key, "2024-01");
        assert_eq!(view.data[0].late_ratio, 30.0);
        assert_eq!(view.data[1].key, "2024-02");
    }

    #[test]
    fn test_monthly_series_rolls_up_daily_when_filtered() {
        let t = tables();
        let mut f = FilterState::new();
        f.set_date_range(Some("2024-01-01"), Some("2024-01-01"));
        let view = with_dashboard(&t, |d| d.monthly_series(&f));
        assert_eq!(view.data.len(), 1);
        assert_eq!(view.data[0].observed, 100.0);
        assert_eq!(view.data[0].late_ratio, 40.0);
    }

    #[test]
    fn test_daily_series_route_filter_without_daily_routes_is_unavailable() {
        let t = tables();
        let mut f = FilterState::new();
        f.set_origin("A");
        let view = with_dashboard(&t, |d| d.daily_series(&f));
        assert!(view.data.is_empty());
        assert!(view.is_unavailable());
    }

    #[test]
    fn test_monthly_series_route_filter_uses_monthly_routes() {
        let t = tables();
        let mut f = FilterState::new();
        f.set_origin("A");
        let view = with_dashboard(&t, |d| d.monthly_series(&f));
        assert_eq!(view.data.len(), 1);
        assert_eq!(view.data[0].late_ratio, 25.0);
    }

    #[test]
    fn test_monthly_series_route_weekday_without_daily_is_unsatisfiable() {
        let t = tables();
        let mut f = FilterState::new();
        f.set_destination("B");
        f.set_weekdays(WeekdayMask::only([Weekday::Tue]));
        let view = with_dashboard(&t, |d| d.monthly_series(&f));
        assert!(view.data.is_empty());
        assert!(view.is_unavailable());
    }

    #[test]
    fn test_daily_series_time_window_without_hourly_notes_it() {
        let t = tables();
        let mut f = FilterState::new();
        f.set_time_window(TimeWindow::between("06:00", "07:00"));
        let view = with_dashboard(&t, |d| d.daily_series(&f));
        assert_eq!(view.data.len(), 3);
        assert_eq!(view.notes, vec![ViewNote::TimeWindowIgnored]);
    }
}
