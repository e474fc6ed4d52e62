//! Headline KPI summary.

use serde::Serialize;

use crate::analytics::aggregate::{derive_ratio, sum};
use crate::analytics::dashboard::Dashboard;
use crate::analytics::filter::FilterState;
use crate::analytics::types::{Feature, Metrics, View};

/// Headline counts plus the late ratio derived from them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub observed: f64,
    pub late: f64,
    pub late_minutes: f64,
    pub cancelled: f64,
    pub suppressed: f64,
    pub late_ratio: f64,
}

impl From<&Metrics> for Totals {
    fn from(m: &Metrics) -> Self {
        Totals {
            observed: m.observed,
            late: m.late,
            late_minutes: m.late_minutes,
            cancelled: m.cancelled,
            suppressed: m.suppressed,
            late_ratio: derive_ratio(m),
        }
    }
}

pub type KpiSummary = Totals;

impl Dashboard<'_> {
    /// Network totals, or origin-destination totals when a route filter is set.
    pub fn kpi_summary(&self, filter: &FilterState) -> View<KpiSummary> {
        let scan = if filter.has_route_filter() {
            self.scan(&self.tables.routes, Feature::Routes, filter, true)
        } else {
            self.scan(&self.tables.kpi, Feature::Kpi, filter, false)
        };
        View::new(Totals::from(&sum(&scan.rows)), scan.notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::filter::{TimeWindow, WeekdayMask};
    use crate::analytics::resolver::EntityResolver;
    use crate::analytics::types::{FactRow, FactTables, ViewNote};
    use crate::config::DashboardConfig;
    use chrono::Weekday;

    fn tables() -> FactTables {
        let mut t = FactTables::default();
        t.kpi.month.push(FactRow::new("2024-01", "REG").with_trips(100.0, 20.0));
        t.kpi.month.push(FactRow::new("2024-01", "IC").with_trips(50.0, 5.0));
        t.kpi.month.push(FactRow::new("2023-12", "REG").with_trips(10.0, 10.0));
        // 2024-01-06 Saturday, 2024-01-08 Monday
        t.kpi.day.push(FactRow::new("2024-01-06", "REG").with_trips(30.0, 3.0));
        t.kpi.day.push(FactRow::new("2024-01-08", "REG").with_trips(70.0, 17.0));
        t.kpi.day_hour.push(FactRow::new("2024-01-08", "REG").with_hour(7).with_trips(40.0, 12.0));
        t.kpi.day_hour.push(FactRow::new("2024-01-08", "REG").with_hour(17).with_trips(30.0, 5.0));
        t.routes.month.push(FactRow::new("2024-01", "REG").with_route("A", "B").with_trips(8.0, 4.0));
        t.routes.month.push(FactRow::new("2024-01", "REG").with_route("A", "C").with_trips(2.0, 0.0));
        t
    }

    fn run(filter: &FilterState) -> View<KpiSummary> {
        let t = tables();
        let resolver = EntityResolver::default();
        let config = DashboardConfig::default();
        Dashboard::new(&t, &resolver, &config).kpi_summary(filter)
    }

    #[test]
    fn test_kpi_unfiltered_uses_monthly() {
        let view = run(&FilterState::new());
        assert_eq!(view.data.observed, 160.0);
        assert_eq!(view.data.late, 35.0);
        assert!(view.notes.is_empty());
    }

    #[test]
    fn test_kpi_year_and_category() {
        let mut f = FilterState::new();
        f.set_year("2024");
        f.set_category("REG");
        let view = run(&f);
        assert_eq!(view.data.observed, 100.0);
        assert_eq!(view.data.late_ratio, 20.0);
    }

    #[test]
    fn test_kpi_weekday_uses_daily() {
        let mut f = FilterState::new();
        f.set_weekdays(WeekdayMask::only([Weekday::Mon]));
        let view = run(&f);
        assert_eq!(view.data.observed, 70.0);
        assert_eq!(view.data.late, 17.0);
    }

    #[test]
    fn test_kpi_time_window_uses_hourly() {
        let mut f = FilterState::new();
        f.set_time_window(TimeWindow::between("06:00", "09:00"));
        let view = run(&f);
        assert_eq!(view.data.observed, 40.0);
        assert_eq!(view.data.late, 12.0);
    }

    #[test]
    fn test_kpi_route_filter_uses_routes() {
        let mut f = FilterState::new();
        f.set_origin("A");
        f.set_destination("B");
        let view = run(&f);
        assert_eq!(view.data.observed, 8.0);
        assert_eq!(view.data.late_ratio, 50.0);
    }

    #[test]
    fn test_kpi_route_with_weekday_but_no_daily_routes_is_unsatisfiable() {
        let mut f = FilterState::new();
        f.set_origin("A");
        f.set_weekdays(WeekdayMask::only([Weekday::Mon]));
        let view = run(&f);
        assert_eq!(view.data, Totals::default());
        assert!(view.is_unavailable());
        assert!(matches!(view.notes[0], ViewNote::Unsatisfiable(_)));
    }
}
