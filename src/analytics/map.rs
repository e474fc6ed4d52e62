//! Map-ready per-station aggregates.

use serde::Serialize;

use crate::analytics::dashboard::Dashboard;
use crate::analytics::filter::FilterState;
use crate::analytics::kpi::Totals;
use crate::analytics::leaderboard::RankingMetric;
use crate::analytics::resolver::Coords;
use crate::analytics::types::View;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub code: String,
    pub name: String,
    pub city: Option<String>,
    pub coords: Coords,
    /// Value of the selected ranking metric, used for marker sizing.
    pub metric_value: f64,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StationMap {
    pub points: Vec<MapPoint>,
    /// Stations above the threshold that could not be placed.
    pub missing_coordinates: usize,
}

impl Dashboard<'_> {
    /// One point per station with enough observed trips and valid coordinates.
    pub fn map_points(&self, filter: &FilterState, metric: RankingMetric) -> View<StationMap> {
        let groups = self.station_groups(filter);
        let min = self.config.min_counts.stations;

        let mut map = StationMap::default();
        for (code, m) in groups.data {
            if m.observed < min {
                continue;
            }
            let station = self.resolver.resolve(&code);
            let Some(coords) = station.coords else {
                map.missing_coordinates += 1;
                continue;
            };
            map.points.push(MapPoint {
                code,
                name: station.name,
                city: station.city,
                coords,
                metric_value: metric.value(&m),
                totals: Totals::from(&m),
            });
        }
        map.points
            .sort_by(|a, b| b.metric_value.total_cmp(&a.metric_value));

        View::new(map, groups.notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::resolver::{EntityResolver, StationRecord};
    use crate::analytics::types::{FactRow, FactTables};
    use crate::config::DashboardConfig;

    fn record(code: &str, lat: Option<f64>, lon: Option<f64>) -> StationRecord {
        StationRecord {
            code: code.to_string(),
            name: format!("Station {code}"),
            city: "Roma".to_string(),
            lat,
            lon,
        }
    }

    #[test]
    fn test_map_points_threshold_and_missing_coordinates() {
        let mut t = FactTables::default();
        t.stations.month.push(FactRow::new("2024-01", "REG").with_station("A").with_trips(100.0, 20.0));
        t.stations.month.push(FactRow::new("2024-01", "REG").with_station("B").with_trips(50.0, 25.0));
        t.stations.month.push(FactRow::new("2024-01", "REG").with_station("C").with_trips(40.0, 4.0));
        t.stations.month.push(FactRow::new("2024-01", "REG").with_station("D").with_trips(5.0, 5.0));
        let resolver = EntityResolver::new(
            vec![
                record("A", Some(41.9), Some(12.5)),
                record("B", Some(12.5), Some(41.9)),
                record("C", Some(0.0), Some(0.0)),
                record("D", Some(45.0), Some(9.0)),
            ],
            Vec::<String>::new(),
        );
        let config = DashboardConfig::default();
        let view = Dashboard::new(&t, &resolver, &config)
            .map_points(&FilterState::new(), RankingMetric::Ratio);

        let codes: Vec<_> = view.data.points.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, ["B", "A"]);
        assert_eq!(view.data.points[0].coords, Coords { lat: 41.9, lon: 12.5 });
        assert_eq!(view.data.points[0].metric_value, 50.0);
        assert_eq!(view.data.missing_coordinates, 1);
    }

    #[test]
    fn test_map_points_ignore_route_filter() {
        let mut t = FactTables::default();
        t.stations.month.push(FactRow::new("2024-01", "REG").with_station("A").with_trips(30.0, 3.0));
        let resolver = EntityResolver::new(vec![record("A", Some(41.9), Some(12.5))], Vec::<String>::new());
        let config = DashboardConfig::default();
        let mut f = FilterState::new();
        f.set_origin("Z");
        let view = Dashboard::new(&t, &resolver, &config).map_points(&f, RankingMetric::Late);
        assert_eq!(view.data.points.len(), 1);
        assert_eq!(view.data.points[0].metric_value, 3.0);
    }
}
