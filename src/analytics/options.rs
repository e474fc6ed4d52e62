//! Selectable filter values derived from the loaded tables.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::analytics::resolver::EntityResolver;
use crate::analytics::types::FactTables;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationOption {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub years: Vec<String>,
    pub categories: Vec<String>,
    pub stations: Vec<StationOption>,
    pub first_day: Option<String>,
    pub last_day: Option<String>,
}

impl FilterOptions {
    /// Years come from monthly KPI periods, categories from every KPI row,
    /// stations from monthly origin-destination codes sorted by label.
    pub fn from_tables(tables: &FactTables, resolver: &EntityResolver) -> Self {
        let years: BTreeSet<String> = tables
            .kpi
            .month
            .iter()
            .filter_map(|r| r.period.get(..4))
            .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
            .collect();

        let categories: BTreeSet<String> = tables
            .kpi
            .month
            .iter()
            .chain(&tables.kpi.day)
            .map(|r| r.category.trim())
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
            .map(str::to_string)
            .collect();

        let codes: BTreeSet<&str> = tables
            .routes
            .month
            .iter()
            .flat_map(|r| [r.origin.as_deref(), r.destination.as_deref()])
            .flatten()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        let mut stations: Vec<StationOption> = codes
            .into_iter()
            .map(|code| StationOption {
                code: code.to_string(),
                label: resolver.label(code),
            })
            .collect();
        stations.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.code.cmp(&b.code)));

        let days: BTreeSet<&str> = [&tables.kpi, &tables.routes, &tables.stations, &tables.histogram]
            .into_iter()
            .flat_map(|t| t.day.iter().chain(&t.day_hour))
            .filter_map(|r| r.day())
            .collect();

        FilterOptions {
            years: years.into_iter().collect(),
            categories: categories.into_iter().collect(),
            stations,
            first_day: days.first().map(|d| d.to_string()),
            last_day: days.last().map(|d| d.to_string()),
        }
    }
}
