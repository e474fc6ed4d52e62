//! The view-building entry point and its shared scan pipeline.

use tracing::debug;

use crate::analytics::aggregate::roll_up;
use crate::analytics::filter::{FilterState, passes};
use crate::analytics::granularity::{Availability, select};
use crate::analytics::resolver::EntityResolver;
use crate::analytics::types::{Feature, FactRow, FactTables, Granularity, LayeredTable, ViewNote};
use crate::config::DashboardConfig;

/// Read-only view builder over loaded tables.
///
/// Every view method takes the current [`FilterState`] by reference and
/// recomputes from scratch.
#[derive(Debug, Clone, Copy)]
pub struct Dashboard<'a> {
    pub(crate) tables: &'a FactTables,
    pub(crate) resolver: &'a EntityResolver,
    pub(crate) config: &'a DashboardConfig,
}

/// Filtered rows of one table, at day level when hourly data was scanned.
#[derive(Debug, Clone)]
pub(crate) struct Scan {
    pub granularity: Granularity,
    pub rows: Vec<FactRow>,
    pub notes: Vec<ViewNote>,
}

impl<'a> Dashboard<'a> {
    pub fn new(
        tables: &'a FactTables,
        resolver: &'a EntityResolver,
        config: &'a DashboardConfig,
    ) -> Self {
        Dashboard {
            tables,
            resolver,
            config,
        }
    }

    /// Plans the granularity for `feature` and filters `table` accordingly.
    pub(crate) fn scan(
        &self,
        table: &LayeredTable,
        feature: Feature,
        filter: &FilterState,
        route_shaped: bool,
    ) -> Scan {
        let plan = select(feature, filter, Availability::of(table));
        if !plan.is_satisfiable() {
            debug!(?feature, "Filter unsatisfiable at available granularity");
            return Scan {
                granularity: plan.granularity,
                rows: Vec::new(),
                notes: plan.notes,
            };
        }
        let mut scan = self.scan_at(table, plan.granularity, filter, route_shaped);
        scan.notes = plan.notes;
        debug!(
            ?feature,
            granularity = ?scan.granularity,
            rows = scan.rows.len(),
            "Rows scanned"
        );
        scan
    }

    /// Filters `table` at a fixed granularity; hourly rows are rolled up to days.
    pub(crate) fn scan_at(
        &self,
        table: &LayeredTable,
        granularity: Granularity,
        filter: &FilterState,
        route_shaped: bool,
    ) -> Scan {
        let filtered = table
            .rows(granularity)
            .iter()
            .filter(|row| passes(row, filter, granularity, route_shaped));

        let rows = match granularity {
            Granularity::DayHour => roll_up(filtered, Granularity::Day),
            Granularity::Day | Granularity::Month => filtered.cloned().collect(),
        };

        Scan {
            granularity,
            rows,
            notes: Vec::new(),
        }
    }
}
