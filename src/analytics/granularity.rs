//! Per-feature choice of the finest granularity a filter needs and the data offers.

use tracing::trace;

use crate::analytics::filter::FilterState;
use crate::analytics::types::{Feature, Granularity, LayeredTable, ViewNote};

/// Which granularities of a table hold at least one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Availability {
    pub month: bool,
    pub day: bool,
    pub day_hour: bool,
}

impl Availability {
    pub fn of(table: &LayeredTable) -> Self {
        Availability {
            month: table.has(Granularity::Month),
            day: table.has(Granularity::Day),
            day_hour: table.has(Granularity::DayHour),
        }
    }
}

/// The granularity to scan, and what could not be honoured.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub granularity: Granularity,
    pub notes: Vec<ViewNote>,
    satisfiable: bool,
}

impl Plan {
    /// False when no loaded table can answer the filter; the view must be empty.
    pub fn is_satisfiable(&self) -> bool {
        self.satisfiable
    }
}

/// Picks the granularity for `feature`.
///
/// 1. Time window active and an hourly table exists: day-hour.
/// 2. Otherwise, a finer-than-month filter is active and a daily table exists: day.
/// 3. Otherwise month.
///
/// Origin-destination views under a route filter never use hourly data.
/// At month level an active weekday mask cannot be evaluated and makes the
/// plan unsatisfiable; an active day range degrades to month precision.
pub fn select(feature: Feature, filter: &FilterState, available: Availability) -> Plan {
    let time_active = filter.time_window().is_active();
    let hourly_allowed = !(feature == Feature::Routes && filter.has_route_filter());

    let granularity = if time_active && hourly_allowed && available.day_hour {
        Granularity::DayHour
    } else if filter.needs_finer() && available.day {
        Granularity::Day
    } else {
        Granularity::Month
    };

    let mut notes = Vec::new();
    let mut satisfiable = true;

    if granularity == Granularity::Month {
        if filter.weekdays().is_active() {
            satisfiable = false;
            notes.push(ViewNote::Unsatisfiable(
                "weekday filter needs daily data".to_string(),
            ));
        } else if filter.date_range().is_some() {
            notes.push(ViewNote::MonthApproximation);
        }
    }
    if satisfiable && time_active && granularity != Granularity::DayHour {
        notes.push(ViewNote::TimeWindowIgnored);
    }

    trace!(?feature, ?granularity, satisfiable, "Granularity selected");

    Plan {
        granularity,
        notes,
        satisfiable,
    }
}
