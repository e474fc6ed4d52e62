//! Filter state and the row predicates evaluated against it.
//!
//! [`FilterState`] is only changed through its setters and is read-only while
//! views are computed. Each `pass_*` predicate is independent; callers AND them.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Serialize, Serializer};

use crate::analytics::types::{FactRow, Granularity};

/// `"all"` or one exact value for a categorical dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Choice {
    #[default]
    All,
    Only(String),
}

impl Choice {
    /// Blank input and `"all"` (any case) select everything.
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            Choice::All
        } else {
            Choice::Only(value.to_string())
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Choice::All)
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Choice::All => None,
            Choice::Only(v) => Some(v),
        }
    }

    /// Exact match after trimming the row value.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(v) => value.trim() == v,
        }
    }
}

impl Serialize for Choice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.value().unwrap_or("all"))
    }
}

/// Inclusive `YYYY-MM-DD` day range with ordered bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    from: String,
    to: String,
}

impl DateRange {
    /// Builds a range from optional bounds.
    ///
    /// Unparseable bounds count as unset. A single bound becomes a one-day
    /// range and inverted bounds are swapped.
    pub fn new(from: Option<&str>, to: Option<&str>) -> Option<Self> {
        let from = from.and_then(parse_day);
        let to = to.and_then(parse_day);
        let (from, to) = match (from, to) {
            (Some(a), Some(b)) if a <= b => (a, b),
            (Some(a), Some(b)) => (b, a),
            (Some(a), None) => (a.clone(), a),
            (None, Some(b)) => (b.clone(), b),
            (None, None) => return None,
        };
        Some(DateRange { from, to })
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    /// ISO dates order correctly as strings.
    pub fn contains_day(&self, day: &str) -> bool {
        day >= self.from.as_str() && day <= self.to.as_str()
    }

    /// Month-precision check used when only monthly rows exist.
    pub fn contains_month(&self, month: &str) -> bool {
        month >= &self.from[..7] && month <= &self.to[..7]
    }
}

fn parse_day(raw: &str) -> Option<String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Selected weekdays, indexed Monday = 0 through Sunday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekdayMask([bool; 7]);

impl Default for WeekdayMask {
    fn default() -> Self {
        WeekdayMask([true; 7])
    }
}

impl WeekdayMask {
    pub fn only<I: IntoIterator<Item = Weekday>>(days: I) -> Self {
        let mut mask = [false; 7];
        for day in days {
            mask[day.num_days_from_monday() as usize] = true;
        }
        WeekdayMask(mask)
    }

    pub fn includes(&self, day: Weekday) -> bool {
        self.0[day.num_days_from_monday() as usize]
    }

    pub fn toggle(&mut self, day: Weekday) {
        let idx = day.num_days_from_monday() as usize;
        self.0[idx] = !self.0[idx];
    }

    /// A mask that excludes every day behaves like no filter.
    pub fn is_active(&self) -> bool {
        self.0.iter().any(|d| *d) && self.0.iter().any(|d| !*d)
    }
}

/// Time-of-day window in minutes after midnight; wraps when `from > to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    all_day: bool,
    from: u16,
    to: u16,
}

const LAST_MINUTE: u16 = 23 * 60 + 59;

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow {
            all_day: true,
            from: 0,
            to: LAST_MINUTE,
        }
    }
}

impl TimeWindow {
    /// Parses `HH:MM` bounds; a bad start means 00:00, a bad end 23:59.
    pub fn between(from: &str, to: &str) -> Self {
        TimeWindow {
            all_day: false,
            from: parse_time_to_minutes(from).unwrap_or(0),
            to: parse_time_to_minutes(to).unwrap_or(LAST_MINUTE),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.all_day
    }

    /// Whether the hour bucket `[h*60, h*60+59]` overlaps the window.
    pub fn overlaps_hour(&self, hour: u8) -> bool {
        if self.all_day {
            return true;
        }
        let start = u16::from(hour) * 60;
        let end = start + 59;
        if self.from <= self.to {
            end >= self.from && start <= self.to
        } else {
            end >= self.from || start <= self.to
        }
    }
}

/// Parses `H:MM` or `HH:MM`, clamping hours to 0-23 and minutes to 0-59.
pub fn parse_time_to_minutes(raw: &str) -> Option<u16> {
    let (hh, mm) = raw.trim().split_once(':')?;
    let valid_hh = (1..=2).contains(&hh.len()) && hh.chars().all(|c| c.is_ascii_digit());
    let valid_mm = mm.len() == 2 && mm.chars().all(|c| c.is_ascii_digit());
    if !valid_hh || !valid_mm {
        return None;
    }
    let hours: u16 = hh.parse().ok()?;
    let minutes: u16 = mm.parse().ok()?;
    Some(hours.min(23) * 60 + minutes.min(59))
}

/// The composite dashboard filter.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FilterState {
    year: Choice,
    category: Choice,
    origin: Choice,
    destination: Choice,
    date_range: Option<DateRange>,
    weekdays: WeekdayMask,
    time_window: TimeWindow,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_year(&mut self, year: &str) {
        self.year = Choice::parse(year);
    }

    pub fn set_category(&mut self, category: &str) {
        self.category = Choice::parse(category);
    }

    pub fn set_origin(&mut self, code: &str) {
        self.origin = Choice::parse(code);
    }

    pub fn set_destination(&mut self, code: &str) {
        self.destination = Choice::parse(code);
    }

    pub fn set_date_range(&mut self, from: Option<&str>, to: Option<&str>) {
        self.date_range = DateRange::new(from, to);
    }

    pub fn set_weekdays(&mut self, mask: WeekdayMask) {
        self.weekdays = mask;
    }

    pub fn toggle_weekday(&mut self, day: Weekday) {
        self.weekdays.toggle(day);
    }

    pub fn set_time_window(&mut self, window: TimeWindow) {
        self.time_window = window;
    }

    /// Restores the all-inclusive defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn year(&self) -> &Choice {
        &self.year
    }

    pub fn category(&self) -> &Choice {
        &self.category
    }

    pub fn origin(&self) -> &Choice {
        &self.origin
    }

    pub fn destination(&self) -> &Choice {
        &self.destination
    }

    pub fn date_range(&self) -> Option<&DateRange> {
        self.date_range.as_ref()
    }

    pub fn weekdays(&self) -> &WeekdayMask {
        &self.weekdays
    }

    pub fn time_window(&self) -> &TimeWindow {
        &self.time_window
    }

    pub fn has_route_filter(&self) -> bool {
        !self.origin.is_all() || !self.destination.is_all()
    }

    /// True when any filter needs data finer than monthly.
    pub fn needs_finer(&self) -> bool {
        self.date_range.is_some() || self.weekdays.is_active() || self.time_window.is_active()
    }
}

pub fn pass_year(row: &FactRow, filter: &FilterState) -> bool {
    match filter.year.value() {
        None => true,
        Some(year) => row.period.starts_with(year),
    }
}

pub fn pass_category(row: &FactRow, filter: &FilterState) -> bool {
    filter.category.matches(&row.category)
}

pub fn pass_origin(row: &FactRow, filter: &FilterState) -> bool {
    filter.origin.is_all() || row.origin.as_deref().is_some_and(|o| filter.origin.matches(o))
}

pub fn pass_destination(row: &FactRow, filter: &FilterState) -> bool {
    filter.destination.is_all()
        || row
            .destination
            .as_deref()
            .is_some_and(|d| filter.destination.matches(d))
}

/// Rows without a day fail an active range.
pub fn pass_date_range(row: &FactRow, filter: &FilterState) -> bool {
    match &filter.date_range {
        None => true,
        Some(range) => row.day().is_some_and(|d| range.contains_day(d)),
    }
}

/// Rows whose date cannot be parsed fail an active mask.
pub fn pass_weekday(row: &FactRow, filter: &FilterState) -> bool {
    if !filter.weekdays.is_active() {
        return true;
    }
    row.day()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .is_some_and(|date| filter.weekdays.includes(date.weekday()))
}

/// Rows without an hour pass unconditionally.
pub fn pass_time_window(row: &FactRow, filter: &FilterState) -> bool {
    match row.hour {
        Some(hour) => filter.time_window.overlaps_hour(hour),
        None => true,
    }
}

pub fn pass_month_from_day_range(row: &FactRow, filter: &FilterState) -> bool {
    match &filter.date_range {
        None => true,
        Some(range) => range.contains_month(row.month()),
    }
}

/// Conjunction of every predicate that applies at `granularity`.
///
/// Monthly rows use the month-precision date check; route predicates only
/// apply to origin-destination shaped tables.
pub fn passes(
    row: &FactRow,
    filter: &FilterState,
    granularity: Granularity,
    route_shaped: bool,
) -> bool {
    let date_ok = match granularity {
        Granularity::Month => pass_month_from_day_range(row, filter),
        Granularity::Day | Granularity::DayHour => pass_date_range(row, filter),
    };
    pass_year(row, filter)
        && pass_category(row, filter)
        && date_ok
        && pass_weekday(row, filter)
        && pass_time_window(row, filter)
        && (!route_shaped || (pass_origin(row, filter) && pass_destination(row, filter)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(period: &str) -> FactRow {
        FactRow::new(period, "REG")
    }

    #[test]
    fn test_choice_parse() {
        assert_eq!(Choice::parse("all"), Choice::All);
        assert_eq!(Choice::parse("  "), Choice::All);
        assert_eq!(Choice::parse(" IC "), Choice::Only("IC".into()));
        assert!(Choice::parse("IC").matches(" IC "));
    }

    #[test]
    fn test_pass_year_prefix() {
        let mut f = FilterState::new();
        assert!(pass_year(&day("2023-05-01"), &f));
        f.set_year("2024");
        assert!(pass_year(&day("2024-05-01"), &f));
        assert!(pass_year(&FactRow::new("2024-05", "REG"), &f));
        assert!(!pass_year(&day("2023-05-01"), &f));
    }

    #[test]
    fn test_pass_category_and_route() {
        let mut f = FilterState::new();
        f.set_category("IC");
        f.set_origin("S1");
        let row = FactRow::new("2024-01", " IC ").with_route("S1 ", "S2");
        assert!(pass_category(&row, &f));
        assert!(pass_origin(&row, &f));
        assert!(pass_destination(&row, &f));
        f.set_destination("S3");
        assert!(!pass_destination(&row, &f));
        assert!(!pass_origin(&FactRow::new("2024-01", "IC"), &f));
    }

    #[test]
    fn test_date_range_single_bound_is_one_day() {
        let mut f = FilterState::new();
        f.set_date_range(Some("2024-01-05"), None);
        assert!(pass_date_range(&day("2024-01-05"), &f));
        assert!(!pass_date_range(&day("2024-01-06"), &f));

        f.set_date_range(None, Some("2024-01-07"));
        assert!(pass_date_range(&day("2024-01-07"), &f));
        assert!(!pass_date_range(&day("2024-01-06"), &f));
    }

    #[test]
    fn test_date_range_inverted_bounds_are_swapped() {
        let mut f = FilterState::new();
        f.set_date_range(Some("2024-01-10"), Some("2024-01-05"));
        let range = f.date_range().unwrap();
        assert_eq!(range.from(), "2024-01-05");
        assert_eq!(range.to(), "2024-01-10");
        assert!(pass_date_range(&day("2024-01-05"), &f));
        assert!(pass_date_range(&day("2024-01-10"), &f));
        assert!(!pass_date_range(&day("2024-01-04"), &f));
        assert!(!pass_date_range(&day("2024-01-11"), &f));
    }

    #[test]
    fn test_date_range_ignores_garbage() {
        let mut f = FilterState::new();
        f.set_date_range(Some("yesterday"), Some(""));
        assert!(f.date_range().is_none());
        assert!(!f.needs_finer());
    }

    #[test]
    fn test_pass_month_from_day_range() {
        let mut f = FilterState::new();
        f.set_date_range(Some("2024-02-20"), Some("2024-04-02"));
        assert!(pass_month_from_day_range(&FactRow::new("2024-02", "all"), &f));
        assert!(pass_month_from_day_range(&FactRow::new("2024-04", "all"), &f));
        assert!(!pass_month_from_day_range(&FactRow::new("2024-01", "all"), &f));
        assert!(!pass_month_from_day_range(&FactRow::new("2024-05", "all"), &f));
    }

    #[test]
    fn test_weekday_filter() {
        let mut f = FilterState::new();
        f.set_weekdays(WeekdayMask::only([Weekday::Sat, Weekday::Sun]));
        // 2024-01-06 is a Saturday, 2024-01-08 a Monday.
        assert!(pass_weekday(&day("2024-01-06"), &f));
        assert!(!pass_weekday(&day("2024-01-08"), &f));
        assert!(!pass_weekday(&FactRow::new("2024-01", "all"), &f));
        assert!(!pass_weekday(&day("not-a-date"), &f));
    }

    #[test]
    fn test_weekday_mask_excluding_all_days_is_no_filter() {
        let mut f = FilterState::new();
        f.set_weekdays(WeekdayMask::only([]));
        assert!(!f.weekdays().is_active());
        assert!(pass_weekday(&day("2024-01-08"), &f));
        assert!(pass_weekday(&FactRow::new("2024-01", "all"), &f));
        assert!(!f.needs_finer());
    }

    #[test]
    fn test_toggle_weekday() {
        let mut f = FilterState::new();
        f.toggle_weekday(Weekday::Mon);
        assert!(f.weekdays().is_active());
        assert!(!f.weekdays().includes(Weekday::Mon));
        f.toggle_weekday(Weekday::Mon);
        assert!(!f.weekdays().is_active());
    }

    #[test]
    fn test_parse_time_to_minutes() {
        assert_eq!(parse_time_to_minutes("00:00"), Some(0));
        assert_eq!(parse_time_to_minutes("7:30"), Some(450));
        assert_eq!(parse_time_to_minutes("23:59"), Some(1439));
        assert_eq!(parse_time_to_minutes("99:99"), Some(1439));
        assert_eq!(parse_time_to_minutes("7.30"), None);
        assert_eq!(parse_time_to_minutes("07:3"), None);
    }

    #[test]
    fn test_time_window_overlap() {
        let w = TimeWindow::between("07:30", "09:00");
        assert!(!w.overlaps_hour(6));
        assert!(w.overlaps_hour(7));
        assert!(w.overlaps_hour(9));
        assert!(!w.overlaps_hour(10));
    }

    #[test]
    fn test_time_window_wraps_past_midnight() {
        let w = TimeWindow::between("22:00", "02:00");
        assert!(w.overlaps_hour(23));
        assert!(w.overlaps_hour(0));
        assert!(w.overlaps_hour(2));
        assert!(!w.overlaps_hour(12));
        assert!(!w.overlaps_hour(3));
    }

    #[test]
    fn test_time_window_bad_input_defaults() {
        let w = TimeWindow::between("", "nope");
        assert!(w.is_active());
        assert!(w.overlaps_hour(0));
        assert!(w.overlaps_hour(23));
    }

    #[test]
    fn test_pass_time_window_rows_without_hour_pass() {
        let mut f = FilterState::new();
        f.set_time_window(TimeWindow::between("08:00", "08:59"));
        assert!(pass_time_window(&day("2024-01-01"), &f));
        assert!(pass_time_window(&day("2024-01-01").with_hour(8), &f));
        assert!(!pass_time_window(&day("2024-01-01").with_hour(9), &f));
    }

    #[test]
    fn test_passes_combines_predicates() {
        let mut f = FilterState::new();
        f.set_year("2024");
        f.set_origin("S1");
        let row = day("2024-03-01").with_route("S1", "S2");
        assert!(passes(&row, &f, Granularity::Day, true));
        assert!(!passes(&day("2024-03-01"), &f, Granularity::Day, true));
        assert!(passes(&day("2024-03-01"), &f, Granularity::Day, false));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut f = FilterState::new();
        f.set_year("2024");
        f.set_time_window(TimeWindow::between("01:00", "02:00"));
        f.reset();
        assert_eq!(f, FilterState::default());
    }
}
