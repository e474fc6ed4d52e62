//! Locale-tolerant numeric coercion for fact-table cells.
//!
//! Upstream exports mix `1234.5`, `1.234,5` and `1,234.5`. Every count cell
//! goes through [`parse_locale_number`] exactly once, at ingestion.

/// Parses a numeric cell that may use Italian or English separators.
///
/// Contract:
/// - both `.` and `,` present: whichever appears last is the decimal
///   separator, the other is a thousands separator;
/// - only `,`: a single comma is the decimal separator; several commas are
///   thousands separators when every group after the first has 3 digits;
/// - only `.`: dots are thousands separators only when all groups are
///   digit-only and the final group has exactly 3 digits, otherwise the dot
///   is a decimal point.
///
/// Returns `None` for empty, unparsable, or non-finite values.
pub fn parse_locale_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let canonical = match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) if dot > comma => s.replace(',', ""),
        (Some(_), Some(_)) => s.replace('.', "").replace(',', "."),
        (None, Some(_)) => {
            if s.matches(',').count() == 1 {
                s.replace(',', ".")
            } else if is_thousands_grouped(s, ',') {
                s.replace(',', "")
            } else {
                return None;
            }
        }
        (Some(_), None) => {
            if is_thousands_grouped(s, '.') {
                s.replace('.', "")
            } else {
                s.to_string()
            }
        }
        (None, None) => s.to_string(),
    };

    canonical.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerces a cell to a number, mapping anything unparsable to `0.0`.
pub fn coerce(raw: &str) -> f64 {
    parse_locale_number(raw).unwrap_or(0.0)
}

fn is_thousands_grouped(s: &str, sep: char) -> bool {
    let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
    let groups: Vec<&str> = unsigned.split(sep).collect();
    if groups.len() < 2 {
        return false;
    }
    let digits_only = groups
        .iter()
        .all(|g| !g.is_empty() && g.chars().all(|c| c.is_ascii_digit()));
    let tail_ok = match sep {
        '.' => groups.last().is_some_and(|g| g.len() == 3),
        _ => groups[1..].iter().all(|g| g.len() == 3),
    };
    digits_only && tail_ok
}
