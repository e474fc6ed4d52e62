//! Station code resolution: names, cities, validated coordinates, search.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Latitude/longitude pair that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coords {
    pub lat: f64,
    pub lon: f64,
}

/// A station dimension row as read from the reference table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StationRecord {
    pub code: String,
    pub name: String,
    pub city: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// A station code resolved against the dimension table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedStation {
    pub code: String,
    /// Falls back to the code when the dimension has no name.
    pub name: String,
    pub city: Option<String>,
    pub coords: Option<Coords>,
}

/// Counts of stations with and without usable coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoordinateCoverage {
    pub with_coords: usize,
    pub missing_coords: usize,
}

/// Lower-cases, strips diacritics and collapses whitespace.
///
/// Idempotent and total.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validates a coordinate pair, undoing an obvious lat/lon swap.
///
/// A pair is rejected when either value is non-finite, when it is exactly
/// `(0, 0)`, or when it falls outside the valid ranges. A pair whose latitude
/// lies in `(0, 25)` and longitude in `(25, 55)` looks reversed for Italy and
/// is swapped before the range check.
pub fn validate_coords(lat: f64, lon: f64) -> Option<Coords> {
    if !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    if lat == 0.0 && lon == 0.0 {
        return None;
    }
    let swapped = lat > 0.0 && lat < 25.0 && lon > 25.0 && lon < 55.0;
    let (lat, lon) = if swapped { (lon, lat) } else { (lat, lon) };
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    Some(Coords { lat, lon })
}

/// Read-only lookup over the station dimension and the capital-city set.
#[derive(Debug, Clone, Default)]
pub struct EntityResolver {
    stations: BTreeMap<String, ResolvedStation>,
    search_keys: BTreeMap<String, String>,
    capitals: HashSet<String>,
}

impl EntityResolver {
    /// Builds the resolver. The first record per code wins; blank codes are skipped.
    pub fn new<I, S>(records: Vec<StationRecord>, capitals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stations = BTreeMap::new();
        let mut search_keys = BTreeMap::new();

        for record in records {
            let code = record.code.trim().to_string();
            if code.is_empty() || stations.contains_key(&code) {
                continue;
            }
            let name = record.name.trim();
            let city = record.city.trim();
            let coords = match (record.lat, record.lon) {
                (Some(lat), Some(lon)) => validate_coords(lat, lon),
                _ => None,
            };
            let resolved = ResolvedStation {
                code: code.clone(),
                name: if name.is_empty() {
                    code.clone()
                } else {
                    name.to_string()
                },
                city: (!city.is_empty()).then(|| city.to_string()),
                coords,
            };
            search_keys.insert(code.clone(), normalize(&format!("{} {}", name, code)));
            stations.insert(code, resolved);
        }

        let capitals = capitals
            .into_iter()
            .map(|c| normalize(c.as_ref()))
            .filter(|c| !c.is_empty())
            .collect();

        EntityResolver {
            stations,
            search_keys,
            capitals,
        }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Resolves a code; unknown codes resolve to themselves with no city or coordinates.
    pub fn resolve(&self, code: &str) -> ResolvedStation {
        let code = code.trim();
        self.stations
            .get(code)
            .cloned()
            .unwrap_or_else(|| ResolvedStation {
                code: code.to_string(),
                name: code.to_string(),
                city: None,
                coords: None,
            })
    }

    pub fn city_of(&self, code: &str) -> Option<&str> {
        self.stations
            .get(code.trim())
            .and_then(|s| s.city.as_deref())
    }

    /// `"<name> (<code>)"` when the name is known, otherwise the bare code.
    pub fn label(&self, code: &str) -> String {
        let code = code.trim();
        match self.stations.get(code) {
            Some(s) if s.name != s.code => format!("{} ({})", s.name, code),
            _ => code.to_string(),
        }
    }

    /// True when no restriction set is configured or the city belongs to it.
    pub fn is_capital_city(&self, city: &str) -> bool {
        self.capitals.is_empty() || self.capitals.contains(&normalize(city))
    }

    /// Stations whose normalized "name code" key contains the normalized query.
    pub fn search(&self, query: &str) -> Vec<ResolvedStation> {
        let needle = normalize(query);
        self.search_keys
            .iter()
            .filter(|(_, key)| key.contains(&needle))
            .filter_map(|(code, _)| self.stations.get(code).cloned())
            .collect()
    }

    pub fn coverage(&self) -> CoordinateCoverage {
        let with_coords = self
            .stations
            .values()
            .filter(|s| s.coords.is_some())
            .count();
        CoordinateCoverage {
            with_coords,
            missing_coords: self.stations.len() - with_coords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn station(code: &str, name: &str, city: &str, lat: f64, lon: f64) -> StationRecord {
        StationRecord {
            code: code.to_string(),
            name: name.to_string(),
            city: city.to_string(),
            lat: Some(lat),
            lon: Some(lon),
        }
    }

    fn resolver() -> EntityResolver {
        EntityResolver::new(
            vec![
                station("S08409", "Roma Termini", "Roma", 41.9, 12.5),
                station("S01700", "Milano Centrale", "Milano", 45.48, 9.2),
                station("S09999", "", "", 0.0, 0.0),
                station("S08409", "Duplicate", "Elsewhere", 1.0, 1.0),
            ],
            ["Roma", "L'Aquila"],
        )
    }

    #[test]
    fn test_normalize_strips_accents_and_whitespace() {
        assert_eq!(normalize("  Città   di  Forlì "), "citta di forli");
        assert_eq!(normalize("L'AQUILA"), "l'aquila");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_validate_coords_rejects_invalid() {
        assert_eq!(validate_coords(0.0, 0.0), None);
        assert_eq!(validate_coords(f64::NAN, 12.0), None);
        assert_eq!(validate_coords(95.0, 12.0), None);
        assert_eq!(validate_coords(45.0, 190.0), None);
    }

    #[test]
    fn test_validate_coords_swap_heuristic() {
        assert_eq!(
            validate_coords(41.9, 12.5),
            Some(Coords { lat: 41.9, lon: 12.5 })
        );
        assert_eq!(
            validate_coords(12.5, 41.9),
            Some(Coords { lat: 41.9, lon: 12.5 })
        );
    }

    #[test]
    fn test_resolve_known_and_unknown() {
        let r = resolver();
        let roma = r.resolve("S08409");
        assert_eq!(roma.name, "Roma Termini");
        assert_eq!(roma.city.as_deref(), Some("Roma"));
        assert!(roma.coords.is_some());

        let unknown = r.resolve(" X1 ");
        assert_eq!(unknown.name, "X1");
        assert_eq!(unknown.city, None);
        assert_eq!(unknown.coords, None);
    }

    #[test]
    fn test_resolve_falls_back_to_code_for_missing_name() {
        let r = resolver();
        let s = r.resolve("S09999");
        assert_eq!(s.name, "S09999");
        assert_eq!(s.coords, None);
        assert_eq!(r.label("S09999"), "S09999");
        assert_eq!(r.label("S01700"), "Milano Centrale (S01700)");
    }

    #[test]
    fn test_first_record_wins() {
        let r = resolver();
        assert_eq!(r.len(), 3);
        assert_eq!(r.city_of("S08409"), Some("Roma"));
    }

    #[test]
    fn test_capital_membership_is_normalized() {
        let r = resolver();
        assert!(r.is_capital_city("ROMA"));
        assert!(r.is_capital_city("l'aquila"));
        assert!(!r.is_capital_city("Milano"));

        let unrestricted = EntityResolver::new(vec![], Vec::<String>::new());
        assert!(unrestricted.is_capital_city("Milano"));
    }

    #[test]
    fn test_search_matches_name_and_code() {
        let r = resolver();
        let hits = r.search("milano");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "S01700");

        let by_code = r.search("s084");
        assert_eq!(by_code.len(), 1);
        assert_eq!(r.search("").len(), 3);
    }

    #[test]
    fn test_coverage_counts_missing_coords() {
        let r = resolver();
        assert_eq!(
            r.coverage(),
            CoordinateCoverage {
                with_coords: 2,
                missing_coords: 1
            }
        );
    }

    proptest! {
        #[test]
        fn test_normalize_is_idempotent(s in "\\PC*") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
