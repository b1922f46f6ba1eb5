//! Domain constants: travel speeds, known road dates, name epithets.

use crate::types::SourceName;

/// Travel speeds in km per day, used to derive per-mode travel times when a
/// source supplies only a distance.
pub const SPEED_FOOT_KM_PER_DAY: f64 = 30.0;
pub const SPEED_HORSE_KM_PER_DAY: f64 = 50.0;
pub const SPEED_CART_KM_PER_DAY: f64 = 20.0;
pub const SPEED_SHIP_KM_PER_DAY: f64 = 100.0;

/// Year bounds of the Roman period covered by the dataset.
pub const ROMAN_START_YEAR: i64 = -753;
pub const ROMAN_END_YEAR: i64 = 476;

/// Documented construction years for the major viae, used to backfill road
/// rows whose source carries no date. Keys are normalized road names.
pub const KNOWN_ROAD_DATES: [(&str, i64); 11] = [
    ("via appia", -312),
    ("via latina", -350),
    ("via salaria", -361),
    ("via flaminia", -220),
    ("via aurelia", -241),
    ("via aemilia", -187),
    ("via postumia", -148),
    ("via egnatia", -146),
    ("via domitia", -118),
    ("via augusta", -8),
    ("via traiana", 109),
];

/// Latin epithets and settlement titles stripped during name normalization.
/// These describe legal status or type, not identity: "Colonia Iulia
/// Carthago" and "Carthago" are the same place.
pub const NAME_EPITHETS: [&str; 10] = [
    "colonia",
    "municipium",
    "civitas",
    "urbs",
    "oppidum",
    "vicus",
    "castra",
    "portus",
    "ad",
    "in",
];

/// Default source priority, highest first: the primary gazetteer outranks
/// the curated network model, which outranks the citation index.
pub const DEFAULT_SOURCE_PRIORITY: [SourceName; 6] = [
    SourceName::Pleiades,
    SourceName::Orbis,
    SourceName::ToposText,
    SourceName::Wikidata,
    SourceName::Itinere,
    SourceName::Awmc,
];

/// Mean Earth radius in km, for haversine distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Look up a known construction year by normalized road name.
pub fn known_road_date(normalized_name: &str) -> Option<i64> {
    KNOWN_ROAD_DATES
        .iter()
        .find(|(name, _)| *name == normalized_name)
        .map(|(_, year)| *year)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_road_date() {
        assert_eq!(known_road_date("via appia"), Some(-312));
        assert_eq!(known_road_date("via ignota"), None);
    }
}
