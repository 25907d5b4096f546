// 🗺️ Zone Resolver - position ranges → zones
// Location codes are sometimes numeric, sometimes alphanumeric

use crate::table::CellValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// POSITION VALUE
// ============================================================================

/// A location or range bound with its numeric reading, when it has one.
///
/// Comparison is decided per range entry: numeric only if the location and
/// both bounds parse as numbers, otherwise string ordering of the raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionValue {
    pub text: String,
    pub number: Option<f64>,
}

impl PositionValue {
    /// `None` for missing or blank values; those never match any range
    pub fn parse(cell: &CellValue) -> Option<Self> {
        match cell {
            CellValue::Empty => None,
            CellValue::Number(n) if n.is_nan() => None,
            CellValue::Number(n) => Some(PositionValue {
                text: cell.as_text(),
                number: Some(*n),
            }),
            CellValue::Text(s) if s.trim().is_empty() => None,
            CellValue::Text(s) => Some(PositionValue {
                text: s.clone(),
                number: s.trim().parse::<f64>().ok(),
            }),
        }
    }
}

// ============================================================================
// ZONE RANGE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRange {
    pub zone_id: String,
    pub from: Option<PositionValue>,
    pub to: Option<PositionValue>,
}

impl ZoneRange {
    pub fn new(zone_id: &str, from: &CellValue, to: &CellValue) -> Self {
        ZoneRange {
            zone_id: zone_id.trim().to_string(),
            from: PositionValue::parse(from),
            to: PositionValue::parse(to),
        }
    }

    /// Inclusive containment: `from <= location <= to`
    pub fn contains(&self, location: &PositionValue) -> bool {
        let (from, to) = match (&self.from, &self.to) {
            (Some(from), Some(to)) => (from, to),
            _ => return false,
        };

        match (from.number, location.number, to.number) {
            (Some(lo), Some(value), Some(hi)) => lo <= value && value <= hi,
            _ => from.text <= location.text && location.text <= to.text,
        }
    }
}

// ============================================================================
// ZONE RESOLVER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ZoneResolver {
    ranges: Vec<ZoneRange>,
}

impl ZoneResolver {
    pub fn new(ranges: Vec<ZoneRange>) -> Self {
        ZoneResolver { ranges }
    }

    /// Every zone whose range contains `location`, unioned by zone id
    pub fn zones_containing(&self, location: &CellValue) -> BTreeSet<String> {
        let location = match PositionValue::parse(location) {
            Some(l) => l,
            None => return BTreeSet::new(),
        };

        self.ranges
            .iter()
            .filter(|r| r.contains(&location))
            .map(|r| r.zone_id.clone())
            .collect()
    }

    /// Distinct zone ids known to the position map
    pub fn known_zones(&self) -> BTreeSet<String> {
        self.ranges.iter().map(|r| r.zone_id.clone()).collect()
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn range(zone: &str, from: &str, to: &str) -> ZoneRange {
        ZoneRange::new(zone, &CellValue::text(from), &CellValue::text(to))
    }

    fn zones(resolver: &ZoneResolver, location: &str) -> Vec<String> {
        resolver
            .zones_containing(&CellValue::text(location))
            .into_iter()
            .collect()
    }

    #[test]
    fn test_numeric_containment_is_inclusive() {
        let resolver = ZoneResolver::new(vec![range("A", "100", "200")]);

        assert_eq!(zones(&resolver, "100"), vec!["A"]);
        assert_eq!(zones(&resolver, "200"), vec!["A"]);
        assert_eq!(zones(&resolver, "150"), vec!["A"]);
        assert!(zones(&resolver, "201").is_empty());
    }

    #[test]
    fn test_numeric_not_lexicographic_when_all_numeric() {
        // "95" > "100" as strings, but 95 < 100 as numbers
        let resolver = ZoneResolver::new(vec![range("A", "90", "100")]);
        assert_eq!(zones(&resolver, "95"), vec!["A"]);
    }

    #[test]
    fn test_string_fallback_for_alphanumeric() {
        let resolver = ZoneResolver::new(vec![range("B", "A-01", "A-99")]);

        assert_eq!(zones(&resolver, "A-50"), vec!["B"]);
        assert!(zones(&resolver, "B-01").is_empty());
    }

    #[test]
    fn test_fallback_is_per_entry() {
        // Numeric location checked against one numeric and one text range
        let resolver = ZoneResolver::new(vec![
            range("NUM", "100", "200"),
            range("TXT", "1", "2Z"),
        ]);

        // "150": numeric for NUM; string "1" <= "150" <= "2Z" for TXT
        assert_eq!(zones(&resolver, "150"), vec!["NUM", "TXT"]);
    }

    #[test]
    fn test_overlapping_and_disjoint_ranges_union() {
        let resolver = ZoneResolver::new(vec![
            range("A", "100", "200"),
            range("A", "500", "600"),
            range("B", "150", "550"),
        ]);

        assert_eq!(zones(&resolver, "150"), vec!["A", "B"]);
        assert_eq!(zones(&resolver, "520"), vec!["A", "B"]);
        assert_eq!(zones(&resolver, "300"), vec!["B"]);
        assert_eq!(zones(&resolver, "580"), vec!["A"]);
    }

    #[test]
    fn test_missing_values_never_match() {
        let resolver = ZoneResolver::new(vec![
            ZoneRange::new("A", &CellValue::Empty, &CellValue::text("200")),
            range("B", "100", "200"),
        ]);

        assert_eq!(zones(&resolver, "150"), vec!["B"]);
        assert!(resolver.zones_containing(&CellValue::Empty).is_empty());
        assert!(zones(&resolver, "   ").is_empty());
    }

    #[test]
    fn test_numeric_cells_compare_numerically() {
        let resolver = ZoneResolver::new(vec![ZoneRange::new(
            "A",
            &CellValue::Number(100.0),
            &CellValue::Number(200.0),
        )]);

        assert_eq!(
            resolver.zones_containing(&CellValue::Number(150.0)).len(),
            1
        );
        assert_eq!(zones(&resolver, " 150 "), vec!["A"]);
    }
}
