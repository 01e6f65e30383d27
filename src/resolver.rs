// Per-day rate resolution
// Every gap in the data resolves to a zero price; nothing here returns an error

use chrono::NaiveDate;
use tracing::debug;

use crate::catalog::{LineItem, PriceList, ProductLine, RateCatalog, RateSnapshot, RawAmount};
use crate::dates::iso_date;

/// Ways a timetable reference can name a pricelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricelistLookup {
    /// Exact match on the normalized pricelist id
    ById,
    /// Zero-based position into the catalog sequence
    ByPosition,
}

/// Tried in order, first hit wins. Historical timetables mix both reference forms.
pub const PRICELIST_LOOKUP_ORDER: [PricelistLookup; 2] =
    [PricelistLookup::ById, PricelistLookup::ByPosition];

/// Monetary fields a line item may carry its unit price in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    PerPlace,
    Generic,
    LegacyTariff,
}

impl PriceField {
    fn read(self, item: &LineItem) -> Option<&RawAmount> {
        match self {
            PriceField::PerPlace => item.price_per_place.as_ref(),
            PriceField::Generic => item.price.as_ref(),
            PriceField::LegacyTariff => item.tariffa.as_ref(),
        }
    }
}

// Changing either order changes historical quote totals
pub const BEACH_PRICE_FIELDS: [PriceField; 3] = [
    PriceField::PerPlace,
    PriceField::Generic,
    PriceField::LegacyTariff,
];
pub const HOTEL_PRICE_FIELDS: [PriceField; 1] = [PriceField::LegacyTariff];

pub fn price_fields(line: ProductLine) -> &'static [PriceField] {
    match line {
        ProductLine::Hotel => &HOTEL_PRICE_FIELDS,
        ProductLine::Beach => &BEACH_PRICE_FIELDS,
    }
}

pub fn find_price_list<'a>(price_lists: &'a [PriceList], reference: &str) -> Option<&'a PriceList> {
    PRICELIST_LOOKUP_ORDER
        .iter()
        .find_map(|lookup| match lookup {
            PricelistLookup::ById => price_lists
                .iter()
                .find(|list| list.id.as_deref() == Some(reference)),
            PricelistLookup::ByPosition => reference
                .parse::<usize>()
                .ok()
                .and_then(|position| price_lists.get(position)),
        })
}

pub fn find_line_item<'a>(
    price_list: &'a PriceList,
    category: &str,
    line: ProductLine,
) -> Option<&'a LineItem> {
    price_list
        .line_items
        .iter()
        .find(|item| item.category(line).as_deref() == Some(category))
}

// First field holding a usable number wins; none means zero
pub fn extract_unit_price(item: &LineItem, line: ProductLine) -> f64 {
    price_fields(line)
        .iter()
        .find_map(|field| field.read(item).and_then(RawAmount::value))
        .unwrap_or(0.0)
}

/// Outcome of resolving one day, kept so callers can tell a genuine zero rate from a gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Priced(f64),
    NoTimetableEntry,
    NoPriceList,
    NoLineItem,
}

impl Resolution {
    pub fn unit_price(&self) -> f64 {
        match self {
            Resolution::Priced(price) => *price,
            _ => 0.0,
        }
    }

    pub fn is_priced(&self) -> bool {
        matches!(self, Resolution::Priced(_))
    }
}

/// Resolves unit prices against a single snapshot of one product line.
pub struct RateResolver {
    line: ProductLine,
    snapshot: RateSnapshot,
}

impl RateResolver {
    pub fn new(line: ProductLine, snapshot: RateSnapshot) -> Self {
        Self { line, snapshot }
    }

    pub fn from_catalog(catalog: &RateCatalog, line: ProductLine) -> Self {
        Self::new(line, catalog.snapshot(line))
    }

    pub fn product_line(&self) -> ProductLine {
        self.line
    }

    pub fn resolve(&self, category: &str, date: NaiveDate) -> Resolution {
        let day = iso_date(date);

        let Some(reference) = self
            .snapshot
            .timetable
            .lookup(&day)
            .and_then(|entry| entry.pricelist_ref.as_deref())
        else {
            debug!(line = %self.line, date = %day, "No timetable entry");
            return Resolution::NoTimetableEntry;
        };

        let Some(price_list) = find_price_list(&self.snapshot.price_lists, reference) else {
            debug!(line = %self.line, date = %day, reference, "Pricelist reference unresolved");
            return Resolution::NoPriceList;
        };

        match find_line_item(price_list, category, self.line) {
            Some(item) => Resolution::Priced(extract_unit_price(item, self.line)),
            None => {
                debug!(line = %self.line, date = %day, category, "No line item for category");
                Resolution::NoLineItem
            }
        }
    }

    pub fn resolve_unit_price(&self, category: &str, date: NaiveDate) -> f64 {
        self.resolve(category, date).unit_price()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TimetableEntry;
    use serde_json::json;
    use test_case::test_case;

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn beach_item(raw: serde_json::Value) -> LineItem {
        serde_json::from_value(raw).unwrap()
    }

    fn hotel_catalog() -> RateCatalog {
        let catalog = RateCatalog::new();
        catalog.replace_price_lists(
            ProductLine::Hotel,
            vec![
                PriceList::new("A", vec![LineItem::hotel("DBL", 100.0)]),
                PriceList::new("B", vec![LineItem::hotel("DBL", 150.0)]),
            ],
        );
        catalog.replace_timetable(
            ProductLine::Hotel,
            vec![
                TimetableEntry::new("2024-06-01", "A"),
                TimetableEntry::new("2024-06-02", "1"),
                TimetableEntry::new("2024-06-03", "7"),
                TimetableEntry::new("2024-06-04", "Z"),
            ],
        );
        catalog
    }

    #[test]
    fn test_lookup_order_is_id_then_position() {
        assert_eq!(
            PRICELIST_LOOKUP_ORDER,
            [PricelistLookup::ById, PricelistLookup::ByPosition]
        );
    }

    #[test]
    fn test_price_field_orders() {
        assert_eq!(
            BEACH_PRICE_FIELDS,
            [PriceField::PerPlace, PriceField::Generic, PriceField::LegacyTariff]
        );
        assert_eq!(HOTEL_PRICE_FIELDS, [PriceField::LegacyTariff]);
    }

    #[test_case("2024-06-01", 100.0; "reference by id")]
    #[test_case("2024-06-02", 150.0; "reference by position")]
    #[test_case("2024-06-03", 0.0; "position out of range")]
    #[test_case("2024-06-04", 0.0; "unknown id that is not a number")]
    #[test_case("2024-05-31", 0.0; "date outside timetable")]
    fn test_resolve_hotel_unit_price(date: &str, expected: f64) {
        let resolver = RateResolver::from_catalog(&hotel_catalog(), ProductLine::Hotel);
        assert_eq!(resolver.resolve_unit_price("DBL", day(date)), expected);
    }

    #[test]
    fn test_id_match_beats_position() {
        // "1" is both the id of the first list and a valid position of the second
        let lists = vec![PriceList::new("1", vec![]), PriceList::new("X", vec![])];
        let found = find_price_list(&lists, "1").unwrap();
        assert_eq!(found.id.as_deref(), Some("1"));
    }

    #[test]
    fn test_negative_position_does_not_resolve() {
        let lists = vec![PriceList::new("A", vec![])];
        assert!(find_price_list(&lists, "-1").is_none());
    }

    #[test]
    fn test_unknown_category_resolves_to_zero() {
        let resolver = RateResolver::from_catalog(&hotel_catalog(), ProductLine::Hotel);
        assert_eq!(resolver.resolve("SUITE", day("2024-06-01")), Resolution::NoLineItem);
        assert_eq!(resolver.resolve_unit_price("SUITE", day("2024-06-01")), 0.0);
    }

    #[test]
    fn test_gap_kinds_are_distinguished() {
        let resolver = RateResolver::from_catalog(&hotel_catalog(), ProductLine::Hotel);
        assert_eq!(resolver.resolve("DBL", day("2024-05-01")), Resolution::NoTimetableEntry);
        assert_eq!(resolver.resolve("DBL", day("2024-06-03")), Resolution::NoPriceList);
        assert!(resolver.resolve("DBL", day("2024-06-01")).is_priced());
    }

    #[test]
    fn test_empty_catalog_resolves_to_zero() {
        let resolver = RateResolver::from_catalog(&RateCatalog::new(), ProductLine::Beach);
        assert_eq!(resolver.resolve_unit_price("Fila 1", day("2024-06-01")), 0.0);
    }

    #[test_case(json!({"price_per_place": 30, "price": 20, "tariffa": 10}), 30.0; "place price first")]
    #[test_case(json!({"price": 20, "tariffa": 10}), 20.0; "generic price second")]
    #[test_case(json!({"tariffa": 10}), 10.0; "legacy tariff last")]
    #[test_case(json!({"price_per_place": null, "price": "25.5"}), 25.5; "null skipped and text parsed")]
    #[test_case(json!({"price_per_place": "n/a", "tariffa": 12}), 12.0; "unparsable field skipped")]
    #[test_case(json!({"price_per_place": 0, "price": 20}), 0.0; "zero is a present value")]
    #[test_case(json!({}), 0.0; "no price field")]
    fn test_beach_price_extraction(raw: serde_json::Value, expected: f64) {
        assert_eq!(extract_unit_price(&beach_item(raw), ProductLine::Beach), expected);
    }

    #[test]
    fn test_hotel_reads_only_tariff() {
        let item = beach_item(json!({"roomType": "DBL", "price": 80, "price_per_place": 90}));
        assert_eq!(extract_unit_price(&item, ProductLine::Hotel), 0.0);
    }

    #[test]
    fn test_beach_matches_synthesized_row_description() {
        let catalog = RateCatalog::new();
        catalog.replace_price_lists(
            ProductLine::Beach,
            vec![PriceList::new(
                "7",
                vec![
                    beach_item(json!({"description": "Gazebo", "price": 60})),
                    beach_item(json!({"fila": 2, "price_per_place": 25})),
                ],
            )],
        );
        catalog.replace_timetable(ProductLine::Beach, vec![TimetableEntry::new("2024-07-10", "7")]);

        let resolver = RateResolver::from_catalog(&catalog, ProductLine::Beach);
        assert_eq!(resolver.resolve_unit_price("Fila 2", day("2024-07-10")), 25.0);
        assert_eq!(resolver.resolve_unit_price("Gazebo", day("2024-07-10")), 60.0);
        assert_eq!(resolver.resolve_unit_price("Fila 3", day("2024-07-10")), 0.0);
    }
}
