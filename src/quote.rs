// Quote building: expand a stay into nights and price each one

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::{ProductLine, RateCatalog};
use crate::dates::{nights_between, parse_stay_instant, stay_nights};
use crate::resolver::RateResolver;

/// What a caller asks to be quoted. Fields are optional because they come straight from
/// user input; anything missing makes the request unquotable rather than an error.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StayRequest {
    pub checkin: Option<String>,
    pub checkout: Option<String>,
    pub category: Option<String>,
    pub product_line: ProductLine,
    #[serde(default = "default_occupants")]
    pub occupants: i32,
}

fn default_occupants() -> i32 {
    1
}

impl StayRequest {
    pub fn new(checkin: &str, checkout: &str, category: &str, product_line: ProductLine) -> Self {
        Self {
            checkin: Some(checkin.to_string()),
            checkout: Some(checkout.to_string()),
            category: Some(category.to_string()),
            product_line,
            occupants: default_occupants(),
        }
    }

    pub fn with_occupants(mut self, occupants: i32) -> Self {
        self.occupants = occupants;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCharge {
    pub date: NaiveDate,
    /// Rate for a single occupant
    pub unit_price: f64,
    pub day_total: f64,
    /// False when the day had no timetable-backed rate and was charged zero
    #[serde(default = "priced_by_default")]
    pub priced: bool,
}

fn priced_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub checkin: NaiveDate,
    /// Exclusive
    pub checkout: NaiveDate,
    pub category: String,
    pub product_line: ProductLine,
    pub occupants: i32,
    pub days: Vec<DayCharge>,
    pub nights: i64,
    pub total: f64,
    pub per_night: f64,
    pub per_occupant: f64,
    #[serde(default = "priced_by_default")]
    pub fully_priced: bool,
}

impl Quote {
    pub fn unpriced_dates(&self) -> Vec<NaiveDate> {
        self.days
            .iter()
            .filter(|day| !day.priced)
            .map(|day| day.date)
            .collect()
    }
}

/// Builds quotes from the current rates of a catalog. Holds no state of its own; every call
/// captures a fresh snapshot of the requested product line.
pub struct QuoteBuilder<'a> {
    catalog: &'a RateCatalog,
}

impl<'a> QuoteBuilder<'a> {
    pub fn new(catalog: &'a RateCatalog) -> Self {
        Self { catalog }
    }

    /// Returns `None` when a boundary or the category is missing or unparsable, or when
    /// the checkin date is not strictly before the checkout date.
    pub fn build_quote(&self, request: &StayRequest) -> Option<Quote> {
        let start = parse_stay_instant(request.checkin.as_deref()?)?;
        let end = parse_stay_instant(request.checkout.as_deref()?)?;
        let category = request.category.as_deref().filter(|c| !c.is_empty())?;
        // Compared on calendar dates; a same-day span would persist checkin == checkout
        if start.date() >= end.date() {
            return None;
        }

        let resolver = RateResolver::from_catalog(self.catalog, request.product_line);
        let occupants = request.occupants;

        let days: Vec<DayCharge> = stay_nights(start, end)
            .map(|date| {
                let resolution = resolver.resolve(category, date);
                let unit_price = resolution.unit_price();
                DayCharge {
                    date,
                    unit_price,
                    day_total: unit_price * f64::from(occupants),
                    priced: resolution.is_priced(),
                }
            })
            .collect();

        // Counted from the calendar span, not from days.len()
        let nights = nights_between(start, end);
        let total: f64 = days.iter().map(|day| day.day_total).sum();
        let per_night = if nights > 0 { total / nights as f64 } else { 0.0 };
        let per_occupant = if occupants > 0 {
            total / f64::from(occupants)
        } else {
            total
        };
        let fully_priced = days.iter().all(|day| day.priced);

        Some(Quote {
            id: None,
            checkin: start.date(),
            checkout: end.date(),
            category: category.to_string(),
            product_line: request.product_line,
            occupants,
            days,
            nights,
            total,
            per_night,
            per_occupant,
            fully_priced,
        })
    }
}
