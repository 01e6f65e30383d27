// Rate catalog and timetable snapshots for each product line
// Both are replaced wholesale by the loader; readers never observe a half-written snapshot

use parking_lot::RwLock;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::gateway::{CatalogSource, TransportConfig, TransportError};

// Accommodation families, each with its own catalog, timetable and category vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductLine {
    Hotel,
    Beach,
}

impl ProductLine {
    pub const ALL: [ProductLine; 2] = [ProductLine::Hotel, ProductLine::Beach];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductLine::Hotel => "hotel",
            ProductLine::Beach => "beach",
        }
    }
}

impl fmt::Display for ProductLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductLine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hotel" => Ok(ProductLine::Hotel),
            "beach" => Ok(ProductLine::Beach),
            other => Err(format!("unknown product line: {}", other)),
        }
    }
}

// Identifiers and labels arrive as numbers or strings depending on which historical schema
// wrote them. Any other shape is read as absent rather than failing the record.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdentifier {
    Number(serde_json::Number),
    Text(String),
    Other(IgnoredAny),
}

impl RawIdentifier {
    fn into_text(self) -> Option<String> {
        match self {
            RawIdentifier::Text(text) => Some(text),
            RawIdentifier::Number(number) => Some(normalize_number(&number)),
            RawIdentifier::Other(_) => None,
        }
    }
}

// 3.0 and 3 must compare equal to "3"
fn normalize_number(number: &serde_json::Number) -> String {
    if let Some(value) = number.as_u64() {
        return value.to_string();
    }
    if let Some(value) = number.as_i64() {
        return value.to_string();
    }
    match number.as_f64() {
        Some(value) if value.fract() == 0.0 && value.abs() < 1e15 => format!("{}", value as i64),
        _ => number.to_string(),
    }
}

fn deserialize_identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawIdentifier> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(RawIdentifier::into_text)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty()))
}

fn deserialize_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawIdentifier> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(RawIdentifier::into_text))
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_label(deserializer)?.unwrap_or_default())
}

// A missing or non-array `prices` is an empty pricelist; entries that are not objects are dropped
fn deserialize_line_items<'de, D>(deserializer: D) -> Result<Vec<LineItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let serde_json::Value::Array(items) = serde_json::Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// A monetary field as stored by the remote store: a JSON number, a numeric string, or junk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawAmount {
    // Numeric value if the field holds one
    pub fn value(&self) -> Option<f64> {
        match self {
            RawAmount::Number(value) if value.is_finite() => Some(*value),
            RawAmount::Text(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

/// One category→price row of a pricelist. The same struct carries every field name any
/// historical schema has used; which ones matter depends on the product line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(
        rename = "roomType",
        default,
        deserialize_with = "deserialize_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub room_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(alias = "row", default, skip_serializing_if = "Option::is_none")]
    pub fila: Option<RawAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_place: Option<RawAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<RawAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tariffa: Option<RawAmount>,
}

impl LineItem {
    pub fn hotel(room_type: &str, tariff: f64) -> Self {
        Self {
            room_type: Some(room_type.to_string()),
            tariffa: Some(RawAmount::Number(tariff)),
            ..Default::default()
        }
    }

    /// Category key this item answers to within `line`. Beach places are described either
    /// explicitly or by their row number; an item with neither is unmatched.
    pub fn category(&self, line: ProductLine) -> Option<String> {
        match line {
            ProductLine::Hotel => self.room_type.clone(),
            ProductLine::Beach => {
                if let Some(description) = self.description.as_deref().filter(|d| !d.is_empty()) {
                    return Some(description.to_string());
                }
                self.row_label()
            }
        }
    }

    fn row_label(&self) -> Option<String> {
        let row = match self.fila.as_ref()? {
            RawAmount::Number(value) if value.fract() == 0.0 => format!("{}", *value as i64),
            RawAmount::Number(value) => value.to_string(),
            RawAmount::Text(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => return None,
        };
        Some(format!("Fila {}", row))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceList {
    #[serde(default, deserialize_with = "deserialize_identifier")]
    pub id: Option<String>,
    #[serde(rename = "prices", default, deserialize_with = "deserialize_line_items")]
    pub line_items: Vec<LineItem>,
}

impl PriceList {
    pub fn new(id: &str, line_items: Vec<LineItem>) -> Self {
        Self {
            id: Some(id.to_string()),
            line_items,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimetableEntry {
    #[serde(default, deserialize_with = "deserialize_date")]
    pub date: String,
    /// Either a pricelist id or a zero-based position into the catalog
    #[serde(rename = "pricelist", default, deserialize_with = "deserialize_identifier")]
    pub pricelist_ref: Option<String>,
}

impl TimetableEntry {
    pub fn new(date: &str, pricelist_ref: &str) -> Self {
        Self {
            date: date.to_string(),
            pricelist_ref: Some(pricelist_ref.to_string()),
        }
    }
}

/// Date → pricelist reference for one product line. The first entry for a date wins.
#[derive(Debug, Default)]
pub struct TimetableIndex {
    entries: Vec<TimetableEntry>,
    by_date: HashMap<String, usize>,
}

impl TimetableIndex {
    pub fn new(entries: Vec<TimetableEntry>) -> Self {
        let mut by_date = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            by_date.entry(entry.date.trim().to_string()).or_insert(position);
        }
        Self { entries, by_date }
    }

    pub fn entries(&self) -> &[TimetableEntry] {
        &self.entries
    }

    pub fn lookup(&self, iso_date: &str) -> Option<&TimetableEntry> {
        self.by_date.get(iso_date).map(|&position| &self.entries[position])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Point-in-time view of one product line, safe to hold across awaits.
#[derive(Debug, Clone, Default)]
pub struct RateSnapshot {
    pub price_lists: Arc<Vec<PriceList>>,
    pub timetable: Arc<TimetableIndex>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryOption {
    pub code: String,
    pub base_price: f64,
}

#[derive(Default)]
struct LineState {
    price_lists: Arc<Vec<PriceList>>,
    timetable: Arc<TimetableIndex>,
}

/// Shared holder of every product line's catalog and timetable.
#[derive(Default)]
pub struct RateCatalog {
    lines: RwLock<HashMap<ProductLine, LineState>>,
}

impl RateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_price_lists(&self, line: ProductLine) -> Arc<Vec<PriceList>> {
        self.lines
            .read()
            .get(&line)
            .map(|state| Arc::clone(&state.price_lists))
            .unwrap_or_default()
    }

    pub fn timetable(&self, line: ProductLine) -> Arc<TimetableIndex> {
        self.lines
            .read()
            .get(&line)
            .map(|state| Arc::clone(&state.timetable))
            .unwrap_or_default()
    }

    // Both halves are read under one lock so they belong to the same generation
    pub fn snapshot(&self, line: ProductLine) -> RateSnapshot {
        let lines = self.lines.read();
        match lines.get(&line) {
            Some(state) => RateSnapshot {
                price_lists: Arc::clone(&state.price_lists),
                timetable: Arc::clone(&state.timetable),
            },
            None => RateSnapshot::default(),
        }
    }

    pub fn replace_price_lists(&self, line: ProductLine, price_lists: Vec<PriceList>) {
        let count = price_lists.len();
        let price_lists = Arc::new(price_lists);
        self.lines.write().entry(line).or_default().price_lists = price_lists;
        info!(%line, price_lists = count, "Replaced rate catalog");
    }

    pub fn replace_timetable(&self, line: ProductLine, entries: Vec<TimetableEntry>) {
        let timetable = Arc::new(TimetableIndex::new(entries));
        let count = timetable.len();
        self.lines.write().entry(line).or_default().timetable = timetable;
        info!(%line, entries = count, "Replaced timetable");
    }

    /// Loads the catalog for `line` from `source`. On failure the line's catalog is emptied
    /// and the error is returned unchanged.
    pub async fn load_price_lists(
        &self,
        source: &dyn CatalogSource,
        line: ProductLine,
        config: &TransportConfig,
    ) -> Result<usize, TransportError> {
        match config.cap(source.load_catalog(line)).await {
            Ok(price_lists) => {
                let count = price_lists.len();
                self.replace_price_lists(line, price_lists);
                Ok(count)
            }
            Err(err) => {
                warn!(%line, error = %err, "Catalog load failed, clearing catalog");
                self.replace_price_lists(line, Vec::new());
                Err(err)
            }
        }
    }

    pub async fn load_timetable(
        &self,
        source: &dyn CatalogSource,
        line: ProductLine,
        config: &TransportConfig,
    ) -> Result<usize, TransportError> {
        match config.cap(source.load_timetable(line)).await {
            Ok(entries) => {
                let count = entries.len();
                self.replace_timetable(line, entries);
                Ok(count)
            }
            Err(err) => {
                warn!(%line, error = %err, "Timetable load failed, clearing timetable");
                self.replace_timetable(line, Vec::new());
                Err(err)
            }
        }
    }

    /// Loads catalog and timetable together and swaps both in a single write, so quotes
    /// never mix a new catalog with an old timetable.
    pub async fn refresh(
        &self,
        source: &dyn CatalogSource,
        line: ProductLine,
        config: &TransportConfig,
    ) -> Result<(), TransportError> {
        let loaded = futures::try_join!(
            config.cap(source.load_catalog(line)),
            config.cap(source.load_timetable(line)),
        );

        let (price_lists, entries) = match loaded {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%line, error = %err, "Rate refresh failed, clearing line");
                self.lines.write().insert(line, LineState::default());
                return Err(err);
            }
        };

        let state = LineState {
            price_lists: Arc::new(price_lists),
            timetable: Arc::new(TimetableIndex::new(entries)),
        };
        info!(
            %line,
            price_lists = state.price_lists.len(),
            entries = state.timetable.len(),
            "Refreshed rates"
        );
        self.lines.write().insert(line, state);
        Ok(())
    }

    /// Bookable categories for `line`, read from the first pricelist. Beach places have no
    /// fixed vocabulary and list nothing.
    pub fn categories(&self, line: ProductLine) -> Vec<CategoryOption> {
        if line == ProductLine::Beach {
            return Vec::new();
        }

        let price_lists = self.all_price_lists(line);
        let Some(first) = price_lists.first() else {
            return Vec::new();
        };

        first
            .line_items
            .iter()
            .filter_map(|item| {
                let code = item.room_type.clone()?;
                let base_price = item.tariffa.as_ref().and_then(RawAmount::value).unwrap_or(0.0);
                Some(CategoryOption { code, base_price })
            })
            .collect()
    }
}
