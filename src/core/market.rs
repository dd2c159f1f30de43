//! Market rows and the normalizer that maps upstream ticker payloads onto them.

use super::coerce::{self, first_present, first_text, first_truthy, lookup};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Quote currency used when neither the row nor the store names one.
pub const FALLBACK_QUOTE: &str = "USD";

/// A canonical market row, independent of the upstream payload shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinRow {
    /// Stable across polls for the same pair; favorites are keyed on it.
    pub id: String,
    pub rank: i64,
    /// `PRIMARY/SECONDARY` as sent upstream.
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub best_bid: f64,
    pub best_offer: f64,
    /// Signed percent change.
    pub change24h: f64,
    pub volume: f64,
    /// `None` when upstream has no figure or reports zero.
    pub market_cap: Option<f64>,
    /// Price history, oldest first.
    pub spark: Vec<f64>,
    pub logo: Option<String>,
}

/// The upstream conventions a row may follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    /// `{ pair: { primary, secondary }, price: { last, bestBid, bestOffer, change } }`
    Structured,
    /// `{ symbol | base, quote, last, bestBid, bestOffer }`
    Flat,
}

impl RowShape {
    pub fn detect(row: &Value) -> Self {
        let nested = |key: &str| lookup(row, key).is_some_and(Value::is_object);
        if nested("pair") || nested("price") {
            RowShape::Structured
        } else {
            RowShape::Flat
        }
    }

    /// Lookup order for each field under this shape. Structured rows still
    /// fall back to flat keys since some feeds mix both conventions.
    fn paths(self, field: Field) -> &'static [&'static str] {
        use Field::*;
        match (self, field) {
            (RowShape::Structured, Primary) => &["pair.primary", "symbol", "base"],
            (RowShape::Flat, Primary) => &["symbol", "base"],
            (RowShape::Structured, Secondary) => &["pair.secondary", "quote"],
            (RowShape::Flat, Secondary) => &["quote"],
            (RowShape::Structured, Last) => &["price.last", "last"],
            (RowShape::Flat, Last) => &["last"],
            (RowShape::Structured, BestBid) => &["price.bestBid", "bestBid"],
            (RowShape::Flat, BestBid) => &["bestBid"],
            (RowShape::Structured, BestOffer) => &["price.bestOffer", "bestOffer"],
            (RowShape::Flat, BestOffer) => &["bestOffer"],
            (RowShape::Structured, Percent) => &["price.change.percent", "change.percent"],
            (RowShape::Flat, Percent) => &["change.percent"],
            (RowShape::Structured, Direction) => {
                &["price.change.direction", "change.direction"]
            }
            (RowShape::Flat, Direction) => &["change.direction"],
            (_, Volume) => &["volume.secondary", "volume.primary", "volume_24h", "volume"],
            (_, MarketCap) => &["marketCap", "market_cap"],
            (_, History) => &["priceHistory", "spark"],
            (_, Logo) => &["image", "logo", "icon"],
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Primary,
    Secondary,
    Last,
    BestBid,
    BestOffer,
    Percent,
    Direction,
    Volume,
    MarketCap,
    History,
    Logo,
}

/// Top-level shapes of the market endpoint. Rows stay untyped since their
/// fields follow more than one naming convention.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MarketPayload {
    Bare(Vec<Value>),
    Envelope { data: Vec<Value> },
    Other(Value),
}

impl MarketPayload {
    /// Any shape other than a list or a `{ "data": [...] }` envelope yields
    /// no rows.
    fn into_rows(self) -> Vec<Value> {
        match self {
            MarketPayload::Bare(rows) | MarketPayload::Envelope { data: rows } => rows,
            MarketPayload::Other(value) => {
                warn!(shape = coerce::kind_of(&value), "Unexpected market payload shape");
                Vec::new()
            }
        }
    }
}

/// Applies the direction flag to a percent magnitude: only `"down"`
/// (any case) makes it negative.
pub fn signed_change(percent: f64, direction: Option<&str>) -> f64 {
    match direction {
        Some(d) if d.eq_ignore_ascii_case("down") => -percent,
        _ => percent,
    }
}

fn numeric(row: &Value, shape: RowShape, field: Field) -> f64 {
    coerce::to_number(first_present(row, shape.paths(field)))
}

fn spark(row: &Value, shape: RowShape) -> Vec<f64> {
    match first_present(row, shape.paths(Field::History)) {
        Some(Value::Array(points)) => points.iter().filter_map(coerce::to_finite).collect(),
        _ => Vec::new(),
    }
}

/// Maps one upstream row onto a [`CoinRow`]. `index` is the row's zero-based
/// position in the payload and `base_currency` the store's current base.
pub fn normalize_row(row: &Value, index: usize, base_currency: Option<&str>) -> CoinRow {
    let shape = RowShape::detect(row);

    let primary = first_text(row, shape.paths(Field::Primary))
        .unwrap_or_else(|| format!("COIN_{index}"));
    let secondary = first_text(row, shape.paths(Field::Secondary))
        .or_else(|| base_currency.filter(|b| !b.is_empty()).map(str::to_string))
        .unwrap_or_else(|| FALLBACK_QUOTE.to_string());

    let id = first_text(row, &["id"]).unwrap_or_else(|| format!("{primary}_{secondary}"));

    let direction = first_present(row, shape.paths(Field::Direction)).and_then(Value::as_str);
    let change24h = signed_change(numeric(row, shape, Field::Percent), direction);

    let market_cap = first_truthy(row, shape.paths(Field::MarketCap))
        .and_then(coerce::to_finite)
        .filter(|cap| *cap != 0.0);

    let rank = first_present(row, &["rank"])
        .and_then(coerce::to_finite)
        .map_or(index as i64 + 1, |r| r.trunc() as i64);

    CoinRow {
        rank,
        name: format!("{primary}/{secondary}"),
        symbol: primary.to_uppercase(),
        id,
        price: numeric(row, shape, Field::Last),
        best_bid: numeric(row, shape, Field::BestBid),
        best_offer: numeric(row, shape, Field::BestOffer),
        change24h,
        volume: numeric(row, shape, Field::Volume),
        market_cap,
        spark: spark(row, shape),
        logo: first_text(row, shape.paths(Field::Logo)),
    }
}

/// Normalizes a full market payload into a row snapshot.
pub fn normalize_market(payload: &Value, base_currency: Option<&str>) -> Vec<CoinRow> {
    let items = MarketPayload::deserialize(payload)
        .map(MarketPayload::into_rows)
        .unwrap_or_default();
    let coins: Vec<CoinRow> = items
        .iter()
        .enumerate()
        .map(|(index, row)| normalize_row(row, index, base_currency))
        .collect();
    debug!(rows = coins.len(), "Normalized market payload");
    coins
}
