//! Derived view over the row snapshot: search, favorites and single-key sort.

use super::market::CoinRow;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Name,
    #[default]
    Price,
    Change24h,
    Volume,
    MarketCap,
    BestBid,
    BestOffer,
}

impl Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SortKey::Name => "name",
                SortKey::Price => "price",
                SortKey::Change24h => "change24h",
                SortKey::Volume => "volume",
                SortKey::MarketCap => "marketCap",
                SortKey::BestBid => "bestBid",
                SortKey::BestOffer => "bestOffer",
            }
        )
    }
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "name" => Ok(SortKey::Name),
            "price" => Ok(SortKey::Price),
            "change24h" | "change" => Ok(SortKey::Change24h),
            "volume" => Ok(SortKey::Volume),
            "marketcap" => Ok(SortKey::MarketCap),
            "bestbid" | "bid" => Ok(SortKey::BestBid),
            "bestoffer" | "offer" | "ask" => Ok(SortKey::BestOffer),
            _ => Err(anyhow::anyhow!("Invalid sort key: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn toggled(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

/// A row's value under a sort key. `None` marks a missing value.
#[derive(Debug, PartialEq)]
enum SortValue<'a> {
    Text(&'a str),
    Number(Option<f64>),
}

impl SortKey {
    fn value_of<'a>(&self, row: &'a CoinRow) -> SortValue<'a> {
        match self {
            SortKey::Name => SortValue::Text(&row.name),
            SortKey::Price => SortValue::Number(Some(row.price)),
            SortKey::Change24h => SortValue::Number(Some(row.change24h)),
            SortKey::Volume => SortValue::Number(Some(row.volume)),
            SortKey::MarketCap => SortValue::Number(row.market_cap),
            SortKey::BestBid => SortValue::Number(Some(row.best_bid)),
            SortKey::BestOffer => SortValue::Number(Some(row.best_offer)),
        }
    }
}

/// The UI-facing inputs of the derived view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub search: String,
    pub sort_by: SortKey,
    pub sort_dir: SortDir,
    pub favorites: HashSet<String>,
    pub only_favorites: bool,
}

/// Primary collation key: canonical decomposition with accents dropped,
/// lower-cased. `"Éth"` keys as `"eth"`.
fn collation_key(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Root-locale style ordering: base letters first, then accents, then case
/// with lower case ahead of upper case.
fn compare_text(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

/// Compares two rows under `key`. Missing values go last in both directions.
fn compare_rows(key: SortKey, dir: SortDir, a: &CoinRow, b: &CoinRow) -> Ordering {
    let ordering = match (key.value_of(a), key.value_of(b)) {
        (SortValue::Text(x), SortValue::Text(y)) => compare_text(x, y),
        (SortValue::Number(x), SortValue::Number(y)) => match (x, y) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        },
        _ => Ordering::Equal,
    };
    match dir {
        SortDir::Asc => ordering,
        SortDir::Desc => ordering.reverse(),
    }
}

fn matches_search(row: &CoinRow, needle: &str) -> bool {
    format!("{} {}", row.name, row.symbol)
        .to_lowercase()
        .contains(needle)
}

/// Filters and sorts `rows` for display. Always returns a fresh vector.
///
/// The favorites filter only applies while the favorites set is non-empty,
/// so toggling "only favorites" never blanks the board.
pub fn derive_view(rows: &[CoinRow], view: &ViewState) -> Vec<CoinRow> {
    let needle = view.search.to_lowercase();
    let favorites_only = view.only_favorites && !view.favorites.is_empty();

    let mut derived: Vec<CoinRow> = rows
        .iter()
        .filter(|row| needle.is_empty() || matches_search(row, &needle))
        .filter(|row| !favorites_only || view.favorites.contains(&row.id))
        .cloned()
        .collect();

    derived.sort_by(|a, b| compare_rows(view.sort_by, view.sort_dir, a, b));
    derived
}
