//! Currency catalog: metadata keyed by upper-case currency code.

use super::coerce::{self, first_present, first_text};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

const DEFAULT_DECIMALS: u32 = 2;

/// Base currencies tried in order before falling back to the first code.
const PREFERRED_BASES: [&str; 2] = ["USD", "AUD"];

#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyMeta {
    pub code: String,
    pub decimals: u32,
    pub icon: Option<String>,
    /// Upstream `type`.
    pub kind: Option<String>,
    pub sort: f64,
}

/// Insertion-ordered mapping from currency code to metadata.
///
/// Re-inserting an existing code replaces its metadata but keeps the code's
/// original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrencyCatalog {
    order: Vec<String>,
    entries: HashMap<String, CurrencyMeta>,
}

impl CurrencyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, meta: CurrencyMeta) {
        if !self.entries.contains_key(&meta.code) {
            self.order.push(meta.code.clone());
        }
        self.entries.insert(meta.code.clone(), meta);
    }

    pub fn get(&self, code: &str) -> Option<&CurrencyMeta> {
        self.entries.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    pub fn codes(&self) -> &[String] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &CurrencyMeta> {
        self.order.iter().filter_map(|code| self.entries.get(code))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Picks the base currency: USD, then AUD, then the first code.
    /// Returns `None` for an empty catalog.
    pub fn preferred_base(&self) -> Option<&str> {
        PREFERRED_BASES
            .iter()
            .copied()
            .find(|code| self.contains(code))
            .or_else(|| self.order.first().map(String::as_str))
    }
}

/// Top-level shapes of the currency endpoint. Records stay untyped since
/// their fields are coerced one by one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CurrencyPayload {
    Bare(Vec<Value>),
    Envelope { currencies: Vec<Value> },
    Other(Value),
}

impl CurrencyPayload {
    /// Any shape other than a list or a `{ "currencies": [...] }` envelope
    /// yields no records.
    fn into_records(self) -> Vec<Value> {
        match self {
            CurrencyPayload::Bare(records) | CurrencyPayload::Envelope { currencies: records } => {
                records
            }
            CurrencyPayload::Other(value) => {
                warn!(shape = coerce::kind_of(&value), "Unexpected currency payload shape");
                Vec::new()
            }
        }
    }
}

fn parse_record(record: &Value) -> Option<CurrencyMeta> {
    if !record.is_object() {
        return None;
    }
    let code = first_text(record, &["code", "ticker"])?.to_uppercase();
    if code.is_empty() {
        return None;
    }

    let decimals = first_present(record, &["decimals_places"])
        .and_then(coerce::to_finite)
        .filter(|d| *d >= 0.0)
        .map_or(DEFAULT_DECIMALS, |d| d.trunc() as u32);

    Some(CurrencyMeta {
        code,
        decimals,
        icon: first_text(record, &["icon"]),
        kind: first_text(record, &["type"]),
        sort: coerce::to_number(first_present(record, &["sort_order"])),
    })
}

/// Normalizes a currency payload into a catalog. Records without a
/// resolvable code are skipped.
pub fn normalize_currencies(payload: &Value) -> CurrencyCatalog {
    let items = CurrencyPayload::deserialize(payload)
        .map(CurrencyPayload::into_records)
        .unwrap_or_default();
    let mut catalog = CurrencyCatalog::new();
    for meta in items.iter().filter_map(parse_record) {
        catalog.insert(meta);
    }
    debug!(
        received = items.len(),
        kept = catalog.len(),
        "Normalized currency catalog"
    );
    catalog
}
