//! The market board: the derived view rendered as a table with a status line.

use super::ui;
use crate::core::format::{format_currency, format_number, time_ago};
use crate::core::market::FALLBACK_QUOTE;
use crate::core::view::SortDir;
use crate::core::{CoinRow, MarketState, SortKey};
use crate::store::MarketStore;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color};
use console::Term;
use std::time::Duration;
use tracing::debug;

const SPARK_WIDTH: usize = 16;

/// Command-line overrides for the board view.
#[derive(Debug, Clone, Default)]
pub struct BoardOptions {
    pub search: Option<String>,
    pub sort_by: Option<SortKey>,
    pub ascending: bool,
    pub only_favorites: bool,
    pub favorites: Vec<String>,
    pub base_currency: Option<String>,
    pub interval_ms: Option<u64>,
}

impl BoardOptions {
    /// Layers the overrides onto the state built from config.
    pub fn apply(&self, state: &mut MarketState) {
        if let Some(search) = &self.search {
            state.view.search = search.clone();
        }
        if let Some(key) = self.sort_by {
            state.view.sort_by = key;
        }
        if self.ascending {
            state.view.sort_dir = SortDir::Asc;
        }
        if self.only_favorites {
            state.view.only_favorites = true;
        }
        state.view.favorites.extend(self.favorites.iter().cloned());
        if let Some(ms) = self.interval_ms {
            state.polling = Duration::from_millis(ms);
        }
    }
}

/// Quote currency of a `PRIMARY/SECONDARY` row name.
fn quote_of(row: &CoinRow) -> &str {
    row.name
        .split_once('/')
        .map(|(_, quote)| quote)
        .filter(|quote| !quote.is_empty())
        .unwrap_or(FALLBACK_QUOTE)
}

fn sort_marker(state: &MarketState, key: SortKey, label: &str) -> Cell {
    if state.view.sort_by == key {
        let arrow = match state.view.sort_dir {
            SortDir::Asc => "▲",
            SortDir::Desc => "▼",
        };
        ui::header_cell(&format!("{label} {arrow}"))
    } else {
        ui::header_cell(label)
    }
}

/// Renders the table of `rows` plus a status line describing `state`.
pub fn render_board(state: &MarketState, rows: &[CoinRow], now: DateTime<Utc>) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("★"),
        ui::header_cell("#"),
        sort_marker(state, SortKey::Name, "Pair"),
        sort_marker(state, SortKey::Price, "Price"),
        sort_marker(state, SortKey::BestBid, "Bid"),
        sort_marker(state, SortKey::BestOffer, "Offer"),
        sort_marker(state, SortKey::Change24h, "24h"),
        sort_marker(state, SortKey::Volume, "Volume"),
        sort_marker(state, SortKey::MarketCap, "Market Cap"),
        ui::header_cell("Trend"),
    ]);

    for row in rows {
        let quote = quote_of(row);
        let favorite = if state.view.favorites.contains(&row.id) {
            Cell::new("★").fg(Color::Yellow)
        } else {
            Cell::new("")
        };
        table.add_row(vec![
            favorite,
            ui::right_cell(row.rank.to_string()),
            Cell::new(&row.name),
            ui::right_cell(format_currency(Some(row.price), quote)),
            ui::right_cell(format_currency(Some(row.best_bid), quote)),
            ui::right_cell(format_currency(Some(row.best_offer), quote)),
            ui::change_cell(row.change24h),
            ui::right_cell(format_number(Some(row.volume))),
            ui::format_optional_cell(row.market_cap, |cap| format_number(Some(cap))),
            Cell::new(ui::sparkline(&row.spark, SPARK_WIDTH)),
        ]);
    }

    let mut output = String::new();
    if rows.is_empty() {
        output.push_str(&ui::style_text("No markets to show", ui::StyleType::Subtle));
    } else {
        output.push_str(&table.to_string());
    }
    output.push_str("\n\n");
    output.push_str(&status_line(state, rows.len(), now));

    if let Some(error) = &state.error {
        output.push('\n');
        output.push_str(&ui::style_text(&format!("Error: {error}"), ui::StyleType::Error));
    }
    output
}

fn status_line(state: &MarketState, shown: usize, now: DateTime<Utc>) -> String {
    let updated = state
        .last_updated
        .map_or("never".to_string(), |at| time_ago(at, now));
    let mut parts = vec![
        format!(
            "{} {}",
            ui::style_text("Base:", ui::StyleType::Label),
            state.base_currency
        ),
        format!("{shown}/{} markets", state.coins.len()),
        format!("updated {updated}"),
    ];
    if !state.view.search.is_empty() {
        parts.push(format!("search \"{}\"", state.view.search));
    }
    if state.view.only_favorites && !state.view.favorites.is_empty() {
        parts.push("favorites only".to_string());
    }
    if state.loading {
        parts.push("refreshing…".to_string());
    }
    parts.join(" · ")
}

/// Fetches the catalog and one market snapshot, then prints the board.
pub async fn run(store: &MarketStore, options: &BoardOptions) -> Result<()> {
    let pb = ui::new_spinner("Fetching markets...");
    load_once(store, options).await;
    pb.finish_and_clear();

    let state = store.snapshot();
    println!(
        "{}",
        render_board(&state, &store.filtered_sorted_coins(), Utc::now())
    );

    match state.error {
        Some(error) if state.last_updated.is_none() => Err(anyhow!(error)),
        _ => Ok(()),
    }
}

async fn load_once(store: &MarketStore, options: &BoardOptions) {
    store.fetch_currencies().await;
    if let Some(base) = &options.base_currency {
        store.set_base_currency(base);
    }
    store.fetch_market().await;
}

/// Polls the market and redraws the board after every change until Ctrl-C.
pub async fn watch(store: &MarketStore, options: &BoardOptions) -> Result<()> {
    store.fetch_currencies().await;
    if let Some(base) = &options.base_currency {
        store.set_base_currency(base);
    }

    let term = Term::stdout();
    let mut updates = store.subscribe();
    store.start_polling();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted, leaving watch mode");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = store.snapshot();
                term.clear_screen()?;
                term.write_line(&render_board(&state, &store.filtered_sorted_coins(), Utc::now()))?;
                term.write_line(&ui::style_text("Press Ctrl-C to exit", ui::StyleType::Subtle))?;
            }
        }
    }

    store.dispose();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::market::normalize_market;
    use crate::core::view::derive_view;
    use serde_json::json;

    fn state_with_rows() -> MarketState {
        let coins = normalize_market(
            &json!([
                {
                    "pair": { "primary": "Xbt", "secondary": "Aud" },
                    "price": { "last": 50000, "bestBid": 49990, "bestOffer": 50010,
                               "change": { "percent": 3.2, "direction": "up" } },
                    "volume": { "secondary": 120000 },
                    "priceHistory": [1, 2, 3]
                },
                { "symbol": "Eth", "quote": "Usd", "last": 3000, "marketCap": 5000000 }
            ]),
            Some("USD"),
        );
        MarketState {
            coins,
            ..Default::default()
        }
    }

    #[test]
    fn test_render_board_lists_rows_and_status() {
        console::set_colors_enabled(false);
        let mut state = state_with_rows();
        state.view.favorites.insert("Xbt_Aud".to_string());
        let now = Utc::now();
        state.last_updated = Some(now - chrono::Duration::seconds(5));

        let rows = derive_view(&state.coins, &state.view);
        let board = render_board(&state, &rows, now);

        assert!(board.contains("Xbt/Aud"));
        assert!(board.contains("A$50,000.00"));
        assert!(board.contains("+3.2%"));
        assert!(board.contains("120,000"));
        assert!(board.contains("Eth/Usd"));
        assert!(board.contains("5,000,000"));
        assert!(board.contains("Price ▼"));
        assert!(board.contains("2/2 markets"));
        assert!(board.contains("updated 5s ago"));
        assert!(!board.contains("Error:"));
    }

    #[test]
    fn test_render_board_shows_error_and_empty_state() {
        console::set_colors_enabled(false);
        let state = MarketState {
            error: Some("Market API 500".to_string()),
            ..Default::default()
        };
        let board = render_board(&state, &[], Utc::now());
        assert!(board.contains("No markets to show"));
        assert!(board.contains("updated never"));
        assert!(board.contains("Error: Market API 500"));
    }

    #[test]
    fn test_options_layer_onto_state() {
        let mut state = MarketState::default();
        state.view.favorites.insert("Sol_Aud".to_string());
        let options = BoardOptions {
            search: Some("xbt".to_string()),
            sort_by: Some(SortKey::Volume),
            ascending: true,
            only_favorites: true,
            favorites: vec!["Xbt_Aud".to_string()],
            base_currency: None,
            interval_ms: Some(2000),
        };
        options.apply(&mut state);

        assert_eq!(state.view.search, "xbt");
        assert_eq!(state.view.sort_by, SortKey::Volume);
        assert_eq!(state.view.sort_dir, SortDir::Asc);
        assert!(state.view.only_favorites);
        assert_eq!(state.view.favorites.len(), 2);
        assert_eq!(state.polling, Duration::from_millis(2000));
    }

    #[test]
    fn test_quote_of_row_name() {
        let rows = state_with_rows().coins;
        assert_eq!(quote_of(&rows[0]), "Aud");
        assert_eq!(quote_of(&rows[1]), "Usd");
    }
}
