use super::ui;
use crate::core::format::{MISSING, format_number};
use crate::core::MarketState;
use crate::store::MarketStore;
use anyhow::{Result, anyhow};
use comfy_table::{Attribute, Cell};

pub fn render_catalog(state: &MarketState) -> String {
    if state.currency_meta.is_empty() {
        return ui::style_text("No currencies available", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Code"),
        ui::header_cell("Decimals"),
        ui::header_cell("Type"),
        ui::header_cell("Sort"),
        ui::header_cell("Icon"),
    ]);

    for meta in state.currency_meta.iter() {
        let code = if meta.code == state.base_currency {
            Cell::new(format!("{} (base)", meta.code)).add_attribute(Attribute::Bold)
        } else {
            Cell::new(&meta.code)
        };
        table.add_row(vec![
            code,
            ui::right_cell(meta.decimals.to_string()),
            Cell::new(meta.kind.as_deref().unwrap_or(MISSING)),
            ui::right_cell(format_number(Some(meta.sort))),
            Cell::new(if meta.icon.is_some() { "yes" } else { "no" }),
        ]);
    }

    format!(
        "{}\n\n{}",
        ui::style_text("Currencies", ui::StyleType::Title),
        table
    )
}

pub async fn run(store: &MarketStore) -> Result<()> {
    let pb = ui::new_spinner("Fetching currencies...");
    store.fetch_currencies().await;
    pb.finish_and_clear();

    let state = store.snapshot();
    println!("{}", render_catalog(&state));
    match state.error {
        Some(error) => Err(anyhow!(error)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::normalize_currencies;
    use serde_json::json;

    #[test]
    fn test_render_catalog_marks_base() {
        console::set_colors_enabled(false);
        let mut state = MarketState::default();
        state.apply_catalog(normalize_currencies(&json!([
            { "code": "Aud", "decimals_places": 2, "type": "Secondary", "icon": "<svg/>" },
            { "code": "Xbt", "decimals_places": 8, "sort_order": 1 }
        ])));

        let output = render_catalog(&state);
        assert!(output.contains("AUD (base)"));
        assert!(output.contains("XBT"));
        assert!(output.contains("Secondary"));
        assert!(output.contains('8'));
    }

    #[test]
    fn test_render_empty_catalog() {
        console::set_colors_enabled(false);
        assert!(render_catalog(&MarketState::default()).contains("No currencies available"));
    }
}
