//! Flattening extracted pages into export-ready rows.

use crate::model::{ConsolidatedRow, DashboardPage, TableRecord};
use std::collections::HashMap;

pub const PAGE_COLUMN: &str = "page";

/// One row per series element, in page, series and element order.
pub fn consolidate(pages: &[DashboardPage]) -> Vec<ConsolidatedRow> {
    pages
        .iter()
        .flat_map(|page| {
            page.series.iter().enumerate().flat_map(move |(k, series)| {
                let series_label = format!("series_{}", k + 1);
                series.elements.iter().map(move |element| ConsolidatedRow {
                    page_number: page.page_number,
                    series_label: series_label.clone(),
                    series_aria_label: series.aria_label.clone(),
                    element_index: element.index,
                    element_aria_label: element.aria_label.clone(),
                    text_content: element.text_content.clone(),
                    inner_text: element.inner_text.clone(),
                })
            })
        })
        .collect()
}

/// Column keys for one table: its header text, or `column_<n>` (1-based)
/// where the header is missing, blank or repeated.
fn column_keys(table: &TableRecord) -> Vec<String> {
    let width = table
        .rows
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0)
        .max(table.headers.len());

    let mut keys: Vec<String> = Vec::with_capacity(width);
    for i in 0..width {
        let key = match table.headers.get(i).map(|h| h.trim()) {
            Some(h) if !h.is_empty() && h != PAGE_COLUMN && !keys.iter().any(|k| k == h) => {
                h.to_string()
            }
            _ => format!("column_{}", i + 1),
        };
        keys.push(key);
    }
    keys
}

/// Stack every table of every page under a leading `page` column.
///
/// The header is the union of all table columns in first-seen order; cells a
/// table does not have are left empty.
pub fn consolidate_tables(pages: &[DashboardPage]) -> TableRecord {
    let keyed: Vec<(u32, &TableRecord, Vec<String>)> = pages
        .iter()
        .flat_map(|page| page.tables.iter().map(move |t| (page.page_number, t)))
        .map(|(page, table)| (page, table, column_keys(table)))
        .collect();

    let mut headers = vec![PAGE_COLUMN.to_string()];
    let mut position: HashMap<String, usize> = HashMap::new();
    for (_, _, keys) in &keyed {
        for key in keys {
            if !position.contains_key(key) {
                position.insert(key.clone(), headers.len());
                headers.push(key.clone());
            }
        }
    }

    let mut rows = Vec::new();
    for (page, table, keys) in &keyed {
        for row in &table.rows {
            let mut out = vec![String::new(); headers.len()];
            out[0] = page.to_string();
            for (key, cell) in keys.iter().zip(row) {
                if let Some(&at) = position.get(key) {
                    out[at] = cell.clone();
                }
            }
            rows.push(out);
        }
    }

    TableRecord { headers, rows }
}
