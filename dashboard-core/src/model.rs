//! Structured records recovered from a dashboard page.
//!
//! Everything here is produced once per visited page and never mutated
//! afterwards; consolidation only reads it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything extracted from one dashboard page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardPage {
    pub page_number: u32,
    pub series: Vec<SeriesRecord>,
    pub tables: Vec<TableRecord>,
    pub cards: Vec<TextRecord>,
    pub charts: Vec<ChartRecord>,
    /// Visible page text, one trimmed non-empty line per entry.
    pub raw_text: Vec<String>,
}

impl DashboardPage {
    pub fn empty(page_number: u32) -> Self {
        Self {
            page_number,
            ..Default::default()
        }
    }

    pub fn element_count(&self) -> usize {
        self.series.iter().map(|s| s.elements.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
            && self.tables.is_empty()
            && self.cards.is_empty()
            && self.charts.is_empty()
            && self.raw_text.is_empty()
    }
}

/// A class-matched grouping container and the data points inside it.
///
/// `aria_label` is a display hint only; two series may share it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub aria_label: String,
    pub attributes: BTreeMap<String, String>,
    pub elements: Vec<ElementRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub index: usize,
    pub text_content: String,
    pub inner_text: String,
    pub aria_label: String,
}

/// Raw cell text. Row length is whatever the DOM had, not a schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Card / KPI text and the heuristic selector that found it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    pub selector: String,
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartRecord {
    /// A generic visual container with label-ish and value-ish descendants.
    Visual {
        index: usize,
        labels: Vec<String>,
        values: Vec<String>,
        combined: String,
    },
    /// Text nodes found inside one `<svg>`.
    Svg { index: usize, texts: Vec<String> },
}

/// One series element, flattened with its page and series provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedRow {
    pub page_number: u32,
    /// Positional identity of the series within its page (`series_1`, ...).
    pub series_label: String,
    pub series_aria_label: String,
    pub element_index: usize,
    pub element_aria_label: String,
    pub text_content: String,
    pub inner_text: String,
}

impl ConsolidatedRow {
    pub const HEADERS: [&'static str; 7] = [
        "page_number",
        "series_label",
        "series_aria_label",
        "element_index",
        "element_aria_label",
        "text_content",
        "inner_text",
    ];

    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.page_number.to_string(),
            self.series_label.clone(),
            self.series_aria_label.clone(),
            self.element_index.to_string(),
            self.element_aria_label.clone(),
            self.text_content.clone(),
            self.inner_text.clone(),
        ]
    }
}

/// A network response whose URL looks like it carried dashboard data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkResponse {
    pub url: String,
    pub status: i64,
    pub mime_type: String,
    pub request_id: String,
}
