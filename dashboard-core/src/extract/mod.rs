//! Structured extraction: live DOM (one script) or saved markup, both
//! normalized into a [`DashboardPage`].
//!
//! Selection is deliberately over-inclusive; filtering happens in
//! [`normalize`] so noise is tolerated rather than missed.

pub mod classes;
pub mod markup;
pub mod script;

use crate::error::{escalate, ExtractError, Notice, Outcome, Stage};
use crate::model::{ChartRecord, DashboardPage, ElementRecord, SeriesRecord, TableRecord, TextRecord};
use crate::session::Session;
use classes::ClassPattern;
use script::RawPage;
use serde_json::{json, Value};

pub use markup::extract_markup;

/// Cards longer than this are containers the heuristic caught by accident.
pub const CARD_TEXT_LIMIT: usize = 500;
pub const CHART_TEXT_LIMIT: usize = 1000;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ExtractOptions {
    pub series_class: ClassPattern,
    pub target_class: ClassPattern,
    /// Extra CSS selectors evaluated inside each series, unioned with `target_class`.
    pub extra_selectors: Vec<String>,
    pub card_text_limit: usize,
    pub chart_text_limit: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            series_class: ClassPattern::new("series"),
            target_class: ClassPattern::new("column setFocusRing"),
            extra_selectors: Vec::new(),
            card_text_limit: CARD_TEXT_LIMIT,
            chart_text_limit: CHART_TEXT_LIMIT,
        }
    }
}

impl ExtractOptions {
    pub fn script_options(&self) -> Value {
        json!({
            "seriesClass": self.series_class.as_str(),
            "targetClass": self.target_class.as_str(),
            "extraSelectors": self.extra_selectors,
            "cardSelectors": script::CARD_SELECTORS,
            "gridSelector": script::GRID_SELECTOR,
            "visualSelector": script::VISUAL_SELECTOR,
            "labelSelector": script::VISUAL_LABEL_SELECTOR,
            "valueSelector": script::VISUAL_VALUE_SELECTOR,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructuredExtractor {
    options: ExtractOptions,
}

impl StructuredExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Walk the live DOM once and build the page record.
    ///
    /// A failing script yields an empty page plus a notice; only a transport
    /// failure is an error.
    pub async fn extract<S: Session>(
        &self,
        session: &S,
        page_number: u32,
    ) -> Result<Outcome<DashboardPage>, ExtractError> {
        let payload = session
            .evaluate_script(script::EXTRACT_PAGE_JS, vec![self.options.script_options()])
            .await;

        let raw = match payload {
            Ok(value) => match serde_json::from_value::<RawPage>(value) {
                Ok(raw) => raw,
                Err(err) => {
                    return Ok(empty_with_notice(
                        page_number,
                        format!("unreadable extraction payload: {}", err),
                    ))
                }
            },
            Err(err) => {
                let err = escalate(err)?;
                return Ok(empty_with_notice(
                    page_number,
                    format!("extraction script failed: {}", err),
                ));
            }
        };

        let outcome = normalize(raw, page_number, &self.options);
        tracing::info!(
            page = page_number,
            tables = outcome.value.tables.len(),
            cards = outcome.value.cards.len(),
            charts = outcome.value.charts.len(),
            series = outcome.value.series.len(),
            elements = outcome.value.element_count(),
            lines = outcome.value.raw_text.len(),
            "Page extracted"
        );
        Ok(outcome)
    }
}

fn empty_with_notice(page_number: u32, message: String) -> Outcome<DashboardPage> {
    tracing::warn!(page = page_number, %message, "Extraction produced no data");
    Outcome::with_notices(
        DashboardPage::empty(page_number),
        vec![Notice::new(Stage::Extraction, Some(page_number), message)],
    )
}

/// Apply the keep/drop rules to a raw payload.
pub fn normalize(raw: RawPage, page_number: u32, options: &ExtractOptions) -> Outcome<DashboardPage> {
    let notices = raw
        .notices
        .into_iter()
        .map(|message| Notice::new(Stage::Extraction, Some(page_number), message))
        .collect();

    let tables = raw
        .tables
        .into_iter()
        .filter(|t| !(t.headers.is_empty() && t.rows.is_empty()))
        .map(|t| TableRecord {
            headers: t.headers,
            rows: t.rows,
        })
        .collect();

    let cards = raw
        .cards
        .into_iter()
        .filter_map(|card| {
            let text = card.text.trim();
            let len = text.chars().count();
            (len > 0 && len <= options.card_text_limit).then(|| TextRecord {
                selector: card.selector,
                index: card.index,
                text: text.to_string(),
            })
        })
        .collect();

    let series = raw
        .series
        .into_iter()
        .map(|s| SeriesRecord {
            aria_label: s.aria_label,
            attributes: s.attributes,
            elements: s
                .elements
                .into_iter()
                .map(|e| ElementRecord {
                    index: e.index,
                    text_content: e.text_content,
                    inner_text: e.inner_text,
                    aria_label: e.aria_label,
                })
                .collect(),
        })
        .collect();

    let visuals = raw
        .visuals
        .into_iter()
        .filter(|v| !v.labels.is_empty() || !v.values.is_empty())
        .map(|v| ChartRecord::Visual {
            index: v.index,
            labels: v.labels,
            values: v.values,
            combined: v.combined.trim().chars().take(options.chart_text_limit).collect(),
        });
    let svgs = raw
        .svgs
        .into_iter()
        .filter(|s| !s.texts.is_empty())
        .map(|s| ChartRecord::Svg {
            index: s.index,
            texts: s.texts,
        });
    let charts = visuals.chain(svgs).collect();

    let raw_text = split_lines(&raw.text);

    Outcome::with_notices(
        DashboardPage {
            page_number,
            series,
            tables,
            cards,
            charts,
            raw_text,
        },
        notices,
    )
}

pub(crate) fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
