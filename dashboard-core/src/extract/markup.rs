//! Offline extraction from saved page markup.
//!
//! Mirrors the live script step for step over a parsed document so a page
//! source written by an earlier run can be re-parsed without a browser.
//! There is no layout here: `inner_text` is the whitespace-collapsed text and
//! the body text has one line per text node.

use super::classes::ClassPattern;
use super::script::{
    RawCard, RawElement, RawPage, RawSeries, RawSvg, RawTable, RawVisual, CARD_SELECTORS,
    GRID_SELECTOR, VISUAL_LABEL_SELECTOR, VISUAL_SELECTOR, VISUAL_VALUE_SELECTOR,
};
use super::{normalize, ExtractOptions};
use crate::error::Outcome;
use crate::model::DashboardPage;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashSet};

const SKIPPED_TEXT_PARENTS: [&str; 3] = ["script", "style", "noscript"];

/// Parse `html` and run the extraction steps over it.
pub fn extract_markup(html: &str, page_number: u32, options: &ExtractOptions) -> Outcome<DashboardPage> {
    let document = Html::parse_document(html);
    let raw = collect(&document, options);
    tracing::debug!(
        page = page_number,
        tables = raw.tables.len(),
        series = raw.series.len(),
        notices = raw.notices.len(),
        "Markup parsed"
    );
    normalize(raw, page_number, options)
}

fn collect(document: &Html, options: &ExtractOptions) -> RawPage {
    let mut raw = RawPage::default();
    collect_tables(document, &mut raw);
    collect_cards(document, &mut raw);
    collect_series(document, options, &mut raw);
    collect_visuals(document, &mut raw);
    collect_svgs(document, &mut raw);
    raw.text = body_text(document);
    raw
}

fn selector(css: &str, step: &str, notices: &mut Vec<String>) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(err) => {
            notices.push(format!("{}: invalid selector {}: {}", step, css, err));
            None
        }
    }
}

fn text_content(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn collapsed_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn texts_in(el: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    el.select(selector)
        .map(text_content)
        .filter(|t| !t.is_empty())
        .collect()
}

fn collect_tables(document: &Html, raw: &mut RawPage) {
    let (Some(table), Some(th), Some(tr), Some(td)) = (
        selector("table", "tables", &mut raw.notices),
        selector("th", "tables", &mut raw.notices),
        selector("tr", "tables", &mut raw.notices),
        selector("td", "tables", &mut raw.notices),
    ) else {
        return;
    };

    for el in document.select(&table) {
        let headers = el.select(&th).map(collapsed_text).collect();
        let rows = el
            .select(&tr)
            .map(|row| row.select(&td).map(collapsed_text).collect::<Vec<_>>())
            .filter(|cells| !cells.is_empty())
            .collect();
        raw.tables.push(RawTable { headers, rows });
    }

    let (Some(grid), Some(header), Some(row), Some(cell)) = (
        selector(GRID_SELECTOR, "grid", &mut raw.notices),
        selector(r#"[role="columnheader"]"#, "grid", &mut raw.notices),
        selector(r#"[role="row"]"#, "grid", &mut raw.notices),
        selector(
            r#"[role="gridcell"], [role="cell"], [role="rowheader"]"#,
            "grid",
            &mut raw.notices,
        ),
    ) else {
        return;
    };

    for el in document.select(&grid) {
        let headers = el.select(&header).map(collapsed_text).collect();
        let rows = el
            .select(&row)
            .map(|r| r.select(&cell).map(collapsed_text).collect::<Vec<_>>())
            .filter(|cells| !cells.is_empty())
            .collect();
        raw.tables.push(RawTable { headers, rows });
    }
}

fn collect_cards(document: &Html, raw: &mut RawPage) {
    for css in CARD_SELECTORS {
        let Some(sel) = selector(css, "cards", &mut raw.notices) else {
            continue;
        };
        for (index, card) in document.select(&sel).enumerate() {
            raw.cards.push(RawCard {
                selector: css.to_string(),
                index,
                text: collapsed_text(card),
            });
        }
    }
}

fn class_matches(el: ElementRef<'_>, pattern: &ClassPattern) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|class| pattern.matches(class))
}

fn collect_series(document: &Html, options: &ExtractOptions, raw: &mut RawPage) {
    let Some(with_class) = selector("[class]", "series", &mut raw.notices) else {
        return;
    };
    let extra: Vec<Selector> = options
        .extra_selectors
        .iter()
        .filter_map(|css| selector(css, "series", &mut raw.notices))
        .collect();

    for series in document
        .select(&with_class)
        .filter(|el| class_matches(*el, &options.series_class))
    {
        let attributes: BTreeMap<String, String> = series
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        let mut seen = HashSet::new();
        let mut found = Vec::new();
        let by_class = series
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|el| class_matches(*el, &options.target_class));
        let by_selector = extra
            .iter()
            .flat_map(|sel| series.select(sel))
            .filter(|el| el.id() != series.id());
        for el in by_class.chain(by_selector) {
            if seen.insert(el.id()) {
                found.push(el);
            }
        }

        raw.series.push(RawSeries {
            aria_label: series.value().attr("aria-label").unwrap_or_default().to_string(),
            attributes,
            elements: found
                .into_iter()
                .enumerate()
                .map(|(index, el)| RawElement {
                    index,
                    text_content: text_content(el),
                    inner_text: collapsed_text(el),
                    aria_label: el.value().attr("aria-label").unwrap_or_default().to_string(),
                })
                .collect(),
        });
    }
}

fn collect_visuals(document: &Html, raw: &mut RawPage) {
    let (Some(visual), Some(label), Some(value)) = (
        selector(VISUAL_SELECTOR, "visuals", &mut raw.notices),
        selector(VISUAL_LABEL_SELECTOR, "visuals", &mut raw.notices),
        selector(VISUAL_VALUE_SELECTOR, "visuals", &mut raw.notices),
    ) else {
        return;
    };

    for (index, container) in document.select(&visual).enumerate() {
        raw.visuals.push(RawVisual {
            index,
            labels: texts_in(container, &label),
            values: texts_in(container, &value),
            combined: collapsed_text(container),
        });
    }
}

fn collect_svgs(document: &Html, raw: &mut RawPage) {
    let (Some(svg), Some(text)) = (
        selector("svg", "svg", &mut raw.notices),
        selector("text", "svg", &mut raw.notices),
    ) else {
        return;
    };

    for (index, el) in document.select(&svg).enumerate() {
        raw.svgs.push(RawSvg {
            index,
            texts: texts_in(el, &text),
        });
    }
}

fn body_text(document: &Html) -> String {
    let body = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .unwrap_or_else(|| document.root_element());

    body.descendants()
        .filter_map(|node| {
            let text: &str = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| SKIPPED_TEXT_PARENTS.contains(&e.name()))
            });
            (!hidden).then(|| text.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
