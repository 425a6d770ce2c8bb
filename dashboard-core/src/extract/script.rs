//! In-page extraction script and its raw payload.
//!
//! The whole DOM walk runs as one script evaluation so the dashboard cannot
//! re-render between steps. Each step catches its own failures and reports
//! them in `notices`; the Rust side applies the filtering rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CARD_SELECTORS: [&str; 5] = [
    r#"[class*="card"]"#,
    r#"[class*="Card"]"#,
    r#"[class*="kpi"]"#,
    r#"[class*="KPI"]"#,
    r#"[role="figure"]"#,
];

pub const VISUAL_SELECTOR: &str = r#"[class*="visual"], [class*="Visual"]"#;
pub const VISUAL_LABEL_SELECTOR: &str = r#"[class*="label"], [class*="axisLabel"]"#;
pub const VISUAL_VALUE_SELECTOR: &str = r#"[class*="value"], [class*="data"]"#;
pub const GRID_SELECTOR: &str = r#"[role="grid"]:not(table), [role="table"]:not(table)"#;

/// Called with the options object built by `ExtractOptions::script_options`.
pub const EXTRACT_PAGE_JS: &str = r#"
(options) => {
    const out = { tables: [], cards: [], series: [], visuals: [], svgs: [], text: '', notices: [] };

    const tokensOf = (s) => (s || '').split(/\s+/).filter(Boolean);
    const classMatches = (el, want) => {
        if (want.length === 0) return false;
        const have = tokensOf(el.getAttribute('class'));
        return want.every(t => have.some(c => c.includes(t)));
    };
    const textOf = (el) => String(el.innerText || el.textContent || '').trim();
    const step = (name, fn) => {
        try { fn(); } catch (e) { out.notices.push(name + ': ' + e); }
    };
    const each = (name, list, fn) => {
        Array.from(list).forEach((el, idx) => {
            try { fn(el, idx); } catch (e) { out.notices.push(name + ' ' + idx + ': ' + e); }
        });
    };

    step('tables', () => {
        each('table', document.querySelectorAll('table'), (table) => {
            const headers = Array.from(table.querySelectorAll('th')).map(textOf);
            const rows = [];
            table.querySelectorAll('tr').forEach(tr => {
                const cells = Array.from(tr.querySelectorAll('td')).map(textOf);
                if (cells.length > 0) rows.push(cells);
            });
            out.tables.push({ headers, rows });
        });
        each('grid', document.querySelectorAll(options.gridSelector), (grid) => {
            const headers = Array.from(grid.querySelectorAll('[role="columnheader"]')).map(textOf);
            const rows = [];
            grid.querySelectorAll('[role="row"]').forEach(row => {
                const cells = Array.from(row.querySelectorAll('[role="gridcell"], [role="cell"], [role="rowheader"]')).map(textOf);
                if (cells.length > 0) rows.push(cells);
            });
            out.tables.push({ headers, rows });
        });
    });

    step('cards', () => {
        options.cardSelectors.forEach(selector => {
            each('card', document.querySelectorAll(selector), (card, index) => {
                out.cards.push({ selector, index, text: textOf(card) });
            });
        });
    });

    step('series', () => {
        const seriesTokens = tokensOf(options.seriesClass);
        const targetTokens = tokensOf(options.targetClass);
        const candidates = Array.from(document.querySelectorAll('[class]'))
            .filter(el => classMatches(el, seriesTokens));
        each('series', candidates, (series) => {
            const attributes = {};
            Array.from(series.attributes).forEach(a => { attributes[a.name] = a.value; });
            const seen = new Set();
            const found = [];
            const take = (el) => { if (!seen.has(el)) { seen.add(el); found.push(el); } };
            series.querySelectorAll('[class]').forEach(el => {
                if (classMatches(el, targetTokens)) take(el);
            });
            (options.extraSelectors || []).forEach(selector => {
                try {
                    series.querySelectorAll(selector).forEach(take);
                } catch (e) {
                    out.notices.push('selector ' + selector + ': ' + e);
                }
            });
            out.series.push({
                ariaLabel: series.getAttribute('aria-label') || '',
                attributes,
                elements: found.map((el, index) => ({
                    index,
                    textContent: String(el.textContent || '').trim(),
                    innerText: String(el.innerText || '').trim(),
                    ariaLabel: el.getAttribute('aria-label') || '',
                })),
            });
        });
    });

    step('visuals', () => {
        each('visual', document.querySelectorAll(options.visualSelector), (container, index) => {
            const pick = (selector) => Array.from(container.querySelectorAll(selector))
                .map(el => String(el.textContent || el.innerText || '').trim())
                .filter(Boolean);
            out.visuals.push({
                index,
                labels: pick(options.labelSelector),
                values: pick(options.valueSelector),
                combined: textOf(container),
            });
        });
    });

    step('svg', () => {
        each('svg', document.querySelectorAll('svg'), (svg, index) => {
            const texts = Array.from(svg.querySelectorAll('text'))
                .map(t => String(t.textContent || '').trim())
                .filter(Boolean);
            out.svgs.push({ index, texts });
        });
    });

    step('text', () => {
        out.text = document.body ? String(document.body.innerText || document.body.textContent || '') : '';
    });

    return out;
}
"#;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPage {
    pub tables: Vec<RawTable>,
    pub cards: Vec<RawCard>,
    pub series: Vec<RawSeries>,
    pub visuals: Vec<RawVisual>,
    pub svgs: Vec<RawSvg>,
    pub text: String,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCard {
    pub selector: String,
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSeries {
    pub aria_label: String,
    pub attributes: BTreeMap<String, String>,
    pub elements: Vec<RawElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawElement {
    pub index: usize,
    pub text_content: String,
    pub inner_text: String,
    pub aria_label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawVisual {
    pub index: usize,
    pub labels: Vec<String>,
    pub values: Vec<String>,
    pub combined: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSvg {
    pub index: usize,
    pub texts: Vec<String>,
}
