//! Writing a run report to disk as JSON, CSV, spreadsheet and text files.

use crate::consolidate::{consolidate, consolidate_tables};
use crate::model::{ConsolidatedRow, DashboardPage};
use crate::run::RunReport;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Serialize;
use serde_json::json;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const SEP: char = ',';

/// Rows per worksheet, header included.
const SHEET_ROW_LIMIT: usize = 1_048_576;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build workbook {}: {source}", path.display())]
    Xlsx {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write one CSV row; fields are quoted only when they have to be.
pub fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, "{}", SEP)?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

fn write_csv<W: Write>(mut out: W, headers: &[String], rows: &[Vec<String>]) -> io::Result<()> {
    write_row(&mut out, headers)?;
    for row in rows {
        write_row(&mut out, row)?;
    }
    out.flush()
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

struct Sheet<'a> {
    name: &'a str,
    headers: &'a [String],
    rows: &'a [Vec<String>],
}

struct Writer<'a> {
    dir: &'a Path,
    prefix: &'a str,
    written: Vec<PathBuf>,
}

impl<'a> Writer<'a> {
    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}_{}", self.prefix, name))
    }

    fn bytes(&mut self, name: &str, data: &[u8]) -> Result<(), ExportError> {
        let path = self.path(name);
        fs::write(&path, data).map_err(io_error(&path))?;
        self.done(path);
        Ok(())
    }

    fn json<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<(), ExportError> {
        let path = self.path(name);
        let file = File::create(&path).map_err(io_error(&path))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, value).map_err(|source| ExportError::Json {
            path: path.clone(),
            source,
        })?;
        out.flush().map_err(io_error(&path))?;
        self.done(path);
        Ok(())
    }

    fn csv(&mut self, name: &str, headers: &[String], rows: &[Vec<String>]) -> Result<(), ExportError> {
        let path = self.path(name);
        let file = File::create(&path).map_err(io_error(&path))?;
        write_csv(BufWriter::new(file), headers, rows).map_err(io_error(&path))?;
        self.done(path);
        Ok(())
    }

    /// One worksheet per `(name, headers, rows)`; sheets too long for the
    /// format are left out.
    fn xlsx(&mut self, name: &str, sheets: &[Sheet<'_>]) -> Result<(), ExportError> {
        let path = self.path(name);
        let xlsx_error = |source| ExportError::Xlsx {
            path: path.clone(),
            source,
        };

        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        for sheet in sheets {
            if sheet.rows.len() + 1 > SHEET_ROW_LIMIT {
                tracing::warn!(sheet = sheet.name, rows = sheet.rows.len(), "Too many rows for a worksheet, skipped");
                continue;
            }
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet.name).map_err(xlsx_error)?;
            for (col, header) in sheet.headers.iter().enumerate() {
                worksheet
                    .write_string_with_format(0, col as u16, header, &bold)
                    .map_err(xlsx_error)?;
            }
            for (row, record) in sheet.rows.iter().enumerate() {
                for (col, cell) in record.iter().enumerate() {
                    worksheet
                        .write_string(row as u32 + 1, col as u16, cell)
                        .map_err(xlsx_error)?;
                }
            }
        }
        workbook.save(&path).map_err(xlsx_error)?;
        self.done(path);
        Ok(())
    }

    fn done(&mut self, path: PathBuf) {
        tracing::debug!(path = %path.display(), "Wrote export file");
        self.written.push(path);
    }
}

/// Write every export file for `report` into `dir` and return their paths.
///
/// Files with nothing to hold (no tables, no cards, ...) are not created.
pub fn write_report(dir: &Path, prefix: &str, report: &RunReport) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir).map_err(io_error(dir))?;
    let mut w = Writer {
        dir,
        prefix,
        written: Vec::new(),
    };

    w.json(
        "data_complete.json",
        &json!({
            "started_at": report.started_at,
            "finished_at": report.finished_at,
            "summary": report.summary(),
            "embed_url": report.embed_url,
            "fault": report.fault.as_ref().map(ToString::to_string),
            "interrupted": report.interrupted,
            "notices": report.notices,
            "pages": report.pages,
        }),
    )?;

    let series = consolidate(&report.pages);
    write_tables(&mut w, &report.pages)?;
    write_series(&mut w, &series)?;
    write_workbook(&mut w, &report.pages, &series)?;
    write_cards(&mut w, &report.pages)?;
    write_charts(&mut w, &report.pages)?;

    if !report.responses.is_empty() {
        w.json("network_requests.json", &report.responses)?;
    }

    for page in report.pages.iter().filter(|p| !p.raw_text.is_empty()) {
        let text = page.raw_text.join("\n") + "\n";
        w.bytes(&format!("page{}_full_text.txt", page.page_number), text.as_bytes())?;
    }

    for snapshot in &report.snapshots {
        if let Some(png) = &snapshot.screenshot {
            w.bytes(&format!("screenshot_{}.png", snapshot.label), png)?;
        }
        if let Some(html) = &snapshot.markup {
            w.bytes(&format!("page_source_{}.html", snapshot.label), html.as_bytes())?;
        }
    }

    tracing::info!(dir = %dir.display(), files = w.written.len(), "Export finished");
    Ok(w.written)
}

fn write_tables(w: &mut Writer<'_>, pages: &[DashboardPage]) -> Result<(), ExportError> {
    let mut any = false;
    for page in pages {
        for (i, table) in page.tables.iter().enumerate() {
            any = true;
            let single = consolidate_tables(std::slice::from_ref(&DashboardPage {
                page_number: page.page_number,
                tables: vec![table.clone()],
                ..Default::default()
            }));
            w.csv(
                &format!("page{}_table_{}.csv", page.page_number, i + 1),
                &single.headers,
                &single.rows,
            )?;
        }
    }

    if any {
        let stacked = consolidate_tables(pages);
        w.csv("ALL_TABLES_CONSOLIDATED.csv", &stacked.headers, &stacked.rows)?;
    }
    Ok(())
}

fn write_series(w: &mut Writer<'_>, rows: &[ConsolidatedRow]) -> Result<(), ExportError> {
    if rows.is_empty() {
        return Ok(());
    }
    let headers: Vec<String> = ConsolidatedRow::HEADERS.iter().map(|h| h.to_string()).collect();
    let records: Vec<Vec<String>> = rows.iter().map(ConsolidatedRow::to_record).collect();
    w.csv("series_consolidated.csv", &headers, &records)?;
    w.json("series_consolidated.json", rows)
}

/// Stacked tables and series rows as the sheets of one workbook.
fn write_workbook(w: &mut Writer<'_>, pages: &[DashboardPage], series: &[ConsolidatedRow]) -> Result<(), ExportError> {
    let tables = consolidate_tables(pages);
    let series_headers: Vec<String> = ConsolidatedRow::HEADERS.iter().map(|h| h.to_string()).collect();
    let series_rows: Vec<Vec<String>> = series.iter().map(ConsolidatedRow::to_record).collect();

    let mut sheets = Vec::new();
    if !tables.rows.is_empty() {
        sheets.push(Sheet {
            name: "tables",
            headers: &tables.headers,
            rows: &tables.rows,
        });
    }
    if !series_rows.is_empty() {
        sheets.push(Sheet {
            name: "series",
            headers: &series_headers,
            rows: &series_rows,
        });
    }
    if sheets.is_empty() {
        return Ok(());
    }
    w.xlsx("dataframe.xlsx", &sheets)
}

fn write_cards(w: &mut Writer<'_>, pages: &[DashboardPage]) -> Result<(), ExportError> {
    if pages.iter().all(|p| p.cards.is_empty()) {
        return Ok(());
    }
    let mut text = String::new();
    for page in pages.iter().filter(|p| !p.cards.is_empty()) {
        text.push_str(&format!("=== Page {} ===\n", page.page_number));
        for card in &page.cards {
            text.push_str(&format!("[{} #{}] {}\n", card.selector, card.index, card.text));
        }
        text.push('\n');
    }
    w.bytes("ALL_cards_kpis.txt", text.as_bytes())
}

fn write_charts(w: &mut Writer<'_>, pages: &[DashboardPage]) -> Result<(), ExportError> {
    let charts: Vec<_> = pages
        .iter()
        .filter(|p| !p.charts.is_empty())
        .map(|p| json!({ "page": p.page_number, "charts": p.charts }))
        .collect();
    if charts.is_empty() {
        return Ok(());
    }
    w.json("ALL_charts_data.json", &charts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn written(cells: &[&str]) -> String {
        let mut buf = Vec::new();
        write_row(&mut buf, &row(cells)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_plain_fields_unquoted() {
        assert_eq!(written(&["Jan", "120", ""]), "Jan,120,\n");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(written(&["1.234,5"]), "\"1.234,5\"\n");
        assert_eq!(written(&["say \"hi\""]), "\"say \"\"hi\"\"\"\n");
        assert_eq!(written(&["two\nlines", "cr\r"]), "\"two\nlines\",\"cr\r\"\n");
    }
}
