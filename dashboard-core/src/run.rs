//! One extraction run: navigate, wait, filter, walk pages, extract.
//!
//! A run owns its session and is consumed by [`DashboardRun::execute`], so a
//! session is never driven by two flows at once. Recoverable problems end up
//! as notices in the report; only a session fault stops the run early, and
//! the pages extracted before it are kept. Cancelling the run keeps them too.

use crate::consolidate::consolidate;
use crate::error::{escalate, ExtractError, Notice, Stage};
use crate::extract::{ExtractOptions, StructuredExtractor};
use crate::filter::{DateFilter, DateRole, FilterConfig, FilterController, DEFAULT_TARGET_DATE};
use crate::model::{DashboardPage, NetworkResponse};
use crate::pagination::{Advance, ExhaustReason, PageSelection, PaginationConfig, PaginationWalker};
use crate::readiness::{ReadinessConfig, ReadinessDetector};
use crate::session::{Element, Locator, Session};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use validator::{Validate, ValidationError};

pub const DEFAULT_DASHBOARD_URL: &str = "https://app.powerbi.com/view?r=eyJrIjoiYmU0ODUxNGMtNWU2MS00YTM5LThkMGYtNWFkYWQzYmU3ZWY2IiwidCI6IjNhZGVlNWZjLTkzM2UtNDkxMS1hZTFiLTljMmZlN2I4NDQ0OCIsImMiOjR9";

pub const DEFAULT_MAX_PAGES: u32 = 20;

/// Iframe sources containing this are treated as the embedded dashboard.
pub const DEFAULT_EMBED_HOST: &str = "powerbi.com";

#[derive(Debug, Clone, Validate)]
pub struct RunConfig {
    #[validate(url)]
    pub url: String,

    #[validate(custom(function = "validate_selection"))]
    pub selection: PageSelection,

    #[validate(range(min = 1, max = 1000))]
    pub max_pages: u32,

    /// When `url` is a host page, open the first iframe whose `src` contains
    /// this. `None` extracts whatever `url` loads.
    pub embed_host: Option<String>,

    pub date_filters: Vec<DateFilter>,

    pub filter: FilterConfig,

    pub initial_readiness: ReadinessConfig,

    pub pagination: PaginationConfig,

    #[validate(custom(function = "validate_extract"))]
    pub extract: ExtractOptions,

    /// Capture a screenshot and the page source before and after the walk.
    pub snapshots: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DASHBOARD_URL.to_string(),
            selection: PageSelection::All,
            max_pages: DEFAULT_MAX_PAGES,
            embed_host: Some(DEFAULT_EMBED_HOST.to_string()),
            date_filters: vec![DateFilter {
                date: DEFAULT_TARGET_DATE,
                role: DateRole::Start,
            }],
            filter: FilterConfig::default(),
            initial_readiness: ReadinessConfig::initial_load(),
            pagination: PaginationConfig::default(),
            extract: ExtractOptions::default(),
            snapshots: true,
        }
    }
}

fn validate_selection(selection: &PageSelection) -> Result<(), ValidationError> {
    selection.validate().map_err(|err| {
        let mut error = ValidationError::new("page_selection");
        error.message = Some(err.to_string().into());
        error
    })
}

fn validate_extract(options: &ExtractOptions) -> Result<(), ValidationError> {
    if options.target_class.is_empty() {
        return Err(ValidationError::new("empty_target_class"));
    }
    Ok(())
}

/// Screenshot and page source captured at one point of the run.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub label: String,
    pub screenshot: Option<Vec<u8>>,
    pub markup: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub pages_visited: u32,
    pub pages_extracted: usize,
    pub series: usize,
    pub elements: usize,
    pub tables: usize,
    pub cards: usize,
    pub charts: usize,
    pub rows: usize,
    pub network_responses: usize,
    pub notices: usize,
    pub interrupted: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pages visited:   {}", self.pages_visited)?;
        writeln!(f, "Pages extracted: {}", self.pages_extracted)?;
        writeln!(f, "Series:          {}", self.series)?;
        writeln!(f, "Elements:        {}", self.elements)?;
        writeln!(f, "Tables:          {}", self.tables)?;
        writeln!(f, "Cards/KPIs:      {}", self.cards)?;
        writeln!(f, "Charts:          {}", self.charts)?;
        writeln!(f, "Rows:            {}", self.rows)?;
        writeln!(f, "Data responses:  {}", self.network_responses)?;
        write!(f, "Notices:         {}", self.notices)?;
        if self.interrupted {
            write!(f, "\nInterrupted before the walk finished")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages_visited: u32,
    /// Iframe source opened in place of the configured URL.
    pub embed_url: Option<String>,
    pub pages: Vec<DashboardPage>,
    pub notices: Vec<Notice>,
    pub snapshots: Vec<Snapshot>,
    pub responses: Vec<NetworkResponse>,
    /// Set when a session fault ended the run early.
    pub fault: Option<ExtractError>,
    pub interrupted: bool,
}

impl RunReport {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            pages_visited: 0,
            embed_url: None,
            pages: Vec::new(),
            notices: Vec::new(),
            snapshots: Vec::new(),
            responses: Vec::new(),
            fault: None,
            interrupted: false,
        }
    }

    /// A report for pages extracted without a live session.
    pub fn offline(pages: Vec<DashboardPage>, notices: Vec<Notice>) -> Self {
        let mut report = Self::new();
        report.pages_visited = pages.iter().map(|p| p.page_number).max().unwrap_or(0);
        report.pages = pages;
        report.notices = notices;
        report
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            pages_visited: self.pages_visited,
            pages_extracted: self.pages.len(),
            series: self.pages.iter().map(|p| p.series.len()).sum(),
            elements: self.pages.iter().map(DashboardPage::element_count).sum(),
            tables: self.pages.iter().map(|p| p.tables.len()).sum(),
            cards: self.pages.iter().map(|p| p.cards.len()).sum(),
            charts: self.pages.iter().map(|p| p.charts.len()).sum(),
            rows: consolidate(&self.pages).len(),
            network_responses: self.responses.len(),
            notices: self.notices.len(),
            interrupted: self.interrupted,
        }
    }

    /// Nothing usable came out of the run.
    pub fn is_failure(&self) -> bool {
        self.pages.is_empty() && (self.fault.is_some() || self.interrupted)
    }

    fn notice(&mut self, stage: Stage, page: Option<u32>, message: impl Into<String>) {
        let notice = Notice::new(stage, page, message);
        tracing::warn!(%notice, "Recorded notice");
        self.notices.push(notice);
    }
}

pub struct DashboardRun<S: Session> {
    session: S,
    config: RunConfig,
}

impl<S: Session> DashboardRun<S> {
    pub fn new(session: S, config: RunConfig) -> Self {
        Self { session, config }
    }

    /// Drive the whole run and close the session, whatever happened.
    pub async fn execute(self) -> RunReport {
        self.execute_until(CancellationToken::new()).await
    }

    /// Like [`execute`](Self::execute), stopping early once `cancel` fires.
    ///
    /// Pages extracted before cancellation stay in the report and the session
    /// is still closed.
    pub async fn execute_until(self, cancel: CancellationToken) -> RunReport {
        let Self { session, config } = self;
        let mut report = RunReport::new();

        tracing::info!(url = %config.url, selection = %config.selection, max_pages = config.max_pages, "Starting run");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ExtractError::Interrupted),
            result = drive(&session, &config, &cancel, &mut report) => result,
        };
        match result {
            Ok(()) => {}
            Err(ExtractError::Interrupted) => {
                tracing::warn!(pages = report.pages.len(), "Run interrupted");
                report.interrupted = true;
                report.notice(Stage::Session, None, "interrupted, keeping the pages extracted so far");
            }
            Err(err) => {
                tracing::error!(error = %err, pages = report.pages.len(), "Run aborted");
                report.notice(Stage::Session, None, err.to_string());
                report.fault = Some(err);
            }
        }

        report.responses = session.network_responses().await;

        if let Err(err) = session.close().await {
            report.notice(Stage::Session, None, format!("closing session: {}", err));
        }

        report.finished_at = Utc::now();
        tracing::info!(
            pages = report.pages.len(),
            notices = report.notices.len(),
            faulted = report.fault.is_some(),
            "Run finished"
        );
        report
    }
}

async fn drive<S: Session>(
    session: &S,
    config: &RunConfig,
    cancel: &CancellationToken,
    report: &mut RunReport,
) -> Result<(), ExtractError> {
    session
        .navigate(&config.url)
        .await
        .map_err(ExtractError::SessionFault)?;
    wait_ready(session, &config.initial_readiness, report).await?;

    if let Some(host) = config.embed_host.as_deref() {
        if !config.url.contains(host) {
            enter_embed(session, config, host, report).await?;
        }
    }

    if config.snapshots {
        take_snapshot(session, "initial", report).await?;
    }

    apply_filters(session, config, report).await?;

    let extractor = StructuredExtractor::new(config.extract.clone());
    let mut walker = PaginationWalker::new(
        config.pagination.clone(),
        config.selection.clone(),
        config.max_pages,
    );

    loop {
        let page = walker.current_page();
        report.pages_visited = page;

        if walker.should_extract() {
            let outcome = extractor.extract(session, page).await?;
            report.notices.extend(outcome.notices);
            report.pages.push(outcome.value);
        } else {
            tracing::debug!(page, "Page not selected, passing through");
        }

        if cancel.is_cancelled() {
            return Err(ExtractError::Interrupted);
        }

        if !walker.wants_more() {
            break;
        }
        match walker.advance(session).await? {
            Advance::Moved(_) => {}
            Advance::Exhausted(ExhaustReason::Failed(err)) => {
                report.notice(Stage::Pagination, Some(page), err.to_string());
                break;
            }
            Advance::Exhausted(reason) => {
                tracing::info!(page, %reason, "Pagination finished");
                break;
            }
        }
    }

    if let Some(missing) = unreached(&config.selection, walker.current_page()) {
        report.notice(
            Stage::Pagination,
            None,
            format!("requested pages not reached: {}", missing),
        );
    }

    if config.snapshots {
        take_snapshot(session, "final", report).await?;
    }

    Ok(())
}

async fn wait_ready<S: Session>(
    session: &S,
    readiness: &ReadinessConfig,
    report: &mut RunReport,
) -> Result<(), ExtractError> {
    let readiness = ReadinessDetector::new(readiness.clone()).wait(session).await?;
    if !readiness.fully_ready() {
        report.notice(
            Stage::Readiness,
            None,
            format!("probes missed: {}", readiness.missed.join(", ")),
        );
    }
    Ok(())
}

/// Switch from a host page to the dashboard it embeds.
///
/// The embed is opened as the top-level document so every later probe and
/// script runs inside it.
async fn enter_embed<S: Session>(
    session: &S,
    config: &RunConfig,
    host: &str,
    report: &mut RunReport,
) -> Result<(), ExtractError> {
    let Some(src) = find_embed(session, host).await? else {
        report.notice(
            Stage::Embed,
            None,
            format!("no iframe from {} found, extracting the page as loaded", host),
        );
        return Ok(());
    };

    tracing::info!(%src, "Embedded dashboard found, opening it directly");
    session.navigate(&src).await.map_err(ExtractError::SessionFault)?;
    report.embed_url = Some(src);
    wait_ready(session, &config.initial_readiness, report).await
}

/// `src` of the first iframe whose address contains `host`.
async fn find_embed<S: Session>(session: &S, host: &str) -> Result<Option<String>, ExtractError> {
    let frames = match session.find(&Locator::css("iframe[src]")).await {
        Ok(frames) => frames,
        Err(err) => {
            let err = escalate(err)?;
            tracing::debug!(error = %err, "Iframe lookup failed");
            return Ok(None);
        }
    };
    tracing::debug!(count = frames.len(), "Iframes on page");

    for frame in &frames {
        match frame.attribute("src").await {
            Ok(Some(src)) if src.contains(host) => return Ok(Some(src)),
            Ok(_) => {}
            Err(err) => {
                let err = escalate(err)?;
                tracing::debug!(error = %err, "Iframe src unreadable");
            }
        }
    }
    Ok(None)
}

async fn apply_filters<S: Session>(session: &S, config: &RunConfig, report: &mut RunReport) -> Result<(), ExtractError> {
    let controller = FilterController::new(config.filter.clone());

    for filter in &config.date_filters {
        match controller.apply_date_filter(session, filter.date, filter.role).await {
            Ok(true) => sleep(config.filter.settle).await,
            Ok(false) => {
                let message = format!(
                    "{} date {} was not accepted by the control",
                    filter.role,
                    controller.format_date(filter.date)
                );
                report.notice(Stage::Filter, None, message);
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => report.notice(Stage::Filter, None, err.to_string()),
        }
    }
    Ok(())
}

async fn take_snapshot<S: Session>(session: &S, label: &str, report: &mut RunReport) -> Result<(), ExtractError> {
    let screenshot = match session.screenshot().await {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            let err = escalate(err)?;
            report.notice(Stage::Snapshot, None, format!("{} screenshot: {}", label, err));
            None
        }
    };
    let markup = match session.page_markup().await {
        Ok(html) => Some(html),
        Err(err) => {
            let err = escalate(err)?;
            report.notice(Stage::Snapshot, None, format!("{} page source: {}", label, err));
            None
        }
    };

    if screenshot.is_some() || markup.is_some() {
        tracing::debug!(label, "Snapshot captured");
        report.snapshots.push(Snapshot {
            label: label.to_string(),
            screenshot,
            markup,
        });
    }
    Ok(())
}

/// Selected pages past the last page reached, formatted for a notice.
fn unreached(selection: &PageSelection, last_visited: u32) -> Option<String> {
    match selection {
        PageSelection::All => None,
        PageSelection::Specific(pages) => {
            let rest: Vec<String> = pages
                .range(last_visited.saturating_add(1)..)
                .map(u32::to_string)
                .collect();
            (!rest.is_empty()).then(|| rest.join(","))
        }
        PageSelection::Range { first, last } => (*last > last_visited)
            .then(|| format!("{}-{}", (*first).max(last_visited + 1), last)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Locator;
    use crate::testing::{FakeInput, FakeSession};
    use serde_json::json;
    use std::time::Duration;

    fn quick_readiness() -> ReadinessConfig {
        ReadinessConfig {
            timeout: Duration::ZERO,
            settle: Duration::ZERO,
            poll_interval: Duration::from_millis(10),
            probes: Vec::new(),
        }
    }

    fn quick_config(selection: &str) -> RunConfig {
        RunConfig {
            url: "https://dashboards.example.com/view?r=abc".into(),
            selection: PageSelection::parse(selection).unwrap(),
            embed_host: None,
            date_filters: Vec::new(),
            filter: FilterConfig {
                settle: Duration::ZERO,
                ..Default::default()
            },
            initial_readiness: quick_readiness(),
            pagination: PaginationConfig {
                click_pause: Duration::ZERO,
                transition_delay: Duration::ZERO,
                readiness: quick_readiness(),
                ..Default::default()
            },
            snapshots: false,
            ..Default::default()
        }
    }

    fn dashboard(total: u32) -> FakeSession {
        let mut session = FakeSession::new(total).with_next(Locator::css("button[aria-label='Next Page']"));
        for page in 1..=total {
            session = session.with_payload(
                page,
                json!({
                    "series": [{
                        "ariaLabel": format!("Série {}", page),
                        "elements": [
                            {"index": 0, "textContent": "10"},
                            {"index": 1, "textContent": "20"}
                        ]
                    }],
                    "text": format!("Página {}", page)
                }),
            );
        }
        session
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RunConfig {
            url: "not a url".into(),
            max_pages: 0,
            selection: PageSelection::Range { first: 4, last: 2 },
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("url"));
        assert!(fields.contains_key("max_pages"));
        assert!(fields.contains_key("selection"));
    }

    #[test]
    fn test_empty_target_class_rejected() {
        let mut config = RunConfig::default();
        config.extract.target_class = crate::extract::classes::ClassPattern::new(" ");
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_specific_pages_extracted_in_order() {
        let session = dashboard(5);
        let observer = session.clone();

        let report = DashboardRun::new(session, quick_config("2,4")).execute().await;

        let numbers: Vec<u32> = report.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![2, 4]);
        assert_eq!(report.pages_visited, 4);
        assert_eq!(observer.read(|d| d.extracted_on.clone()), vec![2, 4]);
        assert_eq!(
            observer.read(|d| d.navigations.clone()),
            vec!["https://dashboards.example.com/view?r=abc"]
        );
        assert!(observer.read(|d| d.closed));
        assert!(report.fault.is_none());
        assert_eq!(report.pages[1].series[0].aria_label, "Série 4");
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let report = DashboardRun::new(dashboard(3), quick_config("all")).execute().await;

        let summary = report.summary();
        assert_eq!(summary.pages_visited, 3);
        assert_eq!(summary.pages_extracted, 3);
        assert_eq!(summary.series, 3);
        assert_eq!(summary.elements, 6);
        assert_eq!(summary.rows, 6);
        assert!(summary.to_string().contains("Pages extracted: 3"));
    }

    #[tokio::test]
    async fn test_unreached_pages_are_reported() {
        let report = DashboardRun::new(dashboard(3), quick_config("2,7")).execute().await;

        let numbers: Vec<u32> = report.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![2]);
        assert!(report
            .notices
            .iter()
            .any(|n| n.stage == Stage::Pagination && n.message.ends_with(": 7")));
    }

    #[tokio::test]
    async fn test_fault_before_extraction_still_closes() {
        let session = dashboard(3);
        session.update(|d| d.transport_down = true);
        let observer = session.clone();

        let report = DashboardRun::new(session, quick_config("all")).execute().await;

        assert!(report.pages.is_empty());
        assert!(report.fault.as_ref().is_some_and(ExtractError::is_fatal));
        assert!(report.is_failure());
        assert!(observer.read(|d| d.closed));
    }

    #[tokio::test]
    async fn test_missing_filter_control_is_a_notice() {
        let mut config = quick_config("1");
        config.date_filters = vec![DateFilter {
            date: DEFAULT_TARGET_DATE,
            role: DateRole::Start,
        }];

        let report = DashboardRun::new(dashboard(2), config).execute().await;

        assert_eq!(report.pages.len(), 1);
        assert!(report.notices.iter().any(|n| n.stage == Stage::Filter));
    }

    #[tokio::test]
    async fn test_filter_applied_before_extraction() {
        let session = dashboard(1);
        let input = session.add_input(
            Locator::css("input[aria-label*='Start date']"),
            FakeInput::default(),
        );
        let mut config = quick_config("all");
        config.date_filters = RunConfig::default().date_filters;

        let report = DashboardRun::new(session, config).execute().await;

        assert_eq!(input.lock().unwrap().value, "01/10/2021");
        assert!(!report.notices.iter().any(|n| n.stage == Stage::Filter));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_timings_with_snapshots() {
        let mut config = RunConfig {
            selection: PageSelection::parse("1-2").unwrap(),
            ..Default::default()
        };
        config.date_filters.clear();

        let report = DashboardRun::new(dashboard(2), config).execute().await;

        assert_eq!(report.pages.len(), 2);
        let labels: Vec<&str> = report.snapshots.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["initial", "final"]);
        assert!(report.notices.iter().any(|n| n.stage == Stage::Readiness));
    }

    #[tokio::test]
    async fn test_cancel_keeps_extracted_pages_and_closes() {
        let session = dashboard(3);
        let cancel = CancellationToken::new();
        session.update(|d| d.cancel_after = Some((1, cancel.clone())));
        let observer = session.clone();

        let report = DashboardRun::new(session, quick_config("all"))
            .execute_until(cancel)
            .await;

        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.pages[0].page_number, 1);
        assert!(report.interrupted);
        assert!(report.fault.is_none());
        assert!(!report.is_failure());
        assert_eq!(observer.read(|d| d.page), 1);
        assert!(observer.read(|d| d.closed));
        assert!(report.summary().to_string().contains("Interrupted"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let session = dashboard(2);
        let observer = session.clone();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = DashboardRun::new(session, quick_config("all"))
            .execute_until(cancel)
            .await;

        assert!(report.pages.is_empty());
        assert!(report.interrupted);
        assert!(report.is_failure());
        assert!(observer.read(|d| d.navigations.is_empty()));
        assert!(observer.read(|d| d.closed));
    }

    #[tokio::test]
    async fn test_embedded_dashboard_opened_from_host_page() {
        let host = "https://www.ons.org.br/paginas/energia-agora/curtailment";
        let embed = "https://app.powerbi.com/view?r=eyJrIjoiYWJjIn0";
        let session = dashboard(1);
        session.update(|d| {
            d.frames = vec!["https://www.youtube.com/embed/intro".into(), embed.into()];
        });
        let observer = session.clone();
        let mut config = quick_config("all");
        config.url = host.into();
        config.embed_host = Some(DEFAULT_EMBED_HOST.into());

        let report = DashboardRun::new(session, config).execute().await;

        assert_eq!(report.embed_url.as_deref(), Some(embed));
        assert_eq!(observer.read(|d| d.navigations.clone()), vec![host, embed]);
        assert_eq!(report.pages.len(), 1);
        assert!(!report.notices.iter().any(|n| n.stage == Stage::Embed));
    }

    #[tokio::test]
    async fn test_host_page_without_embed_is_a_notice() {
        let session = dashboard(1);
        let observer = session.clone();
        let mut config = quick_config("all");
        config.embed_host = Some(DEFAULT_EMBED_HOST.into());

        let report = DashboardRun::new(session, config).execute().await;

        assert!(report.embed_url.is_none());
        assert_eq!(observer.read(|d| d.navigations.len()), 1);
        assert_eq!(report.pages.len(), 1);
        assert!(report
            .notices
            .iter()
            .any(|n| n.stage == Stage::Embed && n.message.contains("powerbi.com")));
    }

    #[tokio::test]
    async fn test_direct_embed_url_skips_discovery() {
        let session = dashboard(1);
        session.update(|d| d.frames = vec!["https://app.powerbi.com/other".into()]);
        let observer = session.clone();
        let mut config = quick_config("all");
        config.url = "https://app.powerbi.com/view?r=abc".into();
        config.embed_host = Some(DEFAULT_EMBED_HOST.into());

        let report = DashboardRun::new(session, config).execute().await;

        assert!(report.embed_url.is_none());
        assert_eq!(observer.read(|d| d.navigations.len()), 1);
    }

    #[tokio::test]
    async fn test_network_responses_recorded() {
        let session = dashboard(1);
        session.update(|d| {
            d.responses = vec![NetworkResponse {
                url: "https://wabi-brazil-south-api.analysis.windows.net/public/reports/querydata".into(),
                status: 200,
                mime_type: "application/json".into(),
                request_id: "1000.42".into(),
            }]
        });

        let report = DashboardRun::new(session, quick_config("all")).execute().await;

        assert_eq!(report.responses.len(), 1);
        assert_eq!(report.summary().network_responses, 1);
    }

    #[test]
    fn test_unreached_formats() {
        assert_eq!(unreached(&PageSelection::All, 2), None);
        assert_eq!(
            unreached(&PageSelection::parse("1,4,6").unwrap(), 3),
            Some("4,6".to_string())
        );
        assert_eq!(
            unreached(&PageSelection::Range { first: 2, last: 9 }, 5),
            Some("6-9".to_string())
        );
        assert_eq!(unreached(&PageSelection::Range { first: 2, last: 5 }, 5), None);
    }
}
