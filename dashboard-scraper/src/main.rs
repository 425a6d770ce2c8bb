//! Dashboard extraction binary.
//!
//! Provides two subcommands:
//! - `extract`: drive a browser through the dashboard and write every export
//! - `reparse`: re-run extraction over a saved page source, no browser needed

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dashboard_core::extract::classes::ClassPattern;
use dashboard_core::filter::{DateFilter, DateRole, FilterConfig, DEFAULT_DATE_FORMAT, DEFAULT_TARGET_DATE};
use dashboard_core::{
    export, extract_markup, launch_session, BrowserOptions, DashboardRun, ExtractOptions, PageSelection,
    RunConfig, RunReport,
};
use scrape_common::{BrowserArgs, OutputArgs};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use validator::Validate;

#[derive(Parser)]
#[command(name = "dashboard-scraper", about = "Extract data from an embedded BI dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open the dashboard in a browser and extract the selected pages
    Extract(ExtractArgs),

    /// Extract from a saved page source
    Reparse(ReparseArgs),
}

#[derive(Parser)]
struct ExtractArgs {
    /// Dashboard URL
    #[clap(long, default_value = dashboard_core::run::DEFAULT_DASHBOARD_URL)]
    url: String,

    /// Pages to extract: all, a list (1,3,5) or a range (2-4)
    #[clap(long, default_value = "all")]
    pages: PageSelection,

    /// Never walk past this page
    #[clap(long, default_value = "20")]
    max_pages: u32,

    /// When --url is a host page, open the iframe whose src contains this (empty: never)
    #[clap(long, default_value = dashboard_core::run::DEFAULT_EMBED_HOST)]
    embed_host: String,

    /// Start of the date filter (YYYY-MM-DD)
    #[clap(long)]
    start_date: Option<NaiveDate>,

    /// End of the date filter (YYYY-MM-DD)
    #[clap(long)]
    end_date: Option<NaiveDate>,

    /// Skip the date filter entirely
    #[clap(long, conflicts_with_all = ["start_date", "end_date"])]
    no_filter: bool,

    /// How dates are typed into the dashboard controls (chrono format)
    #[clap(long, default_value = DEFAULT_DATE_FORMAT)]
    date_format: String,

    /// Class tokens identifying data elements inside a series
    #[clap(long, default_value = "column setFocusRing")]
    target_class: String,

    /// Extra CSS selector for data elements inside a series (repeatable)
    #[clap(long = "extra-selector")]
    extra_selectors: Vec<String>,

    /// Do not save screenshots and page sources
    #[clap(long)]
    no_snapshots: bool,

    #[clap(flatten)]
    browser: BrowserArgs,

    #[clap(flatten)]
    output: OutputArgs,
}

#[derive(Parser)]
struct ReparseArgs {
    /// Saved page source (HTML)
    #[clap(long)]
    html: PathBuf,

    /// Page number to record the extraction under
    #[clap(long, default_value = "1")]
    page_number: u32,

    /// Class tokens identifying data elements inside a series
    #[clap(long, default_value = "column setFocusRing")]
    target_class: String,

    /// Extra CSS selector for data elements inside a series (repeatable)
    #[clap(long = "extra-selector")]
    extra_selectors: Vec<String>,

    #[clap(flatten)]
    output: OutputArgs,
}

fn extract_options(target_class: String, extra_selectors: Vec<String>) -> ExtractOptions {
    ExtractOptions {
        target_class: ClassPattern::new(target_class),
        extra_selectors,
        ..Default::default()
    }
}

impl ExtractArgs {
    fn date_filters(&self) -> Vec<DateFilter> {
        if self.no_filter {
            return Vec::new();
        }
        match (self.start_date, self.end_date) {
            (None, None) => vec![DateFilter {
                date: DEFAULT_TARGET_DATE,
                role: DateRole::Start,
            }],
            (start, end) => start
                .map(|date| DateFilter {
                    date,
                    role: DateRole::Start,
                })
                .into_iter()
                .chain(end.map(|date| DateFilter {
                    date,
                    role: DateRole::End,
                }))
                .collect(),
        }
    }

    fn run_config(&self) -> RunConfig {
        RunConfig {
            url: self.url.clone(),
            selection: self.pages.clone(),
            max_pages: self.max_pages,
            embed_host: (!self.embed_host.trim().is_empty()).then(|| self.embed_host.trim().to_string()),
            date_filters: self.date_filters(),
            filter: FilterConfig {
                date_format: self.date_format.clone(),
                ..Default::default()
            },
            extract: extract_options(self.target_class.clone(), self.extra_selectors.clone()),
            snapshots: !self.no_snapshots,
            ..Default::default()
        }
    }

    fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            browser_path: self.browser.browser_path.clone(),
            cdp_url: self.browser.cdp_url.clone(),
            headless: self.browser.headless,
            window_size: (self.browser.window_width, self.browser.window_height),
            no_sandbox: self.browser.no_sandbox,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    scrape_common::init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Extract(args) => run_extract(args).await,
        Command::Reparse(args) => run_reparse(args),
    }
}

async fn run_extract(args: ExtractArgs) -> anyhow::Result<ExitCode> {
    let config = args.run_config();
    if let Err(errors) = config.validate() {
        bail!("invalid run configuration: {}", errors);
    }

    let session = launch_session(&args.browser_options())
        .await
        .context("Failed to start browser")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, stopping and saving what was extracted");
            on_signal.cancel();
        }
    });

    let report = DashboardRun::new(session, config).execute_until(cancel).await;

    finish(&args.output, &report)
}

fn run_reparse(args: ReparseArgs) -> anyhow::Result<ExitCode> {
    let html = std::fs::read_to_string(&args.html)
        .with_context(|| format!("Failed to read {}", args.html.display()))?;
    let options = extract_options(args.target_class, args.extra_selectors);

    let outcome = extract_markup(&html, args.page_number, &options);
    let report = RunReport::offline(vec![outcome.value], outcome.notices);

    finish(&args.output, &report)
}

fn finish(output: &OutputArgs, report: &RunReport) -> anyhow::Result<ExitCode> {
    let files = export::write_report(&output.output_dir, &output.prefix, report)
        .context("Failed to write export files")?;

    println!();
    println!("{}", report.summary());
    for notice in &report.notices {
        println!("  ! {}", notice);
    }
    println!();
    println!("{} files written to {}", files.len(), output.output_dir.display());

    if report.is_failure() {
        return Ok(ExitCode::FAILURE);
    }
    if report.interrupted {
        return Ok(ExitCode::from(130));
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_defaults() {
        let cli = Cli::parse_from(["dashboard-scraper", "extract"]);
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        let config = args.run_config();
        assert_eq!(config.selection, PageSelection::All);
        assert_eq!(config.max_pages, 20);
        assert_eq!(config.date_filters.len(), 1);
        assert_eq!(config.date_filters[0].role, DateRole::Start);
        assert!(config.snapshots);
        assert_eq!(config.embed_host.as_deref(), Some("powerbi.com"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_embed_host_disables_discovery() {
        let cli = Cli::parse_from(["dashboard-scraper", "extract", "--embed-host", ""]);
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert!(args.run_config().embed_host.is_none());
    }

    #[test]
    fn test_extract_custom() {
        let cli = Cli::parse_from([
            "dashboard-scraper",
            "extract",
            "--pages",
            "2-4",
            "--end-date",
            "2022-03-31",
            "--extra-selector",
            "rect.bar",
            "--no-snapshots",
        ]);
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        let config = args.run_config();
        assert_eq!(config.selection, PageSelection::Range { first: 2, last: 4 });
        assert_eq!(config.date_filters.len(), 1);
        assert_eq!(config.date_filters[0].role, DateRole::End);
        assert_eq!(config.extract.extra_selectors, vec!["rect.bar"]);
        assert!(!config.snapshots);
    }

    #[test]
    fn test_no_filter() {
        let cli = Cli::parse_from(["dashboard-scraper", "extract", "--no-filter"]);
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert!(args.run_config().date_filters.is_empty());
    }

    #[test]
    fn test_bad_page_selection_rejected() {
        assert!(Cli::try_parse_from(["dashboard-scraper", "extract", "--pages", "0"]).is_err());
    }

    #[test]
    fn test_reparse_args() {
        let cli = Cli::parse_from(["dashboard-scraper", "reparse", "--html", "page.html", "--page-number", "3"]);
        let Command::Reparse(args) = cli.command else {
            panic!("expected reparse");
        };
        assert_eq!(args.html, PathBuf::from("page.html"));
        assert_eq!(args.page_number, 3);
    }
}
