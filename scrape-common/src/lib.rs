//! Shared CLI plumbing for the dashboard scraper binaries.
//!
//! Binaries flatten [`BrowserArgs`] and [`OutputArgs`] into their own argument
//! structs and call [`init_logging`] once at startup.

use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Browser launch arguments shared across subcommands.
#[derive(Debug, Clone, clap::Args)]
pub struct BrowserArgs {
    /// Custom Chrome/Edge binary path
    #[clap(long)]
    pub browser_path: Option<String>,

    /// Connect to already-running browser via CDP URL
    #[clap(long)]
    pub cdp_url: Option<String>,

    /// Run browser in headless mode
    #[clap(long, default_value = "true", action = clap::ArgAction::Set)]
    pub headless: bool,

    /// Browser window width in pixels
    #[clap(long, default_value = "1920")]
    pub window_width: u32,

    /// Browser window height in pixels
    #[clap(long, default_value = "1080")]
    pub window_height: u32,

    /// Launch Chrome with --no-sandbox (containers)
    #[clap(long)]
    pub no_sandbox: bool,
}

/// Where extracted files are written.
#[derive(Debug, Clone, clap::Args)]
pub struct OutputArgs {
    /// Output folder for extracted files
    #[clap(long, default_value = "extracao_powerbi")]
    pub output_dir: PathBuf,

    /// File name prefix for every written file
    #[clap(long, default_value = "dashboard")]
    pub prefix: String,
}

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`; defaults to `info`.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
