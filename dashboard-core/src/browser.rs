//! Browser launch: one CDP browser, one page, one session.
//!
//! Either launches a local Chrome/Chromium or attaches to a running one via
//! its DevTools URL, then hands back a [`CdpSession`] owning both.

use crate::session::CdpSession;
use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;

/// How to obtain the browser.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Custom Chrome/Edge binary path.
    pub browser_path: Option<String>,
    /// Connect to an already-running browser via CDP URL.
    pub cdp_url: Option<String>,
    /// Run headless (default: true).
    pub headless: bool,
    /// Browser window size.
    pub window_size: (u32, u32),
    /// Pass `--no-sandbox` (needed in most containers).
    pub no_sandbox: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            browser_path: None,
            cdp_url: None,
            headless: true,
            window_size: (1920, 1080),
            no_sandbox: false,
        }
    }
}

/// Launch (or connect to) a browser and open a blank page.
pub async fn launch_session(options: &BrowserOptions) -> Result<CdpSession> {
    let (browser, mut handler) = if let Some(ref cdp_url) = options.cdp_url {
        Browser::connect(cdp_url)
            .await
            .with_context(|| format!("Failed to connect to browser at {}", cdp_url))?
    } else {
        let mut builder = BrowserConfig::builder();

        if let Some(ref path) = options.browser_path {
            builder = builder.chrome_executable(path);
        }

        if !options.headless {
            builder = builder.with_head();
        }

        if options.no_sandbox {
            builder = builder.no_sandbox();
        }

        // Dashboard embeds lay out responsively; a small viewport hides visuals.
        builder = builder
            .window_size(options.window_size.0, options.window_size.1)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-gpu")
            .arg("--remote-allow-origins=*");

        let config = builder.build().map_err(|e| anyhow::anyhow!("{}", e))?;

        Browser::launch(config)
            .await
            .context("Failed to launch browser")?
    };

    let handle = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    let page = browser
        .new_page("about:blank")
        .await
        .context("Failed to create new page")?;

    let session = CdpSession::new(browser, page, handle);
    if let Err(err) = session.capture_network().await {
        tracing::warn!(error = %err, "Network capture unavailable");
    }

    tracing::info!(
        headless = options.headless,
        attached = options.cdp_url.is_some(),
        "Browser session ready"
    );

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = BrowserOptions::default();
        assert!(options.headless);
        assert_eq!(options.window_size, (1920, 1080));
        assert!(options.cdp_url.is_none());
        assert!(!options.no_sandbox);
    }
}
