//! Render-readiness detection.
//!
//! Embedded dashboards never announce that rendering finished, so readiness
//! is inferred from an ordered list of presence probes sharing one time
//! budget, followed by an unconditional settle delay. A probe that never
//! matches is logged and skipped: a page without charts is still ready.

use crate::error::{escalate, ExtractError};
use crate::session::{Locator, Session};
use std::time::Duration;
use tokio::time::{sleep, Instant};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct Probe {
    pub description: String,
    pub locator: Locator,
    pub timeout: Duration,
}

impl Probe {
    pub fn new(description: &str, locator: Locator, timeout: Duration) -> Self {
        Self {
            description: description.to_string(),
            locator,
            timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    /// Budget shared by all probes.
    pub timeout: Duration,
    /// Sleep after the probes, for async work that leaves no DOM trace.
    pub settle: Duration,
    pub poll_interval: Duration,
    pub probes: Vec<Probe>,
}

impl ReadinessConfig {
    /// Probes for the first load of the embed.
    pub fn initial_load() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            settle: Duration::from_secs(10),
            poll_interval: DEFAULT_POLL_INTERVAL,
            probes: vec![
                Probe::new("body present", Locator::css("body"), Duration::from_secs(5)),
                Probe::new(
                    "embed element",
                    Locator::css("[class*='embed'], [class*='iframe']"),
                    Duration::from_secs(10),
                ),
                Probe::new(
                    "visual containers",
                    Locator::css("[class*='visual'], [class*='Visual']"),
                    Duration::from_secs(15),
                ),
                Probe::new("svg charts", Locator::css("svg"), Duration::from_secs(10)),
                Probe::new(
                    "data labels",
                    Locator::css("[class*='label'], [class*='value']"),
                    Duration::from_secs(10),
                ),
            ],
        }
    }

    /// Probes after switching dashboard pages.
    pub fn page_transition() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            settle: Duration::ZERO,
            poll_interval: DEFAULT_POLL_INTERVAL,
            probes: vec![Probe::new(
                "page content",
                Locator::css("[class*='visual'], svg, table"),
                Duration::from_secs(15),
            )],
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self::initial_load()
    }
}

/// Which probes matched. Diagnostic only; callers proceed either way.
#[derive(Debug, Clone, Default)]
pub struct ReadinessReport {
    pub satisfied: Vec<String>,
    pub missed: Vec<String>,
    pub elapsed: Duration,
}

impl ReadinessReport {
    pub fn fully_ready(&self) -> bool {
        self.missed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ReadinessDetector {
    config: ReadinessConfig,
}

impl ReadinessDetector {
    pub fn new(config: ReadinessConfig) -> Self {
        Self { config }
    }

    /// Run every probe, then settle. Returns within `timeout + settle`
    /// (plus at most one poll step); only transport failures are errors.
    pub async fn wait<S: Session>(&self, session: &S) -> Result<ReadinessReport, ExtractError> {
        let start = Instant::now();
        let mut report = ReadinessReport::default();

        for probe in &self.config.probes {
            let remaining = self.config.timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                tracing::debug!(probe = %probe.description, "No budget left, skipping probe");
                report.missed.push(probe.description.clone());
                continue;
            }

            let budget = probe.timeout.min(remaining);
            if self.poll(session, &probe.locator, budget).await? {
                tracing::debug!(probe = %probe.description, "Probe satisfied");
                report.satisfied.push(probe.description.clone());
            } else {
                tracing::debug!(probe = %probe.description, ?budget, "Probe timed out");
                report.missed.push(probe.description.clone());
            }
        }

        if !report.missed.is_empty() {
            let err = ExtractError::StabilizationTimeout {
                missed: report.missed.clone(),
            };
            tracing::warn!(error = %err, "Proceeding without full readiness");
        }

        sleep(self.config.settle).await;
        report.elapsed = start.elapsed();

        tracing::info!(
            satisfied = report.satisfied.len(),
            missed = report.missed.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Readiness wait finished"
        );

        Ok(report)
    }

    async fn poll<S: Session>(
        &self,
        session: &S,
        locator: &Locator,
        budget: Duration,
    ) -> Result<bool, ExtractError> {
        let start = Instant::now();
        loop {
            match session.find(locator).await {
                Ok(found) if !found.is_empty() => return Ok(true),
                Ok(_) => {}
                Err(err) => {
                    let err = escalate(err)?;
                    tracing::debug!(%locator, error = %err, "Probe lookup failed");
                }
            }

            let waited = start.elapsed();
            if waited >= budget {
                return Ok(false);
            }
            sleep(self.config.poll_interval.min(budget - waited)).await;
        }
    }
}
