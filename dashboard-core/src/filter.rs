//! Date-range filter control.
//!
//! Typing into a dashboard date input does not reliably reach the widget's
//! reactive state, so every write is followed by synthesized DOM events and a
//! read-back. A mismatch triggers a second write through the native value
//! setter with a wider event set.

use crate::error::{escalate, ExtractError, SessionError};
use crate::session::{Element, Locator, Session};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const WRITE_EVENTS: &[&str] = &["input", "change", "blur"];
const FALLBACK_EVENTS: &[&str] = &["focus", "keydown", "keypress", "input", "keyup", "change", "blur"];

pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

/// 2021-10-01, written as `01/10/2021` with the default format.
pub const DEFAULT_TARGET_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2021, 10, 1) {
    Some(date) => date,
    None => panic!("invalid default target date"),
};

/// Which end of the date range a control edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRole {
    Start,
    End,
}

impl fmt::Display for DateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateRole::Start => f.write_str("start"),
            DateRole::End => f.write_str("end"),
        }
    }
}

/// One date to apply before extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFilter {
    pub date: NaiveDate,
    pub role: DateRole,
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub date_format: String,
    pub start_locators: Vec<Locator>,
    pub end_locators: Vec<Locator>,
    /// Wait after a verified write, for the dashboard to recompute.
    pub settle: Duration,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            start_locators: vec![
                Locator::css("input[aria-label*='Start date']"),
                Locator::css("input[aria-label*='Data inicial']"),
                Locator::css("input[aria-label*='início']"),
                Locator::css("input[placeholder*='Start']"),
                Locator::xpath("(//input[contains(@class, 'date')])[1]"),
            ],
            end_locators: vec![
                Locator::css("input[aria-label*='End date']"),
                Locator::css("input[aria-label*='Data final']"),
                Locator::css("input[aria-label*='fim']"),
                Locator::css("input[placeholder*='End']"),
                Locator::xpath("(//input[contains(@class, 'date')])[last()]"),
            ],
            settle: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterController {
    config: FilterConfig,
}

impl FilterController {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn format_date(&self, date: NaiveDate) -> String {
        date.format(&self.config.date_format).to_string()
    }

    /// Write `target_date` into the control for `role` and verify it stuck.
    ///
    /// `Ok(false)` means the control exists but refused the value after both
    /// the typed and the scripted write; the caller continues degraded.
    pub async fn apply_date_filter<S: Session>(
        &self,
        session: &S,
        target_date: NaiveDate,
        role: DateRole,
    ) -> Result<bool, ExtractError> {
        let expected = self.format_date(target_date);
        let control = self.locate(session, role).await?;

        tracing::info!(%role, value = %expected, "Applying date filter");

        if let Err(err) = self.typed_write(&control, &expected).await {
            let err = escalate(err)?;
            tracing::debug!(error = %err, "Typed write failed, trying scripted write");
        }
        let actual = read_value(&control).await?;
        if actual == expected {
            tracing::info!(%role, "Date filter accepted");
            return Ok(true);
        }

        tracing::warn!(%role, expected = %expected, actual = %actual, "Read-back mismatch, retrying via script");

        if let Err(err) = self.scripted_write(&control, &expected).await {
            let err = escalate(err)?;
            tracing::debug!(error = %err, "Scripted write failed");
        }
        let actual = read_value(&control).await?;
        if actual == expected {
            tracing::info!(%role, "Date filter accepted after scripted write");
            return Ok(true);
        }

        let err = ExtractError::VerificationFailed { expected, actual };
        tracing::warn!(%role, error = %err, "Date filter not applied");
        Ok(false)
    }

    async fn locate<S: Session>(&self, session: &S, role: DateRole) -> Result<S::Element, ExtractError> {
        let locators = match role {
            DateRole::Start => &self.config.start_locators,
            DateRole::End => &self.config.end_locators,
        };

        for locator in locators {
            match session.find(locator).await {
                Ok(found) => {
                    if let Some(element) = found.into_iter().next() {
                        tracing::debug!(%role, %locator, "Date control located");
                        return Ok(element);
                    }
                }
                Err(err) => {
                    let err = escalate(err)?;
                    tracing::debug!(%locator, error = %err, "Date locator failed");
                }
            }
        }

        Err(ExtractError::ControlNotFound {
            control: format!("{} date input", role),
        })
    }

    async fn typed_write<E: Element>(&self, control: &E, value: &str) -> Result<(), SessionError> {
        control.scroll_into_view().await?;
        control.clear().await?;
        control.type_text(value).await?;
        control.dispatch_events(WRITE_EVENTS).await
    }

    async fn scripted_write<E: Element>(&self, control: &E, value: &str) -> Result<(), SessionError> {
        control.assign_value(value).await?;
        control.dispatch_events(FALLBACK_EVENTS).await
    }
}

impl Default for FilterController {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

async fn read_value<E: Element>(control: &E) -> Result<String, ExtractError> {
    match control.property("value").await {
        Ok(value) => Ok(value.unwrap_or_default()),
        Err(err) => {
            let err = escalate(err)?;
            tracing::debug!(error = %err, "Could not read control value");
            Ok(String::new())
        }
    }
}
