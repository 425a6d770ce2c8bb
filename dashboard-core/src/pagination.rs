//! Page selection and the next-page walker.
//!
//! Dashboard pages are only reachable sequentially through a "next" control,
//! so the walker is a small state machine: it knows which page is on screen,
//! whether the selection still wants something beyond it, and how to move one
//! step forward.

use crate::error::{escalate, ExtractError};
use crate::readiness::{ReadinessConfig, ReadinessDetector};
use crate::session::{Element, Locator, Session};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("empty page selection")]
    Empty,

    #[error("invalid page number {0:?}")]
    InvalidNumber(String),

    #[error("page numbers start at 1")]
    Zero,

    #[error("range {first}-{last} runs backwards")]
    Backwards { first: u32, last: u32 },
}

/// Which dashboard pages to extract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSelection {
    #[default]
    All,
    Specific(BTreeSet<u32>),
    Range { first: u32, last: u32 },
}

impl PageSelection {
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Specific(pages) => pages.contains(&page),
            PageSelection::Range { first, last } => (*first..=*last).contains(&page),
        }
    }

    /// Whether any selected page lies after `page`.
    pub fn wants_beyond(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Specific(pages) => pages.range(page.saturating_add(1)..).next().is_some(),
            PageSelection::Range { last, .. } => *last > page,
        }
    }

    /// Accepts `all`, a comma list (`1,3,5`) or an inclusive range (`2-4`).
    pub fn parse(input: &str) -> Result<Self, SelectionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SelectionError::Empty);
        }
        if input.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        if let Some((first, last)) = input.split_once('-') {
            let first = parse_page(first)?;
            let last = parse_page(last)?;
            if first > last {
                return Err(SelectionError::Backwards { first, last });
            }
            return Ok(PageSelection::Range { first, last });
        }

        let pages = input
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(parse_page)
            .collect::<Result<BTreeSet<_>, _>>()?;
        if pages.is_empty() {
            return Err(SelectionError::Empty);
        }
        Ok(PageSelection::Specific(pages))
    }

    pub fn validate(&self) -> Result<(), SelectionError> {
        match self {
            PageSelection::All => Ok(()),
            PageSelection::Specific(pages) if pages.is_empty() => Err(SelectionError::Empty),
            PageSelection::Specific(pages) if pages.contains(&0) => Err(SelectionError::Zero),
            PageSelection::Specific(_) => Ok(()),
            PageSelection::Range { first: 0, .. } => Err(SelectionError::Zero),
            PageSelection::Range { first, last } if first > last => Err(SelectionError::Backwards {
                first: *first,
                last: *last,
            }),
            PageSelection::Range { .. } => Ok(()),
        }
    }
}

fn parse_page(part: &str) -> Result<u32, SelectionError> {
    let part = part.trim();
    let page: u32 = part
        .parse()
        .map_err(|_| SelectionError::InvalidNumber(part.to_string()))?;
    if page == 0 {
        return Err(SelectionError::Zero);
    }
    Ok(page)
}

impl FromStr for PageSelection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSelection::All => f.write_str("all"),
            PageSelection::Specific(pages) => {
                let list: Vec<String> = pages.iter().map(u32::to_string).collect();
                f.write_str(&list.join(","))
            }
            PageSelection::Range { first, last } => write!(f, "{}-{}", first, last),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkerState {
    AtPage(u32),
    Advancing,
    Exhausted,
}

/// Why the walker stopped.
#[derive(Debug, Clone)]
pub enum ExhaustReason {
    /// Nothing selected lies beyond the current page.
    PolicySatisfied,
    /// `max_pages` reached.
    CapReached,
    /// No enabled next control on screen.
    LastPage,
    Failed(ExtractError),
}

impl fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExhaustReason::PolicySatisfied => f.write_str("selection satisfied"),
            ExhaustReason::CapReached => f.write_str("page cap reached"),
            ExhaustReason::LastPage => f.write_str("no enabled next control"),
            ExhaustReason::Failed(err) => write!(f, "{}", err),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Advance {
    Moved(u32),
    Exhausted(ExhaustReason),
}

#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// Tried in order; the first enabled match is used.
    pub next_locators: Vec<Locator>,
    pub click_pause: Duration,
    pub transition_delay: Duration,
    pub readiness: ReadinessConfig,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            next_locators: vec![
                Locator::css("button[aria-label='Próxima Página']"),
                Locator::xpath("//button[contains(@aria-label, 'Próxima')]"),
                Locator::css("button[aria-label='Next Page']"),
                Locator::xpath("//button[contains(@aria-label, 'Next')]"),
                Locator::xpath("//i[contains(@class, 'chevronrightmedium')]/.."),
                Locator::xpath("//button[contains(@class, 'navigation')]//i[contains(@class, 'chevron')]/.."),
            ],
            click_pause: Duration::from_millis(500),
            transition_delay: Duration::from_secs(5),
            readiness: ReadinessConfig::page_transition(),
        }
    }
}

pub struct PaginationWalker {
    config: PaginationConfig,
    selection: PageSelection,
    max_pages: u32,
    state: WalkerState,
    current: u32,
}

impl PaginationWalker {
    pub fn new(config: PaginationConfig, selection: PageSelection, max_pages: u32) -> Self {
        Self {
            config,
            selection,
            max_pages,
            state: WalkerState::AtPage(1),
            current: 1,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current
    }

    pub fn state(&self) -> WalkerState {
        self.state
    }

    /// Whether the page on screen should be extracted.
    pub fn should_extract(&self) -> bool {
        matches!(self.state, WalkerState::AtPage(_)) && self.selection.includes(self.current)
    }

    pub fn wants_more(&self) -> bool {
        matches!(self.state, WalkerState::AtPage(_))
            && self.current < self.max_pages
            && self.selection.wants_beyond(self.current)
    }

    /// Move one page forward, or explain why not.
    ///
    /// A `SessionFault` is returned as an error; every other failure leaves
    /// the walker exhausted.
    pub async fn advance<S: Session>(&mut self, session: &S) -> Result<Advance, ExtractError> {
        if self.state == WalkerState::Exhausted {
            return Ok(Advance::Exhausted(ExhaustReason::PolicySatisfied));
        }
        if !self.selection.wants_beyond(self.current) {
            return Ok(self.exhaust(ExhaustReason::PolicySatisfied));
        }
        if self.current >= self.max_pages {
            tracing::info!(max_pages = self.max_pages, "Page cap reached");
            return Ok(self.exhaust(ExhaustReason::CapReached));
        }

        self.state = WalkerState::Advancing;
        let target = self.current + 1;

        let control = match self.find_next(session).await {
            Ok(Some(control)) => control,
            Ok(None) => {
                tracing::info!(page = self.current, "No enabled next control, last page reached");
                return Ok(self.exhaust(ExhaustReason::LastPage));
            }
            Err(err) => {
                self.state = WalkerState::Exhausted;
                return Err(err);
            }
        };

        match self.activate(&control, target).await {
            Ok(()) => {}
            Err(err) if err.is_fatal() => {
                self.state = WalkerState::Exhausted;
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(page = target, error = %err, "Could not advance");
                return Ok(self.exhaust(ExhaustReason::Failed(err)));
            }
        }

        sleep(self.config.transition_delay).await;
        if let Err(err) = ReadinessDetector::new(self.config.readiness.clone())
            .wait(session)
            .await
        {
            self.state = WalkerState::Exhausted;
            return Err(err);
        }

        self.current = target;
        self.state = WalkerState::AtPage(target);
        tracing::info!(page = target, "Advanced to page");
        Ok(Advance::Moved(target))
    }

    fn exhaust(&mut self, reason: ExhaustReason) -> Advance {
        self.state = WalkerState::Exhausted;
        Advance::Exhausted(reason)
    }

    async fn find_next<S: Session>(&self, session: &S) -> Result<Option<S::Element>, ExtractError> {
        for locator in &self.config.next_locators {
            let found = match session.find(locator).await {
                Ok(found) => found,
                Err(err) => {
                    let err = escalate(err)?;
                    tracing::debug!(%locator, error = %err, "Next locator failed");
                    continue;
                }
            };
            for element in found {
                if is_enabled(&element).await? {
                    tracing::debug!(%locator, "Next control located");
                    return Ok(Some(element));
                }
                tracing::debug!(%locator, "Skipping disabled next control");
            }
        }
        Ok(None)
    }

    async fn activate<E: Element>(&self, control: &E, target: u32) -> Result<(), ExtractError> {
        if let Err(err) = control.scroll_into_view().await {
            let err = escalate(err)?;
            tracing::debug!(error = %err, "Scroll to next control failed");
        }
        sleep(self.config.click_pause).await;

        let click_err = match control.click().await {
            Ok(()) => return Ok(()),
            Err(err) => escalate(err)?,
        };
        tracing::debug!(error = %click_err, "Direct click failed, activating programmatically");

        match control.activate().await {
            Ok(()) => Ok(()),
            Err(err) => {
                let err = escalate(err)?;
                Err(ExtractError::NavigationFailed {
                    page: target,
                    reason: format!("{}; then {}", click_err, err),
                })
            }
        }
    }
}

/// `disabled` is a boolean attribute: present means disabled, whatever its value.
async fn is_enabled<E: Element>(element: &E) -> Result<bool, ExtractError> {
    for name in ["disabled", "aria-disabled"] {
        match element.attribute(name).await {
            Ok(None) => {}
            Ok(Some(_)) if name == "disabled" => return Ok(false),
            Ok(Some(value)) => {
                if value.eq_ignore_ascii_case("true") {
                    return Ok(false);
                }
            }
            Err(err) => {
                let err = escalate(err)?;
                tracing::debug!(attribute = name, error = %err, "Attribute read failed");
            }
        }
    }
    Ok(true)
}
