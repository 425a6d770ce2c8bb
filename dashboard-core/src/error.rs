//! Error taxonomy and recoverable notices.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failures reported by a browser session or one of its elements.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Another element sits on top of the click target.
    #[error("click intercepted: {0}")]
    ClickIntercepted(String),

    /// The element handle no longer points into the live document.
    #[error("stale element: {0}")]
    StaleElement(String),

    /// A script threw or returned something unusable.
    #[error("script failed: {0}")]
    Script(String),

    /// The browser connection itself failed (crash, closed socket, detached target).
    #[error("browser transport failure: {0}")]
    Transport(String),
}

impl SessionError {
    /// Transport failures cannot be recovered from within a run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Transport(_))
    }
}

/// Errors raised by the synchronization and extraction engine.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    #[error("no control matched any locator for {control}")]
    ControlNotFound { control: String },

    #[error("control value mismatch after all attempts: expected {expected:?}, got {actual:?}")]
    VerificationFailed { expected: String, actual: String },

    #[error("readiness probes missed: {}", missed.join(", "))]
    StabilizationTimeout { missed: Vec<String> },

    #[error("could not advance to page {page}: {reason}")]
    NavigationFailed { page: u32, reason: String },

    #[error("session fault: {0}")]
    SessionFault(SessionError),

    #[error("run interrupted")]
    Interrupted,
}

impl ExtractError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExtractError::SessionFault(_))
    }
}

/// Raise fatal session errors, hand the rest back for local handling.
pub(crate) fn escalate(err: SessionError) -> Result<SessionError, ExtractError> {
    if err.is_fatal() {
        Err(ExtractError::SessionFault(err))
    } else {
        Ok(err)
    }
}

/// Run phase a notice was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Readiness,
    Embed,
    Filter,
    Pagination,
    Extraction,
    Snapshot,
    Session,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Readiness => "readiness",
            Stage::Embed => "embed",
            Stage::Filter => "filter",
            Stage::Pagination => "pagination",
            Stage::Extraction => "extraction",
            Stage::Snapshot => "snapshot",
            Stage::Session => "session",
        };
        f.write_str(name)
    }
}

/// A recoverable problem: something was skipped, the run carried on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub stage: Stage,
    pub page: Option<u32>,
    pub message: String,
}

impl Notice {
    pub fn new(stage: Stage, page: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            stage,
            page,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(page) => write!(f, "[{} p{}] {}", self.stage, page, self.message),
            None => write!(f, "[{}] {}", self.stage, self.message),
        }
    }
}

/// A value plus whatever was skipped while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub notices: Vec<Notice>,
}

impl<T> Outcome<T> {
    pub fn with_notices(value: T, notices: Vec<Notice>) -> Self {
        Self { value, notices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_is_fatal() {
        assert!(SessionError::Transport("ws closed".into()).is_fatal());
        assert!(!SessionError::ClickIntercepted("overlay".into()).is_fatal());
        assert!(!SessionError::Script("TypeError".into()).is_fatal());
        assert!(!SessionError::StaleElement("node 4".into()).is_fatal());
    }

    #[test]
    fn test_escalate() {
        let kept = escalate(SessionError::Script("boom".into())).unwrap();
        assert!(matches!(kept, SessionError::Script(_)));

        let raised = escalate(SessionError::Transport("gone".into())).unwrap_err();
        assert!(raised.is_fatal());
    }

    #[test]
    fn test_notice_display() {
        let n = Notice::new(Stage::Pagination, Some(3), "next control missing");
        assert_eq!(n.to_string(), "[pagination p3] next control missing");

        let n = Notice::new(Stage::Filter, None, "date input not found");
        assert_eq!(n.to_string(), "[filter] date input not found");
    }

    #[test]
    fn test_stabilization_message_lists_probes() {
        let err = ExtractError::StabilizationTimeout {
            missed: vec!["svg".into(), "data labels".into()],
        };
        assert_eq!(err.to_string(), "readiness probes missed: svg, data labels");
    }
}
