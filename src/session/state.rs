use std::fmt;

use crate::error::{ErrorKind, SessionFailure};

/// The exam a session should display, as supplied by the exam record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExamReference {
    /// Opaque archive key of the study
    pub study_id: String,

    /// Display label of the exam
    pub description: String,
}

impl ExamReference {
    pub fn new(study_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            study_id: study_id.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for ExamReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.study_id)
        } else {
            write!(f, "{} ({})", self.study_id, self.description)
        }
    }
}

/// Observable state of a rendering session.
///
/// ```text
///            mount                 study resolved            painted
/// Idle ─────────────▶ Resolving ─────────────────▶ Loading ───────────▶ Displayed
///  ▲                      │                          │
///  │ unmount              └──────────┬───────────────┘
///  │ (from any state)                ▼
///  └──────────────────────────── Error(failure)
/// ```
///
/// A new mount moves any state back to `Resolving`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Resolving,
    Loading,
    Displayed,
    Error(SessionFailure),
}

impl SessionState {
    pub const fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Resolving => "resolving",
            SessionState::Loading => "loading",
            SessionState::Displayed => "displayed",
            SessionState::Error(_) => "error",
        }
    }

    /// `Displayed` and `Error` are stable until the next mount or unmount.
    pub fn is_settled(&self) -> bool {
        matches!(self, SessionState::Displayed | SessionState::Error(_))
    }

    /// Whether a mount is still in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionState::Resolving | SessionState::Loading)
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            SessionState::Error(failure) => Some(failure.kind),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Error(failure) => write!(f, "error({})", failure),
            other => f.write_str(other.name()),
        }
    }
}

/// How a call to `mount` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// This mount settled the session into the given state
    Settled(SessionState),

    /// A later mount or an unmount took over; this mount's result was dropped
    Superseded,
}

impl MountOutcome {
    pub fn state(&self) -> Option<&SessionState> {
        match self {
            MountOutcome::Settled(state) => Some(state),
            MountOutcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, MountOutcome::Superseded)
    }
}
