//! Rendering sessions.
//!
//! A [`RenderingSession`] owns the per-exam lifecycle on one surface:
//!
//! ```text
//! mount(exam, surface)
//!     │
//!     ├──▶ attach surface ──▶ Resolving ──▶ StudyArchive::get_study_metadata
//!     │                                          │ first series, first instance
//!     │                                          ▼
//!     │                       Loading ◀── build ImageLocator
//!     │                          │
//!     │                          ▼
//!     │              ImageRenderer::load ──▶ version check ──▶ paint ──▶ Displayed
//!     │
//!     └── any failure ──▶ Error(kind)
//!
//! unmount() ──▶ detach surface ──▶ Idle
//! ```
//!
//! Observe state through [`RenderingSession::subscribe`].

mod lifecycle;
mod state;

pub use lifecycle::RenderingSession;
pub use state::{ExamReference, MountOutcome, SessionState};
