//! Per-exam rendering session.
//!
//! The session orchestrates one exam at a time:
//!
//! 1. `mount` binds the surface and bumps the exam version
//! 2. The archive resolves the study; the first image is selected
//! 3. The renderer fetches and decodes it
//! 4. The raster is painted, unless a newer mount or an unmount took over
//!
//! Every suspension point is followed by a version check. A superseded mount
//! never mutates state or paints, whether it succeeded or failed.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::archive::{ImageLocator, StudyArchive};
use crate::error::SessionFailure;
use crate::io::ImageFetcher;
use crate::render::{ImageRenderer, Raster, SurfaceHandle};

use super::state::{ExamReference, MountOutcome, SessionState};

/// Mutable session bookkeeping, guarded by one lock.
#[derive(Default)]
struct SessionInner {
    /// Bumped by every mount and unmount
    version: u64,

    /// Surface bound for the current exam
    surface: Option<SurfaceHandle>,

    exam: Option<ExamReference>,
}

/// Drives one surface through resolve, load and paint for the current exam.
///
/// State changes are published on a `watch` channel; see [`subscribe`].
/// Dropping the session unmounts it.
///
/// [`subscribe`]: RenderingSession::subscribe
pub struct RenderingSession<A: StudyArchive, F: ImageFetcher> {
    archive: A,
    renderer: ImageRenderer<F>,
    inner: Mutex<SessionInner>,
    state: watch::Sender<SessionState>,
}

impl<A: StudyArchive, F: ImageFetcher> RenderingSession<A, F> {
    pub fn new(archive: A, renderer: ImageRenderer<F>) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            archive,
            renderer,
            inner: Mutex::new(SessionInner::default()),
            state,
        }
    }

    pub fn archive(&self) -> &A {
        &self.archive
    }

    pub fn renderer(&self) -> &ImageRenderer<F> {
        &self.renderer
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The most recently mounted exam, until unmount.
    pub fn current_exam(&self) -> Option<ExamReference> {
        self.lock_inner().exam.clone()
    }

    /// Current exam version.
    pub fn version(&self) -> u64 {
        self.lock_inner().version
    }

    fn lock_inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, next: SessionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    // =========================================================================
    // Mount / unmount
    // =========================================================================

    /// Display `exam` on `surface`, superseding any mount in flight.
    ///
    /// Resolves once this mount settles or is superseded. The session state
    /// is the source of truth; the outcome only reports what this call did.
    pub async fn mount(&self, exam: ExamReference, surface: SurfaceHandle) -> MountOutcome {
        let version = match self.begin(exam.clone(), surface) {
            Ok(version) => version,
            Err(outcome) => return outcome,
        };

        info!("Mounting exam {} (version {})", exam, version);

        let locator = match self.resolve(&exam).await {
            Ok(locator) => locator,
            Err(failure) => return self.settle(version, Err(failure)),
        };

        if !self.advance(version, SessionState::Loading) {
            return self.superseded(version, &exam);
        }
        debug!("Loading {} for exam {}", locator, exam.study_id);

        match self.renderer.load(&locator).await {
            Ok(raster) => self.settle(version, Ok(raster)),
            Err(err) => self.settle(version, Err(err.into())),
        }
    }

    /// Release the surface and return to `Idle`.
    ///
    /// Safe to call at any time and any number of times. Any mount in flight
    /// is superseded.
    pub fn unmount(&self) {
        let mut inner = self.lock_inner();
        inner.version += 1;
        inner.exam = None;

        if let Some(surface) = inner.surface.take() {
            self.renderer.detach(&surface);
            info!("Unmounted session, released surface {}", surface.id());
        }

        self.publish(SessionState::Idle);
    }

    /// Bump the version, bind `surface` and enter `Resolving`.
    fn begin(&self, exam: ExamReference, surface: SurfaceHandle) -> Result<u64, MountOutcome> {
        let mut inner = self.lock_inner();
        inner.version += 1;
        let version = inner.version;
        inner.exam = Some(exam);

        if let Some(previous) = inner.surface.take() {
            if previous != surface {
                self.renderer.detach(&previous);
            }
        }

        if let Err(err) = self.renderer.attach(&surface) {
            warn!("Cannot bind surface {}: {}", surface.id(), err);
            let state = SessionState::Error(err.into());
            self.publish(state.clone());
            return Err(MountOutcome::Settled(state));
        }

        inner.surface = Some(surface);
        self.publish(SessionState::Resolving);
        Ok(version)
    }

    /// Resolve the study and build the locator of its first image.
    async fn resolve(&self, exam: &ExamReference) -> Result<ImageLocator, SessionFailure> {
        let metadata = self.archive.get_study_metadata(&exam.study_id).await?;
        let instance = metadata.displayable_instance()?;
        debug!("Selected instance {} of study {}", instance, exam.study_id);
        Ok(self.archive.image_locator(instance))
    }

    /// Move to `next` if `version` is still current.
    fn advance(&self, version: u64, next: SessionState) -> bool {
        let inner = self.lock_inner();
        if inner.version != version {
            return false;
        }
        self.publish(next);
        true
    }

    /// Paint or record the failure, if `version` is still current.
    fn settle(&self, version: u64, result: Result<Raster, SessionFailure>) -> MountOutcome {
        let inner = self.lock_inner();
        if inner.version != version {
            let exam = inner.exam.clone();
            drop(inner);
            return match exam {
                Some(exam) => self.superseded(version, &exam),
                None => {
                    debug!("Dropping result of version {} after unmount", version);
                    MountOutcome::Superseded
                }
            };
        }

        let state = match result.and_then(|raster| {
            self.renderer
                .paint(&raster)
                .map_err(SessionFailure::from)
        }) {
            Ok(()) => {
                info!("Displayed version {}", version);
                SessionState::Displayed
            }
            Err(failure) => {
                warn!("Mount of version {} failed: {}", version, failure);
                SessionState::Error(failure)
            }
        };

        self.publish(state.clone());
        MountOutcome::Settled(state)
    }

    fn superseded(&self, version: u64, current: &ExamReference) -> MountOutcome {
        debug!(
            "Dropping stale result of version {}; now showing {}",
            version, current.study_id
        );
        MountOutcome::Superseded
    }
}

impl<A: StudyArchive, F: ImageFetcher> Drop for RenderingSession<A, F> {
    fn drop(&mut self) {
        self.unmount();
    }
}
