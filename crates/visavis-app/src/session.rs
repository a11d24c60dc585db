//! Camera session and shared orchestration state.
//!
//! One `SessionState` lives behind a mutex and is touched by the
//! capture scheduler, the enrollment flow, and the console loop. The
//! camera session carries an epoch so results from a torn-down session
//! are detected and discarded instead of mutating fresh state.

use std::sync::Arc;

use tokio::sync::Mutex;
use visavis_client::{ClientError, RecognitionApi};
use visavis_core::overlay::{self, DrawCommand};
use visavis_core::state::TickEffects;
use visavis_core::{FaceRecord, FrameResult, RecognitionTracker};

/// The one active camera session, if any.
#[derive(Debug, Clone, Copy)]
pub struct ActiveCamera {
    pub width: u32,
    pub height: u32,
    /// Generation counter: a recognize result is applied only if the
    /// epoch that issued it is still live.
    pub epoch: u64,
}

/// What applying a resolved recognize call did.
#[derive(Debug)]
pub enum ApplyOutcome {
    /// The result drove a state transition.
    Applied(TickEffects),
    /// The issuing camera session is gone; the result was discarded.
    Stale,
    /// Transient transport failure: logged, nothing changed.
    TransportFailed,
}

#[derive(Default)]
pub struct SessionState {
    camera: Option<ActiveCamera>,
    next_epoch: u64,
    pub tracker: RecognitionTracker,
    /// Read-only cache of the service's stored faces.
    pub faces: Vec<FaceRecord>,
    last_overlay: Vec<DrawCommand>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a camera session. Only one may be active: a second start
    /// is a no-op that returns the live epoch.
    pub fn start_camera(&mut self, width: u32, height: u32) -> u64 {
        if let Some(camera) = &self.camera {
            tracing::warn!(epoch = camera.epoch, "camera session already active");
            return camera.epoch;
        }
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        self.camera = Some(ActiveCamera { width, height, epoch });
        self.tracker.camera_started();
        tracing::info!(width, height, epoch, "camera session started");
        epoch
    }

    /// End the camera session and reset recognition to `Idle`. The
    /// scheduler timer is halted by the caller; an in-flight request
    /// is not aborted — its late result fails the epoch check.
    pub fn stop_camera(&mut self) {
        if self.camera.take().is_some() {
            tracing::info!("camera session stopped");
        }
        self.tracker.camera_stopped();
        self.last_overlay = overlay::render(&overlay::OverlayPlan::clear());
    }

    pub fn camera(&self) -> Option<&ActiveCamera> {
        self.camera.as_ref()
    }

    pub fn live_epoch(&self) -> Option<u64> {
        self.camera.as_ref().map(|c| c.epoch)
    }

    pub fn is_live(&self, epoch: u64) -> bool {
        self.live_epoch() == Some(epoch)
    }

    /// Drawing commands for the current overlay surface.
    pub fn overlay(&self) -> &[DrawCommand] {
        &self.last_overlay
    }

    /// Apply a resolved recognize call issued under `epoch`.
    pub fn apply_result(
        &mut self,
        epoch: u64,
        outcome: &Result<FrameResult, ClientError>,
    ) -> ApplyOutcome {
        if !self.is_live(epoch) {
            tracing::debug!(epoch, "discarding result from stale camera session");
            return ApplyOutcome::Stale;
        }

        let effects = match outcome {
            Ok(result) => self.tracker.observe(result),
            Err(err) if err.is_transient() => {
                tracing::warn!(error = %err, "recognize failed; no result this tick");
                return ApplyOutcome::TransportFailed;
            }
            Err(err) => {
                tracing::warn!(error = %err, "service rejected frame");
                self.tracker.observe_error()
            }
        };

        self.last_overlay = overlay::render(&effects.overlay);
        ApplyOutcome::Applied(effects)
    }
}

/// Refresh the cached face list from the service. Failures keep the
/// previous cache.
pub async fn refresh_faces<A: RecognitionApi>(api: &A, session: &Arc<Mutex<SessionState>>) {
    match api.list_faces().await {
        Ok(faces) => {
            session.lock().await.faces = faces;
        }
        Err(err) => tracing::warn!(error = %err, "face list refresh failed"),
    }
}

/// Delete a stored face and refresh the cache on success.
pub async fn delete_face<A: RecognitionApi>(
    api: &A,
    session: &Arc<Mutex<SessionState>>,
    id: i64,
) -> Result<bool, ClientError> {
    let deleted = api.delete_face(id).await?;
    if deleted {
        refresh_faces(api, session).await;
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{recognized_result, ScriptedApi};
    use visavis_core::overlay::DrawCommand;
    use visavis_core::state::Phase;

    #[test]
    fn test_single_camera_session() {
        let mut state = SessionState::new();
        let first = state.start_camera(640, 480);
        let second = state.start_camera(640, 480);
        assert_eq!(first, second);
        assert_eq!(state.live_epoch(), Some(first));
    }

    #[test]
    fn test_epochs_never_repeat_across_sessions() {
        let mut state = SessionState::new();
        let first = state.start_camera(640, 480);
        state.stop_camera();
        let second = state.start_camera(640, 480);
        assert_ne!(first, second);
        assert!(!state.is_live(first));
    }

    #[test]
    fn test_stale_result_discarded() {
        let mut state = SessionState::new();
        let epoch = state.start_camera(640, 480);
        state.stop_camera();

        let outcome = state.apply_result(epoch, &Ok(recognized_result("Ana")));
        assert!(matches!(outcome, ApplyOutcome::Stale));
        assert_eq!(state.tracker.phase(), &Phase::Idle);
        assert!(!state.tracker.chat_visible());
        assert_eq!(state.overlay(), &[DrawCommand::Clear]);
    }

    #[test]
    fn test_applied_result_renders_overlay() {
        let mut state = SessionState::new();
        let epoch = state.start_camera(640, 480);

        let outcome = state.apply_result(epoch, &Ok(recognized_result("Ana")));
        let ApplyOutcome::Applied(effects) = outcome else {
            panic!("expected applied outcome");
        };
        assert!(effects.chat_visible);
        assert_eq!(state.overlay().len(), 3); // clear, green box, label
    }

    #[test]
    fn test_transport_failure_leaves_state_untouched() {
        let mut state = SessionState::new();
        let epoch = state.start_camera(640, 480);
        state.apply_result(epoch, &Ok(recognized_result("Ana")));

        let overlay_before = state.overlay().to_vec();
        let outcome = state.apply_result(epoch, &Err(ScriptedApi::transport_error()));
        assert!(matches!(outcome, ApplyOutcome::TransportFailed));
        assert!(state.tracker.chat_visible());
        assert_eq!(state.overlay(), overlay_before.as_slice());
    }

    #[test]
    fn test_service_error_clears_overlay_and_chat() {
        let mut state = SessionState::new();
        let epoch = state.start_camera(640, 480);
        state.apply_result(epoch, &Ok(recognized_result("Ana")));

        let err = ClientError::Service { status: 400, message: "No face detected".into() };
        let outcome = state.apply_result(epoch, &Err(err));
        let ApplyOutcome::Applied(effects) = outcome else {
            panic!("expected applied outcome");
        };
        assert!(!effects.chat_visible);
        assert_eq!(state.overlay(), &[DrawCommand::Clear]);
    }
}
