//! Enrollment flow — naming an unknown face and committing it.
//!
//! The modal itself is tracker state (`RecognitionTracker::modal_open`);
//! this module implements the submit/cancel operations against it.

use std::sync::Arc;

use tokio::sync::Mutex;
use visavis_client::RecognitionApi;

use crate::session::{refresh_faces, SessionState};

#[derive(Debug, PartialEq)]
pub enum EnrollOutcome {
    /// Face stored; the modal is closed and the identity updated.
    Saved { name: String },
    /// Blank names never leave the client: no request is sent and the
    /// modal stays open.
    RejectedBlankName,
    /// There is no open enrollment modal to submit.
    NoDraftOpen,
    /// The save did not go through; the modal stays open so the user
    /// can retry. Non-fatal.
    Failed(String),
}

/// Submit a name for the open draft.
pub async fn submit<A: RecognitionApi>(
    api: &A,
    session: &Arc<Mutex<SessionState>>,
    name: &str,
) -> EnrollOutcome {
    let name = name.trim();
    if name.is_empty() {
        return EnrollOutcome::RejectedBlankName;
    }

    // Clone the frozen encoding out; the draft itself stays open until
    // the save succeeds.
    let encoding = {
        let mut state = session.lock().await;
        let Some(draft) = state.tracker.draft() else {
            return EnrollOutcome::NoDraftOpen;
        };
        let encoding = draft.encoding.clone();
        state.tracker.propose_name(name);
        encoding
    };

    match api.save_face(name, &encoding).await {
        Ok(true) => {
            session.lock().await.tracker.enrollment_succeeded(name);
            tracing::info!(name, "face enrolled");
            refresh_faces(api, session).await;
            EnrollOutcome::Saved { name: name.to_string() }
        }
        Ok(false) => {
            tracing::warn!(name, "service declined to save face");
            EnrollOutcome::Failed("service declined to save face".into())
        }
        Err(err) => {
            tracing::warn!(name, error = %err, "face save failed");
            EnrollOutcome::Failed(err.to_string())
        }
    }
}

/// Close the modal and discard the draft without contacting the service.
pub async fn cancel(session: &Arc<Mutex<SessionState>>) {
    let mut state = session.lock().await;
    if state.tracker.modal_open() {
        state.tracker.enrollment_cancelled();
        tracing::info!("enrollment cancelled");
    }
}
