//! Recognition state machine.
//!
//! One tagged state object replaces the pile of independently mutable
//! UI flags: the current phase, the enrollment modal, and chat
//! visibility are all derived through the transition methods here, so
//! the invariant "chat is visible iff a face is recognized" is
//! mechanically checkable.

use crate::overlay::OverlayPlan;
use crate::types::{Encoding, FaceBox, FrameResult};

/// Where the recognition loop currently stands.
///
/// Transitions are driven solely by the latest [`FrameResult`]; each
/// tick replaces the previous phase unconditionally (no smoothing or
/// hysteresis).
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// No active camera session.
    Idle,
    /// Camera on, no face in frame.
    Scanning,
    /// A face is in frame but the service did not match it.
    FaceUnknown { face_box: FaceBox },
    /// A face is in frame and matched a stored record.
    FaceRecognized { face_box: Option<FaceBox>, name: String },
}

/// Pending enrollment: the encoding captured when the modal opened,
/// paired with whatever name the user has proposed so far.
///
/// At most one draft is live at a time. Once the modal is open the
/// encoding is frozen — later unknown-face results do not replace it,
/// so the user never submits an encoding other than the one that
/// opened the modal.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentDraft {
    pub encoding: Encoding,
    pub proposed_name: String,
}

impl EnrollmentDraft {
    fn new(encoding: Encoding) -> Self {
        Self { encoding, proposed_name: String::new() }
    }
}

/// Side effects the caller must apply after a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TickEffects {
    /// What the overlay renderer should draw for this tick.
    pub overlay: OverlayPlan,
    /// Whether the chat session may exist right now.
    pub chat_visible: bool,
    /// True exactly when this tick should open the enrollment modal.
    pub open_enrollment: bool,
}

impl TickEffects {
    fn quiescent() -> Self {
        Self {
            overlay: OverlayPlan::clear(),
            chat_visible: false,
            open_enrollment: false,
        }
    }
}

/// The single mutable recognition state object.
#[derive(Debug, Default)]
pub struct RecognitionTracker {
    phase: Phase,
    modal: Option<EnrollmentDraft>,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

impl RecognitionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Name shown for the current identity, if one is recognized.
    pub fn display_name(&self) -> Option<&str> {
        match &self.phase {
            Phase::FaceRecognized { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Chat visibility is strictly a function of the current phase.
    pub fn chat_visible(&self) -> bool {
        matches!(self.phase, Phase::FaceRecognized { .. })
    }

    pub fn modal_open(&self) -> bool {
        self.modal.is_some()
    }

    /// The open modal's frozen draft, if any.
    pub fn draft(&self) -> Option<&EnrollmentDraft> {
        self.modal.as_ref()
    }

    /// Record the name the user has typed so far into the open draft.
    pub fn propose_name(&mut self, name: &str) {
        if let Some(draft) = self.modal.as_mut() {
            draft.proposed_name = name.to_string();
        }
    }

    /// Camera came up: leave `Idle`.
    pub fn camera_started(&mut self) {
        self.phase = Phase::Scanning;
    }

    /// Camera stopped: everything resets, including any open modal.
    pub fn camera_stopped(&mut self) {
        self.phase = Phase::Idle;
        self.modal = None;
    }

    /// Apply one frame's recognition result.
    ///
    /// Caller is responsible for liveness: results from a torn-down
    /// camera session must be discarded before reaching here. A result
    /// that does arrive while `Idle` is ignored defensively.
    pub fn observe(&mut self, result: &FrameResult) -> TickEffects {
        if matches!(self.phase, Phase::Idle) {
            return TickEffects::quiescent();
        }

        let Some(face_box) = result.face_box else {
            self.phase = Phase::Scanning;
            return TickEffects::quiescent();
        };

        match (&result.name, result.recognized) {
            (Some(name), true) => {
                // Recognition closes any open enrollment: the draft is
                // discarded, the modal must come down.
                self.modal = None;
                self.phase = Phase::FaceRecognized {
                    face_box: Some(face_box),
                    name: name.clone(),
                };
                TickEffects {
                    overlay: OverlayPlan::labeled(face_box, name.clone()),
                    chat_visible: true,
                    open_enrollment: false,
                }
            }
            _ => {
                self.phase = Phase::FaceUnknown { face_box };
                let open_enrollment = match (&self.modal, &result.encoding) {
                    // Modal already open: draft stays frozen.
                    (Some(_), _) => false,
                    (None, Some(encoding)) if !encoding.is_empty() => {
                        self.modal = Some(EnrollmentDraft::new(encoding.clone()));
                        true
                    }
                    _ => false,
                };
                TickEffects {
                    overlay: OverlayPlan::unlabeled(face_box),
                    chat_visible: false,
                    open_enrollment,
                }
            }
        }
    }

    /// Service-reported error for a tick: treated as "no face", and
    /// chat visibility is force-cleared. The modal, if open, survives.
    pub fn observe_error(&mut self) -> TickEffects {
        if matches!(self.phase, Phase::Idle) {
            return TickEffects::quiescent();
        }
        self.phase = Phase::Scanning;
        TickEffects::quiescent()
    }

    /// Enrollment committed: the displayed identity becomes the saved
    /// name and the modal comes down.
    pub fn enrollment_succeeded(&mut self, name: &str) {
        let face_box = match &self.phase {
            Phase::FaceUnknown { face_box } => Some(*face_box),
            Phase::FaceRecognized { face_box, .. } => *face_box,
            _ => None,
        };
        self.modal = None;
        self.phase = Phase::FaceRecognized { face_box, name: name.to_string() };
    }

    /// Enrollment cancelled: the draft is discarded without touching
    /// the recognition phase.
    pub fn enrollment_cancelled(&mut self) {
        self.modal = None;
    }
}
