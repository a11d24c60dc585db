//! visavis-core — Pure recognition and chat logic.
//!
//! Holds the recognition state machine, overlay planning, the chat
//! session log, and the gateway wire protocol. No I/O lives here, so
//! everything is testable without a camera, a network, or timers.

pub mod chat;
pub mod overlay;
pub mod protocol;
pub mod state;
pub mod types;

pub use state::{RecognitionTracker, TickEffects};
pub use types::{Encoding, FaceBox, FaceRecord, FrameResult};
