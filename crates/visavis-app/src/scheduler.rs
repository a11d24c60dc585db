//! Capture scheduler — periodic sampling with at most one outstanding
//! recognize request.
//!
//! The per-tick pipeline is a plain async method so tests can drive
//! ticks deterministically without real timers; the timer loop on top
//! owns a cancellation token and nothing else.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use visavis_client::RecognitionApi;

use crate::bridge::ChatController;
use crate::session::{ApplyOutcome, SessionState};
use crate::source::SnapshotSource;

/// Why a tick did or did not produce a state change. Dropped ticks are
/// exactly that — dropped, never queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A result came back and drove a transition.
    Applied,
    /// A prior request is still outstanding.
    DroppedBusy,
    /// No active camera session.
    DroppedInactive,
    /// The source produced no usable frame.
    DroppedNoFrame,
    /// The result arrived after its camera session ended.
    DiscardedStale,
    /// Transient network failure; the next tick retries naturally.
    TransportFailed,
}

/// Clears the busy flag when dropped, so a failed or panicked call can
/// never permanently stall the scheduler.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The per-tick pipeline: snapshot, encode, recognize, apply.
pub struct CapturePipeline<S, A> {
    source: S,
    api: Arc<A>,
    session: Arc<Mutex<SessionState>>,
    chat: ChatController,
    busy: Arc<AtomicBool>,
    jpeg_quality: u8,
}

impl<S: SnapshotSource, A: RecognitionApi> CapturePipeline<S, A> {
    pub fn new(
        source: S,
        api: Arc<A>,
        session: Arc<Mutex<SessionState>>,
        chat: ChatController,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            source,
            api,
            session,
            chat,
            busy: Arc::new(AtomicBool::new(false)),
            jpeg_quality,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.source.dimensions()
    }

    /// Run one sampling tick.
    pub async fn tick(&self) -> TickOutcome {
        let Some(epoch) = self.session.lock().await.live_epoch() else {
            return TickOutcome::DroppedInactive;
        };

        // The one shared flag needing mutual exclusion: set before the
        // request is issued, cleared on every resolution path.
        if self.busy.swap(true, Ordering::SeqCst) {
            tracing::debug!("tick dropped: request outstanding");
            return TickOutcome::DroppedBusy;
        }
        let _busy = BusyGuard(Arc::clone(&self.busy));

        let frame = match self.source.snapshot().await {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, "tick dropped: no frame from source");
                return TickOutcome::DroppedNoFrame;
            }
        };
        let image = match frame.to_jpeg_data_url(self.jpeg_quality) {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!(error = %err, "tick dropped: snapshot encoding failed");
                return TickOutcome::DroppedNoFrame;
            }
        };

        let outcome = self.api.recognize(&image).await;

        let applied = {
            let mut session = self.session.lock().await;
            session.apply_result(epoch, &outcome)
        };

        match applied {
            ApplyOutcome::Stale => TickOutcome::DiscardedStale,
            ApplyOutcome::TransportFailed => TickOutcome::TransportFailed,
            ApplyOutcome::Applied(effects) => {
                self.chat.set_visible(effects.chat_visible).await;
                if effects.open_enrollment {
                    tracing::info!("new face detected; enter a name to enroll it");
                }
                TickOutcome::Applied
            }
        }
    }
}

/// Owns the repeating timer: `start` spawns the loop, `stop` cancels
/// it and is idempotent.
#[derive(Default)]
pub struct CaptureScheduler {
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start<S, A>(&mut self, pipeline: Arc<CapturePipeline<S, A>>, interval: Duration)
    where
        S: SnapshotSource + 'static,
        A: RecognitionApi + 'static,
    {
        if self.handle.is_some() {
            tracing::warn!("capture scheduler already running");
            return;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Missed ticks are dropped, not queued.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        pipeline.tick().await;
                    }
                    _ = token.cancelled() => {
                        tracing::info!("capture scheduler shutting down");
                        break;
                    }
                }
            }
        });

        self.cancel = Some(cancel);
        self.handle = Some(handle);
    }

    /// Halt the timer. Safe to call repeatedly; an in-flight recognize
    /// request is not aborted, its late result fails the epoch check.
    pub async fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "capture loop task failed to join");
            }
        }
    }
}

/// Stop capture. Order matters: the camera session ends (killing its
/// epoch) before the loop task is joined, so a recognize call still in
/// flight while we wait resolves into the stale-result check instead
/// of being applied to a session the user already stopped.
pub async fn halt_capture(session: &Arc<Mutex<SessionState>>, scheduler: &mut CaptureScheduler) {
    session.lock().await.stop_camera();
    scheduler.stop().await;
}
