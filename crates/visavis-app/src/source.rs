//! Frame source worker.
//!
//! V4L2 capture is blocking, so the camera lives on its own OS thread.
//! The async side requests snapshots over an mpsc/oneshot pair; the
//! thread exits when the last handle is dropped.

use std::future::Future;

use tokio::sync::{mpsc, oneshot};
use visavis_hw::{Camera, CameraError, Frame};

/// Async view of the live video feed: current dimensions plus a
/// snapshot operation. The capture scheduler is generic over this so
/// tests can feed it synthetic frames.
pub trait SnapshotSource: Send + Sync {
    fn dimensions(&self) -> (u32, u32);
    fn snapshot(&self) -> impl Future<Output = Result<Frame, CameraError>> + Send;
}

struct SnapshotRequest {
    reply: oneshot::Sender<Result<Frame, CameraError>>,
}

/// Clone-safe handle to the camera thread.
#[derive(Clone)]
pub struct CameraHandle {
    tx: mpsc::Sender<SnapshotRequest>,
    width: u32,
    height: u32,
}

/// Open the device and spawn its capture thread. Fails fast if the
/// camera is missing or busy.
pub fn spawn_camera(device_path: &str) -> Result<CameraHandle, CameraError> {
    let camera = Camera::open(device_path)?;
    let (width, height) = (camera.width, camera.height);
    tracing::info!(device = device_path, width, height, "camera worker starting");

    let (tx, mut rx) = mpsc::channel::<SnapshotRequest>(1);

    std::thread::Builder::new()
        .name("visavis-camera".into())
        .spawn(move || {
            while let Some(req) = rx.blocking_recv() {
                let _ = req.reply.send(camera.capture_frame());
            }
            tracing::info!("camera worker exiting");
        })
        .expect("failed to spawn camera thread");

    Ok(CameraHandle { tx, width, height })
}

impl SnapshotSource for CameraHandle {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    async fn snapshot(&self) -> Result<Frame, CameraError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SnapshotRequest { reply: reply_tx })
            .await
            .map_err(|_| CameraError::WorkerGone)?;
        reply_rx.await.map_err(|_| CameraError::WorkerGone)?
    }
}
