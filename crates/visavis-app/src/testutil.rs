//! Shared test doubles for the orchestration layer: synthetic frame
//! sources and scripted recognition services.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use visavis_client::{ClientError, RecognitionApi};
use visavis_core::{Encoding, FaceBox, FaceRecord, FrameResult};
use visavis_hw::{CameraError, Frame};

use crate::source::SnapshotSource;

pub fn recognized_result(name: &str) -> FrameResult {
    FrameResult {
        face_box: Some(FaceBox { x: 10, y: 10, width: 50, height: 50 }),
        recognized: true,
        name: Some(name.to_string()),
        encoding: None,
    }
}

pub fn unknown_result(encoding: &str) -> FrameResult {
    FrameResult {
        face_box: Some(FaceBox { x: 0, y: 0, width: 40, height: 40 }),
        recognized: false,
        name: None,
        encoding: Some(Encoding(serde_json::json!(encoding))),
    }
}

pub fn face_record(id: i64, name: &str) -> FaceRecord {
    FaceRecord {
        id,
        name: name.to_string(),
        timestamp: "2025-01-15T10:30:00".to_string(),
    }
}

/// Synthetic frame source: mid-gray frames at a fixed size, or a
/// permanently broken device.
pub struct FakeSource {
    width: u32,
    height: u32,
    broken: bool,
    sequence: AtomicUsize,
}

impl FakeSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, broken: false, sequence: AtomicUsize::new(0) }
    }

    pub fn broken() -> Self {
        Self { width: 0, height: 0, broken: true, sequence: AtomicUsize::new(0) }
    }
}

impl SnapshotSource for FakeSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    async fn snapshot(&self) -> Result<Frame, CameraError> {
        if self.broken {
            return Err(CameraError::WorkerGone);
        }
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) as u32;
        Ok(Frame {
            data: vec![128u8; (self.width * self.height) as usize],
            width: self.width,
            height: self.height,
            timestamp: std::time::Instant::now(),
            sequence,
        })
    }
}

/// Scripted recognition service: each call pops the next queued
/// response for its endpoint. An unscripted `recognize` yields an
/// empty result (no face in frame); any other unscripted call fails
/// the test.
#[derive(Default)]
pub struct ScriptedApi {
    recognize: Mutex<VecDeque<Result<FrameResult, ClientError>>>,
    save: Mutex<VecDeque<Result<bool, ClientError>>>,
    faces: Mutex<VecDeque<Result<Vec<FaceRecord>, ClientError>>>,
    delete: Mutex<VecDeque<Result<bool, ClientError>>>,
    save_calls: AtomicUsize,
    last_saved: Mutex<Option<(String, Encoding)>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recognize(self, result: Result<FrameResult, ClientError>) -> Self {
        self.recognize.lock().unwrap().push_back(result);
        self
    }

    pub fn with_save(self, result: Result<bool, ClientError>) -> Self {
        self.save.lock().unwrap().push_back(result);
        self
    }

    pub fn with_faces(self, result: Result<Vec<FaceRecord>, ClientError>) -> Self {
        self.faces.lock().unwrap().push_back(result);
        self
    }

    pub fn with_delete(self, result: Result<bool, ClientError>) -> Self {
        self.delete.lock().unwrap().push_back(result);
        self
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn last_saved(&self) -> Option<(String, Encoding)> {
        self.last_saved.lock().unwrap().clone()
    }

    pub fn service_error(status: u16, message: &str) -> ClientError {
        ClientError::Service { status, message: message.to_string() }
    }

    /// A real `reqwest::Error` (its constructors are private): build a
    /// request against a syntactically invalid URL.
    pub fn transport_error() -> ClientError {
        let err = reqwest::Client::new()
            .get("http://[")
            .build()
            .expect_err("invalid URL must not build");
        ClientError::Transport(err)
    }
}

impl RecognitionApi for ScriptedApi {
    async fn list_faces(&self) -> Result<Vec<FaceRecord>, ClientError> {
        self.faces.lock().unwrap().pop_front().expect("unscripted list_faces call")
    }

    async fn recognize(&self, _image: &str) -> Result<FrameResult, ClientError> {
        self.recognize
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(FrameResult::default()))
    }

    async fn save_face(&self, name: &str, encoding: &Encoding) -> Result<bool, ClientError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_saved.lock().unwrap() = Some((name.to_string(), encoding.clone()));
        self.save.lock().unwrap().pop_front().expect("unscripted save_face call")
    }

    async fn delete_face(&self, _id: i64) -> Result<bool, ClientError> {
        self.delete.lock().unwrap().pop_front().expect("unscripted delete_face call")
    }
}

/// Tracks how many recognize calls are in flight at once.
#[derive(Clone, Default)]
pub struct ConcurrencyProbe {
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Recognition service whose `recognize` blocks until the gate is
/// notified, for exercising the at-most-one-outstanding rule.
pub struct GatedApi {
    gate: Arc<Notify>,
    probe: ConcurrencyProbe,
    result: FrameResult,
}

impl GatedApi {
    pub fn new() -> Self {
        Self::with_result(FrameResult::default())
    }

    pub fn with_result(result: FrameResult) -> Self {
        Self { gate: Arc::new(Notify::new()), probe: ConcurrencyProbe::default(), result }
    }

    pub fn gate(&self) -> Arc<Notify> {
        Arc::clone(&self.gate)
    }

    pub fn concurrency_probe(&self) -> ConcurrencyProbe {
        self.probe.clone()
    }
}

impl RecognitionApi for GatedApi {
    async fn list_faces(&self) -> Result<Vec<FaceRecord>, ClientError> {
        Ok(Vec::new())
    }

    async fn recognize(&self, _image: &str) -> Result<FrameResult, ClientError> {
        self.probe.enter();
        self.gate.notified().await;
        self.probe.exit();
        Ok(self.result.clone())
    }

    async fn save_face(&self, _name: &str, _encoding: &Encoding) -> Result<bool, ClientError> {
        Ok(true)
    }

    async fn delete_face(&self, _id: i64) -> Result<bool, ClientError> {
        Ok(true)
    }
}
