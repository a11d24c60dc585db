//! vis-à-vis — camera-driven face recognition with a chat window that
//! appears for people the system knows.
//!
//! The binary wires the pieces together: a camera worker thread, the
//! capture scheduler sampling frames into the recognition service, the
//! chat bridge, and a small console loop for enrollment and face
//! management.

mod bridge;
mod config;
mod enroll;
mod scheduler;
mod session;
mod source;
#[cfg(test)]
mod testutil;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;
use visavis_client::{RecognitionApi, RecognitionClient};

use crate::bridge::ChatController;
use crate::config::Config;
use crate::scheduler::{halt_capture, CapturePipeline, CaptureScheduler};
use crate::session::SessionState;
use crate::source::{spawn_camera, SnapshotSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(
        service = %config.service_url,
        gateway = %config.gateway_url,
        device = %config.camera_device,
        "starting vis-à-vis"
    );

    let api = Arc::new(RecognitionClient::new(&config.service_url));
    let session = Arc::new(Mutex::new(SessionState::new()));
    session::refresh_faces(api.as_ref(), &session).await;

    let camera = spawn_camera(&config.camera_device).context("camera device unavailable")?;
    let (width, height) = camera.dimensions();

    let chat = ChatController::new(&config.gateway_url, config.chat_timeout);
    let pipeline = Arc::new(CapturePipeline::new(
        camera,
        Arc::clone(&api),
        Arc::clone(&session),
        chat.clone(),
        config.jpeg_quality,
    ));

    let mut scheduler = CaptureScheduler::new();
    session.lock().await.start_camera(width, height);
    scheduler.start(Arc::clone(&pipeline), config.sample_interval);

    run_console(&config, api.as_ref(), &session, &chat, &mut scheduler, &pipeline).await;

    halt_capture(&session, &mut scheduler).await;
    chat.set_visible(false).await;
    tracing::info!("shut down");
    Ok(())
}

/// Line-oriented console: commands start with `/`; anything else is a
/// name for the open enrollment modal, or a chat message when the chat
/// window is open.
async fn run_console<S, A>(
    config: &Config,
    api: &A,
    session: &Arc<Mutex<SessionState>>,
    chat: &ChatController,
    scheduler: &mut CaptureScheduler,
    pipeline: &Arc<CapturePipeline<S, A>>,
) where
    S: SnapshotSource + 'static,
    A: RecognitionApi + 'static,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(error = %err, "console read failed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').unwrap_or((line, "")) {
            ("/stop", _) => {
                halt_capture(session, scheduler).await;
                chat.set_visible(false).await;
            }
            ("/start", _) => {
                let mut state = session.lock().await;
                if state.camera().is_none() {
                    let (width, height) = pipeline.dimensions();
                    state.start_camera(width, height);
                    drop(state);
                    scheduler.start(Arc::clone(pipeline), config.sample_interval);
                }
            }
            ("/faces", _) => {
                session::refresh_faces(api, session).await;
                for face in &session.lock().await.faces {
                    println!("{:>4}  {}  ({})", face.id, face.name, face.timestamp);
                }
            }
            ("/delete", rest) => match rest.trim().parse::<i64>() {
                Ok(id) => match session::delete_face(api, session, id).await {
                    Ok(true) => println!("deleted face {id}"),
                    Ok(false) => println!("face {id} not found"),
                    Err(err) => tracing::warn!(error = %err, "delete failed"),
                },
                Err(_) => println!("usage: /delete <id>"),
            },
            ("/cancel", _) => enroll::cancel(session).await,
            ("/chat", _) => {
                if chat.has_session().await {
                    for message in chat.log_snapshot().await {
                        println!("[{:?}] {}", message.origin, message.text);
                    }
                } else {
                    println!("no chat session");
                }
            }
            (cmd, _) if cmd.starts_with('/') => {
                println!("commands: /start /stop /faces /delete <id> /cancel /chat");
            }
            _ => {
                if session.lock().await.tracker.modal_open() {
                    match enroll::submit(api, session, line).await {
                        enroll::EnrollOutcome::Saved { name } => println!("enrolled {name}"),
                        enroll::EnrollOutcome::RejectedBlankName => {
                            println!("name cannot be empty")
                        }
                        enroll::EnrollOutcome::Failed(reason) => println!("save failed: {reason}"),
                        enroll::EnrollOutcome::NoDraftOpen => {}
                    }
                } else if chat.is_open().await {
                    chat.send(line).await;
                } else {
                    println!("no enrollment or chat in progress");
                }
            }
        }
    }
}
