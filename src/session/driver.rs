//! Driver task owning the socket and the session

use futures::stream::FuturesUnordered;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::state::{Session, SessionSnapshot};
use crate::Result;
use crate::protocol::{ObjectPosition, OutboundMessage};
use crate::render::{RenderReport, Renderer};
use crate::telemetry::TelemetrySnapshot;
use crate::types::{Frame, ViewTarget, ZoomDirection};

/// Control channel depth; callers wait for a reply, so this only absorbs bursts
const CONTROL_QUEUE_DEPTH: usize = 32;

/// Outbound operation requested by a [`ViewerConnection`](crate::ViewerConnection)
#[derive(Debug, Clone, PartialEq)]
pub enum ControlRequest {
    Command(String),
    SwitchCamera { camera: u32, view: ViewTarget },
    SetResolution(u32),
    SetScene { scene: String, positions: Option<BTreeMap<String, ObjectPosition>> },
    SetFrameRate(u32),
    Zoom(ZoomDirection),
    ToggleRunning(Option<BTreeMap<String, ObjectPosition>>),
}

/// A control request with its reply slot; the reply is `true` once sent.
#[derive(Debug)]
pub struct ControlMessage {
    pub request: ControlRequest,
    pub reply: oneshot::Sender<bool>,
}

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Session state, republished on every change
    pub sessions: watch::Receiver<Arc<SessionSnapshot>>,

    /// Render telemetry, republished after every render
    pub telemetry: watch::Receiver<TelemetrySnapshot>,

    /// Outbound control requests
    pub control: mpsc::Sender<ControlMessage>,

    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,

    /// Completes once the socket is closed and state has been reset
    pub task: JoinHandle<()>,
}

/// Why the event loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shutdown {
    Cancelled,
    ClosedByPeer,
    Failed,
}

/// Driver spawns and runs the single event loop of a connection.
///
/// Every session mutation happens inside this task: inbound messages, drain
/// ticks, control requests and render completions are handled one at a time.
/// Decoding runs on the blocking pool; its completion is polled by the loop.
pub struct Driver;

impl Driver {
    /// Spawn the event loop for an already opened socket.
    ///
    /// `session` must have seen `begin_connect` and `on_open`.
    pub fn spawn<T>(
        socket: T,
        session: Session,
        renderer: Arc<Renderer>,
        drain_interval: Duration,
    ) -> DriverChannels
    where
        T: Stream<Item = Result<Message, tungstenite::Error>>
            + Sink<Message, Error = tungstenite::Error>
            + Unpin
            + Send
            + 'static,
    {
        let (session_tx, session_rx) = watch::channel(Arc::new(session.snapshot()));
        let (telemetry_tx, telemetry_rx) = watch::channel(renderer.telemetry());
        let (control_tx, control_rx) = mpsc::channel(CONTROL_QUEUE_DEPTH);
        let cancel = CancellationToken::new();

        let event_loop = EventLoop {
            session,
            renderer,
            session_tx,
            telemetry_tx,
            drain_interval,
        };
        let task = tokio::spawn(event_loop.run(socket, control_rx, cancel.clone()));

        DriverChannels {
            sessions: session_rx,
            telemetry: telemetry_rx,
            control: control_tx,
            cancel,
            task,
        }
    }
}

struct EventLoop {
    session: Session,
    renderer: Arc<Renderer>,
    session_tx: watch::Sender<Arc<SessionSnapshot>>,
    telemetry_tx: watch::Sender<TelemetrySnapshot>,
    drain_interval: Duration,
}

impl EventLoop {
    async fn run<T>(
        mut self,
        mut socket: T,
        mut control_rx: mpsc::Receiver<ControlMessage>,
        cancel: CancellationToken,
    ) where
        T: Stream<Item = Result<Message, tungstenite::Error>>
            + Sink<Message, Error = tungstenite::Error>
            + Unpin,
    {
        info!("Driver started (drain every {:?})", self.drain_interval);
        self.renderer.reset_telemetry();
        self.publish_telemetry();

        let mut drain = tokio::time::interval(self.drain_interval);
        drain.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut renders = FuturesUnordered::new();
        let mut rendered = 0u64;
        let mut dropped = 0u64;

        let shutdown = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Driver cancelled");
                    break Shutdown::Cancelled;
                }
                inbound = socket.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(frame) = self.session.handle_text(text.as_str(), Instant::now()) {
                            renders.push(render(self.renderer.clone(), frame));
                        }
                        self.publish_session();
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!("Ignoring {} byte binary message", data.len());
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("Backend closed the connection: {:?}", frame);
                        break Shutdown::ClosedByPeer;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Socket error: {}", e);
                        self.session.on_error(&e.to_string());
                        self.publish_session();
                        break Shutdown::Failed;
                    }
                    None => {
                        info!("Socket stream ended");
                        break Shutdown::ClosedByPeer;
                    }
                },
                _ = drain.tick() => {
                    let before = (self.session.buffer().len(), self.session.buffer().is_buffering());
                    if let Some(frame) = self.session.drain_tick() {
                        trace!("Releasing frame ({} bytes)", frame.encoded_len());
                        renders.push(render(self.renderer.clone(), frame));
                    }
                    let after = (self.session.buffer().len(), self.session.buffer().is_buffering());
                    if before != after {
                        self.publish_session();
                    }
                }
                Some(message) = control_rx.recv() => {
                    let sent = self.handle_control(&mut socket, message.request).await;
                    if message.reply.send(sent).is_err() {
                        debug!("Control caller went away before the reply");
                    }
                    self.publish_session();
                }
                Some(report) = renders.next(), if !renders.is_empty() => {
                    if report.success {
                        rendered += 1;
                    } else {
                        dropped += 1;
                    }
                    self.publish_telemetry();
                }
            }
        };

        if shutdown == Shutdown::Cancelled {
            if let Err(e) = socket.close().await {
                debug!("Close handshake failed: {}", e);
            }
        }

        self.session.on_close();
        self.renderer.surfaces().invalidate_and_clear();
        self.renderer.reset_telemetry();
        self.publish_session();
        self.publish_telemetry();

        info!(
            "Driver ended ({:?}): {} frames rendered, {} dropped, {} still decoding",
            shutdown,
            rendered,
            dropped,
            renders.len()
        );
    }

    async fn handle_control<T>(&mut self, socket: &mut T, request: ControlRequest) -> bool
    where
        T: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let session = &mut self.session;
        let messages = match request {
            ControlRequest::Command(text) => session.command(&text).map(|m| vec![m]),
            ControlRequest::SwitchCamera { camera, view } => {
                session.switch_camera(camera, view).map(|m| vec![m])
            }
            ControlRequest::SetResolution(resolution) => {
                session.set_resolution(resolution).map(|m| vec![m])
            }
            ControlRequest::SetScene { scene, positions } => {
                session.set_scene(&scene, positions.as_ref()).map(|m| vec![m])
            }
            ControlRequest::SetFrameRate(fps) => session.set_frame_rate(fps).map(|m| vec![m]),
            ControlRequest::Zoom(direction) => session.zoom(direction).map(|m| vec![m]),
            ControlRequest::ToggleRunning(positions) => session.toggle_running(positions.as_ref()),
        };

        let Some(messages) = messages else {
            return false;
        };

        for message in &messages {
            if let Err(e) = send_message(socket, message).await {
                warn!("Failed to send {}: {}", message.kind(), e);
                return false;
            }
        }
        true
    }

    fn publish_session(&self) {
        let snapshot = self.session.snapshot();
        self.session_tx.send_if_modified(|current| {
            if **current == snapshot {
                false
            } else {
                *current = Arc::new(snapshot);
                true
            }
        });
    }

    fn publish_telemetry(&self) {
        let snapshot = self.renderer.telemetry();
        self.telemetry_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

async fn render(renderer: Arc<Renderer>, frame: Frame) -> RenderReport {
    renderer.render_frame(frame).await
}

async fn send_message<T>(socket: &mut T, message: &OutboundMessage) -> Result<()>
where
    T: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let json = message.to_json()?;
    debug!("Sending {} ({} bytes)", message.kind(), json.len());
    socket.send(Message::Text(json.into())).await?;
    Ok(())
}
