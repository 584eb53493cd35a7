//! Connection to a simulation backend

use futures::{Stream, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::config::ViewerConfig;
use crate::protocol::ObjectPosition;
use crate::render::{Renderer, SurfaceSet};
use crate::session::{ControlMessage, ControlRequest, Driver, Session, SessionSnapshot};
use crate::stream::ThrottleExt;
use crate::telemetry::TelemetrySnapshot;
use crate::types::{UpdateRate, ViewTarget, ZoomDirection};
use crate::{Result, ViewerError};


/// Rate at which telemetry can change: one sample per drain tick at most
const TELEMETRY_SOURCE_HZ: f64 = 60.0;

/// Live connection to a simulation backend.
///
/// Owns the driver task for one WebSocket. Observers read state through
/// [`session_updates`](Self::session_updates) and
/// [`telemetry_updates`](Self::telemetry_updates); control methods return
/// `false` when the socket is not open or the driver has stopped.
pub struct ViewerConnection {
    sessions: watch::Receiver<Arc<SessionSnapshot>>,
    telemetry: watch::Receiver<TelemetrySnapshot>,
    control: mpsc::Sender<ControlMessage>,
    renderer: Arc<Renderer>,
    url: Url,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ViewerConnection {
    /// Open the socket and start the driver.
    ///
    /// Fails with [`ViewerError::Connection`] when the backend cannot be reached
    /// and [`ViewerError::Timeout`] when the WebSocket handshake takes longer than
    /// `connect_timeout_secs`. Nothing is retried.
    pub async fn connect(config: ViewerConfig, surfaces: SurfaceSet) -> Result<Self> {
        config.validate()?;
        let url = config.url()?;
        let timeout = config.connect_timeout();

        let mut session = Session::new(&config);
        session.begin_connect();
        info!("Connecting to {}", url);

        let (socket, response) =
            match tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url.as_str())).await {
                Err(_) => return Err(ViewerError::Timeout { duration: timeout }),
                Ok(Err(e)) => {
                    return Err(ViewerError::connection_failed_with_source(
                        format!("{url} is unreachable"),
                        Box::new(e),
                    ));
                }
                Ok(Ok(connected)) => connected,
            };
        debug!("WebSocket handshake completed with status {}", response.status());
        session.on_open();

        let renderer = Arc::new(Renderer::new(surfaces, config.telemetry_window));
        let channels = Driver::spawn(socket, session, renderer.clone(), config.drain_interval());

        info!("Connection to {} open", url);
        Ok(Self {
            sessions: channels.sessions,
            telemetry: channels.telemetry,
            control: channels.control,
            renderer,
            url,
            cancel: channels.cancel,
            task: Some(channels.task),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Surfaces frames are drawn onto
    pub fn surfaces(&self) -> &SurfaceSet {
        self.renderer.surfaces()
    }

    /// Session state as a stream.
    ///
    /// Yields the current snapshot immediately, then every change. Intermediate
    /// states may be skipped when the observer falls behind.
    pub fn session_updates(&self) -> impl Stream<Item = Arc<SessionSnapshot>> + 'static {
        WatchStream::new(self.sessions.clone())
    }

    pub fn current_session(&self) -> Arc<SessionSnapshot> {
        self.sessions.borrow().clone()
    }

    /// Render telemetry as a stream, optionally throttled.
    pub fn telemetry_updates(&self, rate: UpdateRate) -> impl Stream<Item = TelemetrySnapshot> + 'static {
        let updates = WatchStream::new(self.telemetry.clone());
        match rate.throttle_interval(TELEMETRY_SOURCE_HZ) {
            Some(period) => updates.throttle(period).boxed(),
            None => updates.boxed(),
        }
    }

    pub fn current_telemetry(&self) -> TelemetrySnapshot {
        *self.telemetry.borrow()
    }

    /// Send a natural-language command; the reasoning log is cleared when sent.
    pub async fn send_command(&self, text: impl Into<String>) -> bool {
        self.control(ControlRequest::Command(text.into())).await
    }

    pub async fn switch_camera(&self, camera: u32, view: ViewTarget) -> bool {
        self.control(ControlRequest::SwitchCamera { camera, view }).await
    }

    pub async fn set_resolution(&self, resolution: u32) -> bool {
        self.control(ControlRequest::SetResolution(resolution)).await
    }

    /// Select a scene, optionally placing its objects (centimetres).
    pub async fn set_scene(
        &self,
        scene: impl Into<String>,
        positions: Option<BTreeMap<String, ObjectPosition>>,
    ) -> bool {
        self.control(ControlRequest::SetScene { scene: scene.into(), positions }).await
    }

    pub async fn set_frame_rate(&self, fps: u32) -> bool {
        self.control(ControlRequest::SetFrameRate(fps)).await
    }

    pub async fn zoom(&self, direction: ZoomDirection) -> bool {
        self.control(ControlRequest::Zoom(direction)).await
    }

    /// Start or stop the simulation.
    pub async fn toggle_running(&self, positions: Option<BTreeMap<String, ObjectPosition>>) -> bool {
        self.control(ControlRequest::ToggleRunning(positions)).await
    }

    /// Send a control request, reporting why it could not be sent.
    pub async fn request(&self, request: ControlRequest) -> Result<()> {
        let operation = format!("{request:?}");
        let (reply, sent) = oneshot::channel();
        if self.control.send(ControlMessage { request, reply }).await.is_err() {
            return Err(ViewerError::not_connected(operation));
        }
        match sent.await {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(ViewerError::not_connected(operation)),
        }
    }

    async fn control(&self, request: ControlRequest) -> bool {
        match self.request(request).await {
            Ok(()) => true,
            Err(e) => {
                debug!("{}", e);
                false
            }
        }
    }

    /// Close the socket and wait for the driver to reset state and clear the
    /// surfaces. Calling it again is a no-op.
    pub async fn disconnect(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        info!("Disconnecting from {}", self.url);
        self.cancel.cancel();
        if let Err(e) = task.await {
            debug!("Driver task ended abnormally: {}", e);
        }
    }

    /// Whether the driver is still running
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait until the session reaches a state matching `predicate`, up to `limit`.
    pub async fn wait_for<F>(&self, limit: Duration, mut predicate: F) -> Option<Arc<SessionSnapshot>>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut updates = self.session_updates();
        tokio::time::timeout(limit, async {
            while let Some(snapshot) = updates.next().await {
                if predicate(&*snapshot) {
                    return Some(snapshot);
                }
            }
            None
        })
        .await
        .ok()
        .flatten()
    }
}

impl Drop for ViewerConnection {
    fn drop(&mut self) {
        debug!("Dropping viewer connection");
        self.cancel.cancel();
    }
}
