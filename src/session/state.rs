//! Connection session state machine
//!
//! No I/O happens here: the driver feeds socket events and arrival times in and
//! sends whatever outbound messages come back out.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::buffer::JitterBuffer;
use crate::config::{HandshakeMode, ViewerConfig};
use crate::protocol::{
    InboundMessage, ObjectPosition, OutboundMessage, SceneInfo, parse_scenes, positions_to_wire,
};
use crate::types::{ConnectionStatus, Frame, ViewTarget, ZoomDirection};

/// Separator placed before each action output in the reasoning log
pub const ACTION_OUTPUT_SEPARATOR: &str = "\n\n ACTION OUTPUT: \n\n";

/// Observable state of a session, published to observers on every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,

    /// Connecting, or started and waiting for the first frame
    pub loading: bool,

    pub scenes: Vec<SceneInfo>,
    pub selected_scene: Option<String>,
    pub resolution: u32,

    /// Accumulated reasoning and action output text
    pub reasoning_log: String,

    pub running: bool,
    pub awaiting_first_frame: bool,
    pub buffered_frames: usize,
    pub is_buffering: bool,

    /// Size of the most recent inbound text message
    pub last_message_kib: f64,

    pub frames_received: u64,
}

/// Per-connection session state.
#[derive(Debug)]
pub struct Session {
    status: ConnectionStatus,
    handshake: HandshakeMode,
    socket_open: bool,
    loading: bool,
    pending_first_frame: bool,
    buffer: JitterBuffer,
    scenes: Vec<SceneInfo>,
    selected_scene: Option<String>,
    resolution: u32,
    reasoning_log: String,
    running: bool,
    last_message_bytes: usize,
    frames_received: u64,
}

impl Session {
    pub fn new(config: &ViewerConfig) -> Self {
        let buffer =
            JitterBuffer::new(config.jitter.target()).with_max_buffered(config.jitter.max_buffered());
        Self {
            status: ConnectionStatus::Disconnected,
            handshake: config.handshake,
            socket_open: false,
            loading: false,
            pending_first_frame: false,
            buffer,
            scenes: Vec::new(),
            selected_scene: None,
            resolution: config.default_resolution,
            reasoning_log: String::new(),
            running: false,
            last_message_bytes: 0,
            frames_received: 0,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Whether outbound messages can be sent
    pub fn is_open(&self) -> bool {
        self.socket_open
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn buffer(&self) -> &JitterBuffer {
        &self.buffer
    }

    pub fn reasoning_log(&self) -> &str {
        &self.reasoning_log
    }

    pub fn selected_scene(&self) -> Option<&str> {
        self.selected_scene.as_deref()
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// A connection attempt is starting.
    pub fn begin_connect(&mut self) {
        info!("Connecting to simulation backend");
        self.status = ConnectionStatus::Connecting;
        self.socket_open = false;
        self.loading = true;
        self.pending_first_frame = true;
        self.running = false;
        self.reasoning_log.clear();
        self.buffer.reset();
    }

    /// The socket opened.
    pub fn on_open(&mut self) {
        self.socket_open = true;
        match self.handshake {
            HandshakeMode::OnOpen => {
                info!("Socket open, connected");
                self.status = ConnectionStatus::Connected;
                self.loading = false;
            }
            HandshakeMode::AwaitEstablished => {
                debug!("Socket open, awaiting connection_established");
            }
        }
    }

    /// The socket closed, by either side.
    pub fn on_close(&mut self) {
        if self.status != ConnectionStatus::Disconnected {
            info!("Disconnected from simulation backend");
        }
        self.status = ConnectionStatus::Disconnected;
        self.socket_open = false;
        self.loading = false;
        self.running = false;
        self.buffer.reset();
    }

    /// The socket failed. The driver follows up with [`on_close`](Self::on_close).
    pub fn on_error(&mut self, reason: &str) {
        warn!("Connection error: {}", reason);
        self.status = ConnectionStatus::Errored;
        self.socket_open = false;
        self.loading = false;
        self.running = false;
    }

    /// Handle one inbound text message.
    ///
    /// Returns a frame to render right away when the buffer runs in immediate
    /// mode. Malformed and unknown messages are logged and skipped.
    pub fn handle_text(&mut self, text: &str, now: Instant) -> Option<Frame> {
        self.last_message_bytes = text.len();

        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Skipping message: {}", e);
                return None;
            }
        };

        match message {
            InboundMessage::ConnectionEstablished { content, client_id } => {
                self.on_established(content.as_deref(), client_id);
            }
            InboundMessage::Resolution { resolution } => {
                if resolution > 0 {
                    debug!("Backend resolution: {}", resolution);
                    self.resolution = resolution;
                }
            }
            InboundMessage::StreamingView { main_view, god_view } => {
                return self.on_frame(main_view, god_view, now);
            }
            InboundMessage::Reasoning { message } => {
                self.reasoning_log.push_str(&message);
            }
            InboundMessage::Output { message } => {
                self.reasoning_log.push_str(ACTION_OUTPUT_SEPARATOR);
                self.reasoning_log.push_str(&message.to_string());
            }
            InboundMessage::Unknown => {
                debug!("Ignoring message of unknown type ({} bytes)", text.len());
            }
        }
        None
    }

    fn on_established(&mut self, content: Option<&str>, client_id: Option<serde_json::Value>) {
        match content.map(parse_scenes).transpose() {
            Ok(Some(scenes)) if !scenes.is_empty() => {
                self.selected_scene = Some(scenes[0].id.clone());
                self.scenes = scenes;
            }
            Ok(_) => debug!("Handshake advertised no scenes"),
            Err(e) => warn!("Ignoring handshake scene list: {}", e),
        }

        info!(
            "Connected to simulation backend (client {}, {} scenes)",
            client_id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
            self.scenes.len()
        );
        self.status = ConnectionStatus::Connected;
        self.loading = false;
    }

    fn on_frame(&mut self, main_view: String, god_view: Option<String>, now: Instant) -> Option<Frame> {
        if self.pending_first_frame {
            info!("First frame received");
            self.pending_first_frame = false;
            self.loading = false;
        }
        self.frames_received += 1;
        self.buffer.push(Frame::new(main_view, god_view.map(Arc::from), now))
    }

    /// Release at most one frame for display.
    pub fn drain_tick(&mut self) -> Option<Frame> {
        self.buffer.drain_tick()
    }

    fn ensure_open(&self, operation: &str) -> bool {
        if !self.socket_open {
            debug!("Not sending {}: connection is not open", operation);
        }
        self.socket_open
    }

    /// Build a natural-language command. Clears the reasoning log when sent.
    pub fn command(&mut self, text: &str) -> Option<OutboundMessage> {
        let content = text.trim();
        if content.is_empty() || !self.ensure_open("command") {
            return None;
        }
        self.reasoning_log.clear();
        Some(OutboundMessage::Command { content: content.to_string() })
    }

    pub fn switch_camera(&self, camera: u32, view: ViewTarget) -> Option<OutboundMessage> {
        self.ensure_open("camera_change").then_some(OutboundMessage::CameraChange { camera, view })
    }

    pub fn set_resolution(&mut self, resolution: u32) -> Option<OutboundMessage> {
        if !self.ensure_open("resolution_change") {
            return None;
        }
        self.resolution = resolution;
        Some(OutboundMessage::ResolutionChange { resolution })
    }

    /// Select a scene and ask the backend to load it.
    pub fn set_scene(
        &mut self,
        scene: &str,
        positions: Option<&BTreeMap<String, ObjectPosition>>,
    ) -> Option<OutboundMessage> {
        if !self.ensure_open("scene") {
            return None;
        }
        self.selected_scene = Some(scene.to_string());
        Some(OutboundMessage::Scene {
            scene: scene.to_string(),
            resolution: self.resolution,
            positions: positions.map(positions_to_wire),
        })
    }

    pub fn set_frame_rate(&self, fps: u32) -> Option<OutboundMessage> {
        self.ensure_open("fps_change").then_some(OutboundMessage::FpsChange { fps })
    }

    pub fn zoom(&self, direction: ZoomDirection) -> Option<OutboundMessage> {
        self.ensure_open("zoom").then_some(OutboundMessage::Zoom { direction })
    }

    /// Start or stop the simulation, returning the messages to send in order.
    ///
    /// Starting sends the environment selection followed by `run_state`.
    /// Stopping drops every buffered frame.
    pub fn toggle_running(
        &mut self,
        positions: Option<&BTreeMap<String, ObjectPosition>>,
    ) -> Option<Vec<OutboundMessage>> {
        if !self.ensure_open("run_state") {
            return None;
        }

        let messages = if self.running {
            info!("Stopping simulation");
            self.loading = false;
            self.pending_first_frame = false;
            self.buffer.reset();
            vec![OutboundMessage::RunState { running: false }]
        } else {
            info!("Starting simulation (scene {:?}, {}p)", self.selected_scene, self.resolution);
            self.loading = true;
            self.pending_first_frame = true;
            vec![
                OutboundMessage::Env {
                    env: self.selected_scene.clone(),
                    resolution: self.resolution,
                    positions: positions.map(positions_to_wire),
                },
                OutboundMessage::RunState { running: true },
            ]
        };

        self.running = !self.running;
        Some(messages)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            loading: self.loading,
            scenes: self.scenes.clone(),
            selected_scene: self.selected_scene.clone(),
            resolution: self.resolution,
            reasoning_log: self.reasoning_log.clone(),
            running: self.running,
            awaiting_first_frame: self.pending_first_frame,
            buffered_frames: self.buffer.len(),
            is_buffering: self.buffer.is_buffering(),
            last_message_kib: (self.last_message_bytes as f64 / 1024.0 * 100.0).round() / 100.0,
            frames_received: self.frames_received,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JitterConfig;
    use crate::test_utils;
    use std::time::Duration;

    fn config(target_secs: f64, handshake: HandshakeMode) -> ViewerConfig {
        ViewerConfig {
            handshake,
            jitter: JitterConfig { target_secs, max_buffered_secs: None },
            ..ViewerConfig::default()
        }
    }

    fn open_session(target_secs: f64) -> Session {
        let mut session = Session::new(&config(target_secs, HandshakeMode::OnOpen));
        session.begin_connect();
        session.on_open();
        session
    }

    #[test]
    fn immediate_mode_renders_each_frame_on_arrival() {
        let mut session = open_session(0.0);
        let base = Instant::now();

        for i in 0..5u64 {
            let text = test_utils::streaming_view_message(&format!("frame{i}"), None);
            let frame = session.handle_text(&text, base + Duration::from_millis(i * 10));

            let frame = frame.expect("immediate mode hands frames straight back");
            assert_eq!(&*frame.main_payload, format!("frame{i}"));
            assert!(session.buffer().len() <= 1);
            assert!(session.drain_tick().is_none());
        }
        assert_eq!(session.snapshot().frames_received, 5);
    }

    #[test]
    fn handshake_selects_first_scene_and_connects() {
        let mut session = Session::new(&config(2.0, HandshakeMode::AwaitEstablished));
        session.begin_connect();
        session.on_open();
        assert_eq!(session.status(), ConnectionStatus::Connecting);
        assert!(session.snapshot().loading);

        let text = r#"{"type":"connection_established","content":"{\"scenes\":[{\"id\":\"s1\"}]}"}"#;
        assert!(session.handle_text(text, Instant::now()).is_none());

        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, ConnectionStatus::Connected);
        assert_eq!(snapshot.selected_scene.as_deref(), Some("s1"));
        assert_eq!(snapshot.scenes, vec![SceneInfo { id: "s1".into(), name: None }]);
        assert!(!snapshot.loading);
    }

    #[test]
    fn plain_text_handshake_still_connects() {
        let mut session = Session::new(&config(2.0, HandshakeMode::AwaitEstablished));
        session.begin_connect();
        session.on_open();
        session.handle_text(
            r#"{"type":"connection_established","content":"Connected to sim"}"#,
            Instant::now(),
        );
        assert_eq!(session.status(), ConnectionStatus::Connected);
        assert_eq!(session.selected_scene(), None);
    }

    #[test]
    fn command_while_disconnected_is_rejected() {
        let mut session = Session::new(&ViewerConfig::default());
        session.handle_text(r#"{"type":"reasoning","message":"earlier thoughts"}"#, Instant::now());

        assert_eq!(session.command("move left"), None);
        assert_eq!(session.reasoning_log(), "earlier thoughts");
    }

    #[test]
    fn command_is_trimmed_and_clears_reasoning() {
        let mut session = open_session(2.0);
        session.handle_text(r#"{"type":"reasoning","message":"thinking"}"#, Instant::now());

        assert_eq!(session.command("   "), None);
        assert_eq!(session.reasoning_log(), "thinking");

        assert_eq!(
            session.command("  move left \n"),
            Some(OutboundMessage::Command { content: "move left".into() })
        );
        assert_eq!(session.reasoning_log(), "");
    }

    #[test]
    fn reasoning_and_output_accumulate() {
        let mut session = open_session(2.0);
        let now = Instant::now();
        session.handle_text(r#"{"type":"reasoning","message":"pick "}"#, now);
        session.handle_text(r#"{"type":"reasoning","message":"red"}"#, now);
        session.handle_text(r#"{"type":"output","message":{"action":"grasp","ok":true}}"#, now);

        assert_eq!(
            session.reasoning_log(),
            "pick red\n\n ACTION OUTPUT: \n\n{\"action\":\"grasp\",\"ok\":true}"
        );
    }

    #[test]
    fn malformed_and_unknown_messages_are_skipped() {
        let mut session = open_session(2.0);
        let before = session.snapshot();
        let now = Instant::now();

        assert!(session.handle_text("{not json", now).is_none());
        assert!(session.handle_text(r#"{"type":"streaming_view"}"#, now).is_none());
        assert!(session.handle_text(r#"{"type":"heartbeat"}"#, now).is_none());

        let after = session.snapshot();
        assert_eq!(after.status, before.status);
        assert_eq!(after.buffered_frames, 0);
        assert_eq!(after.reasoning_log, before.reasoning_log);
    }

    #[test]
    fn resolution_messages_update_selection() {
        let mut session = open_session(2.0);
        assert_eq!(session.resolution(), 720);
        session.handle_text(r#"{"type":"resolution","resolution":480}"#, Instant::now());
        assert_eq!(session.resolution(), 480);
        session.handle_text(r#"{"type":"resolution","resolution":0}"#, Instant::now());
        assert_eq!(session.resolution(), 480);
    }

    #[test]
    fn first_frame_clears_loading_once() {
        let mut session = open_session(2.0);
        session.toggle_running(None);
        assert!(session.snapshot().awaiting_first_frame);
        assert!(session.snapshot().loading);

        let text = test_utils::streaming_view_message("AAAA", Some("BBBB"));
        session.handle_text(&text, Instant::now());

        let snapshot = session.snapshot();
        assert!(!snapshot.awaiting_first_frame);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.buffered_frames, 1);
        assert!(snapshot.is_buffering);
        assert!(snapshot.last_message_kib > 0.0);
    }

    #[test]
    fn frames_before_handshake_are_buffered() {
        let mut session = Session::new(&config(2.0, HandshakeMode::AwaitEstablished));
        session.begin_connect();
        session.on_open();
        session.handle_text(&test_utils::streaming_view_message("AAAA", None), Instant::now());
        assert_eq!(session.buffer().len(), 1);
        assert_eq!(session.status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn toggle_running_sends_env_then_run_state() {
        let mut session = open_session(2.0);
        session.handle_text(&test_utils::connection_established_message(&["g1", "desk"]), Instant::now());

        let mut positions = BTreeMap::new();
        positions.insert("blue".to_string(), ObjectPosition { x: 10.0, y: 20.0, z: 30.0 });

        let start = session.toggle_running(Some(&positions)).unwrap();
        assert_eq!(start.len(), 2);
        match &start[0] {
            OutboundMessage::Env { env, resolution, positions: Some(wire) } => {
                assert_eq!(env.as_deref(), Some("g1"));
                assert_eq!(*resolution, 720);
                assert_eq!(wire["blue"], [0.1, 0.2, 0.3]);
            }
            other => panic!("expected env, got {other:?}"),
        }
        assert_eq!(start[1], OutboundMessage::RunState { running: true });
        assert!(session.is_running());

        session.handle_text(&test_utils::streaming_view_message("AAAA", None), Instant::now());
        let stop = session.toggle_running(None).unwrap();
        assert_eq!(stop, vec![OutboundMessage::RunState { running: false }]);
        assert!(!session.is_running());
        assert!(session.buffer().is_empty());
        assert!(session.buffer().is_buffering());
    }

    #[test]
    fn outbound_builders_require_open_socket() {
        let mut session = Session::new(&ViewerConfig::default());
        assert_eq!(session.switch_camera(1, ViewTarget::Main), None);
        assert_eq!(session.set_resolution(1080), None);
        assert_eq!(session.set_scene("desk", None), None);
        assert_eq!(session.set_frame_rate(30), None);
        assert_eq!(session.zoom(ZoomDirection::In), None);
        assert_eq!(session.toggle_running(None), None);
        assert_eq!(session.resolution(), 720);
        assert!(!session.is_running());

        session.begin_connect();
        session.on_open();
        assert_eq!(
            session.switch_camera(2, ViewTarget::Secondary),
            Some(OutboundMessage::CameraChange { camera: 2, view: ViewTarget::Secondary })
        );
        assert_eq!(session.set_resolution(1080), Some(OutboundMessage::ResolutionChange { resolution: 1080 }));
        assert_eq!(session.resolution(), 1080);
        assert_eq!(
            session.set_scene("desk", None),
            Some(OutboundMessage::Scene { scene: "desk".into(), resolution: 1080, positions: None })
        );
        assert_eq!(session.selected_scene(), Some("desk"));
        assert_eq!(session.set_frame_rate(30), Some(OutboundMessage::FpsChange { fps: 30 }));
        assert_eq!(
            session.zoom(ZoomDirection::Out),
            Some(OutboundMessage::Zoom { direction: ZoomDirection::Out })
        );
    }

    #[test]
    fn close_and_error_reset_playback() {
        let mut session = open_session(2.0);
        session.toggle_running(None);
        session.handle_text(&test_utils::streaming_view_message("AAAA", None), Instant::now());

        session.on_error("connection reset");
        assert_eq!(session.status(), ConnectionStatus::Errored);
        assert!(!session.is_open());
        assert!(!session.is_running());

        session.on_close();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
        assert_eq!(snapshot.buffered_frames, 0);
        assert!(snapshot.is_buffering);
        assert!(!snapshot.loading);
    }

    #[test]
    fn reconnect_starts_clean() {
        let mut session = open_session(2.0);
        session.handle_text(r#"{"type":"reasoning","message":"old"}"#, Instant::now());
        session.on_close();

        session.begin_connect();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, ConnectionStatus::Connecting);
        assert!(snapshot.awaiting_first_frame);
        assert!(snapshot.reasoning_log.is_empty());
    }
}
