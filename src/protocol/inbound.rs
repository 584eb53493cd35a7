//! Messages received from the simulation backend

use serde::{Deserialize, Serialize};

use crate::{Result, ViewerError};

/// Inbound message envelope, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Handshake; `content` may itself be JSON listing the available scenes
    ConnectionEstablished {
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        client_id: Option<serde_json::Value>,
    },

    /// Backend acknowledged or changed the stream resolution
    Resolution { resolution: u32 },

    /// One pair of base64 JPEG views
    StreamingView {
        main_view: String,
        #[serde(default)]
        god_view: Option<String>,
    },

    /// Fragment of the agent's reasoning text
    Reasoning {
        #[serde(default)]
        message: String,
    },

    /// Structured action output
    Output {
        #[serde(default)]
        message: serde_json::Value,
    },

    /// Any type this client does not handle
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    /// Parse one text frame from the socket.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| ViewerError::protocol("inbound message", e.to_string()))
    }

    /// The wire `type` of this message
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::ConnectionEstablished { .. } => "connection_established",
            InboundMessage::Resolution { .. } => "resolution",
            InboundMessage::StreamingView { .. } => "streaming_view",
            InboundMessage::Reasoning { .. } => "reasoning",
            InboundMessage::Output { .. } => "output",
            InboundMessage::Unknown => "unknown",
        }
    }
}

/// A scene the backend can run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HandshakeContent {
    #[serde(default)]
    scenes: Vec<SceneInfo>,
}

/// Extract the scene list from a `connection_established` content string.
///
/// Plain-text content (older backends send a greeting) yields no scenes.
pub fn parse_scenes(content: &str) -> Result<Vec<SceneInfo>> {
    let trimmed = content.trim();
    if !trimmed.starts_with('{') {
        return Ok(Vec::new());
    }
    let parsed: HandshakeContent = serde_json::from_str(trimmed)
        .map_err(|e| ViewerError::protocol("connection_established content", e.to_string()))?;
    Ok(parsed.scenes)
}
