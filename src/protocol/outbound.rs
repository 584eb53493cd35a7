//! Control messages sent to the simulation backend

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Result;
use crate::types::{ViewTarget, ZoomDirection};

/// Object placement in centimetres, as edited by the host UI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ObjectPosition {
    /// Wire form: metres as `[x, y, z]`
    pub fn to_metres(self) -> [f64; 3] {
        [self.x / 100.0, self.y / 100.0, self.z / 100.0]
    }
}

/// Convert named object positions to their wire form
pub fn positions_to_wire(positions: &BTreeMap<String, ObjectPosition>) -> BTreeMap<String, [f64; 3]> {
    positions.iter().map(|(name, position)| (name.clone(), position.to_metres())).collect()
}

/// Outbound message envelope, serialized with a `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Select the environment to run (sent before starting)
    Env {
        #[serde(skip_serializing_if = "Option::is_none")]
        env: Option<String>,
        resolution: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        positions: Option<BTreeMap<String, [f64; 3]>>,
    },

    /// Switch scene
    Scene {
        scene: String,
        resolution: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        positions: Option<BTreeMap<String, [f64; 3]>>,
    },

    RunState { running: bool },

    CameraChange { camera: u32, view: ViewTarget },

    ResolutionChange { resolution: u32 },

    FpsChange { fps: u32 },

    /// Natural-language instruction for the agent
    Command { content: String },

    Zoom { direction: ZoomDirection },
}

impl OutboundMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The wire `type` of this message
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Env { .. } => "env",
            OutboundMessage::Scene { .. } => "scene",
            OutboundMessage::RunState { .. } => "run_state",
            OutboundMessage::CameraChange { .. } => "camera_change",
            OutboundMessage::ResolutionChange { .. } => "resolution_change",
            OutboundMessage::FpsChange { .. } => "fps_change",
            OutboundMessage::Command { .. } => "command",
            OutboundMessage::Zoom { .. } => "zoom",
        }
    }
}
