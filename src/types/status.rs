//! Connection lifecycle status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Socket lifecycle state as seen by observers.
///
/// Transitions are driven only by socket events and the connection handshake:
/// `Disconnected -> Connecting -> Connected -> (Disconnected | Errored -> Disconnected)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

impl ConnectionStatus {
    /// Whether the handshake has completed
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Errored => "Error",
        };
        f.write_str(label)
    }
}
