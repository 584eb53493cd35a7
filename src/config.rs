//! Viewer configuration
//!
//! Loaded from YAML with every field optional; missing fields take the
//! defaults below. The backend host can be overridden at runtime through the
//! `SIMVIEW_WS_HOST` environment variable.
//!
//! ```yaml
//! host: sim.example.net:8443
//! secure: true
//! handshake: on_open
//! jitter:
//!   target_secs: 0.5
//!   max_buffered_secs: null
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::{Result, ViewerError};

/// Environment variable overriding [`ViewerConfig::host`]
pub const HOST_ENV_VAR: &str = "SIMVIEW_WS_HOST";

const INLINE_SOURCE: &str = "<inline>";

/// Upper bound for jitter buffer spans
pub const MAX_JITTER_SECS: f64 = 3600.0;

/// When a freshly opened socket counts as connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeMode {
    /// As soon as the socket opens
    OnOpen,

    /// Only once the backend sends `connection_established`
    #[default]
    AwaitEstablished,
}

/// Jitter buffer tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    /// Buffered span required before playback starts; 0 selects immediate mode
    pub target_secs: f64,

    /// Eviction ceiling for the buffered span; `null` disables eviction
    pub max_buffered_secs: Option<f64>,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self { target_secs: 2.0, max_buffered_secs: Some(30.0) }
    }
}

impl JitterConfig {
    pub fn target(&self) -> Duration {
        secs_to_duration(self.target_secs)
    }

    pub fn max_buffered(&self) -> Option<Duration> {
        self.max_buffered_secs.map(secs_to_duration)
    }
}

/// Connection and playback settings for a [`ViewerConnection`](crate::ViewerConnection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Backend `host:port`
    pub host: String,

    /// WebSocket endpoint path
    pub path: String,

    /// Use `wss://` instead of `ws://`
    pub secure: bool,

    pub handshake: HandshakeMode,

    pub jitter: JitterConfig,

    /// Drain timer period
    pub drain_interval_ms: u64,

    /// Samples kept per telemetry window
    pub telemetry_window: usize,

    pub connect_timeout_secs: f64,

    /// Resolution selected until the backend reports one
    pub default_resolution: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            host: "localhost:8000".to_string(),
            path: "/ws".to_string(),
            secure: false,
            handshake: HandshakeMode::default(),
            jitter: JitterConfig::default(),
            drain_interval_ms: 16,
            telemetry_window: crate::telemetry::DEFAULT_WINDOW_CAPACITY,
            connect_timeout_secs: 5.0,
            default_resolution: 720,
        }
    }
}

impl ViewerConfig {
    /// Load a YAML configuration file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| ViewerError::config(path, e.to_string()))?;
        let config = Self::parse_yaml(&yaml, path)?.with_env_overrides();
        debug!("Loaded viewer config from {}", path.display());
        Ok(config)
    }

    /// Parse a YAML document. Environment overrides are not applied.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::parse_yaml(yaml, Path::new(INLINE_SOURCE))
    }

    /// Apply `SIMVIEW_WS_HOST` when set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        self.with_host_override(std::env::var(HOST_ENV_VAR).ok())
    }

    fn with_host_override(mut self, host: Option<String>) -> Self {
        if let Some(host) = host.map(|h| h.trim().to_string()).filter(|h| !h.is_empty()) {
            debug!("Backend host overridden by {}: {}", HOST_ENV_VAR, host);
            self.host = host;
        }
        self
    }

    fn parse_yaml(yaml: &str, source: &Path) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(yaml).map_err(|e| ViewerError::config(source, e.to_string()))?
        };
        config.validate_from(source)?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.validate_from(Path::new(INLINE_SOURCE))
    }

    fn validate_from(&self, source: &Path) -> Result<()> {
        let invalid = |details: String| Err(ViewerError::config(PathBuf::from(source), details));

        if self.host.trim().is_empty() {
            return invalid("host must not be empty".to_string());
        }
        if !is_valid_jitter_secs(self.jitter.target_secs) {
            return invalid(format!(
                "jitter.target_secs must be between 0 and {MAX_JITTER_SECS}: {}",
                self.jitter.target_secs
            ));
        }
        if let Some(max) = self.jitter.max_buffered_secs.filter(|max| !is_valid_jitter_secs(*max)) {
            return invalid(format!(
                "jitter.max_buffered_secs must be between 0 and {MAX_JITTER_SECS}: {max}"
            ));
        }
        if self.drain_interval_ms == 0 {
            return invalid("drain_interval_ms must be positive".to_string());
        }
        if !is_valid_secs(self.connect_timeout_secs) || self.connect_timeout_secs == 0.0 {
            return invalid(format!("connect_timeout_secs is invalid: {}", self.connect_timeout_secs));
        }
        Ok(())
    }

    /// Backend endpoint: `{ws|wss}://{host}{path}`
    pub fn url(&self) -> Result<Url> {
        let scheme = if self.secure { "wss" } else { "ws" };
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        let raw = format!("{}://{}{}", scheme, self.host.trim(), path);
        Url::parse(&raw).map_err(|e| {
            ViewerError::config(INLINE_SOURCE, format!("invalid endpoint {raw}: {e}"))
        })
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        secs_to_duration(self.connect_timeout_secs)
    }
}

fn is_valid_secs(secs: f64) -> bool {
    secs.is_finite() && secs >= 0.0
}

fn is_valid_jitter_secs(secs: f64) -> bool {
    is_valid_secs(secs) && secs <= MAX_JITTER_SECS
}

fn secs_to_duration(secs: f64) -> Duration {
    if is_valid_secs(secs) {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}
