//! View and camera selectors used by control messages

use serde::{Deserialize, Serialize};

/// Which display surface a camera change applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewTarget {
    #[default]
    Main,
    Secondary,
}

impl ViewTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewTarget::Main => "main",
            ViewTarget::Secondary => "secondary",
        }
    }
}

/// Camera zoom direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// Map a scroll-wheel delta to a zoom direction (negative scrolls zoom in)
    pub fn from_wheel_delta(delta_y: f64) -> Self {
        if delta_y < 0.0 { ZoomDirection::In } else { ZoomDirection::Out }
    }
}
