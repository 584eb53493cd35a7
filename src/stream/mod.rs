//! Stream utilities for observers

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
