//! Connection session: state machine plus the task that drives it.
//!
//! [`Session`] holds everything a connection knows (status, scenes, reasoning
//! log, jitter buffer) and never touches the network, which keeps it
//! deterministic under test. [`Driver`] spawns the event loop that owns the
//! socket, feeds the session, renders released frames and publishes
//! [`SessionSnapshot`]s to observers.

mod driver;
mod state;

pub use driver::{ControlMessage, ControlRequest, Driver, DriverChannels};
pub use state::{ACTION_OUTPUT_SEPARATOR, Session, SessionSnapshot};
