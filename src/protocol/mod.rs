//! JSON wire protocol spoken with the simulation backend.
//!
//! Every message is a JSON object with a `type` discriminator. Inbound
//! `streaming_view` messages carry frames; everything else is control state.

mod inbound;
mod outbound;

pub use inbound::{InboundMessage, SceneInfo, parse_scenes};
pub use outbound::{ObjectPosition, OutboundMessage, positions_to_wire};
