//! Outbound link events.
//!
//! The dispatcher and the [`Gateway`](super::service::Gateway) emit these
//! through the [`EventSink`](super::ports::EventSink) port. Adapters on
//! the other side decide what to do with them — log them, queue them for
//! a supervisor, forward them to a control surface.

use crate::profile::{ProfileState, WaitPhase};
use crate::rpc::schema::ResponseCode;

/// Structured events emitted by the link core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Diagnostic text from the controller.
    Debug { profile_id: u8, message: String },

    /// The controller reported an error for a profile. State is unchanged
    /// and nothing is retried.
    DeviceError { profile_id: u8, message: String },

    /// ACK/DATA for an id that is not in the registry.
    UnknownProfile { profile_id: u8, code: ResponseCode },

    /// A bounded wait expired.
    Timeout { profile_id: u8, phase: WaitPhase },

    /// A frame arrived that is not a valid response.
    MalformedFrame { len: usize },

    /// A profile moved between lifecycle states.
    StateChanged {
        profile_id: u8,
        from: ProfileState,
        to: ProfileState,
    },

    /// A profile record was replaced by one with the same id.
    Replaced {
        profile_id: u8,
        old_kind: &'static str,
        new_kind: &'static str,
    },
}

impl LinkEvent {
    /// Profile the event concerns, if any.
    pub fn profile_id(&self) -> Option<u8> {
        match self {
            Self::Debug { profile_id, .. }
            | Self::DeviceError { profile_id, .. }
            | Self::UnknownProfile { profile_id, .. }
            | Self::Timeout { profile_id, .. }
            | Self::StateChanged { profile_id, .. }
            | Self::Replaced { profile_id, .. } => Some(*profile_id),
            Self::MalformedFrame { .. } => None,
        }
    }
}
