//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each [`LinkEvent`] as one
//! structured line through the `log` facade. A supervisor that needs to
//! react to events uses [`EventChannel`](crate::rpc::channels::EventChannel)
//! instead.

use log::{debug, error, info, warn};

use crate::app::events::LinkEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`LinkEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &LinkEvent) {
        match event {
            LinkEvent::Debug {
                profile_id,
                message,
            } => {
                info!("DEBUG | profile={} | {:?}", profile_id, message);
            }
            LinkEvent::DeviceError {
                profile_id,
                message,
            } => {
                error!("ERROR | profile={} | {:?}", profile_id, message);
            }
            LinkEvent::UnknownProfile { profile_id, code } => {
                warn!("UNKNOWN | profile={} | code={:?} discarded", profile_id, code);
            }
            LinkEvent::Timeout { profile_id, phase } => {
                warn!("TIMEOUT | profile={} | waiting for {}", profile_id, phase);
            }
            LinkEvent::MalformedFrame { len } => {
                warn!("FRAME | malformed, {} bytes dropped", len);
            }
            LinkEvent::StateChanged {
                profile_id,
                from,
                to,
            } => {
                debug!("STATE | profile={} | {} -> {}", profile_id, from, to);
            }
            LinkEvent::Replaced {
                profile_id,
                old_kind,
                new_kind,
            } => {
                warn!(
                    "REPLACE | profile={} | {} record replaced by {}",
                    profile_id, old_kind, new_kind
                );
            }
        }
    }
}
