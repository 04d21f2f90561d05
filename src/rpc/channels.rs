//! Bounded event queue between the link core and a supervisor.
//!
//! Uses an `embassy-sync` bounded MPMC channel so the reader thread can
//! hand events to an application thread without blocking. When the
//! queue is full the event is dropped with a warning.
//!
//! ```text
//! ┌──────────────┐  LinkEvent   ┌──────────────┐
//! │ Reader /     │─────────────▶│  Supervisor  │
//! │ Dispatcher   │  try_send    │  recv()      │
//! └──────────────┘              └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::events::LinkEvent;
use crate::app::ports::EventSink;

/// Queue depth for link events.
pub const EVENT_DEPTH: usize = 32;

pub struct EventChannel {
    inner: Channel<CriticalSectionRawMutex, LinkEvent, EVENT_DEPTH>,
}

impl EventChannel {
    pub const fn new() -> Self {
        Self {
            inner: Channel::new(),
        }
    }

    /// Next queued event, if any.
    pub fn try_recv(&self) -> Option<LinkEvent> {
        self.inner.try_receive().ok()
    }

    /// Block the calling thread until an event is queued.
    pub fn recv(&self) -> LinkEvent {
        futures_lite::future::block_on(self.inner.receive())
    }

    /// Take every queued event.
    pub fn drain(&self) -> Vec<LinkEvent> {
        core::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventChannel {
    fn emit(&self, event: &LinkEvent) {
        if self.inner.try_send(event.clone()).is_err() {
            warn!("events: channel full, dropping {:?}", event);
        }
    }
}
