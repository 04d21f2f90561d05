//! Dispatch engine — sole writer to the transport, sole consumer of responses.
//!
//! ```text
//!  issuing flow                                   reader thread
//!  ────────────                                   ─────────────
//!  issue(profile, request)                        on_frame(bytes)
//!    │ await_ready (previous action done)              │
//!    │ lock writer slot ◀─ one BLOCKING                │ decode_response
//!    │ state := BLOCKING     command system-wide       ▼
//!    │ write frame + flush                        on_response(resp)
//!    │ wait while BLOCKING ◀──── condvar ────────── │ registry.get(id)
//!    │   (bounded; timeout ⇒ FAULTED)              │ peek → handler → commit
//!    ▼ release writer slot                         ▼ emit events
//! ```
//!
//! The writer slot is held for the whole BLOCKING phase, so two actions
//! never have frames interleaved on the wire and only one profile is ever
//! BLOCKING. Once a profile reaches WAITING the slot is released and other
//! profiles can be driven while it finishes in the background. A new
//! action for that same profile waits until it is IDLE again.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::app::events::LinkEvent;
use crate::app::ports::EventSink;
use crate::config::LinkConfig;
use crate::error::{CommsError, Error, Result};
use crate::profile::state;
use crate::profile::{Profile, ProfileState, Registry, WaitPhase};

use super::codec::encode_frame;
use super::schema::{self, Request, Response, ResponseCode};
use super::transport::Transport;

/// Bounds on the dispatcher's waits. A zero duration waits forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub ack: Duration,
    pub registration: Duration,
    pub completion: Duration,
}

impl Timeouts {
    pub fn from_config(config: &LinkConfig) -> Self {
        Self {
            ack: config.ack_timeout(),
            registration: config.registration_timeout(),
            completion: config.completion_timeout(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from_config(&LinkConfig::default())
    }
}

pub struct Dispatcher<W> {
    registry: Arc<Registry>,
    /// The transport's write half; also the system-wide BLOCKING slot.
    writer: Mutex<W>,
    sink: Arc<dyn EventSink>,
    timeouts: Timeouts,
}

impl<W: Transport> Dispatcher<W> {
    pub fn new(
        registry: Arc<Registry>,
        writer: W,
        sink: Arc<dyn EventSink>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            registry,
            writer: Mutex::new(writer),
            sink,
            timeouts,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn sink(&self) -> &dyn EventSink {
        &*self.sink
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    // ── Outbound ─────────────────────────────────────────────────

    /// Send `request` for `profile` and wait out its fast phase.
    ///
    /// Registrations return once the profile leaves UNREGISTERED. Actions
    /// first wait for the profile's previous action to complete, then
    /// return once it leaves BLOCKING. Concurrent callers queue on the
    /// writer slot.
    pub fn issue(&self, profile: &Profile, request: &Request) -> Result<()> {
        let frame = encode_frame(&schema::encode_request(request)?)?;
        let id = profile.id();
        let registration = request.is_registration();

        // Replies carry only the profile id: one outstanding action per profile.
        if !registration {
            self.await_ready(profile)?;
        }

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let prev = profile.state();
        let pending = if registration {
            ProfileState::Unregistered
        } else {
            // Another caller may have issued to this profile since `await_ready`.
            match prev {
                ProfileState::Unregistered => return Err(Error::NotRegistered(id)),
                s if !s.accepts_actions() => return Err(Error::Busy(id)),
                _ => ProfileState::Blocking,
            }
        };

        // Enter the pending state before writing so a fast reply is never missed.
        self.transition(profile, pending);
        if let Err(e) = write_frame(&mut *writer, &frame) {
            if profile.cell().compare_and_set(pending, prev) {
                self.emit_change(id, pending, prev);
            }
            return Err(e);
        }
        debug!("profile {}: {} byte frame written", id, frame.len());

        if registration {
            self.finish_registration(profile)
        } else {
            self.finish_ack(profile)
        }
    }

    fn finish_registration(&self, profile: &Profile) -> Result<()> {
        match profile.await_registered(self.timeouts.registration) {
            Ok(state) => {
                debug!("profile {}: registration complete, now {}", profile.id(), state);
                Ok(())
            }
            // The controller never confirmed it: stays UNREGISTERED.
            Err(e) if profile.state() == ProfileState::Unregistered => {
                self.report_timeout(profile.id(), WaitPhase::Registration);
                Err(e)
            }
            Err(_) => Ok(()),
        }
    }

    fn finish_ack(&self, profile: &Profile) -> Result<()> {
        match profile.await_not_blocking(self.timeouts.ack) {
            Ok(state) => {
                debug!("profile {}: acknowledgement complete, now {}", profile.id(), state);
                Ok(())
            }
            Err(e) if self.demote(profile, ProfileState::Blocking, WaitPhase::Ack) => Err(e),
            // Resolved between the timeout and the demotion attempt.
            Err(_) => Ok(()),
        }
    }

    /// Wait for `profile`'s last action to complete. A profile still
    /// WAITING when the completion wait expires is demoted to FAULTED.
    pub fn await_completion(&self, profile: &Profile) -> Result<ProfileState> {
        let err = match profile.await_idle(self.timeouts.completion) {
            Ok(state) => return Ok(state),
            Err(e) => e,
        };
        if self.demote(profile, ProfileState::Waiting, WaitPhase::Completion) {
            return Err(err);
        }
        match profile.state() {
            ProfileState::Blocking | ProfileState::Waiting => Err(err),
            settled => Ok(settled),
        }
    }

    /// Wait until `profile` can take a new action.
    pub fn await_ready(&self, profile: &Profile) -> Result<()> {
        match self.await_completion(profile)? {
            ProfileState::Unregistered => Err(Error::NotRegistered(profile.id())),
            _ => Ok(()),
        }
    }

    /// Move `profile` from `from` to FAULTED after an expired wait.
    /// Returns `false` if the profile already left `from`.
    fn demote(&self, profile: &Profile, from: ProfileState, phase: WaitPhase) -> bool {
        if !profile.cell().compare_and_set(from, ProfileState::Faulted) {
            return false;
        }
        self.emit_change(profile.id(), from, ProfileState::Faulted);
        self.report_timeout(profile.id(), phase);
        true
    }

    fn report_timeout(&self, profile_id: u8, phase: WaitPhase) {
        warn!("profile {}: timed out waiting for {}", profile_id, phase);
        self.sink.emit(&LinkEvent::Timeout { profile_id, phase });
    }

    fn transition(&self, profile: &Profile, to: ProfileState) {
        let from = profile.cell().set(to);
        self.emit_change(profile.id(), from, to);
    }

    fn emit_change(&self, profile_id: u8, from: ProfileState, to: ProfileState) {
        if from != to {
            debug!("profile {}: {} -> {}", profile_id, from, to);
            self.sink.emit(&LinkEvent::StateChanged {
                profile_id,
                from,
                to,
            });
        }
    }

    // ── Inbound ──────────────────────────────────────────────────

    /// Decode one frame and dispatch it. Malformed frames are reported
    /// and dropped.
    pub fn on_frame(&self, frame: &[u8]) {
        if frame.is_empty() {
            debug!("dispatcher: empty frame skipped");
            return;
        }
        match schema::decode_response(frame) {
            Ok(response) => self.on_response(&response),
            Err(e) => {
                warn!("dispatcher: {} ({} bytes)", e, frame.len());
                self.sink
                    .emit(&LinkEvent::MalformedFrame { len: frame.len() });
            }
        }
    }

    /// Apply one response to the registry. Never fails: unknown ids and
    /// device errors are reported through the event sink.
    pub fn on_response(&self, response: &Response) {
        let id = response.profile_id;
        match response.code {
            ResponseCode::Debug => {
                debug!("controller debug (profile {}): {}", id, response.payload_text());
                self.sink.emit(&LinkEvent::Debug {
                    profile_id: id,
                    message: response.payload_text(),
                });
            }
            ResponseCode::Error => {
                error!("controller error (profile {}): {}", id, response.payload_text());
                self.sink.emit(&LinkEvent::DeviceError {
                    profile_id: id,
                    message: response.payload_text(),
                });
            }
            ResponseCode::Ack | ResponseCode::Data => self.advance(response),
        }
    }

    fn advance(&self, response: &Response) {
        let id = response.profile_id;
        let Some(profile) = self.registry.get(id) else {
            warn!("dispatcher: {:?} for unknown profile {}, discarded", response.code, id);
            self.sink.emit(&LinkEvent::UnknownProfile {
                profile_id: id,
                code: response.code,
            });
            return;
        };

        // peek → handle → commit, under the state lock.
        let changed = profile.cell().update(|current| {
            let step = state::on_response(current, response.code)?;
            if step.deliver && !response.payload.is_empty() {
                profile.handle_data(&response.payload);
            }
            Some(step.next)
        });

        match changed {
            Some((from, to)) => {
                if from == ProfileState::Unregistered {
                    info!("profile {}: registration {:?} received", id, response.code);
                }
                self.emit_change(id, from, to);
            }
            None => debug!(
                "profile {}: unsolicited {:?} while {}",
                id,
                response.code,
                profile.state()
            ),
        }
    }
}

/// Write a whole frame, then flush.
fn write_frame<W: Transport>(writer: &mut W, frame: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < frame.len() {
        match writer.write(&frame[written..]) {
            Ok(0) => return Err(CommsError::ShortWrite.into()),
            Ok(n) => written += n,
            Err(e) => {
                warn!("dispatcher: transport write failed: {:?}", e);
                return Err(CommsError::WriteFailed.into());
            }
        }
    }
    writer.flush().map_err(|e| {
        warn!("dispatcher: transport flush failed: {:?}", e);
        Error::from(CommsError::FlushFailed)
    })
}
