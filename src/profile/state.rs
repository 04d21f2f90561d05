//! Per-profile lifecycle state and its synchronisation cell.
//!
//! ```text
//!                  ACK                         DATA
//!  UNREGISTERED ──────────▶ WAITING ◀──┐  ┌───────────▶ IDLE
//!       │                     │  ▲     │  │               │
//!       │ DATA                │  │ ACK │  │ DATA          │ issue()
//!       ▼                     │  │     │  │               ▼
//!      IDLE ◀─────────────────┘  └─ BLOCKING ◀────────────┘
//!                    DATA            │
//!                                    │ ACK/completion timeout
//!                                    ▼
//!                                 FAULTED ── ACK ▶ WAITING, DATA ▶ IDLE
//! ```
//!
//! Only inbound ACK/DATA responses move a profile forward. The issuing
//! flow may only move a profile *into* BLOCKING (or back out on a failed
//! write) and into FAULTED on timeout. A registration that times out
//! leaves the profile UNREGISTERED.

use core::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::rpc::schema::ResponseCode;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ProfileState {
    /// Not yet known to the controller.
    Unregistered = 0,
    /// Ready for a new action.
    Idle = 1,
    /// Action written; waiting for the controller's fast ACK.
    Blocking = 2,
    /// Acknowledged; the controller is completing the operation.
    Waiting = 3,
    /// An action's bounded wait expired; a late ACK/DATA still resolves it.
    Faulted = 4,
}

impl ProfileState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Unregistered => "UNREGISTERED",
            Self::Idle => "IDLE",
            Self::Blocking => "BLOCKING",
            Self::Waiting => "WAITING",
            Self::Faulted => "FAULTED",
        }
    }

    /// Whether a new action may be issued from this state.
    pub fn accepts_actions(self) -> bool {
        matches!(self, Self::Idle | Self::Faulted)
    }
}

impl fmt::Display for ProfileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which bounded wait expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPhase {
    Registration,
    Ack,
    Completion,
}

impl fmt::Display for WaitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registration => f.write_str("registration"),
            Self::Ack => f.write_str("acknowledgement"),
            Self::Completion => f.write_str("completion"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Outcome of applying one inbound response code to a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub next: ProfileState,
    /// Hand the payload (if non-empty) to the profile's data handler.
    pub deliver: bool,
}

/// Apply an inbound response code to `current`.
///
/// Returns `None` when the code does not affect profile state (DEBUG,
/// ERROR, or a DATA that arrives while IDLE).
pub fn on_response(current: ProfileState, code: ResponseCode) -> Option<Step> {
    use ProfileState::{Blocking, Faulted, Idle, Unregistered, Waiting};

    match (current, code) {
        (_, ResponseCode::Debug | ResponseCode::Error) => None,
        (_, ResponseCode::Ack) => Some(Step {
            next: Waiting,
            deliver: false,
        }),
        (Unregistered, ResponseCode::Data) => Some(Step {
            next: Idle,
            deliver: false,
        }),
        (Idle, ResponseCode::Data) => None,
        (Blocking | Waiting | Faulted, ResponseCode::Data) => Some(Step {
            next: Idle,
            deliver: true,
        }),
    }
}

// ---------------------------------------------------------------------------
// State cell
// ---------------------------------------------------------------------------

/// Mutex-guarded state with a condition variable for wake-ups.
///
/// Every state write notifies all waiters; waiters re-check their own
/// predicate, so one cell serves every wait primitive.
pub struct StateCell {
    state: Mutex<ProfileState>,
    changed: Condvar,
}

impl StateCell {
    pub fn new(initial: ProfileState) -> Self {
        Self {
            state: Mutex::new(initial),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProfileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> ProfileState {
        *self.lock()
    }

    /// Store `next` and wake every waiter. Returns the previous state.
    pub fn set(&self, next: ProfileState) -> ProfileState {
        let mut guard = self.lock();
        let prev = core::mem::replace(&mut *guard, next);
        drop(guard);
        self.changed.notify_all();
        prev
    }

    /// Store `next` only if the state currently equals `expected`.
    pub fn compare_and_set(&self, expected: ProfileState, next: ProfileState) -> bool {
        let mut guard = self.lock();
        if *guard != expected {
            return false;
        }
        *guard = next;
        drop(guard);
        self.changed.notify_all();
        true
    }

    /// Run `f` on the current state under the lock and store the state it
    /// returns. Returns `(from, to)` when a state was stored.
    ///
    /// Waiters are woken only after `f` returns, so side effects of `f`
    /// are visible to anyone who observes `to`.
    pub fn update<F>(&self, f: F) -> Option<(ProfileState, ProfileState)>
    where
        F: FnOnce(ProfileState) -> Option<ProfileState>,
    {
        let mut guard = self.lock();
        let from = *guard;
        let to = f(from)?;
        *guard = to;
        drop(guard);
        self.changed.notify_all();
        Some((from, to))
    }

    /// Block while `keep_waiting(state)` holds.
    ///
    /// A zero `timeout` waits forever. Returns the state that ended the
    /// wait, or `None` if the timeout expired first.
    pub fn wait_while<F>(&self, timeout: Duration, mut keep_waiting: F) -> Option<ProfileState>
    where
        F: FnMut(ProfileState) -> bool,
    {
        let guard = self.lock();
        if timeout.is_zero() {
            let guard = self
                .changed
                .wait_while(guard, |s| keep_waiting(*s))
                .unwrap_or_else(PoisonError::into_inner);
            return Some(*guard);
        }

        let (guard, result) = self
            .changed
            .wait_timeout_while(guard, timeout, |s| keep_waiting(*s))
            .unwrap_or_else(PoisonError::into_inner);
        if result.timed_out() && keep_waiting(*guard) {
            None
        } else {
            Some(*guard)
        }
    }
}
