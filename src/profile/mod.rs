//! Profiles — logical peripherals addressed by a `u8` id.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Profile                                     │
//! │  ┌──────┐  ┌─────────────────┐  ┌─────────┐  │
//! │  │  id  │  │ StateCell       │  │ Driver  │  │
//! │  │ (u8) │  │ Mutex + Condvar │  │ (kind)  │  │
//! │  └──────┘  └─────────────────┘  └─────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The state cell is written by the dispatcher only; the driver is
//! mutated by its own operations and by its data handler, which the
//! dispatcher invokes while the state cell is locked.

pub mod registry;
pub mod state;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;

use crate::drivers::{Driver, DriverKind, ProfileDriver};
use crate::error::{Error, Result};
use crate::rpc::schema::{Action, ProfileCommand, Registration, Request};

pub use registry::Registry;
pub use state::{ProfileState, StateCell, WaitPhase};

pub struct Profile {
    id: u8,
    state: StateCell,
    driver: Mutex<Driver>,
}

impl Profile {
    /// A fresh, unregistered profile.
    pub fn new(id: u8, driver: impl Into<Driver>) -> Self {
        Self {
            id,
            state: StateCell::new(ProfileState::Unregistered),
            driver: Mutex::new(driver.into()),
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        self.driver().kind()
    }

    pub fn state(&self) -> ProfileState {
        self.state.get()
    }

    pub(crate) fn cell(&self) -> &StateCell {
        &self.state
    }

    /// Lock the driver. Never hold the guard across an issue or a wait.
    pub fn driver(&self) -> MutexGuard<'_, Driver> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the driver if it is of kind `D`.
    pub fn with_driver<D, R>(&self, f: impl FnOnce(&mut D) -> R) -> Result<R>
    where
        D: DriverKind,
    {
        let mut guard = self.driver();
        match D::from_driver_mut(&mut guard) {
            Some(d) => Ok(f(d)),
            None => Err(Error::KindMismatch {
                profile_id: self.id,
                expected: D::KIND,
            }),
        }
    }

    pub fn registration(&self) -> Request {
        Request::Registration(Registration {
            profile_id: self.id,
            config: self.driver().config(),
        })
    }

    pub fn action(&self, command: ProfileCommand) -> Request {
        Request::Action(Action {
            profile_id: self.id,
            command,
        })
    }

    pub(crate) fn handle_data(&self, payload: &[u8]) {
        debug!("profile {}: data handler, {} bytes", self.id, payload.len());
        self.driver().handle_data(self.id, payload);
    }

    // ── Wait primitives ──────────────────────────────────────────
    //
    // A zero timeout waits forever.

    /// Wait until the controller has accepted the registration.
    pub fn await_registered(&self, timeout: Duration) -> Result<ProfileState> {
        self.wait(timeout, WaitPhase::Registration, |s| {
            s == ProfileState::Unregistered
        })
    }

    /// Wait for the fast ACK of the last issued action.
    pub fn await_not_blocking(&self, timeout: Duration) -> Result<ProfileState> {
        self.wait(timeout, WaitPhase::Ack, |s| s == ProfileState::Blocking)
    }

    /// Wait until the last issued action has completed.
    pub fn await_idle(&self, timeout: Duration) -> Result<ProfileState> {
        self.wait(timeout, WaitPhase::Completion, |s| {
            matches!(s, ProfileState::Blocking | ProfileState::Waiting)
        })
    }

    fn wait(
        &self,
        timeout: Duration,
        phase: WaitPhase,
        keep_waiting: impl FnMut(ProfileState) -> bool,
    ) -> Result<ProfileState> {
        self.state
            .wait_while(timeout, keep_waiting)
            .ok_or(Error::Timeout {
                profile_id: self.id,
                phase,
            })
    }
}

impl core::fmt::Debug for Profile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Profile")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("state", &self.state())
            .finish()
    }
}
