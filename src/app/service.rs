//! Gateway — the context object for one serial link.
//!
//! [`Gateway`] owns the profile registry, the dispatcher and the reader
//! thread. Nothing is global: several gateways (one per link) can live
//! in one process, and each can be driven by an in-memory transport in
//! tests.
//!
//! ```text
//!  caller ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!             │          Gateway             │
//!             │  Registry · Dispatcher       │
//!             │  ReaderHandle (link-reader)  │
//!             └──────────────────────────────┘
//!                  │ write            ▲ read
//!                  ▼                  │
//!                     Transport (W / R)
//! ```
//!
//! Kind-specific operations (`write_digital`, `read_color`, ...) are
//! defined next to each driver in [`crate::drivers`].

use std::sync::Arc;

use log::{info, warn};

use crate::config::{LinkConfig, ProfileSpec};
use crate::drivers::{Driver, DriverKind};
use crate::error::{Error, Result, SchemaError};
use crate::profile::{Profile, ProfileState, Registry};
use crate::rpc::engine::{Dispatcher, Timeouts};
use crate::rpc::io_task::{self, ReaderHandle};
use crate::rpc::schema::ProfileCommand;
use crate::rpc::transport::Transport;

use super::events::LinkEvent;
use super::ports::EventSink;

// ───────────────────────────────────────────────────────────────
// Gateway
// ───────────────────────────────────────────────────────────────

pub struct Gateway<W> {
    dispatcher: Arc<Dispatcher<W>>,
    reader: Option<ReaderHandle>,
}

impl<W: Transport + Send + 'static> Gateway<W> {
    /// Validate `config` and start the reader thread on `reader`.
    ///
    /// `reader` and `writer` are two handles onto the same link. The
    /// registry starts empty.
    pub fn start<R>(
        reader: R,
        writer: W,
        config: &LinkConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self>
    where
        R: Transport + 'static,
    {
        config.validate().map_err(Error::Config)?;

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(Registry::new()),
            writer,
            sink,
            Timeouts::from_config(config),
        ));
        let reader = io_task::spawn(
            reader,
            Arc::clone(&dispatcher),
            config.read_buf_size,
            config.max_frame_size,
        )?;

        info!(
            "gateway: link up (ack {} ms, completion {} ms)",
            config.ack_timeout_ms, config.completion_timeout_ms
        );
        Ok(Self {
            dispatcher,
            reader: Some(reader),
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.dispatcher.registry()
    }

    pub fn dispatcher(&self) -> &Dispatcher<W> {
        &self.dispatcher
    }

    // ── Profiles ──────────────────────────────────────────────

    /// Add an unregistered profile, replacing any record with the same id.
    pub fn add_profile(&self, id: u8, driver: impl Into<Driver>) -> Arc<Profile> {
        let profile = Arc::new(Profile::new(id, driver));
        if let Some(old) = self.registry().upsert(Arc::clone(&profile)) {
            warn!(
                "gateway: profile {} replaced ({} -> {}), old record discarded",
                id,
                old.kind(),
                profile.kind()
            );
            self.dispatcher.sink().emit(&LinkEvent::Replaced {
                profile_id: id,
                old_kind: old.kind(),
                new_kind: profile.kind(),
            });
        }
        profile
    }

    /// Add every configured profile in declaration order.
    pub fn add_configured_profiles(&self, specs: &[ProfileSpec]) {
        for spec in specs {
            self.add_profile(spec.id, spec.driver.clone());
        }
    }

    pub fn remove_profile(&self, id: u8) -> Option<Arc<Profile>> {
        self.registry().remove(id)
    }

    pub fn profile(&self, id: u8) -> Result<Arc<Profile>> {
        self.registry().get(id).ok_or(Error::UnknownProfile(id))
    }

    pub fn state(&self, id: u8) -> Option<ProfileState> {
        self.registry().get(id).map(|p| p.state())
    }

    // ── Registration ──────────────────────────────────────────

    /// Register one profile and wait until the controller accepts it.
    pub fn register(&self, id: u8) -> Result<()> {
        let profile = self.profile(id)?;
        info!("gateway: registration sent for profile {} ({})", id, profile.kind());
        self.dispatcher.issue(&profile, &profile.registration())
    }

    /// Register every profile in registry order. Keeps going past
    /// failures and returns the first one.
    pub fn register_all(&self) -> Result<()> {
        let mut first_err = None;
        for profile in self.registry().all() {
            info!(
                "gateway: registration sent for profile {} ({})",
                profile.id(),
                profile.kind()
            );
            if let Err(e) = self.dispatcher.issue(&profile, &profile.registration()) {
                warn!("gateway: profile {} registration failed: {}", profile.id(), e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    // ── Actions ───────────────────────────────────────────────

    /// Issue a raw command. Returns once the controller has acknowledged it.
    pub fn issue_action(&self, id: u8, command: ProfileCommand) -> Result<()> {
        let profile = self.profile(id)?;
        self.dispatcher.issue(&profile, &profile.action(command))
    }

    /// Wait until the profile's last action has completed.
    pub fn await_idle(&self, id: u8) -> Result<ProfileState> {
        let profile = self.profile(id)?;
        self.wait_idle(&profile)
    }

    fn wait_idle(&self, profile: &Profile) -> Result<ProfileState> {
        self.dispatcher.await_completion(profile)
    }

    /// Build a command with the kind-`D` driver and issue it.
    ///
    /// The command is built only once the profile's previous action has
    /// completed, so its data handler never sees a half-replaced request.
    pub(crate) fn act<D: DriverKind>(
        &self,
        id: u8,
        build: impl FnOnce(&mut D) -> ProfileCommand,
    ) -> Result<Arc<Profile>> {
        let profile = self.profile(id)?;
        self.dispatcher.await_ready(&profile)?;
        let command = profile.with_driver::<D, _>(build)?;
        self.dispatcher.issue(&profile, &profile.action(command))?;
        Ok(profile)
    }

    /// Issue a command, wait for completion and read back the value the
    /// data handler stored. A completion without a usable payload is a
    /// decode error.
    pub(crate) fn query<D: DriverKind, T>(
        &self,
        id: u8,
        prepare: impl FnOnce(&mut D) -> ProfileCommand,
        read: impl FnOnce(&mut D) -> Option<T>,
    ) -> Result<T> {
        let profile = self.act::<D>(id, prepare)?;
        self.wait_idle(&profile)?;
        profile
            .with_driver::<D, _>(read)?
            .ok_or(Error::Schema(SchemaError::Decode))
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Stop and join the reader thread.
    pub fn shutdown(mut self) {
        if let Some(reader) = self.reader.take() {
            reader.stop();
        }
        info!("gateway: link down");
    }
}
