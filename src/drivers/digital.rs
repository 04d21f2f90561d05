//! Generic digital pin (LED, button, relay).

use log::{info, warn};

use super::ProfileDriver;
use crate::app::service::Gateway;
use crate::error::Result;
use crate::rpc::schema::{DigitalCommand, Level, PinMode, ProfileCommand, ProfileConfig};
use crate::rpc::transport::Transport;

/// DATA byte for a pin level; offset by one so it is never the terminator.
pub fn level_from_byte(byte: u8) -> Option<Level> {
    match byte {
        1 => Some(Level::Low),
        2 => Some(Level::High),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DigitalGeneric {
    pin: u8,
    mode: PinMode,
    /// Last level written or reported.
    pin_state: Option<Level>,
    /// Level from the most recent read/watch DATA.
    last_read: Option<Level>,
}

impl DigitalGeneric {
    pub fn new(pin: u8, mode: PinMode) -> Self {
        Self {
            pin,
            mode,
            pin_state: None,
            last_read: None,
        }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn mode(&self) -> PinMode {
        self.mode
    }

    pub fn pin_state(&self) -> Option<Level> {
        self.pin_state
    }

    pub fn write(level: Level) -> ProfileCommand {
        ProfileCommand::Digital(DigitalCommand::Write(level))
    }

    /// Build a read and forget the previous sample.
    pub fn read(&mut self) -> ProfileCommand {
        self.last_read = None;
        ProfileCommand::Digital(DigitalCommand::Read)
    }

    pub fn watch(trigger: Level) -> ProfileCommand {
        ProfileCommand::Digital(DigitalCommand::WatchEvent(trigger))
    }

    pub(crate) fn record_written(&mut self, level: Level) {
        self.pin_state = Some(level);
    }

    pub(crate) fn take_read(&mut self) -> Option<Level> {
        self.last_read.take()
    }
}

impl ProfileDriver for DigitalGeneric {
    fn config(&self) -> ProfileConfig {
        ProfileConfig::DigitalGeneric {
            pin: self.pin,
            mode: self.mode,
        }
    }

    fn handle_data(&mut self, profile_id: u8, payload: &[u8]) {
        match payload.first().copied().and_then(level_from_byte) {
            Some(level) => {
                info!("digital[{}]: pin {} is {:?}", profile_id, self.pin, level);
                self.pin_state = Some(level);
                self.last_read = Some(level);
            }
            None => warn!("digital[{}]: unexpected payload {:02x?}", profile_id, payload),
        }
    }
}

// ── Gateway operations ───────────────────────────────────────

impl<W: Transport + Send + 'static> Gateway<W> {
    /// Drive a digital output. `pin_state` is recorded once the write is
    /// acknowledged.
    pub fn write_digital(&self, id: u8, level: Level) -> Result<()> {
        let profile = self.act::<DigitalGeneric>(id, |_| DigitalGeneric::write(level))?;
        info!("digital[{}]: {:?} sent", id, level);
        profile.with_driver::<DigitalGeneric, _>(|d| d.record_written(level))
    }

    /// Flip the last known level (LOW if never written). Returns the new level.
    pub fn toggle_digital(&self, id: u8) -> Result<Level> {
        let profile = self.profile(id)?;
        let next = profile.with_driver::<DigitalGeneric, _>(|d| {
            d.pin_state().unwrap_or(Level::Low).toggled()
        })?;
        self.write_digital(id, next)?;
        Ok(next)
    }

    /// Sample the pin and wait for the controller to report its level.
    pub fn read_digital(&self, id: u8) -> Result<Level> {
        self.query::<DigitalGeneric, _>(id, DigitalGeneric::read, DigitalGeneric::take_read)
    }

    /// Ask the controller to report once the pin reaches `trigger`. The
    /// report arrives as DATA and updates `pin_state`.
    pub fn watch_digital(&self, id: u8, trigger: Level) -> Result<()> {
        self.act::<DigitalGeneric>(id, |_| DigitalGeneric::watch(trigger))
            .map(|_| info!("digital[{}]: watching for {:?}", id, trigger))
    }
}
