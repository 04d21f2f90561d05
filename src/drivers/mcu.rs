//! Management unit: firmware version, free RAM, reset.

use log::{info, warn};

use super::ProfileDriver;
use crate::app::service::Gateway;
use crate::error::Result;
use crate::rpc::schema::{McuAction, ProfileCommand, ProfileConfig};
use crate::rpc::transport::Transport;

/// RAM fitted to the controller.
pub const TOTAL_RAM_BYTES: u16 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamUsage {
    pub total: u16,
    pub free: u16,
}

impl RamUsage {
    /// Decode the two-byte report. Each byte carries seven bits with the
    /// MSB forced high so neither is the terminator.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        let [lo, hi] = <[u8; 2]>::try_from(payload).ok()?;
        let free = u16::from(lo & 0x7f) | (u16::from(hi & 0x7f) << 7);
        Some(Self {
            total: TOTAL_RAM_BYTES,
            free: free.min(TOTAL_RAM_BYTES),
        })
    }

    pub fn used(&self) -> u16 {
        self.total - self.free
    }

    pub fn used_percent(&self) -> f32 {
        f32::from(self.used()) * 100.0 / f32::from(self.total)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct McuDriver {
    /// The DATA format depends on which request is outstanding.
    pending: Option<McuAction>,
    version: Option<String>,
    ram: Option<RamUsage>,
}

impl McuDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, action: McuAction) -> ProfileCommand {
        self.pending = Some(action);
        match action {
            McuAction::Version => self.version = None,
            McuAction::Ram => self.ram = None,
            McuAction::Reset => {}
        }
        ProfileCommand::Mcu(action)
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn ram(&self) -> Option<RamUsage> {
        self.ram
    }
}

impl ProfileDriver for McuDriver {
    fn config(&self) -> ProfileConfig {
        ProfileConfig::McuDriver
    }

    fn handle_data(&mut self, profile_id: u8, payload: &[u8]) {
        match self.pending.take() {
            Some(McuAction::Version) => {
                let version = String::from_utf8_lossy(payload).into_owned();
                info!("mcu[{}]: firmware version {}", profile_id, version);
                self.version = Some(version);
            }
            Some(McuAction::Ram) => match RamUsage::from_payload(payload) {
                Some(ram) => {
                    info!(
                        "mcu[{}]: RAM {:.1}% used ({} of {} bytes free)",
                        profile_id,
                        ram.used_percent(),
                        ram.free,
                        ram.total
                    );
                    self.ram = Some(ram);
                }
                None => warn!("mcu[{}]: malformed RAM report {:02x?}", profile_id, payload),
            },
            Some(McuAction::Reset) | None => {
                warn!("mcu[{}]: unexpected data {:02x?}", profile_id, payload);
            }
        }
    }
}

// ── Gateway operations ───────────────────────────────────────

impl<W: Transport + Send + 'static> Gateway<W> {
    pub fn mcu_version(&self, id: u8) -> Result<String> {
        self.query::<McuDriver, _>(
            id,
            |d| d.request(McuAction::Version),
            |d| d.version().map(str::to_owned),
        )
    }

    pub fn mcu_ram(&self, id: u8) -> Result<RamUsage> {
        self.query::<McuDriver, _>(id, |d| d.request(McuAction::Ram), |d| d.ram())
    }

    pub fn mcu_reset(&self, id: u8) -> Result<()> {
        self.act::<McuDriver>(id, |d| d.request(McuAction::Reset))
            .map(|_| info!("mcu[{}]: reset requested", id))
    }
}
