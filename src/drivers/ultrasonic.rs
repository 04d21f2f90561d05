//! Single-pin ultrasonic range finder.

use log::{info, warn};

use super::ProfileDriver;
use crate::app::service::Gateway;
use crate::error::Result;
use crate::rpc::schema::{ProfileCommand, ProfileConfig};
use crate::rpc::transport::Transport;

#[derive(Debug, Clone, PartialEq)]
pub struct UltrasonicSensor {
    pin: u8,
    last_cm: Option<u16>,
}

impl UltrasonicSensor {
    pub fn new(pin: u8) -> Self {
        Self { pin, last_cm: None }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn measure(&mut self) -> ProfileCommand {
        self.last_cm = None;
        ProfileCommand::UltrasonicMeasure
    }

    pub fn last_cm(&self) -> Option<u16> {
        self.last_cm
    }
}

impl ProfileDriver for UltrasonicSensor {
    fn config(&self) -> ProfileConfig {
        ProfileConfig::UltrasonicSensor { pin: self.pin }
    }

    fn handle_data(&mut self, profile_id: u8, payload: &[u8]) {
        match <[u8; 2]>::try_from(payload) {
            Ok(raw) => {
                let cm = u16::from_be_bytes(raw);
                info!("ultrasonic[{}]: distance {} cm", profile_id, cm);
                self.last_cm = Some(cm);
            }
            Err(_) => warn!(
                "ultrasonic[{}]: expected 2 bytes, got {}",
                profile_id,
                payload.len()
            ),
        }
    }
}

// ── Gateway operations ───────────────────────────────────────

impl<W: Transport + Send + 'static> Gateway<W> {
    /// Trigger a measurement and return the distance in centimetres.
    pub fn measure_distance(&self, id: u8) -> Result<u16> {
        self.query::<UltrasonicSensor, _>(id, UltrasonicSensor::measure, |d| d.last_cm())
    }
}
