//! RGB colour sensor.

use log::{info, warn};

use super::ProfileDriver;
use crate::app::service::Gateway;
use crate::error::Result;
use crate::rpc::schema::{ProfileCommand, ProfileConfig};
use crate::rpc::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parse the controller's `[r, b, g]` payload.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            [r, b, g] => Some(Self {
                r: *r,
                g: *g,
                b: *b,
            }),
            _ => None,
        }
    }

    /// Strongest channel; ties resolve red, then green, then blue.
    pub fn dominant(&self) -> Channel {
        if self.r >= self.g && self.r >= self.b {
            Channel::Red
        } else if self.g >= self.b {
            Channel::Green
        } else {
            Channel::Blue
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorSensor {
    last: Option<Rgb>,
}

impl ColorSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&mut self) -> ProfileCommand {
        self.last = None;
        ProfileCommand::ColorRead
    }

    pub fn last(&self) -> Option<Rgb> {
        self.last
    }
}

impl ProfileDriver for ColorSensor {
    fn config(&self) -> ProfileConfig {
        ProfileConfig::ColorSensor
    }

    fn handle_data(&mut self, profile_id: u8, payload: &[u8]) {
        match Rgb::from_payload(payload) {
            Some(rgb) => {
                info!(
                    "color[{}]: r={} g={} b={} ({:?})",
                    profile_id,
                    rgb.r,
                    rgb.g,
                    rgb.b,
                    rgb.dominant()
                );
                self.last = Some(rgb);
            }
            None => warn!("color[{}]: expected 3 bytes, got {}", profile_id, payload.len()),
        }
    }
}

// ── Gateway operations ───────────────────────────────────────

impl<W: Transport + Send + 'static> Gateway<W> {
    pub fn read_color(&self, id: u8) -> Result<Rgb> {
        self.query::<ColorSensor, _>(id, ColorSensor::read, |d| d.last())
    }
}
