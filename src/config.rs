//! Link configuration parameters
//!
//! All tunable parameters for one serial link and the profiles registered
//! on it. Loaded from JSON through [`ConfigPort`](crate::app::ports::ConfigPort).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rpc::schema::ProfileConfig;

/// A profile declared in the configuration, registered at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub id: u8,
    pub driver: ProfileConfig,
}

/// Core link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    // --- Transport ---
    /// Serial device path
    pub port: String,
    /// Line speed (bits/s)
    pub baud_rate: u32,
    /// Transport read timeout (milliseconds)
    pub read_timeout_ms: u64,
    /// Delay after opening the port; the controller resets on connect (milliseconds)
    pub startup_delay_ms: u64,

    // --- Waits (0 = wait forever) ---
    /// Wait for the fast ACK of an action (milliseconds)
    pub ack_timeout_ms: u64,
    /// Wait for a registration to be accepted (milliseconds)
    pub registration_timeout_ms: u64,
    /// Wait for a query to complete (milliseconds)
    pub completion_timeout_ms: u64,

    // --- Buffers ---
    /// Bytes pulled from the transport per read
    pub read_buf_size: usize,
    /// Largest accepted inbound frame (bytes)
    pub max_frame_size: usize,

    // --- Profiles ---
    pub profiles: Vec<ProfileSpec>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            // Transport
            port: String::from("/dev/ttyACM0"),
            baud_rate: 115_200,
            read_timeout_ms: 1000,
            startup_delay_ms: 3000,

            // Waits
            ack_timeout_ms: 5000,
            registration_timeout_ms: 5000,
            completion_timeout_ms: 30_000, // slow motions

            // Buffers
            read_buf_size: 256,
            max_frame_size: 1024,

            profiles: Vec::new(),
        }
    }
}

/// Smallest frame cap that still fits every request and response shape.
pub const MIN_FRAME_SIZE: usize = 16;

impl LinkConfig {
    /// Reject values the link cannot run with.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.baud_rate == 0 {
            return Err("baud_rate must be non-zero");
        }
        if self.read_buf_size == 0 {
            return Err("read_buf_size must be non-zero");
        }
        if self.max_frame_size < MIN_FRAME_SIZE {
            return Err("max_frame_size must be at least 16 bytes");
        }
        Ok(())
    }

    /// Ids declared more than once, in first-seen order. Later
    /// declarations replace earlier ones at startup.
    pub fn duplicate_ids(&self) -> Vec<u8> {
        let mut seen = [false; 256];
        let mut dups = Vec::new();
        for spec in &self.profiles {
            let slot = &mut seen[usize::from(spec.id)];
            if *slot && !dups.contains(&spec.id) {
                dups.push(spec.id);
            }
            *slot = true;
        }
        dups
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_millis(self.registration_timeout_ms)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }
}
