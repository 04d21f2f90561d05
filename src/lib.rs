//! linkmux — host-side multiplexer for peripheral profiles on one serial link.
//!
//! Many logical peripherals ("profiles") share a single byte stream to a
//! microcontroller. Each profile is registered once, then driven with
//! actions; the controller answers every frame with ACK, DATA, DEBUG or
//! ERROR responses tagged with the profile id.
//!
//! Everything except the serial adapter is transport-agnostic.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod profile;
pub mod rpc;

pub use app::service::Gateway;
pub use error::{Error, Result};
