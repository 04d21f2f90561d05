//! Application core — the link gateway and its port boundary.
//!
//! The [`service::Gateway`] ties the profile registry, the dispatcher and
//! the reader thread together. Everything it touches outside the process
//! goes through a **port trait** defined in [`ports`] or through
//! [`crate::rpc::transport::Transport`], so the whole core runs against
//! in-memory transports in tests.

pub mod events;
pub mod ports;
pub mod service;
