//! Port traits — the hexagonal boundary between the link core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Gateway / Dispatcher (core)
//! ```
//!
//! Driven adapters (event sinks, config storage) implement these traits.
//! The byte transport has its own port in [`crate::rpc::transport`].
//! All port errors are typed — callers must handle every variant explicitly.

use crate::config::LinkConfig;

use super::events::LinkEvent;

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: core → logging / supervision)
// ───────────────────────────────────────────────────────────────

/// The core emits [`LinkEvent`]s through this port. It is called from
/// both the issuing flow and the reader thread, so it must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &LinkEvent);
}

/// Discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &LinkEvent) {}
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: core ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists link configuration.
///
/// Implementations validate before persisting and reject invalid values
/// with [`ConfigError::ValidationFailed`] instead of clamping them.
pub trait ConfigPort {
    fn load(&self) -> Result<LinkConfig, ConfigError>;

    fn save(&self, config: &LinkConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No stored config.
    NotFound,
    /// Stored config could not be parsed.
    Corrupted(String),
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted(msg) => write!(f, "config corrupted: {}", msg),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
