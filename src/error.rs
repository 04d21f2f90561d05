//! Unified error types for the link multiplexer.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! caller-facing error handling uniform. All variants are `Copy` so they
//! can be handed across the issuing and reading flows without allocation.

use core::fmt;

use crate::profile::state::WaitPhase;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible gateway operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A payload could not be framed for the wire.
    Frame(FrameError),
    /// A message could not be serialized or deserialized.
    Schema(SchemaError),
    /// The transport rejected a read or write.
    Comms(CommsError),
    /// A bounded wait expired before the profile changed state.
    Timeout { profile_id: u8, phase: WaitPhase },
    /// No profile with this id is registered.
    UnknownProfile(u8),
    /// The profile has not completed registration on the controller.
    NotRegistered(u8),
    /// The profile's previous action has not completed yet.
    Busy(u8),
    /// The profile exists but is of a different kind than the operation needs.
    KindMismatch {
        profile_id: u8,
        expected: &'static str,
    },
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "frame: {e}"),
            Self::Schema(e) => write!(f, "schema: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Timeout { profile_id, phase } => {
                write!(f, "profile {profile_id}: timed out waiting for {phase}")
            }
            Self::UnknownProfile(id) => write!(f, "profile {id} not found"),
            Self::NotRegistered(id) => write!(f, "profile {id} is not registered"),
            Self::Busy(id) => write!(f, "profile {id} is still completing an action"),
            Self::KindMismatch {
                profile_id,
                expected,
            } => write!(f, "profile {profile_id} is not a {expected} profile"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Framing errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The payload contains the 0x00 terminator and would split on the wire.
    TerminatorInPayload,
    /// The payload exceeds the configured maximum frame size.
    Oversized,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TerminatorInPayload => write!(f, "payload contains the frame terminator"),
            Self::Oversized => write!(f, "payload exceeds maximum frame size"),
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Schema errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaError {
    /// Serialization of an outbound message failed.
    Encode,
    /// An inbound frame is not a valid message.
    Decode,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "message encode failed"),
            Self::Decode => write!(f, "message decode failed"),
        }
    }
}

impl From<SchemaError> for Error {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    WriteFailed,
    FlushFailed,
    /// The transport accepted zero bytes of a pending frame.
    ShortWrite,
    /// The reader thread could not be started.
    ReaderSpawn,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed => write!(f, "transport write failed"),
            Self::FlushFailed => write!(f, "transport flush failed"),
            Self::ShortWrite => write!(f, "transport stopped accepting bytes"),
            Self::ReaderSpawn => write!(f, "reader thread spawn failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
