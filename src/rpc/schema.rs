//! Message schema — the typed contract carried inside each frame.
//!
//! ```text
//!   host ──▶ controller                 controller ──▶ host
//!  ┌──────────────────────────┐        ┌──────────────────────────┐
//!  │ Request                  │        │ Response                 │
//!  │  ├─ Registration         │        │  code: DEBUG|ERROR|      │
//!  │  │   profile_id + config │        │        ACK|DATA          │
//!  │  └─ Action               │        │  profile_id              │
//!  │      profile_id + cmd    │        │  payload (opaque bytes)  │
//!  └──────────────────────────┘        └──────────────────────────┘
//! ```
//!
//! Messages are serialized with postcard and COBS-stuffed, so an encoded
//! message never contains the 0x00 frame terminator. The kind-specific
//! shapes below are versioned together with the controller firmware.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// Registration payloads
// ---------------------------------------------------------------------------

/// Electrical mode of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinMode {
    Input,
    Output,
    InputPullup,
}

/// Logic level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn toggled(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

/// Hardware UART on the controller that bridges a sub-device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UartPort {
    Uart2,
    Uart3,
}

/// Kind-specific configuration sent when a profile is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileConfig {
    DigitalGeneric { pin: u8, mode: PinMode },
    UartTtlGeneric { port: UartPort, baudrate: u32 },
    ColorSensor,
    UltrasonicSensor { pin: u8 },
    StepMotor,
    McuDriver,
}

impl ProfileConfig {
    /// Short human-readable kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DigitalGeneric { .. } => "digital",
            Self::UartTtlGeneric { .. } => "uart",
            Self::ColorSensor => "color",
            Self::UltrasonicSensor { .. } => "ultrasonic",
            Self::StepMotor => "step_motor",
            Self::McuDriver => "mcu",
        }
    }
}

// ---------------------------------------------------------------------------
// Action payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigitalCommand {
    /// Drive the pin to a level.
    Write(Level),
    /// Sample the pin once.
    Read,
    /// Report back (DATA) once the pin reaches the given level.
    WatchEvent(Level),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UartCommand {
    /// Text forwarded verbatim to the bridged device.
    pub command: String,
    /// Completion is signalled by the bridged device rather than on send.
    pub event_triggered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepMode {
    /// Run continuously: -1 reverse, 0 stop, 1 forward.
    Direction(i8),
    /// Move a fixed number of steps (sign selects direction).
    Steps(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCommand {
    pub mode: StepMode,
    /// Minimum interval between steps, in microseconds.
    pub min_interval: u16,
    /// Hold completion (DATA) until the motion finishes.
    pub wait: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum McuAction {
    Version,
    Ram,
    Reset,
}

/// Kind-specific command carried by an [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileCommand {
    Digital(DigitalCommand),
    Uart(UartCommand),
    ColorRead,
    UltrasonicMeasure,
    Step(StepCommand),
    Mcu(McuAction),
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub profile_id: u8,
    pub config: ProfileConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub profile_id: u8,
    pub command: ProfileCommand,
}

/// Outbound message, host to controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    Registration(Registration),
    Action(Action),
}

impl Request {
    pub fn profile_id(&self) -> u8 {
        match self {
            Self::Registration(r) => r.profile_id,
            Self::Action(a) => a.profile_id,
        }
    }

    pub fn is_registration(&self) -> bool {
        matches!(self, Self::Registration(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResponseCode {
    Debug = 0,
    Error = 1,
    Ack = 2,
    Data = 3,
}

/// Inbound message, controller to host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub code: ResponseCode,
    pub profile_id: u8,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn new(code: ResponseCode, profile_id: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            profile_id,
            payload: payload.into(),
        }
    }

    /// Payload rendered as text, lossy on invalid UTF-8.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, SchemaError> {
    let mut out = postcard::to_allocvec_cobs(msg).map_err(|_| SchemaError::Encode)?;
    // The COBS sentinel doubles as the frame terminator; the codec adds it back.
    out.pop();
    Ok(out)
}

fn decode<T: for<'de> Deserialize<'de>>(frame: &[u8]) -> Result<T, SchemaError> {
    let mut buf = Vec::with_capacity(frame.len() + 1);
    buf.extend_from_slice(frame);
    buf.push(0);
    postcard::from_bytes_cobs(&mut buf).map_err(|_| SchemaError::Decode)
}

/// Serialize a request into a frame payload (no terminator).
pub fn encode_request(req: &Request) -> Result<Vec<u8>, SchemaError> {
    encode(req)
}

/// Parse a frame payload into a response.
pub fn decode_response(frame: &[u8]) -> Result<Response, SchemaError> {
    decode(frame)
}

/// Controller side: serialize a response into a frame payload.
pub fn encode_response(resp: &Response) -> Result<Vec<u8>, SchemaError> {
    encode(resp)
}

/// Controller side: parse a frame payload into a request.
pub fn decode_request(frame: &[u8]) -> Result<Request, SchemaError> {
    decode(frame)
}
