//! Transport-agnostic request/response multiplexing.
//!
//! Requests and responses are postcard-encoded and COBS-framed, so every
//! frame on the wire ends with a single 0x00.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      Link Stack                            │
//! │                                                            │
//! │  ┌───────────┐   ┌──────────┐   ┌───────────────────────┐  │
//! │  │ Transport │──▶│  Codec   │──▶│  Engine (dispatcher)  │  │
//! │  │ (read)    │   │ (framing)│   │  → profile state      │  │
//! │  └───────────┘   └──────────┘   └───────────────────────┘  │
//! │       ▲   io_task thread               │        │          │
//! │       │                                │        ▼          │
//! │  ┌───────────┐   ┌──────────┐          │   ┌──────────┐    │
//! │  │ Transport │◀──│  Schema  │◀─────────┘   │ Channels │    │
//! │  │ (write)   │   │ (encode) │   issue()    │ (events) │    │
//! │  └───────────┘   └──────────┘              └──────────┘    │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod codec;
pub mod engine;
pub mod io_task;
pub mod schema;
pub mod transport;
