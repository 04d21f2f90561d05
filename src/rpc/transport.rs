//! Transport abstraction — any byte-oriented channel.
//!
//! Concrete implementations:
//! - USB/UART serial ([`crate::adapters::serial`], feature `serial`)
//! - in-memory pipes in the integration tests
//!
//! The dispatcher and reader loop are generic over `Transport`, so adding
//! a new link requires zero changes to the multiplexing logic. A link is
//! used through two handles: one owned by the reader thread, one by the
//! dispatcher's writer slot.

/// Byte-oriented transport channel.
pub trait Transport: Send {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns the number of bytes actually read; 0 if nothing arrived
    /// before the transport's read timeout.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data` to the transport.
    /// Returns the number of bytes actually written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// A null transport that discards all writes and never reads.
/// Useful for driving the dispatcher without a peer attached.
pub struct NullTransport;

impl Transport for NullTransport {
    type Error = ();

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}
