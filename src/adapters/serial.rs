//! Serial port transport (USB CDC / UART).
//!
//! Wraps a [`serialport::SerialPort`]. The port's read timeout bounds each
//! read of the reader thread; an expired timeout is reported as an empty
//! read rather than an error.

use std::io::{self, Read, Write};

use log::info;
use serialport::SerialPort;

use crate::config::LinkConfig;
use crate::rpc::transport::Transport;

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open the port named in `config` with its baud rate and read timeout.
    pub fn open(config: &LinkConfig) -> serialport::Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout())
            .open()?;
        info!(
            "serial: opened {} at {} baud",
            config.port, config.baud_rate
        );
        Ok(Self { port })
    }

    /// A second handle onto the same port, for the reader thread.
    pub fn try_clone(&self) -> serialport::Result<Self> {
        Ok(Self {
            port: self.port.try_clone()?,
        })
    }

    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl Transport for SerialTransport {
    type Error = io::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, io::Error> {
        self.port.write(data)
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        self.port.flush()
    }
}
