//! UART-TTL bridge to a sub-controller (e.g. a robot arm speaking G-code).

use std::collections::VecDeque;

use log::info;

use super::ProfileDriver;
use crate::app::service::Gateway;
use crate::error::Result;
use crate::rpc::schema::{ProfileCommand, ProfileConfig, UartCommand, UartPort};
use crate::rpc::transport::Transport;

#[derive(Debug, Clone, PartialEq)]
pub struct UartTtlGeneric {
    port: UartPort,
    baudrate: u32,
    /// Commands waiting for [`Gateway::send_next_uart`].
    queue: VecDeque<UartCommand>,
    last_response: Option<String>,
}

impl UartTtlGeneric {
    pub fn new(port: UartPort, baudrate: u32) -> Self {
        Self {
            port,
            baudrate,
            queue: VecDeque::new(),
            last_response: None,
        }
    }

    pub fn port(&self) -> UartPort {
        self.port
    }

    pub fn baudrate(&self) -> u32 {
        self.baudrate
    }

    pub fn command(text: impl Into<String>, event_triggered: bool) -> ProfileCommand {
        ProfileCommand::Uart(UartCommand {
            command: text.into(),
            event_triggered,
        })
    }

    /// Replace the pending command list.
    pub fn set_queue(&mut self, commands: impl IntoIterator<Item = UartCommand>) {
        self.queue = commands.into_iter().collect();
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn pop_next(&mut self) -> Option<UartCommand> {
        self.queue.pop_front()
    }

    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }
}

impl ProfileDriver for UartTtlGeneric {
    fn config(&self) -> ProfileConfig {
        ProfileConfig::UartTtlGeneric {
            port: self.port,
            baudrate: self.baudrate,
        }
    }

    fn handle_data(&mut self, profile_id: u8, payload: &[u8]) {
        let text = String::from_utf8_lossy(payload).into_owned();
        info!("uart[{}]: response {:?}", profile_id, text);
        self.last_response = Some(text);
    }
}

// ── Gateway operations ───────────────────────────────────────

impl<W: Transport + Send + 'static> Gateway<W> {
    /// Forward `text` to the bridged device.
    pub fn send_uart(&self, id: u8, text: &str, event_triggered: bool) -> Result<()> {
        self.act::<UartTtlGeneric>(id, |_| UartTtlGeneric::command(text, event_triggered))
            .map(|_| info!("uart[{}]: command sent", id))
    }

    /// Load a command list consumed by [`Self::send_next_uart`].
    pub fn queue_uart_commands(
        &self,
        id: u8,
        commands: impl IntoIterator<Item = UartCommand>,
    ) -> Result<()> {
        self.profile(id)?
            .with_driver::<UartTtlGeneric, _>(|d| d.set_queue(commands))
    }

    /// Send the next queued command. Returns `false` once the list is
    /// exhausted.
    pub fn send_next_uart(&self, id: u8) -> Result<bool> {
        let next = self
            .profile(id)?
            .with_driver::<UartTtlGeneric, _>(UartTtlGeneric::pop_next)?;
        match next {
            Some(cmd) => {
                self.send_uart(id, &cmd.command, cmd.event_triggered)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Text of the most recent DATA from the bridged device.
    pub fn uart_response(&self, id: u8) -> Result<Option<String>> {
        self.profile(id)?
            .with_driver::<UartTtlGeneric, _>(|d| d.last_response().map(str::to_owned))
    }
}
