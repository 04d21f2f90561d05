//! Stepper motor driver.
//!
//! Motions can take seconds; the controller ACKs immediately and sends an
//! empty DATA when the move finishes (or at once when `wait` is false).

use log::{debug, info};

use super::ProfileDriver;
use crate::app::service::Gateway;
use crate::error::Result;
use crate::rpc::schema::{ProfileCommand, ProfileConfig, StepCommand, StepMode};
use crate::rpc::transport::Transport;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepMotor {
    last_mode: Option<StepMode>,
}

impl StepMotor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continuous rotation; `direction` is reduced to its sign.
    pub fn speed(&mut self, direction: i8, min_interval: u16, wait: bool) -> ProfileCommand {
        self.build(StepMode::Direction(direction.signum()), min_interval, wait)
    }

    pub fn steps(&mut self, count: i32, min_interval: u16, wait: bool) -> ProfileCommand {
        self.build(StepMode::Steps(count), min_interval, wait)
    }

    fn build(&mut self, mode: StepMode, min_interval: u16, wait: bool) -> ProfileCommand {
        self.last_mode = Some(mode);
        ProfileCommand::Step(StepCommand {
            mode,
            min_interval,
            wait,
        })
    }

    pub fn last_mode(&self) -> Option<StepMode> {
        self.last_mode
    }
}

impl ProfileDriver for StepMotor {
    fn config(&self) -> ProfileConfig {
        ProfileConfig::StepMotor
    }

    fn handle_data(&mut self, profile_id: u8, payload: &[u8]) {
        debug!("step_motor[{}]: unexpected payload {:02x?}", profile_id, payload);
    }
}

// ── Gateway operations ───────────────────────────────────────

impl<W: Transport + Send + 'static> Gateway<W> {
    pub fn step_motor_speed(
        &self,
        id: u8,
        direction: i8,
        min_interval: u16,
        wait: bool,
    ) -> Result<()> {
        self.act::<StepMotor>(id, |d| d.speed(direction, min_interval, wait))
            .map(|_| info!("step_motor[{}]: direction {} sent", id, direction.signum()))
    }

    pub fn step_motor_steps(&self, id: u8, count: i32, min_interval: u16, wait: bool) -> Result<()> {
        self.act::<StepMotor>(id, |d| d.steps(count, min_interval, wait))
            .map(|_| info!("step_motor[{}]: {} steps sent", id, count))
    }
}
