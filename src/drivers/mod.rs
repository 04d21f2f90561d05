//! Profile drivers — the closed set of peripheral kinds.
//!
//! | Kind          | Registration            | Actions                     | DATA payload             |
//! |---------------|-------------------------|-----------------------------|--------------------------|
//! | `digital`     | pin, mode               | write, read, watch          | 1 = LOW, 2 = HIGH        |
//! | `uart`        | port, baudrate          | command (text)              | UTF-8 reply              |
//! | `color`       | —                       | read                        | `[r, b, g]`              |
//! | `ultrasonic`  | pin                     | measure                     | distance cm, big-endian  |
//! | `step_motor`  | —                       | speed, steps                | empty (completion)       |
//! | `mcu`         | —                       | version, ram, reset         | per pending request      |
//!
//! Each kind owns its private fields. The dispatcher calls
//! [`ProfileDriver::handle_data`]; drivers never touch profile state.
//! The gateway operations for a kind live next to its driver.

pub mod color;
pub mod digital;
pub mod mcu;
pub mod step_motor;
pub mod uart;
pub mod ultrasonic;

use crate::rpc::schema::ProfileConfig;

use color::ColorSensor;
use digital::DigitalGeneric;
use mcu::McuDriver;
use step_motor::StepMotor;
use uart::UartTtlGeneric;
use ultrasonic::UltrasonicSensor;

/// Capability shared by every profile kind.
pub trait ProfileDriver {
    /// Configuration sent in the registration request.
    fn config(&self) -> ProfileConfig;

    /// Consume a non-empty DATA payload for the last issued action.
    fn handle_data(&mut self, profile_id: u8, payload: &[u8]);
}

/// Typed access to one variant of [`Driver`].
pub trait DriverKind: ProfileDriver + Sized {
    const KIND: &'static str;

    fn from_driver_mut(driver: &mut Driver) -> Option<&mut Self>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Driver {
    Digital(DigitalGeneric),
    Uart(UartTtlGeneric),
    Color(ColorSensor),
    Ultrasonic(UltrasonicSensor),
    StepMotor(StepMotor),
    Mcu(McuDriver),
}

impl Driver {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Digital(_) => DigitalGeneric::KIND,
            Self::Uart(_) => UartTtlGeneric::KIND,
            Self::Color(_) => ColorSensor::KIND,
            Self::Ultrasonic(_) => UltrasonicSensor::KIND,
            Self::StepMotor(_) => StepMotor::KIND,
            Self::Mcu(_) => McuDriver::KIND,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn ProfileDriver {
        match self {
            Self::Digital(d) => d,
            Self::Uart(d) => d,
            Self::Color(d) => d,
            Self::Ultrasonic(d) => d,
            Self::StepMotor(d) => d,
            Self::Mcu(d) => d,
        }
    }

    fn as_dyn(&self) -> &dyn ProfileDriver {
        match self {
            Self::Digital(d) => d,
            Self::Uart(d) => d,
            Self::Color(d) => d,
            Self::Ultrasonic(d) => d,
            Self::StepMotor(d) => d,
            Self::Mcu(d) => d,
        }
    }
}

impl ProfileDriver for Driver {
    fn config(&self) -> ProfileConfig {
        self.as_dyn().config()
    }

    fn handle_data(&mut self, profile_id: u8, payload: &[u8]) {
        self.as_dyn_mut().handle_data(profile_id, payload);
    }
}

/// A fresh driver for a configured profile.
impl From<ProfileConfig> for Driver {
    fn from(config: ProfileConfig) -> Self {
        match config {
            ProfileConfig::DigitalGeneric { pin, mode } => DigitalGeneric::new(pin, mode).into(),
            ProfileConfig::UartTtlGeneric { port, baudrate } => {
                UartTtlGeneric::new(port, baudrate).into()
            }
            ProfileConfig::ColorSensor => ColorSensor::new().into(),
            ProfileConfig::UltrasonicSensor { pin } => UltrasonicSensor::new(pin).into(),
            ProfileConfig::StepMotor => StepMotor::new().into(),
            ProfileConfig::McuDriver => McuDriver::new().into(),
        }
    }
}

macro_rules! driver_kind {
    ($ty:ty, $variant:ident, $kind:literal) => {
        impl DriverKind for $ty {
            const KIND: &'static str = $kind;

            fn from_driver_mut(driver: &mut Driver) -> Option<&mut Self> {
                match driver {
                    Driver::$variant(d) => Some(d),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Driver {
            fn from(d: $ty) -> Self {
                Driver::$variant(d)
            }
        }
    };
}

driver_kind!(DigitalGeneric, Digital, "digital");
driver_kind!(UartTtlGeneric, Uart, "uart");
driver_kind!(ColorSensor, Color, "color");
driver_kind!(UltrasonicSensor, Ultrasonic, "ultrasonic");
driver_kind!(StepMotor, StepMotor, "step_motor");
driver_kind!(McuDriver, Mcu, "mcu");
