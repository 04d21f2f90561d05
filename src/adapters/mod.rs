//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `config_file`  | ConfigPort         | JSON file on disk        |
//! | `log_sink`     | EventSink          | `log` facade             |
//! | `serial`       | Transport          | USB CDC / UART port      |

pub mod config_file;
pub mod log_sink;
#[cfg(feature = "serial")]
pub mod serial;
