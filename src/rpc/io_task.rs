//! Transport reader loop — pulls bytes, frames them, feeds the dispatcher.
//!
//! Runs in a dedicated thread. The transport's own read timeout bounds
//! each read; an empty read backs off for 1 ms so a non-blocking
//! transport does not spin.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────┐
//!  │  link-reader thread                                      │
//!  │                                                          │
//!  │   Transport::read ──▶ FrameDecoder::feed ──▶ on_frame    │
//!  │        │ Ok(0): sleep 1 ms     │ overflow:    │ decode   │
//!  │        │ Err:   sleep 10 ms    │  resync      │ dispatch │
//!  │        ▼                       ▼              ▼          │
//!  │   stop flag checked between reads                        │
//!  └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Responses are dispatched strictly in arrival order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, warn};

use super::codec::FrameDecoder;
use super::engine::Dispatcher;
use super::transport::Transport;
use crate::error::{CommsError, Result};

const THREAD_NAME: &str = "link-reader";

/// Back-off after a read that returned no data.
const IDLE_POLL: Duration = Duration::from_millis(1);

/// Back-off after a transport error.
const ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Owner of the reader thread. Dropping it stops and joins the thread.
pub struct ReaderHandle {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Signal the thread and wait for it; returns within one transport
    /// read timeout.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!("reader: thread panicked");
            }
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Spawn the reader thread for `reader`, dispatching into `dispatcher`.
pub fn spawn<R, W>(
    reader: R,
    dispatcher: Arc<Dispatcher<W>>,
    read_buf_size: usize,
    max_frame_size: usize,
) -> Result<ReaderHandle>
where
    R: Transport + 'static,
    W: Transport + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);

    let join = thread::Builder::new()
        .name(THREAD_NAME.into())
        .spawn(move || run(reader, &dispatcher, read_buf_size, max_frame_size, &flag))
        .map_err(|e| {
            warn!("reader: spawn failed: {}", e);
            CommsError::ReaderSpawn
        })?;

    Ok(ReaderHandle {
        stop,
        join: Some(join),
    })
}

fn run<R: Transport, W: Transport>(
    mut reader: R,
    dispatcher: &Dispatcher<W>,
    read_buf_size: usize,
    max_frame_size: usize,
    stop: &AtomicBool,
) {
    let mut buf = vec![0u8; read_buf_size];
    let mut decoder = FrameDecoder::new(max_frame_size);
    info!("reader: started ({} byte reads)", read_buf_size);

    while !stop.load(Ordering::Acquire) {
        match reader.read(&mut buf) {
            Ok(0) => thread::sleep(IDLE_POLL),
            Ok(n) => {
                for frame in decoder.feed(&buf[..n]) {
                    dispatcher.on_frame(&frame);
                }
            }
            Err(e) => {
                warn!("reader: transport read failed: {:?}", e);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    if decoder.dropped_bytes() > 0 {
        warn!("reader: {} bytes dropped by frame resync", decoder.dropped_bytes());
    }
    info!("reader: stopped");
}
